use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mergedeploy_core::{DependencyContext, DependencyGraph};
use mergedeploy_deployer::{DeployEntry, DeployReport};
use serde::Serialize;

pub(crate) const REPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct DeployReportDocument<'a> {
    pub(crate) version: u32,
    pub(crate) target: &'a Path,
    pub(crate) tree_digest: String,
    pub(crate) entries: &'a [DeployEntry],
    pub(crate) deploy_folders: Vec<DeployFolderRecord>,
    pub(crate) graph: DependencyGraph,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeployFolderRecord {
    pub(crate) context: DependencyContext,
    pub(crate) name: String,
    pub(crate) path: PathBuf,
}

/// Builds the report document, applying the assigned deploy folders to a copy of the graph.
pub(crate) fn build_report_document<'a>(
    graph: &DependencyGraph,
    report: &'a DeployReport,
    tree_digest: String,
) -> DeployReportDocument<'a> {
    let folders = report.deploy_folders();
    let mut graph = graph.clone();
    graph.apply_deploy_folders(&folders);

    DeployReportDocument {
        version: REPORT_FORMAT_VERSION,
        target: report.target(),
        tree_digest,
        entries: &report.entries,
        deploy_folders: folders
            .into_iter()
            .map(|((context, name), path)| DeployFolderRecord {
                context,
                name,
                path,
            })
            .collect(),
        graph,
    }
}

pub(crate) fn write_report_document(path: &Path, document: &DeployReportDocument<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
    }
    let payload =
        serde_json::to_string_pretty(document).context("failed to serialize deploy report")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write deploy report: {}", path.display()))
}
