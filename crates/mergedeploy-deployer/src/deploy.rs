use std::path::{Path, PathBuf};

use anyhow::Result;
use mergedeploy_core::{DependencyContext, DependencyGraph, DependencyRecord};

use crate::fs_ops::{is_symlink_privilege_error, merge_tree, CopyOptions, IGNORED_ENTRY_NAMES};
use crate::{
    DependencyOutcome, DeployEntry, DeployFailure, DeployOptions, DeployReport,
    MergedDeployLayout, LICENSES_DIR,
};

/// Deploys every dependency into `<output_root>/merged_deploy` and fails on the first hard error.
pub fn deploy(
    graph: &DependencyGraph,
    output_root: &Path,
    options: &DeployOptions,
) -> Result<DeployReport> {
    let report = deploy_merged(graph, output_root, options)?;
    report.ensure_succeeded()?;
    Ok(report)
}

/// Like [`deploy`], but a dependency copy failure is returned inside the report.
///
/// `Err` is reserved for failures preparing the output tree itself.
pub fn deploy_merged(
    graph: &DependencyGraph,
    output_root: &Path,
    options: &DeployOptions,
) -> Result<DeployReport> {
    deploy_merged_with_progress(graph, output_root, options, |_, _| {})
}

pub fn deploy_merged_with_progress<F>(
    graph: &DependencyGraph,
    output_root: &Path,
    options: &DeployOptions,
    mut on_progress: F,
) -> Result<DeployReport>
where
    F: FnMut(usize, usize),
{
    let layout = MergedDeployLayout::new(output_root);
    layout.recreate()?;

    let total = graph.dependency_count();
    let mut processed = 0_usize;
    let mut report = DeployReport {
        target: layout.merged_root(),
        entries: Vec::with_capacity(total),
    };

    for context in DependencyContext::ALL {
        for record in graph.dependencies(context) {
            let outcome = deploy_dependency(&layout, context, record, options);
            let failed = matches!(outcome, DependencyOutcome::Failed(_));
            report.entries.push(DeployEntry {
                context,
                reference: record.reference.clone(),
                outcome,
            });
            processed += 1;
            on_progress(processed, total);
            if failed {
                return Ok(report);
            }
        }
    }

    Ok(report)
}

fn deploy_dependency(
    layout: &MergedDeployLayout,
    context: DependencyContext,
    record: &DependencyRecord,
    options: &DeployOptions,
) -> DependencyOutcome {
    let Some(package_folder) = record.package_folder.as_deref() else {
        return DependencyOutcome::Skipped {
            reason: format!(
                "{} does not have a package folder, skipping",
                record.reference
            ),
        };
    };

    match copy_package_folder(layout, context, record, package_folder, options) {
        Ok(licenses_folder) => DependencyOutcome::Copied {
            deploy_folder: layout.context_dir(context),
            licenses_folder,
        },
        Err(err) => DependencyOutcome::Failed(DeployFailure {
            reference: record.reference.clone(),
            cause: format!("{err:#}"),
            symlink_privilege: is_symlink_privilege_error(&err),
            symlinks_enabled: options.symlinks,
        }),
    }
}

fn copy_package_folder(
    layout: &MergedDeployLayout,
    context: DependencyContext,
    record: &DependencyRecord,
    package_folder: &Path,
    options: &DeployOptions,
) -> Result<Option<PathBuf>> {
    merge_tree(
        package_folder,
        &layout.context_dir(context),
        CopyOptions {
            symlinks: options.symlinks,
            ignored: &IGNORED_ENTRY_NAMES,
        },
    )?;

    let licenses = package_folder.join(LICENSES_DIR);
    if !licenses.exists() {
        return Ok(None);
    }

    let destination = layout.dependency_licenses_dir(context, record.name());
    merge_tree(
        &licenses,
        &destination,
        CopyOptions {
            symlinks: options.symlinks,
            ignored: &[],
        },
    )?;
    Ok(Some(destination))
}
