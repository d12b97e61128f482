use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use mergedeploy_core::{Conf, DependencyContext, DeployFolders, PackageRef, DEPLOYER_SYMLINKS_CONF};
use serde::Serialize;

use crate::MERGED_DEPLOY_DIR;

pub const SYMLINK_PRIVILEGE_GUIDANCE: &str =
    "Symlinks on Windows require admin privileges or 'Developer mode = ON'";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    pub symlinks: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self { symlinks: true }
    }
}

impl DeployOptions {
    pub fn from_conf(conf: &Conf) -> Result<Self> {
        Ok(Self {
            symlinks: conf.get_bool(DEPLOYER_SYMLINKS_CONF, true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DependencyOutcome {
    Copied {
        deploy_folder: PathBuf,
        licenses_folder: Option<PathBuf>,
    },
    Skipped {
        reason: String,
    },
    Failed(DeployFailure),
}

/// A hard copy failure, attributed to the dependency being deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployFailure {
    pub reference: PackageRef,
    pub cause: String,
    pub symlink_privilege: bool,
    pub symlinks_enabled: bool,
}

impl DeployFailure {
    pub fn guidance(&self) -> Option<&'static str> {
        self.symlink_privilege.then_some(SYMLINK_PRIVILEGE_GUIDANCE)
    }
}

impl fmt::Display for DeployFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MERGED_DEPLOY_DIR}: Copying of '{}' files failed: {}.",
            self.reference, self.cause
        )?;
        if self.symlinks_enabled {
            write!(
                f,
                "\nYou can use '{DEPLOYER_SYMLINKS_CONF}' conf to disable symlinks"
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for DeployFailure {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployEntry {
    pub context: DependencyContext,
    pub reference: PackageRef,
    pub outcome: DependencyOutcome,
}

/// Per-dependency outcomes of one deploy, in processing order.
///
/// A hard failure stops processing, so a failed entry is always the last one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub target: PathBuf,
    pub entries: Vec<DeployEntry>,
}

impl DeployReport {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                DependencyOutcome::Skipped { reason } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn copied_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, DependencyOutcome::Copied { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, DependencyOutcome::Skipped { .. }))
            .count()
    }

    pub fn failure(&self) -> Option<&DeployFailure> {
        self.entries.iter().find_map(|entry| match &entry.outcome {
            DependencyOutcome::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    pub fn deploy_folders(&self) -> DeployFolders {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                DependencyOutcome::Copied { deploy_folder, .. } => Some((
                    (entry.context, entry.reference.name.clone()),
                    deploy_folder.clone(),
                )),
                _ => None,
            })
            .collect()
    }

    pub fn ensure_succeeded(&self) -> Result<()> {
        match self.failure() {
            Some(failure) => Err(failure.clone().into()),
            None => Ok(()),
        }
    }

    pub fn success_message(&self) -> String {
        format!("Deployed dependencies to: {}", self.target.display())
    }
}
