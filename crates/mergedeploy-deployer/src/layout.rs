use anyhow::{Context, Result};
use mergedeploy_core::DependencyContext;
use std::fs;
use std::path::{Path, PathBuf};

pub const MERGED_DEPLOY_DIR: &str = "merged_deploy";
pub const LICENSES_DIR: &str = "licenses";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDeployLayout {
    output_root: PathBuf,
}

impl MergedDeployLayout {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn merged_root(&self) -> PathBuf {
        self.output_root.join(MERGED_DEPLOY_DIR)
    }

    pub fn context_dir(&self, context: DependencyContext) -> PathBuf {
        self.merged_root().join(context.as_str())
    }

    pub fn licenses_dir(&self, context: DependencyContext) -> PathBuf {
        self.context_dir(context).join(LICENSES_DIR)
    }

    pub fn dependency_licenses_dir(&self, context: DependencyContext, name: &str) -> PathBuf {
        self.licenses_dir(context).join(name)
    }

    /// Wipes any previous merged tree and recreates the empty context directories.
    pub fn recreate(&self) -> Result<()> {
        let merged_root = self.merged_root();
        match fs::symlink_metadata(&merged_root) {
            Ok(metadata) if metadata.is_dir() => {
                fs::remove_dir_all(&merged_root).with_context(|| {
                    format!("failed to remove previous deploy: {}", merged_root.display())
                })?;
            }
            Ok(_) => {
                fs::remove_file(&merged_root).with_context(|| {
                    format!("failed to remove previous deploy: {}", merged_root.display())
                })?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to stat previous deploy: {}", merged_root.display())
                });
            }
        }

        for dir in std::iter::once(merged_root)
            .chain(DependencyContext::ALL.map(|context| self.context_dir(context)))
        {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
