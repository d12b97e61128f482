use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::PackageRef;

/// Assigned output folders keyed by context and dependency name.
pub type DeployFolders = BTreeMap<(DependencyContext, String), PathBuf>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyContext {
    Build,
    Host,
}

impl DependencyContext {
    /// Deployment order. Build tools first, then host libraries.
    pub const ALL: [DependencyContext; 2] = [DependencyContext::Build, DependencyContext::Host];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Host => "host",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootProject {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    #[serde(rename = "ref")]
    pub reference: PackageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_folder: Option<PathBuf>,
}

impl DependencyRecord {
    pub fn new(reference: PackageRef, package_folder: Option<PathBuf>) -> Self {
        Self {
            reference,
            package_folder,
            deploy_folder: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn set_deploy_folder(&mut self, folder: impl Into<PathBuf>) {
        self.deploy_folder = Some(folder.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub root: RootProject,
    #[serde(default)]
    build: Vec<DependencyRecord>,
    #[serde(default)]
    host: Vec<DependencyRecord>,
}

impl DependencyGraph {
    pub fn new(root: RootProject) -> Self {
        Self {
            root,
            build: Vec::new(),
            host: Vec::new(),
        }
    }

    pub fn dependencies(&self, context: DependencyContext) -> &[DependencyRecord] {
        match context {
            DependencyContext::Build => &self.build,
            DependencyContext::Host => &self.host,
        }
    }

    fn dependencies_mut(&mut self, context: DependencyContext) -> &mut Vec<DependencyRecord> {
        match context {
            DependencyContext::Build => &mut self.build,
            DependencyContext::Host => &mut self.host,
        }
    }

    pub fn dependency_count(&self) -> usize {
        self.build.len() + self.host.len()
    }

    pub fn add_dependency(
        &mut self,
        context: DependencyContext,
        record: DependencyRecord,
    ) -> Result<()> {
        if record.name() == self.root.name {
            return Err(anyhow!(
                "root project '{}' cannot depend on itself",
                self.root.name
            ));
        }
        if self
            .dependencies(context)
            .iter()
            .any(|existing| existing.name() == record.name())
        {
            return Err(anyhow!(
                "duplicate {} dependency '{}'",
                context.as_str(),
                record.name()
            ));
        }
        self.dependencies_mut(context).push(record);
        Ok(())
    }

    /// Records each assigned folder on the matching dependency. Returns how many records changed.
    pub fn apply_deploy_folders(&mut self, folders: &DeployFolders) -> usize {
        let mut applied = 0;
        for context in DependencyContext::ALL {
            for record in self.dependencies_mut(context) {
                if let Some(folder) = folders.get(&(context, record.name().to_string())) {
                    record.set_deploy_folder(folder);
                    applied += 1;
                }
            }
        }
        applied
    }

    pub fn from_toml_str(input: &str, base_dir: Option<&Path>) -> Result<Self> {
        let raw: DependencyGraph =
            toml::from_str(input).context("failed to parse dependency graph document")?;
        raw.validated(base_dir)
    }

    pub fn from_json_str(input: &str, base_dir: Option<&Path>) -> Result<Self> {
        let raw: DependencyGraph =
            serde_json::from_str(input).context("failed to parse dependency graph document")?;
        raw.validated(base_dir)
    }

    /// Loads a graph document, choosing JSON for `.json` files and TOML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read dependency graph: {}", path.display()))?;
        let base_dir = path.parent().filter(|parent| !parent.as_os_str().is_empty());
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            Self::from_json_str(&content, base_dir)
        } else {
            Self::from_toml_str(&content, base_dir)
        };
        parsed.with_context(|| format!("invalid dependency graph: {}", path.display()))
    }

    fn validated(self, base_dir: Option<&Path>) -> Result<Self> {
        if self.root.name.trim().is_empty() {
            return Err(anyhow!("root project name must not be empty"));
        }

        let mut graph = Self::new(self.root);
        for (context, records) in [
            (DependencyContext::Build, self.build),
            (DependencyContext::Host, self.host),
        ] {
            for mut record in records {
                if let (Some(base), Some(folder)) = (base_dir, record.package_folder.as_ref()) {
                    if folder.is_relative() {
                        record.package_folder = Some(base.join(folder));
                    }
                }
                graph.add_dependency(context, record)?;
            }
        }
        Ok(graph)
    }
}
