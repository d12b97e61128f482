use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TreeEntry {
    Dir,
    File(String),
    Symlink(PathBuf),
}

/// Content digest of a directory tree: relative paths, file bytes and link targets.
pub fn tree_digest(root: &Path) -> Result<String> {
    if !root.is_dir() {
        anyhow::bail!("cannot digest a non-directory: {}", root.display());
    }

    let mut entries = collect_tree_entries(root)?;
    entries.sort();

    let mut hasher = Sha256::new();
    for (relative_path, entry) in entries {
        let (kind, detail) = match entry {
            TreeEntry::Dir => ("d", String::new()),
            TreeEntry::File(digest) => ("f", digest),
            TreeEntry::Symlink(target) => ("l", normalize_relative_path(&target)),
        };
        hasher.update(kind.as_bytes());
        hasher.update([0]);
        hasher.update(relative_path.as_bytes());
        hasher.update([0]);
        hasher.update(detail.as_bytes());
        hasher.update([0]);
    }

    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

fn collect_tree_entries(root: &Path) -> Result<Vec<(String, TreeEntry)>> {
    let mut entries = Vec::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());

    while let Some(dir) = queue.pop_front() {
        for entry in
            fs::read_dir(&dir).with_context(|| format!("failed reading {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            let relative_path = path.strip_prefix(root).with_context(|| {
                format!(
                    "failed deriving relative path {} from {}",
                    path.display(),
                    root.display()
                )
            })?;
            let relative_path = normalize_relative_path(relative_path);

            if file_type.is_symlink() {
                let target = fs::read_link(&path)
                    .with_context(|| format!("failed reading symlink {}", path.display()))?;
                entries.push((relative_path, TreeEntry::Symlink(target)));
            } else if file_type.is_dir() {
                entries.push((relative_path, TreeEntry::Dir));
                queue.push_back(path);
            } else {
                let bytes =
                    fs::read(&path).with_context(|| format!("failed reading {}", path.display()))?;
                let digest = hex::encode(Sha256::digest(&bytes));
                entries.push((relative_path, TreeEntry::File(digest)));
            }
        }
    }

    Ok(entries)
}

fn normalize_relative_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
