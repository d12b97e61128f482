use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

/// Package metadata that never lands in the merged tree.
pub const IGNORED_ENTRY_NAMES: [&str; 3] = ["licenses", "conaninfo.txt", "conanmanifest.txt"];

/// Windows `ERROR_PRIVILEGE_NOT_HELD`, raised when creating a symlink without the right.
const ERROR_PRIVILEGE_NOT_HELD: i32 = 1314;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CopyOptions<'a> {
    pub(crate) symlinks: bool,
    pub(crate) ignored: &'a [&'a str],
}

impl CopyOptions<'_> {
    fn is_ignored(&self, name: &OsStr) -> bool {
        self.ignored.iter().any(|ignored| name == OsStr::new(ignored))
    }
}

/// Copies `src` into `dst`, merging with whatever is already there.
///
/// Entries whose name is in `options.ignored` are skipped at every depth. Existing files
/// and links at a colliding path are replaced. With `symlinks` off, links are followed and
/// their targets copied as regular files or directories.
pub(crate) fn merge_tree(src: &Path, dst: &Path, options: CopyOptions<'_>) -> Result<()> {
    let metadata =
        fs::metadata(src).with_context(|| format!("failed to stat {}", src.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("source is not a directory: {}", src.display());
    }
    ensure_dir(dst)?;
    merge_dir_entries(src, dst, options)
}

fn merge_dir_entries(src: &Path, dst: &Path, options: CopyOptions<'_>) -> Result<()> {
    let mut entries = fs::read_dir(src)
        .with_context(|| format!("failed to read {}", src.display()))?
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| format!("failed to iterate {}", src.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        if options.is_ignored(&name) {
            continue;
        }

        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let metadata = fs::symlink_metadata(&src_path)
            .with_context(|| format!("failed to stat {}", src_path.display()))?;

        if metadata.file_type().is_symlink() {
            if options.symlinks {
                copy_symlink(&src_path, &dst_path)?;
                continue;
            }
            let target = fs::metadata(&src_path).with_context(|| {
                format!("failed to resolve symlink {}", src_path.display())
            })?;
            if target.is_dir() {
                ensure_dir(&dst_path)?;
                merge_dir_entries(&src_path, &dst_path, options)?;
            } else {
                copy_file(&src_path, &dst_path)?;
            }
            continue;
        }

        if metadata.is_dir() {
            ensure_dir(&dst_path)?;
            merge_dir_entries(&src_path, &dst_path, options)?;
            continue;
        }

        copy_file(&src_path, &dst_path)?;
    }
    Ok(())
}

/// Makes `path` usable as a merge directory. A link that resolves to a directory is kept
/// and merged through; any other non-directory entry is replaced.
fn ensure_dir(path: &Path) -> Result<()> {
    if let Ok(existing) = fs::symlink_metadata(path) {
        if existing.is_dir() {
            return Ok(());
        }
        if existing.file_type().is_symlink()
            && fs::metadata(path).is_ok_and(|target| target.is_dir())
        {
            return Ok(());
        }
        fs::remove_file(path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
    }
    fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
}

fn clear_destination(path: &Path) -> Result<()> {
    let Ok(existing) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    if existing.is_dir() {
        anyhow::bail!("cannot replace directory {} with a file", path.display());
    }
    fs::remove_file(path).with_context(|| format!("failed to replace {}", path.display()))
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    clear_destination(dst)?;
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target =
        fs::read_link(src).with_context(|| format!("failed to read symlink {}", src.display()))?;
    clear_destination(dst)?;
    create_symlink(src, &target, dst).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            dst.display(),
            target.display()
        )
    })
}

#[cfg(unix)]
fn create_symlink(_src: &Path, target: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(windows)]
fn create_symlink(src: &Path, target: &Path, dst: &Path) -> io::Result<()> {
    let points_to_dir = fs::metadata(src).map(|meta| meta.is_dir()).unwrap_or(false);
    if points_to_dir {
        std::os::windows::fs::symlink_dir(target, dst)
    } else {
        std::os::windows::fs::symlink_file(target, dst)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_src: &Path, _target: &Path, _dst: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

pub(crate) fn is_privilege_not_held(error: &io::Error) -> bool {
    cfg!(windows) && error.raw_os_error() == Some(ERROR_PRIVILEGE_NOT_HELD)
}

/// True when any cause in the chain is the platform's missing-symlink-privilege error.
pub(crate) fn is_symlink_privilege_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(is_privilege_not_held)
}
