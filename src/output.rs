//! Writes into the published root
//!
//! Every mutation of the published tree goes through [`PublishRoot`], which
//! checks containment first and only logs the decision in dry run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PublishError, Result};
use crate::util;

/// The destination tree of a run
#[derive(Debug, Clone)]
pub struct PublishRoot {
    root: PathBuf,
    dry_run: bool,
}

impl PublishRoot {
    /// Open (and outside dry run, create) the published root
    pub fn open(root: &Path, dry_run: bool) -> Result<Self> {
        if !dry_run {
            fs::create_dir_all(root).map_err(|e| PublishError::io(root, e))?;
        }
        let root = match dunce::canonicalize(root) {
            Ok(canonical) => canonical,
            Err(_) => std::path::absolute(root).map_err(|e| PublishError::io(root, e))?,
        };
        Ok(Self { root, dry_run })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a root-relative path
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Root-relative display form of a destination
    pub fn display(&self, target: &Path) -> String {
        util::display_path(target.strip_prefix(&self.root).unwrap_or(target))
    }

    /// Fail unless `target` is inside the published root
    pub fn check(&self, target: &Path) -> Result<PathBuf> {
        util::ensure_within_root(&self.root, target)
    }

    /// Write `contents` to `target`, creating parent directories
    pub fn write(&self, target: &Path, contents: &[u8]) -> Result<()> {
        self.check(target)?;
        if self.dry_run {
            info!("[dry] write {}", self.display(target));
            return Ok(());
        }
        create_parent(target)?;
        fs::write(target, contents).map_err(|e| PublishError::io(target, e))
    }

    /// Copy `source` to `target` verbatim, creating parent directories
    pub fn copy(&self, source: &Path, target: &Path) -> Result<()> {
        self.check(target)?;
        if self.dry_run {
            info!("[dry] copy {} -> {}", util::display_path(source), self.display(target));
            return Ok(());
        }
        create_parent(target)?;
        fs::copy(source, target).map_err(|e| PublishError::io(source, e))?;
        Ok(())
    }

    /// Delete the file at `target`
    pub fn remove_file(&self, target: &Path) -> Result<()> {
        self.check(target)?;
        if self.dry_run {
            info!("[dry] delete {}", self.display(target));
            return Ok(());
        }
        debug!("[prune] delete {}", self.display(target));
        fs::remove_file(target).map_err(|e| PublishError::io(target, e))
    }

    /// Delete the empty directory at `target`
    pub fn remove_dir(&self, target: &Path) -> Result<()> {
        self.check(target)?;
        if self.dry_run {
            info!("[dry] rmdir {}", self.display(target));
            return Ok(());
        }
        debug!("[prune] rmdir {}", self.display(target));
        fs::remove_dir(target).map_err(|e| PublishError::io(target, e))
    }
}

fn create_parent(target: &Path) -> Result<()> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_refuse_escape() {
        let temp = TempDir::new().unwrap();
        let root = PublishRoot::open(&temp.path().join("out"), false).unwrap();

        let inside = root.join("content/a/b.md");
        root.write(&inside, b"hi").unwrap();
        assert_eq!(fs::read_to_string(&inside).unwrap(), "hi");

        let outside = root.join("../escape.md");
        assert!(matches!(
            root.write(&outside, b"x"),
            Err(PublishError::OutsidePublishRoot { .. })
        ));
        assert!(!temp.path().join("escape.md").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let root = PublishRoot::open(&temp.path().join("out"), true).unwrap();
        root.write(&root.join("a.md"), b"x").unwrap();
        assert!(!temp.path().join("out").exists());

        // Containment is still enforced
        assert!(root.write(&root.join("../../x"), b"x").is_err());
    }
}
