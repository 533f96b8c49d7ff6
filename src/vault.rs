//! Vault index and priority-ordered candidate search
//!
//! The whole vault is scanned once per run. Every lookup afterwards works on
//! the sorted index so that resolution never depends on the order in which
//! the platform happens to list a directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::Scope;
use crate::constants as C;
use crate::error::{PublishError, Result};
use crate::util;

/// A Vault is the source tree of interlinked documents and media
#[derive(Debug, Clone)]
pub struct Vault {
    /// Canonical path to the vault directory
    root: PathBuf,
    /// Whether hidden files take part in resolution
    include_hidden: bool,
    /// Every visible file, relative to `root`, sorted
    files: Vec<PathBuf>,
}

impl Vault {
    /// Scan `root` and index every file
    pub fn scan(root: &Path, include_hidden: bool) -> Result<Self> {
        if !root.is_dir() {
            return Err(PublishError::VaultNotFound(root.to_path_buf()));
        }
        let root = dunce::canonicalize(root).map_err(|e| PublishError::io(root, e))?;

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden_entry(e));

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&root) {
                files.push(relative.to_path_buf());
            }
        }

        // Sort for deterministic ordering
        files.sort();
        debug!(count = files.len(), root = %util::display_path(&root), "indexed vault");

        Ok(Self {
            root,
            include_hidden,
            files,
        })
    }

    /// Get the path to this vault
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All indexed files, relative to the root
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// All indexed documents, relative to the root
    pub fn markdown_files(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| util::is_markdown(p))
    }

    /// Absolute path of a vault-relative path
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Whether a relative path is hidden and hidden files are excluded
    pub fn is_excluded(&self, relative: &Path) -> bool {
        !self.include_hidden && util::is_hidden(relative)
    }

    /// Files in priority order for a reference made from `note_dir`
    /// (vault-relative).
    ///
    /// 1. files directly in `note_dir`
    /// 2. files deeper below `note_dir`
    /// 3. with [`Scope::Vault`]: the same two passes for each ancestor,
    ///    nearest first, up to the root
    /// 4. with [`Scope::Vault`]: every other file
    ///
    /// Each file is yielded at most once.
    pub fn candidates<'a>(
        &'a self,
        note_dir: &Path,
        scope: Scope,
    ) -> impl Iterator<Item = &'a Path> + 'a {
        let mut dirs = vec![note_dir.to_path_buf()];
        if scope == Scope::Vault {
            dirs.extend(note_dir.ancestors().skip(1).map(Path::to_path_buf));
        }

        let tiers = dirs.into_iter().flat_map(move |dir| {
            let below = dir.clone();
            let direct = self
                .files
                .iter()
                .filter(move |p| p.parent() == Some(dir.as_path()));
            let deeper = self
                .files
                .iter()
                .filter(move |p| p.starts_with(&below) && p.parent() != Some(below.as_path()));
            direct.chain(deeper)
        });

        let rest = match scope {
            Scope::Vault => Some(self.files.iter()),
            Scope::Subtree => None,
        };

        let mut seen = HashSet::new();
        tiers
            .chain(rest.into_iter().flatten())
            .map(PathBuf::as_path)
            .filter(move |p| seen.insert(*p))
    }
}

fn is_hidden_entry(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_string_lossy()
        .starts_with(C::HIDDEN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        for rel in [
            "root.png",
            "A/B/note.md",
            "A/B/x.png",
            "A/B/deep/x.png",
            "A/sibling.png",
            "A/C/cousin.png",
            "Z/far.png",
            ".hidden/secret.png",
        ] {
            touch(temp.path(), rel);
        }
        temp
    }

    #[test]
    fn test_scan_skips_hidden() {
        let temp = fixture();
        let vault = Vault::scan(temp.path(), false).unwrap();
        assert!(!vault.files().iter().any(|p| p.starts_with(".hidden")));
        assert_eq!(vault.markdown_files().count(), 1);

        let vault = Vault::scan(temp.path(), true).unwrap();
        assert!(vault.files().iter().any(|p| p.starts_with(".hidden")));
    }

    #[test]
    fn test_scan_missing_root() {
        let err = Vault::scan(Path::new("/definitely/not/here"), false).unwrap_err();
        assert!(matches!(err, PublishError::VaultNotFound(_)));
    }

    #[test]
    fn test_subtree_order() {
        let temp = fixture();
        let vault = Vault::scan(temp.path(), false).unwrap();
        let order: Vec<_> = vault
            .candidates(Path::new("A/B"), Scope::Subtree)
            .map(util::display_path)
            .collect();
        assert_eq!(order, vec!["A/B/note.md", "A/B/x.png", "A/B/deep/x.png"]);
    }

    #[test]
    fn test_vault_order() {
        let temp = fixture();
        let vault = Vault::scan(temp.path(), false).unwrap();
        let order: Vec<_> = vault
            .candidates(Path::new("A/B"), Scope::Vault)
            .map(util::display_path)
            .collect();
        assert_eq!(
            order,
            vec![
                "A/B/note.md",
                "A/B/x.png",
                "A/B/deep/x.png",
                "A/sibling.png",
                "A/C/cousin.png",
                "root.png",
                "Z/far.png",
            ]
        );
    }
}
