//! Reference resolution module
//!
//! Resolves reference strings found in a document to actual files in the
//! vault. All matching is case-insensitive and ignores Unicode composition.
//!
//! Media resolution rules (in order):
//! 1. Reference with folders → walk the folders from the document's folder,
//!    matching each segment case-insensitively
//! 2. Priority-ordered candidate search (see [`Vault::candidates`]) by file
//!    name, or by stem restricted to media extensions when the reference has
//!    no extension
//!
//! Note resolution rules (in order):
//! 1. Reference with folders → exact path relative to the document's folder
//! 2. Bare file name directly in the document's folder
//! 3. Priority-ordered candidate search over documents only

use std::path::{Component, Path, PathBuf};

use crate::config::{MediaExts, Scope};
use crate::normalize::{fold, same_name};
use crate::util;
use crate::vault::Vault;

/// Which resolver produced a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Media,
    Note,
}

/// A reference matched to a vault file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Vault-relative path of the file
    pub path: PathBuf,
    pub kind: HitKind,
}

/// Resolves references against a scanned vault
pub struct Resolver<'a> {
    vault: &'a Vault,
    scope: Scope,
    media_exts: &'a MediaExts,
}

impl<'a> Resolver<'a> {
    pub fn new(vault: &'a Vault, scope: Scope, media_exts: &'a MediaExts) -> Self {
        Self {
            vault,
            scope,
            media_exts,
        }
    }

    /// Resolve a reference the way the publish pass does: media first when
    /// the reference looks like media (or has no extension), then documents
    pub fn resolve(&self, note_dir: &Path, reference: &str, has_extension: bool) -> Option<Resolved> {
        if !has_extension || self.media_exts.is_media(reference) {
            if let Some(path) = self.resolve_media(note_dir, reference, has_extension) {
                return Some(Resolved {
                    path,
                    kind: HitKind::Media,
                });
            }
        }

        self.resolve_note(note_dir, reference, has_extension)
            .map(|path| Resolved {
                path,
                kind: HitKind::Note,
            })
    }

    /// Find the media file `reference` points to from a document in
    /// `note_dir` (vault-relative)
    pub fn resolve_media(&self, note_dir: &Path, reference: &str, has_extension: bool) -> Option<PathBuf> {
        let reference = reference.trim().replace('\\', "/");
        let segments: Vec<&str> = reference.split('/').filter(|s| !s.is_empty()).collect();

        // Rule 1: walk the folders; any miss falls through to the search
        if segments.len() > 1 {
            if let Some(found) = self.walk_segments(note_dir, &segments) {
                return Some(found);
            }
        }

        // Rule 2: priority-ordered search
        let target_name = fold(util::file_name(&reference));
        let target_stem = fold(util::stem(&reference));

        self.vault
            .candidates(note_dir, self.scope)
            .find(|candidate| {
                let name = candidate_name(candidate);
                if has_extension {
                    fold(&name) == target_name
                } else {
                    fold(util::stem(&name)) == target_stem && self.media_exts.is_media(&name)
                }
            })
            .map(Path::to_path_buf)
    }

    /// Find the document `reference` points to from a document in `note_dir`
    /// (vault-relative)
    pub fn resolve_note(&self, note_dir: &Path, reference: &str, has_extension: bool) -> Option<PathBuf> {
        let reference = reference.trim().replace('\\', "/");
        let name = util::file_name(&reference);

        // Rule 1: path relative to the document's folder
        if reference.trim_matches('/').contains('/') {
            if let Some(candidate) = join_within_vault(note_dir, &reference) {
                if util::is_markdown(&candidate) && self.is_visible_file(&candidate) {
                    return Some(candidate);
                }
            }
        }

        // Rule 2: bare name next to the document
        let sibling = note_dir.join(name);
        if !name.is_empty() && util::is_markdown(&sibling) && self.is_visible_file(&sibling) {
            return Some(sibling);
        }

        // Rule 3: priority-ordered search over documents
        let target_name = fold(name);
        let target_stem = fold(util::stem(name));

        self.vault
            .candidates(note_dir, self.scope)
            .filter(|candidate| util::is_markdown(candidate))
            .find(|candidate| {
                let candidate_name = candidate_name(candidate);
                let stem = fold(util::stem(&candidate_name));
                if has_extension {
                    // A dotted note name ("v1.2 plan") is also a stem
                    fold(&candidate_name) == target_name || stem == target_name
                } else {
                    stem == target_stem
                }
            })
            .map(Path::to_path_buf)
    }

    /// Case-insensitive walk of `segments` starting at `start`
    fn walk_segments(&self, start: &Path, segments: &[&str]) -> Option<PathBuf> {
        let (file, dirs) = segments.split_last()?;
        let mut current = start.to_path_buf();

        for segment in dirs {
            match *segment {
                "." => {}
                ".." => {
                    if !current.pop() {
                        return None;
                    }
                }
                _ => current = self.find_child_dir(&current, segment)?,
            }
        }

        self.vault
            .files()
            .iter()
            .find(|p| p.parent() == Some(current.as_path()) && same_name(&candidate_name(p), file))
            .cloned()
    }

    /// First child folder of `dir` (sorted) whose name matches `segment`
    fn find_child_dir(&self, dir: &Path, segment: &str) -> Option<PathBuf> {
        self.vault
            .files()
            .iter()
            .filter_map(|p| {
                let rest = p.strip_prefix(dir).ok()?;
                let mut components = rest.components();
                let first = components.next()?;
                // Only a folder if something follows it
                components.next()?;
                Some(dir.join(first.as_os_str()))
            })
            .find(|child| same_name(&candidate_name(child), segment))
    }

    fn is_visible_file(&self, relative: &Path) -> bool {
        !self.vault.is_excluded(relative)
            && self
                .vault
                .files()
                .binary_search_by(|p| p.as_path().cmp(relative))
                .is_ok()
    }
}

fn candidate_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Join `reference` onto `dir`, collapsing `.`/`..`; `None` if it leaves the
/// vault. A leading `/` makes the reference vault-absolute.
fn join_within_vault(dir: &Path, reference: &str) -> Option<PathBuf> {
    let mut out = if reference.starts_with('/') {
        PathBuf::new()
    } else {
        dir.to_path_buf()
    };

    for component in Path::new(reference.trim_start_matches('/')).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            _ => return None,
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vault_with(files: &[&str]) -> (TempDir, Vault) {
        let temp = TempDir::new().unwrap();
        for rel in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        let vault = Vault::scan(temp.path(), false).unwrap();
        (temp, vault)
    }

    fn rel(p: Option<PathBuf>) -> Option<String> {
        p.map(|p| util::display_path(&p))
    }

    #[test]
    fn test_media_case_insensitive() {
        let (_t, vault) = vault_with(&["Trips/photo.jpg", "Trips/Day1.md"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_media(Path::new("Trips"), "PHOTO.JPG", true)),
            Some("Trips/photo.jpg".to_string())
        );
    }

    #[test]
    fn test_media_unicode_composition() {
        let (_t, vault) = vault_with(&["Caf\u{e9}.png", "note.md"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert!(resolver.resolve_media(Path::new(""), "Cafe\u{301}.png", true).is_some());
    }

    #[test]
    fn test_media_prefers_direct_folder() {
        let (_t, vault) = vault_with(&["A/a/x.png", "A/x.png", "A/n.md"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_media(Path::new("A"), "x.png", true)),
            Some("A/x.png".to_string())
        );
    }

    #[test]
    fn test_media_without_extension_needs_media_ext() {
        let (_t, vault) = vault_with(&["A/cover.md", "A/sub/cover.webp"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_media(Path::new("A"), "cover", false)),
            Some("A/sub/cover.webp".to_string())
        );
    }

    #[test]
    fn test_media_path_walk() {
        let (_t, vault) = vault_with(&["Trips/Italy/Day1.md", "Trips/Media/Rome.JPG", "Other/Rome.jpg"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Vault, &exts);
        assert_eq!(
            rel(resolver.resolve_media(Path::new("Trips/Italy"), "../media/rome.jpg", true)),
            Some("Trips/Media/Rome.JPG".to_string())
        );
    }

    #[test]
    fn test_media_walk_miss_falls_back_to_search() {
        let (_t, vault) = vault_with(&["A/n.md", "A/deep/pic.png"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_media(Path::new("A"), "missing/pic.png", true)),
            Some("A/deep/pic.png".to_string())
        );
    }

    #[test]
    fn test_subtree_scope_stays_below() {
        let (_t, vault) = vault_with(&["A/B/n.md", "A/up.png"]);
        let exts = MediaExts::default();
        let subtree = Resolver::new(&vault, Scope::Subtree, &exts);
        assert!(subtree.resolve_media(Path::new("A/B"), "up.png", true).is_none());
        let wide = Resolver::new(&vault, Scope::Vault, &exts);
        assert!(wide.resolve_media(Path::new("A/B"), "up.png", true).is_some());
    }

    #[test]
    fn test_note_relative_path() {
        let (_t, vault) = vault_with(&["A/B/n.md", "A/C/target.md"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_note(Path::new("A/B"), "../C/target.md", true)),
            Some("A/C/target.md".to_string())
        );
        // Escaping the vault never resolves through rule 1
        assert!(resolver.resolve_note(Path::new("A"), "../../x.md", true).is_none());
    }

    #[test]
    fn test_note_by_stem_and_dotted_name() {
        let (_t, vault) = vault_with(&["A/n.md", "A/sub/Notes.md", "A/sub/v1.2 plan.md"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert_eq!(
            rel(resolver.resolve_note(Path::new("A"), "notes", false)),
            Some("A/sub/Notes.md".to_string())
        );
        assert_eq!(
            rel(resolver.resolve_note(Path::new("A"), "v1.2 plan", true)),
            Some("A/sub/v1.2 plan.md".to_string())
        );
    }

    #[test]
    fn test_note_ignores_media() {
        let (_t, vault) = vault_with(&["A/n.md", "A/sub/Notes.png"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);
        assert!(resolver.resolve_note(Path::new("A"), "Notes", false).is_none());
    }

    #[test]
    fn test_resolve_media_then_note() {
        let (_t, vault) = vault_with(&["A/n.md", "A/Map.md", "A/Map.png"]);
        let exts = MediaExts::default();
        let resolver = Resolver::new(&vault, Scope::Subtree, &exts);

        let hit = resolver.resolve(Path::new("A"), "Map", false).unwrap();
        assert_eq!(hit.kind, HitKind::Media);

        let hit = resolver.resolve(Path::new("A"), "Map.md", true).unwrap();
        assert_eq!(hit.kind, HitKind::Note);
        assert_eq!(util::display_path(&hit.path), "A/Map.md");
    }
}
