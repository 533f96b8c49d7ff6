//! Path mapping from the vault layout to the published layout
//!
//! Built once, after every publishable document and every required media
//! file is known. The resulting tables are immutable and are handed to the
//! rewriter by reference.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::config::{apply_rules, Rule};
use crate::constants as C;
use crate::normalize::fold;
use crate::util;

static SLASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").unwrap());

/// Name redaction applied to folder and file names
#[derive(Debug, Clone, Copy)]
pub struct NameFilters<'a> {
    pub rules: &'a [Rule],
    pub to_filenames: bool,
    pub to_dirs: bool,
}

impl NameFilters<'_> {
    fn filter(&self, name: &str, enabled: bool) -> String {
        if enabled {
            apply_rules(name, self.rules)
        } else {
            name.to_string()
        }
    }
}

/// Lookup key for a media reference as written in the document at
/// `current_rel_doc` (vault-relative).
///
/// Paths are collapsed against the document's folder. Bare names are keyed
/// by the document's folder and the name joined with `//`, which a collapsed
/// path never contains: the same bare name can mean different files from
/// different folders.
pub fn media_ref_key(current_rel_doc: &str, raw_ref: &str) -> String {
    let reference = raw_ref.split('#').next().unwrap_or("").trim();
    if reference.contains('/') || reference.contains('\\') || reference.starts_with('.') {
        fold(&util::collapse_rel_path(current_rel_doc, reference))
    } else {
        let doc = current_rel_doc.replace('\\', "/");
        let dir = doc.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        format!("{}//{}", fold(dir.trim_matches('/')), fold(util::file_name(reference)))
    }
}

/// Strip a trailing document extension (case-insensitive)
pub fn strip_md_ext(s: &str) -> &str {
    let ext = C::MARKDOWN_EXTENSION;
    if s.len() >= ext.len() && s.is_char_boundary(s.len() - ext.len()) && s[s.len() - ext.len()..].eq_ignore_ascii_case(ext) {
        &s[..s.len() - ext.len()]
    } else {
        s
    }
}

/// Key for a document path in the note table
pub fn note_key(rel_posix: &str) -> String {
    fold(strip_md_ext(rel_posix.replace('\\', "/").trim().trim_matches('/')))
}

/// Document table: original path (folded, no extension) → new path (no extension)
#[derive(Debug, Clone, Default)]
pub struct NoteTable {
    by_path: HashMap<String, String>,
    by_unique_stem: HashMap<String, String>,
}

impl NoteTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_path.get(key).map(String::as_str)
    }

    /// New path of the only publishable document with this (folded) stem
    pub fn get_unique_stem(&self, stem: &str) -> Option<&str> {
        self.by_unique_stem.get(stem).map(String::as_str)
    }
}

/// Media table: original path (folded) → new path, plus reference key → new path
#[derive(Debug, Clone, Default)]
pub struct MediaTable {
    by_path: HashMap<String, String>,
    by_ref: HashMap<String, String>,
}

impl MediaTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_path.get(key).map(String::as_str)
    }

    pub fn get_by_ref(&self, key: &str) -> Option<&str> {
        self.by_ref.get(key).map(String::as_str)
    }
}

/// Both tables, built once per run
#[derive(Debug, Clone, Default)]
pub struct PathMapping {
    pub notes: NoteTable,
    pub media: MediaTable,
}

impl PathMapping {
    /// New path (no extension) of a publishable document
    pub fn note_destination(&self, rel: &Path) -> Option<&str> {
        self.notes.get(&note_key(&util::display_path(rel)))
    }

    /// New path of a required media file
    pub fn media_destination(&self, rel: &Path) -> Option<&str> {
        self.media.get(&fold(&util::display_path(rel)))
    }
}

/// Computes new paths for documents and media
pub struct PathMapper<'a> {
    folder_rules: &'a [Rule],
    filters: NameFilters<'a>,
}

impl<'a> PathMapper<'a> {
    pub fn new(folder_rules: &'a [Rule], filters: NameFilters<'a>) -> Self {
        Self {
            folder_rules,
            filters,
        }
    }

    /// New path of a document, without extension.
    ///
    /// Folder rewrite rules run on the whole folder string first; an empty
    /// result flattens the document to the root.
    pub fn map_note(&self, rel: &Path) -> String {
        let folder = rel.parent().map(util::display_path).unwrap_or_default();
        let rewritten = apply_rules(&folder, self.folder_rules);
        let rewritten = SLASH_RUN.replace_all(&rewritten, "/");
        let rewritten = rewritten.trim_matches('/');

        let new_folder = if rewritten.is_empty() {
            String::new()
        } else {
            rewritten
                .split('/')
                .map(|seg| util::safe_filename(&self.filters.filter(seg, self.filters.to_dirs)))
                .filter(|seg| !seg.is_empty())
                .collect::<Vec<_>>()
                .join("/")
        };

        let file_name = util::display_path(rel.file_name().map(Path::new).unwrap_or(rel));
        let stem = strip_md_ext(&file_name);
        let stem = util::safe_filename(&self.filters.filter(stem, self.filters.to_filenames));

        if new_folder.is_empty() {
            stem
        } else {
            format!("{}/{}", new_folder, stem)
        }
    }

    /// New path of a media file; the extension is kept verbatim
    pub fn map_media(&self, rel: &Path) -> String {
        let posix = util::display_path(rel);
        let parts: Vec<&str> = posix.split('/').collect();
        let Some((file, dirs)) = parts.split_last() else {
            return posix;
        };

        let mut new_parts: Vec<String> = dirs
            .iter()
            .map(|dir| {
                if self.filters.to_dirs {
                    util::safe_filename(&self.filters.filter(dir, true))
                } else {
                    dir.to_string()
                }
            })
            .collect();

        let ext = util::suffix(file);
        let stem = &file[..file.len() - ext.len()];
        let stem = if self.filters.to_filenames {
            util::safe_filename(&self.filters.filter(stem, true))
        } else {
            stem.to_string()
        };
        new_parts.push(format!("{}{}", stem, ext));

        new_parts.join("/")
    }

    /// Build both tables.
    ///
    /// `media` maps each required media file to every reference key that
    /// resolved to it. Bodies are redacted before their links are rewritten,
    /// so each source is also registered under its redacted path and stem;
    /// a real path always wins over a redacted one.
    pub fn build(&self, notes: &[PathBuf], media: &BTreeMap<PathBuf, BTreeSet<String>>) -> PathMapping {
        let mut mapping = PathMapping::default();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut stems: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut redacted_notes: Vec<(String, String)> = Vec::new();

        for rel in notes {
            let new_path = self.map_note(rel);
            warn_on_collision(&mut claimed, format!("{}{}", new_path, C::MARKDOWN_EXTENSION), rel);

            let posix = util::display_path(rel);
            let key = note_key(&posix);
            let stem = candidate_file_name(rel);
            stems.entry(fold(strip_md_ext(&stem))).or_default().insert(key.clone());

            let redacted = apply_rules(&posix, self.filters.rules);
            if redacted != posix {
                let redacted_stem = strip_md_ext(util::file_name(&redacted));
                stems.entry(fold(redacted_stem)).or_default().insert(key.clone());
                redacted_notes.push((note_key(&redacted), key.clone()));
            }
            mapping.notes.by_path.insert(key, new_path);
        }

        for (redacted, key) in redacted_notes {
            if let Some(new_path) = mapping.notes.by_path.get(&key).cloned() {
                mapping.notes.by_path.entry(redacted).or_insert(new_path);
            }
        }

        for (stem, keys) in stems {
            let mut keys = keys.into_iter();
            if let (Some(only), None) = (keys.next(), keys.next()) {
                if let Some(new_path) = mapping.notes.by_path.get(&only) {
                    mapping.notes.by_unique_stem.insert(stem, new_path.clone());
                }
            }
        }

        let mut redacted_media: Vec<(String, String)> = Vec::new();
        for (rel, ref_keys) in media {
            let new_path = self.map_media(rel);
            warn_on_collision(&mut claimed, new_path.clone(), rel);

            let posix = util::display_path(rel);
            let redacted = apply_rules(&posix, self.filters.rules);
            if redacted != posix {
                redacted_media.push((fold(&redacted), new_path.clone()));
            }
            mapping.media.by_path.insert(fold(&posix), new_path.clone());
            for key in ref_keys {
                mapping.media.by_ref.insert(key.clone(), new_path.clone());
            }
        }

        for (redacted, new_path) in redacted_media {
            mapping.media.by_path.entry(redacted).or_insert(new_path);
        }

        mapping
    }
}

fn candidate_file_name(rel: &Path) -> String {
    rel.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Destinations are last-write-wins; say so when it happens
fn warn_on_collision(claimed: &mut HashMap<String, PathBuf>, destination: String, source: &Path) {
    if let Some(previous) = claimed.insert(fold(&destination), source.to_path_buf()) {
        warn!(
            destination = %destination,
            first = %util::display_path(&previous),
            second = %util::display_path(source),
            "two sources map to the same published path; the later one wins"
        );
    }
}
