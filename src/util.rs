//! Utility functions for secure path handling and common operations

use std::fs;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants as C;
use crate::error::{PublishError, Result};

/// Characters that are illegal in file names on at least one platform
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\0'];

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Ensure `target` resolves to a location inside `root`.
///
/// Both paths are resolved through symlinks where they exist; the part of
/// `target` that does not exist yet is normalized lexically. Returns the
/// resolved target.
pub fn ensure_within_root(root: &Path, target: &Path) -> Result<PathBuf> {
    let canonical_root = resolve_existing_prefix(root);
    let canonical_target = resolve_existing_prefix(target);

    if !canonical_target.starts_with(&canonical_root) {
        return Err(PublishError::OutsidePublishRoot {
            target: canonical_target,
            root: canonical_root,
        });
    }

    Ok(canonical_target)
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);

    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        // Use dunce::canonicalize to avoid UNC prefix on Windows
        if let Ok(canonical) = dunce::canonicalize(existing) {
            let mut out = canonical;
            for part in rest.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// Collapse `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Collapse `target` against the directory of the vault-relative document
/// `base_rel_doc`, returning a vault-relative posix path.
///
/// A target starting with `/` is taken as vault-absolute. `..` never climbs
/// above the vault root.
pub fn collapse_rel_path(base_rel_doc: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let mut stack: Vec<String> = Vec::new();

    if !target.starts_with('/') {
        let base = base_rel_doc.replace('\\', "/");
        if let Some((dir, _)) = base.rsplit_once('/') {
            push_segments(&mut stack, dir);
        }
    }
    push_segments(&mut stack, &target);

    stack.join("/")
}

fn push_segments(stack: &mut Vec<String>, path: &str) {
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(part.to_string()),
        }
    }
}

/// Replace illegal file name characters, collapse whitespace and trailing dots
pub fn safe_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if ILLEGAL_NAME_CHARS.contains(&c) { '-' } else { c })
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    let trimmed = collapsed.trim().trim_end_matches('.');

    if trimmed.is_empty() {
        C::UNTITLED_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last segment of a `/` or `\` separated reference
pub fn file_name(reference: &str) -> &str {
    reference
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(reference)
}

/// Extension of the last segment including the dot, or `""`.
///
/// Leading-dot names (`.env`) and names ending in a dot have no extension.
pub fn suffix(reference: &str) -> &str {
    let name = file_name(reference);
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => &name[i..],
        _ => "",
    }
}

/// Last segment without its extension
pub fn stem(reference: &str) -> &str {
    let name = file_name(reference);
    let ext = suffix(name);
    &name[..name.len() - ext.len()]
}

/// Whether any component of a vault-relative path is hidden
pub fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(part) => part.to_string_lossy().starts_with(C::HIDDEN_PREFIX),
        _ => false,
    })
}

/// Whether a path ends in the document extension (case-insensitive)
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&C::MARKDOWN_EXTENSION[1..]))
        .unwrap_or(false)
}

/// Read a text file, substituting invalid UTF-8 instead of failing
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| PublishError::io(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            debug!(path = %display_path(path), "invalid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

/// Display a path with forward slashes (cross-platform standard)
/// Converts Windows backslashes to forward slashes for consistent output
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
