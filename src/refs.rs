//! Reference extraction
//!
//! Finds every reference a document body makes, in the two surface syntaxes:
//!
//! - wiki links `[[target#heading|alias]]`, embeds `![[...]]`
//! - bracketed labels `[label](href)`, embeds `![label](href)`
//!
//! Nothing is resolved here. The parsing helpers are shared with the
//! rewriter so both sides agree on where a target starts and ends.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util;

pub(crate) static WIKILINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(!?)\[\[([^\]]+)\]\]").unwrap());

pub(crate) static MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?)\[(.*?)\]\(([^)]+)\)").unwrap());

/// Prefixes of hrefs that never point into the vault
const EXTERNAL_PREFIXES: &[&str] = &["http:", "https:", "data:", "mailto:", "#"];

/// Which surface syntax a reference was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Wiki,
    Markdown,
}

/// A raw reference found in a document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Target with alias and heading removed
    pub target: String,
    /// Whether the last segment of `target` carries an extension
    pub has_extension: bool,
    /// Whether the reference asks for the target to be rendered inline
    pub is_embed: bool,
    pub syntax: Syntax,
}

impl Reference {
    fn new(target: &str, is_embed: bool, syntax: Syntax) -> Self {
        Self {
            target: target.to_string(),
            has_extension: !util::suffix(target).is_empty(),
            is_embed,
            syntax,
        }
    }
}

/// Split `target|alias`
pub fn split_alias(inner: &str) -> (&str, Option<&str>) {
    match inner.split_once('|') {
        Some((left, alias)) => (left.trim(), Some(alias.trim())),
        None => (inner.trim(), None),
    }
}

/// Split `target#heading`
pub fn split_heading(left: &str) -> (&str, Option<&str>) {
    match left.split_once('#') {
        Some((target, heading)) => (target.trim(), Some(heading.trim())),
        None => (left.trim(), None),
    }
}

/// Whether an href points outside the vault (web, data, mail, in-page)
pub(crate) fn is_external(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Extract every reference from `text`, a document located in `note_dir`.
///
/// `note_dir` is only consulted for hrefs containing a space: when such an
/// href does not name an existing file, everything after the first space is
/// treated as a title and dropped.
pub fn extract(text: &str, note_dir: &Path) -> Vec<Reference> {
    let mut refs = Vec::new();

    for caps in WIKILINK.captures_iter(text) {
        let is_embed = !caps[1].is_empty();
        let (left, _) = split_alias(&caps[2]);
        let (target, _) = split_heading(left);
        if target.is_empty() {
            continue;
        }
        refs.push(Reference::new(target, is_embed, Syntax::Wiki));
    }

    for caps in MD_LINK.captures_iter(text) {
        let is_embed = !caps[1].is_empty();
        let href = caps[3].trim();
        if href.is_empty() || is_external(href) {
            continue;
        }

        let href = href.split_once('#').map(|(path, _)| path).unwrap_or(href);
        let href = match href.split_once(' ') {
            Some((first, _)) if !note_dir.join(href).exists() => first,
            _ => href,
        };
        if href.is_empty() {
            continue;
        }
        refs.push(Reference::new(href, is_embed, Syntax::Markdown));
    }

    refs
}
