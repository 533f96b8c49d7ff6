//! Stylesheet import processing
//!
//! A single pass over the stylesheet that understands just enough CSS to
//! find `@charset` and `@import` outside comments and string literals.
//! `@charset` is always dropped. A local `@import` whose file exists is
//! inlined one level deep; every other import is hoisted to the top of the
//! output (deduplicated) or left where it is.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::resolve_rel;
use crate::error::Result;
use crate::util;

/// Imports found inside an inlined file are never themselves inlined
const MAX_INLINE_DEPTH: usize = 1;

static URL_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// Whether an import target points at the network rather than a local file
pub fn is_url_like(target: &str) -> bool {
    let target = target.trim();
    target.starts_with("//") || URL_SCHEME.is_match(target)
}

/// Extract the target of an `@import` statement and whether it used `url(...)`
pub fn parse_import_path(stmt: &str) -> Option<(String, bool)> {
    let s = stmt.trim();
    if !s.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("@import")) {
        return None;
    }
    let s = s[7..].trim();

    if s.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("url(")) {
        let mut inside = s[4..].trim();
        if let Some(stripped) = inside.strip_suffix(';') {
            inside = stripped.trim_end();
        }
        // `url(x) screen;` keeps media queries after the paren
        if let Some(close) = inside.find(')') {
            inside = inside[..close].trim_end();
        }
        let unquoted = ['"', '\'']
            .iter()
            .find_map(|&q| inside.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)))
            .unwrap_or(inside);
        return Some((unquoted.trim().to_string(), true));
    }

    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &s[1..];
    let end = rest.find(quote)?;
    Some((rest[..end].trim().to_string(), false))
}

/// Stylesheet processor; one per run
#[derive(Debug, Clone, Copy)]
pub struct CssProcessor {
    hoist_imports: bool,
}

impl CssProcessor {
    pub fn new(hoist_imports: bool) -> Self {
        Self { hoist_imports }
    }

    /// Process the stylesheet at `path` into its final text
    pub fn inline_file(&self, path: &Path) -> Result<String> {
        let text = util::read_text(path)?;
        let (imports, body) = self.process(&text, path, 0)?;
        for import in &imports {
            debug!("[styles] hoisted: {}", import);
        }
        Ok(render(&imports, &body))
    }

    /// Process stylesheet `text` located at `base_file`.
    ///
    /// Returns the hoisted imports and the remaining body. Only at a depth
    /// below the inline limit are local imports replaced by file contents.
    pub fn process(&self, text: &str, base_file: &Path, depth: usize) -> Result<(Vec<String>, String)> {
        let bytes = text.as_bytes();
        let n = bytes.len();
        let mut body = String::with_capacity(text.len());
        let mut hoisted: Vec<String> = Vec::new();

        let mut i = 0;
        let mut mark = 0;
        while i < n {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_comment(bytes, i);
                }
                b'"' | b'\'' => {
                    i = skip_string(bytes, i);
                }
                b'@' if starts_with_ignore_case(&bytes[i..], b"@charset") => {
                    body.push_str(&text[mark..i]);
                    i = end_of_charset(bytes, i);
                    mark = i;
                }
                b'@' if starts_with_ignore_case(&bytes[i..], b"@import") => {
                    body.push_str(&text[mark..i]);
                    let end = end_of_import(bytes, i);
                    let stmt = &text[i..end];
                    self.handle_import(stmt, base_file, depth, &mut hoisted, &mut body)?;
                    i = end;
                    mark = i;
                }
                _ => i += 1,
            }
        }
        body.push_str(&text[mark..]);

        if self.hoist_imports {
            let mut seen = std::collections::HashSet::new();
            hoisted.retain(|stmt| seen.insert(stmt.clone()));
        }

        Ok((hoisted, body))
    }

    fn handle_import(
        &self,
        stmt: &str,
        base_file: &Path,
        depth: usize,
        hoisted: &mut Vec<String>,
        body: &mut String,
    ) -> Result<()> {
        let local = parse_import_path(stmt)
            .map(|(path, _)| path)
            .filter(|path| !path.is_empty() && !is_url_like(path) && depth < MAX_INLINE_DEPTH)
            .map(|path| (resolve_rel(base_file, &path), path));

        if let Some((target, path)) = local {
            if target.is_file() {
                let sub_text = util::read_text(&target)?;
                let (sub_imports, sub_body) = self.process(&sub_text, &target, depth + 1)?;
                debug!("[styles] inlined {} from {}", path, util::display_path(&target));
                if self.hoist_imports {
                    hoisted.extend(sub_imports);
                } else if !sub_imports.is_empty() {
                    body.push_str(&sub_imports.join("\n"));
                    body.push('\n');
                }
                body.push_str(&sub_body);
                return Ok(());
            }
            debug!(
                "[styles] unresolved import: {} from {}",
                path,
                util::display_path(base_file)
            );
        }

        if self.hoist_imports {
            hoisted.push(stmt.trim().to_string());
        } else {
            body.push_str(stmt);
        }
        Ok(())
    }
}

/// Final stylesheet text: hoisted block, blank line, trimmed body
pub fn render(imports: &[String], body: &str) -> String {
    if imports.is_empty() {
        format!("{}\n", body.trim())
    } else {
        format!("{}\n\n{}\n", imports.join("\n"), body.trim())
    }
}

fn starts_with_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

/// Index just past the `*/` closing the comment opened at `start`
fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut j = start + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return j + 2;
        }
        j += 1;
    }
    bytes.len()
}

/// Index just past the closing quote of the string opened at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' if j + 1 < bytes.len() => j += 2,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Index just past the `;` ending the `@charset` at `start`
fn end_of_charset(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'"' | b'\'' => j = skip_string(bytes, j),
            b';' => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Index just past the `;` ending the `@import` at `start`; semicolons
/// inside parentheses and strings do not count
fn end_of_import(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    let mut paren_depth = 0usize;
    while j < bytes.len() {
        match bytes[j] {
            b'"' | b'\'' => {
                j = skip_string(bytes, j);
                continue;
            }
            b'(' => paren_depth += 1,
            b')' => paren_depth = paren_depth.saturating_sub(1),
            b';' if paren_depth == 0 => return j + 1,
            _ => {}
        }
        j += 1;
    }
    bytes.len()
}
