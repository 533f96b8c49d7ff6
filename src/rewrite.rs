//! Link rewriting
//!
//! Rewrites the references of one document body against the path tables.
//! Wiki links are handled first, then bracketed-label links; the two passes
//! share one policy:
//!
//! - a media target is only rewritten when embedded
//! - a media target that cannot be mapped keeps its markup
//! - a document target that cannot be mapped is dropped (embed) or reduced
//!   to its display text (plain link)

use regex::Captures;
use tracing::debug;

use crate::config::MediaExts;
use crate::mapper::{self, PathMapping};
use crate::normalize::fold;
use crate::refs::{self, MD_LINK, WIKILINK};
use crate::util;

/// Rewrites document bodies for one run
pub struct Rewriter<'a> {
    mapping: &'a PathMapping,
    media_exts: &'a MediaExts,
    md_root_dir: &'a str,
}

impl<'a> Rewriter<'a> {
    pub fn new(mapping: &'a PathMapping, media_exts: &'a MediaExts, md_root_dir: &'a str) -> Self {
        Self {
            mapping,
            media_exts,
            md_root_dir: md_root_dir.trim_matches('/'),
        }
    }

    /// Rewrite every reference in `body`, a document at `current_rel_doc`
    /// (vault-relative, posix)
    pub fn rewrite(&self, body: &str, current_rel_doc: &str) -> String {
        let body = self.rewrite_wikilinks(body, current_rel_doc);
        self.rewrite_md_links(&body, current_rel_doc)
    }

    /// Rewrite `[[...]]` and `![[...]]`
    pub fn rewrite_wikilinks(&self, body: &str, current_rel_doc: &str) -> String {
        WIKILINK
            .replace_all(body, |caps: &Captures| {
                let original = &caps[0];
                let is_embed = !caps[1].is_empty();
                let (left, alias) = refs::split_alias(&caps[2]);
                let (target, heading) = refs::split_heading(left);
                if target.is_empty() {
                    return original.to_string();
                }

                let heading = heading.map(|h| format!("#{}", h)).unwrap_or_default();
                let alias_part = alias.map(|a| format!("|{}", a)).unwrap_or_default();

                if let Some(new_rel) = self.media_target(current_rel_doc, target) {
                    if !is_embed {
                        return original.to_string();
                    }
                    return match new_rel {
                        Some(new_rel) => {
                            format!("![[{}{}{}]]", self.published(new_rel), heading, alias_part)
                        }
                        None => {
                            debug!("[link] unmapped media embed kept: {}", original);
                            original.to_string()
                        }
                    };
                }

                match self.note_target(current_rel_doc, target) {
                    Some(new_noext) => format!(
                        "{}[[{}{}{}]]",
                        if is_embed { "!" } else { "" },
                        new_noext,
                        heading,
                        alias_part
                    ),
                    None => {
                        debug!("[link] unresolved document reference: {}", original);
                        if is_embed {
                            String::new()
                        } else {
                            alias
                                .map(str::to_string)
                                .unwrap_or_else(|| format!("{}{}", target, heading))
                        }
                    }
                }
            })
            .into_owned()
    }

    /// Rewrite `[label](href)` and `![label](href)`
    pub fn rewrite_md_links(&self, body: &str, current_rel_doc: &str) -> String {
        MD_LINK
            .replace_all(body, |caps: &Captures| {
                let original = &caps[0];
                let is_embed = !caps[1].is_empty();
                let label = &caps[2];
                let href = caps[3].trim();
                if href.is_empty() || refs::is_external(href) {
                    return original.to_string();
                }

                let (path, fragment) = match href.find('#') {
                    Some(i) => (&href[..i], &href[i..]),
                    None => (href, ""),
                };
                let path = path.trim();
                if path.is_empty() {
                    return original.to_string();
                }

                // `path "title"`: the title is carried over verbatim
                let (path, title) = match path.split_once(' ') {
                    Some((first, rest))
                        if self.media_target(current_rel_doc, path).is_none()
                            && self.note_target(current_rel_doc, path).is_none() =>
                    {
                        (first, format!(" {}", rest))
                    }
                    _ => (path, String::new()),
                };

                if let Some(new_rel) = self.media_target(current_rel_doc, path) {
                    if !is_embed {
                        return original.to_string();
                    }
                    return match new_rel {
                        Some(new_rel) => format!(
                            "![{}]({}{}{})",
                            label,
                            self.published(new_rel),
                            fragment,
                            title
                        ),
                        None => {
                            debug!("[link] unmapped media embed kept: {}", original);
                            original.to_string()
                        }
                    };
                }

                match self.note_target(current_rel_doc, path) {
                    Some(new_noext) => format!(
                        "{}[{}]({}.md{}{})",
                        if is_embed { "!" } else { "" },
                        label,
                        self.published(new_noext),
                        fragment,
                        title
                    ),
                    None => {
                        debug!("[link] unresolved document reference: {}", original);
                        if is_embed {
                            String::new()
                        } else {
                            label.to_string()
                        }
                    }
                }
            })
            .into_owned()
    }

    /// Classify `target` as media.
    ///
    /// Returns `None` when the target is not media, `Some(None)` when it is
    /// media without a mapping, and `Some(Some(path))` when it maps.
    /// Extensionless targets count as media only when the resolution pass
    /// recorded them against a media file.
    fn media_target(&self, current_rel_doc: &str, target: &str) -> Option<Option<&'a str>> {
        let by_ref = self
            .mapping
            .media
            .get_by_ref(&mapper::media_ref_key(current_rel_doc, target));

        if self.media_exts.is_media(target) {
            let by_path = || {
                self.mapping
                    .media
                    .get(&fold(&util::collapse_rel_path(current_rel_doc, target)))
            };
            return Some(by_ref.or_else(by_path));
        }

        if util::suffix(target).is_empty() && self.note_target(current_rel_doc, target).is_none() {
            return by_ref.map(Some);
        }
        None
    }

    /// New path (no extension) of a document target
    fn note_target(&self, current_rel_doc: &str, target: &str) -> Option<&'a str> {
        if self.media_exts.is_media(target) {
            return None;
        }
        let notes = &self.mapping.notes;

        let collapsed = mapper::note_key(&util::collapse_rel_path(current_rel_doc, target));
        let direct = mapper::note_key(target);
        let stem = fold(mapper::strip_md_ext(util::file_name(target.trim())));

        notes
            .get(&collapsed)
            .or_else(|| notes.get(&direct))
            .or_else(|| notes.get_unique_stem(&stem))
    }

    /// Path under the published root directory
    fn published(&self, new_rel: &str) -> String {
        if self.md_root_dir.is_empty() {
            new_rel.to_string()
        } else {
            format!("{}/{}", self.md_root_dir, new_rel)
        }
    }
}
