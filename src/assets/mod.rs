//! Site assets: stylesheet, script, logos and favicons
//!
//! Sources live in a configured assets directory; results land at the top
//! of the published root.

pub mod css;
pub mod js;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

pub use css::CssProcessor;
pub use js::JsInliner;

use crate::constants as C;
use crate::error::{PublishError, Result};
use crate::output::PublishRoot;
use crate::util;

/// What the asset step produced
#[derive(Debug, Clone, Default)]
pub struct AssetReport {
    /// Every destination written, for the prune keep set
    pub written: Vec<PathBuf>,
    pub css: bool,
    pub js: bool,
    pub logos: usize,
    pub favicons: usize,
}

/// Resolve an import target against the directory of `base_file`.
///
/// A leading `/` means the directory of `base_file`, not the filesystem root.
pub(crate) fn resolve_rel(base_file: &Path, target: &str) -> PathBuf {
    let base_dir = base_file.parent().unwrap_or(Path::new(""));
    util::normalize_lexically(&base_dir.join(target.trim_start_matches('/')))
}

/// Modification time for debug output
fn fmt_mtime(path: &Path) -> String {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| "n/a".to_string())
}

/// Build every asset found in `assets_dir` into the published root
pub fn build_assets(
    assets_dir: &Path,
    out: &PublishRoot,
    css: &CssProcessor,
    js: &JsInliner,
) -> Result<AssetReport> {
    let mut report = AssetReport::default();

    let css_src = assets_dir.join(C::PUBLISH_CSS);
    let css_dst = out.join(C::PUBLISH_CSS);
    if css_src.is_file() {
        let text = css.inline_file(&css_src)?;
        out.write(&css_dst, text.as_bytes())?;
        debug!("[assets] {} ({}) -> {}", C::PUBLISH_CSS, fmt_mtime(&css_src), out.display(&css_dst));
        report.written.push(css_dst);
        report.css = true;
    } else {
        remove_stale(out, &css_dst)?;
    }

    let js_src = assets_dir.join(C::PUBLISH_JS);
    let js_dst = out.join(C::PUBLISH_JS);
    if js_src.is_file() {
        let text = js.inline_file(&js_src)?;
        out.write(&js_dst, text.as_bytes())?;
        debug!("[assets] {} ({}) -> {}", C::PUBLISH_JS, fmt_mtime(&js_src), out.display(&js_dst));
        report.written.push(js_dst);
        report.js = true;
    } else {
        remove_stale(out, &js_dst)?;
    }

    for logo in logo_files(assets_dir)? {
        let Some(name) = logo.file_name() else { continue };
        let dst = out.join(name);
        out.copy(&logo, &dst)?;
        debug!("[assets] logo ({}) -> {}", fmt_mtime(&logo), out.display(&dst));
        report.written.push(dst);
        report.logos += 1;
    }

    for name in C::FAVICONS {
        let src = assets_dir.join(name);
        if src.is_file() {
            let dst = out.join(name);
            out.copy(&src, &dst)?;
            debug!("[assets] favicon ({}) -> {}", fmt_mtime(&src), out.display(&dst));
            report.written.push(dst);
            report.favicons += 1;
        }
    }

    Ok(report)
}

/// Remove a generated asset whose source has gone away
fn remove_stale(out: &PublishRoot, dst: &Path) -> Result<()> {
    if dst.exists() {
        out.remove_file(dst)?;
        debug!("[assets] removed stale {}", out.display(dst));
    }
    Ok(())
}

/// `logo.*` files in `dir`, sorted
fn logo_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut logos = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PublishError::io(dir, e))? {
        let entry = entry.map_err(|e| PublishError::io(dir, e))?;
        let path = entry.path();
        let is_logo = entry
            .file_name()
            .to_string_lossy()
            .starts_with(C::LOGO_PREFIX);
        if is_logo && path.is_file() {
            logos.push(path);
        }
    }
    logos.sort();
    Ok(logos)
}
