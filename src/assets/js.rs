//! Script import inlining
//!
//! Line based: an import line naming a local file is replaced by that file's
//! contents. Inlined text is not scanned again.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::resolve_rel;
use crate::error::Result;
use crate::util;

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^\s*(?:"#,
        r#"import\s+[^"']*\s+from\s+["']([^"']+)["']"#,
        r#"|import\s*["']([^"']+)["']"#,
        r#"|export\s+\*\s+from\s+["']([^"']+)["']"#,
        r#"|export\s+\{[^}]*\}\s+from\s+["']([^"']+)["']"#,
        r#"|const\s+\w+\s*=\s*require\(\s*["']([^"']+)["']\s*\)"#,
        r#")\s*;?\s*(?://.*)?$"#,
    ))
    .unwrap()
});

/// The imported path of an import line, if the line is one
pub fn import_target(line: &str) -> Option<&str> {
    let caps = JS_IMPORT.captures(line.trim_end())?;
    caps.iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
}

/// Whether an import target names a file next to the script
fn is_local(target: &str) -> bool {
    (target.starts_with('.') || target.starts_with('/')) && !super::css::is_url_like(target)
}

/// Script inliner; one per run
#[derive(Debug, Clone)]
pub struct JsInliner {
    probe_exts: Vec<String>,
}

impl JsInliner {
    pub fn new<I, S>(probe_exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            probe_exts: probe_exts
                .into_iter()
                .map(|e| {
                    let e = e.as_ref().trim();
                    if e.starts_with('.') { e.to_string() } else { format!(".{}", e) }
                })
                .collect(),
        }
    }

    /// Inline the local imports of the script at `path`
    pub fn inline_file(&self, path: &Path) -> Result<String> {
        let text = util::read_text(path)?;
        Ok(self.inline(&text, path))
    }

    /// Inline the local imports of `text`, a script located at `base_file`
    pub fn inline(&self, text: &str, base_file: &Path) -> String {
        let mut out: Vec<String> = Vec::new();

        for line in text.lines() {
            let target = import_target(line).filter(|t| is_local(t));
            let Some(resolved) = target.and_then(|t| self.resolve(base_file, t)) else {
                out.push(line.to_string());
                continue;
            };

            match util::read_text(&resolved) {
                Ok(contents) => {
                    debug!("[scripts] inlined {}", util::display_path(&resolved));
                    out.push(contents);
                }
                Err(e) => {
                    warn!("[scripts] could not read imported script: {}", e);
                    out.push(line.to_string());
                }
            }
        }

        out.join("\n")
    }

    /// Locate an import target, probing extensions when it has none
    fn resolve(&self, base_file: &Path, target: &str) -> Option<PathBuf> {
        let direct = resolve_rel(base_file, target);
        if direct.is_file() {
            return Some(direct);
        }
        if !util::suffix(target).is_empty() {
            return None;
        }
        self.probe_exts
            .iter()
            .map(|ext| resolve_rel(base_file, &format!("{}{}", target, ext)))
            .find(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants as C;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_import_shapes() {
        assert_eq!(import_target("import { a } from './a.js';"), Some("./a.js"));
        assert_eq!(import_target("import x from \"../x\" // note"), Some("../x"));
        assert_eq!(import_target("  import './side.js'"), Some("./side.js"));
        assert_eq!(import_target("export * from './all.mjs';"), Some("./all.mjs"));
        assert_eq!(import_target("export { b, c } from './bc.js';"), Some("./bc.js"));
        assert_eq!(import_target("const d = require('./d.js');"), Some("./d.js"));
        assert_eq!(import_target("let d = require('./d.js');"), None);
        assert_eq!(import_target("console.log('import x from \"y\"')"), None);
    }

    #[test]
    fn test_inline_local_imports() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("lib/util.mjs"), "export const u = 1;\nimport './nested.js';").unwrap();
        let main = temp.path().join("publish.js");
        fs::write(
            &main,
            "import { u } from './lib/util';\nimport 'https://cdn.example/x.js';\nimport lodash from 'lodash';\nimport './missing.js';\nconsole.log(u);\n",
        )
        .unwrap();

        let out = JsInliner::new(C::DEFAULT_JS_PROBE_EXTS).inline_file(&main).unwrap();
        assert_eq!(
            out,
            "export const u = 1;\nimport './nested.js';\nimport 'https://cdn.example/x.js';\nimport lodash from 'lodash';\nimport './missing.js';\nconsole.log(u);"
        );
    }

    #[test]
    fn test_root_relative_import() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.js"), "let a;").unwrap();
        let out = JsInliner::new([".js"]).inline("import '/a.js';", &temp.path().join("main.js"));
        assert_eq!(out, "let a;");
    }
}
