//! Frontmatter parsing and publish selection
//!
//! A document opts into publishing through a boolean in its YAML
//! frontmatter. Hand-edited vaults contain plenty of frontmatter that is not
//! valid YAML, so a line-based `key: value` reader is used as a fallback.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::constants as C;
use crate::error::Result;
use crate::util;

static FRONTMATTER_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*").unwrap());

/// Split content into its frontmatter text (if any) and body
pub fn split(content: &str) -> (Option<&str>, &str) {
    match FRONTMATTER_BLOCK.captures(content) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (caps.get(1).map(|m| m.as_str()), &content[whole..])
        }
        None => (None, content),
    }
}

/// Parse the metadata block of a document into a mapping.
///
/// Missing, oversized or unparseable blocks yield an empty mapping.
pub fn metadata(content: &str) -> Mapping {
    let Some(block) = split(content).0 else {
        return Mapping::new();
    };

    // Check frontmatter size before parsing
    if block.len() > C::MAX_FRONTMATTER_SIZE {
        return Mapping::new();
    }

    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(map)) => map,
        _ => parse_lines(block),
    }
}

/// Line-based fallback for frontmatter that is not valid YAML
fn parse_lines(block: &str) -> Mapping {
    let mut map = Mapping::new();

    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');

        let value = match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Value::Bool(true),
            "false" | "no" | "off" | "0" => Value::Bool(false),
            _ => Value::String(value.to_string()),
        };
        map.insert(Value::String(key.to_string()), value);
    }

    map
}

/// Whether `key` is present and exactly boolean `true`
pub fn flag_is_true(meta: &Mapping, key: &str) -> bool {
    matches!(meta.get(key), Some(Value::Bool(true)))
}

/// Whether the document at `path` is opted into publishing by `flag`
pub fn should_publish(path: &Path, flag: &str) -> Result<bool> {
    let content = util::read_text(path)?;
    let meta = metadata(&content);
    let ok = flag_is_true(&meta, flag);

    debug!(
        "[sel] {} {}: {}={:?}",
        if ok { "PASS" } else { "skip" },
        util::display_path(path.file_name().map(Path::new).unwrap_or(path)),
        flag,
        meta.get(flag)
    );

    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        let content = "---\npublish: true\n---\n# Title\n";
        let (fm, body) = split(content);
        assert_eq!(fm, Some("publish: true"));
        assert_eq!(body, "# Title\n");

        let (fm, body) = split("# No frontmatter\n");
        assert_eq!(fm, None);
        assert_eq!(body, "# No frontmatter\n");
    }

    #[test]
    fn test_yaml_metadata() {
        let meta = metadata("---\npublish: true\ntags: [a, b]\n---\nbody");
        assert!(flag_is_true(&meta, "publish"));
    }

    #[test]
    fn test_string_true_is_not_publish() {
        let meta = metadata("---\npublish: \"true\"\n---\nbody");
        assert!(!flag_is_true(&meta, "publish"));
    }

    #[test]
    fn test_fallback_parser() {
        // Not valid YAML: a tab-indented mapping after a scalar
        let meta = metadata("---\ntitle: a: b: c\npublish: yes\n\t- broken\n---\nbody");
        assert!(flag_is_true(&meta, "publish"));
    }

    #[test]
    fn test_missing_frontmatter() {
        assert!(metadata("just text").is_empty());
        assert!(!flag_is_true(&metadata("just text"), "publish"));
    }

    #[test]
    fn test_should_publish() {
        let temp = tempfile::TempDir::new().unwrap();
        let yes = temp.path().join("yes.md");
        let no = temp.path().join("no.md");
        std::fs::write(&yes, "---\npublish: true\n---\n").unwrap();
        std::fs::write(&no, "---\npublish: false\n---\n").unwrap();
        assert!(should_publish(&yes, "publish").unwrap());
        assert!(!should_publish(&no, "publish").unwrap());
    }
}
