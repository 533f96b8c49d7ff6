//! Publish configuration
//!
//! Handles locating and loading the build configuration with support for:
//! - An explicit `--config` path
//! - The `VAULT_PUBLISH_CONFIG` environment variable
//! - Well-known file names in the working directory (YAML or JSON)
//! - Built-in defaults when nothing is found
//!
//! Regex rules are compiled exactly once here; nothing downstream sees a
//! pattern string or a flag name.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::constants as C;
use crate::error::{PublishError, Result};
use crate::util;

/// How far the candidate search may leave the referencing document's folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// The document's folder and everything below it
    #[default]
    Subtree,
    /// Additionally every ancestor folder, then the whole vault
    #[serde(alias = "tree-wide")]
    Vault,
}

/// A rewrite rule as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSpec {
    pub pattern: Option<String>,
    #[serde(default)]
    pub replacement: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Match flags accepted on a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFlag {
    IgnoreCase,
    MultiLine,
    DotAll,
    Verbose,
}

impl FromStr for MatchFlag {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IGNORECASE" | "I" => Ok(MatchFlag::IgnoreCase),
            "MULTILINE" | "M" => Ok(MatchFlag::MultiLine),
            "DOTALL" | "S" => Ok(MatchFlag::DotAll),
            "VERBOSE" | "X" => Ok(MatchFlag::Verbose),
            _ => Err(()),
        }
    }
}

/// A compiled pattern/replacement pair
#[derive(Debug, Clone)]
pub struct Rule {
    regex: Regex,
    replacement: String,
}

impl Rule {
    /// Build a rule from a pattern, a back-reference style replacement
    /// (`\1`, `\g<name>`) and match flags
    pub fn new(
        pattern: &str,
        replacement: &str,
        flags: &[MatchFlag],
    ) -> std::result::Result<Self, regex::Error> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags {
            match flag {
                MatchFlag::IgnoreCase => builder.case_insensitive(true),
                MatchFlag::MultiLine => builder.multi_line(true),
                MatchFlag::DotAll => builder.dot_matches_new_line(true),
                MatchFlag::Verbose => builder.ignore_whitespace(true),
            };
        }
        Ok(Self {
            regex: builder.build()?,
            replacement: translate_replacement(replacement),
        })
    }

    /// Compile the `index`th entry of the rule list named `field`
    pub fn compile(spec: &RuleSpec, field: &str, index: usize) -> Result<Self> {
        let pattern = spec.pattern.as_deref().ok_or_else(|| PublishError::MissingPattern {
            field: field.to_string(),
            index,
        })?;

        let mut flags = Vec::with_capacity(spec.flags.len());
        for name in &spec.flags {
            let flag = name.parse::<MatchFlag>().map_err(|_| PublishError::UnknownFlag {
                field: field.to_string(),
                index,
                flag: name.to_ascii_uppercase(),
            })?;
            flags.push(flag);
        }

        Rule::new(pattern, spec.replacement.as_deref().unwrap_or(""), &flags).map_err(|source| {
            PublishError::InvalidRegex {
                field: field.to_string(),
                index,
                source,
            }
        })
    }

    /// Replace every match in `text`
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.regex.replace_all(text, self.replacement.as_str())
    }
}

/// Apply an ordered rule list to `text`
pub fn apply_rules(text: &str, rules: &[Rule]) -> String {
    let mut out = text.to_string();
    for rule in rules {
        if let Cow::Owned(replaced) = rule.apply(&out) {
            out = replaced;
        }
    }
    out
}

/// Compile a whole rule list, failing on the first broken entry
pub fn compile_rules(specs: &[RuleSpec], field: &str) -> Result<Vec<Rule>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| Rule::compile(spec, field, index))
        .collect()
}

/// Translate `\1`, `\g<name>`, `\n`, `\t`, `\\` replacements to `regex` syntax
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    let mut group = String::new();
                    while let Some(d) = chars.peek().copied().filter(|d| d.is_ascii_digit()) {
                        if group.len() == 2 {
                            break;
                        }
                        group.push(d);
                        chars.next();
                    }
                    out.push_str(&format!("${{{}}}", group));
                }
                Some('g') => {
                    chars.next();
                    if chars.peek() == Some(&'<') {
                        chars.next();
                        let name: String = chars.by_ref().take_while(|&c| c != '>').collect();
                        out.push_str(&format!("${{{}}}", name));
                    } else {
                        out.push_str("\\g");
                    }
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some('r') => {
                    chars.next();
                    out.push('\r');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    out
}

/// Recognized media extensions (lower-case, with leading dot)
#[derive(Debug, Clone)]
pub struct MediaExts(HashSet<String>);

impl MediaExts {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            exts.into_iter()
                .map(|e| {
                    let e = e.as_ref().trim().to_lowercase();
                    if e.starts_with('.') { e } else { format!(".{}", e) }
                })
                .collect(),
        )
    }

    /// Whether `ext` (with leading dot, any case) is a media extension
    pub fn contains(&self, ext: &str) -> bool {
        !ext.is_empty() && self.0.contains(&ext.to_lowercase())
    }

    /// Whether a reference or file name ends in a media extension
    pub fn is_media(&self, reference: &str) -> bool {
        self.contains(util::suffix(reference))
    }
}

impl Default for MediaExts {
    fn default() -> Self {
        Self::new(C::DEFAULT_MEDIA_EXTS)
    }
}

/// Configuration as written on disk; every key is optional
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub vault: PathBuf,
    pub publish: PathBuf,
    pub md_root_dir: String,
    pub scope: Scope,
    pub always_root: Vec<String>,
    pub include_hidden: bool,
    pub dry_run: bool,
    pub debug: bool,
    pub list_selected: bool,
    pub publish_flag: String,
    pub media_exts: Vec<String>,
    pub apply_filters_to_filenames: bool,
    pub apply_filters_to_dirs: bool,
    pub md_folderpath_rewrite: Vec<RuleSpec>,
    pub global_contents_filter: Vec<RuleSpec>,
    pub css_hoist_imports_top: bool,
    pub assets_dir: Option<PathBuf>,
    pub js_probe_exts: Vec<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            vault: PathBuf::from(C::DEFAULT_VAULT),
            publish: PathBuf::from(C::DEFAULT_PUBLISH),
            md_root_dir: C::DEFAULT_MD_ROOT_DIR.to_string(),
            scope: Scope::default(),
            always_root: Vec::new(),
            include_hidden: false,
            dry_run: false,
            debug: false,
            list_selected: false,
            publish_flag: C::DEFAULT_PUBLISH_FLAG.to_string(),
            media_exts: C::DEFAULT_MEDIA_EXTS.iter().map(|s| s.to_string()).collect(),
            apply_filters_to_filenames: true,
            apply_filters_to_dirs: true,
            md_folderpath_rewrite: Vec::new(),
            global_contents_filter: Vec::new(),
            css_hoist_imports_top: true,
            assets_dir: None,
            js_probe_exts: C::DEFAULT_JS_PROBE_EXTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub vault: Option<PathBuf>,
    pub publish: Option<PathBuf>,
    pub dry_run: bool,
    pub debug: bool,
}

impl ConfigFile {
    /// Find the config file to use, by priority
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: --config
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        // Priority 2: environment variable (empty counts as unset)
        if let Some(path) = std::env::var(C::ENV_CONFIG).ok().filter(|s| !s.is_empty()) {
            return Some(PathBuf::from(path));
        }

        // Priority 3: well-known names in the working directory
        C::CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// Load the config, falling back to defaults when no file is found
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a config file, choosing JSON or YAML by extension
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PublishError::ConfigNotFound(path.to_path_buf()));
        }
        let text = util::read_text(path)?;
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parse_error = |message: String| PublishError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };

        let config = if is_json {
            serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?
        } else if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?
        };

        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(vault) = &overrides.vault {
            self.vault = vault.clone();
        }
        if let Some(publish) = &overrides.publish {
            self.publish = publish.clone();
        }
        self.dry_run |= overrides.dry_run;
        self.debug |= overrides.debug;
        self
    }

    /// Validate and compile into the form the pipeline consumes
    pub fn compile(self) -> Result<PublishConfig> {
        let folder_rules = compile_rules(&self.md_folderpath_rewrite, "md_folderpath_rewrite")?;
        let content_rules = compile_rules(&self.global_contents_filter, "global_contents_filter")?;

        Ok(PublishConfig {
            vault: self.vault,
            publish: self.publish,
            md_root_dir: self.md_root_dir.trim_matches('/').to_string(),
            scope: self.scope,
            always_root: self.always_root,
            include_hidden: self.include_hidden,
            dry_run: self.dry_run,
            debug: self.debug,
            list_selected: self.list_selected,
            publish_flag: self.publish_flag,
            media_exts: MediaExts::new(&self.media_exts),
            apply_filters_to_filenames: self.apply_filters_to_filenames,
            apply_filters_to_dirs: self.apply_filters_to_dirs,
            folder_rules,
            content_rules,
            css_hoist_imports: self.css_hoist_imports_top,
            assets_dir: self.assets_dir,
            js_probe_exts: self.js_probe_exts,
        })
    }
}

/// Fully validated configuration with compiled rules
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub vault: PathBuf,
    pub publish: PathBuf,
    pub md_root_dir: String,
    pub scope: Scope,
    pub always_root: Vec<String>,
    pub include_hidden: bool,
    pub dry_run: bool,
    pub debug: bool,
    pub list_selected: bool,
    pub publish_flag: String,
    pub media_exts: MediaExts,
    pub apply_filters_to_filenames: bool,
    pub apply_filters_to_dirs: bool,
    pub folder_rules: Vec<Rule>,
    pub content_rules: Vec<Rule>,
    pub css_hoist_imports: bool,
    pub assets_dir: Option<PathBuf>,
    pub js_probe_exts: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        // The defaults contain no rules, so compiling cannot fail
        ConfigFile::default()
            .compile()
            .unwrap_or_else(|_| unreachable!("default config has no rules"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec(pattern: &str, replacement: &str, flags: &[&str]) -> RuleSpec {
        RuleSpec {
            pattern: Some(pattern.to_string()),
            replacement: Some(replacement.to_string()),
            flags: flags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_rule_flags() {
        let rule = Rule::compile(&spec("secret", "[redacted]", &["i"]), "f", 0).unwrap();
        assert_eq!(rule.apply("A SECRET plan"), "A [redacted] plan");

        let rule = Rule::compile(&spec("^x", "y", &["MULTILINE"]), "f", 0).unwrap();
        assert_eq!(rule.apply("x\nx"), "y\ny");

        let rule = Rule::compile(&spec("a.b", "_", &["DOTALL"]), "f", 0).unwrap();
        assert_eq!(rule.apply("a\nb"), "_");

        let rule = Rule::compile(&spec("a b  # comment", "_", &["X"]), "f", 0).unwrap();
        assert_eq!(rule.apply("ab"), "_");
    }

    #[test]
    fn test_rule_errors() {
        let err = Rule::compile(&spec("x", "", &["BOGUS"]), "global_contents_filter", 3).unwrap_err();
        assert_eq!(err.to_string(), "global_contents_filter[3] unknown flag: BOGUS");

        let err = Rule::compile(&RuleSpec::default(), "md_folderpath_rewrite", 1).unwrap_err();
        assert!(matches!(err, PublishError::MissingPattern { index: 1, .. }));

        let err = Rule::compile(&spec("(", "", &[]), "md_folderpath_rewrite", 0).unwrap_err();
        assert!(matches!(err, PublishError::InvalidRegex { .. }));
    }

    #[test]
    fn test_replacement_backreferences() {
        let rule = Rule::new(r"(\w+)@(\w+)", r"\2 at \1", &[]).unwrap();
        assert_eq!(rule.apply("me@home"), "home at me");

        let rule = Rule::new(r"(?P<word>\w+)!", r"\g<word>?", &[]).unwrap();
        assert_eq!(rule.apply("hey!"), "hey?");

        let rule = Rule::new("cost", "$5", &[]).unwrap();
        assert_eq!(rule.apply("cost"), "$5");
    }

    #[test]
    fn test_apply_rules_in_order() {
        let rules = vec![
            Rule::new("a", "b", &[]).unwrap(),
            Rule::new("b", "c", &[]).unwrap(),
        ];
        assert_eq!(apply_rules("a", &rules), "c");
    }

    #[test]
    fn test_media_exts() {
        let exts = MediaExts::new(["PNG", ".jpg"]);
        assert!(exts.is_media("img/Photo.JPG"));
        assert!(exts.is_media("a.png"));
        assert!(!exts.is_media("a.md"));
        assert!(!exts.is_media("png"));
    }

    #[test]
    fn test_load_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("publish.build.yaml");
        fs::write(
            &path,
            "vault: notes\nscope: vault\ncss_hoist_imports_top: false\nmd_folderpath_rewrite:\n  - pattern: \"Trips/.*\"\n    replacement: \"\"\n",
        )
        .unwrap();

        let config = ConfigFile::from_path(&path).unwrap().compile().unwrap();
        assert_eq!(config.vault, PathBuf::from("notes"));
        assert_eq!(config.scope, Scope::Vault);
        assert!(!config.css_hoist_imports);
        assert_eq!(config.folder_rules.len(), 1);
        assert_eq!(config.md_root_dir, "content");
    }

    #[test]
    fn test_load_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("publish.build.json");
        fs::write(&path, r#"{"include_hidden": true, "scope": "tree-wide"}"#).unwrap();

        let config = ConfigFile::from_path(&path).unwrap();
        assert!(config.include_hidden);
        assert_eq!(config.scope, Scope::Vault);
    }

    #[test]
    fn test_bad_scope_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("publish.build.yaml");
        fs::write(&path, "scope: everywhere\n").unwrap();
        assert!(matches!(
            ConfigFile::from_path(&path),
            Err(PublishError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_config() {
        let err = ConfigFile::load(Some(Path::new("/nonexistent/publish.build.yaml"))).unwrap_err();
        assert!(matches!(err, PublishError::ConfigNotFound(_)));
    }

    #[test]
    fn test_overrides() {
        let overrides = ConfigOverrides {
            vault: Some(PathBuf::from("/v")),
            publish: None,
            dry_run: true,
            debug: false,
        };
        let config = ConfigFile::default().with_overrides(&overrides);
        assert_eq!(config.vault, PathBuf::from("/v"));
        assert_eq!(config.publish, PathBuf::from(C::DEFAULT_PUBLISH));
        assert!(config.dry_run);
    }
}
