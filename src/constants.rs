//! Constants for vault-publish
//!
//! File names, default settings and other fixed values shared across the
//! pipeline.

// === File and Directory Names ===

/// Extension of documents (notes) in the vault
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Leading character of hidden files and directories
pub const HIDDEN_PREFIX: char = '.';

/// Directory under the published root that prune never touches
pub const PROTECTED_DIR: &str = ".obsidian";

/// Config files searched in the working directory, in order
pub const CONFIG_CANDIDATES: &[&str] = &[
    "publish.build.yaml",
    "publish.build.yml",
    "publish.build.json",
];

/// Environment variable naming a config file
pub const ENV_CONFIG: &str = "VAULT_PUBLISH_CONFIG";

/// Stylesheet produced from the assets directory
pub const PUBLISH_CSS: &str = "publish.css";

/// Script produced from the assets directory
pub const PUBLISH_JS: &str = "publish.js";

/// Prefix of logo files copied verbatim from the assets directory
pub const LOGO_PREFIX: &str = "logo.";

/// Favicons copied verbatim from the assets directory
pub const FAVICONS: &[&str] = &["favicon.ico", "favicon.png"];

// === Defaults ===

/// Default vault root (relative to the working directory)
pub const DEFAULT_VAULT: &str = "..";

/// Default published root (relative to the working directory)
pub const DEFAULT_PUBLISH: &str = "../../Publish Vault";

/// Default folder for documents and media inside the published root
pub const DEFAULT_MD_ROOT_DIR: &str = "content";

/// Default metadata key that opts a document into publishing
pub const DEFAULT_PUBLISH_FLAG: &str = "publish";

/// Default media extensions (lower-case, with leading dot)
pub const DEFAULT_MEDIA_EXTS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".jpe", ".webp", ".gif", ".svg", ".heic", ".bmp", ".tiff", ".tif",
    ".pdf", ".mp4", ".mov", ".m4v", ".mp3", ".wav", ".m4a",
];

/// Default extensions probed when a script import omits one
pub const DEFAULT_JS_PROBE_EXTS: &[&str] = &[".js", ".mjs"];

/// Name used when sanitizing leaves nothing behind
pub const UNTITLED_NAME: &str = "untitled";

// === Validation Limits ===

/// Maximum size of frontmatter to parse (prevents DoS on malformed files)
pub const MAX_FRONTMATTER_SIZE: usize = 64 * 1024; // 64KB
