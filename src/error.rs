//! Error types for vault-publish

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = PublishError> = std::result::Result<T, E>;

/// Everything that can abort a command.
///
/// Unresolved references inside a build are logged, never raised;
/// `Unresolved` only comes from a single-reference lookup.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("IO error at `{}`", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse config {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("{field}[{index}] missing 'pattern'")]
    MissingPattern { field: String, index: usize },

    #[error("{field}[{index}] unknown flag: {flag}")]
    UnknownFlag {
        field: String,
        index: usize,
        flag: String,
    },

    #[error("{field}[{index}] invalid regex")]
    InvalidRegex {
        field: String,
        index: usize,
        #[source]
        source: regex::Error,
    },

    #[error("vault root does not exist: {}", .0.display())]
    VaultNotFound(PathBuf),

    #[error("note not found in vault: {}", .0.display())]
    NoteNotFound(PathBuf),

    #[error("'{reference}' does not resolve from {}", note.display())]
    Unresolved { reference: String, note: PathBuf },

    #[error(
        "refusing to modify outside publish root: {} (publish root={})",
        target.display(),
        root.display()
    )]
    OutsidePublishRoot { target: PathBuf, root: PathBuf },
}

impl PublishError {
    /// Wrap an `io::Error` with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PublishError::Io(path.into(), source)
    }

    /// The message followed by every underlying cause, `: `-separated
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(": ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_errors_name_field_and_index() {
        let err = PublishError::UnknownFlag {
            field: "md_folderpath_rewrite".to_string(),
            index: 2,
            flag: "FOO".to_string(),
        };
        assert_eq!(err.to_string(), "md_folderpath_rewrite[2] unknown flag: FOO");

        let err = PublishError::MissingPattern {
            field: "global_contents_filter".to_string(),
            index: 0,
        };
        assert_eq!(err.to_string(), "global_contents_filter[0] missing 'pattern'");
    }

    #[test]
    fn test_report_includes_causes() {
        let err = PublishError::InvalidRegex {
            field: "md_folderpath_rewrite".to_string(),
            index: 0,
            source: regex::Regex::new("(").unwrap_err(),
        };
        let report = err.report();
        assert!(report.starts_with("md_folderpath_rewrite[0] invalid regex: "));
        assert!(report.contains("unclosed group"));

        let err = PublishError::io("/no/such", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.report(), "IO error at `/no/such`: gone");

        let err = PublishError::Unresolved {
            reference: "x.png".to_string(),
            note: PathBuf::from("A/n.md"),
        };
        assert_eq!(err.report(), "'x.png' does not resolve from A/n.md");
    }

    #[test]
    fn test_outside_root_message() {
        let err = PublishError::OutsidePublishRoot {
            target: PathBuf::from("/etc/passwd"),
            root: PathBuf::from("/srv/pub"),
        };
        assert!(err.to_string().contains("/etc/passwd"));
        assert!(err.to_string().contains("publish root=/srv/pub"));
    }
}
