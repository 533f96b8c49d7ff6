use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// vault-publish - Publish a selected subset of a note vault
///
/// # Quick Reference
///
/// ```bash
/// vault-publish build                          # Build using publish.build.yaml
/// vault-publish build --dry-run                # Log every decision, write nothing
/// vault-publish --config site.yaml build --vault ~/notes --publish ~/site
/// vault-publish --debug build                  # Per-file decisions
/// ```
///
/// ## Inspecting
///
/// ```bash
/// vault-publish refs "Trips/Day1.md"           # References found in a note
/// vault-publish resolve "Trips/Day1.md" "photo" # What a reference resolves to
/// vault-publish css assets/publish.css         # Processed stylesheet
/// vault-publish js assets/publish.js           # Inlined script
/// ```
///
/// A note opts in with `publish: true` in its frontmatter.
#[derive(Parser, Debug)]
#[command(name = "vault-publish")]
#[command(version = "0.1.0")]
#[command(about = "Publish a selected subset of a note vault")]
pub struct Cli {
    /// Config file (default: $VAULT_PUBLISH_CONFIG or publish.build.yaml|yml|json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log per-file decisions
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the published tree
    #[command(alias = "b")]
    Build {
        /// Vault root (overrides config)
        #[arg(long, value_name = "PATH")]
        vault: Option<PathBuf>,

        /// Published root (overrides config)
        #[arg(long, value_name = "PATH")]
        publish: Option<PathBuf>,

        /// Compute and log every decision without touching the filesystem
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show what a reference in a note resolves to
    #[command(alias = "rv")]
    Resolve {
        /// Note path, relative to the vault root
        note: PathBuf,

        /// Reference as written in the note (alias and heading are ignored)
        reference: String,
    },

    /// List the references found in a note
    Refs {
        /// Note path, relative to the vault root
        note: PathBuf,
    },

    /// Print a stylesheet with imports inlined and hoisted
    Css {
        /// Stylesheet to process
        file: PathBuf,
    },

    /// Print a script with local imports inlined
    Js {
        /// Script to process
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["vault-publish", "--debug", "build", "--vault", "v", "-n"]);
        assert!(cli.debug);
        match cli.command {
            Command::Build { vault, publish, dry_run } => {
                assert_eq!(vault, Some(PathBuf::from("v")));
                assert_eq!(publish, None);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::parse_from(["vault-publish", "resolve", "A/n.md", "pic.png", "--config", "c.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Command::Resolve { .. }));
    }
}
