pub mod assets;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod frontmatter;
pub mod mapper;
pub mod normalize;
pub mod output;
pub mod refs;
pub mod resolver;
pub mod rewrite;
pub mod util;
pub mod vault;

pub use cli::{Cli, Command};
pub use config::{ConfigFile, ConfigOverrides, PublishConfig, Scope};
pub use engine::{BuildSummary, PublishEngine};
pub use error::{PublishError, Result};
pub use mapper::PathMapping;
pub use resolver::{HitKind, Resolved, Resolver};
pub use vault::Vault;

/// Load the config for a command, applying command-line overrides
pub fn load_config(explicit: Option<&std::path::Path>, overrides: &ConfigOverrides) -> Result<PublishConfig> {
    ConfigFile::load(explicit)?.with_overrides(overrides).compile()
}
