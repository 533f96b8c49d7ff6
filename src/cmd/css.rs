use std::path::Path;

use vault_publish::assets::CssProcessor;
use vault_publish::{PublishConfig, Result};

pub fn run(config: &PublishConfig, file: &Path) -> Result<()> {
    let css = CssProcessor::new(config.css_hoist_imports).inline_file(file)?;
    print!("{}", css);
    Ok(())
}
