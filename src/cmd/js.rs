use std::path::Path;

use vault_publish::assets::JsInliner;
use vault_publish::{PublishConfig, Result};

pub fn run(config: &PublishConfig, file: &Path) -> Result<()> {
    let js = JsInliner::new(&config.js_probe_exts).inline_file(file)?;
    println!("{}", js);
    Ok(())
}
