use std::path::Path;

use vault_publish::refs::{self, Syntax};
use vault_publish::{util, PublishConfig, PublishError, Result, Vault};

/// List references in `note` (vault-relative)
pub fn run(config: PublishConfig, note: &Path) -> Result<()> {
    let vault = Vault::scan(&config.vault, config.include_hidden)?;
    let path = vault.absolute(note);
    if !path.is_file() {
        return Err(PublishError::NoteNotFound(note.to_path_buf()));
    }

    let text = util::read_text(&path)?;
    let dir = path.parent().unwrap_or(vault.root());
    for reference in refs::extract(&text, dir) {
        let syntax = match reference.syntax {
            Syntax::Wiki => "wiki",
            Syntax::Markdown => "md",
        };
        println!(
            "{}\t{}\t{}\t{}",
            syntax,
            if reference.is_embed { "embed" } else { "link" },
            if reference.has_extension { "ext" } else { "-" },
            reference.target
        );
    }
    Ok(())
}
