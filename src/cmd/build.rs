use vault_publish::{util, PublishConfig, PublishEngine, Result};

pub fn run(config: PublishConfig) -> Result<()> {
    let list_selected = config.list_selected;
    let summary = PublishEngine::new(config)?.run()?;

    if list_selected {
        for note in &summary.selected {
            println!(" - {}", util::display_path(note));
        }
    }

    println!();
    println!("{}", summary);
    Ok(())
}
