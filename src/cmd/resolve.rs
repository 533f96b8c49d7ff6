use std::path::Path;

use vault_publish::{refs, util, HitKind, PublishConfig, PublishEngine, PublishError, Result};

/// Resolve `reference` as written in `note` (vault-relative)
pub fn run(config: PublishConfig, note: &Path, reference: &str) -> Result<()> {
    let engine = PublishEngine::new(config)?;
    if !engine.vault().absolute(note).is_file() {
        return Err(PublishError::NoteNotFound(note.to_path_buf()));
    }

    let (left, _) = refs::split_alias(reference);
    let (target, _) = refs::split_heading(left);
    let has_extension = !util::suffix(target).is_empty();
    let note_dir = note.parent().unwrap_or(Path::new(""));

    match engine.resolver().resolve(note_dir, target, has_extension) {
        Some(hit) => {
            let kind = match hit.kind {
                HitKind::Media => "media",
                HitKind::Note => "note",
            };
            println!("{}\t{}", kind, util::display_path(&hit.path));
            Ok(())
        }
        None => Err(PublishError::Unresolved {
            reference: target.to_string(),
            note: note.to_path_buf(),
        }),
    }
}
