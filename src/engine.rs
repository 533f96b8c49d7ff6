//! PublishEngine - the build pipeline
//!
//! One run, strictly in order:
//! - assets from the assets directory
//! - scan and select publishable documents
//! - copy `always_root` files
//! - resolve every reference of every selected document
//! - build the path tables
//! - write documents (rewritten) and media (verbatim)
//! - prune everything else under the published root

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::assets::{self, AssetReport, CssProcessor, JsInliner};
use crate::config::{apply_rules, PublishConfig};
use crate::constants as C;
use crate::error::Result;
use crate::frontmatter;
use crate::mapper::{self, NameFilters, PathMapper, PathMapping};
use crate::output::PublishRoot;
use crate::refs;
use crate::resolver::{HitKind, Resolver};
use crate::rewrite::Rewriter;
use crate::util;
use crate::vault::Vault;

/// Required media: vault-relative file → every reference key that hit it
pub type MediaSet = BTreeMap<PathBuf, BTreeSet<String>>;

// === BuildSummary ===

/// Outcome of a build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub vault: PathBuf,
    pub publish: PathBuf,
    pub md_root_dir: String,
    pub scanned: usize,
    pub selected: Vec<PathBuf>,
    pub media: usize,
    pub kept: usize,
    pub pruned: usize,
    pub include_hidden: bool,
    pub dry_run: bool,
    pub assets: AssetReport,
}

fn present(yes: bool, what: &str) -> String {
    if yes {
        format!("{} present", what)
    } else {
        "none".to_string()
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Publish vault build ===")?;
        writeln!(f, "Main vault:     {}", util::display_path(&self.vault))?;
        writeln!(f, "Publish vault:  {}", util::display_path(&self.publish))?;
        writeln!(f, "Root dir:       {}/", self.md_root_dir)?;
        writeln!(f, "Notes scanned:  {}", self.scanned)?;
        writeln!(f, "Selected:       {} notes", self.selected.len())?;
        writeln!(f, "Media:          {}", self.media)?;
        writeln!(f, "Files kept:     {} (notes + media + root assets)", self.kept)?;
        writeln!(f, "Files pruned:   {}", self.pruned)?;
        writeln!(
            f,
            "Hidden files:   {}",
            if self.include_hidden { "INCLUDED" } else { "SKIPPED" }
        )?;
        writeln!(f, "Styles:         {}", present(self.assets.css, C::PUBLISH_CSS))?;
        writeln!(f, "Scripts:        {}", present(self.assets.js, C::PUBLISH_JS))?;
        writeln!(f, "Logos:          {}", present(self.assets.logos > 0, "logo.*"))?;
        write!(f, "{}", if self.dry_run { "Dry run, nothing written." } else { "Done." })
    }
}

// === PublishEngine ===

/// Core engine for a publish run
pub struct PublishEngine {
    config: PublishConfig,
    vault: Vault,
}

impl PublishEngine {
    /// Scan the configured vault
    pub fn new(config: PublishConfig) -> Result<Self> {
        let vault = Vault::scan(&config.vault, config.include_hidden)?;
        Ok(Self { config, vault })
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.vault, self.config.scope, &self.config.media_exts)
    }

    /// Documents opted into publishing, vault-relative and sorted
    pub fn select(&self) -> Result<Vec<PathBuf>> {
        let mut selected = Vec::new();
        for rel in self.vault.markdown_files() {
            if frontmatter::should_publish(&self.vault.absolute(rel), &self.config.publish_flag)? {
                selected.push(rel.to_path_buf());
            }
        }
        Ok(selected)
    }

    /// Resolve every reference of the selected documents and collect the
    /// media files they require
    pub fn resolve_media(&self, selected: &[PathBuf]) -> Result<MediaSet> {
        let publishable: HashSet<&Path> = selected.iter().map(PathBuf::as_path).collect();
        let resolver = self.resolver();
        let mut media = MediaSet::new();

        for rel in selected {
            let abs = self.vault.absolute(rel);
            let text = util::read_text(&abs)?;
            let note_dir = rel.parent().unwrap_or(Path::new(""));
            let abs_dir = abs.parent().unwrap_or(self.vault.root());
            let rel_posix = util::display_path(rel);

            for reference in refs::extract(&text, abs_dir) {
                let Some(hit) = resolver.resolve(note_dir, &reference.target, reference.has_extension) else {
                    debug!("[ref] {}: unresolved '{}'", rel_posix, reference.target);
                    continue;
                };
                if self.vault.is_excluded(&hit.path) {
                    continue;
                }
                match hit.kind {
                    HitKind::Media => {
                        debug!(
                            "[ref] {}: '{}' -> {}",
                            rel_posix,
                            reference.target,
                            util::display_path(&hit.path)
                        );
                        // The body is redacted before rewriting; record both spellings
                        let redacted = apply_rules(&reference.target, &self.config.content_rules);
                        let keys = media.entry(hit.path).or_default();
                        keys.insert(mapper::media_ref_key(&rel_posix, &reference.target));
                        if redacted != reference.target {
                            keys.insert(mapper::media_ref_key(&rel_posix, &redacted));
                        }
                    }
                    HitKind::Note if !publishable.contains(hit.path.as_path()) => {
                        debug!(
                            "[ref] {}: '{}' is not published",
                            rel_posix, reference.target
                        );
                    }
                    HitKind::Note => {}
                }
            }
        }

        Ok(media)
    }

    /// Build the path tables for the selected documents and required media
    pub fn mapping(&self, selected: &[PathBuf], media: &MediaSet) -> PathMapping {
        let filters = NameFilters {
            rules: &self.config.content_rules,
            to_filenames: self.config.apply_filters_to_filenames,
            to_dirs: self.config.apply_filters_to_dirs,
        };
        PathMapper::new(&self.config.folder_rules, filters).build(selected, media)
    }

    /// Run the whole pipeline
    pub fn run(&self) -> Result<BuildSummary> {
        let config = &self.config;
        let out = PublishRoot::open(&config.publish, config.dry_run)?;
        let md_root = out.join(&config.md_root_dir);

        info!("[start] vault_root = {}", util::display_path(self.vault.root()));
        info!("[start] publish_root = {}", util::display_path(out.path()));
        info!("[start] md_root_dir = {}", util::display_path(&md_root));

        let mut keep: HashSet<PathBuf> = HashSet::new();

        let asset_report = match &config.assets_dir {
            Some(dir) => assets::build_assets(
                dir,
                &out,
                &CssProcessor::new(config.css_hoist_imports),
                &JsInliner::new(&config.js_probe_exts),
            )?,
            None => AssetReport::default(),
        };
        keep.extend(asset_report.written.iter().cloned());

        let scanned = self.vault.markdown_files().count();
        info!("[scan] md files found: {}", scanned);
        let selected = self.select()?;
        info!("[scan] {}:true selected: {}", config.publish_flag, selected.len());

        for rel in &config.always_root {
            let src = self.vault.absolute(Path::new(rel));
            if !src.is_file() {
                warn!("[root] always_root entry not found: {}", rel);
                continue;
            }
            let Some(name) = src.file_name() else { continue };
            let dst = out.join(name);
            out.copy(&src, &dst)?;
            keep.insert(dst);
        }

        let media = self.resolve_media(&selected)?;
        let mapping = self.mapping(&selected, &media);
        let rewriter = Rewriter::new(&mapping, &config.media_exts, &config.md_root_dir);

        for rel in &selected {
            let Some(new_noext) = mapping.note_destination(rel) else {
                continue;
            };
            let dst = md_root.join(format!("{}{}", new_noext, C::MARKDOWN_EXTENSION));
            let content = util::read_text(&self.vault.absolute(rel))?;
            let content = apply_rules(&content, &config.content_rules);
            let content = rewriter.rewrite(&content, &util::display_path(rel));
            debug!("[note] {} -> {}", util::display_path(rel), out.display(&dst));
            out.write(&dst, content.as_bytes())?;
            keep.insert(dst);
        }

        for rel in media.keys() {
            let new_rel = mapping
                .media_destination(rel)
                .map(str::to_string)
                .unwrap_or_else(|| util::display_path(rel));
            let dst = md_root.join(new_rel);
            debug!("[media] {} -> {}", util::display_path(rel), out.display(&dst));
            out.copy(&self.vault.absolute(rel), &dst)?;
            keep.insert(dst);
        }

        let pruned = prune(&out, &keep)?;

        Ok(BuildSummary {
            vault: self.vault.root().to_path_buf(),
            publish: out.path().to_path_buf(),
            md_root_dir: config.md_root_dir.clone(),
            scanned,
            selected,
            media: media.len(),
            kept: keep.len(),
            pruned,
            include_hidden: config.include_hidden,
            dry_run: config.dry_run,
            assets: asset_report,
        })
    }
}

/// Whether a path under the published root belongs to the protected folder
fn is_protected(out: &PublishRoot, path: &Path) -> bool {
    path.strip_prefix(out.path())
        .ok()
        .and_then(|rel| rel.components().next())
        .is_some_and(|first| first.as_os_str() == C::PROTECTED_DIR)
}

/// Delete every file not in `keep`, then every empty directory, deepest
/// first. Returns the number of files deleted.
fn prune(out: &PublishRoot, keep: &HashSet<PathBuf>) -> Result<usize> {
    if !out.path().is_dir() {
        return Ok(0);
    }

    let entries: Vec<walkdir::DirEntry> = WalkDir::new(out.path())
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_protected(out, e.path()))
        .filter_map(|e| e.ok())
        .collect();

    let mut pruned = 0;
    for entry in entries.iter().filter(|e| !e.file_type().is_dir()) {
        if !keep.contains(entry.path()) {
            out.remove_file(entry.path())?;
            pruned += 1;
        }
    }

    let mut dirs: Vec<&walkdir::DirEntry> = entries.iter().filter(|e| e.file_type().is_dir()).collect();
    dirs.sort_by_key(|e| std::cmp::Reverse(e.depth()));
    for dir in dirs {
        let is_empty = std::fs::read_dir(dir.path())
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if is_empty {
            out.remove_dir(dir.path())?;
        }
    }

    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, Rule};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config(temp: &TempDir) -> PublishConfig {
        let mut config = ConfigFile::default().compile().unwrap();
        config.vault = temp.path().join("vault");
        config.publish = temp.path().join("site");
        config
    }

    #[test]
    fn test_select_only_flagged() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "a.md", "---\npublish: true\n---\nA");
        write(&vault, "b.md", "---\npublish: false\n---\nB");
        write(&vault, "c.md", "no frontmatter");

        let engine = PublishEngine::new(config(&temp)).unwrap();
        assert_eq!(engine.select().unwrap(), vec![PathBuf::from("a.md")]);
    }

    #[test]
    fn test_resolve_media_records_ref_keys() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "Notes/a.md", "---\npublish: true\n---\n![[pic.png]] ![x](../Media/pic.png) [[Private]]");
        write(&vault, "Notes/Private.md", "secret");
        write(&vault, "Notes/pic.png", "png");
        write(&vault, "Media/pic.png", "png2");

        let engine = PublishEngine::new(config(&temp)).unwrap();
        let selected = engine.select().unwrap();
        let media = engine.resolve_media(&selected).unwrap();

        assert_eq!(media.len(), 2);
        assert!(media[Path::new("Notes/pic.png")].contains("notes//pic.png"));
        assert!(media[Path::new("Media/pic.png")].contains("media/pic.png"));
    }

    #[test]
    fn test_run_prunes_and_protects() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        let site = temp.path().join("site");
        write(&vault, "Home.md", "---\npublish: true\n---\n[[Secret]] ![[logo.png]]");
        write(&vault, "Secret.md", "---\npublish: false\n---\n");
        write(&vault, "logo.png", "png");
        write(&site, "content/old.md", "stale");
        write(&site, ".obsidian/app.json", "{}");

        let engine = PublishEngine::new(config(&temp)).unwrap();
        let summary = engine.run().unwrap();

        assert_eq!(
            fs::read_to_string(site.join("content/Home.md")).unwrap(),
            "---\npublish: true\n---\nSecret ![[content/logo.png]]"
        );
        assert!(site.join("content/logo.png").is_file());
        assert!(!site.join("content/old.md").exists());
        assert!(!site.join("content/Secret.md").exists());
        assert!(site.join(".obsidian/app.json").is_file());
        assert_eq!(summary.selected.len(), 1);
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.pruned, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "Home.md", "---\npublish: true\n---\nHi");

        let mut config = config(&temp);
        config.dry_run = true;
        let summary = PublishEngine::new(config).unwrap().run().unwrap();
        assert!(summary.dry_run);
        assert!(!temp.path().join("site").exists());
    }

    #[test]
    fn test_content_rules_apply_to_body_and_names() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "Home.md", "---\npublish: true\n---\nCall Alice about [[Notes]]");
        write(&vault, "Notes.md", "---\npublish: true\n---\n");
        write(&vault, "People/Alice.md", "---\npublish: true\n---\n");

        let mut config = config(&temp);
        config.content_rules = vec![Rule::new("Alice", "A.", &[]).unwrap()];
        PublishEngine::new(config).unwrap().run().unwrap();

        let home = fs::read_to_string(temp.path().join("site/content/Home.md")).unwrap();
        assert!(home.ends_with("Call A. about [[Notes]]"));
        assert!(temp.path().join("site/content/People/A.md").is_file());
    }

    #[test]
    fn test_links_to_redacted_names_survive() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "Home.md", "---\npublish: true\n---\nSee [[Jane Doe]] and ![[Doe.png]]");
        write(&vault, "Jane Doe.md", "---\npublish: true\n---\n");
        write(&vault, "Doe.png", "png");

        let mut config = config(&temp);
        config.content_rules = vec![Rule::new("Doe", "D.", &[]).unwrap()];
        PublishEngine::new(config).unwrap().run().unwrap();

        let site = temp.path().join("site/content");
        let home = fs::read_to_string(site.join("Home.md")).unwrap();
        assert!(home.ends_with("See [[Jane D]] and ![[content/D.png]]"));
        assert!(site.join("Jane D.md").is_file());
        assert!(site.join("D.png").is_file());
    }

    #[test]
    fn test_bare_embeds_stay_in_their_folder() {
        let temp = TempDir::new().unwrap();
        let vault = temp.path().join("vault");
        write(&vault, "A/n.md", "---\npublish: true\n---\n![[x.png]]");
        write(&vault, "B/m.md", "---\npublish: true\n---\n![[x.png]]");
        write(&vault, "A/x.png", "a");
        write(&vault, "B/x.png", "b");

        PublishEngine::new(config(&temp)).unwrap().run().unwrap();

        let site = temp.path().join("site/content");
        assert!(fs::read_to_string(site.join("A/n.md")).unwrap().ends_with("![[content/A/x.png]]"));
        assert!(fs::read_to_string(site.join("B/m.md")).unwrap().ends_with("![[content/B/x.png]]"));
    }
}
