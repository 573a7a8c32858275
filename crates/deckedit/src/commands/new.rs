use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::config::Config;
use crate::model::{Document, ElementId};
use crate::store::FileStore;

pub fn run(file: &Path, template: Option<&str>, force: bool) -> Result<()> {
    let store = FileStore::new(file);
    if store.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }

    let config = Config::load_or_default();
    let catalog = super::catalog(&config)?;
    let template_id = template.unwrap_or(config.default_template());
    let template = catalog.get(template_id).with_context(|| {
        format!(
            "Unknown template '{template_id}' (available: {})",
            catalog.ids().collect::<Vec<_>>().join(", ")
        )
    })?;

    let document = Document::with_slide(template.instantiate(template_id, ElementId(1)));
    let path = store.save(&document)?;
    println!(
        "{} {} {}",
        "Created".green().bold(),
        path.display(),
        format!("(first slide: {template_id})").dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        run(&path, Some("content"), false).unwrap();

        let doc = FileStore::new(&path).load().unwrap();
        assert_eq!(doc.slides.len(), 1);
        assert_eq!(doc.slides[0].template_id.as_deref(), Some("content"));

        assert!(run(&path, Some("title"), false).is_err());
        run(&path, Some("title"), true).unwrap();
        let doc = FileStore::new(&path).load().unwrap();
        assert_eq!(doc.slides[0].template_id.as_deref(), Some("title"));
    }

    #[test]
    fn test_new_unknown_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.json");
        assert!(run(&path, Some("missing"), false).is_err());
        assert!(!path.exists());
    }
}
