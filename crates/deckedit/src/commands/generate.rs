use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::ai::{self, ContentGenerator};
use crate::config::Config;
use crate::editor::EditorSession;
use crate::store::FileStore;

/// Where generated text goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Existing slide, 0-indexed.
    Slide(usize),
    /// A new slide from this template.
    NewSlide(String),
}

pub fn run(
    file: &Path,
    prompt: &str,
    target: Target,
    context: Option<&str>,
    runtime: &tokio::runtime::Runtime,
) -> Result<()> {
    let config = Config::load_or_default();
    let store = FileStore::new(file);
    let mut session = super::open_session(&config, &store)?;

    let generator = ai::from_config(config.ai.as_ref())?;
    eprintln!(
        "{}",
        format!("Generating with {}...", generator.name()).dimmed()
    );

    let added = runtime.block_on(generate_into(
        &mut session,
        generator.as_ref(),
        prompt,
        target,
        context,
    ))?;

    let path = store
        .save(session.document())
        .with_context(|| format!("Failed to save {}", file.display()))?;
    println!(
        "{} {} text elements to slide {} ({})",
        "Added".green().bold(),
        added,
        session.active_index() + 1,
        path.display()
    );
    Ok(())
}

/// Select or create the target slide, then generate onto it. Returns the
/// number of elements added.
pub async fn generate_into(
    session: &mut EditorSession,
    generator: &dyn ContentGenerator,
    prompt: &str,
    target: Target,
    context: Option<&str>,
) -> Result<usize> {
    match target {
        Target::Slide(index) => session.go_to_slide(index)?,
        Target::NewSlide(template) => {
            session.create_slide(&template)?;
        }
    }
    let ids = session
        .generate_from_prompt(generator, prompt, context)
        .await?;
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerationError;
    use crate::render::Canvas;
    use crate::render::text::FontBook;
    use crate::templates::TemplateCatalog;
    use futures::future::BoxFuture;

    struct Canned;

    impl ContentGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _context: &'a str,
        ) -> BoxFuture<'a, Result<String, GenerationError>> {
            Box::pin(async { Ok("Agenda\nIntro\nDemo".to_string()) })
        }
    }

    fn session() -> EditorSession {
        let canvas = Canvas::new(960, 540, FontBook::empty(), ".".into()).unwrap();
        EditorSession::new(TemplateCatalog::builtin(), canvas).unwrap()
    }

    #[test]
    fn test_generate_onto_new_slide() {
        let mut s = session();
        let added = futures::executor::block_on(generate_into(
            &mut s,
            &Canned,
            "agenda",
            Target::NewSlide("content".into()),
            None,
        ))
        .unwrap();
        assert_eq!(added, 3);
        assert_eq!(s.slide_count(), 2);
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn test_generate_bad_slide_index() {
        let mut s = session();
        let result = futures::executor::block_on(generate_into(
            &mut s,
            &Canned,
            "agenda",
            Target::Slide(4),
            None,
        ));
        assert!(result.is_err());
        assert!(!s.can_undo());
    }
}
