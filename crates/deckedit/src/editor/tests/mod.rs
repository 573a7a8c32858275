mod elements;
mod generation;
mod history;
mod templates;

use std::path::PathBuf;

use futures::future::BoxFuture;

use super::*;
use crate::ai::{ContentGenerator, GenerationError};
use crate::model::{ColorSpec, FontSpec};
use crate::render::text::FontBook;

/// Helper to create a canvas that needs no system fonts.
fn canvas() -> Canvas {
    Canvas::new(960, 540, FontBook::empty(), PathBuf::from(".")).unwrap()
}

/// Helper to create a session holding a single `title` slide.
fn session() -> EditorSession {
    EditorSession::new(TemplateCatalog::builtin(), canvas()).unwrap()
}

fn label(content: &str) -> Element {
    Element::text(
        content,
        10.0,
        20.0,
        FontSpec::new("Arial", 18.0),
        ColorSpec::BLACK,
    )
}

/// Generator answering with a fixed result.
struct FakeGenerator {
    reply: Result<String, String>,
}

impl FakeGenerator {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
        }
    }
}

impl ContentGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        _context: &'a str,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        let reply = self.reply.clone().map_err(GenerationError::Failed);
        Box::pin(async move { reply })
    }
}
