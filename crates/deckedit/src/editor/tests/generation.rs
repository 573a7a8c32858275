use futures::executor::block_on;

use super::*;

#[test]
fn generated_text_is_appended() {
    let mut s = session();
    let before = s.active_slide().elements.len();
    let generator = FakeGenerator::replying("Quarterly results\nRevenue grew\nCosts fell");

    let ids = block_on(s.generate_from_prompt(&generator, "summarize", None)).unwrap();
    assert_eq!(ids.len(), 3);

    let slide = s.active_slide();
    assert_eq!(slide.elements.len(), before + 3);
    let heading = slide.element(ids[0]).unwrap();
    match &heading.element {
        Element::Text(t) => {
            assert_eq!(t.content, "Quarterly results");
            assert!(t.font.bold);
            assert_eq!((t.x, t.y), (50.0, 50.0));
        }
        other => panic!("expected text, got {other:?}"),
    }
    assert_eq!(s.history().undo_len(), 1);
}

#[test]
fn failed_generation_changes_nothing() {
    let mut s = session();
    s.add_element(label("existing")).unwrap();
    let before = s.document().clone();
    let depth = s.history().undo_len();

    let generator = FakeGenerator::failing("provider down");
    let err = block_on(s.generate_from_prompt(&generator, "anything", None)).unwrap_err();

    assert!(matches!(err, EditorError::ContentGenerationFailed(_)));
    assert_eq!(err.category(), crate::error::ErrorCategory::ExternalService);
    assert_eq!(s.document(), &before);
    assert_eq!(s.history().undo_len(), depth);
}

#[test]
fn blank_output_is_a_failure() {
    let mut s = session();
    let before = s.document().clone();
    let generator = FakeGenerator::replying("  \n\n ");

    let err = block_on(s.generate_from_prompt(&generator, "anything", None)).unwrap_err();
    assert!(matches!(
        err,
        EditorError::ContentGenerationFailed(GenerationError::Empty)
    ));
    assert_eq!(s.document(), &before);
    assert!(!s.can_undo());
}

#[test]
fn blank_prompt_is_rejected() {
    let mut s = session();
    let generator = FakeGenerator::replying("unused");
    let err = block_on(s.generate_from_prompt(&generator, "   ", None)).unwrap_err();
    assert!(matches!(err, EditorError::Validation(_)));
}

/// Records the context it was handed.
struct ContextProbe(std::sync::Mutex<Option<String>>);

impl ContentGenerator for ContextProbe {
    fn name(&self) -> &str {
        "probe"
    }

    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
        context: &'a str,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        *self.0.lock().unwrap() = Some(context.to_string());
        Box::pin(async { Ok("Heading".to_string()) })
    }
}

#[test]
fn context_defaults_to_slide_text() {
    let mut s = session();
    let probe = ContextProbe(std::sync::Mutex::new(None));
    block_on(s.generate_from_prompt(&probe, "go", None)).unwrap();
    assert_eq!(
        probe.0.lock().unwrap().as_deref(),
        Some("Title Slide\nSubtitle")
    );

    block_on(s.generate_from_prompt(&probe, "go", Some("custom"))).unwrap();
    assert_eq!(probe.0.lock().unwrap().as_deref(), Some("custom"));
}
