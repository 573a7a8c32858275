use super::*;

#[test]
fn apply_title_matches_template_exactly() {
    let mut s = session();
    s.create_slide("content").unwrap();
    s.add_element(label("extra")).unwrap();

    s.apply_template("title").unwrap();

    let template = s.catalog().get("title").unwrap().clone();
    let slide = s.active_slide();
    let values: Vec<Element> = slide.element_values().into_iter().cloned().collect();
    assert_eq!(values, template.elements);
    assert_eq!(slide.background, template.background);
    assert_eq!(slide.template_id.as_deref(), Some("title"));
}

#[test]
fn apply_uses_fresh_ids() {
    let mut s = session();
    let old: Vec<_> = s.active_slide().elements.iter().map(|e| e.id).collect();
    s.apply_template("conclusion").unwrap();
    assert!(s.active_slide().elements.iter().all(|e| !old.contains(&e.id)));
}

#[test]
fn apply_unknown_template() {
    let mut s = session();
    let before = s.document().clone();
    let err = s.apply_template("missing").unwrap_err();
    assert!(matches!(err, EditorError::TemplateNotFound(_)));
    assert_eq!(err.category(), crate::error::ErrorCategory::NotFound);
    assert_eq!(s.document(), &before);
}

#[test]
fn apply_is_undoable() {
    let mut s = session();
    let before = s.document().clone();
    s.apply_template("image").unwrap();
    s.undo().unwrap();
    assert_eq!(s.document(), &before);
}
