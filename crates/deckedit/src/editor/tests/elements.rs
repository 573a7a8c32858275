use super::*;
use crate::model::ShapeElement;

#[test]
fn add_appends_on_top() {
    let mut s = session();
    let before = s.active_slide().elements.len();
    let id = s.add_element(label("top")).unwrap();

    let slide = s.active_slide();
    assert_eq!(slide.elements.len(), before + 1);
    assert_eq!(slide.elements.last().map(|e| e.id), Some(id));
    assert_eq!(s.history().undo_len(), 1);
}

#[test]
fn add_invalid_element_is_rejected() {
    let mut s = session();
    let before = s.document().clone();
    let shape = Element::Shape(ShapeElement::circle(10.0, 10.0, 0.0, ColorSpec::BLACK));

    let err = s.add_element(shape).unwrap_err();
    assert!(matches!(err, EditorError::Validation(_)));
    assert_eq!(s.document(), &before);
    assert!(!s.can_undo());
}

#[test]
fn update_moves_element() {
    let mut s = session();
    let id = s.add_element(label("move me")).unwrap();
    s.update_element(id, &ElementPatch::moved_to(120.0, 80.0)).unwrap();

    let moved = s.active_slide().element(id).unwrap();
    assert_eq!(moved.element.position(), (120.0, 80.0));
}

#[test]
fn update_unknown_id() {
    let mut s = session();
    let before = s.document().clone();
    let err = s
        .update_element(ElementId(999), &ElementPatch::moved_to(1.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, EditorError::ElementNotFound(ElementId(999))));
    assert_eq!(s.document(), &before);
}

#[test]
fn update_rejects_empty_and_foreign_fields() {
    let mut s = session();
    let id = s.add_element(label("text")).unwrap();
    let depth = s.history().undo_len();

    assert!(matches!(
        s.update_element(id, &ElementPatch::default()),
        Err(EditorError::Validation(_))
    ));
    let radius = ElementPatch {
        radius: Some(4.0),
        ..ElementPatch::default()
    };
    assert!(matches!(
        s.update_element(id, &radius),
        Err(EditorError::Validation(_))
    ));
    let negative = ElementPatch::moved_to(-5.0, 0.0);
    assert!(matches!(
        s.update_element(id, &negative),
        Err(EditorError::Validation(_))
    ));
    assert_eq!(s.history().undo_len(), depth);
}

#[test]
fn remove_by_identity() {
    let mut s = session();
    let a = s.add_element(label("a")).unwrap();
    let b = s.add_element(label("b")).unwrap();

    s.remove_element(a).unwrap();
    assert!(s.active_slide().element(a).is_none());
    assert!(s.active_slide().element(b).is_some());

    assert!(matches!(
        s.remove_element(a),
        Err(EditorError::ElementNotFound(id)) if id == a
    ));
}

#[test]
fn element_edits_only_touch_active_slide() {
    let mut s = session();
    let first = s.document().slides[0].clone();
    s.create_slide("content").unwrap();
    s.add_element(label("second only")).unwrap();
    assert_eq!(s.document().slides[0], first);
}

#[test]
fn every_edit_repaints() {
    let mut s = session();
    let start = s.render_generation();
    let id = s.add_element(label("a")).unwrap();
    s.update_element(id, &ElementPatch::moved_to(5.0, 5.0)).unwrap();
    s.remove_element(id).unwrap();
    assert_eq!(s.render_generation(), start + 3);
}
