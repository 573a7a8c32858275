use super::*;

#[test]
fn undo_restores_original_after_many_edits() {
    let mut s = session();
    let original = s.document().clone();

    s.create_slide("content").unwrap();
    let id = s.add_element(label("one")).unwrap();
    s.update_element(id, &ElementPatch::moved_to(300.0, 200.0)).unwrap();
    s.apply_template("image").unwrap();
    s.delete_slide(0).unwrap();
    assert_eq!(s.history().undo_len(), 5);

    for _ in 0..5 {
        s.undo().unwrap();
    }
    assert_eq!(s.document(), &original);
    assert!(!s.can_undo());
}

#[test]
fn redo_restores_exactly() {
    let mut s = session();
    s.add_element(label("kept")).unwrap();
    let after = s.document().clone();

    s.undo().unwrap();
    assert!(s.can_redo());
    s.redo().unwrap();
    assert_eq!(s.document(), &after);
    assert!(!s.can_redo());
}

#[test]
fn new_edit_clears_redo() {
    let mut s = session();
    s.add_element(label("a")).unwrap();
    s.undo().unwrap();
    assert!(s.can_redo());

    s.add_element(label("b")).unwrap();
    assert!(!s.can_redo());
    assert!(matches!(s.redo(), Err(EditorError::NothingToRedo)));
}

#[test]
fn undo_on_fresh_session_fails() {
    let mut s = session();
    let before = s.document().clone();
    assert!(matches!(s.undo(), Err(EditorError::NothingToUndo)));
    assert_eq!(s.document(), &before);
}

#[test]
fn navigation_is_undoable() {
    let mut s = session();
    s.create_slide("content").unwrap();
    let depth = s.history().undo_len();

    s.go_to_slide(0).unwrap();
    assert_eq!(s.history().undo_len(), depth + 1);
    s.go_to_slide(0).unwrap();
    assert_eq!(s.history().undo_len(), depth + 1);

    s.undo().unwrap();
    assert_eq!(s.active_index(), 1);
    assert_eq!(s.slide_count(), 2);

    s.undo().unwrap();
    assert_eq!(s.slide_count(), 1);
    assert_eq!(s.active_index(), 0);
}

#[test]
fn opening_at_a_slide_is_not_recorded() {
    let mut s = session();
    s.create_slide("content").unwrap();
    let depth = s.history().undo_len();

    s.open_at(0).unwrap();
    assert_eq!(s.active_index(), 0);
    assert_eq!(s.history().undo_len(), depth);
    assert!(matches!(
        s.open_at(5),
        Err(EditorError::IndexOutOfRange { index: 5, len: 2 })
    ));
}

#[test]
fn history_limit_drops_oldest() {
    let mut s = session().with_history_limit(Some(2));
    for i in 0..4 {
        s.add_element(label(&format!("n{i}"))).unwrap();
    }
    assert_eq!(s.history().undo_len(), 2);
    s.undo().unwrap();
    s.undo().unwrap();
    assert_eq!(s.active_slide().elements.len(), 4);
    assert!(s.undo().is_err());
}

#[test]
fn modified_flag_follows_edits() {
    let mut s = session();
    assert!(!s.is_modified());
    s.add_element(label("x")).unwrap();
    assert!(s.is_modified());
    s.mark_saved();
    assert!(!s.is_modified());
}
