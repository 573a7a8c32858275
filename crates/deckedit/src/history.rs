//! Undo/redo over whole-document snapshots.
//!
//! Entries are full copies of the [`Document`], never diffs, and their
//! documents are not touched again once pushed. Each entry also remembers
//! which slides peers replaced after it was recorded, so a restore can keep
//! those slides as they are now.

use std::collections::BTreeSet;

use crate::model::Document;

#[derive(Debug)]
struct Entry {
    document: Document,
    remote_slides: BTreeSet<usize>,
}

impl Entry {
    fn new(document: Document) -> Self {
        Self {
            document,
            remote_slides: BTreeSet::new(),
        }
    }

    fn into_restored(self) -> Restored {
        Restored {
            document: self.document,
            remote_slides: self.remote_slides,
        }
    }
}

/// A document taken off one of the stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub document: Document,
    /// Slide indices replaced by peers since `document` was recorded.
    pub remote_slides: BTreeSet<usize>,
}


#[derive(Debug, Default)]
pub struct HistoryManager {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    /// Maximum undo depth; `None` keeps everything.
    limit: Option<usize>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Record the state about to be changed by a local edit.
    /// Must run before the edit is applied. Clears the redo stack.
    pub fn snapshot(&mut self, doc: &Document) {
        self.undo_stack.push(Entry::new(doc.clone()));
        if let Some(limit) = self.limit {
            if self.undo_stack.len() > limit {
                let excess = self.undo_stack.len() - limit;
                self.undo_stack.drain(..excess);
            }
        }
        self.redo_stack.clear();
    }

    /// Step back. Returns `None` when there is nothing to undo, in which case
    /// neither stack changes.
    pub fn undo(&mut self, current: &Document) -> Option<Restored> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(Entry::new(current.clone()));
        Some(previous.into_restored())
    }

    /// Step forward again after an undo. Returns `None` when there is nothing
    /// to redo.
    pub fn redo(&mut self, current: &Document) -> Option<Restored> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(Entry::new(current.clone()));
        Some(next.into_restored())
    }

    /// Note that a peer replaced slide `index`. Every recorded entry is now
    /// stale for that slide.
    pub fn note_remote(&mut self, index: usize) {
        for entry in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            entry.remote_slides.insert(index);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorSpec, Slide};

    fn doc_with_background(r: u8) -> Document {
        let mut slide = Slide::blank();
        slide.background = ColorSpec::rgb(r, 0, 0);
        Document::with_slide(slide)
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut history = HistoryManager::new();
        let doc = doc_with_background(1);
        assert!(history.undo(&doc).is_none());
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = HistoryManager::new();
        let before = doc_with_background(1);
        let after = doc_with_background(2);

        history.snapshot(&before);
        let restored = history.undo(&after).unwrap().document;
        assert_eq!(restored, before);
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.redo_len(), 1);

        let again = history.redo(&restored).unwrap().document;
        assert_eq!(again, after);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_snapshot_clears_redo() {
        let mut history = HistoryManager::new();
        history.snapshot(&doc_with_background(1));
        history.undo(&doc_with_background(2)).unwrap();
        assert!(history.can_redo());

        history.snapshot(&doc_with_background(3));
        assert!(!history.can_redo());
        assert!(history.redo(&doc_with_background(4)).is_none());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut history = HistoryManager::new();
        let mut doc = doc_with_background(1);
        history.snapshot(&doc);
        doc.slides[0].background = ColorSpec::WHITE;
        let restored = history.undo(&doc).unwrap().document;
        assert_eq!(restored.slides[0].background, ColorSpec::rgb(1, 0, 0));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = HistoryManager::with_limit(2);
        for r in 1..=4 {
            history.snapshot(&doc_with_background(r));
        }
        assert_eq!(history.undo_len(), 2);
        let current = doc_with_background(5);
        let first = history.undo(&current).unwrap().document;
        let second = history.undo(&first).unwrap().document;
        assert_eq!(first.slides[0].background.r, 4);
        assert_eq!(second.slides[0].background.r, 3);
        assert!(history.undo(&second).is_none());
    }

    #[test]
    fn test_remote_marks_reach_every_entry() {
        let mut history = HistoryManager::new();
        history.snapshot(&doc_with_background(1));
        history.snapshot(&doc_with_background(2));
        history.note_remote(0);
        history.snapshot(&doc_with_background(3));

        let newest = history.undo(&doc_with_background(4)).unwrap();
        assert!(newest.remote_slides.is_empty());

        let older = history.undo(&newest.document).unwrap();
        assert_eq!(older.remote_slides, BTreeSet::from([0]));

        // Redo entries go stale too.
        history.note_remote(1);
        let redone = history.redo(&older.document).unwrap();
        assert_eq!(redone.remote_slides, BTreeSet::from([1]));
    }
}
