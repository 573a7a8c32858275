//! The editing session: sole writer of the [`Document`].
//!
//! Every local edit follows the same sequence: validate, snapshot history,
//! build the new state, repaint the active slide, broadcast to peers when a
//! collaboration channel is attached. Edits arriving from peers take the
//! remote path instead, which never snapshots and never re-broadcasts.
//! Undo and redo keep whatever peers wrote to a slide after the restored
//! state was recorded.

use std::collections::BTreeSet;

#[cfg(test)]
mod tests;

use crate::ai::{ContentGenerator, GenerationError};
use crate::collaboration::{CollaborationChannel, CursorPosition, WireMessage};
use crate::error::{EditorError, EditorResult};
use crate::history::{HistoryManager, Restored};
use crate::model::{Document, Element, ElementId, ElementPatch, Slide, SlideElement};
use crate::render::Canvas;
use crate::render::text::GeneratedLayout;
use crate::templates::TemplateCatalog;

/// Horizontal space kept free around generated text.
const GENERATED_MARGIN: f32 = 100.0;

pub const INITIAL_TEMPLATE: &str = "title";

pub struct EditorSession {
    document: Document,
    history: HistoryManager,
    catalog: TemplateCatalog,
    canvas: Canvas,
    layout: GeneratedLayout,
    channel: Option<CollaborationChannel>,
    modified: bool,
}

impl EditorSession {
    /// Start a new document with one slide from the `title` template.
    pub fn new(catalog: TemplateCatalog, canvas: Canvas) -> EditorResult<Self> {
        Self::from_template(catalog, canvas, INITIAL_TEMPLATE)
    }

    pub fn from_template(
        catalog: TemplateCatalog,
        canvas: Canvas,
        template_id: &str,
    ) -> EditorResult<Self> {
        let template = catalog
            .get(template_id)
            .ok_or_else(|| EditorError::TemplateNotFound(template_id.to_string()))?;
        let slide = template.instantiate(template_id, ElementId(1));
        Ok(Self::with_document(Document::with_slide(slide), catalog, canvas))
    }

    /// Open an existing document. An empty document gets a blank slide so the
    /// active index is always valid.
    pub fn with_document(mut document: Document, catalog: TemplateCatalog, canvas: Canvas) -> Self {
        if document.slides.is_empty() {
            document.slides.push(Slide::blank());
        }
        document.clamp_active();
        let mut session = Self {
            document,
            history: HistoryManager::new(),
            catalog,
            canvas,
            layout: GeneratedLayout::default(),
            channel: None,
            modified: false,
        };
        session.render();
        session
    }

    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history = match limit {
            Some(limit) => HistoryManager::with_limit(limit),
            None => HistoryManager::new(),
        };
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn active_index(&self) -> usize {
        self.document.active_slide_index
    }

    pub fn active_slide(&self) -> &Slide {
        &self.document.slides[self.document.active_slide_index]
    }

    pub fn slide_count(&self) -> usize {
        self.document.slide_count()
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of times the active slide has been painted.
    pub fn render_generation(&self) -> u64 {
        self.canvas.generation()
    }

    /// True when the document changed since it was opened or last saved.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    fn render(&mut self) {
        let index = self.document.active_slide_index;
        if let Some(slide) = self.document.slides.get(index) {
            self.canvas.paint(slide);
        }
    }

    fn broadcast_slide(&self, index: usize) {
        if let (Some(channel), Some(slide)) = (&self.channel, self.document.slides.get(index)) {
            channel.broadcast_slide(index, slide);
        }
    }

    fn broadcast_document(&self) {
        if let Some(channel) = &self.channel {
            channel.broadcast_snapshot(&self.document.slides);
        }
    }

    /// Snapshot, then swap in `next` as the document.
    fn commit(&mut self, next: Document) {
        self.history.snapshot(&self.document);
        self.document = next;
        self.modified = true;
    }

    fn active_slide_mut(next: &mut Document) -> &mut Slide {
        let index = next.active_slide_index;
        &mut next.slides[index]
    }

    // Slides

    /// Append a slide built from `template_id` and make it active.
    pub fn create_slide(&mut self, template_id: &str) -> EditorResult<usize> {
        let template = self
            .catalog
            .get(template_id)
            .ok_or_else(|| EditorError::TemplateNotFound(template_id.to_string()))?;
        let slide = template.instantiate(template_id, self.document.next_element_id());

        let mut next = self.document.clone();
        next.slides.push(slide);
        let index = next.slides.len() - 1;
        next.active_slide_index = index;
        self.commit(next);
        log::debug!("Created slide {index} from template '{template_id}'");

        self.render();
        self.broadcast_slide(index);
        Ok(index)
    }

    /// Remove slide `index`. The slide before it becomes active.
    pub fn delete_slide(&mut self, index: usize) -> EditorResult<()> {
        let len = self.document.slide_count();
        if len <= 1 {
            return Err(EditorError::LastSlideProtected);
        }
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }

        let mut next = self.document.clone();
        next.slides.remove(index);
        next.active_slide_index = index.saturating_sub(1);
        self.commit(next);
        log::debug!("Deleted slide {index}");

        self.render();
        self.broadcast_document();
        Ok(())
    }

    /// Switch the active slide. The switch is recorded in history so undo
    /// returns to the previous slide. Slide content is unchanged, so nothing
    /// is broadcast. Going to the active slide only repaints.
    pub fn go_to_slide(&mut self, index: usize) -> EditorResult<()> {
        self.check_slide_index(index)?;
        if index != self.document.active_slide_index {
            self.history.snapshot(&self.document);
            self.document.active_slide_index = index;
        }
        self.render();
        Ok(())
    }

    /// Position a freshly opened session on slide `index` without recording
    /// history.
    pub fn open_at(&mut self, index: usize) -> EditorResult<()> {
        self.check_slide_index(index)?;
        self.document.active_slide_index = index;
        self.render();
        Ok(())
    }

    fn check_slide_index(&self, index: usize) -> EditorResult<()> {
        let len = self.document.slide_count();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    /// Move to the following slide. Returns false at the last slide.
    pub fn next_slide(&mut self) -> bool {
        let target = self.active_index() + 1;
        target < self.slide_count() && self.go_to_slide(target).is_ok()
    }

    /// Move to the preceding slide. Returns false at the first slide.
    pub fn previous_slide(&mut self) -> bool {
        match self.active_index().checked_sub(1) {
            Some(target) => self.go_to_slide(target).is_ok(),
            None => false,
        }
    }

    // Elements

    /// Append `element` to the active slide, on top of everything else.
    pub fn add_element(&mut self, element: Element) -> EditorResult<ElementId> {
        element.validate()?;
        let id = self.document.next_element_id();

        let mut next = self.document.clone();
        Self::active_slide_mut(&mut next)
            .elements
            .push(SlideElement { id, element });
        self.commit(next);
        log::debug!("Added element {id} to slide {}", self.active_index());

        self.render();
        self.broadcast_slide(self.active_index());
        Ok(id)
    }

    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> EditorResult<()> {
        if patch.is_empty() {
            return Err(EditorError::Validation("the update changes nothing".to_string()));
        }
        let slide = self.active_slide();
        let position = slide.position_of(id).ok_or(EditorError::ElementNotFound(id))?;
        let updated = patch.apply(&slide.elements[position].element)?;

        let mut next = self.document.clone();
        Self::active_slide_mut(&mut next).elements[position].element = updated;
        self.commit(next);
        log::debug!("Updated element {id}");

        self.render();
        self.broadcast_slide(self.active_index());
        Ok(())
    }

    pub fn remove_element(&mut self, id: ElementId) -> EditorResult<()> {
        let position = self
            .active_slide()
            .position_of(id)
            .ok_or(EditorError::ElementNotFound(id))?;

        let mut next = self.document.clone();
        Self::active_slide_mut(&mut next).elements.remove(position);
        self.commit(next);
        log::debug!("Removed element {id}");

        self.render();
        self.broadcast_slide(self.active_index());
        Ok(())
    }

    /// Replace the active slide's background and elements with those of
    /// `template_id`.
    pub fn apply_template(&mut self, template_id: &str) -> EditorResult<()> {
        let template = self
            .catalog
            .get(template_id)
            .ok_or_else(|| EditorError::TemplateNotFound(template_id.to_string()))?;
        let slide = template.instantiate(template_id, self.document.next_element_id());

        let mut next = self.document.clone();
        *Self::active_slide_mut(&mut next) = slide;
        self.commit(next);
        log::debug!(
            "Applied template '{template_id}' to slide {}",
            self.active_index()
        );

        self.render();
        self.broadcast_slide(self.active_index());
        Ok(())
    }

    // Generation

    /// Ask `generator` for slide text and append it to the active slide as
    /// laid-out text elements. `context` defaults to the active slide's text.
    ///
    /// The document and history are untouched unless generation succeeds.
    pub async fn generate_from_prompt(
        &mut self,
        generator: &dyn ContentGenerator,
        prompt: &str,
        context: Option<&str>,
    ) -> EditorResult<Vec<ElementId>> {
        if prompt.trim().is_empty() {
            return Err(EditorError::Validation("the prompt is empty".to_string()));
        }
        let context = match context {
            Some(context) => context.to_string(),
            None => self.active_slide().text_content(),
        };
        log::debug!("Requesting content from {}", generator.name());
        let text = generator.generate(prompt, &context).await?;
        self.insert_generated(&text)
    }

    /// Lay out already generated `text` on the active slide. Front ends that
    /// run the generator on another task finish through here.
    pub fn insert_generated(&mut self, text: &str) -> EditorResult<Vec<ElementId>> {
        let max_width = (self.canvas.width() as f32 - GENERATED_MARGIN).max(1.0);
        let elements = self
            .layout
            .layout(text, max_width, &self.canvas.assets().fonts);
        if elements.is_empty() {
            return Err(GenerationError::Empty.into());
        }
        for element in &elements {
            element.validate()?;
        }

        let first = self.document.next_element_id().0;
        let ids: Vec<ElementId> = (0..elements.len() as u64)
            .map(|i| ElementId(first + i))
            .collect();
        let mut next = self.document.clone();
        Self::active_slide_mut(&mut next).elements.extend(
            ids.iter()
                .zip(elements)
                .map(|(id, element)| SlideElement { id: *id, element }),
        );
        self.commit(next);
        log::debug!("Inserted {} generated elements", ids.len());

        self.render();
        self.broadcast_slide(self.active_index());
        Ok(ids)
    }

    // History

    pub fn undo(&mut self) -> EditorResult<()> {
        let previous = self
            .history
            .undo(&self.document)
            .ok_or(EditorError::NothingToUndo)?;
        self.restore(previous);
        log::debug!("Undo ({} left)", self.history.undo_len());
        Ok(())
    }

    pub fn redo(&mut self) -> EditorResult<()> {
        let next = self
            .history
            .redo(&self.document)
            .ok_or(EditorError::NothingToRedo)?;
        self.restore(next);
        log::debug!("Redo ({} left)", self.history.redo_len());
        Ok(())
    }

    fn restore(&mut self, restored: Restored) {
        let Restored {
            mut document,
            remote_slides,
        } = restored;
        keep_remote_slides(&mut document, &self.document, &remote_slides);
        document.clamp_active();

        let previous = std::mem::replace(&mut self.document, document);
        if previous.slides != self.document.slides {
            self.modified = true;
        }
        self.render();
        self.broadcast_restored(&previous);
    }

    /// Send peers the slides a restore changed. A shorter slide list cannot
    /// be expressed as slide updates and goes out as a snapshot.
    fn broadcast_restored(&self, previous: &Document) {
        let Some(channel) = &self.channel else {
            return;
        };
        let slides = &self.document.slides;
        if slides.len() < previous.slides.len() {
            channel.broadcast_snapshot(slides);
            return;
        }
        for (index, slide) in slides.iter().enumerate() {
            if previous.slides.get(index) != Some(slide) {
                channel.broadcast_slide(index, slide);
            }
        }
    }

    // Collaboration

    /// Attach a channel; from now on local edits are broadcast through it.
    /// Replaces (and returns) any previous channel.
    pub fn attach_channel(&mut self, channel: CollaborationChannel) -> Option<CollaborationChannel> {
        log::info!(
            "Collaborating in session {} as {}",
            channel.session().session_id(),
            channel.session().user_id()
        );
        self.channel.replace(channel)
    }

    pub fn detach_channel(&mut self) -> Option<CollaborationChannel> {
        self.channel.take()
    }

    pub fn channel(&self) -> Option<&CollaborationChannel> {
        self.channel.as_ref()
    }

    pub fn remote_cursors(&self) -> Vec<(String, CursorPosition)> {
        self.channel
            .as_ref()
            .map(|c| {
                c.session()
                    .remote_cursors()
                    .map(|(id, pos)| (id.to_string(), pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Publish the local pointer position to peers.
    pub fn move_cursor(&self, x: f32, y: f32) {
        if let Some(channel) = &self.channel {
            channel.move_cursor(x, y);
        }
    }

    /// Apply everything peers sent since the last call. Returns the number
    /// of document changes applied.
    pub fn pump_collaboration(&mut self) -> usize {
        let Some(channel) = self.channel.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        for message in channel.drain() {
            if self.apply_remote(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply one peer edit. Never snapshots and never re-broadcasts; the
    /// active slide is repainted only when its content changed. Returns
    /// whether the document changed.
    pub fn apply_remote(&mut self, message: WireMessage) -> bool {
        match message {
            WireMessage::SlideUpdate {
                slide_index,
                document_fragment,
                user_id,
                ..
            } => {
                let len = self.document.slide_count();
                if slide_index > len {
                    log::warn!(
                        "Ignoring slide update from {user_id} for slide {slide_index} (document has {len})"
                    );
                    return false;
                }
                if slide_index == len {
                    self.document.slides.push(document_fragment);
                } else {
                    self.document.slides[slide_index] = document_fragment;
                }
                self.history.note_remote(slide_index);
                self.modified = true;
                if slide_index == self.document.active_slide_index {
                    self.render();
                }
                true
            }
            WireMessage::DocumentSnapshot { slides, user_id, .. } => {
                if slides.is_empty() {
                    log::warn!("Ignoring empty document snapshot from {user_id}");
                    return false;
                }
                let before = self.active_slide().clone();
                let replaced = slides.len().max(self.document.slide_count());
                for index in 0..replaced {
                    if self.document.slides.get(index) != slides.get(index) {
                        self.history.note_remote(index);
                    }
                }
                self.document.slides = slides;
                self.document.clamp_active();
                self.modified = true;
                if *self.active_slide() != before {
                    self.render();
                }
                true
            }
            WireMessage::Join { .. } | WireMessage::CursorMove { .. } => false,
        }
    }

    /// Collect finished image loads and repaint when any arrived.
    pub fn pump_images(&mut self) -> bool {
        if self.canvas.pump_images() {
            self.render();
            true
        } else {
            false
        }
    }

    /// Wait for every pending image load, then repaint.
    pub async fn wait_for_images(&mut self) {
        self.canvas.wait_for_images().await;
        self.render();
    }
}

/// Carry the slides in `remote` over from `current` into `restored`. A slide
/// peers appended is appended again; a tail peers removed stays removed.
fn keep_remote_slides(restored: &mut Document, current: &Document, remote: &BTreeSet<usize>) {
    for &index in remote {
        let Some(slide) = current.slides.get(index) else {
            continue;
        };
        if index < restored.slides.len() {
            restored.slides[index] = slide.clone();
        } else if index == restored.slides.len() {
            restored.slides.push(slide.clone());
        }
    }
    let kept = current.slides.len();
    if restored.slides.len() > kept
        && kept > 0
        && (kept..restored.slides.len()).all(|index| remote.contains(&index))
    {
        restored.slides.truncate(kept);
    }
}
