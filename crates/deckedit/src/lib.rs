//! deckedit: a slide presentation editor.
//!
//! The engine is [`editor::EditorSession`], which owns the document, its
//! undo history and an optional [`collaboration::CollaborationChannel`].
//! Slides are rasterised by [`render`]; text can be generated through an
//! [`ai::ContentGenerator`].

pub mod ai;
pub mod app;
pub mod cli;
pub mod collaboration;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod model;
pub mod render;
pub mod store;
pub mod templates;

pub use editor::EditorSession;
pub use error::{EditorError, EditorResult, ErrorCategory};
pub use model::{Document, Element, ElementId, ElementPatch, Slide};
