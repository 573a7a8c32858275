use thiserror::Error;

use crate::ai::GenerationError;
use crate::model::{ElementId, ModelError};

/// Broad class of an [`EditorError`], used by front ends to decide how to
/// report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    StateProtection,
    IndexOutOfRange,
    ExternalService,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("cannot delete the last remaining slide")]
    LastSlideProtected,

    #[error("slide index {index} out of range (document has {len} slides)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("content generation failed: {0}")]
    ContentGenerationFailed(#[source] GenerationError),

    #[error("collaboration transport: {0}")]
    Transport(String),
}

impl EditorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EditorError::Validation(_) => ErrorCategory::Validation,
            EditorError::TemplateNotFound(_) | EditorError::ElementNotFound(_) => {
                ErrorCategory::NotFound
            }
            EditorError::LastSlideProtected
            | EditorError::NothingToUndo
            | EditorError::NothingToRedo => ErrorCategory::StateProtection,
            EditorError::IndexOutOfRange { .. } => ErrorCategory::IndexOutOfRange,
            EditorError::ContentGenerationFailed(_) | EditorError::Transport(_) => {
                ErrorCategory::ExternalService
            }
        }
    }
}

impl From<ModelError> for EditorError {
    fn from(err: ModelError) -> Self {
        EditorError::Validation(err.to_string())
    }
}

impl From<GenerationError> for EditorError {
    fn from(err: GenerationError) -> Self {
        EditorError::ContentGenerationFailed(err)
    }
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;
