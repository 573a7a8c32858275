//! Document persistence as pretty-printed JSON.

use std::path::{Path, PathBuf};

use crate::model::{Document, ElementId, ModelError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no document at {0}")]
    NotFound(PathBuf),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid document: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} contains no slides")]
    Empty(PathBuf),
    #[error("{path}: slide {slide}, element {id}: {source}")]
    InvalidElement {
        path: PathBuf,
        slide: usize,
        id: ElementId,
        #[source]
        source: ModelError,
    },
}

/// A document file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folder that relative image sources resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write `document` and return where it went.
    pub fn save(&self, document: &Document) -> Result<PathBuf, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(document).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)?;
        log::debug!("Saved {} slides to {}", document.slide_count(), self.path.display());
        Ok(self.path.clone())
    }

    pub fn load(&self) -> Result<Document, StoreError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(self.path.clone())
            } else {
                StoreError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let mut document: Document =
            serde_json::from_str(&contents).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        if document.slides.is_empty() {
            return Err(StoreError::Empty(self.path.clone()));
        }
        for (slide, placed) in document
            .slides
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.elements.iter().map(move |e| (i, e)))
        {
            placed
                .element
                .validate()
                .map_err(|source| StoreError::InvalidElement {
                    path: self.path.clone(),
                    slide,
                    id: placed.id,
                    source,
                })?;
        }
        document.clamp_active();
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementId, Slide};
    use crate::templates::TemplateCatalog;

    fn sample() -> Document {
        let catalog = TemplateCatalog::builtin();
        let mut doc = Document::with_slide(
            catalog.get("title").unwrap().instantiate("title", ElementId(1)),
        );
        doc.slides
            .push(catalog.get("image").unwrap().instantiate("image", ElementId(3)));
        doc.active_slide_index = 1;
        doc
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("decks/talk.json"));
        let doc = sample();
        let location = store.save(&doc).unwrap();
        assert_eq!(location, store.path());
        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_invalid_json_and_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StoreError::Json { .. })));

        std::fs::write(&path, r#"{"slides":[],"activeSlideIndex":0}"#).unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StoreError::Empty(_))));
    }

    #[test]
    fn test_load_rejects_elements_outside_the_canvas_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("deck.json"));

        let mut doc = sample();
        store.save(&doc).unwrap();
        let json = std::fs::read_to_string(store.path()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["slides"][1]["elements"][0]["x"] = serde_json::json!(-4.0);
        std::fs::write(store.path(), value.to_string()).unwrap();

        match store.load() {
            Err(StoreError::InvalidElement { slide, id, .. }) => {
                assert_eq!(slide, 1);
                assert_eq!(id, doc.slides[1].elements[0].id);
            }
            other => panic!("expected an invalid element, got {other:?}"),
        }

        doc.slides[0].elements.clear();
        doc.slides[1].elements.clear();
        store.save(&doc).unwrap();
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_load_clamps_active_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("deck.json"));
        let mut doc = Document::with_slide(Slide::blank());
        doc.active_slide_index = 9;
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap().active_slide_index, 0);
    }

    #[test]
    fn test_base_dir_of_bare_file_name() {
        assert_eq!(FileStore::new("deck.json").base_dir(), PathBuf::from("."));
    }
}
