//! Image sources resolved off the render path.
//!
//! [`ImageStore`] is plain data the pipeline reads from. [`ImageLoader`] fills
//! it in the background: the pipeline reports sources it could not draw, the
//! loader fetches them on the tokio blocking pool, and [`ImageLoader::pump`]
//! moves finished loads into the store so the caller can paint again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use tiny_skia::{IntSize, Pixmap};
use tokio::sync::mpsc;

use crate::render::RenderError;

#[derive(Clone)]
pub enum ImageState {
    Pending,
    Ready(Arc<Pixmap>),
    Failed,
}

#[derive(Clone, Default)]
pub struct ImageStore {
    entries: HashMap<String, ImageState>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &str) -> Option<&ImageState> {
        self.entries.get(source)
    }

    pub fn insert(&mut self, source: &str, image: Pixmap) {
        self.entries
            .insert(source.to_string(), ImageState::Ready(Arc::new(image)));
    }

    pub fn mark_pending(&mut self, source: &str) {
        self.entries.insert(source.to_string(), ImageState::Pending);
    }

    pub fn mark_failed(&mut self, source: &str) {
        self.entries.insert(source.to_string(), ImageState::Failed);
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ImageState::Pending))
            .count()
    }
}

type LoadResult = (String, Result<Pixmap, RenderError>);

pub struct ImageLoader {
    base_dir: PathBuf,
    tx: mpsc::UnboundedSender<LoadResult>,
    rx: mpsc::UnboundedReceiver<LoadResult>,
    in_flight: usize,
}

impl ImageLoader {
    /// Relative paths resolve against `base_dir`, normally the document's folder.
    pub fn new(base_dir: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            base_dir,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start loading every source the store knows nothing about yet.
    /// Never blocks; without a tokio runtime the sources are marked failed.
    pub fn request(&mut self, store: &mut ImageStore, sources: &[String]) {
        for source in sources {
            if store.get(source).is_some() {
                continue;
            }
            let Ok(handle) = tokio::runtime::Handle::try_current() else {
                log::warn!("No async runtime available to load image {source}");
                store.mark_failed(source);
                continue;
            };
            store.mark_pending(source);
            self.in_flight += 1;
            let tx = self.tx.clone();
            let base_dir = self.base_dir.clone();
            let source = source.clone();
            handle.spawn_blocking(move || {
                let result = load_source(&base_dir, &source);
                let _ = tx.send((source, result));
            });
        }
    }

    /// Move finished loads into the store. Returns true when at least one
    /// load resolved, meaning the slide should be painted again.
    pub fn pump(&mut self, store: &mut ImageStore) -> bool {
        let mut resolved = false;
        while let Ok((source, result)) = self.rx.try_recv() {
            self.finish(store, &source, result);
            resolved = true;
        }
        resolved
    }

    /// Wait until every requested load has resolved.
    pub async fn wait_idle(&mut self, store: &mut ImageStore) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some((source, result)) => self.finish(store, &source, result),
                None => break,
            }
        }
    }

    fn finish(&mut self, store: &mut ImageStore, source: &str, result: Result<Pixmap, RenderError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(image) => {
                log::debug!("Loaded image {source} ({}x{})", image.width(), image.height());
                store.insert(source, image);
            }
            Err(e) => {
                log::warn!("Failed to load image {source}: {e}");
                store.mark_failed(source);
            }
        }
    }
}

/// Fetch and decode an image source: `http(s)://` URL, `data:` URL, or a path
/// relative to `base_dir`.
pub fn load_source(base_dir: &Path, source: &str) -> Result<Pixmap, RenderError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        ureq::get(source)
            .call()
            .map_err(|e| RenderError::Fetch(e.to_string()))?
            .body_mut()
            .read_to_vec()
            .map_err(|e| RenderError::Fetch(e.to_string()))?
    } else if let Some(rest) = source.strip_prefix("data:") {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| RenderError::Fetch("malformed data URL".to_string()))?;
        if !header.ends_with(";base64") {
            return Err(RenderError::Fetch(
                "only base64 data URLs are supported".to_string(),
            ));
        }
        base64::engine::general_purpose::STANDARD.decode(payload)?
    } else {
        let path = Path::new(source);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };
        std::fs::read(path)?
    };
    decode(&bytes)
}

/// Decode encoded image bytes into a premultiplied pixmap.
pub fn decode(bytes: &[u8]) -> Result<Pixmap, RenderError> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
    let size = IntSize::from_wh(width, height).ok_or(RenderError::InvalidSize { width, height })?;
    Pixmap::from_vec(data, size).ok_or(RenderError::InvalidSize { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(color));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_premultiplies() {
        let pixmap = decode(&png_bytes([200, 100, 0, 128])).unwrap();
        let p = pixmap.pixel(0, 0).unwrap();
        assert_eq!(p.alpha(), 128);
        assert_eq!(p.red(), 100);
    }

    #[test]
    fn test_data_url_source() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes([0, 0, 255, 255]));
        let source = format!("data:image/png;base64,{encoded}");
        let pixmap = load_source(Path::new("."), &source).unwrap();
        assert_eq!(pixmap.width(), 2);
    }

    #[test]
    fn test_relative_path_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), png_bytes([1, 2, 3, 255])).unwrap();
        assert!(load_source(dir.path(), "pic.png").is_ok());
        assert!(load_source(dir.path(), "missing.png").is_err());
    }

    #[test]
    fn test_request_without_runtime_marks_failed() {
        let mut store = ImageStore::new();
        let mut loader = ImageLoader::new(PathBuf::from("."));
        loader.request(&mut store, &["a.png".to_string()]);
        assert!(matches!(store.get("a.png"), Some(ImageState::Failed)));
        assert_eq!(loader.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_and_wait() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.png"), png_bytes([9, 9, 9, 255])).unwrap();

        let mut store = ImageStore::new();
        let mut loader = ImageLoader::new(dir.path().to_path_buf());
        loader.request(
            &mut store,
            &["ok.png".to_string(), "broken.png".to_string()],
        );
        assert_eq!(store.pending_count(), 2);

        loader.wait_idle(&mut store).await;
        assert!(matches!(store.get("ok.png"), Some(ImageState::Ready(_))));
        assert!(matches!(store.get("broken.png"), Some(ImageState::Failed)));
        assert_eq!(loader.in_flight(), 0);
    }
}
