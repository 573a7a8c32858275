pub mod image_cache;
pub mod surface;
pub mod text;

use std::path::PathBuf;

use crate::model::{Document, Element, ShapeKind, Slide};

use image_cache::{ImageLoader, ImageState, ImageStore};
use surface::{PixelSurface, Surface};
use text::FontBook;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("font: {0}")]
    Font(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

/// Read-only inputs of the pipeline besides the slide itself.
#[derive(Default)]
pub struct RenderAssets {
    pub fonts: FontBook,
    pub images: ImageStore,
}

impl RenderAssets {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            images: ImageStore::new(),
        }
    }
}

/// What a paint pass could not finish.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderReport {
    /// Image sources never requested before; they drew nothing this pass.
    pub missing_images: Vec<String>,
    /// Image sources still loading; they drew nothing this pass.
    pub pending_images: usize,
}

/// Paint one slide: background first, then every element in order, so later
/// elements cover earlier ones. Output depends only on the surface size, the
/// slide and the assets; whatever the surface held before is overwritten.
///
/// Images that are not loaded yet are skipped and listed in the report.
pub fn render_slide<S: Surface + ?Sized>(
    surface: &mut S,
    slide: &Slide,
    assets: &RenderAssets,
) -> RenderReport {
    let mut report = RenderReport::default();
    surface.fill(slide.background);

    for placed in &slide.elements {
        match &placed.element {
            Element::Text(t) => {
                surface.draw_text(&t.content, t.x, t.y, &t.font, t.color, &assets.fonts);
            }
            Element::Shape(s) => match s.shape {
                ShapeKind::Rectangle => {
                    if let (Some(w), Some(h)) = (s.width, s.height) {
                        surface.stroke_rect(s.x, s.y, w, h, s.color);
                    }
                }
                ShapeKind::Circle => {
                    if let Some(r) = s.radius {
                        surface.stroke_circle(s.x, s.y, r, s.color);
                    }
                }
            },
            Element::Image(i) => match assets.images.get(&i.source) {
                Some(ImageState::Ready(image)) => {
                    surface.draw_image(image, i.x, i.y, i.width, i.height);
                }
                Some(ImageState::Pending) => report.pending_images += 1,
                Some(ImageState::Failed) => {}
                None => {
                    if !report.missing_images.contains(&i.source) {
                        report.missing_images.push(i.source.clone());
                    }
                }
            },
        }
    }
    report
}

/// Paint slide `index` of `document`. Returns `None` for an index outside
/// the document.
pub fn render_document<S: Surface + ?Sized>(
    surface: &mut S,
    document: &Document,
    index: usize,
    assets: &RenderAssets,
) -> Option<RenderReport> {
    let slide = document.slides.get(index)?;
    Some(render_slide(surface, slide, assets))
}

/// The editor's on-screen raster: a surface, its assets and the background
/// image loader.
pub struct Canvas {
    surface: PixelSurface,
    assets: RenderAssets,
    loader: ImageLoader,
    generation: u64,
}

impl Canvas {
    pub fn new(
        width: u32,
        height: u32,
        fonts: FontBook,
        base_dir: PathBuf,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            surface: PixelSurface::new(width, height)?,
            assets: RenderAssets::new(fonts),
            loader: ImageLoader::new(base_dir),
            generation: 0,
        })
    }

    /// Paint `slide` and start loads for any image it is missing.
    pub fn paint(&mut self, slide: &Slide) {
        let report = render_slide(&mut self.surface, slide, &self.assets);
        if !report.missing_images.is_empty() {
            self.loader
                .request(&mut self.assets.images, &report.missing_images);
        }
        self.generation += 1;
    }

    /// Collect finished image loads. True when the slide should be painted
    /// again to show them.
    pub fn pump_images(&mut self) -> bool {
        self.loader.pump(&mut self.assets.images)
    }

    pub async fn wait_for_images(&mut self) {
        self.loader.wait_idle(&mut self.assets.images).await;
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn assets(&self) -> &RenderAssets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut RenderAssets {
        &mut self.assets
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Number of paint passes so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
