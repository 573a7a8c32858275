use anyhow::{Context, Result};
use colored::Colorize;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::model::{Document, Element};
use crate::render::image_cache::ImageLoader;
use crate::render::surface::PixelSurface;
use crate::render::text::FontBook;
use crate::render::{RenderAssets, render_slide};
use crate::store::FileStore;

pub fn run(
    file: &Path,
    output_dir: &Path,
    width: Option<u32>,
    height: Option<u32>,
    runtime: &tokio::runtime::Runtime,
) -> Result<()> {
    let config = Config::load_or_default();
    let store = FileStore::new(file);
    let document = super::load_document(&store)?;

    let (default_width, default_height) = config.canvas_size();
    let width = width.unwrap_or(default_width);
    let height = height.unwrap_or(default_height);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    eprintln!(
        "Rendering {} slides to {} ({}x{})",
        document.slides.len(),
        output_dir.display(),
        width,
        height,
    );

    let mut assets = RenderAssets::new(FontBook::load(config.font_path()));
    let sources = image_sources(&document);
    if !sources.is_empty() {
        let mut loader = ImageLoader::new(store.base_dir());
        loader.request(&mut assets.images, &sources);
        runtime.block_on(loader.wait_idle(&mut assets.images));
    }

    let written = export(&document, &assets, output_dir, width, height)?;
    for path in &written {
        eprintln!("  Saved {}", path.display());
    }
    eprintln!("{}", "Render complete.".green());
    Ok(())
}

/// Every distinct image source in the document, in first-use order.
fn image_sources(document: &Document) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for slide in &document.slides {
        for placed in &slide.elements {
            if let Element::Image(image) = &placed.element {
                if !sources.contains(&image.source) {
                    sources.push(image.source.clone());
                }
            }
        }
    }
    sources
}

/// Rasterise each slide to `slide-NN.png` in parallel.
fn export(
    document: &Document,
    assets: &RenderAssets,
    output_dir: &Path,
    width: u32,
    height: u32,
) -> Result<Vec<PathBuf>> {
    document
        .slides
        .par_iter()
        .enumerate()
        .map(|(index, slide)| -> Result<PathBuf> {
            let mut surface = PixelSurface::new(width, height)?;
            let report = render_slide(&mut surface, slide, assets);
            if !report.missing_images.is_empty() {
                log::warn!(
                    "Slide {}: images not drawn: {}",
                    index + 1,
                    report.missing_images.join(", ")
                );
            }
            let path = output_dir.join(format!("slide-{:02}.png", index + 1));
            surface
                .save_png(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorSpec, Slide};

    #[test]
    fn test_export_writes_one_png_per_slide() {
        let dir = tempfile::tempdir().unwrap();
        let mut second = Slide::blank();
        second.background = ColorSpec::rgb(0x10, 0x20, 0x30);
        let document = Document {
            slides: vec![Slide::blank(), second],
            active_slide_index: 0,
        };

        let written = export(&document, &RenderAssets::default(), dir.path(), 64, 36).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("slide-01.png"));
        assert!(written[1].ends_with("slide-02.png"));

        let image = image::open(&written[1]).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (64, 36));
        assert_eq!(image.get_pixel(5, 5).0, [0x10, 0x20, 0x30, 0xFF]);
    }

    #[test]
    fn test_image_sources_are_distinct() {
        let mut slide = Slide::blank();
        for (i, src) in ["a.png", "b.png", "a.png"].into_iter().enumerate() {
            slide.elements.push(crate::model::SlideElement {
                id: crate::model::ElementId(i as u64 + 1),
                element: Element::image(src, 0.0, 0.0, 10.0, 10.0),
            });
        }
        let document = Document::with_slide(slide);
        assert_eq!(image_sources(&document), vec!["a.png", "b.png"]);
    }
}
