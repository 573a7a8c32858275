use std::path::Path;

use tiny_skia::{
    Color, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

use crate::model::{ColorSpec, FontSpec};
use crate::render::RenderError;
use crate::render::text::FontBook;

const STROKE_WIDTH: f32 = 1.0;

/// Paint target for the slide pipeline.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    /// Cover the whole surface with `color`, discarding what was there.
    fn fill(&mut self, color: ColorSpec);

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: ColorSpec);

    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, color: ColorSpec);

    /// Draw a single line of text with its baseline at `y`.
    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: ColorSpec,
        fonts: &FontBook,
    );

    /// Draw `image` scaled into the destination rectangle.
    fn draw_image(&mut self, image: &Pixmap, x: f32, y: f32, width: f32, height: f32);
}

/// CPU raster surface backed by a premultiplied RGBA pixmap.
#[derive(Clone)]
pub struct PixelSurface {
    pixmap: Pixmap,
}

fn paint_for(color: ColorSpec) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Raw premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha RGBA pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let pixels: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        image::RgbaImage::from_raw(self.width(), self.height(), pixels)
            .unwrap_or_else(|| image::RgbaImage::new(self.width(), self.height()))
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        self.to_rgba_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Source-over blend of an 8-bit coverage mask in `color`.
    fn blend_coverage(
        &mut self,
        left: i32,
        top: i32,
        mask_width: usize,
        mask_height: usize,
        coverage: &[u8],
        color: ColorSpec,
    ) {
        let width = self.width() as i32;
        let height = self.height() as i32;
        let data = self.pixmap.data_mut();
        for row in 0..mask_height {
            let py = top + row as i32;
            if py < 0 || py >= height {
                continue;
            }
            for col in 0..mask_width {
                let px = left + col as i32;
                if px < 0 || px >= width {
                    continue;
                }
                let cov = coverage[row * mask_width + col] as u32;
                if cov == 0 {
                    continue;
                }
                let sa = (color.a as u32 * cov + 127) / 255;
                let inv = 255 - sa;
                let idx = ((py * width + px) * 4) as usize;
                let src = [color.r, color.g, color.b];
                for (channel, value) in src.iter().enumerate() {
                    let s = (*value as u32 * sa + 127) / 255;
                    let d = data[idx + channel] as u32;
                    data[idx + channel] = (s + (d * inv + 127) / 255).min(255) as u8;
                }
                let d = data[idx + 3] as u32;
                data[idx + 3] = (sa + (d * inv + 127) / 255).min(255) as u8;
            }
        }
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn fill(&mut self, color: ColorSpec) {
        self.pixmap
            .fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: ColorSpec) {
        let Some(rect) = Rect::from_xywh(x, y, width, height) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: STROKE_WIDTH,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &paint_for(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, color: ColorSpec) {
        let Some(path) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        let stroke = Stroke {
            width: STROKE_WIDTH,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &paint_for(color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        color: ColorSpec,
        fonts: &FontBook,
    ) {
        let Some(face) = fonts.face(font) else {
            return;
        };
        let embolden = fonts.needs_synthetic_bold(font);
        let mut pen_x = x;
        for ch in text.chars() {
            let (metrics, coverage) = face.rasterize(ch, font.size);
            if metrics.width > 0 && metrics.height > 0 {
                let left = (pen_x + metrics.xmin as f32).round() as i32;
                // ymin is the distance from the baseline to the glyph's bottom edge
                let top = (y - metrics.height as f32 - metrics.ymin as f32).round() as i32;
                self.blend_coverage(left, top, metrics.width, metrics.height, &coverage, color);
                if embolden {
                    self.blend_coverage(
                        left + 1,
                        top,
                        metrics.width,
                        metrics.height,
                        &coverage,
                        color,
                    );
                }
            }
            pen_x += metrics.advance_width;
        }
    }

    fn draw_image(&mut self, image: &Pixmap, x: f32, y: f32, width: f32, height: f32) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let sx = width / image.width() as f32;
        let sy = height / image.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, x, y),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            PixelSurface::new(0, 10),
            Err(RenderError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_fill_covers_every_pixel() {
        let mut surface = PixelSurface::new(8, 4).unwrap();
        surface.fill(ColorSpec::rgb(10, 20, 30));
        for y in 0..4 {
            for x in 0..8 {
                assert_eq!(surface.pixel(x, y), Some([10, 20, 30, 255]));
            }
        }
    }

    #[test]
    fn test_stroke_rect_leaves_interior_untouched() {
        let mut surface = PixelSurface::new(40, 40).unwrap();
        surface.fill(ColorSpec::WHITE);
        surface.stroke_rect(10.5, 10.5, 20.0, 20.0, ColorSpec::BLACK);
        assert_eq!(surface.pixel(20, 20), Some([255, 255, 255, 255]));
        let edge = surface.pixel(10, 20).unwrap();
        assert!(edge[0] < 255, "edge pixel should be darkened: {edge:?}");
    }

    #[test]
    fn test_draw_image_scales_into_rect() {
        let mut red = Pixmap::new(2, 2).unwrap();
        red.fill(Color::from_rgba8(255, 0, 0, 255));

        let mut surface = PixelSurface::new(20, 20).unwrap();
        surface.fill(ColorSpec::WHITE);
        surface.draw_image(&red, 4.0, 4.0, 10.0, 10.0);
        assert_eq!(surface.pixel(9, 9), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(18, 18), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_png_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut surface = PixelSurface::new(3, 2).unwrap();
        surface.fill(ColorSpec::rgb(1, 2, 3));
        surface.save_png(&path).unwrap();
        let loaded = image::open(&path).unwrap().into_rgba8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1).0, [1, 2, 3, 255]);
    }
}
