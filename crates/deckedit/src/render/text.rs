//! Fonts, measurement and the word-wrap layout used for generated content.

use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::model::{ColorSpec, Element, FontSpec};
use crate::render::RenderError;

/// Advance used per character when no font face is available.
const FALLBACK_ADVANCE: f32 = 0.55;

/// The font faces available to the rasterizer.
///
/// A book holds one family in a regular and (optionally) a bold face. The
/// family named in a [`FontSpec`] is advisory: every text element is drawn
/// with the book's faces, bold picks the bold face, or a synthetic bold when
/// the book has none.
#[derive(Default)]
pub struct FontBook {
    regular: Option<Font>,
    bold: Option<Font>,
}

fn parse_face(bytes: &[u8], index: u32) -> Result<Font, RenderError> {
    let settings = FontSettings {
        collection_index: index,
        ..FontSettings::default()
    };
    Font::from_bytes(bytes, settings).map_err(|e| RenderError::Font(e.to_string()))
}

impl FontBook {
    /// A book without faces. Text measures with a fixed per-character
    /// advance and draws nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        Ok(Self {
            regular: Some(parse_face(bytes, 0)?),
            bold: None,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Pick a sans-serif family from the installed system fonts.
    pub fn system() -> Option<Self> {
        use fontdb::{Database, Family, Query, Weight};

        let mut db = Database::new();
        db.load_system_fonts();

        let families = [
            Family::Name("Arial"),
            Family::Name("Liberation Sans"),
            Family::Name("DejaVu Sans"),
            Family::SansSerif,
        ];
        let load = |weight: Weight| {
            let id = db.query(&Query {
                families: &families,
                weight,
                ..Query::default()
            })?;
            db.with_face_data(id, |data, index| parse_face(data, index))?
                .ok()
        };

        let regular = load(Weight::NORMAL)?;
        let bold = load(Weight::BOLD);
        Some(Self {
            regular: Some(regular),
            bold,
        })
    }

    /// Resolve the font book for a session: an explicit font file first,
    /// then system fonts, then an empty book.
    pub fn load(font_path: Option<&Path>) -> Self {
        if let Some(path) = font_path {
            match Self::from_file(path) {
                Ok(book) => return book,
                Err(e) => log::warn!("Failed to load font {}: {e}", path.display()),
            }
        }
        Self::system().unwrap_or_else(|| {
            log::warn!("No usable system font found; text will not be drawn");
            Self::empty()
        })
    }

    pub fn has_faces(&self) -> bool {
        self.regular.is_some()
    }

    pub fn face(&self, font: &FontSpec) -> Option<&Font> {
        if font.bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref()
        }
    }

    pub fn needs_synthetic_bold(&self, font: &FontSpec) -> bool {
        font.bold && self.bold.is_none()
    }

    /// Horizontal advance of `text` in pixels.
    pub fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        match self.face(font) {
            Some(face) => text
                .chars()
                .map(|ch| face.metrics(ch, font.size).advance_width)
                .sum(),
            None => text.chars().count() as f32 * font.size * FALLBACK_ADVANCE,
        }
    }
}

/// Break `text` into lines no wider than `max_width`, on word boundaries.
/// A single word wider than the limit gets a line of its own.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Placement rules for text returned by the content generator: the first
/// non-empty line becomes a heading, the rest is wrapped body text.
#[derive(Debug, Clone)]
pub struct GeneratedLayout {
    pub left: f32,
    pub top: f32,
    pub heading_font: FontSpec,
    pub heading_advance: f32,
    pub body_font: FontSpec,
    pub line_height: f32,
    pub color: ColorSpec,
}

impl Default for GeneratedLayout {
    fn default() -> Self {
        Self {
            left: 50.0,
            top: 50.0,
            heading_font: FontSpec::new("Arial", 32.0).bold(),
            heading_advance: 60.0,
            body_font: FontSpec::new("Arial", 24.0),
            line_height: 30.0,
            color: ColorSpec::rgb(0x33, 0x33, 0x33),
        }
    }
}

impl GeneratedLayout {
    /// Lay `text` out as text elements, wrapping body lines at `max_width`.
    pub fn layout(&self, text: &str, max_width: f32, fonts: &FontBook) -> Vec<Element> {
        let mut elements = Vec::new();
        let mut y = self.top;
        let mut lines = text.lines().skip_while(|l| l.trim().is_empty());

        if let Some(heading) = lines.next() {
            elements.push(Element::text(
                heading.trim(),
                self.left,
                y,
                self.heading_font.clone(),
                self.color,
            ));
            y += self.heading_advance;
        }

        for line in lines {
            let wrapped = wrap_words(line, max_width, |s| fonts.measure(s, &self.body_font));
            if wrapped.is_empty() {
                y += self.line_height;
                continue;
            }
            for piece in wrapped {
                elements.push(Element::text(
                    &piece,
                    self.left,
                    y,
                    self.body_font.clone(),
                    self.color,
                ));
                y += self.line_height;
            }
        }
        elements
    }
}
