//! Document data model: elements, slides and the document itself.
//!
//! Everything here is plain data. Edits are expressed as "build a new value"
//! (see [`ElementPatch::apply`]) so that a cloned [`Document`] never aliases
//! state that a later edit could change.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid color '{0}': expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("invalid font '{0}': expected e.g. 'bold 24px Arial'")]
    InvalidFont(String),
    #[error("{0}")]
    InvalidElement(String),
}

/// An sRGB color, serialized as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorSpec {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorSpec {
    pub const BLACK: ColorSpec = ColorSpec::rgb(0, 0, 0);
    pub const WHITE: ColorSpec = ColorSpec::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidColor(value.to_string());
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        // #rgb expands each nibble: #3a0 == #33aa00
        let nibble = |s: &str| byte(s).map(|v| v * 17);
        match hex.len() {
            3 => Ok(Self::rgb(
                nibble(&hex[0..1])?,
                nibble(&hex[1..2])?,
                nibble(&hex[2..3])?,
            )),
            6 => Ok(Self::rgb(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
            )),
            8 => Ok(Self {
                r: byte(&hex[0..2])?,
                g: byte(&hex[2..4])?,
                b: byte(&hex[4..6])?,
                a: byte(&hex[6..8])?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xFF {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }
}

impl TryFrom<String> for ColorSpec {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColorSpec> for String {
    fn from(value: ColorSpec) -> Self {
        value.to_string()
    }
}

static FONT_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:bold|italic|normal)\s+)*)(\d+(?:\.\d+)?)px\s+(.+?)\s*$")
        .unwrap_or_else(|e| panic!("font shorthand pattern: {e}"))
});

/// Font selection in CSS shorthand form, e.g. `bold 36px Arial`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn new(family: &str, size: f32) -> Self {
        Self {
            family: family.to_string(),
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidFont(value.to_string());
        let caps = FONT_SHORTHAND.captures(value).ok_or_else(invalid)?;
        let modifiers = caps.get(1).map_or("", |m| m.as_str());
        let size: f32 = caps[2].parse().map_err(|_| invalid())?;
        if size <= 0.0 {
            return Err(invalid());
        }
        Ok(Self {
            family: caps[3].to_string(),
            size,
            bold: modifiers.split_whitespace().any(|m| m == "bold"),
            italic: modifiers.split_whitespace().any(|m| m == "italic"),
        })
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("Arial", 20.0)
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bold {
            write!(f, "bold ")?;
        }
        if self.italic {
            write!(f, "italic ")?;
        }
        write!(f, "{}px {}", self.size, self.family)
    }
}

impl TryFrom<String> for FontSpec {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FontSpec> for String {
    fn from(value: FontSpec) -> Self {
        value.to_string()
    }
}

/// Identity of an element within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
}

impl ShapeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rectangle" | "rect" => Some(Self::Rectangle),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,
    pub x: f32,
    pub y: f32,
    pub font: FontSpec,
    pub color: ColorSpec,
}

/// Outline shape. Rectangles use `width`/`height`, circles use `radius`
/// around the centre `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeElement {
    pub shape: ShapeKind,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    pub color: ColorSpec,
}

impl ShapeElement {
    pub fn rectangle(x: f32, y: f32, width: f32, height: f32, color: ColorSpec) -> Self {
        Self {
            shape: ShapeKind::Rectangle,
            x,
            y,
            width: Some(width),
            height: Some(height),
            radius: None,
            color,
        }
    }

    pub fn circle(x: f32, y: f32, radius: f32, color: ColorSpec) -> Self {
        Self {
            shape: ShapeKind::Circle,
            x,
            y,
            width: None,
            height: None,
            radius: Some(radius),
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    /// URL, `data:` URL, or path relative to the document.
    #[serde(rename = "src")]
    pub source: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text(TextElement),
    Shape(ShapeElement),
    Image(ImageElement),
}

fn check_coordinate(name: &str, value: f32) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::InvalidElement(format!(
            "{name} must be a finite value >= 0, got {value}"
        )));
    }
    Ok(())
}

fn check_extent(name: &str, value: f32) -> Result<(), ModelError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ModelError::InvalidElement(format!(
            "{name} must be a finite value > 0, got {value}"
        )));
    }
    Ok(())
}

impl Element {
    pub fn text(content: &str, x: f32, y: f32, font: FontSpec, color: ColorSpec) -> Self {
        Element::Text(TextElement {
            content: content.to_string(),
            x,
            y,
            font,
            color,
        })
    }

    pub fn image(source: &str, x: f32, y: f32, width: f32, height: f32) -> Self {
        Element::Image(ImageElement {
            source: source.to_string(),
            x,
            y,
            width,
            height,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Text(_) => "text",
            Element::Shape(_) => "shape",
            Element::Image(_) => "image",
        }
    }

    pub fn position(&self) -> (f32, f32) {
        match self {
            Element::Text(t) => (t.x, t.y),
            Element::Shape(s) => (s.x, s.y),
            Element::Image(i) => (i.x, i.y),
        }
    }

    /// Check the canvas-space invariants: non-negative coordinates and
    /// strictly positive extents.
    pub fn validate(&self) -> Result<(), ModelError> {
        let (x, y) = self.position();
        check_coordinate("x", x)?;
        check_coordinate("y", y)?;
        match self {
            Element::Text(t) => {
                if t.content.trim().is_empty() {
                    return Err(ModelError::InvalidElement(
                        "text content must not be empty".to_string(),
                    ));
                }
                check_extent("font size", t.font.size)
            }
            Element::Shape(s) => match s.shape {
                ShapeKind::Rectangle => {
                    let (Some(w), Some(h)) = (s.width, s.height) else {
                        return Err(ModelError::InvalidElement(
                            "rectangle requires width and height".to_string(),
                        ));
                    };
                    check_extent("width", w)?;
                    check_extent("height", h)
                }
                ShapeKind::Circle => {
                    let Some(r) = s.radius else {
                        return Err(ModelError::InvalidElement(
                            "circle requires a radius".to_string(),
                        ));
                    };
                    check_extent("radius", r)
                }
            },
            Element::Image(i) => {
                if i.source.trim().is_empty() {
                    return Err(ModelError::InvalidElement(
                        "image source must not be empty".to_string(),
                    ));
                }
                check_extent("width", i.width)?;
                check_extent("height", i.height)
            }
        }
    }
}

/// Partial update for an element. Fields that do not exist on the target
/// element's kind are rejected rather than ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub content: Option<String>,
    pub font: Option<FontSpec>,
    pub color: Option<ColorSpec>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub radius: Option<f32>,
    #[serde(rename = "src")]
    pub source: Option<String>,
}

impl ElementPatch {
    pub fn moved_to(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the patched element. The input is left untouched.
    pub fn apply(&self, element: &Element) -> Result<Element, ModelError> {
        let reject = |field: &str| {
            Err(ModelError::InvalidElement(format!(
                "{} elements have no '{field}'",
                element.kind_name()
            )))
        };
        let mut next = element.clone();
        match &mut next {
            Element::Text(t) => {
                if self.width.is_some() || self.height.is_some() {
                    return reject("width/height");
                }
                if self.radius.is_some() {
                    return reject("radius");
                }
                if self.source.is_some() {
                    return reject("src");
                }
                t.x = self.x.unwrap_or(t.x);
                t.y = self.y.unwrap_or(t.y);
                if let Some(content) = &self.content {
                    t.content = content.clone();
                }
                if let Some(font) = &self.font {
                    t.font = font.clone();
                }
                t.color = self.color.unwrap_or(t.color);
            }
            Element::Shape(s) => {
                if self.content.is_some() {
                    return reject("content");
                }
                if self.font.is_some() {
                    return reject("font");
                }
                if self.source.is_some() {
                    return reject("src");
                }
                s.x = self.x.unwrap_or(s.x);
                s.y = self.y.unwrap_or(s.y);
                s.width = self.width.or(s.width);
                s.height = self.height.or(s.height);
                s.radius = self.radius.or(s.radius);
                s.color = self.color.unwrap_or(s.color);
            }
            Element::Image(i) => {
                if self.content.is_some() {
                    return reject("content");
                }
                if self.font.is_some() {
                    return reject("font");
                }
                if self.color.is_some() {
                    return reject("color");
                }
                if self.radius.is_some() {
                    return reject("radius");
                }
                i.x = self.x.unwrap_or(i.x);
                i.y = self.y.unwrap_or(i.y);
                i.width = self.width.unwrap_or(i.width);
                i.height = self.height.unwrap_or(i.height);
                if let Some(source) = &self.source {
                    i.source = source.clone();
                }
            }
        }
        next.validate()?;
        Ok(next)
    }
}

/// An element placed on a slide, carrying its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideElement {
    pub id: ElementId,
    #[serde(flatten)]
    pub element: Element,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// Render order: later elements paint over earlier ones.
    pub elements: Vec<SlideElement>,
    pub background: ColorSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl Slide {
    pub fn blank() -> Self {
        Self {
            elements: Vec::new(),
            background: ColorSpec::WHITE,
            template_id: None,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&SlideElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn position_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Element values in render order, without identities.
    pub fn element_values(&self) -> Vec<&Element> {
        self.elements.iter().map(|e| &e.element).collect()
    }

    /// Plain text of every text element, one per line.
    pub fn text_content(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match &e.element {
                Element::Text(t) => Some(t.content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Slide {
    fn default() -> Self {
        Self::blank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub slides: Vec<Slide>,
    pub active_slide_index: usize,
}

impl Document {
    pub fn with_slide(slide: Slide) -> Self {
        Self {
            slides: vec![slide],
            active_slide_index: 0,
        }
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn active_slide(&self) -> Option<&Slide> {
        self.slides.get(self.active_slide_index)
    }

    /// Next free element id, one past the largest id in use.
    pub fn next_element_id(&self) -> ElementId {
        let max = self
            .slides
            .iter()
            .flat_map(|s| s.elements.iter())
            .map(|e| e.id.0)
            .max();
        ElementId(max.map_or(1, |m| m + 1))
    }

    /// Pull `active_slide_index` back into range after the slide list changed.
    pub fn clamp_active(&mut self) {
        self.active_slide_index = self
            .active_slide_index
            .min(self.slides.len().saturating_sub(1));
    }
}
