use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{ColorSpec, Element, ElementId, FontSpec, Slide, SlideElement};

/// Static slide blueprint: a background and the elements a new slide starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub background: ColorSpec,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Template {
    /// Build a slide from this template, numbering elements from `first_id`.
    pub fn instantiate(&self, id: &str, first_id: ElementId) -> Slide {
        let elements = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, element)| SlideElement {
                id: ElementId(first_id.0 + i as u64),
                element: element.clone(),
            })
            .collect();
        Slide {
            elements,
            background: self.background,
            template_id: Some(id.to_string()),
        }
    }
}

/// Read-only mapping from template id to template.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl TemplateCatalog {
    pub fn builtin() -> Self {
        let dark = ColorSpec::rgb(0x33, 0x33, 0x33);
        let arial = |size: f32| FontSpec::new("Arial", size);

        let mut templates = BTreeMap::new();
        templates.insert(
            "title".to_string(),
            Template {
                name: "Title Slide".to_string(),
                background: ColorSpec::rgb(0xF0, 0xF0, 0xF0),
                elements: vec![
                    Element::text("Title Slide", 50.0, 100.0, arial(36.0).bold(), dark),
                    Element::text("Subtitle", 50.0, 150.0, arial(24.0), dark),
                ],
            },
        );
        templates.insert(
            "content".to_string(),
            Template {
                name: "Content Slide".to_string(),
                background: ColorSpec::WHITE,
                elements: vec![
                    Element::text("Content Slide", 50.0, 50.0, arial(28.0).bold(), dark),
                    Element::text("\u{2022} Bullet point 1", 50.0, 100.0, arial(18.0), dark),
                    Element::text("\u{2022} Bullet point 2", 50.0, 130.0, arial(18.0), dark),
                    Element::text("\u{2022} Bullet point 3", 50.0, 160.0, arial(18.0), dark),
                ],
            },
        );
        templates.insert(
            "image".to_string(),
            Template {
                name: "Image Slide".to_string(),
                background: ColorSpec::WHITE,
                elements: vec![
                    Element::text(
                        "Image Title",
                        50.0,
                        50.0,
                        arial(36.0).bold(),
                        ColorSpec::BLACK,
                    ),
                    Element::image("placeholder.png", 50.0, 100.0, 300.0, 200.0),
                ],
            },
        );
        templates.insert(
            "conclusion".to_string(),
            Template {
                name: "Conclusion Slide".to_string(),
                background: ColorSpec::WHITE,
                elements: vec![
                    Element::text("Conclusion", 50.0, 50.0, arial(28.0).bold(), dark),
                    Element::text("Summary of key points...", 50.0, 100.0, arial(18.0), dark),
                ],
            },
        );
        Self { templates }
    }

    /// Built-ins plus the templates defined in a YAML file. File entries
    /// override built-ins with the same id.
    pub fn with_file(path: &Path) -> Result<Self> {
        let mut catalog = Self::builtin();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read templates from {}", path.display()))?;
        let extra: BTreeMap<String, Template> = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid template file {}", path.display()))?;
        for (id, template) in extra {
            for element in &template.elements {
                element
                    .validate()
                    .with_context(|| format!("Template '{id}' has an invalid element"))?;
            }
            catalog.templates.insert(id, template);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Template)> {
        self.templates.iter().map(|(id, t)| (id.as_str(), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_ids() {
        let catalog = TemplateCatalog::builtin();
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["conclusion", "content", "image", "title"]);
    }

    #[test]
    fn test_builtin_elements_are_valid() {
        let catalog = TemplateCatalog::builtin();
        for (id, template) in catalog.iter() {
            for element in &template.elements {
                assert!(element.validate().is_ok(), "template {id}: {element:?}");
            }
        }
    }

    #[test]
    fn test_instantiate_numbers_elements() {
        let catalog = TemplateCatalog::builtin();
        let slide = catalog.get("content").unwrap().instantiate("content", ElementId(10));
        let ids: Vec<u64> = slide.elements.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        assert_eq!(slide.template_id.as_deref(), Some("content"));
        assert_eq!(slide.background, ColorSpec::WHITE);
    }

    #[test]
    fn test_file_templates_override_and_extend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
quote:
  name: Quote Slide
  background: "#202020"
  elements:
    - type: text
      content: "A wise remark"
      x: 80
      y: 200
      font: italic 30px Georgia
      color: "#eeeeee"
title:
  name: Plain Title
  background: "#ffffff"
"##
        )
        .unwrap();

        let catalog = TemplateCatalog::with_file(file.path()).unwrap();
        let quote = catalog.get("quote").unwrap();
        assert_eq!(quote.elements.len(), 1);
        assert_eq!(catalog.get("title").unwrap().name, "Plain Title");
        assert!(catalog.get("content").is_some());
    }
}
