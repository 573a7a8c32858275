//! Interactive terminal editor.
//!
//! Every step is a structured input request; a cancelled request abandons
//! the current action and returns to the menu without touching the deck.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::ai::{self, ContentGenerator};
use crate::cli::CollabArgs;
use crate::config::Config;
use crate::editor::EditorSession;
use crate::input::{InputError, InputSource, TerminalInput};
use crate::model::{
    ColorSpec, Element, ElementId, ElementPatch, FontSpec, ShapeElement, ShapeKind, SlideElement,
};
use crate::store::FileStore;

const DEFAULT_FONT: &str = "24px Arial";
const DEFAULT_COLOR: &str = "#333333";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NextSlide,
    PreviousSlide,
    GoToSlide,
    NewSlide,
    DeleteSlide,
    ApplyTemplate,
    AddText,
    AddShape,
    AddImage,
    MoveElement,
    EditText,
    RemoveElement,
    Generate,
    Undo,
    Redo,
    Save,
    Quit,
}

impl Action {
    const ALL: [Action; 17] = [
        Action::NextSlide,
        Action::PreviousSlide,
        Action::GoToSlide,
        Action::NewSlide,
        Action::DeleteSlide,
        Action::ApplyTemplate,
        Action::AddText,
        Action::AddShape,
        Action::AddImage,
        Action::MoveElement,
        Action::EditText,
        Action::RemoveElement,
        Action::Generate,
        Action::Undo,
        Action::Redo,
        Action::Save,
        Action::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::NextSlide => "Next slide",
            Action::PreviousSlide => "Previous slide",
            Action::GoToSlide => "Go to slide",
            Action::NewSlide => "New slide",
            Action::DeleteSlide => "Delete slide",
            Action::ApplyTemplate => "Apply template",
            Action::AddText => "Add text",
            Action::AddShape => "Add shape",
            Action::AddImage => "Add image",
            Action::MoveElement => "Move element",
            Action::EditText => "Edit text",
            Action::RemoveElement => "Remove element",
            Action::Generate => "Generate content",
            Action::Undo => "Undo",
            Action::Redo => "Redo",
            Action::Save => "Save",
            Action::Quit => "Quit",
        }
    }
}

/// Result of one menu action.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Done(String),
    Cancelled,
    Failed(String),
}

impl<E: std::fmt::Display> From<Result<String, E>> for Outcome {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(message) => Outcome::Done(message),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

/// Unwrap an answer or abandon the action.
macro_rules! answer {
    ($request:expr) => {
        match $request? {
            Some(value) => value,
            None => return Ok(Outcome::Cancelled),
        }
    };
}

/// Unwrap an element pick or abandon the action.
macro_rules! element {
    ($pick:expr) => {
        match $pick? {
            Pick::Element(id) => id,
            Pick::Cancelled => return Ok(Outcome::Cancelled),
            Pick::NoneAvailable => {
                return Ok(Outcome::Failed(
                    "No matching element on this slide".to_string(),
                ));
            }
        }
    };
}

pub fn run(file: &Path, collab: &CollabArgs, runtime: &tokio::runtime::Runtime) -> Result<()> {
    let config = Config::load_or_default();
    let store = FileStore::new(file);
    let mut session = super::open_session(&config, &store)?;
    let transport = super::connect(&mut session, collab, &config)?;

    let generator = ai::from_config(config.ai.as_ref()).map_err(|e| e.to_string());
    if let Err(reason) = &generator {
        log::info!("Content generation unavailable: {reason}");
    }

    let mut shell = EditorShell {
        session,
        store,
        generator,
        runtime: Some(runtime.handle().clone()),
    };
    shell.run(&mut TerminalInput)?;

    if let Some(task) = transport {
        shell.session.detach_channel();
        task.abort();
    }
    Ok(())
}

struct EditorShell {
    session: EditorSession,
    store: FileStore,
    generator: Result<Box<dyn ContentGenerator>, String>,
    runtime: Option<tokio::runtime::Handle>,
}

impl EditorShell {
    fn run(&mut self, input: &mut dyn InputSource) -> Result<(), InputError> {
        let options: Vec<String> = Action::ALL.iter().map(|a| a.label().to_string()).collect();
        loop {
            self.sync();
            self.print_status();

            let action = match input.choose("What next?", &options)? {
                Some(index) => Action::ALL[index],
                None => Action::Quit,
            };
            if action == Action::Quit {
                self.finish(input)?;
                return Ok(());
            }

            match self.perform(action, input)? {
                Outcome::Done(message) => println!("{} {message}", "\u{2713}".green()),
                Outcome::Cancelled => println!("{}", "Cancelled.".dimmed()),
                Outcome::Failed(message) => println!("{} {message}", "\u{2717}".red()),
            }
        }
    }

    /// Apply remote edits and finished image loads.
    fn sync(&mut self) {
        let applied = self.session.pump_collaboration();
        if applied > 0 {
            println!(
                "{}",
                format!("Applied {applied} change(s) from collaborators.").cyan()
            );
        }
        self.session.pump_images();
    }

    fn print_status(&self) {
        let slide = self.session.active_slide();
        let template = slide.template_id.as_deref().unwrap_or("custom");
        let mut status = format!(
            "Slide {}/{} [{}], {} element(s)",
            self.session.active_index() + 1,
            self.session.slide_count(),
            template,
            slide.elements.len()
        );
        if let Some(channel) = self.session.channel() {
            status.push_str(&format!(
                ", session {} ({:?}, {} peer cursor(s))",
                channel.session().session_id(),
                channel.state(),
                channel.session().remote_cursor_count()
            ));
        }
        if self.session.is_modified() {
            status.push_str(", unsaved");
        }
        println!();
        println!("{}", status.bold());
        for placed in &slide.elements {
            println!("  {}", describe(placed).dimmed());
        }
    }

    fn finish(&mut self, input: &mut dyn InputSource) -> Result<(), InputError> {
        if !self.session.is_modified() {
            return Ok(());
        }
        match input.confirm("Save changes before quitting?", true)? {
            Some(true) => {
                let outcome = self.save();
                if let Outcome::Failed(message) = outcome {
                    println!("{} {message}", "\u{2717}".red());
                }
            }
            Some(false) => {}
            None => println!("{}", "Leaving without saving.".yellow()),
        }
        Ok(())
    }

    fn save(&mut self) -> Outcome {
        match self.store.save(self.session.document()) {
            Ok(path) => {
                self.session.mark_saved();
                Outcome::Done(format!("Saved {}", path.display()))
            }
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    fn perform(
        &mut self,
        action: Action,
        input: &mut dyn InputSource,
    ) -> Result<Outcome, InputError> {
        let s = &mut self.session;
        let outcome = match action {
            Action::NextSlide => {
                if s.next_slide() {
                    Outcome::Done(format!("Slide {}", s.active_index() + 1))
                } else {
                    Outcome::Failed("Already at the last slide".to_string())
                }
            }
            Action::PreviousSlide => {
                if s.previous_slide() {
                    Outcome::Done(format!("Slide {}", s.active_index() + 1))
                } else {
                    Outcome::Failed("Already at the first slide".to_string())
                }
            }
            Action::GoToSlide => {
                let number = answer!(input.number("Slide number", None));
                if number < 1.0 || number.fract() != 0.0 {
                    return Ok(Outcome::Failed(format!("{number} is not a slide number")));
                }
                let index = number as usize - 1;
                s.go_to_slide(index)
                    .map(|_| format!("Slide {}", index + 1))
                    .into()
            }
            Action::NewSlide => {
                let template = answer!(choose_template(s, input));
                s.create_slide(&template)
                    .map(|index| format!("Created slide {} from '{template}'", index + 1))
                    .into()
            }
            Action::DeleteSlide => {
                let index = s.active_index();
                let prompt = format!("Delete slide {}?", index + 1);
                if !answer!(input.confirm(&prompt, false)) {
                    return Ok(Outcome::Cancelled);
                }
                s.delete_slide(index)
                    .map(|_| format!("Deleted slide {}", index + 1))
                    .into()
            }
            Action::ApplyTemplate => {
                let template = answer!(choose_template(s, input));
                s.apply_template(&template)
                    .map(|_| format!("Applied '{template}'"))
                    .into()
            }
            Action::AddText => {
                let content = answer!(input.text("Text", None));
                let x = answer!(input.number("X", Some(50.0)));
                let y = answer!(input.number("Y", Some(50.0)));
                let font = answer!(input.text("Font", Some(DEFAULT_FONT)));
                let color = answer!(input.text("Color", Some(DEFAULT_COLOR)));
                let element = FontSpec::parse(&font).and_then(|font| {
                    Ok(Element::text(&content, x, y, font, ColorSpec::parse(&color)?))
                });
                match element {
                    Ok(element) => add(s, element),
                    Err(e) => Outcome::Failed(e.to_string()),
                }
            }
            Action::AddShape => {
                let kinds = vec!["rectangle".to_string(), "circle".to_string()];
                let kind = answer!(input.choose("Shape", &kinds));
                let x = answer!(input.number("X", Some(100.0)));
                let y = answer!(input.number("Y", Some(100.0)));
                let shape = match ShapeKind::from_name(&kinds[kind]) {
                    Some(ShapeKind::Circle) => {
                        let radius = answer!(input.number("Radius", Some(50.0)));
                        ShapeElement::circle(x, y, radius, ColorSpec::BLACK)
                    }
                    _ => {
                        let width = answer!(input.number("Width", Some(200.0)));
                        let height = answer!(input.number("Height", Some(100.0)));
                        ShapeElement::rectangle(x, y, width, height, ColorSpec::BLACK)
                    }
                };
                let color = answer!(input.text("Color", Some(DEFAULT_COLOR)));
                match ColorSpec::parse(&color) {
                    Ok(color) => add(s, Element::Shape(ShapeElement { color, ..shape })),
                    Err(e) => Outcome::Failed(e.to_string()),
                }
            }
            Action::AddImage => {
                let source = answer!(input.text("Image path or URL", None));
                let x = answer!(input.number("X", Some(50.0)));
                let y = answer!(input.number("Y", Some(100.0)));
                let width = answer!(input.number("Width", Some(300.0)));
                let height = answer!(input.number("Height", Some(200.0)));
                add(s, Element::image(&source, x, y, width, height))
            }
            Action::MoveElement => {
                let id = element!(choose_element(s, input, |_| true));
                let (x, y) = s
                    .active_slide()
                    .element(id)
                    .map(|e| e.element.position())
                    .unwrap_or_default();
                let x = answer!(input.number("X", Some(x)));
                let y = answer!(input.number("Y", Some(y)));
                s.update_element(id, &ElementPatch::moved_to(x, y))
                    .map(|_| format!("Moved {id}"))
                    .into()
            }
            Action::EditText => {
                let id = element!(choose_element(s, input, |e| matches!(
                    e,
                    Element::Text(_)
                )));
                let current = match s.active_slide().element(id).map(|e| &e.element) {
                    Some(Element::Text(t)) => t.content.clone(),
                    _ => String::new(),
                };
                let content = answer!(input.text("Text", Some(&current)));
                let patch = ElementPatch {
                    content: Some(content),
                    ..ElementPatch::default()
                };
                s.update_element(id, &patch)
                    .map(|_| format!("Updated {id}"))
                    .into()
            }
            Action::RemoveElement => {
                let id = element!(choose_element(s, input, |_| true));
                s.remove_element(id).map(|_| format!("Removed {id}")).into()
            }
            Action::Generate => {
                let prompt = answer!(input.text("Describe the slide content", None));
                let generator = match &self.generator {
                    Ok(generator) => generator.as_ref(),
                    Err(reason) => {
                        return Ok(Outcome::Failed(format!(
                            "Content generation unavailable: {reason}"
                        )));
                    }
                };
                println!(
                    "{}",
                    format!("Generating with {}...", generator.name()).dimmed()
                );
                let result = match &self.runtime {
                    Some(handle) => handle.block_on(
                        self.session.generate_from_prompt(generator, &prompt, None),
                    ),
                    None => futures::executor::block_on(
                        self.session.generate_from_prompt(generator, &prompt, None),
                    ),
                };
                result
                    .map(|ids| format!("Added {} text element(s)", ids.len()))
                    .into()
            }
            Action::Undo => s.undo().map(|_| "Undone".to_string()).into(),
            Action::Redo => s.redo().map(|_| "Redone".to_string()).into(),
            Action::Save => self.save(),
            Action::Quit => Outcome::Cancelled,
        };
        Ok(outcome)
    }
}

fn add(session: &mut EditorSession, element: Element) -> Outcome {
    session
        .add_element(element)
        .map(|id| format!("Added {id}"))
        .into()
}

fn choose_template(
    session: &EditorSession,
    input: &mut dyn InputSource,
) -> Result<Option<String>, InputError> {
    let ids: Vec<String> = session.catalog().ids().map(str::to_string).collect();
    let choice = input.choose("Template", &ids)?;
    Ok(choice.map(|index| ids[index].clone()))
}

enum Pick {
    Element(ElementId),
    Cancelled,
    NoneAvailable,
}

/// Pick an element of the active slide matching `filter`.
fn choose_element(
    session: &EditorSession,
    input: &mut dyn InputSource,
    filter: impl Fn(&Element) -> bool,
) -> Result<Pick, InputError> {
    let candidates: Vec<&SlideElement> = session
        .active_slide()
        .elements
        .iter()
        .filter(|e| filter(&e.element))
        .collect();
    if candidates.is_empty() {
        return Ok(Pick::NoneAvailable);
    }
    let labels: Vec<String> = candidates.iter().map(|e| describe(e)).collect();
    Ok(match input.choose("Element", &labels)? {
        Some(index) => Pick::Element(candidates[index].id),
        None => Pick::Cancelled,
    })
}

fn describe(placed: &SlideElement) -> String {
    let (x, y) = placed.element.position();
    let detail = match &placed.element {
        Element::Text(t) => format!("\"{}\" {}", t.content, t.font),
        Element::Shape(s) => format!("{:?}", s.shape).to_lowercase(),
        Element::Image(i) => i.source.clone(),
    };
    format!(
        "{} {} at ({x}, {y}) {detail}",
        placed.id,
        placed.element.kind_name()
    )
}
