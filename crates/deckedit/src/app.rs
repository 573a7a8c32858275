use eframe::egui;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::cli::CollabArgs;
use crate::config::Config;
use crate::editor::EditorSession;
use crate::store::FileStore;

const TOAST_DURATION: f32 = 2.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SLIDE_MARGIN: f32 = 24.0;
const STATUS_HEIGHT: f32 = 28.0;

/// Everything the editor can be asked to do from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Undo,
    Redo,
    NewSlide,
    DeleteSlide,
    Save,
    Next,
    Previous,
    First,
    Last,
    ToggleHud,
    Quit,
}

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let fade_start = TOAST_DURATION - 0.5;
        if elapsed < fade_start {
            1.0
        } else if elapsed < TOAST_DURATION {
            1.0 - (elapsed - fade_start) / (TOAST_DURATION - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= TOAST_DURATION
    }
}

struct EditorApp {
    session: EditorSession,
    store: FileStore,
    new_slide_template: String,
    texture: Option<egui::TextureHandle>,
    /// Render generation the texture was built from.
    texture_generation: u64,
    toast: Option<Toast>,
    show_hud: bool,
    last_cursor: Option<egui::Pos2>,
    /// Set after a close was refused because of unsaved changes.
    close_warned: bool,
}

impl EditorApp {
    fn new(session: EditorSession, store: FileStore, new_slide_template: String) -> Self {
        Self {
            session,
            store,
            new_slide_template,
            texture: None,
            texture_generation: u64::MAX,
            toast: None,
            show_hud: false,
            last_cursor: None,
            close_warned: false,
        }
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::new(message));
    }

    fn execute(&mut self, command: Command, viewport_cmds: &mut Vec<egui::ViewportCommand>) {
        let s = &mut self.session;
        let result = match command {
            Command::Undo => s.undo().map(|_| Some("Undo".to_string())),
            Command::Redo => s.redo().map(|_| Some("Redo".to_string())),
            Command::NewSlide => s
                .create_slide(&self.new_slide_template)
                .map(|i| Some(format!("Slide {} created", i + 1))),
            Command::DeleteSlide => {
                let index = s.active_index();
                s.delete_slide(index)
                    .map(|_| Some(format!("Slide {} deleted", index + 1)))
            }
            Command::Next => {
                s.next_slide();
                Ok(None)
            }
            Command::Previous => {
                s.previous_slide();
                Ok(None)
            }
            Command::First => s.go_to_slide(0).map(|_| None),
            Command::Last => s.go_to_slide(s.slide_count() - 1).map(|_| None),
            Command::Save => {
                let message = match self.store.save(self.session.document()) {
                    Ok(path) => {
                        self.session.mark_saved();
                        self.close_warned = false;
                        format!("Saved {}", path.display())
                    }
                    Err(e) => {
                        log::error!("Save failed: {e}");
                        format!("Save failed: {e}")
                    }
                };
                self.notify(message);
                return;
            }
            Command::ToggleHud => {
                self.show_hud = !self.show_hud;
                Ok(None)
            }
            Command::Quit => {
                viewport_cmds.push(egui::ViewportCommand::Close);
                Ok(None)
            }
        };
        match result {
            Ok(Some(message)) => self.notify(message),
            Ok(None) => {}
            Err(e) => {
                log::debug!("{command:?} refused: {e}");
                self.notify(e.to_string());
            }
        }
    }

    /// Pull in remote edits and finished image loads.
    fn sync(&mut self) {
        let applied = self.session.pump_collaboration();
        if applied > 0 {
            self.notify(format!("{applied} update(s) from collaborators"));
        }
        self.session.pump_images();
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let generation = self.session.render_generation();
        if self.texture.is_some() && generation == self.texture_generation {
            return;
        }
        let surface = self.session.canvas().surface();
        let rgba = surface.to_rgba_image();
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [surface.width() as usize, surface.height() as usize],
            rgba.as_raw(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("slide", image, egui::TextureOptions::LINEAR))
            }
        }
        self.texture_generation = generation;
    }

    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.session.is_modified() && !self.close_warned {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.close_warned = true;
            self.notify("Unsaved changes: Ctrl+S to save, close again to discard");
        }
    }

    fn track_cursor(&mut self, ctx: &egui::Context, slide_rect: egui::Rect, scale: f32) {
        let Some(pos) = ctx.input(|i| i.pointer.hover_pos()) else {
            return;
        };
        if !slide_rect.contains(pos) || self.last_cursor == Some(pos) {
            return;
        }
        self.last_cursor = Some(pos);
        let local = screen_to_canvas(pos, slide_rect, scale);
        self.session.move_cursor(local.x, local.y);
    }

    fn status_text(&self) -> String {
        let mut parts = vec![format!(
            "Slide {}/{}",
            self.session.active_index() + 1,
            self.session.slide_count()
        )];
        if let Some(template) = &self.session.active_slide().template_id {
            parts.push(template.clone());
        }
        if let Some(channel) = self.session.channel() {
            parts.push(format!(
                "session {} ({:?})",
                channel.session().session_id(),
                channel.state()
            ));
            let peers = channel.session().remote_cursor_count();
            if peers > 0 {
                parts.push(format!("{peers} peer(s)"));
            }
        }
        if self.session.is_modified() {
            parts.push("unsaved".to_string());
        }
        parts.push("H for help".to_string());
        parts.join("  \u{00b7}  ")
    }

    fn draw_remote_cursors(&self, ui: &egui::Ui, slide_rect: egui::Rect, scale: f32) {
        for (user_id, position) in self.session.remote_cursors() {
            let screen = canvas_to_screen(egui::pos2(position.x, position.y), slide_rect, scale);
            if !slide_rect.contains(screen) {
                continue;
            }
            let color = cursor_color(&user_id);
            let tip = [
                screen,
                screen + egui::vec2(0.0, 16.0),
                screen + egui::vec2(11.0, 11.0),
            ];
            ui.painter().add(egui::Shape::convex_polygon(
                tip.to_vec(),
                color,
                egui::Stroke::new(1.0, egui::Color32::WHITE),
            ));
            let short: String = user_id.chars().take(6).collect();
            let galley = ui.painter().layout_no_wrap(
                short,
                egui::FontId::proportional(12.0),
                egui::Color32::WHITE,
            );
            let label_rect = egui::Rect::from_min_size(
                screen + egui::vec2(12.0, 14.0),
                galley.rect.size() + egui::vec2(8.0, 4.0),
            );
            ui.painter().rect_filled(label_rect, 4.0, color);
            ui.painter().galley(
                label_rect.min + egui::vec2(4.0, 2.0),
                galley,
                egui::Color32::WHITE,
            );
        }
    }

    fn draw_toast(&self, ui: &egui::Ui, ctx: &egui::Context, rect: egui::Rect) {
        let Some(toast) = &self.toast else {
            return;
        };
        let opacity = toast.opacity();
        if opacity <= 0.0 {
            return;
        }
        let alpha = (opacity * 230.0) as u8;
        let text_color = egui::Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
        let bg = egui::Color32::from_rgba_unmultiplied(40, 40, 40, alpha);
        let galley = ui.painter().layout_no_wrap(
            toast.message.clone(),
            egui::FontId::proportional(18.0),
            text_color,
        );
        let padding = 14.0;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(
                rect.center().x - galley.rect.width() / 2.0 - padding,
                rect.bottom() - 90.0,
            ),
            galley.rect.size() + egui::vec2(padding * 2.0, padding * 2.0),
        );
        ui.painter().rect_filled(toast_rect, 8.0, bg);
        ui.painter().galley(
            toast_rect.min + egui::vec2(padding, padding),
            galley,
            text_color,
        );
        ctx.request_repaint();
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync();
        self.handle_close_request(ctx);

        // Viewport commands must be sent after the input closure returns.
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();
        let mut commands: Vec<Command> = Vec::new();
        ctx.input(|i| {
            let cmd = i.modifiers.command;
            if cmd && i.key_pressed(egui::Key::Z) {
                commands.push(if i.modifiers.shift {
                    Command::Redo
                } else {
                    Command::Undo
                });
            }
            if cmd && i.key_pressed(egui::Key::Y) {
                commands.push(Command::Redo);
            }
            if cmd && i.key_pressed(egui::Key::N) {
                commands.push(Command::NewSlide);
            }
            if cmd && i.key_pressed(egui::Key::S) {
                commands.push(Command::Save);
            }
            if cmd && i.key_pressed(egui::Key::Q) {
                commands.push(Command::Quit);
            }
            if i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::PageDown) {
                commands.push(Command::Next);
            }
            if i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::PageUp) {
                commands.push(Command::Previous);
            }
            if i.key_pressed(egui::Key::Home) {
                commands.push(Command::First);
            }
            if i.key_pressed(egui::Key::End) {
                commands.push(Command::Last);
            }
            if i.key_pressed(egui::Key::Delete) {
                commands.push(Command::DeleteSlide);
            }
            if !cmd && i.key_pressed(egui::Key::H) {
                commands.push(Command::ToggleHud);
            }
        });
        for command in commands {
            self.execute(command, &mut viewport_cmds);
        }
        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }

        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }

        self.refresh_texture(ctx);

        let bg = egui::Color32::from_rgb(30, 30, 30);
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let canvas = self.session.canvas();
                let (slide_rect, scale) = fit_slide(
                    rect,
                    egui::vec2(canvas.width() as f32, canvas.height() as f32),
                );

                if let Some(texture) = &self.texture {
                    ui.painter().image(
                        texture.id(),
                        slide_rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }

                self.draw_remote_cursors(ui, slide_rect, scale);

                let status = ui.painter().layout_no_wrap(
                    self.status_text(),
                    egui::FontId::proportional(14.0),
                    egui::Color32::from_gray(180),
                );
                ui.painter().galley(
                    egui::pos2(rect.left() + 12.0, rect.bottom() - STATUS_HEIGHT + 6.0),
                    status,
                    egui::Color32::from_gray(180),
                );

                self.draw_toast(ui, ctx, rect);
                if self.show_hud {
                    draw_hud(ui, rect);
                }

                self.track_cursor(ctx, slide_rect, scale);
            });

        // Remote edits and image loads arrive without input events.
        let waiting_for_images = self.session.canvas().assets().images.pending_count() > 0;
        if self.session.channel().is_some() || waiting_for_images {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }
}

/// Largest rect with the canvas aspect ratio that fits `available`, above
/// the status line. Returns the rect and its scale relative to the canvas.
fn fit_slide(available: egui::Rect, canvas: egui::Vec2) -> (egui::Rect, f32) {
    let area = egui::Rect::from_min_max(
        available.min + egui::vec2(SLIDE_MARGIN, SLIDE_MARGIN),
        available.max - egui::vec2(SLIDE_MARGIN, SLIDE_MARGIN + STATUS_HEIGHT),
    );
    let scale = (area.width() / canvas.x)
        .min(area.height() / canvas.y)
        .max(0.01);
    let size = canvas * scale;
    (egui::Rect::from_center_size(area.center(), size), scale)
}

fn screen_to_canvas(pos: egui::Pos2, slide_rect: egui::Rect, scale: f32) -> egui::Pos2 {
    egui::pos2(
        (pos.x - slide_rect.left()) / scale,
        (pos.y - slide_rect.top()) / scale,
    )
}

fn canvas_to_screen(pos: egui::Pos2, slide_rect: egui::Rect, scale: f32) -> egui::Pos2 {
    slide_rect.min + pos.to_vec2() * scale
}

/// Stable per-user colour.
fn cursor_color(user_id: &str) -> egui::Color32 {
    const PALETTE: [egui::Color32; 6] = [
        egui::Color32::from_rgb(0xE5, 0x48, 0x4D),
        egui::Color32::from_rgb(0x30, 0x8F, 0xE8),
        egui::Color32::from_rgb(0x2F, 0xA8, 0x4F),
        egui::Color32::from_rgb(0xF0, 0x8C, 0x00),
        egui::Color32::from_rgb(0x8E, 0x4E, 0xC6),
        egui::Color32::from_rgb(0x12, 0x9E, 0x9E),
    ];
    let hash = user_id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    PALETTE[hash as usize % PALETTE.len()]
}

fn draw_hud(ui: &egui::Ui, rect: egui::Rect) {
    let shortcuts = [
        ("\u{2192} / PgDn", "Next slide"),
        ("\u{2190} / PgUp", "Previous slide"),
        ("Home / End", "First / last slide"),
        ("Ctrl+N", "New slide"),
        ("Delete", "Delete slide"),
        ("Ctrl+Z", "Undo"),
        ("Ctrl+Y / Ctrl+Shift+Z", "Redo"),
        ("Ctrl+S", "Save"),
        ("Ctrl+Q", "Quit"),
        ("H", "Toggle this help"),
    ];

    let bg = egui::Color32::from_rgba_unmultiplied(20, 20, 20, 230);
    let text_color = egui::Color32::from_gray(230);
    let key_color = egui::Color32::from_rgb(0x30, 0x8F, 0xE8);

    let padding = 24.0;
    let line_height = 28.0;
    let hud_height = shortcuts.len() as f32 * line_height + padding * 2.0 + 36.0;
    let hud_rect = egui::Rect::from_center_size(rect.center(), egui::vec2(400.0, hud_height));
    ui.painter().rect_filled(hud_rect, 12.0, bg);

    let title = ui.painter().layout_no_wrap(
        "Keyboard Shortcuts".to_string(),
        egui::FontId::proportional(20.0),
        text_color,
    );
    ui.painter().galley(
        egui::pos2(hud_rect.left() + padding, hud_rect.top() + padding),
        title,
        text_color,
    );

    let mut y = hud_rect.top() + padding + 36.0;
    for (key, desc) in &shortcuts {
        let key_galley = ui.painter().layout_no_wrap(
            key.to_string(),
            egui::FontId::monospace(14.0),
            key_color,
        );
        ui.painter()
            .galley(egui::pos2(hud_rect.left() + padding, y), key_galley, key_color);
        let desc_galley = ui.painter().layout_no_wrap(
            desc.to_string(),
            egui::FontId::proportional(14.0),
            text_color,
        );
        ui.painter().galley(
            egui::pos2(hud_rect.left() + padding + 190.0, y),
            desc_galley,
            text_color,
        );
        y += line_height;
    }
}

pub fn run(file: PathBuf, collab: &CollabArgs, start_slide: Option<usize>) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let store = FileStore::new(&file);
    let mut session = crate::commands::open_session(&config, &store)?;

    if let Some(slide) = start_slide {
        session.open_at(slide.saturating_sub(1))?;
    }
    let transport = crate::commands::connect(&mut session, collab, &config)?;

    let title = format!(
        "deckedit \u{2014} {}",
        file.file_name().unwrap_or_default().to_string_lossy()
    );
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 800.0])
        .with_title(&title);
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let template = config.default_template().to_string();
    let result = eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(EditorApp::new(session, store, template)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"));

    if let Some(task) = transport {
        task.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_slide_keeps_aspect_ratio() {
        let available = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(1280.0, 800.0));
        let (rect, scale) = fit_slide(available, egui::vec2(960.0, 540.0));
        assert!((rect.width() / rect.height() - 960.0 / 540.0).abs() < 1e-3);
        assert!((rect.width() - 960.0 * scale).abs() < 1e-3);
        assert!(available.contains_rect(rect));
    }

    #[test]
    fn test_canvas_mapping_round_trips() {
        let slide_rect = egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(480.0, 270.0));
        let screen = canvas_to_screen(egui::pos2(200.0, 100.0), slide_rect, 0.5);
        assert_eq!(screen, egui::pos2(200.0, 100.0));
        assert_eq!(screen_to_canvas(screen, slide_rect, 0.5), egui::pos2(200.0, 100.0));
    }

    #[test]
    fn test_cursor_color_is_stable() {
        assert_eq!(cursor_color("abc"), cursor_color("abc"));
    }
}
