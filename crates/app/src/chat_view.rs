//! egui rendering of one chat tab.

use crate::clipboard::SystemClipboard;
use crate::simple_md::render_markdown;
use agent_host::{ChatSurface, PasteOutcome, SessionController};
use eframe::egui;
use shared::{PastedImage, Persona};

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Log(String),
    Reply(String),
    Thinking,
}

struct Thumbnail {
    image: PastedImage,
    label: String,
    texture: Option<egui::TextureHandle>,
}

/// Conversation view, attachment preview and input box of a tab.
#[derive(Default)]
pub struct ChatView {
    entries: Vec<Entry>,
    input: String,
    input_enabled: bool,
    thumbnails: Vec<Thumbnail>,
    references: Vec<String>,
}

impl ChatSurface for ChatView {
    fn display(&mut self, text: &str) {
        self.entries.push(Entry::Log(text.to_string()));
    }

    fn display_markdown(&mut self, text: &str) {
        self.entries.push(Entry::Reply(text.to_string()));
    }

    fn show_in_progress(&mut self) {
        self.entries.push(Entry::Thinking);
    }

    fn replace_in_progress(&mut self, text: &str) {
        let reply = Entry::Reply(text.to_string());
        match self.entries.iter().rposition(|e| *e == Entry::Thinking) {
            Some(i) => self.entries[i] = reply,
            None => self.entries.push(reply),
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn take_input_text(&mut self) -> String {
        std::mem::take(&mut self.input).trim().to_string()
    }

    fn clear_output(&mut self) {
        self.entries.clear();
    }

    fn clear_attachments(&mut self) {
        self.thumbnails.clear();
        self.references.clear();
    }

    fn add_image(&mut self, thumbnail: &PastedImage, label: &str) {
        self.thumbnails.push(Thumbnail {
            image: thumbnail.clone(),
            label: label.to_string(),
            texture: None,
        });
    }

    fn add_reference(&mut self, label: &str) {
        self.references.push(label.to_string());
    }
}

/// What the tab asks of its owner after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabAction {
    None,
    Close,
}

fn log_color(line: &str, dark: bool) -> egui::Color32 {
    let line = line.trim_start();
    if line.starts_with("[!!]") {
        egui::Color32::from_rgb(230, 110, 100)
    } else if line.starts_with("[+]") {
        egui::Color32::from_rgb(120, 190, 120)
    } else if line.starts_with("--- Me") {
        egui::Color32::from_rgb(100, 170, 240)
    } else if dark {
        egui::Color32::from_rgb(200, 200, 210)
    } else {
        egui::Color32::from_rgb(60, 60, 70)
    }
}

/// Text egui read for a paste this frame (`Some(None)` when the paste
/// shortcut fired without text on the clipboard).
fn pending_paste(ctx: &egui::Context) -> Option<Option<String>> {
    ctx.input(|i| {
        let text = i.events.iter().find_map(|e| match e {
            egui::Event::Paste(text) => Some(text.clone()),
            _ => None,
        });
        if text.is_some() {
            return Some(text);
        }
        let shortcut = i.events.iter().any(|e| {
            matches!(e, egui::Event::Key { key: egui::Key::V, pressed: true, modifiers, .. } if modifiers.command)
        });
        shortcut.then_some(None)
    })
}

/// Draw one tab and apply the user's actions to its session.
pub fn show_session(ui: &mut egui::Ui, session: &mut SessionController<ChatView>) -> TabAction {
    let dark = ui.visuals().dark_mode;
    let busy = session.is_processing();
    let id = egui::Id::new(("chat", session.id().to_string()));
    let mut action = TabAction::None;

    // System prompt
    ui.horizontal(|ui| {
        ui.label("System prompt:");
        let current = session.persona().selected();
        let mut selected = current;
        egui::ComboBox::from_id_source(id.with("persona"))
            .selected_text(selected.display_name())
            .show_ui(ui, |ui| {
                for persona in Persona::ALL {
                    ui.selectable_value(&mut selected, persona, persona.display_name());
                }
            });
        if selected != current {
            session.select_persona(selected);
        }
    });
    let mut prompt = session.persona().text().to_string();
    let prompt_edit = ui.add_enabled(
        !busy,
        egui::TextEdit::multiline(&mut prompt)
            .id(id.with("prompt"))
            .desired_rows(2)
            .desired_width(f32::INFINITY),
    );
    if prompt_edit.changed() {
        session.edit_system_prompt(prompt);
    }
    ui.separator();

    // Buttons and input take a fixed strip at the bottom.
    let attachments_height = if session.surface().thumbnails.is_empty()
        && session.surface().references.is_empty()
    {
        0.0
    } else {
        190.0
    };
    let transcript_height = (ui.available_height() - 150.0 - attachments_height).max(80.0);

    egui::ScrollArea::vertical()
        .id_source(id.with("transcript"))
        .max_height(transcript_height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            let base = if dark {
                egui::Color32::from_rgb(225, 225, 235)
            } else {
                egui::Color32::from_rgb(30, 30, 40)
            };
            for entry in &session.surface().entries {
                match entry {
                    Entry::Log(line) => {
                        ui.label(
                            egui::RichText::new(line.trim_matches('\n'))
                                .monospace()
                                .color(log_color(line, dark)),
                        );
                    }
                    Entry::Reply(text) => render_markdown(ui, text, base),
                    Entry::Thinking => {
                        let time = ui.input(|i| i.time);
                        let dots = ".".repeat(((time * 2.0) as usize) % 4);
                        ui.label(egui::RichText::new(format!("Thinking{}", dots)).italics().weak());
                    }
                }
            }
        });

    if attachments_height > 0.0 {
        ui.separator();
        show_attachments(ui, session.surface_mut(), id);
    }
    ui.separator();

    // Input
    let input_id = id.with("input");
    if ui.memory(|m| m.has_focus(input_id)) {
        if let Some(pasted) = pending_paste(ui.ctx()) {
            let mut clipboard = SystemClipboard::open(pasted);
            if session.handle_paste(&mut clipboard) == PasteOutcome::Handled {
                ui.ctx()
                    .input_mut(|i| i.events.retain(|e| !matches!(e, egui::Event::Paste(_))));
            }
        }
    }
    let enabled = session.surface().input_enabled;
    let input = ui.add_enabled(
        enabled,
        egui::TextEdit::multiline(&mut session.surface_mut().input)
            .id(input_id)
            .hint_text("Type a message, or drop / paste files (Ctrl+Enter to send)")
            .desired_rows(3)
            .desired_width(f32::INFINITY),
    );
    let mut send = input.has_focus()
        && ui.input(|i| i.key_pressed(egui::Key::Enter) && i.modifiers.command);

    ui.horizontal(|ui| {
        send |= ui.add_enabled(enabled, egui::Button::new("Send")).clicked();
        if ui.add_enabled(enabled, egui::Button::new("Attach...")).clicked() {
            let picked = {
                let config = session.config();
                let known: Vec<&str> = config
                    .image_extensions
                    .iter()
                    .chain(&config.pdf_extensions)
                    .chain(&config.text_extensions)
                    .map(String::as_str)
                    .collect();
                rfd::FileDialog::new()
                    .set_title("Attach files")
                    .add_filter("Supported files", &known)
                    .add_filter("All files", &["*"])
                    .pick_files()
            };
            if let Some(paths) = picked {
                session.attach_files(&paths);
            }
        }
        if ui.button("New Chat").clicked() {
            session.reset();
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Close").clicked() {
                action = TabAction::Close;
            }
            if busy {
                ui.spinner();
            }
        });
    });

    if send {
        session.send();
    }
    action
}

fn show_attachments(ui: &mut egui::Ui, view: &mut ChatView, id: egui::Id) {
    egui::ScrollArea::horizontal()
        .id_source(id.with("attachments"))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                for thumb in &mut view.thumbnails {
                    let texture = thumb.texture.get_or_insert_with(|| {
                        let size = [thumb.image.width as usize, thumb.image.height as usize];
                        ui.ctx().load_texture(
                            format!("thumb-{}", thumb.label),
                            egui::ColorImage::from_rgba_unmultiplied(size, &thumb.image.rgba),
                            egui::TextureOptions::LINEAR,
                        )
                    });
                    ui.vertical(|ui| {
                        ui.add(egui::Image::new((texture.id(), texture.size_vec2())));
                        ui.label(egui::RichText::new(&thumb.label).small());
                    });
                }
                if !view.references.is_empty() {
                    ui.vertical(|ui| {
                        for reference in &view.references {
                            ui.label(reference);
                        }
                    });
                }
            });
        });
}
