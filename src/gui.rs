use std::path::{Path, PathBuf};

use egui::{Align, Color32, Key, Layout, Modifiers, RichText, ScrollArea, TextEdit};

use crate::{
    chat::Speaker,
    editor::CodeEditor,
    session::ExerciseSession,
    viewport::Viewport,
};

/// What the learner asked for this frame. Applied by the app after the ui ran.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiAction {
    SelectExercise(usize),
    Run,
    RevealSolution,
    SaveSnippet,
    SendChat(String),
}

pub struct Gui {
    chat_input: String,
    viewport: Option<Viewport>,
    error_banner: Option<String>,
    variant: String,
}

impl Gui {
    pub fn new(variant: &str) -> Self {
        Self {
            chat_input: String::new(),
            viewport: None,
            error_banner: None,
            variant: variant.to_string(),
        }
    }

    /// Area of the central panel in GL pixels, known after the first update.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error_banner = Some(message.into());
    }

    pub fn update(
        &mut self,
        raw_input: egui::RawInput,
        ctx: &egui::Context,
        window_height: u32,
        session: &mut ExerciseSession<CodeEditor>,
        fps: u32,
    ) -> (egui::FullOutput, Vec<GuiAction>) {
        let mut actions = Vec::new();

        let output = ctx.run(raw_input, |ctx| {
            egui::TopBottomPanel::top("Header").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Animation Lab");
                    ui.label(format!("Character: {}", self.variant));
                    ui.allocate_ui_with_layout(
                        ui.available_size(),
                        Layout::right_to_left(Align::Center),
                        |ui| {
                            let status = if session.state.is_loaded() {
                                "Model loaded"
                            } else {
                                "Loading model ..."
                            };
                            ui.label(status);
                        },
                    );
                });
            });

            egui::SidePanel::left("Exercises")
                .min_width(200.0)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.heading("Exercises");
                    ui.separator();
                    for (index, exercise) in session.catalog().iter().enumerate() {
                        let selected = index == session.state.selected_exercise;
                        if ui.selectable_label(selected, exercise.title).clicked() {
                            actions.push(GuiAction::SelectExercise(index));
                        }
                    }
                });

            egui::SidePanel::right("Assistant")
                .min_width(240.0)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.heading("Assistant");
                    ui.separator();

                    ScrollArea::vertical()
                        .max_height(ui.available_height() - 40.0)
                        .auto_shrink([false; 2])
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for line in session.transcript.lines() {
                                let (who, color) = match line.speaker {
                                    Speaker::Learner => ("You", Color32::LIGHT_BLUE),
                                    Speaker::Assistant => ("Assistant", Color32::LIGHT_GREEN),
                                    Speaker::System => ("System", Color32::GRAY),
                                };
                                ui.label(RichText::new(format!("{}:", who)).color(color).strong());
                                ui.label(&line.text);
                                ui.add_space(4.0);
                            }
                        });

                    ui.horizontal(|ui| {
                        let response = ui.add(
                            TextEdit::singleline(&mut self.chat_input).hint_text("Ask for a hint"),
                        );
                        let enter_pressed = response.lost_focus()
                            && ui.input(|i: &egui::InputState| i.key_pressed(Key::Enter));

                        if ui.button("Send").clicked() || enter_pressed {
                            let message = std::mem::take(&mut self.chat_input);
                            if !message.trim().is_empty() {
                                actions.push(GuiAction::SendChat(message));
                            }
                        }
                    });
                });

            egui::TopBottomPanel::bottom("Editor")
                .min_height(220.0)
                .resizable(true)
                .show(ctx, |ui| {
                    let title = session
                        .current_exercise()
                        .map(|e| e.title)
                        .unwrap_or("No exercise");

                    ui.horizontal(|ui| {
                        ui.strong(title);
                        ui.allocate_ui_with_layout(
                            ui.available_size(),
                            Layout::right_to_left(Align::Center),
                            |ui| {
                                if ui.button("Save snippet").clicked() {
                                    actions.push(GuiAction::SaveSnippet);
                                }
                                if session.reveal_affordance().is_some()
                                    && ui.button("Reveal solution").clicked()
                                {
                                    actions.push(GuiAction::RevealSolution);
                                }
                                if ui.button("▶ Run").on_hover_text("Ctrl+Enter").clicked() {
                                    actions.push(GuiAction::Run);
                                }
                            },
                        );
                    });

                    ui.separator();

                    // Consumed before the editor sees it, so no newline is inserted.
                    if ui.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::Enter)) {
                        actions.push(GuiAction::Run);
                    }

                    ScrollArea::vertical()
                        .auto_shrink([false; 2])
                        .show(ui, |ui| {
                            code_editor(ui, &mut session.editor);
                        });
                });

            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.heading(session.state.scene.name.clone());
                        ui.allocate_ui_with_layout(
                            ui.available_size(),
                            Layout::right_to_left(Align::Center),
                            |ui| {
                                ui.label(format!("FPS: {}", fps));
                            },
                        );
                    });

                    let rect = ui.available_rect_before_wrap();
                    self.viewport = Some(Viewport::from_egui_rect(
                        rect,
                        ctx.pixels_per_point(),
                        window_height,
                    ));

                    let response = ui.interact(
                        rect,
                        ui.id().with("scene"),
                        egui::Sense::click_and_drag(),
                    );
                    if let Some(controls) = session.state.controls.as_mut() {
                        // Clamp so a hitch doesn't spin the camera around
                        let max_delta = 75.0;
                        let delta = response.drag_delta();
                        if delta != egui::Vec2::ZERO {
                            controls.rotate(
                                delta.x.clamp(-max_delta, max_delta),
                                delta.y.clamp(-max_delta, max_delta),
                            );
                        }
                        if response.hovered() {
                            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
                            if scroll != 0.0 {
                                controls.zoom(scroll * 0.001);
                            }
                        }
                    }
                });

            if let Some(message) = self.error_banner.clone() {
                egui::Window::new("Error in your code")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                    .show(ctx, |ui| {
                        ui.label(message);
                        if ui.button("OK").clicked() {
                            self.error_banner = None;
                        }
                    });
            }
        });

        (output, actions)
    }
}

fn code_editor(ui: &mut egui::Ui, editor: &mut CodeEditor) {
    let cursor = editor.take_pending_cursor();

    let output = TextEdit::multiline(&mut editor.text)
        .id_salt("code editor")
        .font(egui::TextStyle::Monospace)
        .code_editor()
        .desired_width(ui.available_width())
        .desired_rows(12)
        .show(ui);

    if let Some(index) = cursor {
        let mut state = output.state;
        state
            .cursor
            .set_char_range(Some(egui::text_selection::CCursorRange::one(
                egui::text::CCursor::new(index),
            )));
        state.store(ui.ctx(), output.response.id);
        output.response.request_focus();
    }
}

pub fn snippet_path(dir: &Path, exercise: usize) -> PathBuf {
    dir.join(format!("exercise-{:02}.anim", exercise + 1))
}

pub fn save_snippet(path: PathBuf, text: String) {
    rayon::spawn(move || {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Error creating {}: {}", parent.display(), e);
                return;
            }
        }
        match std::fs::write(&path, text) {
            Ok(()) => log::info!("Saved snippet: {}", path.display()),
            Err(e) => log::error!("Error saving {}: {}", path.display(), e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn snippet_names_are_one_based() {
        let dir = Path::new("snippets");
        assert_eq!(snippet_path(dir, 0), PathBuf::from("snippets/exercise-01.anim"));
        assert_eq!(snippet_path(dir, 8), PathBuf::from("snippets/exercise-09.anim"));
    }

    #[test]
    fn snippet_is_written_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = snippet_path(&dir.path().join("nested"), 2);
        save_snippet(path.clone(), "mixer play run\n".to_string());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !path.exists() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        // The file may exist before its contents are flushed.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mixer play run\n");
    }
}
