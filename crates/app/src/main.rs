use agent_host::{ManagerStatus, SessionManager, TurnDeps};
use eframe::egui;
use providers::OllamaClient;
use shared::{ChatConfig, ModelChoice};
use std::sync::Arc;

mod chat_view;
mod clipboard;
mod simple_md;
mod widgets;

use chat_view::{show_session, ChatView, TabAction};
use widgets::DropZone;

fn main() -> eframe::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Arc::new(ChatConfig::load_or_default());
    let app = match MultichatApp::new(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "startup failed");
            eprintln!("Multichat failed to start: {:#}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Multimodal Chatbot")
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Multimodal Chatbot",
        options,
        Box::new(|_cc| Box::new(app)),
    )
}

struct MultichatApp {
    config: Arc<ChatConfig>,
    manager: SessionManager<ChatView>,
    active: Option<String>,
    /// Control-bar state, applied to sessions created afterwards.
    model: ModelChoice,
    use_gpu: bool,
    drop_zone: DropZone,
}

impl MultichatApp {
    fn new(config: Arc<ChatConfig>) -> anyhow::Result<Self> {
        let client = OllamaClient::new(&config.ollama_base_url, config.request_timeout())?;
        tracing::info!(base_url = %client.base_url(), "using Ollama service");

        let manager = SessionManager::new(TurnDeps::new(config.clone(), Arc::new(client)));
        let mut app = Self {
            model: config.default_model.clone(),
            use_gpu: config.default_use_gpu,
            config,
            manager,
            active: None,
            drop_zone: DropZone::new("chat-drop"),
        };
        app.open_tab();
        Ok(app)
    }

    fn open_tab(&mut self) {
        self.manager.set_selection(self.model.clone(), self.use_gpu);
        let id = self.manager.create_session(ChatView::default());
        self.active = Some(id);
    }

    fn close_tab(&mut self, id: &str, ctx: &egui::Context) {
        match self.manager.close_session(id) {
            ManagerStatus::Empty => {
                tracing::info!("all chats closed, exiting");
                self.active = None;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            ManagerStatus::Active(_) => {
                if self.active.as_deref() == Some(id) {
                    self.active = self.manager.ids().last().cloned();
                }
            }
        }
    }

    fn control_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Model:");
            egui::ComboBox::from_id_source("model_select")
                .selected_text(self.model.label())
                .width(220.0)
                .show_ui(ui, |ui| {
                    for choice in &self.config.models {
                        ui.selectable_value(&mut self.model, choice.clone(), choice.label());
                    }
                });
            ui.checkbox(&mut self.use_gpu, "Use GPU");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("New Chat (+)").clicked() {
                    self.open_tab();
                }
            });
        });
    }

    fn tab_strip(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for id in self.manager.ids().to_vec() {
                let Some(session) = self.manager.get(&id) else {
                    continue;
                };
                let mut title = session.title();
                if session.is_processing() {
                    title.push_str(" …");
                }
                let selected = self.active.as_deref() == Some(id.as_str());
                if ui.selectable_label(selected, title).clicked() {
                    self.active = Some(id);
                }
            }
        });
    }
}

impl eframe::App for MultichatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.manager.poll_all();
        ctx.request_repaint_after(self.config.poll_interval());

        self.drop_zone.update(ctx);
        let dropped = self.drop_zone.take_dropped();
        if !dropped.is_empty() {
            if let Some(session) = self.active.as_deref().and_then(|id| self.manager.get_mut(id)) {
                session.handle_drop(&dropped);
            }
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            self.control_bar(ui);
            ui.add_space(4.0);
            self.tab_strip(ui);
            ui.add_space(4.0);
        });

        let mut close: Option<String> = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(id) = self.active.clone() else {
                return;
            };
            if let Some(session) = self.manager.get_mut(&id) {
                if show_session(ui, session) == TabAction::Close {
                    close = Some(id);
                }
            }
        });
        if let Some(id) = close {
            self.close_tab(&id, ctx);
        }

        if let Some(title) = self
            .active
            .as_deref()
            .and_then(|id| self.manager.get(id))
            .map(|s| s.title())
        {
            self.drop_zone.show_overlay(ctx, &title);
        }
    }
}
