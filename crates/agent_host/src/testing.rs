//! In-memory doubles for the model service, rendering surface and clipboard.

use crate::clipboard::ClipboardFileProvider;
use crate::surface::ChatSurface;
use parking_lot::Mutex;
use providers::{ChatRequest, ModelService, ServiceError};
use shared::PastedImage;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

/// Replays a fixed script of results and records every request.
pub struct ScriptedService {
    script: Mutex<VecDeque<Result<String, ServiceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    /// Each call waits for one message here before answering, when set.
    gate: Option<Mutex<Receiver<()>>>,
}

impl ScriptedService {
    pub fn new(script: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(script: Vec<Result<String, ServiceError>>, gate: Receiver<()>) -> Self {
        Self {
            gate: Some(Mutex::new(gate)),
            ..Self::new(script)
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl ModelService for ScriptedService {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().recv();
        }
        self.requests.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("Default reply.".into()))
    }
}

/// Everything a session asked the surface to do, in order.
#[derive(Default)]
pub struct RecordingSurface {
    pub lines: Vec<String>,
    pub markdown: Vec<String>,
    pub in_progress: bool,
    pub replaced: Vec<String>,
    pub input_text: String,
    pub input_enabled: bool,
    pub images: Vec<(u32, u32, String)>,
    pub references: Vec<String>,
}

impl RecordingSurface {
    pub fn with_input(text: &str) -> Self {
        Self {
            input_text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn type_text(&mut self, text: &str) {
        self.input_text = text.to_string();
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl ChatSurface for RecordingSurface {
    fn display(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn display_markdown(&mut self, text: &str) {
        self.markdown.push(text.to_string());
    }

    fn show_in_progress(&mut self) {
        self.in_progress = true;
    }

    fn replace_in_progress(&mut self, text: &str) {
        self.in_progress = false;
        self.replaced.push(text.to_string());
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn take_input_text(&mut self) -> String {
        std::mem::take(&mut self.input_text).trim().to_string()
    }

    fn clear_output(&mut self) {
        self.lines.clear();
        self.markdown.clear();
        self.replaced.clear();
    }

    fn clear_attachments(&mut self) {
        self.images.clear();
        self.references.clear();
    }

    fn add_image(&mut self, thumbnail: &PastedImage, label: &str) {
        self.images
            .push((thumbnail.width, thumbnail.height, label.to_string()));
    }

    fn add_reference(&mut self, label: &str) {
        self.references.push(label.to_string());
    }
}

#[derive(Default)]
pub struct FakeClipboard {
    pub text: Option<String>,
    pub paths: Option<Vec<PathBuf>>,
    pub image: Option<PastedImage>,
}

impl ClipboardFileProvider for FakeClipboard {
    fn text(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn file_paths(&mut self) -> Option<Vec<PathBuf>> {
        self.paths.clone()
    }

    fn image(&mut self) -> Option<PastedImage> {
        self.image.clone()
    }
}
