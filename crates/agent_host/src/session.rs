//! One chat tab: conversation state, attachments and the send state machine.
//!
//! The controller lives on the UI thread. A send snapshots what the worker
//! needs and hands it to [`turn::spawn`]; results come back over the
//! session's channel and are applied by [`SessionController::poll`].

use crate::attachments::{
    classify, display_name, image_label, thumbnail, AttachSource, Rejection,
};
use crate::clipboard::{looks_like_file, ClipboardFileProvider};
use crate::executor::gpu_backend_name;
use crate::surface::ChatSurface;
use crate::turn::{self, TurnDeps, TurnJob};
use shared::{
    Attachment, ChatConfig, ChatMessage, ImageSource, ModelChoice, PendingAttachments,
    Persona, PersonaState, SessionEvent,
};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

const SEPARATOR: &str = "--------------------------------------------------";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// A worker is running for this send.
    Dispatched,
    /// A previous send is still in flight.
    Busy,
    /// Nothing to send.
    Empty,
    /// The worker thread could not be started; the session stays idle.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasteOutcome {
    /// The paste was consumed as attachments (or refused).
    Handled,
    /// Let the input field paste the text as usual.
    PassThrough,
}

pub struct SessionController<S: ChatSurface> {
    id: String,
    number: usize,
    surface: S,
    deps: TurnDeps,
    model: ModelChoice,
    use_gpu: bool,
    history: Vec<ChatMessage>,
    pending: PendingAttachments,
    persona: PersonaState,
    processing: bool,
    thinking: bool,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl<S: ChatSurface> SessionController<S> {
    pub fn new(
        id: impl Into<String>,
        number: usize,
        surface: S,
        deps: TurnDeps,
        model: ModelChoice,
        use_gpu: bool,
    ) -> Self {
        let (tx, rx) = channel();
        let persona = PersonaState::starting(deps.config.default_system_prompt.clone());
        let mut session = Self {
            id: id.into(),
            number,
            surface,
            deps,
            model,
            use_gpu,
            history: Vec::new(),
            pending: PendingAttachments::default(),
            persona,
            processing: false,
            thinking: false,
            tx,
            rx,
        };
        tracing::info!(id = %session.id, model = %session.model.name, use_gpu, "chat session created");
        session.start_new_chat();
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tab title, e.g. `llava [G] (1)`.
    pub fn title(&self) -> String {
        let gpu = if self.use_gpu { " [G]" } else { "" };
        format!("{}{} ({})", self.model.base_name(), gpu, self.number)
    }

    pub fn model(&self) -> &ModelChoice {
        &self.model
    }

    pub fn use_gpu(&self) -> bool {
        self.use_gpu
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn pending(&self) -> &PendingAttachments {
        &self.pending
    }

    pub fn config(&self) -> &ChatConfig {
        &self.deps.config
    }

    pub fn persona(&self) -> &PersonaState {
        &self.persona
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn select_persona(&mut self, persona: Persona) {
        self.persona.select(persona);
    }

    pub fn edit_system_prompt(&mut self, text: impl Into<String>) {
        self.persona.edit(text);
    }

    fn start_new_chat(&mut self) {
        self.surface.clear_output();
        self.surface.clear_attachments();

        self.surface.display(&format!(
            "Welcome! [Mode: {}] [Model: {}]",
            self.model.mode.display_name(),
            self.model.name
        ));
        if self.use_gpu {
            self.surface.display(&format!(
                "[Info: GPU acceleration enabled ({}).]",
                gpu_backend_name()
            ));
        } else {
            self.surface.display("[Info: CPU processing will be used.]");
        }
        if !self.model.mode.accepts_images() {
            self.surface.display("Image attachments are disabled.");
        }
        self.surface.display(SEPARATOR);

        self.history.clear();
        self.pending.clear();
        self.persona = PersonaState::starting(self.deps.config.default_system_prompt.clone());
        self.processing = false;
        self.thinking = false;
        self.surface.set_input_enabled(true);
    }

    /// Start a send from the current input and pending attachments.
    pub fn send(&mut self) -> SendOutcome {
        if self.processing {
            return SendOutcome::Busy;
        }

        let text = self.surface.take_input_text();
        if text.is_empty() && self.pending.is_empty() {
            self.surface
                .display("\n[!!] Please type a message or attach a file. [!!]");
            return SendOutcome::Empty;
        }

        let attachments = self.pending.take();
        self.surface.clear_attachments();

        let (prompt, header) = if attachments.is_empty() {
            (text, "--- Me ---".to_string())
        } else {
            let prompt = if text.is_empty() {
                self.deps.config.default_attachment_prompt.clone()
            } else {
                text
            };
            let header = format!(
                "--- Me (with {} images, {} PDFs, {} files) ---",
                attachments.images.len(),
                attachments.pdfs.len(),
                attachments.texts.len()
            );
            (prompt, header)
        };
        self.surface.display(&format!("\n{}\n{}", header, prompt));

        let job = TurnJob {
            prompt,
            attachments,
            history: self.history.clone(),
            system_prompt: self.persona.text().to_string(),
            model: self.model.clone(),
            use_gpu: self.use_gpu,
        };

        self.processing = true;
        self.surface.set_input_enabled(false);
        match turn::spawn(job, self.deps.clone(), self.tx.clone()) {
            Ok(_) => SendOutcome::Dispatched,
            Err(e) => self.abort_send(&e),
        }
    }

    fn abort_send(&mut self, e: &std::io::Error) -> SendOutcome {
        tracing::error!(id = %self.id, error = %e, "could not start worker thread");
        self.surface
            .display(&format!("\n[!!] CRITICAL THREAD ERROR: {} [!!]", e));
        self.processing = false;
        self.surface.set_input_enabled(true);
        SendOutcome::Failed
    }

    /// Apply every queued worker event, in order. Returns how many there were.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            handled += 1;
        }
        handled
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Log(line) => self.surface.display(&line),
            SessionEvent::ThinkingStarted => {
                self.thinking = true;
                self.surface.show_in_progress();
            }
            SessionEvent::ThinkingReplaced(text) => {
                if std::mem::take(&mut self.thinking) {
                    self.surface.replace_in_progress(&text);
                } else {
                    self.surface.display("\n--- Chatbot ---");
                    self.surface.display_markdown(&text);
                }
            }
            SessionEvent::TurnRecorded { user, assistant } => {
                self.history.push(user);
                self.history.push(assistant);
            }
            SessionEvent::Ready => {
                self.processing = false;
                self.surface.set_input_enabled(true);
                tracing::debug!(id = %self.id, turns = self.history.len() / 2, "session idle");
            }
        }
    }

    /// Clear the conversation. Refused while a reply is pending.
    pub fn reset(&mut self) -> bool {
        if self.processing {
            self.surface
                .display("\n[!!] Please wait for the current response to finish. [!!]");
            return false;
        }
        self.start_new_chat();
        self.surface.display("\n--- CHAT CLEARED ---");
        tracing::info!(id = %self.id, "chat cleared");
        true
    }

    /// Files dropped onto the conversation view.
    pub fn handle_drop(&mut self, paths: &[PathBuf]) -> usize {
        self.attach_guarded(paths, AttachSource::Dropped)
    }

    /// Files chosen in the file picker.
    pub fn attach_files(&mut self, paths: &[PathBuf]) -> usize {
        self.attach_guarded(paths, AttachSource::Picked)
    }

    fn attach_guarded(&mut self, paths: &[PathBuf], source: AttachSource) -> usize {
        if self.processing {
            self.surface
                .display("[!!] Cannot attach file while processing. [!!]");
            return 0;
        }
        self.attach_paths(paths, source)
    }

    /// Classify and queue each path. Returns how many were accepted.
    pub fn attach_paths(&mut self, paths: &[PathBuf], source: AttachSource) -> usize {
        let mut added = 0;
        for path in paths {
            match classify(
                path,
                &self.deps.config,
                self.model.mode,
                self.deps.reader.pdf_enabled(),
            ) {
                Ok(attachment) => {
                    let kind = attachment.kind();
                    let position = self.pending.push(attachment);
                    self.surface.display(&format!(
                        "\n[+] {} {} {}: {}",
                        kind.label(),
                        position,
                        source.as_str(),
                        display_name(path)
                    ));
                    added += 1;
                }
                Err(rejection) => {
                    if let Rejection::NotFound(_) = rejection {
                        tracing::warn!(path = %path.display(), "attachment path not found");
                    }
                    self.surface.display(&rejection.notice(source));
                }
            }
        }
        if added > 0 {
            self.rebuild_preview();
        }
        added
    }

    /// Intercept a paste into the input field.
    ///
    /// Plain text is left to the input field. File references and bitmaps
    /// become attachments.
    pub fn handle_paste(&mut self, clipboard: &mut dyn ClipboardFileProvider) -> PasteOutcome {
        if self.processing {
            self.surface.display("[!!] Cannot paste while processing. [!!]");
            return PasteOutcome::Handled;
        }

        if let Some(text) = clipboard.text() {
            if !looks_like_file(&text) {
                return PasteOutcome::PassThrough;
            }
        }

        if let Some(paths) = clipboard.file_paths().filter(|p| !p.is_empty()) {
            self.attach_paths(&paths, AttachSource::Pasted);
            return PasteOutcome::Handled;
        }

        if let Some(bitmap) = clipboard.image() {
            if !self.model.mode.accepts_images() {
                self.surface
                    .display("[!!] Image pasting is disabled for this LLM. [!!]");
                return PasteOutcome::Handled;
            }
            let position = self
                .pending
                .push(Attachment::Image(ImageSource::Bitmap(bitmap)));
            self.surface
                .display(&format!("\n[+] Image {} pasted from clipboard.", position));
            self.rebuild_preview();
            return PasteOutcome::Handled;
        }

        PasteOutcome::PassThrough
    }

    fn rebuild_preview(&mut self) {
        self.surface.clear_attachments();
        let reader = self.deps.reader.clone();

        for (i, source) in self.pending.images.iter().enumerate() {
            match thumbnail(source, reader.as_ref()) {
                Ok(thumb) => self.surface.add_image(&thumb, &image_label(source, i + 1)),
                Err(e) => self
                    .surface
                    .display(&format!("[!!] Error creating thumbnail: {} [!!]", e)),
            }
        }
        for (i, path) in self.pending.pdfs.iter().enumerate() {
            self.surface
                .add_reference(&format!("{}. {}", i + 1, display_name(path)));
        }
        for (i, path) in self.pending.texts.iter().enumerate() {
            self.surface
                .add_reference(&format!("{}. {}", i + 1, display_name(path)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{FileReader, ReadError};
    use crate::testing::{FakeClipboard, RecordingSurface, ScriptedService};
    use providers::ServiceError;
    use shared::{PastedImage, Role};
    use std::path::Path;
    use std::sync::mpsc::Sender as GateSender;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn config() -> Arc<ChatConfig> {
        Arc::new(ChatConfig {
            retry_pause_ms: 0,
            ..ChatConfig::default()
        })
    }

    fn session_with(
        service: Arc<ScriptedService>,
        model: ModelChoice,
        pdf: bool,
    ) -> SessionController<RecordingSurface> {
        let config = Arc::new(ChatConfig {
            pdf_support: pdf,
            ..(*config()).clone()
        });
        let deps = TurnDeps::new(config, service);
        SessionController::new("chat_1", 1, RecordingSurface::default(), deps, model, true)
    }

    fn vision(service: Arc<ScriptedService>) -> SessionController<RecordingSurface> {
        session_with(service, ModelChoice::vision("llava:latest"), false)
    }

    fn text_only(service: Arc<ScriptedService>) -> SessionController<RecordingSurface> {
        session_with(service, ModelChoice::text_only("gemma3:4b"), false)
    }

    fn wait_idle<S: ChatSurface>(session: &mut SessionController<S>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.is_processing() {
            assert!(Instant::now() < deadline, "send never finished");
            session.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn write_png(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_banner_for_text_only_model() {
        let session = text_only(Arc::new(ScriptedService::new(vec![])));
        let lines = &session.surface().lines;
        assert_eq!(lines[0], "Welcome! [Mode: LLM Only] [Model: gemma3:4b]");
        assert!(lines[1].starts_with("[Info: GPU acceleration enabled ("));
        assert_eq!(lines[2], "Image attachments are disabled.");
        assert_eq!(lines[3], SEPARATOR);
        assert!(session.surface().input_enabled);
        assert_eq!(session.title(), "gemma3 [G] (1)");
    }

    #[test]
    fn test_hello_scenario() {
        let service = Arc::new(ScriptedService::new(vec![Ok("Hi there.".into())]));
        let mut session = vision(service.clone());
        session.surface_mut().type_text("  Hello ");

        assert_eq!(session.send(), SendOutcome::Dispatched);
        assert!(session.is_processing());
        assert!(!session.surface().input_enabled);
        assert!(session.surface().logged("\n--- Me ---\nHello"));

        wait_idle(&mut session);

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llava:latest");
        assert_eq!(
            requests[0].messages,
            vec![
                ChatMessage::system(ChatConfig::default().default_system_prompt),
                ChatMessage::user("Hello"),
            ]
        );
        assert_eq!(
            session.history(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there.")]
        );
        let replaced = &session.surface().replaced;
        assert_eq!(replaced.len(), 1);
        assert!(replaced[0].starts_with('('));
        assert!(replaced[0].ends_with(" secs)\nHi there.\n"));
        assert!(session.surface().input_enabled);
    }

    #[test]
    fn test_second_turn_carries_history() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok("First.".into()),
            Ok("Second.".into()),
        ]));
        let mut session = vision(service.clone());
        session.surface_mut().type_text("one");
        session.send();
        wait_idle(&mut session);
        session.surface_mut().type_text("two");
        session.send();
        wait_idle(&mut session);

        let second = &service.requests()[1].messages;
        assert_eq!(second.len(), 4);
        assert_eq!(second[1], ChatMessage::user("one"));
        assert_eq!(second[2], ChatMessage::assistant("First."));
        assert_eq!(second[3], ChatMessage::user("two"));
        assert_eq!(session.history().len(), 4);
    }

    #[test]
    fn test_fresh_session_starts_on_default_prompt() {
        let session = vision(Arc::new(ScriptedService::new(vec![])));
        assert_eq!(session.persona().selected(), Persona::HelpfulAssistant);
        assert_eq!(session.persona().text(), "You are a helpful assistant. Be concise.");
    }

    #[test]
    fn test_worker_start_failure_leaves_session_idle() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let mut session = vision(service.clone());
        session.processing = true;
        session.surface_mut().set_input_enabled(false);

        let err = std::io::Error::new(std::io::ErrorKind::Other, "out of threads");
        assert_eq!(session.abort_send(&err), SendOutcome::Failed);
        assert!(!session.is_processing());
        assert!(session.surface().input_enabled);
        assert!(session
            .surface()
            .logged("[!!] CRITICAL THREAD ERROR: out of threads [!!]"));
        assert!(service.requests().is_empty());
    }

    #[test]
    fn test_reply_without_indicator_is_rendered_as_markdown() {
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        session.apply(SessionEvent::ThinkingReplaced("(0.5 secs)\n**Hi**\n".into()));

        assert!(session.surface().replaced.is_empty());
        assert_eq!(session.surface().markdown, vec!["(0.5 secs)\n**Hi**\n".to_string()]);
        assert!(session.surface().logged("--- Chatbot ---"));
    }

    #[test]
    fn test_reply_after_indicator_replaces_it() {
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        session.apply(SessionEvent::ThinkingStarted);
        assert!(session.surface().in_progress);
        session.apply(SessionEvent::ThinkingReplaced("done".into()));

        assert!(!session.surface().in_progress);
        assert_eq!(session.surface().replaced, vec!["done".to_string()]);
        assert!(session.surface().markdown.is_empty());
    }

    #[test]
    fn test_send_while_busy_is_rejected() {
        let (gate_tx, gate_rx) = std::sync::mpsc::channel();
        let service = Arc::new(ScriptedService::gated(vec![Ok("Done.".into())], gate_rx));
        let mut session = vision(service.clone());

        session.surface_mut().type_text("first");
        assert_eq!(session.send(), SendOutcome::Dispatched);

        session.surface_mut().type_text("second");
        assert_eq!(session.send(), SendOutcome::Busy);
        // The rejected send leaves the input untouched.
        assert_eq!(session.surface().input_text, "second");
        assert!(!session.reset());
        assert!(session
            .surface()
            .logged("\n[!!] Please wait for the current response to finish. [!!]"));

        release(&gate_tx);
        wait_idle(&mut session);
        assert_eq!(service.requests().len(), 1);
        assert_eq!(session.send(), SendOutcome::Dispatched);
        release(&gate_tx);
        wait_idle(&mut session);
    }

    fn release(gate: &GateSender<()>) {
        gate.send(()).unwrap();
    }

    #[test]
    fn test_exhausted_attempts_record_fallback() {
        let service = Arc::new(ScriptedService::new(
            (0..5).map(|_| Err(ServiceError::Timeout)).collect(),
        ));
        let mut session = vision(service);
        session.surface_mut().type_text("Hello");
        session.send();
        wait_idle(&mut session);

        let fallback = "[The assistant is unable to provide a valid response at this time.]";
        assert_eq!(session.history()[1], ChatMessage::assistant(fallback));
        assert!(session.surface().logged(
            "\n[!!] Chatbot failed to generate a valid response after 5 attempts. [!!]"
        ));
        assert_eq!(session.surface().replaced, vec![format!("\n{}\n", fallback)]);
        assert_eq!(
            session
                .surface()
                .lines
                .iter()
                .filter(|l| l.contains("THREAD ERROR (Attempt"))
                .count(),
            5
        );
    }

    #[test]
    fn test_refusal_then_answer() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok("I cannot answer that.".into()),
            Ok("Paris.".into()),
        ]));
        let mut session = vision(service.clone());
        session.surface_mut().type_text("Capital of France?");
        session.send();
        wait_idle(&mut session);

        assert!(session.surface().logged("\n[Chatbot is rethinking...]"));
        assert_eq!(session.history()[1], ChatMessage::assistant("Paris."));
        // The correction prompt is not kept in history.
        assert_eq!(session.history().len(), 2);
        assert_eq!(service.requests()[1].messages.len(), 3);
    }

    #[test]
    fn test_image_with_question() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(&dir, "cat.png");
        let service = Arc::new(ScriptedService::new(vec![Ok("A tiny image.".into())]));
        let mut session = vision(service.clone());

        assert_eq!(session.handle_drop(&[png.clone()]), 1);
        assert!(session.surface().logged("\n[+] Image 1 dropped: cat.png"));
        assert_eq!(session.surface().images, vec![(4, 2, "cat.png".to_string())]);

        session.surface_mut().type_text("What is this?");
        session.send();
        assert!(session.pending().is_empty());
        assert!(session.surface().images.is_empty());
        assert!(session
            .surface()
            .logged("--- Me (with 1 images, 0 PDFs, 0 files) ---\nWhat is this?"));
        wait_idle(&mut session);

        let user = session.history()[0].clone();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "What is this?");
        assert_eq!(user.images, vec![std::fs::read(&png).unwrap()]);
        assert_eq!(service.requests()[0].messages[1], user);
    }

    #[test]
    fn test_text_only_rejects_images() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(&dir, "cat.png");
        let mut session = text_only(Arc::new(ScriptedService::new(vec![])));

        assert_eq!(session.handle_drop(&[png]), 0);
        assert!(session
            .surface()
            .logged("[!!] Image attachments are disabled for this LLM. [!!]"));
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_pdf_rejected_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write(&dir, "paper.pdf", "%PDF-1.4");
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));

        assert_eq!(session.handle_drop(&[pdf]), 0);
        assert!(session.surface().logged("[!!] PDF processing is disabled."));
    }

    #[test]
    fn test_missing_path_is_reported() {
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        assert_eq!(session.handle_drop(&[PathBuf::from("/no/such/file.txt")]), 0);
        assert!(session
            .surface()
            .logged("[!!] Error: Dropped file path not found: /no/such/file.txt [!!]"));
    }

    #[test]
    fn test_unknown_extension_is_a_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let blob = write(&dir, "data.xyz", "payload");
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));

        assert_eq!(session.attach_files(&[blob]), 1);
        assert!(session.surface().logged("\n[+] File 1 attached: data.xyz"));
        assert_eq!(session.surface().references, vec!["1. data.xyz".to_string()]);
    }

    #[test]
    fn test_attachments_only_uses_default_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write(&dir, "notes.md", "# Todo\n- ship it");
        let service = Arc::new(ScriptedService::new(vec![Ok("Ship it.".into())]));
        let mut session = vision(service.clone());

        session.handle_drop(&[notes]);
        assert_eq!(session.send(), SendOutcome::Dispatched);
        assert!(session.surface().logged(
            "--- Me (with 0 images, 0 PDFs, 1 files) ---\nPlease describe or analyze the attached content."
        ));
        wait_idle(&mut session);

        let sent = &service.requests()[0].messages[1];
        assert_eq!(
            sent.content,
            "Here is the context from the attached files:\n\
             --- Content of notes.md ---\n# Todo\n- ship it\n\n\
             --- End of file context ---\n\n\
             User's question: Please describe or analyze the attached content."
        );
    }

    struct PdfStub;

    impl FileReader for PdfStub {
        fn read_image_bytes(&self, path: &Path) -> Result<Vec<u8>, ReadError> {
            Err(ReadError::NotFound(path.to_path_buf()))
        }

        fn read_text(&self, _path: &Path) -> Result<String, ReadError> {
            Ok("text body".into())
        }

        fn extract_pdf_text(&self, _path: &Path) -> Result<String, ReadError> {
            Ok("page one\npage two".into())
        }

        fn pdf_enabled(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_pdf_and_text_context_order() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write(&dir, "paper.pdf", "%PDF");
        let txt = write(&dir, "notes.txt", "ignored");
        let service = Arc::new(ScriptedService::new(vec![Ok("Summary.".into())]));
        let deps = TurnDeps::new(config(), service.clone()).with_reader(Arc::new(PdfStub));
        let mut session = SessionController::new(
            "chat_1",
            1,
            RecordingSurface::default(),
            deps,
            ModelChoice::text_only("gemma3:4b"),
            false,
        );

        assert_eq!(session.handle_drop(&[pdf, txt]), 2);
        assert!(session.surface().logged("\n[+] PDF 1 dropped: paper.pdf"));
        assert!(session.surface().logged("\n[+] File 1 dropped: notes.txt"));
        assert_eq!(
            session.surface().references,
            vec!["1. paper.pdf".to_string(), "1. notes.txt".to_string()]
        );

        session.surface_mut().type_text("Sum up");
        session.send();
        wait_idle(&mut session);

        let content = &service.requests()[0].messages[1].content;
        let text_at = content.find("--- Content of notes.txt ---").unwrap();
        let pdf_at = content.find("--- Content of paper.pdf ---\npage one\npage two\n").unwrap();
        assert!(text_at < pdf_at);
        assert!(content.ends_with("User's question: Sum up"));
    }

    #[test]
    fn test_empty_send_hint() {
        let service = Arc::new(ScriptedService::new(vec![]));
        let mut session = vision(service.clone());
        session.surface_mut().type_text("   ");

        assert_eq!(session.send(), SendOutcome::Empty);
        assert!(!session.is_processing());
        assert!(session
            .surface()
            .logged("\n[!!] Please type a message or attach a file. [!!]"));
        assert!(service.requests().is_empty());
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write(&dir, "notes.txt", "x");
        let service = Arc::new(ScriptedService::new(vec![Ok("Hi.".into())]));
        let mut session = vision(service);
        session.select_persona(Persona::Pirate);
        session.surface_mut().type_text("Hello");
        session.send();
        wait_idle(&mut session);
        session.handle_drop(&[notes]);

        assert!(session.reset());
        assert!(session.history().is_empty());
        assert!(session.pending().is_empty());
        assert_eq!(session.persona().selected(), Persona::HelpfulAssistant);
        assert_eq!(
            session.persona().text(),
            ChatConfig::default().default_system_prompt
        );
        assert!(session.surface().references.is_empty());
        assert!(session.surface().input_enabled);
        let lines = &session.surface().lines;
        assert_eq!(lines[0], "Welcome! [Mode: VLM] [Model: llava:latest]");
        assert_eq!(lines.last().map(String::as_str), Some("\n--- CHAT CLEARED ---"));
    }

    #[test]
    fn test_custom_system_prompt_is_sent() {
        let service = Arc::new(ScriptedService::new(vec![Ok("Arr.".into())]));
        let mut session = vision(service.clone());
        session.edit_system_prompt("Answer in French.");
        assert_eq!(session.persona().selected(), Persona::Custom);

        session.surface_mut().type_text("Hello");
        session.send();
        wait_idle(&mut session);
        assert_eq!(
            service.requests()[0].messages[0],
            ChatMessage::system("Answer in French.")
        );
    }

    #[test]
    fn test_blank_system_prompt_falls_back_to_default() {
        let service = Arc::new(ScriptedService::new(vec![Ok("Ok.".into())]));
        let mut session = vision(service.clone());
        session.edit_system_prompt("   ");
        session.surface_mut().type_text("Hello");
        session.send();
        wait_idle(&mut session);
        assert_eq!(
            service.requests()[0].messages[0],
            ChatMessage::system("You are a helpful assistant. Be concise.")
        );
    }

    #[test]
    fn test_plain_text_paste_passes_through() {
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        let mut clipboard = FakeClipboard {
            text: Some("some prose".into()),
            ..FakeClipboard::default()
        };
        assert_eq!(session.handle_paste(&mut clipboard), PasteOutcome::PassThrough);
    }

    #[test]
    fn test_pasted_file_paths_are_attached() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write(&dir, "notes.txt", "x");
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        let mut clipboard = FakeClipboard {
            text: Some(format!("file://{}", notes.display())),
            paths: Some(vec![notes]),
            image: None,
        };
        assert_eq!(session.handle_paste(&mut clipboard), PasteOutcome::Handled);
        assert!(session.surface().logged("\n[+] File 1 pasted: notes.txt"));
    }

    fn bitmap() -> PastedImage {
        PastedImage {
            width: 2,
            height: 2,
            rgba: vec![255; 16],
        }
    }

    #[test]
    fn test_pasted_bitmap_becomes_image() {
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));
        let mut clipboard = FakeClipboard {
            image: Some(bitmap()),
            ..FakeClipboard::default()
        };
        assert_eq!(session.handle_paste(&mut clipboard), PasteOutcome::Handled);
        assert!(session.surface().logged("\n[+] Image 1 pasted from clipboard."));
        assert_eq!(
            session.surface().images,
            vec![(2, 2, "Pasted Image 1".to_string())]
        );
    }

    #[test]
    fn test_pasted_bitmap_rejected_in_text_only_mode() {
        let mut session = text_only(Arc::new(ScriptedService::new(vec![])));
        let mut clipboard = FakeClipboard {
            image: Some(bitmap()),
            ..FakeClipboard::default()
        };
        assert_eq!(session.handle_paste(&mut clipboard), PasteOutcome::Handled);
        assert!(session
            .surface()
            .logged("[!!] Image pasting is disabled for this LLM. [!!]"));
        assert!(session.pending().is_empty());
    }

    #[test]
    fn test_paste_and_drop_refused_while_busy() {
        let (gate_tx, gate_rx) = std::sync::mpsc::channel();
        let service = Arc::new(ScriptedService::gated(vec![], gate_rx));
        let mut session = vision(service);
        session.surface_mut().type_text("hi");
        session.send();

        let mut clipboard = FakeClipboard {
            image: Some(bitmap()),
            ..FakeClipboard::default()
        };
        assert_eq!(session.handle_paste(&mut clipboard), PasteOutcome::Handled);
        assert!(session.surface().logged("[!!] Cannot paste while processing. [!!]"));
        assert_eq!(session.handle_drop(&[PathBuf::from("/tmp")]), 0);
        assert!(session
            .surface()
            .logged("[!!] Cannot attach file while processing. [!!]"));

        release(&gate_tx);
        wait_idle(&mut session);
    }

    #[test]
    fn test_broken_image_reports_thumbnail_error() {
        let dir = tempfile::tempdir().unwrap();
        let fake = write(&dir, "broken.png", "not an image");
        let mut session = vision(Arc::new(ScriptedService::new(vec![])));

        assert_eq!(session.handle_drop(&[fake]), 1);
        assert!(session.surface().logged("[!!] Error creating thumbnail:"));
        assert!(session.surface().images.is_empty());
    }
}
