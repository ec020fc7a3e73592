//! Background half of a send
//!
//! A [`TurnJob`] is an owned snapshot taken on the UI thread. The worker
//! thread reads the attachments, builds the message list, drives the call
//! executor on its own runtime and reports everything back as
//! [`SessionEvent`]s. It never touches session state.

use crate::attachments::{display_name, image_bytes};
use crate::executor::{CallExecutor, CallOutcome};
use crate::readers::{FileReader, FsReader};
use anyhow::Context;
use providers::ModelService;
use shared::{ChatConfig, ChatMessage, ImageSource, ModelChoice, PendingAttachments, SessionEvent};
use std::panic::AssertUnwindSafe;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Everything the worker needs, shared read-only between sessions.
#[derive(Clone)]
pub struct TurnDeps {
    pub config: Arc<ChatConfig>,
    pub executor: Arc<CallExecutor>,
    pub reader: Arc<dyn FileReader>,
}

impl TurnDeps {
    /// Filesystem-backed dependencies around a model service.
    pub fn new(config: Arc<ChatConfig>, service: Arc<dyn ModelService>) -> Self {
        Self {
            executor: Arc::new(CallExecutor::new(service, config.clone())),
            reader: Arc::new(FsReader::new(config.pdf_support)),
            config,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.reader = reader;
        self
    }
}

pub struct TurnJob {
    pub prompt: String,
    pub attachments: PendingAttachments,
    /// History as it was when the send started.
    pub history: Vec<ChatMessage>,
    pub system_prompt: String,
    pub model: ModelChoice,
    pub use_gpu: bool,
}

/// Sends `Ready` when dropped, so the session leaves the busy state on
/// every exit path of the worker.
struct ReadyGuard(Sender<SessionEvent>);

impl Drop for ReadyGuard {
    fn drop(&mut self) {
        let _ = self.0.send(SessionEvent::Ready);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Start the worker thread for one send.
pub fn spawn(
    job: TurnJob,
    deps: TurnDeps,
    tx: Sender<SessionEvent>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("chat-turn".into())
        .spawn(move || {
            let _ready = ReadyGuard(tx.clone());
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| run_turn(job, &deps, &tx)));
            let failure = match result {
                Ok(Ok(())) => return,
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => panic_message(payload.as_ref()),
            };
            tracing::error!(error = %failure, "chat turn aborted");
            let _ = tx.send(SessionEvent::log(format!(
                "\n[!!] CRITICAL THREAD ERROR: {} [!!]",
                failure
            )));
        })
}

fn run_turn(job: TurnJob, deps: &TurnDeps, tx: &Sender<SessionEvent>) -> anyhow::Result<()> {
    let TurnJob {
        prompt,
        attachments,
        history,
        system_prompt,
        model,
        use_gpu,
    } = job;

    let system_prompt = if system_prompt.trim().is_empty() {
        deps.config.default_system_prompt.clone()
    } else {
        system_prompt.trim().to_string()
    };
    let user = build_user_message(
        &prompt,
        &attachments,
        model.mode.accepts_images(),
        deps.reader.as_ref(),
        tx,
    );

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(history);
    messages.push(user.clone());

    let _ = tx.send(SessionEvent::ThinkingStarted);
    tracing::info!(
        model = %model.name,
        use_gpu,
        messages = messages.len(),
        images = user.images.len(),
        "sending chat turn"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime.block_on(deps.executor.execute(&model.name, use_gpu, messages, tx));

    for event in outcome_events(outcome, user, &deps.config) {
        let _ = tx.send(event);
    }
    Ok(())
}

/// Assemble the user message: image payloads plus the file context block.
///
/// Unreadable files are reported through `tx` and left out.
pub fn build_user_message(
    prompt: &str,
    attachments: &PendingAttachments,
    with_images: bool,
    reader: &dyn FileReader,
    tx: &Sender<SessionEvent>,
) -> ChatMessage {
    let mut images = Vec::new();
    if with_images {
        for source in &attachments.images {
            match image_bytes(source, reader) {
                Ok(bytes) => images.push(bytes),
                Err(e) => {
                    let name = match source {
                        ImageSource::Path(path) => path.display().to_string(),
                        ImageSource::Bitmap(_) => "pasted image".to_string(),
                    };
                    let _ = tx.send(SessionEvent::log(format!(
                        "[!!] Failed to read image {}: {:#} [!!]",
                        name, e
                    )));
                }
            }
        }
    }

    let mut parts = Vec::new();
    for path in &attachments.texts {
        match reader.read_text(path) {
            Ok(content) => parts.push(context_part(&display_name(path), &content)),
            Err(e) => {
                let _ = tx.send(SessionEvent::log(format!(
                    "[!!] Failed to read text file {}: {} [!!]",
                    path.display(),
                    e
                )));
            }
        }
    }
    for path in &attachments.pdfs {
        match reader.extract_pdf_text(path) {
            Ok(content) => parts.push(context_part(&display_name(path), &content)),
            Err(e) => {
                let _ = tx.send(SessionEvent::log(format!(
                    "[!!] Failed to extract text from PDF {}: {} [!!]",
                    path.display(),
                    e
                )));
            }
        }
    }

    let context = parts.join("\n");
    let content = if context.is_empty() {
        prompt.to_string()
    } else {
        format!(
            "Here is the context from the attached files:\n{}\n--- End of file context ---\n\nUser's question: {}",
            context, prompt
        )
    };
    ChatMessage::user(content).with_images(images)
}

fn context_part(name: &str, content: &str) -> String {
    format!("--- Content of {} ---\n{}\n", name, content)
}

/// Events that apply a finished call to the session.
pub fn outcome_events(
    outcome: CallOutcome,
    user: ChatMessage,
    config: &ChatConfig,
) -> Vec<SessionEvent> {
    if outcome.success {
        let display = format!("({:.1} secs)\n{}\n", outcome.elapsed_secs(), outcome.reply);
        vec![
            SessionEvent::TurnRecorded {
                user,
                assistant: ChatMessage::assistant(outcome.reply),
            },
            SessionEvent::ThinkingReplaced(display),
        ]
    } else {
        vec![
            SessionEvent::log(format!(
                "\n[!!] Chatbot failed to generate a valid response after {} attempts. [!!]",
                config.max_attempts
            )),
            SessionEvent::TurnRecorded {
                user,
                assistant: ChatMessage::assistant(config.fallback_reply.clone()),
            },
            SessionEvent::ThinkingReplaced(format!("\n{}\n", config.fallback_reply)),
        ]
    }
}
