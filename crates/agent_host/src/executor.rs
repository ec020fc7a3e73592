//! Model call executor with reply validation and bounded retries
//!
//! Runs one turn against the model service: builds the runtime options,
//! retries on service faults and on refusal-like replies, and reports
//! progress through the session's notification channel. It never touches
//! session state directly.

use crate::validator::Validator;
use providers::{ChatRequest, ModelOptions, ModelService, ServiceError};
use shared::{ChatConfig, ChatMessage, SessionEvent};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Layers to offload when GPU use is requested.
#[cfg(target_os = "macos")]
const GPU_LAYERS: u32 = 1; // Metal
#[cfg(any(target_os = "linux", target_os = "windows"))]
const GPU_LAYERS: u32 = 99; // all available CUDA/ROCm layers
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const GPU_LAYERS: u32 = 1;

/// Threads used when the core count can't be determined.
const FALLBACK_THREADS: usize = 4;

/// Log line for a failed attempt. Only errors reported by Ollama itself
/// count as "Ollama Error"; transport and decoding faults are thread errors.
fn failure_line(attempt: usize, max_attempts: usize, e: &ServiceError) -> String {
    match e {
        ServiceError::Status { message, .. } => format!(
            "\n[!!] Ollama Error (Attempt {}/{}): {} [!!]",
            attempt, max_attempts, message
        ),
        other => format!(
            "\n[!!] THREAD ERROR (Attempt {}/{}): {} [!!]",
            attempt, max_attempts, other
        ),
    }
}

/// Human-readable name of the GPU backend on this platform.
pub fn gpu_backend_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "Metal (macOS)"
    } else if cfg!(target_os = "linux") {
        "CUDA/ROCm (Linux)"
    } else if cfg!(target_os = "windows") {
        "CUDA/ROCm (Windows)"
    } else {
        "Unknown"
    }
}

/// Thread hint for CPU-only runs: leave two cores for the UI.
pub fn cpu_threads(cores: Option<usize>) -> usize {
    match cores {
        Some(n) => n.saturating_sub(2).max(1),
        None => FALLBACK_THREADS,
    }
}

/// Build the runtime options for a call.
pub fn build_options(use_gpu: bool) -> ModelOptions {
    if use_gpu {
        ModelOptions {
            num_gpu: Some(GPU_LAYERS),
            num_thread: None,
        }
    } else {
        let cores = std::thread::available_parallelism().ok().map(|n| n.get());
        ModelOptions {
            num_gpu: Some(0),
            num_thread: Some(cpu_threads(cores)),
        }
    }
}

/// What a finished call hands back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    /// Last raw reply; may be empty when every attempt failed.
    pub reply: String,
    /// Duration of the attempt that produced `reply`.
    pub elapsed: Duration,
    pub success: bool,
}

impl CallOutcome {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// One attempt of the retry loop. Only used for diagnostics.
#[derive(Debug)]
struct AttemptRecord<'a> {
    attempt: usize,
    elapsed: Duration,
    reply: &'a str,
    valid: bool,
}

pub struct CallExecutor {
    service: Arc<dyn ModelService>,
    validator: Validator,
    config: Arc<ChatConfig>,
}

impl CallExecutor {
    pub fn new(service: Arc<dyn ModelService>, config: Arc<ChatConfig>) -> Self {
        Self {
            service,
            validator: Validator::from_config(&config),
            config,
        }
    }

    /// Call the model until it produces a valid reply or the attempt budget
    /// runs out.
    ///
    /// An invalid reply appends the correction prompt to `messages` so the
    /// next attempt sees it. Service faults pause for the configured retry
    /// interval and count against the same budget.
    pub async fn execute(
        &self,
        model: &str,
        use_gpu: bool,
        messages: Vec<ChatMessage>,
        notifier: &Sender<SessionEvent>,
    ) -> CallOutcome {
        let max_attempts = self.config.max_attempts;
        let mut request = ChatRequest {
            model: model.to_string(),
            messages,
            options: build_options(use_gpu),
        };
        let mut reply = String::new();
        let mut elapsed = Duration::ZERO;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            match self.service.chat(&request).await {
                Ok(text) => {
                    elapsed = started.elapsed();
                    reply = text;
                    let valid = self.validator.is_valid(&reply);
                    tracing::debug!(
                        record = ?AttemptRecord {
                            attempt,
                            elapsed,
                            reply: &reply,
                            valid,
                        },
                        "model attempt finished"
                    );
                    if valid {
                        tracing::info!(model, attempt, secs = elapsed.as_secs_f64(), "valid reply");
                        return CallOutcome {
                            reply,
                            elapsed,
                            success: true,
                        };
                    }

                    tracing::warn!(model, attempt, "reply rejected by validator");
                    let _ = notifier.send(SessionEvent::log("\n[Chatbot is rethinking...]"));
                    request
                        .messages
                        .push(ChatMessage::user(self.config.correction_prompt.clone()));
                }
                Err(e) => {
                    tracing::warn!(model, attempt, error = %e, "model call failed");
                    let _ = notifier.send(SessionEvent::log(failure_line(
                        attempt,
                        max_attempts,
                        &e,
                    )));
                    if attempt < max_attempts && !self.config.retry_pause().is_zero() {
                        tokio::time::sleep(self.config.retry_pause()).await;
                    }
                }
            }
        }

        tracing::error!(model, max_attempts, "no valid reply, giving up");
        CallOutcome {
            reply,
            elapsed,
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedService;
    use std::sync::mpsc::channel;

    fn fast_config() -> Arc<ChatConfig> {
        Arc::new(ChatConfig {
            retry_pause_ms: 0,
            ..ChatConfig::default()
        })
    }

    fn logs(rx: &std::sync::mpsc::Receiver<SessionEvent>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|e| match e {
                SessionEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_cpu_threads_leaves_two_cores() {
        assert_eq!(cpu_threads(Some(8)), 6);
        assert_eq!(cpu_threads(Some(2)), 1);
        assert_eq!(cpu_threads(Some(1)), 1);
        assert_eq!(cpu_threads(None), 4);
    }

    #[test]
    fn test_options_gpu_vs_cpu() {
        let gpu = build_options(true);
        assert_eq!(gpu.num_gpu, Some(GPU_LAYERS));
        assert_eq!(gpu.num_thread, None);

        let cpu = build_options(false);
        assert_eq!(cpu.num_gpu, Some(0));
        assert!(cpu.num_thread.unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_refusal_then_valid_reply() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok("As an AI, I cannot help with that.".into()),
            Ok("Paris is the capital of France.".into()),
        ]));
        let executor = CallExecutor::new(service.clone(), fast_config());
        let (tx, rx) = channel();

        let outcome = executor
            .execute(
                "llava:latest",
                true,
                vec![ChatMessage::user("Capital of France?")],
                &tx,
            )
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.reply, "Paris is the capital of France.");

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 2);
        assert!(requests[1].messages[1]
            .content
            .starts_with("That was not a valid response."));

        assert_eq!(logs(&rx), vec!["\n[Chatbot is rethinking...]".to_string()]);
    }

    #[tokio::test]
    async fn test_service_error_is_retried() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::Timeout),
            Ok("Fine.".into()),
        ]));
        let executor = CallExecutor::new(service.clone(), fast_config());
        let (tx, rx) = channel();

        let outcome = executor
            .execute("m", false, vec![ChatMessage::user("hi")], &tx)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.reply, "Fine.");
        // A failed call adds no correction message.
        assert_eq!(service.requests()[1].messages.len(), 1);
        assert_eq!(
            logs(&rx),
            vec!["\n[!!] THREAD ERROR (Attempt 1/5): request timed out [!!]".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ollama_status_error_is_labelled() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::Status {
                status: 404,
                message: "model 'llava' not found".into(),
            }),
            Err(ServiceError::Connection("refused".into())),
            Ok("Fine.".into()),
        ]));
        let executor = CallExecutor::new(service, fast_config());
        let (tx, rx) = channel();

        let outcome = executor
            .execute("llava", false, vec![ChatMessage::user("hi")], &tx)
            .await;

        assert!(outcome.success);
        assert_eq!(
            logs(&rx),
            vec![
                "\n[!!] Ollama Error (Attempt 1/5): model 'llava' not found [!!]".to_string(),
                "\n[!!] THREAD ERROR (Attempt 2/5): could not connect to model service: refused [!!]"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_last_reply() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::Connection("refused".into())),
            Ok("I cannot do that.".into()),
            Err(ServiceError::Timeout),
            Ok("As an AI, no.".into()),
            Ok("I am unable to.".into()),
        ]));
        let executor = CallExecutor::new(service.clone(), fast_config());
        let (tx, rx) = channel();

        let outcome = executor
            .execute("m", true, vec![ChatMessage::user("hi")], &tx)
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.reply, "I am unable to.");
        assert_eq!(service.requests().len(), 5);
        assert_eq!(logs(&rx).len(), 5);
    }

    #[tokio::test]
    async fn test_all_errors_yield_empty_reply() {
        let service = Arc::new(ScriptedService::new(
            (0..5).map(|_| Err(ServiceError::Timeout)).collect(),
        ));
        let executor = CallExecutor::new(service, fast_config());
        let (tx, _rx) = channel();

        let outcome = executor
            .execute("m", true, vec![ChatMessage::user("hi")], &tx)
            .await;

        assert!(!outcome.success);
        assert!(outcome.reply.is_empty());
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_closed_notifier_does_not_abort_call() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok("As an AI, no.".into()),
            Ok("Yes.".into()),
        ]));
        let executor = CallExecutor::new(service, fast_config());
        let (tx, rx) = channel();
        drop(rx);

        let outcome = executor
            .execute("m", true, vec![ChatMessage::user("hi")], &tx)
            .await;
        assert!(outcome.success);
    }
}
