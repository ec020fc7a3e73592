//! Notifications sent from a background send to the session that owns it.
//!
//! Every send produces its events in a fixed order: zero or more `Log`
//! lines, `ThinkingStarted`, more `Log` lines from the retry loop,
//! `TurnRecorded`, `ThinkingReplaced`, and finally `Ready`. The owning
//! session drains them on the UI thread in that order.

use crate::message::ChatMessage;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Inline log line for the conversation view.
    Log(String),
    /// The model call is about to start; show the in-progress indicator.
    ThinkingStarted,
    /// Replace the in-progress indicator with the final (markdown) text.
    ThinkingReplaced(String),
    /// A finished turn to append to the session's history.
    TurnRecorded {
        user: ChatMessage,
        assistant: ChatMessage,
    },
    /// The send is over, whatever its outcome. Re-enables input.
    Ready,
}

impl SessionEvent {
    pub fn log(line: impl Into<String>) -> Self {
        SessionEvent::Log(line.into())
    }
}
