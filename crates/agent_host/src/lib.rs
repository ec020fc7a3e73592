//! Agent Host - chat sessions against a local model service
//!
//! This crate provides the non-UI half of the chat client:
//! - Reply validation and the retrying call executor
//! - Attachment classification and file readers
//! - Per-tab session controllers and the manager that owns them

pub mod attachments;
pub mod clipboard;
pub mod executor;
pub mod manager;
pub mod readers;
pub mod session;
pub mod surface;
pub mod turn;
pub mod validator;

#[cfg(test)]
mod testing;

pub use attachments::AttachSource;
pub use clipboard::ClipboardFileProvider;
pub use executor::{gpu_backend_name, CallExecutor, CallOutcome};
pub use manager::{ManagerStatus, SessionManager};
pub use readers::{FileReader, FsReader, ReadError};
pub use session::{PasteOutcome, SendOutcome, SessionController};
pub use surface::ChatSurface;
pub use turn::TurnDeps;
pub use validator::Validator;
