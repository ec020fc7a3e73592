pub mod attachment;
pub mod events;
pub mod message;
pub mod persona;
pub mod settings;

pub use attachment::{Attachment, AttachmentKind, ImageSource, PastedImage, PendingAttachments};
pub use events::SessionEvent;
pub use message::{ChatMessage, Role};
pub use persona::{Persona, PersonaState};
pub use settings::{ChatConfig, ChatMode, ModelChoice};
