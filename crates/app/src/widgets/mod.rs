//! Reusable widgets for the application.

pub mod drag_drop;

pub use drag_drop::DropZone;
