//! The view a session renders into.

use shared::PastedImage;

/// Rendering surface of one chat tab.
///
/// Implementations are driven from the UI thread only. `display` appends a
/// plain log line; `replace_in_progress` swaps the "thinking" indicator for
/// the final reply, rendered as markdown.
pub trait ChatSurface {
    fn display(&mut self, text: &str);
    fn display_markdown(&mut self, text: &str);
    fn show_in_progress(&mut self);
    fn replace_in_progress(&mut self, text: &str);
    fn set_input_enabled(&mut self, enabled: bool);
    /// Return the trimmed input text and clear the input field.
    fn take_input_text(&mut self) -> String;
    fn clear_output(&mut self);

    // Attachment preview
    fn clear_attachments(&mut self);
    /// `thumbnail` is already scaled to the preview box.
    fn add_image(&mut self, thumbnail: &PastedImage, label: &str);
    fn add_reference(&mut self, label: &str);
}
