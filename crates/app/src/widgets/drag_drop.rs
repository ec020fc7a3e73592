//! Window-wide file drop target.
//!
//! egui reports hovered and dropped files on the raw input of the frame;
//! this collects them and paints an overlay while files hover the window.

use egui::{Context, Id, Rect, Vec2};
use std::path::PathBuf;

pub struct DropZone {
    dropped: Vec<PathBuf>,
    hovering: bool,
    id: Id,
}

impl DropZone {
    pub fn new(id: impl std::hash::Hash) -> Self {
        Self {
            dropped: Vec::new(),
            hovering: false,
            id: Id::new(id),
        }
    }

    /// Capture this frame's hover state and dropped files.
    pub fn update(&mut self, ctx: &Context) {
        ctx.input(|i| {
            self.hovering = !i.raw.hovered_files.is_empty();
            self.dropped
                .extend(i.raw.dropped_files.iter().filter_map(|f| f.path.clone()));
        });
    }

    /// Take and clear the dropped paths.
    pub fn take_dropped(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.dropped)
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// Dim the window and show where the files will go.
    pub fn show_overlay(&self, ctx: &Context, target: &str) {
        if !self.hovering {
            return;
        }

        egui::Area::new(self.id.with("overlay"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                let screen_rect = ctx.screen_rect();
                ui.painter()
                    .rect_filled(screen_rect, 0.0, egui::Color32::from_black_alpha(100));

                let indicator = Rect::from_center_size(screen_rect.center(), Vec2::new(320.0, 120.0));
                ui.painter().rect(
                    indicator,
                    8.0,
                    ui.visuals().extreme_bg_color,
                    egui::Stroke::new(3.0, ui.visuals().selection.bg_fill),
                );
                ui.painter().text(
                    indicator.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("Drop files to attach to {}", target),
                    egui::FontId::proportional(17.0),
                    ui.visuals().strong_text_color(),
                );
            });
    }
}
