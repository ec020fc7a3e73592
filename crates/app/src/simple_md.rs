//! Lightweight markdown renderer for model replies.
//!
//! Covers the subset local models actually emit: headings, bullet and
//! numbered lists, fenced code blocks, `**bold**`, `` `code` `` and
//! `[text](url)` links. Everything else is shown as plain text.

use eframe::egui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    Heading { level: u8, text: &'a str },
    Bullet(&'a str),
    Numbered { marker: &'a str, text: &'a str },
    Code { lang: &'a str, lines: Vec<&'a str> },
    Paragraph(&'a str),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Bold(&'a str),
    Code(&'a str),
    Link { text: &'a str, url: &'a str },
}

/// Split reply text into blocks. An unterminated fence runs to the end.
pub fn parse_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(lang) = trimmed.strip_prefix("```") {
            let mut body = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                body.push(inner);
            }
            blocks.push(Block::Code {
                lang: lang.trim(),
                lines: body,
            });
            continue;
        }

        if trimmed.is_empty() {
            blocks.push(Block::Blank);
            continue;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=4).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
            blocks.push(Block::Heading {
                level: hashes as u8,
                text: trimmed[hashes..].trim(),
            });
            continue;
        }

        if let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            blocks.push(Block::Bullet(rest));
            continue;
        }

        let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 && trimmed[digits..].starts_with(". ") {
            blocks.push(Block::Numbered {
                marker: &trimmed[..digits + 1],
                text: &trimmed[digits + 2..],
            });
            continue;
        }

        blocks.push(Block::Paragraph(trimmed));
    }
    blocks
}

/// Split one line into inline spans. Unclosed markers stay literal.
pub fn parse_inline(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some((pos, marker)) = next_marker(rest) else {
            spans.push(Span::Text(rest));
            break;
        };
        if pos > 0 {
            spans.push(Span::Text(&rest[..pos]));
        }
        let after = &rest[pos..];
        let consumed = match marker {
            Marker::Bold => after[2..].find("**").map(|end| {
                spans.push(Span::Bold(&after[2..2 + end]));
                end + 4
            }),
            Marker::Code => after[1..].find('`').map(|end| {
                spans.push(Span::Code(&after[1..1 + end]));
                end + 2
            }),
            Marker::Link => after.find("](").and_then(|mid| {
                after[mid + 2..].find(')').map(|close| {
                    spans.push(Span::Link {
                        text: &after[1..mid],
                        url: &after[mid + 2..mid + 2 + close],
                    });
                    mid + 2 + close + 1
                })
            }),
        };
        match consumed {
            Some(n) => rest = &after[n..],
            None => {
                spans.push(Span::Text(after));
                break;
            }
        }
    }
    spans
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Bold,
    Code,
    Link,
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
    let candidates = [
        text.find("**").map(|p| (p, Marker::Bold)),
        text.find('`').map(|p| (p, Marker::Code)),
        text.find('[')
            .filter(|p| text[*p..].contains("]("))
            .map(|p| (p, Marker::Link)),
    ];
    candidates.into_iter().flatten().min_by_key(|(p, _)| *p)
}

/// Render markdown text into an egui UI region.
pub fn render_markdown(ui: &mut egui::Ui, text: &str, base_color: egui::Color32) {
    let code_bg = if base_color.r() > 128 {
        egui::Color32::from_rgb(45, 45, 52)
    } else {
        egui::Color32::from_rgb(232, 234, 238)
    };

    for block in parse_blocks(text) {
        match block {
            Block::Blank => ui.add_space(6.0),
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 18.0,
                    2 => 16.0,
                    3 => 15.0,
                    _ => 14.0,
                };
                ui.add_space(4.0);
                ui.label(egui::RichText::new(text).strong().size(size).color(base_color));
            }
            Block::Bullet(text) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new("  •  ").color(base_color));
                    render_inline(ui, text, base_color, code_bg);
                });
            }
            Block::Numbered { marker, text } => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new(format!("  {} ", marker)).color(base_color));
                    render_inline(ui, text, base_color, code_bg);
                });
            }
            Block::Code { lang, lines } => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(6.0))
                    .inner_margin(egui::Margin::same(8.0))
                    .show(ui, |ui| {
                        if !lang.is_empty() {
                            ui.label(egui::RichText::new(lang).small().weak());
                        }
                        ui.label(
                            egui::RichText::new(lines.join("\n"))
                                .monospace()
                                .color(base_color),
                        );
                    });
            }
            Block::Paragraph(text) => {
                ui.horizontal_wrapped(|ui| render_inline(ui, text, base_color, code_bg));
            }
        }
    }
}

fn render_inline(ui: &mut egui::Ui, text: &str, base_color: egui::Color32, code_bg: egui::Color32) {
    let link_color = egui::Color32::from_rgb(100, 170, 240);
    ui.spacing_mut().item_spacing.x = 0.0;

    for span in parse_inline(text) {
        match span {
            Span::Text(t) => {
                ui.label(egui::RichText::new(t).color(base_color));
            }
            Span::Bold(t) => {
                ui.label(egui::RichText::new(t).strong().color(base_color));
            }
            Span::Code(t) => {
                egui::Frame::none()
                    .fill(code_bg)
                    .rounding(egui::Rounding::same(3.0))
                    .inner_margin(egui::Margin::symmetric(4.0, 1.0))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(t).monospace().color(base_color));
                    });
            }
            Span::Link { text, url } => {
                ui.add(egui::Hyperlink::from_label_and_url(
                    egui::RichText::new(text).color(link_color).underline(),
                    url,
                ))
                .on_hover_text(url);
            }
        }
    }
}
