use std::io::{self, Stdout};

use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use tracing::trace;
use unicode_width::UnicodeWidthChar;

use crate::editor::EditorState;
use crate::pane::Frame;

/// Seam to the rendering collaborator: one call per event-loop turn with
/// quiescent editor state.
pub trait Render {
    fn draw(&mut self, state: &EditorState) -> io::Result<()>;
}

/// Minimal terminal renderer: each leaf pane paints its buffer's visible
/// lines inside its computed frame, and the terminal cursor lands on the
/// active buffer's cursor. Styling and wrapping belong to the full
/// styling engine outside the core.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalRenderer {
    pub fn new(stdout: Stdout) -> io::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Render for TerminalRenderer {
    fn draw(&mut self, state: &EditorState) -> io::Result<()> {
        trace!("redraw");
        let mut panes = Vec::new();
        for (id, leaf) in state.pane_tree.leaves() {
            let Ok(frame) = state.pane_tree.frame(id, state.root_frame) else {
                continue;
            };
            if frame.rows == 0 || frame.cols == 0 {
                continue;
            }
            let Ok(buffer) = state.buffer(leaf.buffer_id) else {
                continue;
            };

            let mut lines = Vec::new();
            for row in 0..frame.rows {
                let line = usize::from(leaf.top_line) + usize::from(row);
                let text = buffer.line_content(line).unwrap_or_default();
                lines.push(Line::raw(clip_to_width(
                    &text,
                    frame.cols,
                    state.options.tab_width,
                )));
            }
            panes.push((frame_rect(frame), lines));
        }

        let cursor = active_cursor_position(state);
        self.terminal.draw(|ui| {
            let area = ui.area();
            for (rect, lines) in panes {
                let rect = rect.intersection(area);
                if rect.width == 0 || rect.height == 0 {
                    continue;
                }
                ui.render_widget(Paragraph::new(lines), rect);
            }
            if let Some(position) = cursor {
                ui.set_cursor_position(position);
            }
        })?;
        Ok(())
    }
}

fn frame_rect(frame: Frame) -> Rect {
    Rect {
        x: frame.x,
        y: frame.y,
        width: frame.cols,
        height: frame.rows,
    }
}

fn clip_to_width(text: &str, cols: u16, tab_width: u16) -> String {
    let mut out = String::new();
    let mut used = 0u16;
    for ch in text.chars() {
        let width = if ch == '\t' {
            tab_width.max(1)
        } else {
            ch.width().unwrap_or(0) as u16
        };
        if used + width > cols {
            break;
        }
        if ch == '\t' {
            for _ in 0..width {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
        used += width;
    }
    out
}

/// Terminal cell of the active buffer's cursor, if it is inside the
/// active pane's frame.
fn active_cursor_position(state: &EditorState) -> Option<(u16, u16)> {
    let pane_id = state.active_pane;
    let leaf_top = state.pane_tree.top_line(pane_id).ok()??;
    let frame = state.pane_tree.frame(pane_id, state.root_frame).ok()?;
    let buffer_id = state.pane_tree.buffer_of(pane_id).ok()??;
    let buffer = state.buffer(buffer_id).ok()?;

    let line = buffer.cursor_line();
    let row = line.checked_sub(usize::from(leaf_top))?;
    if row >= usize::from(frame.rows) {
        return None;
    }

    let line_start = buffer.line_start(line)?;
    let line_text = buffer.line_content(line)?;
    let prefix_len = buffer
        .cursor()
        .saturating_sub(line_start)
        .min(line_text.len());
    let prefix = &line_text[..prefix_len];
    let mut col = 0u16;
    for ch in prefix.chars() {
        col += if ch == '\t' {
            state.options.tab_width.max(1)
        } else {
            ch.width().unwrap_or(0) as u16
        };
    }
    if col >= frame.cols {
        return None;
    }
    Some((frame.x + col, frame.y + row as u16))
}
