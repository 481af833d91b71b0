//! Toast board: short-lived status lines stacked in the top-right corner.
//!
//! Each toast belongs to a `Topic`.  Posting to a topic that is already on
//! the board replaces that line, so a flapping connection shows its latest
//! state instead of a growing stack.

use std::time::{Duration, Instant};

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use watchthis_sync::Feed;

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

const MAX_VISIBLE: usize = 4;

/// What a toast is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Connection,
    Feed(Feed),
    Recommendations,
    Selection,
    Clipboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Ok,
    Warn,
    Error,
}

impl Level {
    fn lifetime(self) -> Duration {
        match self {
            Level::Info | Level::Ok => Duration::from_secs(3),
            Level::Warn => Duration::from_secs(4),
            Level::Error => Duration::from_secs(6),
        }
    }

    fn style(self) -> (char, Style) {
        let (glyph, color) = match self {
            Level::Info => ('·', C_TOAST_INFO),
            Level::Ok => ('✓', C_TOAST_SUCCESS),
            Level::Warn => ('!', C_TOAST_WARNING),
            Level::Error => ('✗', C_TOAST_ERROR),
        };
        (glyph, Style::default().fg(color).add_modifier(Modifier::BOLD))
    }
}

struct Toast {
    topic: Topic,
    level: Level,
    text: String,
    until: Instant,
}

/// Newest toast last.
#[derive(Default)]
pub struct ToastBoard {
    toasts: Vec<Toast>,
}

impl ToastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, topic: Topic, level: Level, text: impl Into<String>) {
        self.post_for(topic, level, text.into(), level.lifetime());
    }

    fn post_for(&mut self, topic: Topic, level: Level, text: String, lifetime: Duration) {
        self.toasts.retain(|t| t.topic != topic);
        self.toasts.push(Toast {
            topic,
            level,
            text,
            until: Instant::now() + lifetime,
        });
        let overflow = self.toasts.len().saturating_sub(MAX_VISIBLE);
        self.toasts.drain(..overflow);
    }

    /// Drop expired toasts.  Returns true if the board changed.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let before = self.toasts.len();
        self.toasts.retain(|t| t.until > now);
        self.toasts.len() != before
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.toasts.is_empty() || area.width < 8 {
            return;
        }
        let lines: Vec<(String, Style)> = self
            .toasts
            .iter()
            .rev()
            .map(|t| {
                let (glyph, style) = t.level.style();
                (format!(" {} {} ", glyph, t.text), style)
            })
            .collect();

        let cap = (area.width / 2).clamp(30, 60).min(area.width - 1);
        let widest = lines.iter().map(|(s, _)| s.width()).max().unwrap_or(0) as u16;
        let width = widest.min(cap);
        let height = (lines.len() as u16).min(area.height.saturating_sub(1));
        let board = Rect {
            x: area.x + area.width - width - 1,
            y: area.y + 1,
            width,
            height,
        };

        frame.render_widget(Clear, board);
        let text: Vec<Line> = lines
            .into_iter()
            .map(|(s, style)| Line::styled(s, style))
            .collect();
        frame.render_widget(Paragraph::new(text).alignment(Alignment::Right), board);
    }
}
