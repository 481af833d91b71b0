//! QueryInput: wraps tui-input for the search prompt.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use watchthis_sync::SearchKey;

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, PartialEq)]
pub enum QueryAction {
    /// The text changed; carries the full new value.
    Changed(String),
    /// A navigation key for the result list.
    Navigate(SearchKey),
    /// Cursor movement or a no-op edit.
    None,
}

pub struct QueryInput {
    input: Input,
    placeholder: String,
}

impl QueryInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> QueryAction {
        match key.code {
            KeyCode::Esc => QueryAction::Navigate(SearchKey::Escape),
            KeyCode::Enter => QueryAction::Navigate(SearchKey::Enter),
            KeyCode::Down => QueryAction::Navigate(SearchKey::Down),
            KeyCode::Up => QueryAction::Navigate(SearchKey::Up),
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() != before {
                    QueryAction::Changed(self.input.value().to_string())
                } else {
                    QueryAction::None
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, active: bool) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(format!("/ {}", self.placeholder), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", visible), Style::default().fg(C_FILTER_FG))
        };
        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if active && area.width > 0 {
            let cursor_x = area.x + 2 + self.input.visual_cursor().saturating_sub(scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for QueryInput {
    fn default() -> Self {
        Self::new("search movies...")
    }
}
