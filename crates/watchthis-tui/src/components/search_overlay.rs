//! SearchOverlay: popup with the query prompt and live results.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use watchthis_sync::{SearchStatus, View};

use crate::{
    action::{Action, ComponentId},
    component::Component,
    components::movie_list::fit,
    theme::{
        style_default, style_muted, style_secondary, style_selected_focused, C_BADGE_ERR,
        C_BADGE_PENDING, C_YEAR,
    },
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        query_input::{QueryAction, QueryInput},
    },
};

#[derive(Default)]
pub struct SearchOverlay {
    input: QueryInput,
    pub visible: bool,
}

impl SearchOverlay {
    pub fn open(&mut self) {
        self.visible = true;
    }

    /// Hide and forget the typed text.
    pub fn close(&mut self) {
        self.visible = false;
        self.input.clear();
    }

    fn status_line(view: &View<'_>) -> Option<String> {
        match view.search_status {
            SearchStatus::Idle => Some("type at least a couple of characters".into()),
            SearchStatus::Pending | SearchStatus::Searching => Some("searching…".into()),
            SearchStatus::NoResults => Some(format!("no results for {:?}", view.query)),
            SearchStatus::Failed => Some(format!(
                "search failed: {}",
                view.search_error.unwrap_or("unknown error")
            )),
            SearchStatus::Results => None,
        }
    }
}

impl Component for SearchOverlay {
    fn id(&self) -> ComponentId {
        ComponentId::Search
    }

    fn handle_key(&mut self, key: KeyEvent, _view: &View<'_>) -> Vec<Action> {
        match self.input.handle_key(key) {
            QueryAction::Changed(text) => vec![Action::QueryChanged(text)],
            QueryAction::Navigate(k) => vec![Action::SearchKey(k)],
            QueryAction::None => Vec::new(),
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &View<'_>) {
        let popup = centered(area, 70, 16);
        frame.render_widget(Clear, popup);

        let badge = match view.search_status {
            SearchStatus::Pending | SearchStatus::Searching => Some(Badge {
                text: "…",
                color: C_BADGE_PENDING,
            }),
            SearchStatus::Failed => Some(Badge {
                text: "ERR",
                color: C_BADGE_ERR,
            }),
            _ => None,
        };
        let block = pane_chrome("search", None, focused, badge);
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(0)])
            .split(inner);
        self.input.draw(frame, rows[0], focused);

        // A failed lookup keeps the previous results on screen under the error.
        if let Some(status) = Self::status_line(view) {
            frame.render_widget(Paragraph::new(Span::styled(status, style_muted())), rows[1]);
        } else {
            let count = format!("{} results", view.search_results.len());
            frame.render_widget(Paragraph::new(Span::styled(count, style_secondary())), rows[1]);
        }

        let width = rows[2].width as usize;
        let items: Vec<ListItem> = view
            .search_results
            .iter()
            .map(|m| {
                let year = m.release_year().map(|y| format!(" {}", y)).unwrap_or_default();
                let title = fit(&m.title, width.saturating_sub(year.len() + 1));
                ListItem::new(Line::from(vec![
                    Span::styled(format!(" {}", title), style_default()),
                    Span::styled(year, Style::default().fg(C_YEAR)),
                ]))
            })
            .collect();
        let mut state = ListState::default().with_selected(view.search_cursor);
        let list = List::new(items).highlight_style(style_selected_focused());
        frame.render_stateful_widget(list, rows[2], &mut state);
    }
}

fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = ((area.width as u32 * percent_x as u32 / 100) as u16).max(20).min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 3,
        width,
        height,
    }
}
