//! MovieList: a catalog feed or the recommendations of the selection.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use watchthis_proto::movie::{Movie, MovieId};
use watchthis_sync::{Feed, View};

use crate::{
    action::{Action, ComponentId},
    component::Component,
    theme::{
        style_default, style_muted, style_selected, style_selected_focused, C_ACCENT,
        C_BADGE_ERR, C_BADGE_PENDING, C_RATING, C_YEAR,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Feed(Feed),
    Recommendations,
}

pub struct MovieList {
    source: ListSource,
    cursor: usize,
    state: ListState,
}

impl MovieList {
    pub fn for_feed(feed: Feed) -> Self {
        Self::new(ListSource::Feed(feed))
    }

    pub fn recommendations() -> Self {
        Self::new(ListSource::Recommendations)
    }

    fn new(source: ListSource) -> Self {
        Self {
            source,
            cursor: 0,
            state: ListState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        *self.state.offset_mut() = 0;
    }

    fn items<'v>(&self, view: &View<'v>) -> &'v [Movie] {
        match self.source {
            ListSource::Feed(Feed::Trending) => view.trending,
            ListSource::Feed(Feed::Popular) => view.popular,
            ListSource::Feed(Feed::Upcoming) => view.upcoming,
            ListSource::Recommendations => view.recommendations,
        }
    }

    fn title(&self, view: &View<'_>) -> String {
        match (self.source, view.selected) {
            (ListSource::Feed(feed), _) => feed.label().to_string(),
            (ListSource::Recommendations, Some(movie)) => format!("More like {}", movie.title),
            (ListSource::Recommendations, None) => "Recommended".to_string(),
        }
    }

    fn empty_message(&self, view: &View<'_>) -> String {
        match self.source {
            ListSource::Feed(_) if view.catalog_loading => "  loading…".into(),
            ListSource::Feed(_) => "  nothing here".into(),
            ListSource::Recommendations => match (view.selected, view.recommendation_error) {
                (None, _) => "  select a movie to see recommendations".into(),
                (Some(_), Some(err)) => format!("  {}", err),
                (Some(_), None) if view.recommendations_loading => "  finding similar movies…".into(),
                (Some(_), None) => "  no recommendations".into(),
            },
        }
    }

    fn badge(&self, view: &View<'_>) -> Option<Badge<'static>> {
        if self.source != ListSource::Recommendations {
            return None;
        }
        if view.recommendations_loading {
            Some(Badge {
                text: "…",
                color: C_BADGE_PENDING,
            })
        } else if view.recommendation_error.is_some() {
            Some(Badge {
                text: "ERR",
                color: C_BADGE_ERR,
            })
        } else {
            None
        }
    }

    fn render_row(movie: &Movie, width: usize, current: Option<MovieId>) -> Line<'static> {
        let marker = if current == Some(movie.id) { "● " } else { "  " };
        let year = movie
            .release_year()
            .map(|y| format!(" {}", y))
            .unwrap_or_default();
        let rating = movie
            .rating()
            .map(|r| format!(" ★{:.1}", r))
            .unwrap_or_default();
        let reserved = marker.width() + year.width() + rating.width();
        let title = fit(&movie.title, width.saturating_sub(reserved));
        Line::from(vec![
            Span::styled(marker, Style::default().fg(C_ACCENT)),
            Span::styled(title, style_default()),
            Span::styled(year, Style::default().fg(C_YEAR)),
            Span::styled(rating, Style::default().fg(C_RATING)),
        ])
    }
}

impl Component for MovieList {
    fn id(&self) -> ComponentId {
        match self.source {
            ListSource::Feed(_) => ComponentId::Catalog,
            ListSource::Recommendations => ComponentId::Recommendations,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, view: &View<'_>) -> Vec<Action> {
        let items = self.items(view);
        if items.is_empty() {
            return Vec::new();
        }
        let last = items.len() - 1;
        self.cursor = self.cursor.min(last);
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.cursor = (self.cursor + 1).min(last),
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::PageDown => self.cursor = (self.cursor + 10).min(last),
            KeyCode::PageUp => self.cursor = self.cursor.saturating_sub(10),
            KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor = last,
            KeyCode::Enter => return vec![Action::Select(items[self.cursor].clone())],
            _ => {}
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &View<'_>) {
        let number_key = match self.source {
            ListSource::Feed(feed) => Feed::ALL
                .iter()
                .position(|f| *f == feed)
                .and_then(|i| char::from_digit(i as u32 + 1, 10)),
            ListSource::Recommendations => None,
        };
        let title = self.title(view);
        let block = pane_chrome(&title, number_key, focused, self.badge(view));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let items = self.items(view);
        if items.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(self.empty_message(view), style_muted())),
                inner,
            );
            return;
        }

        self.cursor = self.cursor.min(items.len() - 1);
        let current = view.selected.map(|m| m.id);
        let width = inner.width as usize;
        let rows: Vec<ListItem> = items
            .iter()
            .map(|m| ListItem::new(Self::render_row(m, width, current)))
            .collect();
        let highlight = if focused {
            style_selected_focused()
        } else {
            style_selected()
        };
        let list = List::new(rows).highlight_style(highlight);
        self.state.select(Some(self.cursor));
        frame.render_stateful_widget(list, inner, &mut self.state);
    }
}

/// Truncate `text` to `width` terminal columns, ending in `…` when cut.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}
