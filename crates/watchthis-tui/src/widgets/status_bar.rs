//! Header and footer strips: catalog tabs, push-channel badge, key hints.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use watchthis_sync::{ConnectionState, Feed};

use crate::theme::{
    C_ACCENT, C_BADGE_ERR, C_BADGE_LIVE, C_BADGE_PENDING, C_MODE_NORMAL, C_MODE_SEARCH, C_MUTED,
    C_PRIMARY, C_SECONDARY, C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Search,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "BROWSE",
            Self::Search => "SEARCH",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Search => C_MODE_SEARCH,
        }
    }
}

/// Badge text and colour for the push channel.
pub fn connection_badge(state: ConnectionState) -> (&'static str, Color) {
    match state {
        ConnectionState::Connecting => ("CONNECTING", C_BADGE_PENDING),
        ConnectionState::Open => ("LIVE", C_BADGE_LIVE),
        ConnectionState::Closed => ("OFFLINE", C_MUTED),
        ConnectionState::Failed => ("ERR", C_BADGE_ERR),
    }
}

/// Top line: app name, catalog tabs, connection badge on the right.
pub fn draw_header(
    frame: &mut Frame,
    area: Rect,
    active: Feed,
    connection: ConnectionState,
    loading: bool,
) {
    let mut spans = vec![Span::styled(
        " watchthis ",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];
    for (i, feed) in Feed::ALL.iter().enumerate() {
        let style = if *feed == active {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("{} {}", i + 1, feed.label()), style));
    }
    if loading {
        spans.push(Span::styled("  loading…", Style::default().fg(C_MUTED)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let (text, color) = connection_badge(connection);
    let badge = Line::from(Span::styled(
        format!("● {} ", text),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
    .right_aligned();
    frame.render_widget(Paragraph::new(badge), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let keys = match mode {
        InputMode::Normal => {
            " ↑↓/jk move  Enter select  ←→/1-3 tabs  Tab pane  / search  y copy trailer  q quit"
        }
        InputMode::Search => " type to search  ↑↓ move  Enter select  Esc close",
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default().fg(mode.color()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
