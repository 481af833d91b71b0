//! DetailsPane: full record, cast and trailer of the selected movie.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use watchthis_sync::View;

use crate::theme::{style_muted, style_secondary, C_GENRE, C_PRIMARY, C_RATING, C_YEAR};
use crate::widgets::pane_chrome::pane_chrome;

pub fn draw(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let block = pane_chrome("Details", None, false, None);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(movie) = view.selected else {
        frame.render_widget(
            Paragraph::new(Span::styled("  nothing selected", style_muted())),
            inner,
        );
        return;
    };

    let mut lines = vec![Line::from(Span::styled(
        movie.title.clone(),
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
    ))];

    let mut facts = Vec::new();
    if let Some(year) = movie.release_year() {
        facts.push(Span::styled(year.to_string(), Style::default().fg(C_YEAR)));
    }
    if let Some(rating) = movie.rating() {
        facts.push(Span::styled(format!("★ {:.1}", rating), Style::default().fg(C_RATING)));
    }
    let details = view.details.filter(|d| d.id == movie.id);
    if let Some(runtime) = details.and_then(|d| d.runtime_label()) {
        facts.push(Span::styled(runtime, style_secondary()));
    }
    if let Some(genres) = details.map(|d| d.genre_names()).filter(|g| !g.is_empty()) {
        facts.push(Span::styled(genres.join(", "), Style::default().fg(C_GENRE)));
    }
    if !facts.is_empty() {
        let mut spans = Vec::new();
        for (i, span) in facts.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ·  ", style_muted()));
            }
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    if let Some(tagline) = details.and_then(|d| d.tagline.as_deref()).filter(|t| !t.is_empty()) {
        lines.push(Line::from(Span::styled(
            tagline.to_string(),
            style_secondary().add_modifier(Modifier::ITALIC),
        )));
    }
    lines.push(Line::raw(""));

    let overview = details
        .and_then(|d| d.overview.as_deref())
        .unwrap_or_else(|| movie.overview_text());
    if !overview.is_empty() {
        lines.push(Line::raw(overview.to_string()));
        lines.push(Line::raw(""));
    }

    if view.details_loading {
        lines.push(Line::from(Span::styled("loading details…", style_muted())));
    } else {
        if !view.cast.is_empty() {
            let names: Vec<String> = view
                .cast
                .iter()
                .map(|c| match c.character.as_deref() {
                    Some(role) if !role.is_empty() => format!("{} ({})", c.name, role),
                    _ => c.name.clone(),
                })
                .collect();
            lines.push(Line::from(vec![
                Span::styled("Cast  ", style_secondary()),
                Span::raw(names.join(", ")),
            ]));
        }
        if let Some(url) = &view.trailer_url {
            lines.push(Line::from(vec![
                Span::styled("Trailer  ", style_secondary()),
                Span::raw(url.clone()),
                Span::styled("  (y to copy)", style_muted()),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}
