//! App: terminal event loop around a `SyncSession`.
//!
//! Architecture:
//! - `App` owns the session and all components.
//! - A blocking task forwards terminal events over an mpsc channel.
//! - The loop selects over terminal input, session events and a UI tick,
//!   and redraws only when something changed.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use watchthis_proto::movie::Movie;
use watchthis_sync::connection::ConnectionEvent;
use watchthis_sync::{ConnectionState, Feed, SearchKey, SyncEvent, SyncSession};

use crate::{
    action::{next_feed, prev_feed, Action, ComponentId},
    component::Component,
    components::{details_pane, movie_list::MovieList, search_overlay::SearchOverlay},
    theme::C_BG,
    widgets::{
        status_bar::{self, InputMode},
        toast::{Level, ToastBoard, Topic},
    },
};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub struct App {
    session: SyncSession,
    tab: Feed,
    focus: ComponentId,
    /// One list per catalog feed, in `Feed::ALL` order.
    catalog: Vec<MovieList>,
    recommendations: MovieList,
    search: SearchOverlay,
    toast: ToastBoard,
    last_rec_error: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(session: SyncSession) -> Self {
        Self {
            session,
            tab: Feed::Trending,
            focus: ComponentId::Catalog,
            catalog: Feed::ALL.iter().copied().map(MovieList::for_feed).collect(),
            recommendations: MovieList::recommendations(),
            search: SearchOverlay::default(),
            toast: ToastBoard::new(),
            last_rec_error: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let (input_tx, mut input_rx) = mpsc::channel::<Event>(256);
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if input_tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        let result = self.event_loop(&mut terminal, &mut input_rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        self.session.shutdown();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("watchthis exiting");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Term,
        input: &mut mpsc::Receiver<Event>,
    ) -> anyhow::Result<()> {
        // Toast expiry.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(250));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                return Ok(());
            }

            tokio::select! {
                Some(ev) = input.recv() => {
                    needs_redraw = self.handle_terminal_event(ev);
                }
                Some(ev) = self.session.next_event() => {
                    needs_redraw = self.handle_sync_event(ev);
                }
                _ = ui_tick.tick() => {
                    needs_redraw = self.toast.tick();
                }
            }
        }
    }

    // ── Session events ────────────────────────────────────────────────────────

    fn handle_sync_event(&mut self, ev: SyncEvent) -> bool {
        match &ev {
            SyncEvent::Connection(ConnectionEvent::StateChanged(state)) => match state {
                ConnectionState::Open => {
                    self.toast.post(Topic::Connection, Level::Ok, "live updates on")
                }
                ConnectionState::Failed => {
                    self.toast.post(
                        Topic::Connection,
                        Level::Warn,
                        "live updates unavailable, using requests",
                    )
                }
                ConnectionState::Closed if !self.should_quit => {
                    self.toast.post(Topic::Connection, Level::Info, "live updates closed")
                }
                _ => {}
            },
            SyncEvent::CatalogLoaded(catalog) => {
                for (feed, reason) in &catalog.failures {
                    warn!("app: {} feed failed: {}", feed.label(), reason);
                    let text = format!("{} unavailable", feed.label());
                    self.toast.post(Topic::Feed(*feed), Level::Warn, text);
                }
            }
            _ => {}
        }

        let changed = self.session.handle(ev);

        let error = self.session.view().recommendation_error.map(str::to_string);
        if error != self.last_rec_error {
            if let Some(e) = &error {
                let text = format!("recommendations: {}", e);
                self.toast.post(Topic::Recommendations, Level::Error, text);
            }
            self.last_rec_error = error;
        }
        changed
    }

    // ── Terminal events ───────────────────────────────────────────────────────

    fn handle_terminal_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                for action in self.handle_key(key) {
                    self.dispatch(action);
                }
                true
            }
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        let view = self.session.view();

        // Search overlay captures all keys while open.
        if self.search.visible {
            return self.search.handle_key(key, &view);
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('/') => return vec![Action::OpenSearch],
            KeyCode::Char('y') => return vec![Action::CopyTrailer],
            KeyCode::Tab | KeyCode::BackTab => return vec![Action::FocusNext],
            KeyCode::Left | KeyCode::Char('h') => return vec![Action::PrevTab],
            KeyCode::Right | KeyCode::Char('l') => return vec![Action::NextTab],
            KeyCode::Char(c @ '1'..='3') => {
                let i = c as usize - '1' as usize;
                return vec![Action::SwitchTab(Feed::ALL[i])];
            }
            _ => {}
        }

        let tab = tab_index(self.tab);
        let list = match self.focus {
            ComponentId::Recommendations => &mut self.recommendations,
            _ => &mut self.catalog[tab],
        };
        list.handle_key(key, &view)
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.session.shutdown();
                self.should_quit = true;
            }
            Action::SwitchTab(feed) => {
                self.tab = feed;
                self.focus = ComponentId::Catalog;
            }
            Action::NextTab => self.tab = next_feed(self.tab),
            Action::PrevTab => self.tab = prev_feed(self.tab),
            Action::FocusNext => {
                self.focus = match self.focus {
                    ComponentId::Catalog => ComponentId::Recommendations,
                    _ => ComponentId::Catalog,
                };
            }
            Action::Select(movie) => self.select(movie),
            Action::OpenSearch => self.search.open(),
            Action::QueryChanged(query) => self.session.set_query(&query),
            Action::SearchKey(SearchKey::Escape) => {
                self.session.search_key(SearchKey::Escape);
                self.search.close();
            }
            Action::SearchKey(key) => {
                if let Some(movie) = self.session.search_key(key) {
                    self.search.close();
                    self.after_select(&movie);
                }
            }
            Action::CopyTrailer => self.copy_trailer(),
        }
    }

    fn select(&mut self, movie: Movie) {
        let title = movie.title.clone();
        let channel = self.session.select_movie(movie);
        debug!("app: selected {:?} via {:?}", title, channel);
        self.recommendations.reset();
        self.toast.post(Topic::Selection, Level::Info, format!("selected {}", title));
    }

    fn after_select(&mut self, movie: &Movie) {
        self.recommendations.reset();
        self.toast.post(Topic::Selection, Level::Info, format!("selected {}", movie.title));
    }

    fn copy_trailer(&mut self) {
        let Some(url) = self.session.view().trailer_url else {
            self.toast.post(Topic::Clipboard, Level::Warn, "no trailer for this movie");
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(url.clone())) {
            Ok(()) => self.toast.post(Topic::Clipboard, Level::Ok, format!("copied: {}", url)),
            Err(e) => {
                warn!("clipboard: {}", e);
                self.toast.post(Topic::Clipboard, Level::Error, format!("clipboard: {}", e));
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let tab = tab_index(self.tab);
        let mode = if self.search.visible {
            InputMode::Search
        } else {
            InputMode::Normal
        };
        let view = self.session.view();

        status_bar::draw_header(frame, outer[0], self.tab, view.connection, view.catalog_loading);
        status_bar::draw_separator(frame, outer[1]);
        status_bar::draw_keys_bar(frame, outer[3], mode);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(outer[2]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(body[1]);

        let catalog_focused = !self.search.visible && self.focus == self.catalog[tab].id();
        let recs_focused = !self.search.visible && self.focus == self.recommendations.id();
        self.catalog[tab].draw(frame, body[0], catalog_focused, &view);
        details_pane::draw(frame, right[0], &view);
        self.recommendations.draw(frame, right[1], recs_focused, &view);

        if self.search.visible {
            self.search.draw(frame, area, true, &view);
        }

        self.toast.draw(frame, area);
    }
}

fn tab_index(feed: Feed) -> usize {
    Feed::ALL.iter().position(|f| *f == feed).unwrap_or(0)
}
