//! SyncSession: single-owner loop over every synchronized slice.
//!
//! Each slice has exactly one writer:
//! - trending        → `MessageRouter` (seeded once by the catalog load)
//! - popular/upcoming → the catalog load
//! - recommendations → `RecommendationCoordinator`
//! - search          → `SearchSession`
//!
//! The front-end calls `next_event` / `handle` from its own loop and reads
//! the merged, borrowed [`View`].  Nothing outside this struct mutates the
//! slices.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use watchthis_proto::config::Config;
use watchthis_proto::movie::{CastMember, Movie, MovieDetails};
use watchthis_proto::protocol::new_session_id;

use crate::api::MovieApi;
use crate::catalog::CatalogLoader;
use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState, Detached, PushSink};
use crate::details::DetailsPanel;
use crate::event::SyncEvent;
use crate::recommend::{Channel, RecommendationCoordinator, Resolution};
use crate::router::{MessageRouter, StateUpdate};
use crate::search::{SearchKey, SearchSession, SearchStatus};

const EVENT_BUFFER: usize = 1024;

pub struct SyncSession {
    config: Config,
    session_id: String,
    api: Arc<dyn MovieApi>,
    connection: Option<ConnectionManager>,
    connection_rx: Option<mpsc::Receiver<ConnectionEvent>>,
    events_tx: mpsc::Sender<SyncEvent>,
    events_rx: mpsc::Receiver<SyncEvent>,
    router: MessageRouter,
    coordinator: RecommendationCoordinator,
    search: SearchSession,
    details: DetailsPanel,
    popular: Vec<Movie>,
    upcoming: Vec<Movie>,
    catalog_loading: bool,
}

/// Read-only merge of all slices, for rendering.
#[derive(Debug)]
pub struct View<'a> {
    pub connection: ConnectionState,
    pub catalog_loading: bool,
    pub trending: &'a [Movie],
    pub popular: &'a [Movie],
    pub upcoming: &'a [Movie],
    pub selected: Option<&'a Movie>,
    pub recommendations: &'a [Movie],
    pub recommendations_loading: bool,
    pub recommendations_resolved: bool,
    pub recommendation_error: Option<&'a str>,
    pub details: Option<&'a MovieDetails>,
    pub details_loading: bool,
    pub cast: &'a [CastMember],
    pub trailer_url: Option<String>,
    pub query: &'a str,
    pub search_results: &'a [Movie],
    pub search_cursor: Option<usize>,
    pub search_status: SearchStatus,
    pub search_error: Option<&'a str>,
}

impl SyncSession {
    /// Open the push channel (if enabled) and kick off the catalog load.
    /// Must be called from within a tokio runtime.
    pub fn start(config: Config, api: Arc<dyn MovieApi>) -> Self {
        let session_id = new_session_id();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let (connection, connection_rx) = if config.push.enabled {
            let (manager, rx) = ConnectionManager::open(
                &config.push.ws_url,
                &session_id,
                config.push.connect_timeout(),
            );
            (Some(manager), Some(rx))
        } else {
            info!("session: push channel disabled, request/response only");
            (None, None)
        };

        let loader_api = Arc::clone(&api);
        let loader_tx = events_tx.clone();
        tokio::spawn(async move {
            let catalog = CatalogLoader::load_all(loader_api.as_ref()).await;
            let _ = loader_tx.send(SyncEvent::CatalogLoaded(catalog)).await;
        });

        info!("session {} started", session_id);
        Self {
            coordinator: RecommendationCoordinator::new(
                Arc::clone(&api),
                events_tx.clone(),
                config.push.reply_timeout(),
            ),
            search: SearchSession::new(Arc::clone(&api), events_tx.clone(), config.search.clone()),
            details: DetailsPanel::new(),
            router: MessageRouter::new(),
            popular: Vec::new(),
            upcoming: Vec::new(),
            catalog_loading: true,
            config,
            session_id,
            api,
            connection,
            connection_rx,
            events_tx,
            events_rx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.push().state()
    }

    fn push(&self) -> &dyn PushSink {
        match &self.connection {
            Some(manager) => manager,
            None => &Detached,
        }
    }

    /// Next input for [`handle`](Self::handle).  Cancel-safe.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        tokio::select! {
            Some(ev) = recv_connection(&mut self.connection_rx) => Some(SyncEvent::Connection(ev)),
            Some(ev) = self.events_rx.recv() => Some(ev),
            else => None,
        }
    }

    /// Apply one event.  Returns true when the view changed.
    pub fn handle(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::Connection(ConnectionEvent::StateChanged(state)) => {
                info!("session: push channel {}", state);
                true
            }
            SyncEvent::Connection(ConnectionEvent::Message(msg)) => match self.router.dispatch(msg) {
                StateUpdate::TrendingReplaced { .. } => true,
                StateUpdate::Recommendations { movie_id, movies } => {
                    self.coordinator.on_push_result(movie_id, movies) == Resolution::Accepted
                }
                StateUpdate::Ignored { .. } => false,
            },
            SyncEvent::CatalogLoaded(catalog) => {
                self.router.seed_from_catalog(catalog.trending);
                self.popular = catalog.popular;
                self.upcoming = catalog.upcoming;
                self.catalog_loading = false;
                true
            }
            SyncEvent::Search(ev) => self.search.on_event(ev),
            SyncEvent::Recommendation(ev) => self.coordinator.on_event(ev) != Resolution::Rejected,
            SyncEvent::Details(loaded) => self.details.apply(*loaded),
        }
    }

    /// Select a movie: recommendations plus detail collaborators.
    pub fn select_movie(&mut self, movie: Movie) -> Channel {
        let movie_id = movie.id;
        let channel = match &self.connection {
            Some(manager) => self.coordinator.select(movie, manager),
            None => self.coordinator.select(movie, &Detached),
        };
        self.details.load(movie_id, Arc::clone(&self.api), self.events_tx.clone());
        channel
    }

    pub fn set_query(&mut self, text: &str) {
        self.search.set_query(text);
    }

    /// Forward a navigation key to the search session.  A committed result
    /// becomes the selection after the search state has been cleared.
    pub fn search_key(&mut self, key: SearchKey) -> Option<Movie> {
        let picked = self.search.handle_key(key)?;
        self.select_movie(picked.clone());
        Some(picked)
    }

    /// Click-equivalent of `Enter` on row `index`.
    pub fn pick_search_result(&mut self, index: usize) -> Option<Movie> {
        let picked = self.search.pick(index)?;
        self.select_movie(picked.clone());
        Some(picked)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    pub fn view(&self) -> View<'_> {
        let limit = self.config.catalog.display_limit;
        let top = |movies: &[Movie]| movies.len().min(limit);
        let trending = self.router.trending();
        let recommendations = self.coordinator.recommendations();
        View {
            connection: self.connection_state(),
            catalog_loading: self.catalog_loading,
            trending: &trending[..top(trending)],
            popular: &self.popular[..top(&self.popular)],
            upcoming: &self.upcoming[..top(&self.upcoming)],
            selected: self.coordinator.selected(),
            recommendations: &recommendations[..top(recommendations)],
            recommendations_loading: self.coordinator.is_loading(),
            recommendations_resolved: self.coordinator.is_resolved(),
            recommendation_error: self.coordinator.last_error(),
            details: self.details.details(),
            details_loading: self.details.is_loading(),
            cast: self.details.cast(),
            trailer_url: self.details.trailer_url(),
            query: self.search.query(),
            search_results: self.search.results(),
            search_cursor: self.search.cursor(),
            search_status: self.search.status(),
            search_error: self.search.last_error(),
        }
    }

    /// Tear down the push channel.  Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(manager) = self.connection.as_mut() {
            manager.close();
        }
        self.search.clear();
        debug!("session {} shut down", self.session_id);
    }
}

async fn recv_connection(
    rx: &mut Option<mpsc::Receiver<ConnectionEvent>>,
) -> Option<ConnectionEvent> {
    let Some(inner) = rx.as_mut() else {
        return std::future::pending().await;
    };
    let ev = inner.recv().await;
    if ev.is_none() {
        *rx = None;
    }
    ev
}
