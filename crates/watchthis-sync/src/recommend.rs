//! RecommendationCoordinator: one recommendation fetch per selection.
//!
//! Per selection:
//! ```text
//!   Idle ──select──▶ AwaitingResult ──accepted / failed / timed out──▶ Idle
//! ```
//! The channel is chosen once, at `select`, from the push sink's current
//! state: `Open` sends `get_recommendations` over the socket, anything else
//! issues one request/response call.  There is no switch-over afterwards.
//!
//! Staleness is decided when a result arrives, never when it is requested:
//! a result is accepted only if it answers the movie that is selected *now*
//! on the channel that selection used.  Everything else is dropped without
//! touching state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use watchthis_proto::movie::{Movie, MovieId};
use watchthis_proto::protocol::OutboundMessage;

use crate::api::MovieApi;
use crate::connection::{ConnectionState, PushSink};
use crate::error::SyncResult;
use crate::event::SyncEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Push,
    Request,
}

#[derive(Debug)]
pub enum RecommendationEvent {
    /// Request/response call finished.
    Fetched {
        ticket: u64,
        movie_id: MovieId,
        result: SyncResult<Vec<Movie>>,
    },
    /// No push reply within the configured window.
    ReplyTimedOut { ticket: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Awaiting {
        ticket: u64,
        movie_id: MovieId,
        channel: Channel,
    },
}

pub struct RecommendationCoordinator {
    api: Arc<dyn MovieApi>,
    events: mpsc::Sender<SyncEvent>,
    reply_timeout: Duration,
    selected: Option<Movie>,
    phase: Phase,
    /// Bumped on every selection.
    ticket: u64,
    recommendations: Vec<Movie>,
    /// A result was accepted for the current selection.
    resolved: bool,
    last_error: Option<String>,
    reply_timer: Option<JoinHandle<()>>,
}

impl RecommendationCoordinator {
    pub fn new(
        api: Arc<dyn MovieApi>,
        events: mpsc::Sender<SyncEvent>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            api,
            events,
            reply_timeout,
            selected: None,
            phase: Phase::Idle,
            ticket: 0,
            recommendations: Vec::new(),
            resolved: false,
            last_error: None,
            reply_timer: None,
        }
    }

    pub fn selected(&self) -> Option<&Movie> {
        self.selected.as_ref()
    }

    pub fn recommendations(&self) -> &[Movie] {
        &self.recommendations
    }

    /// True exactly while the current selection awaits its result.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Awaiting { .. })
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Channel of the outstanding request, if any.
    pub fn pending_channel(&self) -> Option<Channel> {
        match self.phase {
            Phase::Awaiting { channel, .. } => Some(channel),
            Phase::Idle => None,
        }
    }

    /// Make `movie` the selection and start fetching its recommendations.
    /// Whatever was in flight for the previous selection becomes stale.
    pub fn select(&mut self, movie: Movie, push: &dyn PushSink) -> Channel {
        self.ticket += 1;
        let ticket = self.ticket;
        let movie_id = movie.id;
        self.cancel_reply_timer();
        self.selected = Some(movie);
        self.recommendations.clear();
        self.resolved = false;
        self.last_error = None;

        let via_push = push.state() == ConnectionState::Open
            && push
                .send(&OutboundMessage::GetRecommendations { movie_id })
                .is_sent();

        let channel = if via_push {
            self.arm_reply_timer(ticket);
            Channel::Push
        } else {
            self.spawn_fetch(ticket, movie_id);
            Channel::Request
        };
        info!("recommendations: #{} for movie {} via {:?}", ticket, movie_id, channel);
        self.phase = Phase::Awaiting {
            ticket,
            movie_id,
            channel,
        };
        channel
    }

    /// A `recommendations` frame arrived on the push channel.
    pub fn on_push_result(&mut self, movie_id: Option<MovieId>, movies: Vec<Movie>) -> Resolution {
        let current = self.selected.as_ref().map(|m| m.id);
        match self.phase {
            Phase::Awaiting {
                movie_id: awaited,
                channel: Channel::Push,
                ..
            } if current == Some(awaited) && movie_id.map_or(true, |id| id == awaited) => {
                self.accept(movies)
            }
            _ => {
                debug!(
                    "recommendations: dropping push result for {:?} (selected {:?}, {:?})",
                    movie_id, current, self.phase
                );
                Resolution::Rejected
            }
        }
    }

    pub fn on_event(&mut self, event: RecommendationEvent) -> Resolution {
        match event {
            RecommendationEvent::Fetched {
                ticket,
                movie_id,
                result,
            } => self.on_fetched(ticket, movie_id, result),
            RecommendationEvent::ReplyTimedOut { ticket } => self.on_reply_timeout(ticket),
        }
    }

    fn on_fetched(
        &mut self,
        ticket: u64,
        movie_id: MovieId,
        result: SyncResult<Vec<Movie>>,
    ) -> Resolution {
        let current = self.selected.as_ref().map(|m| m.id);
        let live = matches!(
            self.phase,
            Phase::Awaiting { ticket: t, channel: Channel::Request, .. } if t == ticket
        );
        if !live || current != Some(movie_id) {
            debug!(
                "recommendations: dropping stale fetch #{} for {} (selected {:?})",
                ticket, movie_id, current
            );
            return Resolution::Rejected;
        }
        match result {
            Ok(movies) => self.accept(movies),
            Err(e) => {
                warn!("recommendations: request for {} failed: {}", movie_id, e);
                self.phase = Phase::Idle;
                self.last_error = Some(e.to_string());
                Resolution::Failed
            }
        }
    }

    fn on_reply_timeout(&mut self, ticket: u64) -> Resolution {
        match self.phase {
            Phase::Awaiting {
                ticket: t,
                movie_id,
                channel: Channel::Push,
            } if t == ticket => {
                warn!(
                    "recommendations: no push reply for {} after {:?}",
                    movie_id, self.reply_timeout
                );
                self.phase = Phase::Idle;
                self.reply_timer = None;
                self.last_error = Some("recommendations timed out".to_string());
                Resolution::Failed
            }
            _ => Resolution::Rejected,
        }
    }

    fn accept(&mut self, movies: Vec<Movie>) -> Resolution {
        info!("recommendations: accepted {} movies", movies.len());
        self.cancel_reply_timer();
        self.recommendations = movies;
        self.resolved = true;
        self.phase = Phase::Idle;
        Resolution::Accepted
    }

    fn spawn_fetch(&self, ticket: u64, movie_id: MovieId) {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.recommendations(movie_id).await;
            let event = RecommendationEvent::Fetched {
                ticket,
                movie_id,
                result,
            };
            let _ = events.send(SyncEvent::Recommendation(event)).await;
        });
    }

    fn arm_reply_timer(&mut self, ticket: u64) {
        let events = self.events.clone();
        let timeout = self.reply_timeout;
        self.reply_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let event = RecommendationEvent::ReplyTimedOut { ticket };
            let _ = events.send(SyncEvent::Recommendation(event)).await;
        }));
    }

    fn cancel_reply_timer(&mut self) {
        if let Some(timer) = self.reply_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RecommendationCoordinator {
    fn drop(&mut self) {
        self.cancel_reply_timer();
    }
}
