//! MessageRouter: maps inbound push frames onto state.
//!
//! The router is the only writer of the trending slice.  Recommendation
//! replies are handed on untouched; staleness is the coordinator's call.

use tracing::{debug, info, warn};

use watchthis_proto::movie::{Movie, MovieId};
use watchthis_proto::protocol::{InboundMessage, MessageKind};

#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// The trending slice was replaced wholesale.
    TrendingReplaced { count: usize },
    /// To be judged by the recommendation coordinator.
    Recommendations {
        movie_id: Option<MovieId>,
        movies: Vec<Movie>,
    },
    /// Unknown kind; logged and skipped.
    Ignored { kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendingSource {
    Empty,
    Catalog,
    Push,
}

#[derive(Debug)]
pub struct MessageRouter {
    trending: Vec<Movie>,
    source: TrendingSource,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            trending: Vec::new(),
            source: TrendingSource::Empty,
        }
    }

    pub fn trending(&self) -> &[Movie] {
        &self.trending
    }

    pub fn dispatch(&mut self, msg: InboundMessage) -> StateUpdate {
        match msg.kind {
            // Deltas are whole lists too; nothing is merged.
            MessageKind::TrendingSnapshot | MessageKind::TrendingDelta => {
                let count = msg.payload.len();
                info!("router: {} replaces trending ({} movies)", msg.kind.as_wire(), count);
                self.trending = msg.payload;
                self.source = TrendingSource::Push;
                StateUpdate::TrendingReplaced { count }
            }
            MessageKind::RecommendationResult => StateUpdate::Recommendations {
                movie_id: msg.movie_id,
                movies: msg.payload,
            },
            MessageKind::Unknown(kind) => {
                warn!("router: ignoring unknown message type {:?}", kind);
                StateUpdate::Ignored { kind }
            }
        }
    }

    /// Seed trending from the startup catalog load.  A list that already came
    /// over the push channel is newer and is kept.  Returns whether the slice
    /// changed.
    pub fn seed_from_catalog(&mut self, movies: Vec<Movie>) -> bool {
        if self.source == TrendingSource::Push {
            debug!("router: push trending present, skipping catalog seed");
            return false;
        }
        self.trending = movies;
        self.source = TrendingSource::Catalog;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: MessageKind, ids: &[u64]) -> InboundMessage {
        InboundMessage {
            kind,
            payload: ids.iter().map(|&id| Movie::new(id, format!("m{}", id))).collect(),
            movie_id: None,
        }
    }

    fn ids(movies: &[Movie]) -> Vec<u64> {
        movies.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_snapshot_then_delta_replace_wholesale() {
        let mut router = MessageRouter::new();
        let update = router.dispatch(frame(MessageKind::TrendingSnapshot, &[1, 2, 3]));
        assert_eq!(update, StateUpdate::TrendingReplaced { count: 3 });
        assert_eq!(ids(router.trending()), vec![1, 2, 3]);

        let update = router.dispatch(frame(MessageKind::TrendingDelta, &[9]));
        assert_eq!(update, StateUpdate::TrendingReplaced { count: 1 });
        assert_eq!(ids(router.trending()), vec![9]);
    }

    #[test]
    fn test_recommendations_forwarded_untouched() {
        let mut router = MessageRouter::new();
        router.dispatch(frame(MessageKind::TrendingSnapshot, &[1]));
        let mut msg = frame(MessageKind::RecommendationResult, &[7, 8]);
        msg.movie_id = Some(42);
        match router.dispatch(msg) {
            StateUpdate::Recommendations { movie_id, movies } => {
                assert_eq!(movie_id, Some(42));
                assert_eq!(ids(&movies), vec![7, 8]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ids(router.trending()), vec![1]);
    }

    #[test]
    fn test_unknown_kind_ignored() {
        let mut router = MessageRouter::new();
        router.dispatch(frame(MessageKind::TrendingSnapshot, &[1]));
        let update = router.dispatch(frame(MessageKind::Unknown("search_results".into()), &[]));
        assert_eq!(update, StateUpdate::Ignored { kind: "search_results".into() });
        assert_eq!(ids(router.trending()), vec![1]);
    }

    #[test]
    fn test_catalog_seed_does_not_overwrite_push() {
        let mut router = MessageRouter::new();
        assert!(router.seed_from_catalog(vec![Movie::new(5, "a")]));
        assert_eq!(ids(router.trending()), vec![5]);

        router.dispatch(frame(MessageKind::TrendingSnapshot, &[1, 2]));
        assert!(!router.seed_from_catalog(vec![Movie::new(6, "b")]));
        assert_eq!(ids(router.trending()), vec![1, 2]);
    }
}
