//! Scripted collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use watchthis_proto::movie::{Credits, Movie, MovieDetails, MovieId, Video};
use watchthis_proto::protocol::OutboundMessage;

use crate::api::{Feed, MovieApi};
use crate::connection::{ConnectionState, PushSink, SendStatus};
use crate::error::{SyncError, SyncResult};

pub fn movie(id: MovieId, title: &str) -> Movie {
    Movie::new(id, title)
}

pub fn movies(ids: impl IntoIterator<Item = MovieId>) -> Vec<Movie> {
    ids.into_iter().map(|id| Movie::new(id, &format!("movie {}", id))).collect()
}

pub fn ids(movies: &[Movie]) -> Vec<MovieId> {
    movies.iter().map(|m| m.id).collect()
}

/// A scripted reply: delay, then movies or an HTTP status error.
#[derive(Clone)]
struct Reply {
    delay: Duration,
    outcome: Result<Vec<Movie>, u16>,
}

impl Reply {
    async fn play(self, endpoint: &str) -> SyncResult<Vec<Movie>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.map_err(|status| SyncError::Status {
            endpoint: endpoint.to_string(),
            status,
        })
    }
}

#[derive(Default)]
pub struct ScriptedApi {
    feeds: Mutex<HashMap<Feed, Reply>>,
    searches: Mutex<HashMap<String, Reply>>,
    recommendations: Mutex<HashMap<MovieId, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(self, feed: Feed, outcome: Result<Vec<Movie>, u16>) -> Self {
        self.feeds.lock().unwrap().insert(
            feed,
            Reply {
                delay: Duration::ZERO,
                outcome,
            },
        );
        self
    }

    pub fn search(self, query: &str, delay: Duration, outcome: Result<Vec<Movie>, u16>) -> Self {
        self.searches
            .lock()
            .unwrap()
            .insert(query.to_string(), Reply { delay, outcome });
        self
    }

    pub fn recommend(
        self,
        movie_id: MovieId,
        delay: Duration,
        outcome: Result<Vec<Movie>, u16>,
    ) -> Self {
        self.recommendations
            .lock()
            .unwrap()
            .insert(movie_id, Reply { delay, outcome });
        self
    }

    /// Every call made so far, as `"<method> <arg>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MovieApi for ScriptedApi {
    async fn feed(&self, feed: Feed) -> SyncResult<Vec<Movie>> {
        self.record(format!("feed {:?}", feed));
        let reply = self.feeds.lock().unwrap().get(&feed).cloned();
        match reply {
            Some(r) => r.play(feed.path()).await,
            None => Ok(Vec::new()),
        }
    }

    async fn search(&self, query: &str) -> SyncResult<Vec<Movie>> {
        self.record(format!("search {}", query));
        let reply = self.searches.lock().unwrap().get(query).cloned();
        match reply {
            Some(r) => r.play("/api/movies/search").await,
            None => Ok(Vec::new()),
        }
    }

    async fn recommendations(&self, movie_id: MovieId) -> SyncResult<Vec<Movie>> {
        self.record(format!("recommendations {}", movie_id));
        let reply = self.recommendations.lock().unwrap().get(&movie_id).cloned();
        match reply {
            Some(r) => r.play("/api/movies/recommendations").await,
            None => Ok(Vec::new()),
        }
    }

    async fn details(&self, movie_id: MovieId) -> SyncResult<MovieDetails> {
        self.record(format!("details {}", movie_id));
        Ok(MovieDetails {
            id: movie_id,
            title: format!("movie {}", movie_id),
            tagline: None,
            overview: None,
            runtime: Some(100),
            status: None,
            release_date: None,
            vote_average: None,
            budget: None,
            revenue: None,
            genres: Vec::new(),
        })
    }

    async fn credits(&self, movie_id: MovieId) -> SyncResult<Credits> {
        self.record(format!("credits {}", movie_id));
        Ok(Credits::default())
    }

    async fn videos(&self, movie_id: MovieId) -> SyncResult<Vec<Video>> {
        self.record(format!("videos {}", movie_id));
        Ok(vec![Video {
            key: format!("k{}", movie_id),
            site: "YouTube".into(),
            kind: "Trailer".into(),
            name: None,
        }])
    }
}

/// Push sink frozen in one state, recording what was sent.
pub struct FakePush {
    state: ConnectionState,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl FakePush {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl PushSink for FakePush {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn send(&self, message: &OutboundMessage) -> SendStatus {
        if self.state != ConnectionState::Open {
            return SendStatus::Dropped(self.state);
        }
        self.sent.lock().unwrap().push(message.clone());
        SendStatus::Sent
    }
}
