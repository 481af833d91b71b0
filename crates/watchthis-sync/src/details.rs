//! Detail collaborators for the selected movie: full record, cast, trailer.
//!
//! Loaded on selection; a reply only lands if its movie is still the one
//! being shown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use watchthis_proto::movie::{pick_trailer, CastMember, Credits, MovieDetails, MovieId, Video};

use crate::api::MovieApi;
use crate::error::SyncResult;
use crate::event::SyncEvent;

/// Cast members kept for display.
pub const TOP_CAST: usize = 6;

#[derive(Debug)]
pub struct DetailsLoaded {
    pub movie_id: MovieId,
    pub details: SyncResult<MovieDetails>,
    pub credits: SyncResult<Credits>,
    pub videos: SyncResult<Vec<Video>>,
}

#[derive(Default)]
pub struct DetailsPanel {
    movie_id: Option<MovieId>,
    loading: bool,
    details: Option<MovieDetails>,
    cast: Vec<CastMember>,
    trailer: Option<Video>,
}

impl DetailsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn details(&self) -> Option<&MovieDetails> {
        self.details.as_ref()
    }

    pub fn cast(&self) -> &[CastMember] {
        &self.cast
    }

    pub fn trailer(&self) -> Option<&Video> {
        self.trailer.as_ref()
    }

    pub fn trailer_url(&self) -> Option<String> {
        self.trailer.as_ref().and_then(Video::watch_url)
    }

    pub fn load(&mut self, movie_id: MovieId, api: Arc<dyn MovieApi>, events: mpsc::Sender<SyncEvent>) {
        *self = Self {
            movie_id: Some(movie_id),
            loading: true,
            ..Self::default()
        };
        tokio::spawn(async move {
            let (details, credits, videos) = tokio::join!(
                api.details(movie_id),
                api.credits(movie_id),
                api.videos(movie_id),
            );
            let loaded = DetailsLoaded {
                movie_id,
                details,
                credits,
                videos,
            };
            let _ = events.send(SyncEvent::Details(Box::new(loaded))).await;
        });
    }

    pub fn apply(&mut self, loaded: DetailsLoaded) -> bool {
        if self.movie_id != Some(loaded.movie_id) {
            debug!("details: dropping stale details for {}", loaded.movie_id);
            return false;
        }
        self.loading = false;
        match loaded.details {
            Ok(d) => self.details = Some(d),
            Err(e) => warn!("details: {} unavailable: {}", loaded.movie_id, e),
        }
        match loaded.credits {
            Ok(c) => self.cast = c.top_cast(TOP_CAST).to_vec(),
            Err(e) => warn!("details: credits for {} unavailable: {}", loaded.movie_id, e),
        }
        match loaded.videos {
            Ok(v) => self.trailer = pick_trailer(&v).cloned(),
            Err(e) => warn!("details: videos for {} unavailable: {}", loaded.movie_id, e),
        }
        true
    }
}
