//! Request/response client for the movie API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use watchthis_proto::config::ApiConfig;
use watchthis_proto::movie::{Credits, Movie, MovieDetails, MovieId, Video};

use crate::error::{SyncError, SyncResult};

/// The three catalog feeds loaded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Trending,
    Popular,
    Upcoming,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Trending, Feed::Popular, Feed::Upcoming];

    pub fn path(self) -> &'static str {
        match self {
            Feed::Trending => "/api/movies/trending",
            Feed::Popular => "/api/movies/popular",
            Feed::Upcoming => "/api/movies/upcoming",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Feed::Trending => "Trending",
            Feed::Popular => "Popular",
            Feed::Upcoming => "Coming Soon",
        }
    }
}

/// Everything the sync layer needs from the remote API.
///
/// Implemented over HTTP by [`HttpMovieApi`]; tests drive the components
/// with a scripted implementation.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn feed(&self, feed: Feed) -> SyncResult<Vec<Movie>>;
    async fn search(&self, query: &str) -> SyncResult<Vec<Movie>>;
    async fn recommendations(&self, movie_id: MovieId) -> SyncResult<Vec<Movie>>;
    async fn details(&self, movie_id: MovieId) -> SyncResult<MovieDetails>;
    async fn credits(&self, movie_id: MovieId) -> SyncResult<Credits>;
    async fn videos(&self, movie_id: MovieId) -> SyncResult<Vec<Video>>;
}

/// Listing endpoints answer with either a bare array or a paged envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(v) => v,
            Listing::Paged { results } => results,
        }
    }
}

#[derive(Serialize)]
struct RecommendationBody {
    movie_id: MovieId,
}

pub struct HttpMovieApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMovieApi {
    pub fn new(config: &ApiConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("watchthis/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| SyncError::Request {
                endpoint: config.base_url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> SyncResult<T> {
        let request_err = |source| SyncError::Request {
            endpoint: endpoint.to_string(),
            source,
        };
        let response = request.send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<T>().await.map_err(request_err)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let request = self.client.get(&url).header("Accept", "application/json");
        self.read(path, request).await
    }
}

#[async_trait]
impl MovieApi for HttpMovieApi {
    async fn feed(&self, feed: Feed) -> SyncResult<Vec<Movie>> {
        let listing: Listing<Movie> = self.get(feed.path()).await?;
        Ok(listing.into_vec())
    }

    async fn search(&self, query: &str) -> SyncResult<Vec<Movie>> {
        let path = "/api/movies/search";
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} q={:?}", url, query);
        let request = self.client.get(&url).query(&[("q", query)]);
        let listing: Listing<Movie> = self.read(path, request).await?;
        Ok(listing.into_vec())
    }

    async fn recommendations(&self, movie_id: MovieId) -> SyncResult<Vec<Movie>> {
        let path = "/api/movies/recommendations";
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} movie_id={}", url, movie_id);
        let request = self.client.post(&url).json(&RecommendationBody { movie_id });
        self.read(path, request).await
    }

    async fn details(&self, movie_id: MovieId) -> SyncResult<MovieDetails> {
        self.get(&format!("/api/movies/{}", movie_id)).await
    }

    async fn credits(&self, movie_id: MovieId) -> SyncResult<Credits> {
        self.get(&format!("/api/movies/{}/credits", movie_id)).await
    }

    async fn videos(&self, movie_id: MovieId) -> SyncResult<Vec<Video>> {
        let listing: Listing<Video> = self.get(&format!("/api/movies/{}/videos", movie_id)).await?;
        Ok(listing.into_vec())
    }
}
