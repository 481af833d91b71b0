use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Remote movie identifier.  Unique and stable across feeds.
pub type MovieId = u64;

/// One catalog entry as delivered by either channel.
///
/// Movies are never edited in place by the client; a fresher copy replaces
/// the whole value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    /// `YYYY-MM-DD`, sometimes empty for unreleased titles.
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub vote_count: Option<u32>,
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Opaque image paths, resolved by the presentation layer.
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl Movie {
    /// Minimal constructor, mostly useful for fixtures.
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            overview: None,
            release_date: None,
            vote_average: None,
            vote_count: None,
            popularity: None,
            poster_path: None,
            backdrop_path: None,
            genre_ids: Vec::new(),
        }
    }

    /// Rating on the 0–10 scale.  Out-of-range or non-finite values from the
    /// remote are treated as absent.
    pub fn rating(&self) -> Option<f32> {
        self.vote_average
            .filter(|r| r.is_finite() && (0.0..=10.0).contains(r))
    }

    pub fn release(&self) -> Option<NaiveDate> {
        self.release_date
            .as_deref()
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release().map(|d| d.year())
    }

    pub fn overview_text(&self) -> &str {
        self.overview.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Full record from `GET /api/movies/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub budget: Option<u64>,
    #[serde(default)]
    pub revenue: Option<u64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl MovieDetails {
    /// `2h 28m`, or `None` when the runtime is unknown.
    pub fn runtime_label(&self) -> Option<String> {
        self.runtime.map(|m| format!("{}h {}m", m / 60, m % 60))
    }

    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

impl Credits {
    /// Top-billed cast, in billing order.
    pub fn top_cast(&self, n: usize) -> &[CastMember] {
        &self.cast[..self.cast.len().min(n)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Video {
    pub fn is_youtube(&self) -> bool {
        self.site == "YouTube"
    }

    pub fn watch_url(&self) -> Option<String> {
        self.is_youtube()
            .then(|| format!("https://www.youtube.com/watch?v={}", self.key))
    }
}

/// Pick the video to play as "the trailer": a YouTube `Trailer` if there
/// is one, otherwise any YouTube video.
pub fn pick_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.is_youtube() && v.kind == "Trailer")
        .or_else(|| videos.iter().find(|v| v.is_youtube()))
}
