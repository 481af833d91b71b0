//! Push-channel wire format.
//!
//! Frames are UTF-8 JSON text.  Outbound: `{"type":"get_recommendations","movie_id":42}`.
//! Inbound: `{"type": <kind>, "data": [<Movie>...]}`; recommendation replies
//! also echo the `movie_id` they answer.
//!
//! The channel carries no sequence numbers.  Arrival order is the only
//! ordering guarantee, so a later frame of a kind supersedes an earlier one.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::movie::{Movie, MovieId};

/// Length of the client-generated session token in the socket path.
pub const SESSION_ID_LEN: usize = 12;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    GetRecommendations { movie_id: MovieId },
}

impl OutboundMessage {
    pub fn encode(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Discriminator of an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// `trending_movies`: full list, sent on connect.
    TrendingSnapshot,
    /// `trending_update`: periodic refresh.  Applied as a full replacement.
    TrendingDelta,
    /// `recommendations`: answer to `get_recommendations`.
    RecommendationResult,
    /// Anything else the server may grow in the future.
    Unknown(String),
}

impl MessageKind {
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "trending_movies" => Self::TrendingSnapshot,
            "trending_update" => Self::TrendingDelta,
            "recommendations" => Self::RecommendationResult,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            Self::TrendingSnapshot => "trending_movies",
            Self::TrendingDelta => "trending_update",
            Self::RecommendationResult => "recommendations",
            Self::Unknown(tag) => tag,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub kind: MessageKind,
    pub payload: Vec<Movie>,
    /// Correlation id echoed by the server on recommendation replies.
    pub movie_id: Option<MovieId>,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    movie_id: Option<MovieId>,
}

impl InboundMessage {
    /// Decode one text frame.
    ///
    /// Known kinds must carry a movie array in `data`; unknown kinds are
    /// passed through with an empty payload so the router can log and skip
    /// them.
    pub fn decode(text: &str) -> anyhow::Result<Self> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let kind = MessageKind::from_wire(&raw.kind);
        let payload = match kind {
            MessageKind::Unknown(_) => Vec::new(),
            _ => {
                if raw.data.is_null() {
                    anyhow::bail!("frame {:?} has no data", raw.kind);
                }
                serde_json::from_value(raw.data)?
            }
        };
        Ok(Self {
            kind,
            payload,
            movie_id: raw.movie_id,
        })
    }
}

/// Fresh opaque token for one client session.
pub fn new_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_wire_shape() {
        let msg = OutboundMessage::GetRecommendations { movie_id: 42 };
        let json: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "get_recommendations", "movie_id": 42})
        );
    }

    #[test]
    fn test_decode_trending_snapshot() {
        let msg = InboundMessage::decode(
            r#"{"type":"trending_movies","data":[{"id":1,"title":"Inception"},{"id":2,"title":"Heat"}]}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::TrendingSnapshot);
        assert_eq!(msg.payload.len(), 2);
        assert_eq!(msg.payload[1].title, "Heat");
        assert_eq!(msg.movie_id, None);
    }

    #[test]
    fn test_decode_recommendations_keeps_correlation() {
        let msg = InboundMessage::decode(
            r#"{"type":"recommendations","movie_id":42,"data":[{"id":7,"title":"Tenet"}]}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageKind::RecommendationResult);
        assert_eq!(msg.movie_id, Some(42));
    }

    #[test]
    fn test_decode_unknown_kind_is_not_an_error() {
        let msg =
            InboundMessage::decode(r#"{"type":"search_results","query":"x","data":{"page":1}}"#)
                .unwrap();
        assert_eq!(msg.kind, MessageKind::Unknown("search_results".into()));
        assert!(msg.payload.is_empty());
        assert_eq!(msg.kind.as_wire(), "search_results");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(InboundMessage::decode("not json").is_err());
        assert!(InboundMessage::decode(r#"{"data":[]}"#).is_err());
        assert!(InboundMessage::decode(r#"{"type":"trending_update"}"#).is_err());
        assert!(InboundMessage::decode(r#"{"type":"trending_update","data":{"id":1}}"#).is_err());
        assert!(InboundMessage::decode(r#"{"type":"recommendations","data":[{"id":"x"}]}"#).is_err());
    }

    #[test]
    fn test_session_id() {
        let a = new_session_id();
        assert_eq!(a.len(), SESSION_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, new_session_id());
    }
}
