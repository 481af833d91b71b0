//! watchthis-sync: keeps the client's movie state in step with the server.
//!
//! Two channels feed the same state:
//! - a push channel (`ConnectionManager`) delivering trending updates and
//!   recommendation replies
//! - request/response calls (`MovieApi`) for the catalog, search,
//!   details and recommendations when push is unavailable
//!
//! `SyncSession` owns every slice and is driven by the front-end's loop.

pub mod api;
pub mod catalog;
pub mod connection;
pub mod details;
pub mod error;
pub mod event;
pub mod recommend;
pub mod router;
pub mod search;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{Feed, HttpMovieApi, MovieApi};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{SyncError, SyncResult};
pub use event::SyncEvent;
pub use recommend::Channel;
pub use search::{SearchKey, SearchStatus};
pub use session::{SyncSession, View};
