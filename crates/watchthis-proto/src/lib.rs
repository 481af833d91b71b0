//! Shared types for the watchthis client: the movie data model, the
//! push-channel wire protocol, configuration and platform paths.

pub mod config;
pub mod movie;
pub mod platform;
pub mod protocol;
