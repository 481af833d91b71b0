//! Inputs to the session loop.
//!
//! Helper tasks (timers, HTTP calls, the catalog load) never touch state;
//! they post one of these and the owning component applies it.

use crate::catalog::Catalog;
use crate::connection::ConnectionEvent;
use crate::details::DetailsLoaded;
use crate::recommend::RecommendationEvent;
use crate::search::SearchEvent;

#[derive(Debug)]
pub enum SyncEvent {
    Connection(ConnectionEvent),
    CatalogLoaded(Catalog),
    Search(SearchEvent),
    Recommendation(RecommendationEvent),
    Details(Box<DetailsLoaded>),
}
