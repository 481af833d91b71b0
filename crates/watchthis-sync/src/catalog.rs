//! CatalogLoader: the one-shot startup fetch of the three feeds.

use tracing::{info, warn};

use watchthis_proto::movie::Movie;

use crate::api::{Feed, MovieApi};
use crate::error::SyncResult;

#[derive(Debug, Default)]
pub struct Catalog {
    pub trending: Vec<Movie>,
    pub popular: Vec<Movie>,
    pub upcoming: Vec<Movie>,
    /// Feeds that failed, with the reason.  Their slices stay empty.
    pub failures: Vec<(Feed, String)>,
}

impl Catalog {
    pub fn feed(&self, feed: Feed) -> &[Movie] {
        match feed {
            Feed::Trending => &self.trending,
            Feed::Popular => &self.popular,
            Feed::Upcoming => &self.upcoming,
        }
    }

    pub fn failed(&self, feed: Feed) -> bool {
        self.failures.iter().any(|(f, _)| *f == feed)
    }
}

pub struct CatalogLoader;

impl CatalogLoader {
    /// Fetch all feeds concurrently.  A failing feed is logged and left
    /// empty; it never holds back the others.
    pub async fn load_all(api: &dyn MovieApi) -> Catalog {
        let (trending, popular, upcoming) = tokio::join!(
            api.feed(Feed::Trending),
            api.feed(Feed::Popular),
            api.feed(Feed::Upcoming),
        );

        let mut catalog = Catalog::default();
        catalog.trending = Self::settle(Feed::Trending, trending, &mut catalog.failures);
        catalog.popular = Self::settle(Feed::Popular, popular, &mut catalog.failures);
        catalog.upcoming = Self::settle(Feed::Upcoming, upcoming, &mut catalog.failures);
        info!(
            "catalog: trending={} popular={} upcoming={} failed={}",
            catalog.trending.len(),
            catalog.popular.len(),
            catalog.upcoming.len(),
            catalog.failures.len()
        );
        catalog
    }

    fn settle(
        feed: Feed,
        result: SyncResult<Vec<Movie>>,
        failures: &mut Vec<(Feed, String)>,
    ) -> Vec<Movie> {
        match result {
            Ok(movies) => movies,
            Err(e) => {
                warn!("catalog: {:?} feed unavailable: {}", feed, e);
                failures.push((feed, e.to_string()));
                Vec::new()
            }
        }
    }
}
