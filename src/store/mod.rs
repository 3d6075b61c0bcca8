//! Storage collaborators the catalog engine reads from.

mod concat;
mod fixture;
mod postgres;

pub use concat::*;
pub use fixture::*;
pub use postgres::*;

use async_trait::async_trait;

use crate::catalog::facets::{FacetRow, MediaTally};
use crate::catalog::filter::{Dimension, FilterSet};
use crate::catalog::movie::{MovieDetails, MovieSummary, Suggestion};
use crate::catalog::sort::SortKey;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("invalid fixture: {0}")]
    Fixture(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Row window of one result page plus the ordering to apply.
#[derive(Debug, Clone)]
pub struct PageQuery<'a> {
    pub sort: SortKey,
    pub seed: &'a str,
    pub limit: i64,
    pub offset: i64,
}

/// Read-only query interface over the movie collection.
///
/// Every method receives the filters that must apply; callers decide which
/// dimensions to drop before asking for facet rows.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn count_movies(&self, filters: &FilterSet) -> Result<i64, StoreError>;

    async fn fetch_movies(
        &self,
        filters: &FilterSet,
        page: &PageQuery<'_>,
    ) -> Result<Vec<MovieSummary>, StoreError>;

    /// Distinct movie counts grouped by every value of `dimension`, including
    /// a missing-value group. For `Dimension::Media` there is one row per
    /// format, each counted on its own.
    async fn facet_rows(
        &self,
        dimension: Dimension,
        filters: &FilterSet,
    ) -> Result<Vec<FacetRow>, StoreError>;

    async fn media_tally(&self, filters: &FilterSet) -> Result<MediaTally, StoreError>;

    async fn movie_details(&self, movie_id: i32) -> Result<Option<MovieDetails>, StoreError>;

    async fn autocomplete(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, StoreError>;
}
