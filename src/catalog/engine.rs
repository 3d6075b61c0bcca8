use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::Instrument;

use super::cache::{cache_key, FacetCache};
use super::decades::group_decades;
use super::facets::{media_counts, normalize_rows, FacetCounts, FacetMap};
use super::filter::{Dimension, FilterSet};
use super::movie::{MovieDetails, MovieSummary, Suggestion};
use super::pagination::Grid;
use super::sort::SortKey;
use crate::error::CatalogError;
use crate::store::{MovieStore, PageQuery};

/// One filter call: the selections plus how to order and window the result.
#[derive(Debug, Clone, Default)]
pub struct FilterRequest {
    pub filters: FilterSet,
    pub sort: SortKey,
    pub page: i64,
    pub include_counts: bool,
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub movies: Vec<MovieSummary>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_movies: i64,
    pub items_per_page: u32,
    pub grid: Grid,
    pub sort_by: &'static str,
    pub sort_options: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(flatten)]
    pub counts: Option<FacetCounts>,
}

/// Filter-and-facet query engine over a [`MovieStore`].
///
/// Every call runs its store queries one after another. The facet cache is
/// only consulted for full facet sets and only written once all five
/// dimensions were computed.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn MovieStore>,
    cache: Arc<dyn FacetCache>,
    grid: Grid,
    autocomplete_limit: i64,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn MovieStore>,
        cache: Arc<dyn FacetCache>,
        grid: Grid,
        autocomplete_limit: i64,
    ) -> Self {
        Self {
            store,
            cache,
            grid,
            autocomplete_limit: autocomplete_limit.max(0),
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub async fn filter_movies(&self, request: &FilterRequest) -> Result<FilterResult, CatalogError> {
        let filters = request.filters.clone().normalized();
        let seed = match request.sort {
            SortKey::Random => Some(
                request
                    .seed
                    .clone()
                    .filter(|seed| !seed.trim().is_empty())
                    .unwrap_or_else(generate_seed),
            ),
            _ => None,
        };
        let span = tracing::info_span!(
            "Filtering movies",
            sort = request.sort.label(),
            page = request.page,
            include_counts = request.include_counts
        );

        let total_movies = self
            .store
            .count_movies(&filters)
            .instrument(span.clone())
            .await?;
        let page = self.grid.paginate(total_movies, request.page);
        let query = PageQuery {
            sort: request.sort,
            seed: seed.as_deref().unwrap_or_default(),
            limit: page.limit,
            offset: page.offset,
        };
        let movies = self
            .store
            .fetch_movies(&filters, &query)
            .instrument(span.clone())
            .await?;
        let counts = if request.include_counts {
            Some(self.facet_counts(&filters).instrument(span).await?)
        } else {
            None
        };

        Ok(FilterResult {
            movies,
            current_page: page.current,
            total_pages: page.total_pages,
            total_movies,
            items_per_page: self.grid.items_per_page(),
            grid: self.grid,
            sort_by: request.sort.label(),
            sort_options: SortKey::options(),
            seed,
            counts,
        })
    }

    pub async fn count_movies(&self, filters: &FilterSet) -> Result<i64, CatalogError> {
        Ok(self.store.count_movies(&filters.clone().normalized()).await?)
    }

    /// Counts for all five dimensions, each computed with its own filter
    /// removed and every other filter applied.
    pub async fn facet_counts(&self, filters: &FilterSet) -> Result<FacetCounts, CatalogError> {
        let filters = filters.clone().normalized();
        let key = cache_key(&filters);
        if let Some(counts) = self.cache.get(&key) {
            tracing::debug!("Facet cache hit for {}", key);
            return Ok(counts);
        }

        let counts = FacetCounts {
            years: self.facet(Dimension::Year, &filters).await?,
            genres: self.facet(Dimension::Genre, &filters).await?,
            countries: self.facet(Dimension::Country, &filters).await?,
            locations: self.facet(Dimension::Location, &filters).await?,
            media: self.facet(Dimension::Media, &filters).await?,
        };
        self.cache.set(&key, counts.clone());
        Ok(counts)
    }

    pub async fn facet(
        &self,
        dimension: Dimension,
        filters: &FilterSet,
    ) -> Result<FacetMap, CatalogError> {
        let others = filters.without(dimension).normalized();
        let map = match dimension {
            Dimension::Media => media_counts(self.store.media_tally(&others).await?),
            Dimension::Year => group_decades(&normalize_rows(
                dimension,
                self.store.facet_rows(dimension, &others).await?,
            )),
            _ => normalize_rows(dimension, self.store.facet_rows(dimension, &others).await?),
        };
        Ok(map)
    }

    pub async fn movie_details(&self, movie_id: i32) -> Result<MovieDetails, CatalogError> {
        self.store
            .movie_details(movie_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Movie {} not found", movie_id)))
    }

    pub async fn autocomplete(&self, query: &str) -> Result<Vec<Suggestion>, CatalogError> {
        let query = query.trim();
        if query.is_empty() || self.autocomplete_limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .autocomplete(query, self.autocomplete_limit)
            .await?)
    }
}

fn generate_seed() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::catalog::cache::{InMemoryFacetCache, NoopFacetCache};
    use crate::catalog::filter::{MediaFormat, YearToken};
    use crate::store::{FixtureMovie, FixtureMovieStore};

    /// 25 movies, the first 12 tagged Horror.
    fn collection() -> Vec<FixtureMovie> {
        (1..=25)
            .map(|id| {
                let mut movie = FixtureMovie::new(id, format!("Movie {:02}", id));
                movie.release_year = Some(1980 + id);
                movie.genres = if id <= 12 {
                    vec!["Horror".to_string()]
                } else {
                    vec!["Drama".to_string()]
                };
                let country = if id % 2 == 0 { "USA" } else { "France" };
                movie.countries = vec![country.to_string()];
                movie.location = Some(format!("Shelf {}", id % 3));
                movie.holdings.dvd = id % 2;
                movie.holdings.vhs = (id % 5 == 0) as i32;
                movie
            })
            .collect()
    }

    fn service_with(cache: Arc<dyn FacetCache>) -> CatalogService {
        CatalogService::new(
            Arc::new(FixtureMovieStore::from_movies(collection())),
            cache,
            Grid::new(3, 4),
            10,
        )
    }

    fn service() -> CatalogService {
        service_with(Arc::new(NoopFacetCache))
    }

    fn horror() -> FilterSet {
        FilterSet {
            genres: vec!["Horror".into()],
            ..Default::default()
        }
    }

    #[actix_rt::test]
    async fn horror_scenario_fills_one_page() {
        let result = service()
            .filter_movies(&FilterRequest {
                filters: horror(),
                page: 1,
                include_counts: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.movies.len(), 12);
        assert_eq!(result.total_movies, 12);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.items_per_page, 12);
        let counts = result.counts.unwrap();
        assert_eq!(counts.genres.get("Horror"), Some(12));
        assert_eq!(counts.genres.get("Drama"), Some(13));
    }

    #[actix_rt::test]
    async fn unmatched_search_returns_one_empty_page() {
        let result = service()
            .filter_movies(&FilterRequest {
                filters: FilterSet {
                    search: Some("no such title".into()),
                    ..Default::default()
                },
                page: 4,
                include_counts: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(result.movies.is_empty());
        assert_eq!(result.total_movies, 0);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.current_page, 1);
        assert_eq!(result.counts.unwrap(), FacetCounts::default());
    }

    #[actix_rt::test]
    async fn empty_filter_counts_every_movie() {
        let service = service();
        assert_eq!(service.count_movies(&FilterSet::default()).await.unwrap(), 25);
        let result = service
            .filter_movies(&FilterRequest::default())
            .await
            .unwrap();
        assert_eq!(result.total_movies, 25);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.sort_by, "Jahr desc");
        assert_eq!(result.movies[0].release_year, Some(2005));
        assert!(result.counts.is_none());
    }

    #[actix_rt::test]
    async fn a_dimension_never_filters_its_own_counts() {
        let service = service();
        let base = FilterSet {
            countries: vec!["USA".into()],
            ..Default::default()
        };
        let narrowed = FilterSet {
            genres: vec!["Drama".into()],
            ..base.clone()
        };
        let genres = service.facet(Dimension::Genre, &base).await.unwrap();
        assert_eq!(
            service.facet(Dimension::Genre, &narrowed).await.unwrap(),
            genres
        );
        assert_eq!(genres.total(), 12);

        let countries = service.facet(Dimension::Country, &narrowed).await.unwrap();
        assert_eq!(countries.get("USA"), Some(6));
        assert_eq!(countries.get("France"), Some(7));
    }

    #[actix_rt::test]
    async fn year_facet_is_grouped_by_decade() {
        let years = service()
            .facet(Dimension::Year, &FilterSet::default())
            .await
            .unwrap();
        let keys = years.keys().collect::<Vec<_>>();
        assert_eq!(&keys[..3], &["1980...1989", "1990...1999", "2000...2009"]);
        assert_eq!(years.get("1980...1989"), Some(9));
        assert_eq!(keys[3], "2005");
    }

    #[actix_rt::test]
    async fn media_facet_ignores_its_own_selection() {
        let filters = FilterSet {
            media: vec![MediaFormat::Vhs],
            ..horror()
        };
        let media = service().facet(Dimension::Media, &filters).await.unwrap();
        assert_eq!(
            media.iter().collect::<Vec<_>>(),
            vec![("VHS", 2), ("DVD", 6), ("Blu-ray", 0), ("Blu-ray 3D", 0)]
        );
    }

    #[actix_rt::test]
    async fn pages_cover_the_filtered_set_exactly_once() {
        let service = service();
        for sort in [SortKey::Random, SortKey::TitleDesc, SortKey::RatingAsc] {
            let mut seen = HashSet::new();
            let mut request = FilterRequest {
                filters: FilterSet {
                    years: vec![YearToken::Decade(1990), YearToken::Year(1985)],
                    ..Default::default()
                },
                sort,
                seed: Some("fixed".into()),
                ..Default::default()
            };
            let first = service.filter_movies(&request).await.unwrap();
            for page in 1..=first.total_pages {
                request.page = page;
                for movie in service.filter_movies(&request).await.unwrap().movies {
                    assert!(seen.insert(movie.movie_id), "{} repeated", movie.movie_id);
                }
            }
            assert_eq!(seen.len() as i64, first.total_movies);
            assert_eq!(first.total_movies, 11);
        }
    }

    #[actix_rt::test]
    async fn identical_requests_give_identical_results() {
        let service = service_with(Arc::new(InMemoryFacetCache::new(Duration::from_secs(60))));
        let request = FilterRequest {
            filters: horror(),
            sort: SortKey::Random,
            seed: Some("abc".into()),
            include_counts: true,
            ..Default::default()
        };
        let first = service.filter_movies(&request).await.unwrap();
        let second = service.filter_movies(&request).await.unwrap();
        assert_eq!(first.movies, second.movies);
        assert_eq!(first.counts, second.counts);
        assert_eq!(second.seed.as_deref(), Some("abc"));
    }

    #[actix_rt::test]
    async fn random_sort_generates_a_seed_when_missing() {
        let result = service()
            .filter_movies(&FilterRequest {
                sort: SortKey::Random,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.seed.map(|seed| seed.len()), Some(8));
    }

    #[actix_rt::test]
    async fn missing_movie_is_not_found() {
        let err = service().movie_details(404).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert_eq!(service().movie_details(7).await.unwrap().summary.movie_id, 7);
    }

    #[actix_rt::test]
    async fn blank_autocomplete_query_suggests_nothing() {
        let service = service();
        assert!(service.autocomplete("  ").await.unwrap().is_empty());
        assert_eq!(service.autocomplete("movie").await.unwrap().len(), 10);
    }
}
