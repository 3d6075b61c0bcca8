use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::{MovieStore, PageQuery, StoreError};
use crate::catalog::facets::{FacetRow, MediaTally, RawFacetValue};
use crate::catalog::filter::{Dimension, FilterSet, MediaFormat, Predicate};
use crate::catalog::movie::{Holdings, MovieDetails, MovieSummary, Suggestion, SuggestionKind};
use crate::catalog::sort::{rating_hundredths, Direction, SortKey};

const DIRECTOR_JOB: &str = "Director";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixtureCastMember {
    pub name: String,
    #[serde(default)]
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureCrewMember {
    pub name: String,
    pub job: String,
}

/// A movie with its associations, as stored in a fixture file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FixtureMovie {
    pub movie_id: i32,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub holdings: Holdings,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub cast: Vec<FixtureCastMember>,
    #[serde(default)]
    pub crew: Vec<FixtureCrewMember>,
}

impl FixtureMovie {
    pub fn new(movie_id: i32, title: impl Into<String>) -> Self {
        Self {
            movie_id,
            title: title.into(),
            original_title: None,
            release_year: None,
            runtime: None,
            rating: None,
            content_rating: None,
            location: None,
            folder_name: None,
            overview: None,
            keywords: None,
            holdings: Holdings::default(),
            genres: Vec::new(),
            countries: Vec::new(),
            cast: Vec::new(),
            crew: Vec::new(),
        }
    }

    fn directors(&self) -> Vec<String> {
        distinct_sorted(
            self.crew
                .iter()
                .filter(|member| member.job == DIRECTOR_JOB)
                .map(|member| member.name.clone()),
        )
    }

    /// Cast names, most popular first; repeated names keep their best score.
    fn cast_by_popularity(&self) -> Vec<String> {
        let mut best: Vec<(String, Option<f64>)> = Vec::new();
        for member in &self.cast {
            match best.iter_mut().find(|(name, _)| *name == member.name) {
                Some((_, popularity)) => {
                    if member.popularity > *popularity {
                        *popularity = member.popularity;
                    }
                }
                None => best.push((member.name.clone(), member.popularity)),
            }
        }
        best.sort_by(|(name_a, a), (name_b, b)| {
            nulls_last(*a, *b, Direction::Desc, |a, b| a.total_cmp(b))
                .then_with(|| name_a.cmp(name_b))
        });
        best.into_iter().map(|(name, _)| name).collect()
    }

    fn non_empty_location(&self) -> Option<&str> {
        self.location.as_deref().filter(|location| !location.is_empty())
    }

    fn matches(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Search(text) => {
                let needle = text.to_lowercase();
                let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);
                contains(self.title.as_str())
                    || self.original_title.as_deref().is_some_and(contains)
                    || self.keywords.as_deref().is_some_and(contains)
                    || self
                        .crew
                        .iter()
                        .any(|member| member.job == DIRECTOR_JOB && contains(member.name.as_str()))
                    || self.cast.iter().any(|member| contains(member.name.as_str()))
            }
            Predicate::Years(tokens) => self
                .release_year
                .is_some_and(|year| tokens.iter().any(|token| token.matches(year))),
            Predicate::Genres(genres) => self.genres.iter().any(|genre| genres.contains(genre)),
            Predicate::Countries(countries) => self
                .countries
                .iter()
                .any(|country| countries.contains(country)),
            Predicate::Locations(locations) => self
                .location
                .as_ref()
                .is_some_and(|location| locations.contains(location)),
            Predicate::Media(formats) => formats.iter().any(|format| self.holdings.holds(*format)),
        }
    }

    fn summary(&self) -> MovieSummary {
        MovieSummary {
            movie_id: self.movie_id,
            title: self.title.clone(),
            original_title: self.original_title.clone(),
            release_year: self.release_year,
            runtime: self.runtime,
            rating: self.rating.clone(),
            content_rating: self.content_rating.clone(),
            location: self.location.clone(),
            folder_name: self.folder_name.clone(),
            overview: self.overview.clone(),
            holdings: self.holdings,
            formats: self.holdings.labels(),
            genres: distinct_sorted(self.genres.iter().cloned()),
            countries: distinct_sorted(self.countries.iter().cloned()),
            directors: self.directors(),
            actors: self.cast_by_popularity().into_iter().take(3).collect(),
        }
    }
}

fn distinct_sorted(values: impl Iterator<Item = String>) -> Vec<String> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}

fn nulls_last<T>(
    a: Option<T>,
    b: Option<T>,
    direction: Direction,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            Direction::Asc => cmp(&a, &b),
            Direction::Desc => cmp(&b, &a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Hex MD5 of the id followed by the seed, the same rank Postgres computes
/// with `MD5(movie_id::text || seed)`.
fn shuffle_rank(movie_id: i32, seed: &str) -> String {
    format!("{:x}", md5::compute(format!("{}{}", movie_id, seed)))
}

fn compare(a: &FixtureMovie, b: &FixtureMovie, sort: SortKey, seed: &str) -> Ordering {
    let direction = sort.direction();
    let ordering = match sort {
        SortKey::Random => shuffle_rank(a.movie_id, seed).cmp(&shuffle_rank(b.movie_id, seed)),
        SortKey::TitleAsc | SortKey::TitleDesc => nulls_last(
            Some(a.title.to_lowercase()),
            Some(b.title.to_lowercase()),
            direction,
            Ord::cmp,
        ),
        SortKey::YearAsc | SortKey::YearDesc => {
            nulls_last(a.release_year, b.release_year, direction, Ord::cmp)
        }
        SortKey::RatingAsc | SortKey::RatingDesc => nulls_last(
            a.rating.as_deref().and_then(rating_hundredths),
            b.rating.as_deref().and_then(rating_hundredths),
            direction,
            Ord::cmp,
        ),
        SortKey::DirectorAsc | SortKey::DirectorDesc => nulls_last(
            a.directors().into_iter().next(),
            b.directors().into_iter().next(),
            direction,
            Ord::cmp,
        ),
        SortKey::RuntimeAsc | SortKey::RuntimeDesc => {
            nulls_last(a.runtime, b.runtime, direction, Ord::cmp)
        }
    };
    ordering.then_with(|| a.movie_id.cmp(&b.movie_id))
}

fn add_row(rows: &mut Vec<FacetRow>, value: RawFacetValue) {
    match rows.iter_mut().find(|row| row.value == value) {
        Some(row) => row.count += 1,
        None => rows.push(FacetRow { value, count: 1 }),
    }
}

/// In-memory catalog evaluating the same predicates as the SQL store.
#[derive(Debug, Clone, Default)]
pub struct FixtureMovieStore {
    movies: Vec<FixtureMovie>,
}

impl FixtureMovieStore {
    pub fn from_movies(movies: Vec<FixtureMovie>) -> Self {
        Self { movies }
    }

    /// Loads a JSON array of movies.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| StoreError::Fixture(format!("{}: {}", path.display(), err)))?;
        let movies = serde_json::from_str::<Vec<FixtureMovie>>(&raw)
            .map_err(|err| StoreError::Fixture(format!("{}: {}", path.display(), err)))?;
        tracing::info!("Loaded {} fixture movies from {}", movies.len(), path.display());
        Ok(Self::from_movies(movies))
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    fn matching<'a>(&'a self, filters: &FilterSet) -> Vec<&'a FixtureMovie> {
        let predicates = filters.predicates();
        self.movies
            .iter()
            .filter(|movie| predicates.iter().all(|predicate| movie.matches(predicate)))
            .collect()
    }

    fn tally(&self, filters: &FilterSet) -> MediaTally {
        let matching = self.matching(filters);
        let held = |format: MediaFormat| {
            matching
                .iter()
                .filter(|movie| movie.holdings.holds(format))
                .count() as i64
        };
        MediaTally {
            matched: matching.len() as i64,
            vhs: held(MediaFormat::Vhs),
            dvd: held(MediaFormat::Dvd),
            blu_ray: held(MediaFormat::BluRay),
            blu_ray_3d: held(MediaFormat::BluRay3d),
        }
    }
}

#[async_trait]
impl MovieStore for FixtureMovieStore {
    async fn count_movies(&self, filters: &FilterSet) -> Result<i64, StoreError> {
        Ok(self.matching(filters).len() as i64)
    }

    async fn fetch_movies(
        &self,
        filters: &FilterSet,
        page: &PageQuery<'_>,
    ) -> Result<Vec<MovieSummary>, StoreError> {
        let mut matching = self.matching(filters);
        matching.sort_by(|a, b| compare(a, b, page.sort, page.seed));
        Ok(matching
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .map(FixtureMovie::summary)
            .collect())
    }

    async fn facet_rows(
        &self,
        dimension: Dimension,
        filters: &FilterSet,
    ) -> Result<Vec<FacetRow>, StoreError> {
        if dimension == Dimension::Media {
            return Ok(self.tally(filters).rows());
        }
        let mut rows = Vec::new();
        for movie in self.matching(filters) {
            match dimension {
                Dimension::Genre | Dimension::Country => {
                    let values = if dimension == Dimension::Genre {
                        distinct_sorted(movie.genres.iter().cloned())
                    } else {
                        distinct_sorted(movie.countries.iter().cloned())
                    };
                    if values.is_empty() {
                        add_row(&mut rows, RawFacetValue::Missing);
                    }
                    for value in values {
                        add_row(&mut rows, RawFacetValue::Text(value));
                    }
                }
                Dimension::Year => add_row(
                    &mut rows,
                    movie
                        .release_year
                        .map(|year| RawFacetValue::Int(i64::from(year)))
                        .unwrap_or(RawFacetValue::Missing),
                ),
                Dimension::Location => add_row(
                    &mut rows,
                    movie
                        .non_empty_location()
                        .map(|location| RawFacetValue::Text(location.to_string()))
                        .unwrap_or(RawFacetValue::Missing),
                ),
                Dimension::Media => {}
            }
        }
        Ok(rows)
    }

    async fn media_tally(&self, filters: &FilterSet) -> Result<MediaTally, StoreError> {
        Ok(self.tally(filters))
    }

    async fn movie_details(&self, movie_id: i32) -> Result<Option<MovieDetails>, StoreError> {
        Ok(self
            .movies
            .iter()
            .find(|movie| movie.movie_id == movie_id)
            .map(|movie| MovieDetails {
                summary: movie.summary(),
                keywords: movie.keywords.clone(),
                cast: movie.cast_by_popularity(),
            }))
    }

    async fn autocomplete(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, StoreError> {
        let needle = query.to_lowercase();
        let hit = |name: &str| name.to_lowercase().contains(&needle);
        let mut suggestions = BTreeSet::new();
        for movie in &self.movies {
            if hit(movie.title.as_str()) {
                suggestions.insert(Suggestion {
                    kind: SuggestionKind::Movie,
                    name: movie.title.clone(),
                });
            }
            for member in movie.cast.iter().filter(|member| hit(member.name.as_str())) {
                suggestions.insert(Suggestion {
                    kind: SuggestionKind::Cast,
                    name: member.name.clone(),
                });
            }
            for member in movie
                .crew
                .iter()
                .filter(|member| member.job == DIRECTOR_JOB && hit(member.name.as_str()))
            {
                suggestions.insert(Suggestion {
                    kind: SuggestionKind::Director,
                    name: member.name.clone(),
                });
            }
        }
        Ok(suggestions
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }
}
