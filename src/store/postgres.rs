use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::Instrument;

use super::{split_concat, MovieStore, PageQuery, StoreError};
use crate::catalog::facets::{FacetRow, MediaTally, RawFacetValue};
use crate::catalog::filter::{Dimension, FilterSet, Predicate, SqlFragment, SqlParam, PLACEHOLDER};
use crate::catalog::movie::{Holdings, MovieDetails, MovieSummary, Suggestion, SuggestionKind};

const SUMMARY_COLUMNS: &str = r#"
    m.movie_id,
    m.title,
    m.original_title,
    m.release_year,
    m.runtime,
    m.rating,
    m.content_rating,
    m.location,
    m.folder_name,
    m.overview,
    m.format_vhs,
    m.format_dvd,
    m.format_blu,
    m.format_blu3,
    (SELECT STRING_AGG(DISTINCT g.genre, ', ' ORDER BY g.genre)
        FROM genres g WHERE g.movie_id = m.movie_id) AS genres,
    (SELECT STRING_AGG(DISTINCT c.country, ', ' ORDER BY c.country)
        FROM countries c WHERE c.movie_id = m.movie_id) AS countries,
    (SELECT STRING_AGG(DISTINCT d.name, ', ' ORDER BY d.name)
        FROM crew d WHERE d.movie_id = m.movie_id AND d.job = 'Director') AS directors,
    (SELECT STRING_AGG(top.name, ', ' ORDER BY top.popularity DESC NULLS LAST, top.name)
        FROM (
            SELECT ac.name, MAX(ac.popularity) AS popularity
            FROM movie_cast ac
            WHERE ac.movie_id = m.movie_id
            GROUP BY ac.name
            ORDER BY MAX(ac.popularity) DESC NULLS LAST, ac.name
            LIMIT 3
        ) top) AS actors
"#;

/// Catalog store over the Postgres schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Appends `fragment`, binding each value where its placeholder stood.
fn push_fragment(builder: &mut QueryBuilder<'_, Postgres>, fragment: SqlFragment) {
    let mut pieces = fragment.template().split(PLACEHOLDER);
    if let Some(head) = pieces.next() {
        builder.push(head);
    }
    for (piece, param) in pieces.zip(fragment.params().iter().cloned()) {
        match param {
            SqlParam::Text(value) => builder.push_bind(value),
            SqlParam::Int(value) => builder.push_bind(value),
            SqlParam::TextList(values) => builder.push_bind(values),
        };
        builder.push(piece);
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &FilterSet) {
    let predicates = filters.predicates();
    if let Some(fragment) = SqlFragment::and_all(predicates.iter().map(Predicate::to_sql)) {
        builder.push(" AND ");
        push_fragment(builder, fragment);
    }
}

fn summary_from_row(row: &PgRow) -> Result<MovieSummary, sqlx::Error> {
    let holdings = Holdings {
        vhs: row.try_get("format_vhs")?,
        dvd: row.try_get("format_dvd")?,
        blu_ray: row.try_get("format_blu")?,
        blu_ray_3d: row.try_get("format_blu3")?,
    };
    let genres: Option<String> = row.try_get("genres")?;
    let countries: Option<String> = row.try_get("countries")?;
    let directors: Option<String> = row.try_get("directors")?;
    let actors: Option<String> = row.try_get("actors")?;
    Ok(MovieSummary {
        movie_id: row.try_get("movie_id")?,
        title: row.try_get("title")?,
        original_title: row.try_get("original_title")?,
        release_year: row.try_get("release_year")?,
        runtime: row.try_get("runtime")?,
        rating: row.try_get("rating")?,
        content_rating: row.try_get("content_rating")?,
        location: row.try_get("location")?,
        folder_name: row.try_get("folder_name")?,
        overview: row.try_get("overview")?,
        formats: holdings.labels(),
        holdings,
        genres: split_concat(genres.as_deref()),
        countries: split_concat(countries.as_deref()),
        directors: split_concat(directors.as_deref()),
        actors: split_concat(actors.as_deref()),
    })
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn count_movies(&self, filters: &FilterSet) -> Result<i64, StoreError> {
        let query_span = tracing::info_span!("Counting filtered movies");
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM movies m WHERE 1=1");
        push_filters(&mut builder, filters);
        let row = builder
            .build()
            .fetch_one(&self.pool)
            .instrument(query_span)
            .await?;
        Ok(row.try_get::<i64, _>("total")?)
    }

    async fn fetch_movies(
        &self,
        filters: &FilterSet,
        page: &PageQuery<'_>,
    ) -> Result<Vec<MovieSummary>, StoreError> {
        let query_span = tracing::info_span!(
            "Fetching movie page",
            sort = page.sort.label(),
            limit = page.limit,
            offset = page.offset
        );
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(SUMMARY_COLUMNS);
        builder.push(" FROM movies m WHERE 1=1");
        push_filters(&mut builder, filters);
        builder.push(" ORDER BY ");
        push_fragment(&mut builder, page.sort.to_sql(page.seed));
        builder.push(" LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .instrument(query_span)
            .await?;
        let movies = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    async fn facet_rows(
        &self,
        dimension: Dimension,
        filters: &FilterSet,
    ) -> Result<Vec<FacetRow>, StoreError> {
        let query_span = tracing::info_span!("Counting facet values", %dimension);
        let head = match dimension {
            Dimension::Genre => {
                "SELECT g.genre AS value, COUNT(DISTINCT m.movie_id) AS count \
                 FROM movies m LEFT JOIN genres g ON g.movie_id = m.movie_id WHERE 1=1"
            }
            Dimension::Country => {
                "SELECT c.country AS value, COUNT(DISTINCT m.movie_id) AS count \
                 FROM movies m LEFT JOIN countries c ON c.movie_id = m.movie_id WHERE 1=1"
            }
            Dimension::Year => {
                "SELECT m.release_year AS value, COUNT(*) AS count FROM movies m WHERE 1=1"
            }
            Dimension::Location => {
                "SELECT NULLIF(m.location, '') AS value, COUNT(*) AS count \
                 FROM movies m WHERE 1=1"
            }
            Dimension::Media => return Ok(self.media_tally(filters).await?.rows()),
        };
        let mut builder = QueryBuilder::<Postgres>::new(head);
        push_filters(&mut builder, filters);
        builder.push(" GROUP BY 1");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .instrument(query_span)
            .await?;
        let mut facet_rows = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let value = if dimension == Dimension::Year {
                row.try_get::<Option<i32>, _>("value")?
                    .map(|year| RawFacetValue::Int(i64::from(year)))
            } else {
                row.try_get::<Option<String>, _>("value")?
                    .map(RawFacetValue::Text)
            };
            facet_rows.push(FacetRow {
                value: value.unwrap_or(RawFacetValue::Missing),
                count: row.try_get("count")?,
            });
        }
        Ok(facet_rows)
    }

    async fn media_tally(&self, filters: &FilterSet) -> Result<MediaTally, StoreError> {
        let query_span = tracing::info_span!("Counting media holdings");
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS matched, \
             COUNT(*) FILTER (WHERE m.format_vhs > 0) AS vhs, \
             COUNT(*) FILTER (WHERE m.format_dvd > 0) AS dvd, \
             COUNT(*) FILTER (WHERE m.format_blu > 0) AS blu, \
             COUNT(*) FILTER (WHERE m.format_blu3 > 0) AS blu3 \
             FROM movies m WHERE 1=1",
        );
        push_filters(&mut builder, filters);
        let row = builder
            .build()
            .fetch_one(&self.pool)
            .instrument(query_span)
            .await?;
        Ok(MediaTally {
            matched: row.try_get("matched")?,
            vhs: row.try_get("vhs")?,
            dvd: row.try_get("dvd")?,
            blu_ray: row.try_get("blu")?,
            blu_ray_3d: row.try_get("blu3")?,
        })
    }

    async fn movie_details(&self, movie_id: i32) -> Result<Option<MovieDetails>, StoreError> {
        let query_span = tracing::info_span!("Fetching movie details", movie_id);
        let query = format!(
            r#"
            SELECT {SUMMARY_COLUMNS},
                m.keywords,
                (SELECT STRING_AGG(everyone.name, ', ' ORDER BY everyone.popularity DESC NULLS LAST, everyone.name)
                    FROM (
                        SELECT ac.name, MAX(ac.popularity) AS popularity
                        FROM movie_cast ac
                        WHERE ac.movie_id = m.movie_id
                        GROUP BY ac.name
                    ) everyone) AS full_cast
            FROM movies m
            WHERE m.movie_id = $1
            "#
        );
        let row = sqlx::query(&query)
            .bind(movie_id)
            .fetch_optional(&self.pool)
            .instrument(query_span)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let full_cast: Option<String> = row.try_get("full_cast")?;
        Ok(Some(MovieDetails {
            summary: summary_from_row(&row)?,
            keywords: row.try_get("keywords")?,
            cast: split_concat(full_cast.as_deref()),
        }))
    }

    async fn autocomplete(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, StoreError> {
        let query_span = tracing::info_span!("Autocomplete lookup");
        let pattern = crate::catalog::filter::like_pattern(query);
        let rows = sqlx::query(
            r#"
            SELECT kind, name FROM (
                SELECT 0 AS rank, 'movie' AS kind, title AS name FROM movies WHERE title ILIKE $1
                UNION
                SELECT 1 AS rank, 'cast' AS kind, name FROM movie_cast WHERE name ILIKE $1
                UNION
                SELECT 2 AS rank, 'director' AS kind, name FROM crew
                    WHERE job = 'Director' AND name ILIKE $1
            ) suggestions
            ORDER BY rank, name
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .instrument(query_span)
        .await?;

        let mut suggestions = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let kind = match row.try_get::<String, _>("kind")?.as_str() {
                "movie" => SuggestionKind::Movie,
                "cast" => SuggestionKind::Cast,
                _ => SuggestionKind::Director,
            };
            suggestions.push(Suggestion {
                kind,
                name: row.try_get("name")?,
            });
        }
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filter::YearToken;
    use sqlx::Execute;

    #[test]
    fn filters_render_with_numbered_binds() {
        let filters = FilterSet {
            search: Some("alien".into()),
            years: vec![YearToken::Decade(1970), YearToken::Year(1986)],
            genres: vec!["Horror".into()],
            ..Default::default()
        };
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM movies m WHERE 1=1");
        push_filters(&mut builder, &filters);
        let sql = builder.build().sql().to_string();

        assert!(sql.contains("m.title ILIKE $1"));
        assert!(sql.contains("sa.name ILIKE $5"));
        assert!(sql.contains("(m.release_year BETWEEN $6 AND $7 OR m.release_year = $8)"));
        assert!(sql.contains("fg.genre = ANY($9)"));
        assert!(!sql.contains('?'));
        assert!(!sql.contains("alien"));
    }

    #[test]
    fn empty_filters_leave_the_base_query_alone() {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM movies m WHERE 1=1");
        push_filters(&mut builder, &FilterSet::default());
        assert_eq!(
            builder.build().sql(),
            "SELECT COUNT(*) AS total FROM movies m WHERE 1=1"
        );
    }
}
