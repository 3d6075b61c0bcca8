use std::borrow::Cow;

use actix_web::{web, Scope};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::{autocomplete, count_movies, filter_movies, get_facet, get_movie_info};
use crate::catalog::filter::{split_list, FilterSet, MediaFormat, YearToken};
use crate::catalog::sort::SortKey;
use crate::catalog::FilterRequest;
use crate::error::CatalogError;

pub fn movie_source() -> Scope {
    web::scope("/movies")
        .route("/filter", web::get().to(filter_movies))
        .route("/count", web::get().to(count_movies))
        .route("/autocomplete", web::get().to(autocomplete))
        .route("/facets/{dimension}", web::get().to(get_facet))
        .route("/{movie_id}", web::get().to(get_movie_info))
}

/// Query string shared by the filter, count and facet endpoints. List
/// values are comma separated.
#[derive(Deserialize, Validate, Debug, Default)]
pub struct FilterParams {
    #[validate(custom(function = "validate_year_tokens"))]
    pub years: Option<String>,
    pub genres: Option<String>,
    pub countries: Option<String>,
    pub locations: Option<String>,
    #[validate(custom(function = "validate_media_formats"))]
    pub media: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub include_counts: Option<bool>,
    pub seed: Option<String>,
}

impl FilterParams {
    pub fn to_filter_set(&self, search_max_length: u64) -> Result<FilterSet, CatalogError> {
        self.validate()
            .map_err(|errors| CatalogError::Validation(first_message(&errors)))?;

        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty());
        if let Some(search) = search {
            if search.chars().count() as u64 > search_max_length {
                return Err(CatalogError::validation(format!(
                    "search can't be longer than {} characters",
                    search_max_length
                )));
            }
        }

        // Both lists passed validation above.
        let years = self.years.as_deref().and_then(|raw| parse_years(raw).ok());
        let media = self.media.as_deref().and_then(|raw| parse_media(raw).ok());

        Ok(FilterSet {
            search: search.map(String::from),
            years: years.unwrap_or_default(),
            genres: list(&self.genres),
            countries: list(&self.countries),
            locations: list(&self.locations),
            media: media.unwrap_or_default(),
        })
    }

    pub fn to_request(&self, search_max_length: u64) -> Result<FilterRequest, CatalogError> {
        Ok(FilterRequest {
            filters: self.to_filter_set(search_max_length)?,
            sort: self
                .sort_by
                .as_deref()
                .map(SortKey::resolve)
                .unwrap_or_default(),
            page: self.page.unwrap_or(1),
            include_counts: self.include_counts.unwrap_or(true),
            seed: self.seed.clone(),
        })
    }
}

fn list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref().map(split_list).unwrap_or_default()
}

fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .unwrap_or_else(|| "Invalid filter parameters".to_string())
}

fn parse_years(raw: &str) -> Result<Vec<YearToken>, CatalogError> {
    split_list(raw)
        .iter()
        .map(|token| YearToken::parse(token))
        .collect()
}

fn parse_media(raw: &str) -> Result<Vec<MediaFormat>, CatalogError> {
    split_list(raw)
        .iter()
        .map(|name| name.parse::<MediaFormat>())
        .collect()
}

pub fn validate_year_tokens(years: &str) -> Result<(), ValidationError> {
    parse_years(years).map(|_| ()).map_err(|err| {
        ValidationError::new("Invalid year").with_message(Cow::from(err.to_string()))
    })
}

pub fn validate_media_formats(media: &str) -> Result<(), ValidationError> {
    parse_media(media).map(|_| ()).map_err(|err| {
        ValidationError::new("Invalid media format").with_message(Cow::from(err.to_string()))
    })
}
