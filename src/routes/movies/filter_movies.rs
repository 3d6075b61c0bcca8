use actix_web::{
    web::{Data, Query},
    HttpResponse,
};

use super::FilterParams;
use crate::catalog::CatalogService;
use crate::configuration::CatalogSettings;
use crate::error::CatalogError;

pub async fn filter_movies(
    catalog: Data<CatalogService>,
    limits: Data<CatalogSettings>,
    params: Query<FilterParams>,
) -> Result<HttpResponse, CatalogError> {
    let request = params.to_request(limits.search_max_length)?;
    let result = catalog.filter_movies(&request).await?;
    tracing::info!(
        "Filtered {} movies, page {}/{}",
        result.total_movies,
        result.current_page,
        result.total_pages
    );
    Ok(HttpResponse::Ok().json(result))
}
