use actix_web::{
    web::{Data, Query},
    HttpResponse,
};
use serde_json::json;

use super::FilterParams;
use crate::catalog::CatalogService;
use crate::configuration::CatalogSettings;
use crate::error::CatalogError;

pub async fn count_movies(
    catalog: Data<CatalogService>,
    limits: Data<CatalogSettings>,
    params: Query<FilterParams>,
) -> Result<HttpResponse, CatalogError> {
    let filters = params.to_filter_set(limits.search_max_length)?;
    let total = catalog.count_movies(&filters).await?;
    Ok(HttpResponse::Ok().json(json!({
        "total_movies": total
    })))
}
