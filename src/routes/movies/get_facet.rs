use actix_web::{
    web::{Data, Path, Query},
    HttpResponse,
};
use serde_json::json;

use super::FilterParams;
use crate::catalog::filter::Dimension;
use crate::catalog::CatalogService;
use crate::configuration::CatalogSettings;
use crate::error::CatalogError;

/// Counts of one dimension under the other active filters.
pub async fn get_facet(
    catalog: Data<CatalogService>,
    limits: Data<CatalogSettings>,
    path: Path<String>,
    params: Query<FilterParams>,
) -> Result<HttpResponse, CatalogError> {
    let dimension = path.into_inner().parse::<Dimension>()?;
    let filters = params.to_filter_set(limits.search_max_length)?;
    let counts = catalog.facet(dimension, &filters).await?;
    Ok(HttpResponse::Ok().json(json!({
        "dimension": dimension.name(),
        "counts": counts
    })))
}
