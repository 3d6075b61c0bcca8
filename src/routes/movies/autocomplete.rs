use actix_web::{
    web::{Data, Query},
    HttpResponse,
};
use serde::Deserialize;

use crate::catalog::CatalogService;
use crate::error::CatalogError;

#[derive(Deserialize, Debug)]
pub struct AutocompleteParams {
    pub query: Option<String>,
}

pub async fn autocomplete(
    catalog: Data<CatalogService>,
    params: Query<AutocompleteParams>,
) -> Result<HttpResponse, CatalogError> {
    let suggestions = catalog
        .autocomplete(params.query.as_deref().unwrap_or_default())
        .await?;
    Ok(HttpResponse::Ok().json(suggestions))
}
