use actix_web::{
    web::{Data, Path},
    HttpResponse,
};

use crate::catalog::CatalogService;
use crate::error::CatalogError;

pub async fn get_movie_info(
    catalog: Data<CatalogService>,
    path: Path<i32>,
) -> Result<HttpResponse, CatalogError> {
    let movie_id = path.into_inner();
    let details = catalog.movie_details(movie_id).await?;
    Ok(HttpResponse::Ok().json(details))
}
