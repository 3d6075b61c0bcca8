use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::postgres::PgPoolOptions;
use tracing_actix_web::TracingLogger;

use crate::catalog::cache::{FacetCache, InMemoryFacetCache, NoopFacetCache};
use crate::catalog::pagination::Grid;
use crate::catalog::CatalogService;
use crate::configuration::{CatalogSettings, Settings, StorageBackend};
use crate::error::CatalogError;
use crate::routes::{health_check, movie_source};
use crate::store::{FixtureMovieStore, MovieStore, PgMovieStore, StoreError};

fn configure_cors(frontend_url: &str) -> Cors {
    let mut cors = Cors::default();
    cors = if frontend_url == "*" {
        cors.allow_any_origin()
    } else {
        cors.allowed_origin(frontend_url)
    };
    cors.allowed_methods(vec!["GET"])
        .allowed_headers(vec![header::ACCEPT])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}

/// Opens the configured store. The Postgres pool connects lazily, so an
/// unreachable database shows up as 503 responses rather than a failed boot.
pub fn build_store(settings: &Settings) -> Result<Arc<dyn MovieStore>, StoreError> {
    match settings.storage.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(settings.database.max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect_lazy(&settings.database.connection_string())?;
            Ok(Arc::new(PgMovieStore::new(pool)))
        }
        StorageBackend::Fixture => {
            let path = settings.storage.fixture_path.as_deref().ok_or_else(|| {
                StoreError::Fixture("storage.fixture_path must be set for the fixture backend".into())
            })?;
            Ok(Arc::new(FixtureMovieStore::from_file(path)?))
        }
    }
}

pub fn build_cache(catalog: &CatalogSettings) -> Arc<dyn FacetCache> {
    if catalog.facet_cache_ttl_seconds == 0 {
        Arc::new(NoopFacetCache)
    } else {
        Arc::new(InMemoryFacetCache::new(catalog.facet_cache_ttl()))
    }
}

pub fn build_catalog(settings: &Settings) -> Result<CatalogService, StoreError> {
    let store = build_store(settings)?;
    tracing::info!("Using {:?} storage backend", settings.storage.backend);
    Ok(CatalogService::new(
        store,
        build_cache(&settings.catalog),
        Grid::new(settings.catalog.grid_rows, settings.catalog.grid_columns),
        settings.catalog.autocomplete_limit,
    ))
}

pub fn run_server(
    listener: TcpListener,
    catalog: CatalogService,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    let catalog = Data::new(catalog);
    let limits = Data::new(settings.catalog.clone());
    let frontend_url = settings.application.frontend_url.clone();

    let server: Server = HttpServer::new(move || {
        let cors = configure_cors(frontend_url.as_str());
        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                CatalogError::validation(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                CatalogError::NotFound(err.to_string()).into()
            }))
            .route("/health_check", web::get().to(health_check))
            .service(movie_source())
            .app_data(catalog.clone())
            .app_data(limits.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
