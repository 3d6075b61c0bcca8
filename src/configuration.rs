use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub user_name: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user_name, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}",
            self.user_name, self.password, self.host, self.port
        )
    }
}

/// Tunables of the query engine.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CatalogSettings {
    pub grid_rows: u32,
    pub grid_columns: u32,
    /// `0` turns the facet cache off.
    pub facet_cache_ttl_seconds: u64,
    pub autocomplete_limit: i64,
    pub search_max_length: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            grid_rows: 3,
            grid_columns: 4,
            facet_cache_ttl_seconds: 300,
            autocomplete_limit: 10,
            search_max_length: 200,
        }
    }
}

impl CatalogSettings {
    pub fn facet_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.facet_cache_ttl_seconds)
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Fixture,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub fixture_path: Option<String>,
}

fn default_max_connections() -> u32 {
    10
}

/// Reads `<filename>.json`, then applies `APP__SECTION__KEY` environment
/// overrides.
pub fn get_configuration(filename: &str) -> Result<Settings, config::ConfigError> {
    let mut builder = Config::builder();
    builder = builder.add_source(File::new(filename, FileFormat::Json));
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    let config = builder.build()?;
    config.try_deserialize()
}
