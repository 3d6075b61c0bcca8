pub mod catalog;
pub mod configuration;
pub mod error;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
