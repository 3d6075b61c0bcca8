pub mod cache;
pub mod decades;
pub mod engine;
pub mod facets;
pub mod filter;
pub mod movie;
pub mod pagination;
pub mod sort;

pub use engine::*;
