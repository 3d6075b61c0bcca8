pub mod health_check;
pub mod movies;

pub use health_check::*;
pub use movies::*;
