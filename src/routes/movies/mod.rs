mod autocomplete;
mod count_movies;
mod filter_movies;
mod get_facet;
mod get_movie_info;
mod util;

use autocomplete::*;
use count_movies::*;
use filter_movies::*;
use get_facet::*;
use get_movie_info::*;
pub use util::*;
