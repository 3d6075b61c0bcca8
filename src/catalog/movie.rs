use serde::{Deserialize, Serialize};

use super::filter::MediaFormat;

/// Holdings per physical format. Zero means not held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holdings {
    #[serde(default)]
    pub vhs: i32,
    #[serde(default)]
    pub dvd: i32,
    #[serde(default)]
    pub blu_ray: i32,
    #[serde(default)]
    pub blu_ray_3d: i32,
}

impl Holdings {
    pub fn count(&self, format: MediaFormat) -> i32 {
        match format {
            MediaFormat::Vhs => self.vhs,
            MediaFormat::Dvd => self.dvd,
            MediaFormat::BluRay => self.blu_ray,
            MediaFormat::BluRay3d => self.blu_ray_3d,
        }
    }

    pub fn holds(&self, format: MediaFormat) -> bool {
        self.count(format) > 0
    }

    /// `"DVD (2)"` style labels for the held formats, in format order.
    pub fn labels(&self) -> Vec<String> {
        MediaFormat::ALL
            .into_iter()
            .filter(|format| self.holds(*format))
            .map(|format| format!("{} ({})", format.label(), self.count(format)))
            .collect()
    }
}

/// One catalog row as listed by the filter endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub movie_id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub runtime: Option<i32>,
    pub rating: Option<String>,
    pub content_rating: Option<String>,
    pub location: Option<String>,
    pub folder_name: Option<String>,
    pub overview: Option<String>,
    pub holdings: Holdings,
    pub formats: Vec<String>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub directors: Vec<String>,
    /// The three most popular cast members.
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub keywords: Option<String>,
    /// Full cast, most popular first.
    pub cast: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Movie,
    Cast,
    Director,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub name: String,
}
