//! Filter clause builder.
//!
//! A [`FilterSet`] holds the structured selections of one catalog request. It
//! turns into an ordered list of [`Predicate`]s which are ANDed together; each
//! predicate renders to a [`SqlFragment`] whose literals are always bound
//! parameters, so the same fragment is reused verbatim by the page query, the
//! total count and every facet count.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::CatalogError;

const YEAR_PATTERN: &str = r"^\d{1,4}$";
const DECADE_PATTERN: &str = r"^(\d{1,4})\.\.\.(\d{1,4})$";

static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(YEAR_PATTERN).expect("year pattern compiles"));
static DECADE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DECADE_PATTERN).expect("decade pattern compiles"));

/// Placeholder used in [`SqlFragment`] templates for every bound value.
pub const PLACEHOLDER: char = '?';

/// One entry of the year filter: a literal year or a ten year span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum YearToken {
    Year(i32),
    Decade(i32),
}

impl YearToken {
    pub fn parse(token: &str) -> Result<Self, CatalogError> {
        let token = token.trim();
        if YEAR_REGEX.is_match(token) {
            let year = token
                .parse::<i32>()
                .map_err(|_| CatalogError::Validation(format!("Invalid year `{}`", token)))?;
            return Ok(YearToken::Year(year));
        }
        if let Some(captures) = DECADE_REGEX.captures(token) {
            let start = captures[1].parse::<i32>();
            let end = captures[2].parse::<i32>();
            return match (start, end) {
                (Ok(start), Ok(end)) if end == start + 9 => Ok(YearToken::Decade(start)),
                _ => Err(CatalogError::Validation(format!(
                    "Decade `{}` must span exactly ten years, e.g. 1990...1999",
                    token
                ))),
            };
        }
        Err(CatalogError::Validation(format!(
            "Invalid year `{}`, expected a year like 1994 or a decade like 1990...1999",
            token
        )))
    }

    /// Inclusive year range covered by the token.
    pub fn bounds(&self) -> (i32, i32) {
        match *self {
            YearToken::Year(year) => (year, year),
            YearToken::Decade(start) => (start, start + 9),
        }
    }

    pub fn matches(&self, year: i32) -> bool {
        let (start, end) = self.bounds();
        (start..=end).contains(&year)
    }
}

impl fmt::Display for YearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            YearToken::Year(year) => write!(f, "{}", year),
            YearToken::Decade(start) => write!(f, "{}...{}", start, start + 9),
        }
    }
}

/// Physical formats a movie can be held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MediaFormat {
    Vhs,
    Dvd,
    BluRay,
    BluRay3d,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 4] = [
        MediaFormat::Vhs,
        MediaFormat::Dvd,
        MediaFormat::BluRay,
        MediaFormat::BluRay3d,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MediaFormat::Vhs => "VHS",
            MediaFormat::Dvd => "DVD",
            MediaFormat::BluRay => "Blu-ray",
            MediaFormat::BluRay3d => "Blu-ray 3D",
        }
    }

    /// Holdings column on the `movies` table.
    pub fn column(&self) -> &'static str {
        match self {
            MediaFormat::Vhs => "format_vhs",
            MediaFormat::Dvd => "format_dvd",
            MediaFormat::BluRay => "format_blu",
            MediaFormat::BluRay3d => "format_blu3",
        }
    }
}

impl FromStr for MediaFormat {
    type Err = CatalogError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.trim();
        MediaFormat::ALL
            .into_iter()
            .find(|format| {
                format.label().eq_ignore_ascii_case(name)
                    || format.column().eq_ignore_ascii_case(name)
                    || format
                        .column()
                        .trim_start_matches("format_")
                        .eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| CatalogError::Validation(format!("Unknown media format `{}`", name)))
    }
}

/// A filterable facet dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Genre,
    Year,
    Country,
    Location,
    Media,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Genre,
        Dimension::Year,
        Dimension::Country,
        Dimension::Location,
        Dimension::Media,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Genre => "genre",
            Dimension::Year => "year",
            Dimension::Country => "country",
            Dimension::Location => "location",
            Dimension::Media => "media",
        }
    }
}

impl FromStr for Dimension {
    type Err = CatalogError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "genre" | "genres" => Ok(Dimension::Genre),
            "year" | "years" => Ok(Dimension::Year),
            "country" | "countries" => Ok(Dimension::Country),
            "location" | "locations" => Ok(Dimension::Location),
            "media" => Ok(Dimension::Media),
            other => Err(CatalogError::UnsupportedDimension(other.to_string())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Splits a comma separated request argument, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
        .collect()
}

/// Selections of one catalog request. Empty selections do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub search: Option<String>,
    pub years: Vec<YearToken>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub locations: Vec<String>,
    pub media: Vec<MediaFormat>,
}

impl FilterSet {
    /// Sorts and de-duplicates every selection and drops blank search text.
    /// Two requests selecting the same sets normalize to equal values.
    pub fn normalized(mut self) -> Self {
        self.search = self
            .search
            .map(|search| search.trim().to_string())
            .filter(|search| !search.is_empty());
        self.years.sort();
        self.years.dedup();
        for values in [&mut self.genres, &mut self.countries, &mut self.locations] {
            values.sort();
            values.dedup();
        }
        self.media.sort();
        self.media.dedup();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// The same selections with `dimension`'s own filter removed.
    pub fn without(&self, dimension: Dimension) -> FilterSet {
        let mut rest = self.clone();
        match dimension {
            Dimension::Genre => rest.genres.clear(),
            Dimension::Year => rest.years.clear(),
            Dimension::Country => rest.countries.clear(),
            Dimension::Location => rest.locations.clear(),
            Dimension::Media => rest.media.clear(),
        }
        rest
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                predicates.push(Predicate::Search(search.to_string()));
            }
        }
        if !self.years.is_empty() {
            predicates.push(Predicate::Years(self.years.clone()));
        }
        if !self.genres.is_empty() {
            predicates.push(Predicate::Genres(self.genres.clone()));
        }
        if !self.countries.is_empty() {
            predicates.push(Predicate::Countries(self.countries.clone()));
        }
        if !self.locations.is_empty() {
            predicates.push(Predicate::Locations(self.locations.clone()));
        }
        if !self.media.is_empty() {
            predicates.push(Predicate::Media(self.media.clone()));
        }
        predicates
    }
}

/// A single restriction on the movie set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Case-insensitive substring over title, original title, keywords,
    /// director names and cast names.
    Search(String),
    /// Any token matches.
    Years(Vec<YearToken>),
    Genres(Vec<String>),
    Countries(Vec<String>),
    Locations(Vec<String>),
    /// At least one of the formats is held.
    Media(Vec<MediaFormat>),
}

impl Predicate {
    /// The facet dimension this predicate filters, if any.
    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            Predicate::Search(_) => None,
            Predicate::Years(_) => Some(Dimension::Year),
            Predicate::Genres(_) => Some(Dimension::Genre),
            Predicate::Countries(_) => Some(Dimension::Country),
            Predicate::Locations(_) => Some(Dimension::Location),
            Predicate::Media(_) => Some(Dimension::Media),
        }
    }

    /// Renders the predicate against the `movies m` alias.
    pub fn to_sql(&self) -> SqlFragment {
        match self {
            Predicate::Search(text) => {
                let pattern = like_pattern(text);
                SqlFragment::new(
                    "(m.title ILIKE ? OR m.original_title ILIKE ? OR m.keywords ILIKE ? \
                     OR EXISTS (SELECT 1 FROM crew sc WHERE sc.movie_id = m.movie_id \
                     AND sc.job = 'Director' AND sc.name ILIKE ?) \
                     OR EXISTS (SELECT 1 FROM movie_cast sa WHERE sa.movie_id = m.movie_id \
                     AND sa.name ILIKE ?))",
                    vec![SqlParam::Text(pattern); 5],
                )
            }
            Predicate::Years(tokens) => {
                let mut clauses = Vec::with_capacity(tokens.len());
                let mut params = Vec::new();
                for token in tokens {
                    match *token {
                        YearToken::Year(year) => {
                            clauses.push("m.release_year = ?");
                            params.push(SqlParam::Int(year));
                        }
                        YearToken::Decade(_) => {
                            let (start, end) = token.bounds();
                            clauses.push("m.release_year BETWEEN ? AND ?");
                            params.push(SqlParam::Int(start));
                            params.push(SqlParam::Int(end));
                        }
                    }
                }
                SqlFragment::new(format!("({})", clauses.join(" OR ")), params)
            }
            Predicate::Genres(genres) => SqlFragment::new(
                "EXISTS (SELECT 1 FROM genres fg WHERE fg.movie_id = m.movie_id \
                 AND fg.genre = ANY(?))",
                vec![SqlParam::TextList(genres.clone())],
            ),
            Predicate::Countries(countries) => SqlFragment::new(
                "EXISTS (SELECT 1 FROM countries fc WHERE fc.movie_id = m.movie_id \
                 AND fc.country = ANY(?))",
                vec![SqlParam::TextList(countries.clone())],
            ),
            Predicate::Locations(locations) => SqlFragment::new(
                "m.location = ANY(?)",
                vec![SqlParam::TextList(locations.clone())],
            ),
            Predicate::Media(formats) => {
                let clauses = formats
                    .iter()
                    .map(|format| format!("m.{} > 0", format.column()))
                    .collect::<Vec<_>>();
                SqlFragment::new(format!("({})", clauses.join(" OR ")), Vec::new())
            }
        }
    }
}

/// Escapes LIKE wildcards so the text is matched literally.
pub fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A value bound to a [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    TextList(Vec<String>),
}

/// SQL text with `?` placeholders plus the values bound to them, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment {
    template: String,
    params: Vec<SqlParam>,
}

impl SqlFragment {
    pub fn new(template: impl Into<String>, params: Vec<SqlParam>) -> Self {
        let template = template.into();
        debug_assert_eq!(
            template.matches(PLACEHOLDER).count(),
            params.len(),
            "placeholder count must match bound values"
        );
        Self { template, params }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Joins fragments with AND. `None` when there is nothing to restrict.
    pub fn and_all(fragments: impl IntoIterator<Item = SqlFragment>) -> Option<SqlFragment> {
        let mut templates = Vec::new();
        let mut params = Vec::new();
        for fragment in fragments {
            templates.push(fragment.template);
            params.extend(fragment.params);
        }
        if templates.is_empty() {
            return None;
        }
        Some(SqlFragment {
            template: templates.join(" AND "),
            params,
        })
    }
}
