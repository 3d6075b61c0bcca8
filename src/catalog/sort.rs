//! Sort expression resolver.

use serde::Serialize;

use super::filter::{SqlFragment, SqlParam};

/// The orderings the catalog offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SortKey {
    Random,
    TitleAsc,
    TitleDesc,
    YearAsc,
    #[default]
    YearDesc,
    RatingAsc,
    RatingDesc,
    DirectorAsc,
    DirectorDesc,
    RuntimeAsc,
    RuntimeDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        SortKey::Random,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::YearAsc,
        SortKey::YearDesc,
        SortKey::RatingAsc,
        SortKey::RatingDesc,
        SortKey::DirectorAsc,
        SortKey::DirectorDesc,
        SortKey::RuntimeAsc,
        SortKey::RuntimeDesc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Random => "Zufall",
            SortKey::TitleAsc => "Titel asc",
            SortKey::TitleDesc => "Titel desc",
            SortKey::YearAsc => "Jahr asc",
            SortKey::YearDesc => "Jahr desc",
            SortKey::RatingAsc => "Bewertung asc",
            SortKey::RatingDesc => "Bewertung desc",
            SortKey::DirectorAsc => "Regie asc",
            SortKey::DirectorDesc => "Regie desc",
            SortKey::RuntimeAsc => "Laufzeit asc",
            SortKey::RuntimeDesc => "Laufzeit desc",
        }
    }

    /// Labels of every sort key, in presentation order.
    pub fn options() -> Vec<&'static str> {
        SortKey::ALL.iter().map(SortKey::label).collect()
    }

    /// Maps a label to its key; anything unrecognized is `Jahr desc`.
    pub fn resolve(label: &str) -> SortKey {
        let label = label.trim();
        SortKey::ALL
            .into_iter()
            .find(|key| key.label().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }

    pub fn direction(&self) -> Direction {
        match self {
            SortKey::Random
            | SortKey::TitleAsc
            | SortKey::YearAsc
            | SortKey::RatingAsc
            | SortKey::DirectorAsc
            | SortKey::RuntimeAsc => Direction::Asc,
            _ => Direction::Desc,
        }
    }

    /// ORDER BY body over the `movies m` alias. Always ends with the movie id
    /// so that rows never tie. Text keys compare bytewise under `"C"`.
    pub fn to_sql(&self, seed: &str) -> SqlFragment {
        let direction = match self.direction() {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        let expression = match self {
            SortKey::Random => {
                return SqlFragment::new(
                    r#"MD5(m.movie_id::text || ?) COLLATE "C", m.movie_id ASC"#,
                    vec![SqlParam::Text(seed.to_string())],
                )
            }
            SortKey::TitleAsc | SortKey::TitleDesc => r#"LOWER(m.title) COLLATE "C""#,
            SortKey::YearAsc | SortKey::YearDesc => "m.release_year",
            SortKey::RatingAsc | SortKey::RatingDesc => {
                r"CASE WHEN TRIM(m.rating) ~ '^[0-9]+(\.[0-9]+){0,1}$' THEN CAST(TRIM(m.rating) AS NUMERIC(6, 2)) END"
            }
            SortKey::DirectorAsc | SortKey::DirectorDesc => {
                r#"(SELECT MIN(od.name COLLATE "C") FROM crew od WHERE od.movie_id = m.movie_id AND od.job = 'Director')"#
            }
            SortKey::RuntimeAsc | SortKey::RuntimeDesc => "m.runtime",
        };
        SqlFragment::new(
            format!("{} {} NULLS LAST, m.movie_id ASC", expression, direction),
            Vec::new(),
        )
    }
}

/// Parses a decimal rating string into hundredths, rounding half up.
/// `None` for anything that is not a plain non-negative decimal.
pub fn rating_hundredths(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return None;
    }
    if raw.contains('.') && fraction.is_empty() {
        return None;
    }
    let whole = whole.parse::<i64>().ok()?;
    let mut digits = fraction.chars().map(|c| i64::from(c as u8 - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().is_some_and(|next| next >= 5);
    Some(whole * 100 + tenths * 10 + hundredths + i64::from(round_up))
}
