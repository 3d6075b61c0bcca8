//! Facet counts: distinct-movie tallies per observed value of one dimension.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::filter::{Dimension, MediaFormat};

/// Label for movies that have no value in a dimension.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A value as it comes back from the store, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFacetValue {
    Missing,
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RawFacetValue {
    /// Canonical string key used in every returned map.
    pub fn canonical(&self) -> String {
        match self {
            RawFacetValue::Missing => UNKNOWN_LABEL.to_string(),
            RawFacetValue::Int(value) => value.to_string(),
            RawFacetValue::Text(value) => value.clone(),
            RawFacetValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Descending order on the raw value; missing values go last.
    fn cmp_desc(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RawFacetValue::Missing, RawFacetValue::Missing) => Ordering::Equal,
            (RawFacetValue::Missing, _) => Ordering::Greater,
            (_, RawFacetValue::Missing) => Ordering::Less,
            (RawFacetValue::Int(a), RawFacetValue::Int(b)) => b.cmp(a),
            (a, b) => b.canonical().cmp(&a.canonical()),
        }
    }
}

/// One grouped row returned by a facet query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRow {
    pub value: RawFacetValue,
    pub count: i64,
}

/// Per-format holdings tally for the media dimension. `matched` is the number
/// of movies the other predicates selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaTally {
    pub matched: i64,
    pub vhs: i64,
    pub dvd: i64,
    pub blu_ray: i64,
    pub blu_ray_3d: i64,
}

impl MediaTally {
    pub fn count(&self, format: MediaFormat) -> i64 {
        match format {
            MediaFormat::Vhs => self.vhs,
            MediaFormat::Dvd => self.dvd,
            MediaFormat::BluRay => self.blu_ray,
            MediaFormat::BluRay3d => self.blu_ray_3d,
        }
    }

    /// One row per format, labelled like the media filter values.
    pub fn rows(&self) -> Vec<FacetRow> {
        MediaFormat::ALL
            .into_iter()
            .map(|format| FacetRow {
                value: RawFacetValue::Text(format.label().to_string()),
                count: self.count(format),
            })
            .collect()
    }
}

/// Insertion-ordered `value -> count` mapping. Serializes as a JSON object
/// whose key order is the map order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetMap(Vec<(String, i64)>);

impl FacetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` to `key`, appending it when not yet present.
    pub fn add(&mut self, key: impl Into<String>, count: i64) {
        let key = key.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, total)) => *total += count,
            None => self.0.push((key, count)),
        }
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, count)| *count)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|(_, count)| count).sum()
    }
}

impl FromIterator<(String, i64)> for FacetMap {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let mut map = FacetMap::new();
        for (key, count) in iter {
            map.add(key, count);
        }
        map
    }
}

impl Serialize for FacetMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

struct FacetMapVisitor;

impl<'de> Visitor<'de> for FacetMapVisitor {
    type Value = FacetMap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of facet values to counts")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = FacetMap::new();
        while let Some((key, count)) = access.next_entry::<String, i64>()? {
            map.add(key, count);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for FacetMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FacetMapVisitor)
    }
}

/// Counts for all five dimensions; years already grouped with decades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub years: FacetMap,
    pub genres: FacetMap,
    pub countries: FacetMap,
    pub locations: FacetMap,
    pub media: FacetMap,
}

/// Orders grouped rows for `dimension` and normalizes their keys.
///
/// Genre and country are ordered by count descending, year and location by
/// the raw value descending. Ties fall back to the key ascending.
pub fn normalize_rows(dimension: Dimension, mut rows: Vec<FacetRow>) -> FacetMap {
    match dimension {
        Dimension::Genre | Dimension::Country | Dimension::Media => rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.value.canonical().cmp(&b.value.canonical()))
        }),
        Dimension::Year | Dimension::Location => rows.sort_by(|a, b| a.value.cmp_desc(&b.value)),
    }
    rows.into_iter()
        .map(|row| (row.value.canonical(), row.count))
        .collect()
}

/// The media facet: the four formats in fixed order, each counted on its own.
/// Empty when no movie matched the other predicates.
pub fn media_counts(tally: MediaTally) -> FacetMap {
    if tally.matched == 0 {
        return FacetMap::new();
    }
    MediaFormat::ALL
        .into_iter()
        .map(|format| (format.label().to_string(), tally.count(format)))
        .collect()
}
