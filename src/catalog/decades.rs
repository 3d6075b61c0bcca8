use std::cmp::Reverse;

use super::facets::FacetMap;

/// Groups year counts into decade buckets.
///
/// The result lists every decade bucket (`"1990...1999"`) ascending by start
/// year, followed by all original entries ordered by year descending with
/// non-numeric keys last. A year therefore shows up both inside its decade and
/// on its own.
pub fn group_decades(year_counts: &FacetMap) -> FacetMap {
    let mut decades: Vec<(i64, i64)> = Vec::new();
    for (key, count) in year_counts.iter() {
        let Ok(year) = key.trim().parse::<i64>() else {
            continue;
        };
        let start = year.div_euclid(10) * 10;
        match decades.iter_mut().find(|(existing, _)| *existing == start) {
            Some((_, total)) => *total += count,
            None => decades.push((start, count)),
        }
    }
    decades.sort_by_key(|(start, _)| *start);

    let mut years = year_counts.iter().collect::<Vec<_>>();
    // stable sort keeps non-numeric keys in their original relative order
    years.sort_by_key(|(key, _)| match key.trim().parse::<i64>() {
        Ok(year) => (0, Reverse(year)),
        Err(_) => (1, Reverse(0)),
    });

    let mut grouped = FacetMap::new();
    for (start, count) in decades {
        grouped.add(format!("{}...{}", start, start + 9), count);
    }
    for (key, count) in years {
        grouped.add(key, count);
    }
    grouped
}
