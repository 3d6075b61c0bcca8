/// Separator the store uses when aggregating associated values into one
/// column (`STRING_AGG(DISTINCT …, ', ')`).
pub const CONCAT_SEPARATOR: &str = ", ";

/// Splits an aggregated column back into its values, preserving order.
///
/// Lossless for values that do not contain [`CONCAT_SEPARATOR`] themselves.
/// A value such as `"Hello, Dolly"` comes back as two entries; the separator
/// is not escaped on the way in.
pub fn split_concat(aggregated: Option<&str>) -> Vec<String> {
    match aggregated {
        Some(joined) if !joined.is_empty() => joined
            .split(CONCAT_SEPARATOR)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
