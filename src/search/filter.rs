//! Facet predicates applied to candidate documents

use std::collections::HashSet;

fn normalized(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

/// True when any wanted value appears in the comma-separated field.
/// An empty filter places no constraint; a missing field never matches a non-empty one.
pub fn csv_contains_any(csv: Option<&str>, wanted: &[String]) -> bool {
    let wanted: HashSet<String> = wanted.iter().filter_map(|w| normalized(w)).collect();
    if wanted.is_empty() {
        return true;
    }

    csv.unwrap_or_default()
        .split(',')
        .filter_map(normalized)
        .any(|value| wanted.contains(&value))
}

/// `start` alone means an exact year, `start` and `end` an inclusive range.
/// `end` without `start` places no constraint.
pub fn year_matches(year: Option<i32>, start: Option<i32>, end: Option<i32>) -> bool {
    match (start, end) {
        (None, _) => true,
        (Some(start), None) => year == Some(start),
        (Some(start), Some(end)) => year.is_some_and(|y| (start..=end).contains(&y)),
    }
}

/// Case-insensitive exact match on the trimmed location
pub fn location_matches(location: Option<&str>, wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted.and_then(normalized) else {
        return true;
    };
    location.and_then(normalized).as_deref() == Some(wanted.as_str())
}
