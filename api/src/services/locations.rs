//! Location search, metro grouping and the comparison selection set.

use std::collections::HashMap;

use crate::models::Location;

/// Group name for locations without a locality.
pub const OTHER_LOCATIONS: &str = "Other Locations";

/// Maximum number of locations in a trend comparison.
pub const MAX_COMPARISON_LOCATIONS: usize = 5;

/// Restricts locations to one metro area, or lets all through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetroFilter {
    #[default]
    All,
    Metro(String),
}

impl MetroFilter {
    /// Parse a query value. Empty or `"all"` means no restriction.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => MetroFilter::All,
            Some(metro) => MetroFilter::Metro(metro.to_string()),
        }
    }

    fn matches(&self, location: &Location) -> bool {
        match self {
            MetroFilter::All => true,
            MetroFilter::Metro(metro) => {
                location.locality.as_deref().map(str::trim) == Some(metro.as_str())
            }
        }
    }
}

/// Locations sharing one locality.
#[derive(Debug, Clone)]
pub struct LocationGroup {
    pub metro: String,
    pub locations: Vec<Location>,
}

fn group_key(location: &Location) -> &str {
    location
        .locality
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(OTHER_LOCATIONS)
}

/// Filter by name substring (case-insensitive) and metro, then group by
/// locality.
///
/// Groups come largest first (ties keep first-seen order); locations within
/// a group are sorted by name, ignoring case.
pub fn filter_and_group(
    locations: &[Location],
    search_term: &str,
    metro: &MetroFilter,
) -> Vec<LocationGroup> {
    let needle = search_term.trim().to_lowercase();

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Location>> = HashMap::new();

    for location in locations
        .iter()
        .filter(|l| l.name.to_lowercase().contains(&needle))
        .filter(|l| metro.matches(l))
    {
        let key = group_key(location);
        if !buckets.contains_key(key) {
            order.push(key.to_string());
        }
        buckets
            .entry(key.to_string())
            .or_default()
            .push(location.clone());
    }

    let mut groups: Vec<LocationGroup> = order
        .into_iter()
        .filter_map(|metro| {
            let mut members = buckets.remove(&metro)?;
            members.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.name.cmp(&b.name))
            });
            Some(LocationGroup {
                metro,
                locations: members,
            })
        })
        .collect();

    // sort_by is stable, so equal-sized groups keep first-seen order
    groups.sort_by(|a, b| b.locations.len().cmp(&a.locations.len()));
    groups
}

/// Distinct, non-empty localities in alphabetical order.
pub fn metro_areas(locations: &[Location]) -> Vec<String> {
    let mut metros: Vec<String> = locations
        .iter()
        .filter_map(|l| l.locality.as_deref().map(str::trim))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    metros.sort();
    metros.dedup();
    metros
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("at most {0} locations can be compared")]
    Full(usize),
}

/// Result of a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Ordered set of location ids selected for comparison, capped at
/// [`MAX_COMPARISON_LOCATIONS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<i64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from ids, ignoring duplicates. Fails if more than
    /// the cap remain.
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Result<Self, SelectionError> {
        let mut selection = Self::new();
        for id in ids {
            if !selection.contains(id) {
                selection.toggle(id)?;
            }
        }
        Ok(selection)
    }

    /// Remove `id` if selected, otherwise add it. Adding to a full selection
    /// fails and leaves the selection untouched.
    pub fn toggle(&mut self, id: i64) -> Result<Toggled, SelectionError> {
        if let Some(pos) = self.ids.iter().position(|&x| x == id) {
            self.ids.remove(pos);
            return Ok(Toggled::Removed);
        }
        if self.ids.len() >= MAX_COMPARISON_LOCATIONS {
            return Err(SelectionError::Full(MAX_COMPARISON_LOCATIONS));
        }
        self.ids.push(id);
        Ok(Toggled::Added)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(id: i64, name: &str, locality: Option<&str>) -> Location {
        Location {
            id,
            openaq_id: None,
            name: name.to_string(),
            locality: locality.map(str::to_string),
            country_code: None,
            latitude: 0.0,
            longitude: 0.0,
            is_mobile: false,
            last_updated: None,
            aqi: None,
            sensors: Vec::new(),
        }
    }

    fn fixture() -> Vec<Location> {
        vec![
            loc(1, "West Phoenix", Some("Phoenix")),
            loc(2, "houston North Loop", Some("Houston")),
            loc(3, "Houston Deer Park", Some("Houston")),
            loc(4, "Morro Bay", None),
            loc(5, "Bayland Park", Some("Houston")),
            loc(6, "Empty Locality", Some("  ")),
        ]
    }

    fn ids(groups: &[LocationGroup]) -> Vec<Vec<i64>> {
        groups
            .iter()
            .map(|g| g.locations.iter().map(|l| l.id).collect())
            .collect()
    }

    #[test]
    fn test_groups_largest_first_and_sorted_by_name() {
        let groups = filter_and_group(&fixture(), "", &MetroFilter::All);
        let metros: Vec<&str> = groups.iter().map(|g| g.metro.as_str()).collect();
        assert_eq!(metros, vec!["Houston", "Other Locations", "Phoenix"]);
        // Case-insensitive name order
        assert_eq!(ids(&groups)[0], vec![5, 3, 2]);
    }

    #[test]
    fn test_missing_or_blank_locality_is_other() {
        let groups = filter_and_group(&fixture(), "", &MetroFilter::All);
        let other = groups.iter().find(|g| g.metro == OTHER_LOCATIONS).unwrap();
        let mut other_ids: Vec<i64> = other.locations.iter().map(|l| l.id).collect();
        other_ids.sort();
        assert_eq!(other_ids, vec![4, 6]);
    }

    #[test]
    fn test_search_case_insensitive() {
        let groups = filter_and_group(&fixture(), "HOUSTON", &MetroFilter::All);
        assert_eq!(ids(&groups), vec![vec![3, 2]]);
    }

    #[test]
    fn test_search_no_match_is_empty() {
        let groups = filter_and_group(&fixture(), "zzz", &MetroFilter::All);
        let total: usize = groups.iter().map(|g| g.locations.len()).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_metro_filter_exact() {
        let groups = filter_and_group(&fixture(), "", &MetroFilter::parse(Some("Phoenix")));
        assert_eq!(ids(&groups), vec![vec![1]]);
        let groups = filter_and_group(&fixture(), "", &MetroFilter::parse(Some("phoenix")));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_metro_filter_ignores_locality_padding() {
        let locations = vec![
            loc(1, "Deer Park", Some("Houston ")),
            loc(2, "Aldine", Some("Houston")),
        ];
        assert_eq!(metro_areas(&locations), vec!["Houston"]);

        let groups = filter_and_group(&locations, "", &MetroFilter::parse(Some("Houston")));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].locations.len(), 2);
    }

    #[test]
    fn test_metro_filter_parse() {
        assert_eq!(MetroFilter::parse(None), MetroFilter::All);
        assert_eq!(MetroFilter::parse(Some("all")), MetroFilter::All);
        assert_eq!(MetroFilter::parse(Some("")), MetroFilter::All);
        assert_eq!(
            MetroFilter::parse(Some("Houston")),
            MetroFilter::Metro("Houston".to_string())
        );
    }

    #[test]
    fn test_grouping_round_trip_is_filtered_multiset() {
        let input = fixture();
        let groups = filter_and_group(&input, "park", &MetroFilter::All);
        let mut flattened: Vec<i64> = groups
            .iter()
            .flat_map(|g| g.locations.iter().map(|l| l.id))
            .collect();
        flattened.sort();
        let mut expected: Vec<i64> = input
            .iter()
            .filter(|l| l.name.to_lowercase().contains("park"))
            .map(|l| l.id)
            .collect();
        expected.sort();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_metro_areas_sorted_distinct() {
        assert_eq!(metro_areas(&fixture()), vec!["Houston", "Phoenix"]);
    }

    #[test]
    fn test_selection_toggle_add_remove() {
        let mut sel = Selection::new();
        assert_eq!(sel.toggle(1), Ok(Toggled::Added));
        assert_eq!(sel.toggle(2), Ok(Toggled::Added));
        assert_eq!(sel.toggle(1), Ok(Toggled::Removed));
        assert_eq!(sel.ids(), &[2]);
    }

    #[test]
    fn test_selection_rejects_sixth() {
        let mut sel = Selection::from_ids(1..=5).unwrap();
        let before = sel.clone();
        assert_eq!(sel.toggle(6), Err(SelectionError::Full(5)));
        assert_eq!(sel, before);
        assert_eq!(sel.len(), 5);
        // Removing still works when full
        assert_eq!(sel.toggle(3), Ok(Toggled::Removed));
        assert_eq!(sel.toggle(6), Ok(Toggled::Added));
    }

    #[test]
    fn test_selection_from_ids_dedups() {
        let sel = Selection::from_ids([4, 4, 7, 4]).unwrap();
        assert_eq!(sel.ids(), &[4, 7]);
        assert!(Selection::from_ids(1..=6).is_err());
    }
}
