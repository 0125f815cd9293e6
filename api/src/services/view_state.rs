//! Dashboard view state as an immutable value driven by discrete actions.
//!
//! This is the state model for the dashboard client. The server never holds
//! view state; clients built on this crate drive `reduce` with the results
//! of the `/api/v1` endpoints.
//!
//! Every selection change bumps `generation`. Series results carry the
//! generation of the request that produced them, and results from a
//! superseded generation are dropped: a slow fetch for an old selection
//! can never overwrite the data of a newer one.

use crate::models::SeriesMap;
use crate::services::locations::{MetroFilter, Selection, SelectionError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub selected_location: Option<i64>,
    pub selected_parameter: Option<i64>,
    pub comparison: Selection,
    pub search_term: String,
    pub metro_filter: MetroFilter,
    /// Identifies the outstanding series request
    pub generation: u64,
    pub loading: bool,
    pub series: SeriesMap<i64>,
    pub error: Option<String>,
    /// Non-fatal message for the user (e.g. comparison set full)
    pub notice: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Action {
    SelectLocation(i64),
    SelectParameter(i64),
    ToggleComparison(i64),
    SetSearchTerm(String),
    SetMetroFilter(MetroFilter),
    SeriesLoaded {
        generation: u64,
        series: SeriesMap<i64>,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
}

impl ViewState {
    /// Start a new series request: new generation, old data cleared.
    fn begin_load(mut self) -> Self {
        self.generation += 1;
        self.loading = true;
        self.series = SeriesMap::new();
        self.error = None;
        self
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

/// Apply `action` to `state`, returning the next state.
pub fn reduce(state: ViewState, action: Action) -> ViewState {
    match action {
        Action::SelectLocation(id) => {
            if state.selected_location == Some(id) {
                return state;
            }
            ViewState {
                selected_location: Some(id),
                notice: None,
                ..state
            }
            .begin_load()
        }
        Action::SelectParameter(id) => {
            if state.selected_parameter == Some(id) {
                return state;
            }
            ViewState {
                selected_parameter: Some(id),
                notice: None,
                ..state
            }
            .begin_load()
        }
        Action::ToggleComparison(id) => {
            let mut comparison = state.comparison.clone();
            match comparison.toggle(id) {
                Ok(_) => ViewState {
                    comparison,
                    notice: None,
                    ..state
                }
                .begin_load(),
                Err(SelectionError::Full(max)) => ViewState {
                    notice: Some(format!("You can compare at most {} locations", max)),
                    ..state
                },
            }
        }
        Action::SetSearchTerm(term) => ViewState {
            search_term: term,
            ..state
        },
        Action::SetMetroFilter(filter) => ViewState {
            metro_filter: filter,
            ..state
        },
        Action::SeriesLoaded { generation, series } => {
            if !state.is_current(generation) {
                tracing::debug!(
                    "discarding series for stale generation {} (current {})",
                    generation,
                    state.generation
                );
                return state;
            }
            ViewState {
                series,
                loading: false,
                error: None,
                ..state
            }
        }
        Action::LoadFailed {
            generation,
            message,
        } => {
            if !state.is_current(generation) {
                return state;
            }
            ViewState {
                loading: false,
                error: Some(message),
                ..state
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measurement;
    use chrono::{TimeZone, Utc};

    fn series(key: i64, value: f64) -> SeriesMap<i64> {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SeriesMap::from([(key, vec![Measurement::new(value, ts)])])
    }

    #[test]
    fn test_select_location_starts_load() {
        let s = reduce(ViewState::default(), Action::SelectLocation(3));
        assert_eq!(s.selected_location, Some(3));
        assert_eq!(s.generation, 1);
        assert!(s.loading);
    }

    #[test]
    fn test_reselecting_same_location_is_noop() {
        let s = reduce(ViewState::default(), Action::SelectLocation(3));
        let again = reduce(s.clone(), Action::SelectLocation(3));
        assert_eq!(again, s);
    }

    #[test]
    fn test_loaded_series_for_current_generation_applies() {
        let s = reduce(ViewState::default(), Action::SelectLocation(3));
        let gen = s.generation;
        let s = reduce(
            s,
            Action::SeriesLoaded {
                generation: gen,
                series: series(10, 4.0),
            },
        );
        assert!(!s.loading);
        assert_eq!(s.series.len(), 1);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let s = reduce(ViewState::default(), Action::SelectLocation(1));
        let stale_gen = s.generation;
        let s = reduce(s, Action::SelectLocation(2));
        let fresh_gen = s.generation;

        // Newer request finishes first
        let s = reduce(
            s,
            Action::SeriesLoaded {
                generation: fresh_gen,
                series: series(2, 20.0),
            },
        );
        // Slow older request arrives late
        let s = reduce(
            s,
            Action::SeriesLoaded {
                generation: stale_gen,
                series: series(1, 10.0),
            },
        );

        assert_eq!(s.selected_location, Some(2));
        assert!(s.series.contains_key(&2));
        assert!(!s.series.contains_key(&1));
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let s = reduce(ViewState::default(), Action::SelectParameter(1));
        let stale_gen = s.generation;
        let s = reduce(s, Action::SelectParameter(2));
        let s = reduce(
            s,
            Action::LoadFailed {
                generation: stale_gen,
                message: "boom".into(),
            },
        );
        assert!(s.loading);
        assert_eq!(s.error, None);
    }

    #[test]
    fn test_current_failure_recorded() {
        let s = reduce(ViewState::default(), Action::SelectParameter(1));
        let gen = s.generation;
        let s = reduce(
            s,
            Action::LoadFailed {
                generation: gen,
                message: "location not found".into(),
            },
        );
        assert!(!s.loading);
        assert_eq!(s.error.as_deref(), Some("location not found"));
    }

    #[test]
    fn test_toggle_beyond_cap_keeps_selection() {
        let mut s = ViewState::default();
        for id in 1..=5 {
            s = reduce(s, Action::ToggleComparison(id));
        }
        let gen = s.generation;
        let s = reduce(s, Action::ToggleComparison(6));
        assert_eq!(s.comparison.ids(), &[1, 2, 3, 4, 5]);
        assert_eq!(s.generation, gen);
        assert!(s.notice.is_some());
    }

    #[test]
    fn test_filters_do_not_refetch() {
        let s = reduce(ViewState::default(), Action::SetSearchTerm("park".into()));
        let s = reduce(
            s,
            Action::SetMetroFilter(MetroFilter::Metro("Houston".into())),
        );
        assert_eq!(s.generation, 0);
        assert_eq!(s.search_term, "park");
        assert!(!s.loading);
    }
}
