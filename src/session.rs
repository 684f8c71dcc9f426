//! State snapshot export and restore.
//!
//! A snapshot is a JSON document with one entry per state slice, keyed by
//! slice name. Restoring validates the whole document before anything is
//! applied, so a malformed file can never leave the app with half-restored
//! state.

use crate::filter::FiltersState;
use crate::intervals::{CandidateInterval, Interval};
use crate::layout::PanelVisibility;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Bumped whenever a slice changes shape incompatibly.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not read snapshot file: {0}")]
    Read(std::io::Error),
    #[error("could not write snapshot file: {0}")]
    Write(std::io::Error),
    #[error("snapshot is not valid: {0}")]
    Invalid(serde_json::Error),
    #[error("snapshot version {found} is not supported (expected {SNAPSHOT_VERSION})")]
    Version { found: u32 },
}

/// All restorable state slices, keyed by name. Unknown keys are rejected so
/// a file written by a different declaration order or version cannot be
/// silently mis-assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    pub filters: FiltersState,
    pub interval_a: Interval,
    pub interval_b: Interval,
    pub candidates: Vec<CandidateInterval>,
    pub visibility: PanelVisibility,
}

impl Snapshot {
    pub fn new(
        filters: FiltersState,
        interval_a: Interval,
        interval_b: Interval,
        candidates: Vec<CandidateInterval>,
        visibility: PanelVisibility,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            filters,
            interval_a,
            interval_b,
            candidates,
            visibility,
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SnapshotError::Write)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SnapshotError::Invalid)?;
        std::fs::write(path, json).map_err(SnapshotError::Write)
    }

    /// Parse and validate a snapshot file. Nothing is applied here; the
    /// caller assigns the slices only after this returns `Ok`.
    pub fn load_from(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(SnapshotError::Read)?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(SnapshotError::Invalid)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FieldName;

    fn sample_snapshot() -> Snapshot {
        let mut filters = FiltersState::default();
        filters.add_filter(FieldName::Area);
        filters.add_filter(FieldName::StartTime);

        let mut state = crate::intervals::ComparisonState::default();
        state.save_candidate(CandidateInterval {
            min: 1_451_606_400_000,
            max: 1_454_284_800_000,
        });
        state.assign_candidate(0);

        Snapshot::new(
            filters,
            state.interval_a,
            state.interval_b,
            state.candidates,
            PanelVisibility::default(),
        )
    }

    #[test]
    fn snapshot_round_trips_through_file() {
        let dir = std::env::temp_dir().join("rainfall-dashboard-test-roundtrip");
        let path = dir.join("snapshot.json");
        let snapshot = sample_snapshot();

        snapshot.save_to(&path).unwrap();
        let restored = Snapshot::load_from(&path).unwrap();
        assert_eq!(restored, snapshot);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_slice_names_are_rejected() {
        let result: Result<Snapshot, _> = serde_json::from_str(
            r#"{"version": 1, "filters": {"fields": {}},
                "interval_a": {"start_date": null, "end_date": null},
                "interval_b": {"start_date": null, "end_date": null},
                "candidates": [], "visibility": {"comparison": true,
                "interval_a": true, "interval_b": true},
                "bogus_slice": 42}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_slices_are_rejected() {
        let result: Result<Snapshot, _> =
            serde_json::from_str(r#"{"version": 1, "filters": {"fields": {}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = std::env::temp_dir().join("rainfall-dashboard-test-version");
        let path = dir.join("snapshot.json");
        let mut snapshot = sample_snapshot();
        snapshot.version = 99;
        snapshot.save_to(&path).unwrap();

        match Snapshot::load_from(&path) {
            Err(SnapshotError::Version { found }) => assert_eq!(found, 99),
            other => panic!("expected version error, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join("rainfall-dashboard-does-not-exist.json");
        assert!(matches!(
            Snapshot::load_from(&path),
            Err(SnapshotError::Read(_))
        ));
    }
}
