//! Persisted migration history.
//!
//! Each diff run's [`MigrationSet`] is recorded as one JSON document in a
//! history directory; the latest recorded target schema and version become
//! the base for the next run. Recording a version twice is refused, which
//! replaces the host build tool's process-global "already generated" flags
//! with an explicit persisted check.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::migration::MigrationSet;
use crate::schema::SchemaSnapshot;

/// A migration set as stored on disk, stamped with the recording time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMigrationSet {
    /// When the set was recorded.
    pub recorded_at: DateTime<Utc>,
    /// The recorded migration set.
    #[serde(flatten)]
    pub set: MigrationSet,
}

/// Directory-backed store of recorded migration sets.
#[derive(Debug, Clone)]
pub struct MigrationHistory {
    dir: PathBuf,
}

impl MigrationHistory {
    /// Creates a history store rooted at `dir`. The directory is created
    /// lazily on the first `record`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, version: u32) -> PathBuf {
        self.dir.join(format!("migration_v{version}.json"))
    }

    /// Returns all recorded schema versions in ascending order. An absent
    /// directory means an empty history, not an error.
    pub fn versions(&self) -> Result<Vec<u32>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(version) = name
                .strip_prefix("migration_v")
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|v| v.parse::<u32>().ok())
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Whether a migration set for `version` has already been recorded.
    #[must_use]
    pub fn is_planned(&self, version: u32) -> bool {
        self.path_for(version).exists()
    }

    /// Loads the recorded migration set for `version`.
    pub fn load(&self, version: u32) -> Result<RecordedMigrationSet> {
        let path = self.path_for(version);
        if !path.exists() {
            return Err(MigrateError::HistoryEntryNotFound(path));
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads the most recently recorded migration set, if any.
    pub fn latest(&self) -> Result<Option<RecordedMigrationSet>> {
        match self.versions()?.last() {
            Some(version) => Ok(Some(self.load(*version)?)),
            None => Ok(None),
        }
    }

    /// Returns the base snapshot and source version for the next diff run:
    /// the latest recorded target schema, or an empty snapshot at version 0
    /// when nothing has been recorded yet.
    pub fn base_for_next_run(&self) -> Result<(SchemaSnapshot, u32)> {
        match self.latest()? {
            Some(recorded) => {
                debug!(db_version = recorded.set.db_version, "loaded base schema");
                Ok((recorded.set.target_schema, recorded.set.db_version))
            }
            None => Ok((SchemaSnapshot::new(), 0)),
        }
    }

    /// Records a migration set, refusing to overwrite an already-planned
    /// version.
    pub fn record(&self, set: &MigrationSet) -> Result<PathBuf> {
        if self.is_planned(set.db_version) {
            return Err(MigrateError::VersionAlreadyPlanned(set.db_version));
        }

        fs::create_dir_all(&self.dir)?;
        let recorded = RecordedMigrationSet {
            recorded_at: Utc::now(),
            set: set.clone(),
        };
        let path = self.path_for(set.db_version);
        fs::write(&path, serde_json::to_string_pretty(&recorded)?)?;
        info!(db_version = set.db_version, path = %path.display(), "recorded migration set");
        Ok(path)
    }

    /// The history directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffGenerator;
    use crate::migration::{Migration, MigrationKind};
    use crate::schema::{Column, SqlType, Table};

    fn sample_set(version: u32) -> MigrationSet {
        let target = SchemaSnapshot::new().table(
            Table::new("com.example.User", "user")
                .column(Column::new("id", SqlType::Long))
                .column(Column::new("email", SqlType::Text).unique())
                .primary_key(vec!["id".to_string()]),
        );
        MigrationSet::new(
            version,
            vec![Migration::table(MigrationKind::CreateTable, "user")],
            target,
        )
    }

    #[test]
    fn test_empty_history_yields_empty_base() {
        let dir = tempfile::tempdir().unwrap();
        let history = MigrationHistory::new(dir.path().join("missing"));

        let (base, version) = history.base_for_next_run().unwrap();
        assert!(base.is_empty());
        assert_eq!(version, 0);
    }

    #[test]
    fn test_record_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let history = MigrationHistory::new(dir.path());

        let set = sample_set(1);
        history.record(&set).unwrap();

        assert!(history.is_planned(1));
        let loaded = history.load(1).unwrap();
        assert_eq!(loaded.set, set);

        let (base, version) = history.base_for_next_run().unwrap();
        assert_eq!(version, 1);
        assert_eq!(base, set.target_schema);
    }

    #[test]
    fn test_record_twice_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let history = MigrationHistory::new(dir.path());

        history.record(&sample_set(1)).unwrap();
        let err = history.record(&sample_set(1)).unwrap_err();
        assert!(matches!(err, MigrateError::VersionAlreadyPlanned(1)));
    }

    #[test]
    fn test_latest_picks_highest_version() {
        let dir = tempfile::tempdir().unwrap();
        let history = MigrationHistory::new(dir.path());

        history.record(&sample_set(1)).unwrap();
        history.record(&sample_set(2)).unwrap();
        history.record(&sample_set(10)).unwrap();

        assert_eq!(history.versions().unwrap(), vec![1, 2, 10]);
        assert_eq!(history.latest().unwrap().unwrap().set.db_version, 10);
    }

    #[test]
    fn test_round_trip_rediff_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = MigrationHistory::new(dir.path());

        let set = sample_set(1);
        history.record(&set).unwrap();
        let reloaded = history.load(1).unwrap();

        let diff = DiffGenerator::new()
            .generate(&reloaded.set.target_schema, &set.target_schema)
            .unwrap();
        assert!(diff.is_empty());
    }
}
