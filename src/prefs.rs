//! Persisted dashboard preferences.
//!
//! Saved filters, the current filter and the view mode are the only
//! state this core persists. Storage is a single JSON blob behind a
//! small load/save interface with a best-effort contract: missing or
//! corrupt data resets to defaults and is logged, never an error the
//! caller has to handle at startup.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::FilterSpec;

/// How the task collection is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
    Kanban,
}

/// A named, reusable filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedFilter {
    pub name: String,
    pub filter: FilterSpec,
    pub created_at: DateTime<Utc>,
}

/// The persisted blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub saved_filters: Vec<SavedFilter>,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub filters: FilterSpec,
}

/// JSON-file persistence for [`Prefs`].
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, falling back to defaults on any problem.
    pub fn load(&self) -> Prefs {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No prefs file yet, using defaults");
                return Prefs::default();
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Could not read prefs file, using defaults"
                );
                return Prefs::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Prefs file is corrupt, resetting to defaults"
                );
                Prefs::default()
            }
        }
    }

    /// Persist preferences atomically (temp file, then rename).
    pub fn save(&self, prefs: &Prefs) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(prefs)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), "Saved prefs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortKey};
    use crate::task::TaskStatus;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("prefs.json"));
        let prefs = store.load();
        assert!(prefs.saved_filters.is_empty());
        assert_eq!(prefs.view_mode, ViewMode::Grid);
    }

    #[test]
    fn round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("nested").join("prefs.json"));

        let prefs = Prefs {
            saved_filters: vec![SavedFilter {
                name: "active work".to_string(),
                filter: FilterSpec::default()
                    .with_statuses([TaskStatus::Running, TaskStatus::Pending])
                    .with_sort(SortKey::Status, SortDirection::Ascending),
                created_at: Utc::now(),
            }],
            view_mode: ViewMode::Kanban,
            filters: FilterSpec::default().with_search("billing"),
        };
        store.save(&prefs).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.view_mode, ViewMode::Kanban);
        assert_eq!(loaded.saved_filters.len(), 1);
        assert_eq!(loaded.saved_filters[0].name, "active work");
        assert_eq!(loaded.filters.search, "billing");
        assert_eq!(
            loaded.saved_filters[0].filter.statuses,
            prefs.saved_filters[0].filter.statuses
        );
    }

    #[test]
    fn corrupt_file_resets_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json at all").unwrap();

        let store = PrefsStore::new(&path);
        let prefs = store.load();
        assert!(prefs.saved_filters.is_empty());
        assert_eq!(prefs.filters, FilterSpec::default());
    }

    #[test]
    fn partial_blob_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, r#"{"view_mode":"list"}"#).unwrap();

        let prefs = PrefsStore::new(&path).load();
        assert_eq!(prefs.view_mode, ViewMode::List);
        assert!(prefs.saved_filters.is_empty());
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefsStore::new(dir.path().join("prefs.json"));

        store.save(&Prefs::default()).unwrap();
        let mut prefs = Prefs::default();
        prefs.view_mode = ViewMode::List;
        store.save(&prefs).unwrap();

        assert_eq!(store.load().view_mode, ViewMode::List);
    }
}
