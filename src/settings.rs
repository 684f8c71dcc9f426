//! Persistent settings for the dashboard app.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All persistable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the query/aggregation service.
    pub base_url: String,

    // Query defaults
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default = "default_min_entries_per_bin")]
    pub min_entries_per_bin: usize,

    // Client-side chart quantiles
    #[serde(default = "default_stat_quantile")]
    pub stat_quantile: f64,
    #[serde(default = "default_outlier_quantile")]
    pub outlier_quantile: f64,

    #[serde(default = "default_true")]
    pub timeline_enabled: bool,
}

fn default_query_limit() -> usize {
    10_000
}

fn default_bins() -> usize {
    20
}

fn default_min_entries_per_bin() -> usize {
    5
}

fn default_stat_quantile() -> f64 {
    0.99
}

fn default_outlier_quantile() -> f64 {
    0.999
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            query_limit: default_query_limit(),
            bins: default_bins(),
            min_entries_per_bin: default_min_entries_per_bin(),
            stat_quantile: default_stat_quantile(),
            outlier_quantile: default_outlier_quantile(),
            timeline_enabled: true,
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("rainfall-dashboard");
            p.push("settings.json");
            p
        })
    }

    /// Default location for state snapshot exports (same directory as the
    /// settings file).
    pub fn snapshot_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("rainfall-dashboard");
            p.push("snapshot.json");
            p
        })
    }

    /// Load settings from disk, returning defaults if the file doesn't exist
    /// or is invalid.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            tracing::warn!("could not determine config directory, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse settings file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist yet, that's fine
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            tracing::warn!("could not determine config directory, settings not saved");
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!(error = %e, "failed to create config directory");
                return;
            }
        }

        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::error!(error = %e, "failed to write settings file");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize settings");
            }
        }
    }
}
