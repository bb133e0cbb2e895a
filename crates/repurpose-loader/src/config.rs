use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Ten years.
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub reference: LoaderReferenceConfig,
    pub dataset: DatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderReferenceConfig {
    /// Path to the reference SQLite file read by the pipeline.
    pub sqlite_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Medicine dataset CSV (Name, Category, Dosage Form, Strength,
    /// Manufacturer, Indication, Classification).
    pub csv_path: String,
    /// Optional JSON array of pre-collected evidence and trend entries.
    #[serde(default)]
    pub evidence_path: Option<String>,
    /// How long imported rows stay visible to readers.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.reference.sqlite_path.trim().is_empty() {
            return Err(LoaderError::Config("reference.sqlite_path is empty".to_string()));
        }
        if self.dataset.csv_path.trim().is_empty() {
            return Err(LoaderError::Config("dataset.csv_path is empty".to_string()));
        }
        if self.dataset.ttl_seconds == 0 || self.dataset.ttl_seconds > MAX_TTL_SECONDS {
            return Err(LoaderError::Config(format!(
                "dataset.ttl_seconds must be between 1 and {MAX_TTL_SECONDS}"
            )));
        }
        Ok(())
    }
}

fn default_ttl() -> u64 {
    // 30 days
    30 * 24 * 60 * 60
}
