use serde::{Deserialize, Serialize};

/// Durable log of one committed patch session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    #[serde(rename = "patchtime")]
    pub timestamp: String,
    /// Target-relative paths copied into the backup root before overwrite.
    #[serde(rename = "backuplist", default)]
    pub backed_up: Vec<String>,
    #[serde(rename = "patchlist", default)]
    pub installed: Vec<InstalledFile>,
}

impl SessionRecord {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledFile {
    /// Source path relative to the patch root.
    pub src: String,
    /// Destination path relative to the target root.
    pub dst: String,
}

/// Files a generator created; reverting only deletes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedRecord {
    #[serde(rename = "transtime")]
    pub timestamp: String,
    #[serde(rename = "transfiles", default)]
    pub files: Vec<String>,
}

/// Local wall-clock time in the `YYYY-MM-DD HH:MM:SS` record format.
pub fn record_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
