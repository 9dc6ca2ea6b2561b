//! The storage trigger event and the path pieces derived from it.

use serde::{Deserialize, Serialize};

/// An object-created notification. `name` is the full object key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub bucket: String,
    pub name: String,
    /// Object generation, when the trigger supplies it.
    #[serde(default)]
    pub generation: Option<String>,
}

impl FileEvent {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
            generation: None,
        }
    }

    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }

    /// Directory component of the key: everything before the last `/`, or empty.
    pub fn directory(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        }
    }

    /// Leaf file name: the last `/`-separated segment.
    pub fn leaf_name(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((_, leaf)) => leaf,
            None => &self.name,
        }
    }

    /// `gs://{bucket}/{name}`
    pub fn source_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }

    /// Key identifying one delivery target: the same object generation always maps to
    /// the same key.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}/{}#{}",
            self.bucket,
            self.name,
            self.generation.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_directory_and_leaf() {
        let ev = FileEvent::new("b", "in/sub/sales_forecast_daily.csv");
        assert_eq!(ev.directory(), "in/sub");
        assert_eq!(ev.leaf_name(), "sales_forecast_daily.csv");
    }

    #[test]
    fn key_without_slash_has_empty_directory() {
        let ev = FileEvent::new("b", "sales_forecast.csv");
        assert_eq!(ev.directory(), "");
        assert_eq!(ev.leaf_name(), "sales_forecast.csv");
    }

    #[test]
    fn dedup_key_includes_generation() {
        let ev = FileEvent::new("b", "in/x.csv");
        assert_eq!(ev.dedup_key(), "b/in/x.csv#-");
        assert_eq!(ev.with_generation("17").dedup_key(), "b/in/x.csv#17");
    }

    #[test]
    fn deserializes_trigger_payload_ignoring_unknown_fields() {
        let raw = r#"{"bucket":"b","name":"in/a.csv","generation":"42","contentType":"text/csv"}"#;
        let ev: FileEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.generation.as_deref(), Some("42"));
        assert_eq!(ev.source_uri(), "gs://b/in/a.csv");
    }
}
