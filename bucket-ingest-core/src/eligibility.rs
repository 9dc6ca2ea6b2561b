//! Decides whether a trigger event should start an ingestion.

use tracing::debug;

use crate::event::FileEvent;

/// Target directories plus the filename marker an eligible file must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRule {
    /// Trimmed, non-empty configured entries; each may carry a `gs://{bucket}/` prefix.
    pub target_paths: Vec<String>,
    /// Lowercase marker substring.
    pub marker: String,
}

impl EligibilityRule {
    /// Parse a comma-separated path list, skipping empty entries. The marker is lowercased.
    pub fn new(trigger_paths: &str, marker: &str) -> Self {
        Self {
            target_paths: trigger_paths
                .trim()
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            marker: marker.trim().to_lowercase(),
        }
    }
}

/// True iff the event's directory equals one configured target path and its lowercased
/// leaf name contains the marker. Path comparison is case-sensitive.
pub fn is_eligible(event: &FileEvent, rule: &EligibilityRule) -> bool {
    let file_name = event.leaf_name().trim().to_lowercase();
    let file_path = event.directory().trim();
    let bucket_prefix = format!("gs://{}/", event.bucket);

    for target in &rule.target_paths {
        let target_path = target.replacen(&bucket_prefix, "", 1);
        let target_path = target_path.trim();
        if target_path.is_empty() {
            continue;
        }
        if file_path == target_path && file_name.contains(&rule.marker) {
            debug!(file = %event.name, target = target_path, "[INGEST] Event matches trigger path");
            return true;
        }
    }
    debug!(file = %event.name, dir = file_path, "[INGEST] Event does not match any trigger path");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(paths: &str) -> EligibilityRule {
        EligibilityRule::new(paths, "sales_forecast")
    }

    #[test]
    fn accepts_matching_directory_and_marker() {
        let ev = FileEvent::new("b", "in/sales_forecast_daily.csv");
        assert!(is_eligible(&ev, &rule("in")));
    }

    #[test]
    fn marker_is_case_insensitive() {
        let ev = FileEvent::new("b", "in/Sales_Forecast_WEEKLY.CSV");
        assert!(is_eligible(&ev, &rule("in")));
    }

    #[test]
    fn directory_is_case_sensitive() {
        let ev = FileEvent::new("b", "IN/sales_forecast.csv");
        assert!(!is_eligible(&ev, &rule("in")));
    }

    #[test]
    fn rejects_missing_marker_even_in_target_directory() {
        let ev = FileEvent::new("b", "in/inventory_daily.csv");
        assert!(!is_eligible(&ev, &rule("in")));
    }

    #[test]
    fn rejects_nested_or_parent_directories() {
        assert!(!is_eligible(&FileEvent::new("b", "in/sub/sales_forecast.csv"), &rule("in")));
        assert!(!is_eligible(&FileEvent::new("b", "sales_forecast.csv"), &rule("in")));
    }

    #[test]
    fn strips_bucket_uri_and_whitespace_from_targets() {
        let r = rule(" gs://b/out, gs://b/in ");
        assert!(is_eligible(&FileEvent::new("b", "in/sales_forecast.csv"), &r));
        assert!(is_eligible(&FileEvent::new("b", "out/sales_forecast.csv"), &r));
    }

    #[test]
    fn bucket_prefix_of_another_bucket_is_not_stripped() {
        let r = rule("gs://other/in");
        assert!(!is_eligible(&FileEvent::new("b", "in/sales_forecast.csv"), &r));
    }

    #[test]
    fn empty_entries_never_match_root_level_objects() {
        let r = rule("in,");
        assert_eq!(r.target_paths, vec!["in".to_string()]);
        assert!(!is_eligible(&FileEvent::new("b", "sales_forecast.csv"), &r));
        assert!(!is_eligible(&FileEvent::new("b", "sales_forecast.csv"), &rule("gs://b/")));
        assert!(is_eligible(&FileEvent::new("b", "in/sales_forecast.csv"), &r));
    }
}
