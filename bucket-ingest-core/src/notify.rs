//! Best-effort failure alerts.
//!
//! Delivery problems are logged and swallowed: every caller is already on a failed path.

use tracing::{error, info};

use crate::contract::{Notifier, TableRef};
use crate::error::IngestError;
use crate::event::FileEvent;

pub struct NotificationGateway<'a> {
    notifier: &'a dyn Notifier,
}

impl<'a> NotificationGateway<'a> {
    pub fn new(notifier: &'a dyn Notifier) -> Self {
        Self { notifier }
    }

    /// Send `message`. Returns whether it was delivered; never fails.
    pub async fn notify(&self, message: &str) -> bool {
        match self.notifier.send_email(message).await {
            Ok(()) => {
                info!("[NOTIFY] Notification sent");
                true
            }
            Err(e) => {
                let e = IngestError::NotificationDelivery(e);
                error!(error = %e, message, "[NOTIFY] Could not deliver notification");
                false
            }
        }
    }
}

/// Alert for a load that failed. Names the object and table and asks for a replay.
pub fn load_failure_message(event: &FileEvent, table: &TableRef, cause: &IngestError) -> String {
    format!(
        "The file '{}/{}' has failed to store in {} ({}). Please replay the file into the trigger location gs://{}/{}.",
        event.bucket,
        event.name,
        table,
        cause,
        event.bucket,
        replay_location(event),
    )
}

/// Alert for a file whose checksum did not verify before loading.
pub fn integrity_failure_message(event: &FileEvent, table: &TableRef, cause: &IngestError) -> String {
    format!(
        "The file '{}/{}' was not loaded into {} because its checksum could not be verified ({}). Please replay a verified copy into the trigger location gs://{}/{}.",
        event.bucket,
        event.name,
        table,
        cause,
        event.bucket,
        replay_location(event),
    )
}

/// Alert for a successful load the tracking service did not acknowledge.
pub fn inconsistency_message(event: &FileEvent, table: &TableRef, response: &str) -> String {
    format!(
        "The file '{}' was stored in {} but the tracking service did not confirm the SUCCESS status update (response: '{}'). The run status was not checked.",
        event.name, table, response,
    )
}

fn replay_location(event: &FileEvent) -> String {
    match event.directory() {
        "" => String::new(),
        dir => format!("{dir}/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableRef {
        TableRef {
            project_id: "p".into(),
            dataset_id: "d".into(),
            table_id: "t".into(),
        }
    }

    #[test]
    fn failure_message_names_object_table_and_replay() {
        let ev = FileEvent::new("b", "in/sales_forecast.csv");
        let cause = IngestError::LoadTimeout {
            table: "p:d.t".into(),
            secs: 5,
        };
        let msg = load_failure_message(&ev, &table(), &cause);
        assert!(msg.contains("'b/in/sales_forecast.csv'"));
        assert!(msg.contains("p:d.t"));
        assert!(msg.contains("replay"));
        assert!(msg.contains("gs://b/in/"));
    }

    #[test]
    fn inconsistency_message_names_file_and_response() {
        let ev = FileEvent::new("b", "in/sales_forecast.csv");
        let msg = inconsistency_message(&ev, &table(), "Not found");
        assert!(msg.contains("in/sales_forecast.csv"));
        assert!(msg.contains("Not found"));
    }
}
