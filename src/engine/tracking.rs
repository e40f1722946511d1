use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::tracking::TrackingEvent;
use crate::state::AppState;

/// Builds a tracking id of the form `PCL-YYYYMMDD-XXXXXXXX`.
pub fn new_tracking_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("PCL-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Appends one event to the log for `tracking_id` and notifies live subscribers.
pub fn append_event(
    state: &AppState,
    tracking_id: &str,
    parcel_id: Uuid,
    status: &str,
    message: String,
    updated_by: &str,
) -> TrackingEvent {
    let event = TrackingEvent {
        id: Uuid::new_v4(),
        tracking_id: tracking_id.to_string(),
        parcel_id,
        status: status.to_string(),
        message,
        updated_by: updated_by.to_string(),
        time: Utc::now(),
    };

    state
        .tracking
        .entry(event.tracking_id.clone())
        .or_default()
        .push(event.clone());
    state.metrics.tracking_events_total.inc();

    // no receivers is fine
    let _ = state.tracking_events_tx.send(event.clone());

    debug!(tracking_id = %event.tracking_id, status = %event.status, "tracking event appended");
    event
}

/// Every event recorded for `tracking_id`, oldest first.
pub fn events_for(state: &AppState, tracking_id: &str) -> Vec<TrackingEvent> {
    let mut events = state
        .tracking
        .get(tracking_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    events.sort_by_key(|event| event.time);
    events
}

#[cfg(test)]
mod tests {
    use super::new_tracking_id;

    #[test]
    fn tracking_id_has_prefix_date_and_suffix() {
        let id = new_tracking_id();
        let parts: Vec<&str> = id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PCL");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert_eq!(parts[2], parts[2].to_uppercase());
    }

    #[test]
    fn tracking_ids_are_unique() {
        assert_ne!(new_tracking_id(), new_tracking_id());
    }
}
