use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable entry in a parcel's tracking log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub tracking_id: String,
    pub parcel_id: Uuid,
    pub status: String,
    pub message: String,
    pub updated_by: String,
    pub time: DateTime<Utc>,
}
