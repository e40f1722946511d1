use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    Pending,
    Active,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Idle,
    InDelivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub district: String,
    pub status: RiderStatus,
    pub work_status: WorkStatus,
    pub total_earning: f64,
    pub created_at: DateTime<Utc>,
}

impl Rider {
    pub fn is_available(&self) -> bool {
        self.status == RiderStatus::Active && self.work_status == WorkStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiderEarnings {
    pub total_earning: f64,
    pub cashed_out: f64,
    pub pending_cashout: f64,
    pub delivered_count: usize,
}
