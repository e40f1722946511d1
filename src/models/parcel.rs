use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    NotCollected,
    InTransit,
    Delivered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiderMoney {
    None,
    CashedOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParcelType {
    Document,
    NonDocument,
}

/// Position of a parcel in its delivery lifecycle, derived from its fields.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Created,
    Paid,
    RiderAssigned,
    InTransit,
    Delivered,
    CashedOut,
}

impl LifecycleStage {
    pub fn label(self) -> &'static str {
        match self {
            LifecycleStage::Created => "submitted",
            LifecycleStage::Paid => "paid",
            LifecycleStage::RiderAssigned => "rider_assigned",
            LifecycleStage::InTransit => "in_transit",
            LifecycleStage::Delivered => "delivered",
            LifecycleStage::CashedOut => "cashed_out",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
    pub title: String,
    pub parcel_type: ParcelType,
    pub weight_kg: Option<f64>,
    pub sender_name: String,
    pub sender_district: String,
    pub receiver_name: String,
    pub receiver_district: String,
    pub receiver_address: String,
    pub cost: f64,
    pub created_by: String,
    pub creation_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub assigned_rider: Option<Uuid>,
    pub rider_email: Option<String>,
    pub rider_money: RiderMoney,
    pub rider_earning: Option<f64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cashed_out_at: Option<DateTime<Utc>>,
}

impl Parcel {
    pub fn stage(&self) -> LifecycleStage {
        match (self.delivery_status, self.rider_money) {
            (DeliveryStatus::Delivered, RiderMoney::CashedOut) => LifecycleStage::CashedOut,
            (DeliveryStatus::Delivered, RiderMoney::None) => LifecycleStage::Delivered,
            (DeliveryStatus::InTransit, _) => LifecycleStage::InTransit,
            (DeliveryStatus::NotCollected, _) if self.assigned_rider.is_some() => {
                LifecycleStage::RiderAssigned
            }
            (DeliveryStatus::NotCollected, _) if self.payment_status == PaymentStatus::Paid => {
                LifecycleStage::Paid
            }
            (DeliveryStatus::NotCollected, _) => LifecycleStage::Created,
        }
    }

    pub fn is_same_district(&self) -> bool {
        self.sender_district.trim().eq_ignore_ascii_case(self.receiver_district.trim())
    }
}
