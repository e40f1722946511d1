use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EarningRates;
use crate::engine::tracking::{append_event, new_tracking_id};
use crate::error::AppError;
use crate::models::parcel::{
    DeliveryStatus, LifecycleStage, Parcel, ParcelType, PaymentStatus, RiderMoney,
};
use crate::models::payment::Payment;
use crate::models::rider::{Rider, RiderStatus, WorkStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ParcelDraft {
    pub title: String,
    pub parcel_type: ParcelType,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub sender_name: String,
    pub sender_district: String,
    pub receiver_name: String,
    pub receiver_district: String,
    pub receiver_address: String,
    pub cost: f64,
}

#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub parcel_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: String,
}

/// Whether moving from `current` to `target` changes anything.
///
/// Equal stages are a no-op, backwards moves are rejected.
fn advances(current: LifecycleStage, target: LifecycleStage) -> Result<bool, AppError> {
    if current == target {
        return Ok(false);
    }
    if current > target {
        return Err(AppError::Conflict(format!(
            "parcel is already {}, cannot move to {}",
            current.label(),
            target.label()
        )));
    }
    Ok(true)
}

pub fn rider_earning(rates: &EarningRates, parcel: &Parcel) -> f64 {
    let rate = if parcel.is_same_district() {
        rates.same_district
    } else {
        rates.cross_district
    };
    (parcel.cost * rate * 100.0).round() / 100.0
}

fn load_parcel(state: &AppState, parcel_id: Uuid) -> Result<Parcel, AppError> {
    state
        .parcels
        .get(&parcel_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))
}

fn ensure_assigned_to(parcel: &Parcel, rider_email: &str) -> Result<(), AppError> {
    if parcel.rider_email.as_deref() != Some(rider_email) {
        return Err(AppError::Forbidden(
            "parcel is not assigned to this rider".to_string(),
        ));
    }
    Ok(())
}

fn release_rider(state: &AppState, rider_id: Uuid, earning: f64) {
    if let Some(mut rider) = state.riders.get_mut(&rider_id) {
        if rider.work_status == WorkStatus::InDelivery {
            state.metrics.riders_in_delivery.dec();
        }
        rider.work_status = WorkStatus::Idle;
        rider.total_earning += earning;
    }
}

pub fn create_parcel(state: &AppState, creator: &str, draft: ParcelDraft) -> Result<Parcel, AppError> {
    if draft.title.trim().is_empty() {
        return Err(AppError::BadRequest("title cannot be empty".to_string()));
    }
    if draft.sender_district.trim().is_empty() || draft.receiver_district.trim().is_empty() {
        return Err(AppError::BadRequest(
            "sender_district and receiver_district are required".to_string(),
        ));
    }
    if !draft.cost.is_finite() || draft.cost < 0.0 {
        return Err(AppError::BadRequest("cost must be >= 0".to_string()));
    }

    let parcel = Parcel {
        id: Uuid::new_v4(),
        tracking_id: new_tracking_id(),
        title: draft.title,
        parcel_type: draft.parcel_type,
        weight_kg: draft.weight_kg,
        sender_name: draft.sender_name,
        sender_district: draft.sender_district,
        receiver_name: draft.receiver_name,
        receiver_district: draft.receiver_district,
        receiver_address: draft.receiver_address,
        cost: draft.cost,
        created_by: creator.to_string(),
        creation_date: Utc::now(),
        payment_status: PaymentStatus::Unpaid,
        delivery_status: DeliveryStatus::NotCollected,
        assigned_rider: None,
        rider_email: None,
        rider_money: RiderMoney::None,
        rider_earning: None,
        assigned_at: None,
        picked_up_at: None,
        delivered_at: None,
        cashed_out_at: None,
    };

    state.parcels.insert(parcel.id, parcel.clone());
    state.metrics.record_transition(LifecycleStage::Created.label());
    append_event(
        state,
        &parcel.tracking_id,
        parcel.id,
        LifecycleStage::Created.label(),
        format!("Parcel created by {creator}"),
        creator,
    );

    info!(parcel_id = %parcel.id, tracking_id = %parcel.tracking_id, "parcel created");
    Ok(parcel)
}

pub async fn record_payment(
    state: &AppState,
    payer: &str,
    draft: PaymentDraft,
) -> Result<Payment, AppError> {
    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(AppError::BadRequest("amount must be > 0".to_string()));
    }
    if draft.transaction_id.trim().is_empty() {
        return Err(AppError::BadRequest("transaction id is required".to_string()));
    }

    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, draft.parcel_id)?;
    if parcel.payment_status == PaymentStatus::Paid {
        return Err(AppError::Conflict(format!(
            "parcel {} is already paid",
            parcel.id
        )));
    }

    if let Some(mut stored) = state.parcels.get_mut(&parcel.id) {
        stored.payment_status = PaymentStatus::Paid;
    }

    let payment = Payment {
        id: Uuid::new_v4(),
        parcel_id: parcel.id,
        email: payer.to_string(),
        amount: draft.amount,
        payment_method: draft.payment_method,
        transaction_id: draft.transaction_id,
        paid_at: Utc::now(),
    };
    state.payments.insert(payment.id, payment.clone());
    state.metrics.payments_total.inc();
    state.metrics.record_transition(LifecycleStage::Paid.label());

    append_event(
        state,
        &parcel.tracking_id,
        parcel.id,
        LifecycleStage::Paid.label(),
        format!("Payment of {:.2} completed by {payer}", payment.amount),
        payer,
    );

    info!(parcel_id = %parcel.id, payment_id = %payment.id, "payment recorded");
    Ok(payment)
}

pub async fn assign_rider(
    state: &AppState,
    parcel_id: Uuid,
    rider_id: Uuid,
    actor: &str,
) -> Result<(Parcel, Rider), AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, parcel_id)?;
    let rider = state
        .riders
        .get(&rider_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    if parcel.stage() == LifecycleStage::Created {
        return Err(AppError::Conflict(
            "parcel must be paid before a rider is assigned".to_string(),
        ));
    }
    advances(parcel.stage(), LifecycleStage::RiderAssigned)?;

    if parcel.assigned_rider == Some(rider_id) {
        return Ok((parcel, rider));
    }

    if rider.status != RiderStatus::Active {
        return Err(AppError::Conflict(format!("rider {rider_id} is not active")));
    }
    if rider.work_status != WorkStatus::Idle {
        return Err(AppError::Conflict(format!(
            "rider {rider_id} is already in delivery"
        )));
    }

    if let Some(previous) = parcel.assigned_rider {
        warn!(%parcel_id, previous_rider = %previous, "reassigning parcel");
        release_rider(state, previous, 0.0);
    }

    let now = Utc::now();
    let updated_parcel = {
        let mut stored = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;
        stored.assigned_rider = Some(rider.id);
        stored.rider_email = Some(rider.email.clone());
        stored.assigned_at = Some(now);
        stored.clone()
    };

    let updated_rider = {
        let mut stored = state
            .riders
            .get_mut(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;
        stored.work_status = WorkStatus::InDelivery;
        stored.clone()
    };
    state.metrics.riders_in_delivery.inc();
    state.metrics.record_transition(LifecycleStage::RiderAssigned.label());

    append_event(
        state,
        &updated_parcel.tracking_id,
        parcel_id,
        LifecycleStage::RiderAssigned.label(),
        format!("Assigned to rider {}", updated_rider.name),
        actor,
    );

    info!(%parcel_id, %rider_id, "rider assigned");
    Ok((updated_parcel, updated_rider))
}

pub async fn mark_picked_up(
    state: &AppState,
    parcel_id: Uuid,
    rider_email: &str,
) -> Result<Parcel, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, parcel_id)?;
    ensure_assigned_to(&parcel, rider_email)?;
    if !advances(parcel.stage(), LifecycleStage::InTransit)? {
        return Ok(parcel);
    }

    let updated = {
        let mut stored = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;
        stored.delivery_status = DeliveryStatus::InTransit;
        stored.picked_up_at = Some(Utc::now());
        stored.clone()
    };
    state.metrics.record_transition(LifecycleStage::InTransit.label());

    append_event(
        state,
        &updated.tracking_id,
        parcel_id,
        LifecycleStage::InTransit.label(),
        format!("Picked up by {rider_email}"),
        rider_email,
    );

    info!(%parcel_id, rider = %rider_email, "parcel picked up");
    Ok(updated)
}

pub async fn mark_delivered(
    state: &AppState,
    parcel_id: Uuid,
    rider_email: &str,
) -> Result<Parcel, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, parcel_id)?;
    ensure_assigned_to(&parcel, rider_email)?;
    if parcel.delivery_status == DeliveryStatus::Delivered {
        return Ok(parcel);
    }

    let earning = rider_earning(&state.earnings, &parcel);
    let updated = {
        let mut stored = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;
        stored.delivery_status = DeliveryStatus::Delivered;
        stored.delivered_at = Some(Utc::now());
        stored.rider_earning = Some(earning);
        stored.clone()
    };

    if let Some(rider_id) = updated.assigned_rider {
        release_rider(state, rider_id, earning);
    }
    state.metrics.record_transition(LifecycleStage::Delivered.label());

    append_event(
        state,
        &updated.tracking_id,
        parcel_id,
        LifecycleStage::Delivered.label(),
        format!("Delivered by {rider_email}"),
        rider_email,
    );

    info!(%parcel_id, rider = %rider_email, earning, "parcel delivered");
    Ok(updated)
}

pub async fn cash_out(
    state: &AppState,
    parcel_id: Uuid,
    rider_email: &str,
) -> Result<Parcel, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, parcel_id)?;
    ensure_assigned_to(&parcel, rider_email)?;
    if parcel.delivery_status != DeliveryStatus::Delivered {
        return Err(AppError::Conflict(
            "parcel must be delivered before cash-out".to_string(),
        ));
    }
    if !advances(parcel.stage(), LifecycleStage::CashedOut)? {
        return Ok(parcel);
    }

    let updated = {
        let mut stored = state
            .parcels
            .get_mut(&parcel_id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;
        stored.rider_money = RiderMoney::CashedOut;
        stored.cashed_out_at = Some(Utc::now());
        stored.clone()
    };
    state.metrics.record_transition(LifecycleStage::CashedOut.label());

    info!(%parcel_id, rider = %rider_email, "rider cashed out");
    Ok(updated)
}

pub async fn delete_parcel(
    state: &AppState,
    parcel_id: Uuid,
    caller: &str,
    is_admin: bool,
) -> Result<Parcel, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let parcel = load_parcel(state, parcel_id)?;
    if !is_admin && parcel.created_by != caller {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    let (_, removed) = state
        .parcels
        .remove(&parcel_id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))?;

    if removed.delivery_status != DeliveryStatus::Delivered {
        if let Some(rider_id) = removed.assigned_rider {
            release_rider(state, rider_id, 0.0);
        }
    }

    info!(%parcel_id, by = %caller, "parcel deleted");
    Ok(removed)
}
