use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::auth::IdentityVerifier;
use crate::config::{Config, EarningRates};
use crate::gateway::PaymentGateway;
use crate::models::parcel::Parcel;
use crate::models::payment::Payment;
use crate::models::rider::Rider;
use crate::models::tracking::TrackingEvent;
use crate::models::user::{Role, User};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub parcels: DashMap<Uuid, Parcel>,
    pub riders: DashMap<Uuid, Rider>,
    riders_by_email: DashMap<String, Uuid>,
    pub users: DashMap<Uuid, User>,
    users_by_email: DashMap<String, Uuid>,
    pub payments: DashMap<Uuid, Payment>,
    pub tracking: DashMap<String, Vec<TrackingEvent>>,
    pub tracking_events_tx: broadcast::Sender<TrackingEvent>,
    /// Serializes transitions that touch a parcel and a rider together.
    pub lifecycle_lock: Mutex<()>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub earnings: EarningRates,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &Config,
        identity: Arc<dyn IdentityVerifier>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let (tracking_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let state = Self {
            parcels: DashMap::new(),
            riders: DashMap::new(),
            riders_by_email: DashMap::new(),
            users: DashMap::new(),
            users_by_email: DashMap::new(),
            payments: DashMap::new(),
            tracking: DashMap::new(),
            tracking_events_tx,
            lifecycle_lock: Mutex::new(()),
            identity,
            gateway,
            earnings: config.earnings,
            metrics: Metrics::new(),
        };

        if let Some(email) = &config.bootstrap_admin_email {
            state.register_user(email, None, Role::Admin);
        }

        state
    }

    /// Inserts a user unless the email is already registered.
    ///
    /// Returns the stored user and whether it was newly inserted. An existing
    /// user only has `last_login` refreshed.
    pub fn register_user(&self, email: &str, name: Option<String>, role: Role) -> (User, bool) {
        let email = email.trim().to_lowercase();
        let now = Utc::now();

        match self.users_by_email.entry(email.clone()) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                drop(existing);
                match self.users.get_mut(&id) {
                    Some(mut user) => {
                        user.last_login = now;
                        (user.clone(), false)
                    }
                    None => {
                        let user = self.insert_user(id, email, name, role);
                        (user, true)
                    }
                }
            }
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                slot.insert(id);
                let user = self.insert_user(id, email, name, role);
                (user, true)
            }
        }
    }

    fn insert_user(&self, id: Uuid, email: String, name: Option<String>, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id,
            email,
            name,
            role,
            created_at: now,
            last_login: now,
        };
        self.users.insert(id, user.clone());
        user
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.users_by_email.get(&email.trim().to_lowercase())?;
        self.users.get(&id).map(|user| user.clone())
    }

    pub fn set_role_by_email(&self, email: &str, role: Role) -> bool {
        let Some(id) = self
            .users_by_email
            .get(&email.trim().to_lowercase())
            .map(|entry| *entry)
        else {
            return false;
        };

        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    /// Stores a rider application unless one exists for the same email.
    pub fn insert_rider(&self, rider: Rider) -> bool {
        match self.riders_by_email.entry(rider.email.trim().to_lowercase()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(rider.id);
                self.riders.insert(rider.id, rider);
                true
            }
        }
    }

    pub fn rider_by_email(&self, email: &str) -> Option<Rider> {
        let id = *self.riders_by_email.get(&email.trim().to_lowercase())?;
        self.riders.get(&id).map(|rider| rider.clone())
    }
}

