use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::hours::{hours_worked, HoursRounding};
use super::log::AttendanceLog;
use super::model::{AttendanceRecord, NewRecord, RecordId, RecordPatch};
use super::store::AttendanceStore;
use crate::auth::repo_types::Identity;
use crate::error::AppError;

/// What the dashboard shows about the caller's current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUiState {
    pub user_id: Uuid,
    pub email: String,
    pub is_working: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    pub restaurant_name: String,
    pub open_record_id: Option<RecordId>,
}

type Slot = Arc<Mutex<Option<SessionUiState>>>;

/// Idle/Working state machine per identity.
///
/// Each identity has one slot whose lock is held for the whole transition,
/// store round trips included, so intents from the same identity are applied
/// one at a time. The cached state is hydrated from the store on first use
/// and restored to its previous value when a write fails.
pub struct SessionController {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    rounding: HoursRounding,
    default_location: String,
    slots: Mutex<HashMap<Uuid, Slot>>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
        rounding: HoursRounding,
        default_location: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            rounding,
            default_location: default_location.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn rounding(&self) -> HoursRounding {
        self.rounding
    }

    async fn slot(&self, user_id: Uuid) -> Slot {
        self.slots.lock().await.entry(user_id).or_default().clone()
    }

    async fn hydrate(&self, identity: &Identity) -> Result<SessionUiState, AppError> {
        let open = self.store.query_open_by_owner(identity.id).await?;
        let state = match open {
            Some(rec) => SessionUiState {
                user_id: identity.id,
                email: identity.email.clone(),
                is_working: true,
                start_time: Some(rec.start_time),
                restaurant_name: rec.restaurant_name,
                open_record_id: Some(rec.id),
            },
            None => SessionUiState {
                user_id: identity.id,
                email: identity.email.clone(),
                is_working: false,
                start_time: None,
                restaurant_name: self.idle_location(identity.id).await?,
                open_record_id: None,
            },
        };
        Ok(state)
    }

    /// Saved location, else the configured default.
    async fn idle_location(&self, user_id: Uuid) -> Result<String, AppError> {
        Ok(self
            .store
            .load_location(user_id)
            .await?
            .unwrap_or_else(|| self.default_location.clone()))
    }

    async fn loaded<'a>(
        &self,
        cached: &'a mut Option<SessionUiState>,
        identity: &Identity,
    ) -> Result<&'a mut SessionUiState, AppError> {
        if cached.is_none() {
            *cached = Some(self.hydrate(identity).await?);
        }
        cached
            .as_mut()
            .ok_or_else(|| AppError::Store(anyhow::anyhow!("session state not loaded")))
    }

    /// Current state, loading it from the store if this identity has not
    /// been seen yet.
    pub async fn state(&self, identity: &Identity) -> Result<SessionUiState, AppError> {
        let slot = self.slot(identity.id).await;
        let mut cached = slot.lock().await;
        Ok(self.loaded(&mut cached, identity).await?.clone())
    }

    /// Idle -> Working. Persists a new in-progress record.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn start_work(
        &self,
        identity: &Identity,
        location: Option<&str>,
    ) -> Result<SessionUiState, AppError> {
        let slot = self.slot(identity.id).await;
        let mut cached = slot.lock().await;
        let state = self.loaded(&mut cached, identity).await?;

        if state.is_working {
            warn!("start rejected: already working");
            return Err(AppError::AlreadyWorking);
        }
        // read-then-write against the store in case the cache went stale
        if let Some(open) = self.store.query_open_by_owner(identity.id).await? {
            warn!(record_id = %open.id, "start rejected: store has an open session");
            state.is_working = true;
            state.start_time = Some(open.start_time);
            state.restaurant_name = open.restaurant_name;
            state.open_record_id = Some(open.id);
            return Err(AppError::AlreadyWorking);
        }

        let label = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) => l.to_string(),
            None => self.idle_location(identity.id).await?,
        };

        let previous = state.clone();
        let now = self.clock.now();
        state.is_working = true;
        state.start_time = Some(now);
        state.restaurant_name = label.clone();

        let created = self
            .store
            .create_record(NewRecord {
                user_id: identity.id,
                email: identity.email.clone(),
                start_time: now,
                restaurant_name: label,
            })
            .await;

        match created {
            Ok(id) => {
                state.open_record_id = Some(id);
                info!(record_id = %id, location = %state.restaurant_name, "work started");
                Ok(state.clone())
            }
            Err(e) => {
                *state = previous;
                Err(AppError::Store(e.context("start work")))
            }
        }
    }

    /// Working -> Idle. Closes the open record with the computed hours.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn end_work(&self, identity: &Identity) -> Result<AttendanceRecord, AppError> {
        let slot = self.slot(identity.id).await;
        let mut cached = slot.lock().await;
        let state = self.loaded(&mut cached, identity).await?;

        if !state.is_working {
            warn!("end rejected: not working");
            return Err(AppError::NoActiveSession);
        }

        let Some(mut open) = self.store.query_open_by_owner(identity.id).await? else {
            warn!("end rejected: no open record in store, resyncing to idle");
            state.is_working = false;
            state.start_time = None;
            state.open_record_id = None;
            return Err(AppError::NoActiveSession);
        };

        let idle_label = self.idle_location(identity.id).await?;
        let end = self.clock.now().max(open.start_time);
        let hours = hours_worked(open.start_time, end, self.rounding);
        let patch = RecordPatch::complete(end, hours);

        let previous = state.clone();
        state.is_working = false;
        state.start_time = None;
        state.open_record_id = None;

        match self.store.update_record(open.id, patch.clone()).await {
            Ok(()) => {
                state.restaurant_name = idle_label;
                open.apply(&patch);
                info!(record_id = %open.id, hours_worked = hours, "work ended");
                Ok(open)
            }
            Err(e) => {
                *state = previous;
                Err(AppError::Store(e.context("end work")))
            }
        }
    }

    pub async fn load_log(&self, identity: &Identity) -> Result<AttendanceLog, AppError> {
        let records = self.store.query_by_owner(identity.id).await?;
        Ok(AttendanceLog::new(records))
    }

    /// Remembers `label` for later session starts. A session already in
    /// progress keeps its own location.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn save_location(
        &self,
        identity: &Identity,
        label: &str,
    ) -> Result<SessionUiState, AppError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::validation("Location name must not be empty"));
        }

        let slot = self.slot(identity.id).await;
        let mut cached = slot.lock().await;
        let state = self.loaded(&mut cached, identity).await?;

        self.store.save_location(identity.id, label).await?;
        if !state.is_working {
            state.restaurant_name = label.to_string();
        }
        info!(location = %label, "location saved");
        Ok(state.clone())
    }

    /// Drops the cached state; the next call reloads it from the store.
    /// The slot itself is removed unless a request still holds it.
    pub async fn forget(&self, identity: &Identity) {
        let slot = self.slot(identity.id).await;
        *slot.lock().await = None;
        drop(slot);

        let mut slots = self.slots.lock().await;
        if slots
            .get(&identity.id)
            .is_some_and(|s| Arc::strong_count(s) == 1)
        {
            slots.remove(&identity.id);
        }
    }
}
