//! In-memory event repository.

use chrono::{DateTime, Utc};
use eventpass_core::error::{EventPassError, Result};
use eventpass_core::repository::{
    AttendanceOutcome, EventFilter, EventRepository, RegistrationOutcome, TierWrite,
    UpdateOutcome,
};
use eventpass_core::types::{Event, EventDetails, EventId, RegistrationRecord, UserId};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    registrations: HashMap<EventId, BTreeMap<UserId, RegistrationRecord>>,
}

/// In-memory event repository.
///
/// Every call takes a single lock, so each call is one atomic unit, which is
/// what the conditional writes of the trait require. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventRepository {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEventRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a storage error (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |tables| tables.events.len())
    }

    /// Whether no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventPassError::Storage("repository unavailable".into()));
        }
        self.tables
            .lock()
            .map_err(|_| EventPassError::Storage("repository lock poisoned".into()))
    }
}

impl EventRepository for InMemoryEventRepository {
    fn insert(&self, event: &Event) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().and_then(|mut tables| {
            if tables.events.contains_key(&event.id) {
                return Err(EventPassError::Storage(format!(
                    "event {} already exists",
                    event.id
                )));
            }
            tables.events.insert(event.id, event.clone());
            tables.registrations.insert(event.id, BTreeMap::new());
            Ok(())
        });
        async move { result }
    }

    fn get(&self, id: EventId) -> impl Future<Output = Result<Option<Event>>> + Send {
        let result = self.lock().map(|tables| tables.events.get(&id).cloned());
        async move { result }
    }

    fn list(&self, filter: &EventFilter) -> impl Future<Output = Result<Vec<Event>>> + Send {
        let result = self.lock().map(|tables| {
            let mut events: Vec<Event> = tables
                .events
                .values()
                .filter(|event| filter.matches(event))
                .cloned()
                .collect();
            events.sort_by_key(|event| (event.created_at, event.id));
            events
        });
        async move { result }
    }

    fn update_details(
        &self,
        id: EventId,
        expected_version: u64,
        details: &EventDetails,
        tiers: TierWrite,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<UpdateOutcome>> + Send {
        let result = self.lock().map(|mut tables| match tables.events.get_mut(&id) {
            None => UpdateOutcome::NotFound,
            Some(event) if event.version != expected_version => UpdateOutcome::VersionMismatch,
            Some(event) => {
                let tiers = match tiers {
                    TierWrite::Keep => std::mem::take(&mut event.details.tiers),
                    TierWrite::Replace => details.tiers.clone(),
                };
                event.details = EventDetails {
                    tiers,
                    ..details.clone()
                };
                event.version += 1;
                event.updated_at = updated_at;
                UpdateOutcome::Updated(event.clone())
            }
        });
        async move { result }
    }

    fn delete(&self, id: EventId) -> impl Future<Output = Result<bool>> + Send {
        let result = self.lock().map(|mut tables| {
            tables.registrations.remove(&id);
            tables.events.remove(&id).is_some()
        });
        async move { result }
    }

    fn add_registration(
        &self,
        record: &RegistrationRecord,
    ) -> impl Future<Output = Result<RegistrationOutcome>> + Send {
        let result = self.lock().map(|mut tables| {
            let Tables {
                events,
                registrations,
            } = &mut *tables;

            let Some(event) = events.get_mut(&record.event_id) else {
                return RegistrationOutcome::EventNotFound;
            };
            let members = registrations.entry(record.event_id).or_default();
            if members.contains_key(&record.user_id) {
                return RegistrationOutcome::AlreadyRegistered;
            }

            if let Some(name) = record.tier.as_deref() {
                let Some(tier) = event.details.tiers.iter_mut().find(|t| t.name == name) else {
                    return RegistrationOutcome::UnknownTier;
                };
                if tier.remaining == 0 {
                    return RegistrationOutcome::SoldOut;
                }
                tier.remaining -= 1;
            }

            members.insert(record.user_id, record.clone());
            event.registered.insert(record.user_id);
            RegistrationOutcome::Registered
        });
        async move { result }
    }

    fn mark_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<AttendanceOutcome>> + Send {
        let result = self.lock().map(|mut tables| {
            let Tables {
                events,
                registrations,
            } = &mut *tables;

            let Some(event) = events.get_mut(&event_id) else {
                return AttendanceOutcome::EventNotFound;
            };
            let Some(record) = registrations
                .get_mut(&event_id)
                .and_then(|members| members.get_mut(&user_id))
            else {
                return AttendanceOutcome::NotRegistered;
            };
            if record.attended_at.is_some() {
                return AttendanceOutcome::AlreadyCheckedIn;
            }

            record.attended_at = Some(at);
            event.attended.insert(user_id);
            AttendanceOutcome::Marked(at)
        });
        async move { result }
    }

    fn registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<RegistrationRecord>>> + Send {
        let result = self.lock().map(|tables| {
            tables
                .registrations
                .get(&event_id)
                .and_then(|members| members.get(&user_id))
                .cloned()
        });
        async move { result }
    }

    fn registrations(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<RegistrationRecord>>> + Send {
        let result = self.lock().map(|tables| {
            let mut records: Vec<RegistrationRecord> = tables
                .registrations
                .get(&event_id)
                .map(|members| members.values().cloned().collect())
                .unwrap_or_default();
            records.sort_by_key(|record| (record.registered_at, record.user_id));
            records
        });
        async move { result }
    }

    fn ping(&self) -> impl Future<Output = Result<()>> + Send {
        let result = self.lock().map(|_| ());
        async move { result }
    }
}
