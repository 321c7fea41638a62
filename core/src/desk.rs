//! The desk facade — every operation the transport layer calls goes
//! through here.
//!
//! RULES:
//!   - Each mutating operation is one transaction against the store.
//!   - Every state change is appended to the event log.
//!   - Notifications are dispatched after the state change commits;
//!     a failed send is logged and counted, never returned.

use crate::{
    error::DeskResult,
    event::{event_type_name, DeskEvent, EventLogEntry},
    notify::{Channel, LogSender, NotificationSender},
    store::DeskStore,
    types::Actor,
};

pub struct Desk {
    pub(crate) store: DeskStore,
    pub(crate) notifier: Box<dyn NotificationSender>,
    pub(crate) notify_failures: u64,
}

impl Desk {
    pub fn new(store: DeskStore, notifier: Box<dyn NotificationSender>) -> Self {
        Self {
            store,
            notifier,
            notify_failures: 0,
        }
    }

    /// Open (or create) a desk database at `path`, migrated, with the
    /// default logging notifier.
    pub fn open(path: &str) -> DeskResult<Self> {
        let store = DeskStore::open(path)?;
        store.migrate()?;
        Ok(Self::new(store, Box::new(LogSender)))
    }

    /// Fully wired in-memory desk (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let store = DeskStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(store, Box::new(LogSender)))
    }

    /// Swap the notification sender (tests, transport wiring).
    pub fn set_notifier(&mut self, notifier: Box<dyn NotificationSender>) {
        self.notifier = notifier;
    }

    pub fn store(&self) -> &DeskStore {
        &self.store
    }

    /// Notification sends that failed since this desk was opened.
    pub fn notify_failures(&self) -> u64 {
        self.notify_failures
    }

    /// Audit-trail query, also used by tests.
    pub fn events_by_type(&self, event_type: &str) -> DeskResult<Vec<EventLogEntry>> {
        self.store.events_by_type(event_type)
    }

    pub(crate) fn log_event(&self, actor: Option<&Actor>, event: &DeskEvent) -> DeskResult<()> {
        let entry = EventLogEntry {
            id: None,
            occurred_at: now(),
            actor_id: actor.map(|a| a.id.clone()),
            event_type: event_type_name(event).to_string(),
            payload: serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    /// Fire-and-forget dispatch. The caller's state change has already
    /// committed; failure here is logged and counted, nothing more.
    pub(crate) fn dispatch(
        &mut self,
        channel: Channel,
        template_key: &str,
        recipient_id: &str,
        context: serde_json::Value,
    ) {
        if let Err(err) = self
            .notifier
            .send(channel, template_key, recipient_id, &context)
        {
            self.notify_failures += 1;
            log::warn!(
                "notification failed channel={} template={} recipient={}: {err:#}",
                channel.as_str(),
                template_key,
                recipient_id
            );
        }
    }
}

/// Current wall-clock timestamp, RFC 3339.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
