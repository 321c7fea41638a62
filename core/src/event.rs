//! Domain events — the audit trail of every lifecycle transition.
//!
//! RULE: every mutating desk operation appends its events to the
//! event_log table. Events are facts, not commands; nothing replays
//! them, but support and product read them when a deal is disputed.

use crate::types::{AppointmentId, ClientId, EdgeId, RecordId, UserId};
use serde::{Deserialize, Serialize};

/// Every event the desk emits. Variants are added, never removed or
/// reordered — old databases must stay readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    // ── Client directory ───────────────────────────
    ClientCreated {
        client_id: ClientId,
    },
    ClientUpdated {
        client_id: ClientId,
    },
    ClientSoftDeleted {
        client_id: ClientId,
    },
    ClientRestored {
        client_id: ClientId,
    },
    ClientPurged {
        client_id: ClientId,
        records_purged: i64,
    },

    // ── Record lifecycle ───────────────────────────
    RecordCreated {
        record_id: RecordId,
        client_id: ClientId,
        salesperson_id: UserId,
        opportunity_number: i64,
    },
    RecordUpdated {
        record_id: RecordId,
        version: i64,
    },
    RecordStatusChanged {
        record_id: RecordId,
        old_status: Option<String>,
        new_status: Option<String>,
    },
    CommissionLocked {
        record_id: RecordId,
        percentage: f64,
        value: f64,
        amount: f64,
    },
    CommissionUnlocked {
        record_id: RecordId,
    },
    CollaboratorAssigned {
        record_id: RecordId,
        collaborator_id: Option<UserId>,
    },
    RecordSoftDeleted {
        record_id: RecordId,
    },
    RecordRestored {
        record_id: RecordId,
    },

    // ── Appointments ───────────────────────────────
    AppointmentScheduled {
        appointment_id: AppointmentId,
        record_id: RecordId,
        status: String,
    },
    AppointmentStatusChanged {
        appointment_id: AppointmentId,
        old_status: String,
        new_status: String,
    },
    AppointmentConfirmed {
        appointment_id: AppointmentId,
    },
    AppointmentRescheduled {
        appointment_id: AppointmentId,
    },
    AppointmentLateReported {
        appointment_id: AppointmentId,
        new_time: String,
    },
    AppointmentCancelled {
        appointment_id: AppointmentId,
    },

    // ── Co-signer graph ────────────────────────────
    CosignerLinked {
        edge_id: EdgeId,
        buyer_client_id: ClientId,
        cosigner_client_id: ClientId,
    },
    CosignerUnlinked {
        edge_id: EdgeId,
    },

    // ── Comments ───────────────────────────────────
    CommentAdded {
        comment_id: String,
        parent_kind: String,
        parent_id: String,
    },
    CommentDeleted {
        comment_id: String,
    },
}

/// A persisted row of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub occurred_at: String,
    pub actor_id: Option<UserId>,
    pub event_type: String,
    pub payload: String,
}

/// Stable snake_case name of an event, stored alongside the payload so
/// the log can be filtered without parsing JSON.
pub fn event_type_name(event: &DeskEvent) -> &'static str {
    match event {
        DeskEvent::ClientCreated { .. } => "client_created",
        DeskEvent::ClientUpdated { .. } => "client_updated",
        DeskEvent::ClientSoftDeleted { .. } => "client_soft_deleted",
        DeskEvent::ClientRestored { .. } => "client_restored",
        DeskEvent::ClientPurged { .. } => "client_purged",
        DeskEvent::RecordCreated { .. } => "record_created",
        DeskEvent::RecordUpdated { .. } => "record_updated",
        DeskEvent::RecordStatusChanged { .. } => "record_status_changed",
        DeskEvent::CommissionLocked { .. } => "commission_locked",
        DeskEvent::CommissionUnlocked { .. } => "commission_unlocked",
        DeskEvent::CollaboratorAssigned { .. } => "collaborator_assigned",
        DeskEvent::RecordSoftDeleted { .. } => "record_soft_deleted",
        DeskEvent::RecordRestored { .. } => "record_restored",
        DeskEvent::AppointmentScheduled { .. } => "appointment_scheduled",
        DeskEvent::AppointmentStatusChanged { .. } => "appointment_status_changed",
        DeskEvent::AppointmentConfirmed { .. } => "appointment_confirmed",
        DeskEvent::AppointmentRescheduled { .. } => "appointment_rescheduled",
        DeskEvent::AppointmentLateReported { .. } => "appointment_late_reported",
        DeskEvent::AppointmentCancelled { .. } => "appointment_cancelled",
        DeskEvent::CosignerLinked { .. } => "cosigner_linked",
        DeskEvent::CosignerUnlinked { .. } => "cosigner_unlinked",
        DeskEvent::CommentAdded { .. } => "comment_added",
        DeskEvent::CommentDeleted { .. } => "comment_deleted",
    }
}
