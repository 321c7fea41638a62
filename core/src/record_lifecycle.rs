//! Record lifecycle — the financing-attempt entity, its checklist,
//! status machine and the one-way commission latch.
//!
//! Permission model:
//!   - owner (salesperson_id) and admin mutate freely, until the
//!     commission latch closes the record to non-admins;
//!   - a collaborator may patch checklist fields only, never ownership
//!     or sale fields;
//!   - soft delete is owner-or-admin.

use crate::{
    desk::{now, Desk},
    error::{codes, DeskError, DeskResult},
    event::DeskEvent,
    notify::Channel,
    types::{Actor, ClientId, RecordId, StaffDirectory, UserId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Declared outcome of a financing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinanceStatus {
    #[default]
    No,
    Financiado,
    Lease,
}

impl FinanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinanceStatus::No => "no",
            FinanceStatus::Financiado => "financiado",
            FinanceStatus::Lease => "lease",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no" => Some(FinanceStatus::No),
            "financiado" => Some(FinanceStatus::Financiado),
            "lease" => Some(FinanceStatus::Lease),
            _ => None,
        }
    }

    /// A concluded sale — the condition that opens the next
    /// opportunity.
    pub fn is_sale(&self) -> bool {
        matches!(self, FinanceStatus::Financiado | FinanceStatus::Lease)
    }
}

/// Completion mark on a record. `None` is the unmarked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
    NoShow,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Completed => "completed",
            RecordStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(RecordStatus::Completed),
            "no_show" => Some(RecordStatus::NoShow),
            _ => None,
        }
    }
}

/// One down-payment line. A record carries a list of these; Trade
/// lines carry the trade-in vehicle sub-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownPaymentLine {
    Cash {
        amount: f64,
    },
    Card {
        amount: f64,
    },
    Trade {
        make: String,
        model: String,
        year: Option<i64>,
        title: Option<String>,
        miles: Option<i64>,
        plate: Option<String>,
        estimated_value: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub client_id: ClientId,
    pub salesperson_id: UserId,
    pub opportunity_number: i64,

    // Document checklist
    pub has_id: bool,
    pub id_type: Option<String>,
    pub has_poi: bool,
    pub poi_type: Option<String>,
    pub ssn: Option<String>,
    pub itin: Option<String>,
    pub has_por: bool,
    pub por_types: Vec<String>,
    pub employer: Option<String>,
    pub job_title: Option<String>,
    pub monthly_income: Option<f64>,
    pub months_at_job: Option<i64>,

    // Bank / deposit / auto loan
    pub bank_name: Option<String>,
    pub has_deposit: bool,
    pub deposit_amount: Option<f64>,
    pub has_auto_loan: bool,
    pub auto_loan_bank: Option<String>,
    pub auto_loan_payment: Option<f64>,
    pub down_payment: Vec<DownPaymentLine>,

    // Sale
    pub dealer: Option<String>,
    pub finance_status: FinanceStatus,
    pub vehicle: Option<String>,
    pub sale_date: Option<NaiveDate>,

    // Status / commission
    pub record_status: Option<RecordStatus>,
    pub commission_percentage: Option<f64>,
    pub commission_value: Option<f64>,
    pub commission_locked: bool,

    /// Weak back-reference to a second salesperson on the deal. Never
    /// ownership — that stays with salesperson_id.
    pub collaborator_id: Option<UserId>,
    /// Denormalized display name, refreshed on read from the external
    /// staff directory. Not persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub collaborator_name: Option<String>,

    pub deleted: bool,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Record {
    pub fn new(client_id: &str, salesperson_id: &str, opportunity_number: i64) -> Self {
        let ts = now();
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            salesperson_id: salesperson_id.to_string(),
            opportunity_number,
            has_id: false,
            id_type: None,
            has_poi: false,
            poi_type: None,
            ssn: None,
            itin: None,
            has_por: false,
            por_types: Vec::new(),
            employer: None,
            job_title: None,
            monthly_income: None,
            months_at_job: None,
            bank_name: None,
            has_deposit: false,
            deposit_amount: None,
            has_auto_loan: false,
            auto_loan_bank: None,
            auto_loan_payment: None,
            down_payment: Vec::new(),
            dealer: None,
            finance_status: FinanceStatus::No,
            vehicle: None,
            sale_date: None,
            record_status: None,
            commission_percentage: None,
            commission_value: None,
            commission_locked: false,
            collaborator_id: None,
            collaborator_name: None,
            deleted: false,
            version: 0,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }

    /// Commission payout: value × pct / 100, rounded to cents.
    /// Undefined (None) unless both inputs are present.
    pub fn commission_amount(&self) -> Option<f64> {
        match (self.commission_value, self.commission_percentage) {
            (Some(value), Some(pct)) => Some(round2(value * pct / 100.0)),
            _ => None,
        }
    }

    fn is_owner(&self, actor: &Actor) -> bool {
        actor.id == self.salesperson_id
    }

    fn is_collaborator(&self, actor: &Actor) -> bool {
        self.collaborator_id.as_deref() == Some(actor.id.as_str())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// A partial update. `None` fields are left untouched.
///
/// Deserialization accepts the legacy field names `dl` and `checks`
/// as aliases for `has_id` / `has_poi` — the compatibility read-path
/// for payloads produced against the old schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    #[serde(alias = "dl")]
    pub has_id: Option<bool>,
    pub id_type: Option<String>,
    #[serde(alias = "checks")]
    pub has_poi: Option<bool>,
    pub poi_type: Option<String>,
    pub ssn: Option<String>,
    pub itin: Option<String>,
    pub has_por: Option<bool>,
    pub por_types: Option<Vec<String>>,
    pub employer: Option<String>,
    pub job_title: Option<String>,
    pub monthly_income: Option<f64>,
    pub months_at_job: Option<i64>,

    pub bank_name: Option<String>,
    pub has_deposit: Option<bool>,
    pub deposit_amount: Option<f64>,
    pub has_auto_loan: Option<bool>,
    pub auto_loan_bank: Option<String>,
    pub auto_loan_payment: Option<f64>,
    pub down_payment: Option<Vec<DownPaymentLine>>,

    pub dealer: Option<String>,
    pub finance_status: Option<FinanceStatus>,
    pub vehicle: Option<String>,
    pub sale_date: Option<NaiveDate>,

    pub commission_percentage: Option<f64>,
    pub commission_value: Option<f64>,
    /// Outer None: untouched. Some(None): clear the collaborator.
    pub collaborator_id: Option<Option<UserId>>,

    /// Optimistic-concurrency guard: reject if the record has moved
    /// past this version. Not part of the wire payload.
    #[serde(skip)]
    pub expected_version: Option<i64>,
}

impl RecordPatch {
    pub fn touches_commission(&self) -> bool {
        self.commission_percentage.is_some() || self.commission_value.is_some()
    }

    /// Both commission figures in one patch — the latch trigger.
    pub fn locks_commission(&self) -> bool {
        self.commission_percentage.is_some() && self.commission_value.is_some()
    }

    /// True when the patch touches only document-checklist fields —
    /// the subset a collaborator is allowed to edit.
    pub fn is_checklist_only(&self) -> bool {
        self.down_payment.is_none()
            && self.dealer.is_none()
            && self.finance_status.is_none()
            && self.vehicle.is_none()
            && self.sale_date.is_none()
            && self.commission_percentage.is_none()
            && self.commission_value.is_none()
            && self.collaborator_id.is_none()
    }

    /// Apply every non-commission field onto `rec`. Commission fields
    /// are latch-guarded and applied by the caller.
    fn apply(&self, rec: &mut Record) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = self.$field.clone() {
                    rec.$field = Some(v);
                }
            };
        }
        if let Some(v) = self.has_id {
            rec.has_id = v;
        }
        set!(id_type);
        if let Some(v) = self.has_poi {
            rec.has_poi = v;
        }
        set!(poi_type);
        set!(ssn);
        set!(itin);
        if let Some(v) = self.has_por {
            rec.has_por = v;
        }
        if let Some(v) = self.por_types.clone() {
            rec.por_types = v;
        }
        set!(employer);
        set!(job_title);
        set!(monthly_income);
        set!(months_at_job);
        set!(bank_name);
        if let Some(v) = self.has_deposit {
            rec.has_deposit = v;
        }
        set!(deposit_amount);
        if let Some(v) = self.has_auto_loan {
            rec.has_auto_loan = v;
        }
        set!(auto_loan_bank);
        set!(auto_loan_payment);
        if let Some(v) = self.down_payment.clone() {
            rec.down_payment = v;
        }
        set!(dealer);
        if let Some(v) = self.finance_status {
            rec.finance_status = v;
        }
        set!(vehicle);
        set!(sale_date);
        if let Some(v) = self.collaborator_id.clone() {
            rec.collaborator_id = v;
        }
    }
}

impl Desk {
    /// Create a record inside the salesperson's opportunity sequence.
    /// The gate is evaluated in the same transaction as the insert;
    /// the unique (client, salesperson, opportunity) index is the race
    /// backstop, retried once by re-evaluating the gate.
    pub fn create_record(
        &mut self,
        client_id: &str,
        salesperson_id: &str,
        opportunity_number: i64,
        fields: RecordPatch,
    ) -> DeskResult<Record> {
        if fields.touches_commission() {
            return Err(DeskError::validation(
                codes::COMMISSION_ON_CREATE,
                "commission figures are attached by an admin after the sale, not at creation",
            ));
        }
        self.store
            .get_client(client_id)?
            .filter(|c| !c.deleted)
            .ok_or_else(|| DeskError::not_found("client", client_id))?;

        let rec = {
            let tx = self.store.begin()?;
            let gate = self.can_open_opportunity(client_id, salesperson_id)?;
            if !gate.allowed {
                return Err(gate.denial());
            }
            if opportunity_number != gate.next_number {
                return Err(DeskError::validation(
                    codes::OUT_OF_SEQUENCE,
                    format!(
                        "next opportunity for this client is {}, got {}",
                        gate.next_number, opportunity_number
                    ),
                ));
            }

            let mut rec = Record::new(client_id, salesperson_id, opportunity_number);
            fields.apply(&mut rec);

            match self.store.insert_record(&rec) {
                Ok(()) => {
                    self.log_record_created(&rec)?;
                    tx.commit()?;
                    rec
                }
                Err(e) if e.is_unique_violation() => {
                    drop(tx);
                    // Lost the race: re-evaluate the gate once against
                    // the committed state and retry at the new number.
                    let tx = self.store.begin()?;
                    let gate = self.can_open_opportunity(client_id, salesperson_id)?;
                    if !gate.allowed {
                        return Err(gate.denial());
                    }
                    rec.opportunity_number = gate.next_number;
                    match self.store.insert_record(&rec) {
                        Ok(()) => {
                            self.log_record_created(&rec)?;
                            tx.commit()?;
                            rec
                        }
                        Err(e2) if e2.is_unique_violation() => {
                            return Err(DeskError::conflict(
                                codes::OPPORTUNITY_RACE,
                                "concurrent record creation for this opportunity",
                            ));
                        }
                        Err(e2) => return Err(e2),
                    }
                }
                Err(e) => return Err(e),
            }
        };
        Ok(rec)
    }

    fn log_record_created(&self, rec: &Record) -> DeskResult<()> {
        self.log_event(
            Some(&Actor::salesperson(rec.salesperson_id.clone())),
            &DeskEvent::RecordCreated {
                record_id: rec.record_id.clone(),
                client_id: rec.client_id.clone(),
                salesperson_id: rec.salesperson_id.clone(),
                opportunity_number: rec.opportunity_number,
            },
        )
    }

    /// Apply a partial update. An admin patch carrying both commission
    /// figures closes the one-way latch in the same write.
    pub fn update_record(
        &mut self,
        record_id: &str,
        actor: &Actor,
        patch: RecordPatch,
    ) -> DeskResult<Record> {
        let mut rec = self.live_record(record_id)?;

        if rec.commission_locked && !actor.is_admin() {
            return Err(DeskError::forbidden(
                codes::COMMISSION_LOCKED,
                "record is commission-locked; only an admin may modify it",
            ));
        }
        if let Some(expected) = patch.expected_version {
            if expected != rec.version {
                return Err(DeskError::conflict(
                    codes::VERSION_MISMATCH,
                    format!("record is at version {}, caller saw {}", rec.version, expected),
                ));
            }
        }
        if !actor.is_admin() && !rec.is_owner(actor) {
            let checklist_by_collaborator = rec.is_collaborator(actor) && patch.is_checklist_only();
            if !checklist_by_collaborator {
                return Err(DeskError::forbidden(
                    codes::NOT_OWNER,
                    "only the owning salesperson, a checklist collaborator or an admin may edit",
                ));
            }
        }
        if patch.touches_commission() && !actor.is_admin() {
            return Err(DeskError::forbidden(
                codes::ADMIN_ONLY,
                "commission figures are admin-only",
            ));
        }

        let collaborator_change = patch
            .collaborator_id
            .clone()
            .filter(|new| *new != rec.collaborator_id);

        patch.apply(&mut rec);
        if let Some(pct) = patch.commission_percentage {
            rec.commission_percentage = Some(pct);
        }
        if let Some(value) = patch.commission_value {
            rec.commission_value = Some(value);
        }
        let locked_now = patch.locks_commission() && !rec.commission_locked;
        if patch.locks_commission() {
            rec.commission_locked = true;
        }

        if rec.finance_status.is_sale() && (rec.vehicle.is_none() || rec.sale_date.is_none()) {
            log::warn!(
                "record {} marked {} without vehicle/sale_date",
                rec.record_id,
                rec.finance_status.as_str()
            );
        }

        self.save_with_version(&mut rec)?;
        self.log_event(
            Some(actor),
            &DeskEvent::RecordUpdated {
                record_id: rec.record_id.clone(),
                version: rec.version,
            },
        )?;
        if locked_now {
            self.log_event(
                Some(actor),
                &DeskEvent::CommissionLocked {
                    record_id: rec.record_id.clone(),
                    percentage: rec.commission_percentage.unwrap_or(0.0),
                    value: rec.commission_value.unwrap_or(0.0),
                    amount: rec.commission_amount().unwrap_or(0.0),
                },
            )?;
        }
        if let Some(new_collaborator) = collaborator_change {
            self.log_event(
                Some(actor),
                &DeskEvent::CollaboratorAssigned {
                    record_id: rec.record_id.clone(),
                    collaborator_id: new_collaborator.clone(),
                },
            )?;
            if let Some(id) = new_collaborator {
                self.dispatch(
                    Channel::Email,
                    "collaborator_assigned",
                    &id,
                    json!({
                        "record_id": rec.record_id,
                        "client_id": rec.client_id,
                        "salesperson_id": rec.salesperson_id,
                    }),
                );
            }
        }
        Ok(rec)
    }

    /// Mark or unmark a record. Legal moves: unmarked ⇄ completed and
    /// unmarked ⇄ no_show; completed and no_show never swap directly.
    pub fn set_record_status(
        &mut self,
        record_id: &str,
        actor: &Actor,
        status: Option<RecordStatus>,
    ) -> DeskResult<Record> {
        let mut rec = self.live_record(record_id)?;

        if rec.commission_locked && !actor.is_admin() {
            return Err(DeskError::forbidden(
                codes::COMMISSION_LOCKED,
                "record is commission-locked; only an admin may change its status",
            ));
        }
        if !actor.is_admin() && !rec.is_owner(actor) {
            return Err(DeskError::forbidden(
                codes::NOT_OWNER,
                "only the owning salesperson or an admin may change the status",
            ));
        }
        if rec.record_status == status {
            return Ok(rec);
        }
        if rec.record_status.is_some() && status.is_some() {
            return Err(DeskError::validation(
                codes::STATUS_TRANSITION,
                "completed and no_show are only reachable from the unmarked state",
            ));
        }

        let old = rec.record_status;
        rec.record_status = status;
        self.save_with_version(&mut rec)?;
        self.log_event(
            Some(actor),
            &DeskEvent::RecordStatusChanged {
                record_id: rec.record_id.clone(),
                old_status: old.map(|s| s.as_str().to_string()),
                new_status: status.map(|s| s.as_str().to_string()),
            },
        )?;
        Ok(rec)
    }

    /// Admin-only explicit unlock — the only way the latch reopens.
    pub fn unlock_commission(&mut self, record_id: &str, actor: &Actor) -> DeskResult<Record> {
        if !actor.is_admin() {
            return Err(DeskError::forbidden(
                codes::ADMIN_ONLY,
                "unlocking a commission is admin-only",
            ));
        }
        let mut rec = self.live_record(record_id)?;
        if !rec.commission_locked {
            return Err(DeskError::validation(
                codes::NOT_LOCKED,
                "record is not commission-locked",
            ));
        }
        rec.commission_locked = false;
        self.save_with_version(&mut rec)?;
        self.log_event(
            Some(actor),
            &DeskEvent::CommissionUnlocked {
                record_id: rec.record_id.clone(),
            },
        )?;
        Ok(rec)
    }

    /// Soft delete. Owner or admin only.
    pub fn delete_record(&mut self, record_id: &str, actor: &Actor) -> DeskResult<()> {
        let mut rec = self.live_record(record_id)?;
        if !actor.is_admin() && !rec.is_owner(actor) {
            return Err(DeskError::forbidden(
                codes::NOT_OWNER,
                "only the owning salesperson or an admin may delete",
            ));
        }
        rec.deleted = true;
        self.save_with_version(&mut rec)?;
        self.log_event(
            Some(actor),
            &DeskEvent::RecordSoftDeleted {
                record_id: rec.record_id.clone(),
            },
        )
    }

    /// Bring a soft-deleted record back from trash.
    pub fn restore_record(&mut self, record_id: &str, actor: &Actor) -> DeskResult<Record> {
        let mut rec = self
            .store
            .get_record(record_id)?
            .ok_or_else(|| DeskError::not_found("record", record_id))?;
        if !rec.deleted {
            return Err(DeskError::validation(
                codes::NOT_DELETED,
                "record is not in the trash",
            ));
        }
        if !actor.is_admin() && !rec.is_owner(actor) {
            return Err(DeskError::forbidden(
                codes::NOT_OWNER,
                "only the owning salesperson or an admin may restore",
            ));
        }
        rec.deleted = false;
        match self.save_with_version(&mut rec) {
            Ok(()) => {}
            // The attempt number was re-created while this record sat
            // in the trash.
            Err(e) if e.is_unique_violation() => {
                return Err(DeskError::conflict(
                    codes::OPPORTUNITY_RACE,
                    "a live record already exists at this opportunity number",
                ));
            }
            Err(e) => return Err(e),
        }
        self.log_event(
            Some(actor),
            &DeskEvent::RecordRestored {
                record_id: rec.record_id.clone(),
            },
        )?;
        Ok(rec)
    }

    pub fn record(&self, record_id: &str) -> DeskResult<Record> {
        self.store
            .get_record(record_id)?
            .ok_or_else(|| DeskError::not_found("record", record_id))
    }

    /// Record with the collaborator display name refreshed from the
    /// external staff directory.
    pub fn record_view(
        &self,
        record_id: &str,
        directory: &dyn StaffDirectory,
    ) -> DeskResult<Record> {
        let mut rec = self.record(record_id)?;
        rec.collaborator_name = rec
            .collaborator_id
            .as_deref()
            .and_then(|id| directory.display_name(id));
        Ok(rec)
    }

    pub fn records_for_client(&self, client_id: &str) -> DeskResult<Vec<Record>> {
        self.store.records_for_client(client_id)
    }

    pub(crate) fn live_record(&self, record_id: &str) -> DeskResult<Record> {
        self.store
            .get_record(record_id)?
            .filter(|r| !r.deleted)
            .ok_or_else(|| DeskError::not_found("record", record_id))
    }

    /// Persist `rec`, bumping its version; a zero-row update means a
    /// concurrent writer got there first.
    fn save_with_version(&self, rec: &mut Record) -> DeskResult<()> {
        let expected = rec.version;
        rec.version += 1;
        rec.updated_at = now();
        if !self.store.save_record(rec, expected)? {
            return Err(DeskError::conflict(
                codes::VERSION_MISMATCH,
                "record was modified concurrently",
            ));
        }
        Ok(())
    }

    /// Ungated record creation for a co-signer client: their attempts
    /// are numbered for bookkeeping but never gated on a prior sale
    /// and never capped. Used by the co-signer graph.
    pub(crate) fn create_ungated_record(
        &mut self,
        client_id: &str,
        salesperson_id: &str,
        fields: RecordPatch,
    ) -> DeskResult<Record> {
        if fields.touches_commission() {
            return Err(DeskError::validation(
                codes::COMMISSION_ON_CREATE,
                "commission figures are attached by an admin after the sale, not at creation",
            ));
        }
        let tx = self.store.begin()?;
        let existing = self.store.records_for_salesperson(client_id, salesperson_id)?;
        let next = existing
            .iter()
            .map(|r| r.opportunity_number)
            .max()
            .unwrap_or(0)
            + 1;
        let mut rec = Record::new(client_id, salesperson_id, next);
        fields.apply(&mut rec);
        self.store.insert_record(&rec)?;
        self.log_record_created(&rec)?;
        tx.commit()?;
        Ok(rec)
    }

    /// Gate-independent count helper used by opportunity queries.
    pub(crate) fn salesperson_records(
        &self,
        client_id: &str,
        salesperson_id: &str,
    ) -> DeskResult<Vec<Record>> {
        self.store.records_for_salesperson(client_id, salesperson_id)
    }
}
