//! Appointment scheduler — at most one live appointment per record,
//! with its own status machine, decoupled from record status.
//!
//! Two actor profiles share the machine: staff (owning salesperson,
//! BDC, admin) through `upsert_appointment` / `set_appointment_status`,
//! and the client through the token-gated self-service operations
//! (`client_confirm`, `client_reschedule`, `client_report_late`,
//! `client_cancel`). The token transport is external; only the
//! resulting transitions live here.

use crate::{
    desk::{now, Desk},
    error::{codes, DeskError, DeskResult},
    event::DeskEvent,
    notify::Channel,
    record_lifecycle::Record,
    types::{Actor, AppointmentId, ClientId, RecordId, Role},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Created without a date+time yet.
    SinConfigurar,
    Agendado,
    /// Client reported running late — still expected.
    Tarde,
    CambioHora,
    TresSemanas,
    NoShow,
    Cumplido,
    Cancelado,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::SinConfigurar => "sin_configurar",
            AppointmentStatus::Agendado => "agendado",
            AppointmentStatus::Tarde => "tarde",
            AppointmentStatus::CambioHora => "cambio_hora",
            AppointmentStatus::TresSemanas => "tres_semanas",
            AppointmentStatus::NoShow => "no_show",
            AppointmentStatus::Cumplido => "cumplido",
            AppointmentStatus::Cancelado => "cancelado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sin_configurar" => Some(AppointmentStatus::SinConfigurar),
            "agendado" => Some(AppointmentStatus::Agendado),
            "tarde" => Some(AppointmentStatus::Tarde),
            "cambio_hora" => Some(AppointmentStatus::CambioHora),
            "tres_semanas" => Some(AppointmentStatus::TresSemanas),
            "no_show" => Some(AppointmentStatus::NoShow),
            "cumplido" => Some(AppointmentStatus::Cumplido),
            "cancelado" => Some(AppointmentStatus::Cancelado),
            _ => None,
        }
    }

    /// Terminal states only move again through a staff re-schedule
    /// (`upsert_appointment`), never through direct status calls.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cumplido | AppointmentStatus::NoShow | AppointmentStatus::Cancelado
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: AppointmentId,
    pub client_id: ClientId,
    pub record_id: RecordId,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub dealer: Option<String>,
    pub language: Option<String>,
    pub status: AppointmentStatus,
    /// Client-side confirmation marker; cleared on reschedule.
    pub confirmed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial fields for upsert. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentFields {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub dealer: Option<String>,
    pub language: Option<String>,
}

impl Desk {
    /// Create or update the record's single appointment. A second
    /// upsert is always an update — never a second row. Editing an
    /// appointment in a terminal state re-opens it to agendado (staff
    /// re-engaging after an anomaly).
    pub fn upsert_appointment(
        &mut self,
        actor: &Actor,
        record_id: &str,
        fields: AppointmentFields,
    ) -> DeskResult<Appointment> {
        // Trashed records take no appointments.
        let rec = self.live_record(record_id)?;
        check_appointment_access(actor, &rec)?;

        let appt = match self.store.appointment_for_record(record_id)? {
            Some(mut appt) => {
                let was_terminal = appt.status.is_terminal();
                if let Some(v) = fields.date {
                    appt.date = Some(v);
                }
                if let Some(v) = fields.time {
                    appt.time = Some(v);
                }
                if let Some(v) = fields.dealer {
                    appt.dealer = Some(v);
                }
                if let Some(v) = fields.language {
                    appt.language = Some(v);
                }
                if was_terminal {
                    appt.status = AppointmentStatus::Agendado;
                    appt.confirmed = false;
                } else if appt.status == AppointmentStatus::SinConfigurar
                    && appt.date.is_some()
                    && appt.time.is_some()
                {
                    appt.status = AppointmentStatus::Agendado;
                }
                appt.updated_at = now();
                self.store.save_appointment(&appt)?;
                appt
            }
            None => {
                let status = if fields.date.is_some() && fields.time.is_some() {
                    AppointmentStatus::Agendado
                } else {
                    AppointmentStatus::SinConfigurar
                };
                let ts = now();
                let appt = Appointment {
                    appointment_id: uuid::Uuid::new_v4().to_string(),
                    client_id: rec.client_id.clone(),
                    record_id: record_id.to_string(),
                    date: fields.date,
                    time: fields.time,
                    dealer: fields.dealer,
                    language: fields.language,
                    status,
                    confirmed: false,
                    created_at: ts.clone(),
                    updated_at: ts,
                };
                self.store.insert_appointment(&appt)?;
                appt
            }
        };

        self.log_event(
            Some(actor),
            &DeskEvent::AppointmentScheduled {
                appointment_id: appt.appointment_id.clone(),
                record_id: appt.record_id.clone(),
                status: appt.status.as_str().to_string(),
            },
        )?;
        let channel = self.client(&appt.client_id)?.preferred_channel;
        self.dispatch(
            channel,
            "appointment_scheduled",
            &appt.client_id,
            json!({
                "appointment_id": appt.appointment_id,
                "date": appt.date,
                "time": appt.time,
                "dealer": appt.dealer,
                "language": appt.language,
            }),
        );
        Ok(appt)
    }

    /// Direct staff transition: any target is reachable from any
    /// non-terminal state. Terminal states are frozen to this call —
    /// re-open them through `upsert_appointment`.
    pub fn set_appointment_status(
        &mut self,
        actor: &Actor,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> DeskResult<Appointment> {
        let mut appt = self.appointment(appointment_id)?;
        let rec = self.live_record(&appt.record_id)?;
        check_appointment_access(actor, &rec)?;

        if appt.status.is_terminal() {
            return Err(DeskError::validation(
                codes::TERMINAL_STATUS,
                format!("appointment is {}; edit it to re-open", appt.status.as_str()),
            ));
        }
        if appt.status == status {
            return Ok(appt);
        }
        let old = appt.status;
        appt.status = status;
        appt.updated_at = now();
        self.store.save_appointment(&appt)?;
        self.log_event(
            Some(actor),
            &DeskEvent::AppointmentStatusChanged {
                appointment_id: appt.appointment_id.clone(),
                old_status: old.as_str().to_string(),
                new_status: status.as_str().to_string(),
            },
        )?;
        Ok(appt)
    }

    // ── Client self-service channel ────────────────────────────
    // Caller identity was established by the token transport.

    /// The client confirms they are coming. There must be a slot to
    /// confirm.
    pub fn client_confirm(&mut self, appointment_id: &str) -> DeskResult<Appointment> {
        let mut appt = self.live_self_service(appointment_id)?;
        if appt.date.is_none() || appt.time.is_none() {
            return Err(DeskError::validation(
                codes::NOT_SCHEDULED,
                "appointment has no date and time to confirm",
            ));
        }
        appt.status = AppointmentStatus::Agendado;
        appt.confirmed = true;
        appt.updated_at = now();
        self.store.save_appointment(&appt)?;
        self.log_event(
            None,
            &DeskEvent::AppointmentConfirmed {
                appointment_id: appt.appointment_id.clone(),
            },
        )?;
        Ok(appt)
    }

    /// The client picks a new slot. Both date and time are required.
    pub fn client_reschedule(
        &mut self,
        appointment_id: &str,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        dealer: Option<String>,
    ) -> DeskResult<Appointment> {
        let (date, time) = match (date, time) {
            (Some(d), Some(t)) => (d, t),
            _ => {
                return Err(DeskError::validation(
                    codes::DATE_WITHOUT_TIME,
                    "rescheduling requires both a date and a time",
                ))
            }
        };
        let mut appt = self.live_self_service(appointment_id)?;
        appt.date = Some(date);
        appt.time = Some(time);
        if let Some(d) = dealer {
            appt.dealer = Some(d);
        }
        appt.status = AppointmentStatus::Agendado;
        appt.confirmed = false;
        appt.updated_at = now();
        self.store.save_appointment(&appt)?;
        self.log_event(
            None,
            &DeskEvent::AppointmentRescheduled {
                appointment_id: appt.appointment_id.clone(),
            },
        )?;
        Ok(appt)
    }

    /// The client reports running late; the salesperson is told.
    pub fn client_report_late(
        &mut self,
        appointment_id: &str,
        new_time: NaiveTime,
    ) -> DeskResult<Appointment> {
        let mut appt = self.live_self_service(appointment_id)?;
        appt.time = Some(new_time);
        appt.status = AppointmentStatus::Tarde;
        appt.updated_at = now();
        self.store.save_appointment(&appt)?;
        self.log_event(
            None,
            &DeskEvent::AppointmentLateReported {
                appointment_id: appt.appointment_id.clone(),
                new_time: new_time.format("%H:%M").to_string(),
            },
        )?;
        let rec = self.record(&appt.record_id)?;
        self.dispatch(
            Channel::Sms,
            "client_running_late",
            &rec.salesperson_id,
            json!({
                "appointment_id": appt.appointment_id,
                "client_id": appt.client_id,
                "new_time": appt.time,
            }),
        );
        Ok(appt)
    }

    /// The client cancels. Terminal; staff may re-engage by editing
    /// the appointment, which re-opens it.
    pub fn client_cancel(&mut self, appointment_id: &str) -> DeskResult<Appointment> {
        let mut appt = self.live_self_service(appointment_id)?;
        appt.status = AppointmentStatus::Cancelado;
        appt.confirmed = false;
        appt.updated_at = now();
        self.store.save_appointment(&appt)?;
        self.log_event(
            None,
            &DeskEvent::AppointmentCancelled {
                appointment_id: appt.appointment_id.clone(),
            },
        )?;
        Ok(appt)
    }

    pub fn appointment(&self, appointment_id: &str) -> DeskResult<Appointment> {
        self.store
            .get_appointment(appointment_id)?
            .ok_or_else(|| DeskError::not_found("appointment", appointment_id))
    }

    pub fn appointment_for_record(&self, record_id: &str) -> DeskResult<Option<Appointment>> {
        self.store.appointment_for_record(record_id)
    }

    fn live_self_service(&self, appointment_id: &str) -> DeskResult<Appointment> {
        let appt = self.appointment(appointment_id)?;
        if appt.status.is_terminal() {
            return Err(DeskError::validation(
                codes::TERMINAL_STATUS,
                format!("appointment is {}", appt.status.as_str()),
            ));
        }
        Ok(appt)
    }
}

/// Staff access: the owning salesperson, the BDC desk, or an admin.
fn check_appointment_access(actor: &Actor, rec: &Record) -> DeskResult<()> {
    let allowed = actor.is_admin()
        || actor.id == rec.salesperson_id
        || matches!(actor.role, Role::Bdc | Role::BdcManager);
    if allowed {
        Ok(())
    } else {
        Err(DeskError::forbidden(
            codes::NOT_OWNER,
            "only the owning salesperson, the BDC desk or an admin may manage this appointment",
        ))
    }
}
