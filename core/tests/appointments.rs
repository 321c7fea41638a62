//! Appointment scheduler tests — upsert semantics, the status machine
//! and the client self-service transitions.

use chrono::{NaiveDate, NaiveTime};
use salesdesk_core::{
    appointment_scheduler::{AppointmentFields, AppointmentStatus},
    client_directory::ClientFields,
    error::codes,
    record_lifecycle::RecordPatch,
    types::{Actor, Role},
    Desk,
};

fn setup() -> (Desk, String) {
    let mut desk = Desk::in_memory().unwrap();
    let actor = Actor::salesperson("sp-1");
    let client_id = desk
        .create_client(
            &actor,
            ClientFields {
                first_name: Some("Ana".into()),
                phone: Some("555-1000".into()),
                ..Default::default()
            },
        )
        .unwrap()
        .client_id;
    let record_id = desk
        .create_record(&client_id, "sp-1", 1, RecordPatch::default())
        .unwrap()
        .record_id;
    (desk, record_id)
}

fn slot() -> AppointmentFields {
    AppointmentFields {
        date: NaiveDate::from_ymd_opt(2025, 4, 2),
        time: NaiveTime::from_hms_opt(10, 30, 0),
        dealer: Some("North Lot".into()),
        ..Default::default()
    }
}

/// A record has at most one appointment: the second upsert edits the
/// first row instead of creating another.
#[test]
fn upsert_never_creates_a_second_row() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");

    let first = desk.upsert_appointment(&sp, &record_id, slot()).unwrap();
    assert_eq!(first.status, AppointmentStatus::Agendado);

    let second = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                dealer: Some("South Lot".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(second.appointment_id, first.appointment_id);
    assert_eq!(second.dealer.as_deref(), Some("South Lot"));
    assert_eq!(second.date, first.date);
    assert_eq!(
        desk.store()
            .appointment_count_for_record(&record_id)
            .unwrap(),
        1
    );
}

/// Without a full date+time slot the appointment starts unconfigured,
/// and flips to agendado once the slot is completed.
#[test]
fn unconfigured_until_slot_is_complete() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");

    let appt = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                date: NaiveDate::from_ymd_opt(2025, 4, 2),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::SinConfigurar);

    let appt = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                time: NaiveTime::from_hms_opt(10, 30, 0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::Agendado);
}

/// Terminal states are frozen to direct status calls; editing the
/// appointment is the one path that re-opens them.
#[test]
fn terminal_status_reopens_only_through_edit() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");

    let appt = desk.upsert_appointment(&sp, &record_id, slot()).unwrap();
    desk.set_appointment_status(&sp, &appt.appointment_id, AppointmentStatus::Cumplido)
        .unwrap();

    let err = desk
        .set_appointment_status(&sp, &appt.appointment_id, AppointmentStatus::Agendado)
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::TERMINAL_STATUS));

    // Dealer-only edit: slot untouched, state back to agendado.
    let reopened = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                dealer: Some("South Lot".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(reopened.status, AppointmentStatus::Agendado);
    assert!(!reopened.confirmed);
    assert_eq!(reopened.date, appt.date);
    assert_eq!(reopened.time, appt.time);
    assert_eq!(reopened.dealer.as_deref(), Some("South Lot"));
}

/// Appointment management is open to the owning salesperson, the BDC
/// desk and admins; other salespeople are shut out.
#[test]
fn appointment_access_control() {
    let (mut desk, record_id) = setup();

    let err = desk
        .upsert_appointment(&Actor::salesperson("sp-2"), &record_id, slot())
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::NOT_OWNER));

    desk.upsert_appointment(&Actor::new("bdc-1", Role::Bdc), &record_id, slot())
        .unwrap();
    desk.upsert_appointment(&Actor::admin("boss"), &record_id, slot())
        .unwrap();
}

/// A record in the trash takes no appointment traffic at all — no new
/// scheduling, no status changes on the appointment it already had.
#[test]
fn trashed_record_takes_no_appointments() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");

    let appt = desk.upsert_appointment(&sp, &record_id, slot()).unwrap();
    desk.delete_record(&record_id, &sp).unwrap();

    let err = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                dealer: Some("South Lot".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), Some("not_found"));

    let err = desk
        .set_appointment_status(&sp, &appt.appointment_id, AppointmentStatus::Cumplido)
        .unwrap_err();
    assert_eq!(err.code(), Some("not_found"));

    // Restoring the record re-opens scheduling.
    desk.restore_record(&record_id, &sp).unwrap();
    desk.upsert_appointment(&sp, &record_id, slot()).unwrap();
}

/// Confirming requires a slot: an unconfigured appointment cannot be
/// confirmed into agendado.
#[test]
fn confirm_requires_a_slot() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");

    let appt = desk
        .upsert_appointment(
            &sp,
            &record_id,
            AppointmentFields {
                dealer: Some("North Lot".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(appt.status, AppointmentStatus::SinConfigurar);

    let err = desk.client_confirm(&appt.appointment_id).unwrap_err();
    assert_eq!(err.code(), Some(codes::NOT_SCHEDULED));

    desk.upsert_appointment(&sp, &record_id, slot()).unwrap();
    let confirmed = desk.client_confirm(&appt.appointment_id).unwrap();
    assert!(confirmed.confirmed);
}

/// The client confirms: status stays agendado, the marker is set and
/// survives until a reschedule clears it.
#[test]
fn client_confirm_and_reschedule() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");
    let appt = desk.upsert_appointment(&sp, &record_id, slot()).unwrap();

    let confirmed = desk.client_confirm(&appt.appointment_id).unwrap();
    assert!(confirmed.confirmed);
    assert_eq!(confirmed.status, AppointmentStatus::Agendado);

    // A reschedule needs the full slot.
    let err = desk
        .client_reschedule(
            &appt.appointment_id,
            NaiveDate::from_ymd_opt(2025, 4, 9),
            None,
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::DATE_WITHOUT_TIME));

    let moved = desk
        .client_reschedule(
            &appt.appointment_id,
            NaiveDate::from_ymd_opt(2025, 4, 9),
            NaiveTime::from_hms_opt(15, 0, 0),
            None,
        )
        .unwrap();
    assert_eq!(moved.date, NaiveDate::from_ymd_opt(2025, 4, 9));
    assert!(!moved.confirmed, "reschedule clears the confirmation");
}

/// Running late moves the time and the status; cancelling closes the
/// self-service channel entirely.
#[test]
fn client_late_and_cancel() {
    let (mut desk, record_id) = setup();
    let sp = Actor::salesperson("sp-1");
    let appt = desk.upsert_appointment(&sp, &record_id, slot()).unwrap();

    let late = desk
        .client_report_late(&appt.appointment_id, NaiveTime::from_hms_opt(11, 15, 0).unwrap())
        .unwrap();
    assert_eq!(late.status, AppointmentStatus::Tarde);
    assert_eq!(late.time, NaiveTime::from_hms_opt(11, 15, 0));

    desk.client_cancel(&appt.appointment_id).unwrap();
    let err = desk.client_confirm(&appt.appointment_id).unwrap_err();
    assert_eq!(err.code(), Some(codes::TERMINAL_STATUS));
}
