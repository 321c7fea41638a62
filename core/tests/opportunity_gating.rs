//! Opportunity sequencer tests — the gate between consecutive
//! financing attempts by one salesperson for one client.

use chrono::NaiveDate;
use salesdesk_core::{
    client_directory::ClientFields,
    error::codes,
    record_lifecycle::{FinanceStatus, RecordPatch},
    types::Actor,
    Desk,
};

fn desk() -> Desk {
    Desk::in_memory().unwrap()
}

fn add_client(desk: &mut Desk, first_name: &str, phone: &str) -> String {
    let actor = Actor::salesperson("sp-1");
    desk.create_client(
        &actor,
        ClientFields {
            first_name: Some(first_name.into()),
            phone: Some(phone.into()),
            ..Default::default()
        },
    )
    .unwrap()
    .client_id
}

fn sale_patch() -> RecordPatch {
    RecordPatch {
        finance_status: Some(FinanceStatus::Financiado),
        vehicle: Some("2021 Corolla".into()),
        sale_date: NaiveDate::from_ymd_opt(2025, 3, 14),
        ..Default::default()
    }
}

/// The first attempt needs no prior sale: a fresh (client, salesperson)
/// pair opens at number 1.
#[test]
fn first_opportunity_is_always_open() {
    let mut desk = desk();
    let client = add_client(&mut desk, "Ana", "555-1000");

    let gate = desk.can_open_opportunity(&client, "sp-1").unwrap();
    assert!(gate.allowed);
    assert_eq!(gate.next_number, 1);

    let rec = desk
        .create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();
    assert_eq!(rec.opportunity_number, 1);
}

/// While the latest record is not financed, the gate stays shut and
/// a second create is rejected with need_prior_sale.
#[test]
fn unfinanced_record_blocks_the_next_opportunity() {
    let mut desk = desk();
    let client = add_client(&mut desk, "Ana", "555-1000");
    desk.create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();

    let gate = desk.can_open_opportunity(&client, "sp-1").unwrap();
    assert!(!gate.allowed);
    assert_eq!(gate.next_number, 2);

    let err = desk
        .create_record(&client, "sp-1", 2, RecordPatch::default())
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::NEED_PRIOR_SALE));
}

/// Marking the latest record financiado opens the gate at max+1.
/// A lease concludes the attempt the same way.
#[test]
fn financed_record_opens_the_next_opportunity() {
    let mut desk = desk();
    let sp = Actor::salesperson("sp-1");
    let client = add_client(&mut desk, "Ana", "555-1000");
    let rec = desk
        .create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();
    desk.update_record(&rec.record_id, &sp, sale_patch()).unwrap();

    let gate = desk.can_open_opportunity(&client, "sp-1").unwrap();
    assert!(gate.allowed);
    assert_eq!(gate.next_number, 2);

    let rec2 = desk
        .create_record(&client, "sp-1", 2, RecordPatch::default())
        .unwrap();
    assert_eq!(rec2.opportunity_number, 2);
}

/// Creating at a number other than the gate's next one is rejected
/// even when the gate is open.
#[test]
fn out_of_sequence_number_is_rejected() {
    let mut desk = desk();
    let sp = Actor::salesperson("sp-1");
    let client = add_client(&mut desk, "Ana", "555-1000");
    let rec = desk
        .create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();
    desk.update_record(&rec.record_id, &sp, sale_patch()).unwrap();

    let err = desk
        .create_record(&client, "sp-1", 3, RecordPatch::default())
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::OUT_OF_SEQUENCE));
}

/// Five opportunities is the hard cap: even with a fifth sale on the
/// books, attempt six is refused with max_opportunities.
#[test]
fn opportunity_cap_at_five() {
    let mut desk = desk();
    let sp = Actor::salesperson("sp-1");
    let client = add_client(&mut desk, "Ana", "555-1000");

    for n in 1..=5 {
        let rec = desk
            .create_record(&client, "sp-1", n, RecordPatch::default())
            .unwrap();
        desk.update_record(&rec.record_id, &sp, sale_patch()).unwrap();
    }

    let gate = desk.can_open_opportunity(&client, "sp-1").unwrap();
    assert!(!gate.allowed);
    assert_eq!(gate.max_number, 5);

    let err = desk
        .create_record(&client, "sp-1", 6, RecordPatch::default())
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MAX_OPPORTUNITIES));
}

/// The sequence is per salesperson: a second salesperson starts at 1
/// for the same client regardless of the first one's progress.
#[test]
fn sequences_are_per_salesperson() {
    let mut desk = desk();
    let client = add_client(&mut desk, "Ana", "555-1000");
    desk.create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();

    let gate = desk.can_open_opportunity(&client, "sp-2").unwrap();
    assert!(gate.allowed);
    assert_eq!(gate.next_number, 1);
}

/// Soft-deleted records drop out of the gate: trash the only record
/// and attempt 1 is open again.
#[test]
fn soft_deleted_records_do_not_count() {
    let mut desk = desk();
    let sp = Actor::salesperson("sp-1");
    let client = add_client(&mut desk, "Ana", "555-1000");
    let rec = desk
        .create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();
    desk.delete_record(&rec.record_id, &sp).unwrap();

    let gate = desk.can_open_opportunity(&client, "sp-1").unwrap();
    assert!(gate.allowed);
    assert_eq!(gate.next_number, 1);
}

/// Restoring a trashed record whose number was re-used in the meantime
/// is a conflict, not a silent duplicate.
#[test]
fn restore_into_occupied_number_conflicts() {
    let mut desk = desk();
    let sp = Actor::salesperson("sp-1");
    let client = add_client(&mut desk, "Ana", "555-1000");
    let rec = desk
        .create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();
    desk.delete_record(&rec.record_id, &sp).unwrap();
    desk.create_record(&client, "sp-1", 1, RecordPatch::default())
        .unwrap();

    let err = desk.restore_record(&rec.record_id, &sp).unwrap_err();
    assert_eq!(err.code(), Some(codes::OPPORTUNITY_RACE));
}
