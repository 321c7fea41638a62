//! Co-signer graph tests — edge uniqueness, unlink semantics and the
//! ungated record path on the cosigner side.

use salesdesk_core::{
    client_directory::ClientFields,
    error::codes,
    record_lifecycle::RecordPatch,
    types::Actor,
    Desk,
};

fn fields(first_name: &str, phone: &str) -> ClientFields {
    ClientFields {
        first_name: Some(first_name.into()),
        phone: Some(phone.into()),
        ..Default::default()
    }
}

fn setup() -> (Desk, String, String) {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let buyer = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();
    let cosigner = desk.create_client(&sp, fields("Jorge", "555-2000")).unwrap();
    (desk, buyer.client_id, cosigner.client_id)
}

/// An ordered (buyer, cosigner) pair links exactly once.
#[test]
fn duplicate_link_is_a_conflict() {
    let (mut desk, buyer, cosigner) = setup();
    let sp = Actor::salesperson("sp-1");

    desk.link_cosigner(&sp, &buyer, &cosigner).unwrap();
    let err = desk.link_cosigner(&sp, &buyer, &cosigner).unwrap_err();
    assert_eq!(err.code(), Some(codes::DUPLICATE_COSIGNER));

    // The reverse orientation is a different edge.
    desk.link_cosigner(&sp, &cosigner, &buyer).unwrap();
}

/// A client cannot back its own purchase.
#[test]
fn self_link_is_rejected() {
    let (mut desk, buyer, _) = setup();
    let sp = Actor::salesperson("sp-1");

    let err = desk.link_cosigner(&sp, &buyer, &buyer).unwrap_err();
    assert_eq!(err.code(), Some(codes::SELF_COSIGNER));
}

/// Unlinking removes the edge and nothing else: both directory entries
/// survive.
#[test]
fn unlink_keeps_both_clients() {
    let (mut desk, buyer, cosigner) = setup();
    let sp = Actor::salesperson("sp-1");

    let edge = desk.link_cosigner(&sp, &buyer, &cosigner).unwrap();
    desk.unlink_cosigner(&sp, &edge.edge_id).unwrap();

    assert!(desk.cosigners_of(&buyer).unwrap().is_empty());
    desk.client(&buyer).unwrap();
    desk.client(&cosigner).unwrap();
}

/// Search-then-create: a cosigner who is not in the directory yet is
/// created and linked in one step.
#[test]
fn create_and_link_in_one_step() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let buyer = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();

    let (cosigner, edge) = desk
        .create_and_link_cosigner(&sp, &buyer.client_id, fields("Jorge", "555-2000"))
        .unwrap();
    assert_eq!(edge.buyer_client_id, buyer.client_id);
    assert_eq!(edge.cosigner_client_id, cosigner.client_id);

    let backing = desk.cosigners_of(&buyer.client_id).unwrap();
    assert_eq!(backing.len(), 1);
    assert_eq!(backing[0].1.first_name, "Jorge");
}

/// Records on the cosigner side are numbered but never gated: they
/// open even though the buyer's attempt is not financed, and stack
/// without a prior sale.
#[test]
fn cosigner_records_bypass_the_gate() {
    let (mut desk, buyer, cosigner) = setup();
    let sp = Actor::salesperson("sp-1");

    // The buyer's own funnel is stuck at an unfinanced attempt.
    desk.create_record(&buyer, "sp-1", 1, RecordPatch::default())
        .unwrap();

    let edge = desk.link_cosigner(&sp, &buyer, &cosigner).unwrap();
    let r1 = desk
        .create_cosigner_record(&edge.edge_id, "sp-1", RecordPatch::default())
        .unwrap();
    assert_eq!(r1.client_id, cosigner);
    assert_eq!(r1.opportunity_number, 1);

    // And a second one, with nothing financed anywhere.
    let r2 = desk
        .create_cosigner_record(&edge.edge_id, "sp-1", RecordPatch::default())
        .unwrap();
    assert_eq!(r2.opportunity_number, 2);
}

/// Links to a trashed client are refused until it is restored.
#[test]
fn trashed_clients_cannot_link() {
    let (mut desk, buyer, cosigner) = setup();
    let sp = Actor::salesperson("sp-1");

    desk.soft_delete_client(&sp, &cosigner).unwrap();
    let err = desk.link_cosigner(&sp, &buyer, &cosigner).unwrap_err();
    assert_eq!(err.code(), Some("not_found"));
}
