//! Client directory tests — mandatory fields, phone search, the trash
//! and the admin-only permanent delete cascade.

use salesdesk_core::{
    client_directory::ClientFields,
    comment::CommentParent,
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

/// First name and phone are the only mandatory identity fields.
#[test]
fn create_requires_name_and_phone() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");

    let err = desk
        .create_client(
            &sp,
            ClientFields {
                first_name: Some("Ana".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_FIELD));

    let err = desk
        .create_client(
            &sp,
            ClientFields {
                phone: Some("555-1000".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_FIELD));

    desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();
}

/// Phone search is exact-match over live clients only.
#[test]
fn phone_search_excludes_trash() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();
    desk.create_client(&sp, fields("Berta", "555-2000")).unwrap();

    assert_eq!(desk.search_client_by_phone("555-1000").unwrap().len(), 1);
    assert!(desk.search_client_by_phone("555-10").unwrap().is_empty());

    desk.soft_delete_client(&sp, &a.client_id).unwrap();
    assert!(desk.search_client_by_phone("555-1000").unwrap().is_empty());
}

/// Soft delete moves a client between the active and trashed listings;
/// restore moves it back and clears the deletion stamp.
#[test]
fn soft_delete_and_restore() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();

    let err = desk.restore_client(&sp, &a.client_id).unwrap_err();
    assert_eq!(err.code(), Some(codes::NOT_DELETED));

    desk.soft_delete_client(&sp, &a.client_id).unwrap();
    assert!(desk.active_clients().unwrap().is_empty());
    assert_eq!(desk.trashed_clients().unwrap().len(), 1);

    let restored = desk.restore_client(&sp, &a.client_id).unwrap();
    assert!(!restored.deleted);
    assert_eq!(restored.deleted_at, None);
    assert_eq!(desk.active_clients().unwrap().len(), 1);
}

/// Permanent deletion is admin-only and refuses to orphan records
/// unless the cascade is explicitly requested.
#[test]
fn permanent_delete_guards_and_cascade() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let admin = Actor::admin("boss");

    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();
    let rec = desk
        .create_record(&a.client_id, "sp-1", 1, RecordPatch::default())
        .unwrap();
    desk.add_comment(&sp, CommentParent::Record(rec.record_id.clone()), "called twice")
        .unwrap();
    desk.add_comment(&sp, CommentParent::Client(a.client_id.clone()), "prefers mornings")
        .unwrap();

    let err = desk
        .permanent_delete_client(&sp, &a.client_id, true)
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::ADMIN_ONLY));

    let err = desk
        .permanent_delete_client(&admin, &a.client_id, false)
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::RECORDS_EXIST));

    desk.permanent_delete_client(&admin, &a.client_id, true)
        .unwrap();
    assert!(desk.client(&a.client_id).is_err());
    assert!(desk.record(&rec.record_id).is_err());
    assert!(desk
        .comments_for(&CommentParent::Record(rec.record_id.clone()))
        .unwrap()
        .is_empty());
    assert!(desk
        .comments_for(&CommentParent::Client(a.client_id.clone()))
        .unwrap()
        .is_empty());

    let events = desk.events_by_type("client_purged").unwrap();
    assert_eq!(events.len(), 1);
}

/// Document flags have a single writer — the external document store —
/// and merge field by field.
#[test]
fn document_flags_merge() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();

    desk.set_document_flags(&a.client_id, Some(true), None, None)
        .unwrap();
    let c = desk
        .set_document_flags(&a.client_id, None, Some(true), None)
        .unwrap();
    assert!(c.id_uploaded);
    assert!(c.income_uploaded);
    assert!(!c.residence_uploaded);
}

/// Trashed parents take no comments; live ones do again after a
/// restore.
#[test]
fn comments_require_a_live_parent() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();
    let rec = desk
        .create_record(&a.client_id, "sp-1", 1, RecordPatch::default())
        .unwrap();

    desk.delete_record(&rec.record_id, &sp).unwrap();
    let err = desk
        .add_comment(&sp, CommentParent::Record(rec.record_id.clone()), "still here?")
        .unwrap_err();
    assert_eq!(err.code(), Some("not_found"));

    desk.soft_delete_client(&sp, &a.client_id).unwrap();
    let err = desk
        .add_comment(&sp, CommentParent::Client(a.client_id.clone()), "still here?")
        .unwrap_err();
    assert_eq!(err.code(), Some("not_found"));

    desk.restore_client(&sp, &a.client_id).unwrap();
    desk.add_comment(&sp, CommentParent::Client(a.client_id), "back from trash")
        .unwrap();
}

/// Comments belong to their author: others cannot delete them, admins
/// can. An empty body never lands.
#[test]
fn comment_ownership() {
    let mut desk = Desk::in_memory().unwrap();
    let sp = Actor::salesperson("sp-1");
    let other = Actor::salesperson("sp-2");
    let admin = Actor::admin("boss");
    let a = desk.create_client(&sp, fields("Ana", "555-1000")).unwrap();

    let err = desk
        .add_comment(&sp, CommentParent::Client(a.client_id.clone()), "   ")
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_FIELD));

    let comment = desk
        .add_comment(&sp, CommentParent::Client(a.client_id.clone()), "prefers mornings")
        .unwrap();

    let err = desk.delete_comment(&other, &comment.comment_id).unwrap_err();
    assert_eq!(err.code(), Some(codes::NOT_OWNER));

    desk.delete_comment(&admin, &comment.comment_id).unwrap();
    assert!(desk
        .comments_for(&CommentParent::Client(a.client_id))
        .unwrap()
        .is_empty());
}
