use std::collections::HashMap;

use attachment_uploads::storage::models::{AttachmentRecord, NewAttachment, MEDIA_RECORD_TYPE};
use attachment_uploads::storage::{Database, DatabaseError};

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_attachment(key: &str) -> NewAttachment {
    NewAttachment {
        key: format!("https://bucket.example.com/{key}"),
        service_name: "s3".to_string(),
        file_name: "receipt.png".to_string(),
        content_type: "image/png".to_string(),
        byte_size: 1024,
        checksum: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string(),
        record_id: None,
        record_type: Some(MEDIA_RECORD_TYPE.to_string()),
        metadata: None,
    }
}

fn sample_attachment_for(key: &str, record_id: &str) -> NewAttachment {
    let mut attachment = sample_attachment(key);
    attachment.record_id = Some(record_id.to_string());
    attachment
}

#[test]
fn test_create_and_get_attachment() {
    let (_dir, db) = test_db();

    let created = db.create_attachment(sample_attachment("k1")).unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.created_at, created.updated_at);

    let retrieved = db
        .get_attachment(&created.id)
        .unwrap()
        .expect("attachment should exist");
    assert_eq!(retrieved, created);
    assert_eq!(retrieved.key, "https://bucket.example.com/k1");
    assert_eq!(retrieved.service_name, "s3");
    assert_eq!(retrieved.file_name, "receipt.png");
    assert_eq!(retrieved.record_type.as_deref(), Some("media"));
    assert_eq!(retrieved.record_id, None);
}

#[test]
fn test_created_ids_are_unique() {
    let (_dir, db) = test_db();
    let a = db.create_attachment(sample_attachment("a")).unwrap();
    let b = db.create_attachment(sample_attachment("b")).unwrap();
    assert_ne!(a.id, b.id);
}

#[test]
fn test_get_attachment_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_attachment("nonexistent").unwrap().is_none());
}

#[test]
fn test_get_attachment_by_key() {
    let (_dir, db) = test_db();
    let created = db.create_attachment(sample_attachment("by-key")).unwrap();

    let found = db
        .get_attachment_by_key("https://bucket.example.com/by-key")
        .unwrap()
        .expect("attachment should resolve by key");
    assert_eq!(found.id, created.id);

    assert!(db.get_attachment_by_key("missing").unwrap().is_none());
}

#[test]
fn test_duplicate_key_is_rejected() {
    let (_dir, db) = test_db();
    db.create_attachment(sample_attachment("same")).unwrap();

    let err = db.create_attachment(sample_attachment("same")).unwrap_err();
    assert!(matches!(err, DatabaseError::DuplicateKey(_)));
    assert_eq!(db.count_attachments().unwrap(), 1);
}

#[test]
fn test_put_attachment_is_idempotent_for_same_record() {
    let (_dir, db) = test_db();
    let created = db
        .create_attachment(sample_attachment_for("idem", "invoice-1"))
        .unwrap();

    db.put_attachment(&created).unwrap();

    assert_eq!(db.count_attachments().unwrap(), 1);
    assert_eq!(db.get_attachments_by_record("invoice-1").unwrap().len(), 1);
}

#[test]
fn test_put_attachment_moves_key_and_record_indexes() {
    let (_dir, db) = test_db();
    let created = db
        .create_attachment(sample_attachment_for("k1", "invoice-1"))
        .unwrap();

    let mut moved = created.clone();
    moved.key = "https://bucket.example.com/k2".to_string();
    moved.record_id = Some("invoice-2".to_string());
    db.put_attachment(&moved).unwrap();

    assert!(!db.key_exists("https://bucket.example.com/k1").unwrap());
    assert!(db
        .get_attachment_by_key("https://bucket.example.com/k1")
        .unwrap()
        .is_none());
    assert_eq!(
        db.get_attachment_by_key("https://bucket.example.com/k2")
            .unwrap()
            .unwrap()
            .id,
        created.id
    );

    assert!(db.get_attachments_by_record("invoice-1").unwrap().is_empty());
    let linked = db.get_attachments_by_record("invoice-2").unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].record_id.as_deref(), Some("invoice-2"));

    // The freed key can be claimed by a new attachment
    db.create_attachment(sample_attachment("k1")).unwrap();
    assert_eq!(db.count_attachments().unwrap(), 2);
}

#[test]
fn test_put_attachment_unlinking_keeps_other_attachments() {
    let (_dir, db) = test_db();
    let first = db
        .create_attachment(sample_attachment_for("u1", "invoice-1"))
        .unwrap();
    let second = db
        .create_attachment(sample_attachment_for("u2", "invoice-1"))
        .unwrap();

    let mut unlinked = first.clone();
    unlinked.record_id = None;
    db.put_attachment(&unlinked).unwrap();

    let ids: Vec<String> = db
        .get_attachments_by_record("invoice-1")
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![second.id]);
    assert!(db.key_exists("https://bucket.example.com/u1").unwrap());
}

#[test]
fn test_key_exists() {
    let (_dir, db) = test_db();
    db.create_attachment(sample_attachment("present")).unwrap();

    assert!(db.key_exists("https://bucket.example.com/present").unwrap());
    assert!(!db.key_exists("https://bucket.example.com/absent").unwrap());
}

#[test]
fn test_get_attachments_by_record() {
    let (_dir, db) = test_db();
    let first = db
        .create_attachment(sample_attachment_for("r-a", "invoice-1"))
        .unwrap();
    let second = db
        .create_attachment(sample_attachment_for("r-b", "invoice-1"))
        .unwrap();
    db.create_attachment(sample_attachment_for("r-c", "invoice-2"))
        .unwrap();
    db.create_attachment(sample_attachment("loose")).unwrap();

    let ids: Vec<String> = db
        .get_attachments_by_record("invoice-1")
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);

    assert_eq!(db.get_attachments_by_record("invoice-2").unwrap().len(), 1);
    assert!(db.get_attachments_by_record("nonexistent").unwrap().is_empty());
}

#[test]
fn test_list_attachments() {
    let (_dir, db) = test_db();
    db.create_attachment(sample_attachment("l1")).unwrap();
    db.create_attachment(sample_attachment_for("l2", "customer-7"))
        .unwrap();

    assert_eq!(db.list_attachments(None, None).unwrap().len(), 2);

    let owned = db.list_attachments(Some("customer-7"), None).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].key, "https://bucket.example.com/l2");
}

#[test]
fn test_list_attachments_by_record_type() {
    let (_dir, db) = test_db();
    db.create_attachment(sample_attachment("media")).unwrap();

    let mut avatar = sample_attachment("avatar");
    avatar.record_type = Some("avatar".to_string());
    db.create_attachment(avatar).unwrap();

    let media = db.list_attachments(None, Some("media")).unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].key, "https://bucket.example.com/media");

    let avatars = db.list_attachments(None, Some("avatar")).unwrap();
    assert_eq!(avatars.len(), 1);
}

#[test]
fn test_get_all_attachments_oldest_first() {
    let (_dir, db) = test_db();
    let keys = ["o1", "o2", "o3"];
    for key in keys {
        db.create_attachment(sample_attachment(key)).unwrap();
    }

    let all: Vec<AttachmentRecord> = db.get_all_attachments().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[test]
fn test_metadata_round_trip() {
    let (_dir, db) = test_db();
    let mut attachment = sample_attachment("meta");
    let mut meta = HashMap::new();
    meta.insert("width".to_string(), serde_json::json!(1920));
    meta.insert("tags".to_string(), serde_json::json!(["receipt", "q3"]));
    meta.insert("reviewed".to_string(), serde_json::json!(null));
    attachment.metadata = Some(meta);

    let created = db.create_attachment(attachment).unwrap();

    let metadata = db
        .get_attachment(&created.id)
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.get("width").unwrap(), &serde_json::json!(1920));
    assert_eq!(
        metadata.get("tags").unwrap(),
        &serde_json::json!(["receipt", "q3"])
    );
    assert_eq!(metadata.get("reviewed").unwrap(), &serde_json::json!(null));
}

#[test]
fn test_reopen_keeps_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let db = Database::open(dir.path().join("data")).unwrap();
        db.create_attachment(sample_attachment("persist"))
            .unwrap()
            .id
    };

    let db = Database::open(dir.path().join("data")).unwrap();
    assert!(db.get_attachment(&id).unwrap().is_some());
}
