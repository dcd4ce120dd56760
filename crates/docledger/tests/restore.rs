//! Restore scenarios against the in-memory store.

mod common;

use common::*;
use serde_json::{Value, json};

use docledger::SetMode;
use docledger_core::error::NotFoundError;
use docledger_core::{
    AlwaysConfirm, DocumentStatus, Error, FieldState, LogId, Operation, Outcome, ValueDiff,
};

#[tokio::test]
async fn diff_updates_and_restore_to_first() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "tags": ["a", "b"]})]).await;
    let tags = path("tags");

    let first = ledger
        .set_one(COLLECTION, &key("X"), &tags, json!(["b", "c"]), SetMode::Update, &operator())
        .await
        .unwrap();
    let second = ledger
        .set_one(COLLECTION, &key("X"), &tags, json!(["c", "d"]), SetMode::Update, &operator())
        .await
        .unwrap();

    let log = document(&ledger, "X").await.log("log").unwrap();
    assert_eq!(log[0].log_id, second.log_id.clone().unwrap());
    assert_eq!(
        log[0].changed_values,
        Some(ValueDiff {
            added: vec![json!("d")],
            removed: vec![json!("b")],
        })
    );
    assert!(log[0].previous_value.is_none());
    assert_eq!(
        log[1].changed_values,
        Some(ValueDiff {
            added: vec![json!("c")],
            removed: vec![json!("a")],
        })
    );

    let report = ledger
        .restore_one(COLLECTION, &key("X"), &first.log_id.unwrap(), &operator())
        .await
        .unwrap();
    assert_eq!(report.outcome, Outcome::Modified);

    let doc = document(&ledger, "X").await;
    assert_eq!(as_set(doc.get(&tags)), vec!["\"a\"", "\"b\""]);

    let log = doc.log("log").unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].operation, Operation::Restore);
    assert_eq!(log[0].previous_log_id, Some(LogId::new(log[2].log_id.as_str())));
}

#[tokio::test]
async fn diff_chain_round_trip() {
    let states = vec![
        json!(["a", "b"]),
        json!(["b", "c"]),
        json!(["c", "d", "e"]),
        json!(["e", "a", "f"]),
        json!(["f", "g"]),
        json!(["g", "a", "b", "c"]),
    ];
    let tags = path("tags");

    for target in 1..states.len() {
        let (_store, ledger) =
            seeded(vec![json!({"stable_id": "X", "tags": states[0].clone()})]).await;

        let mut log_ids = Vec::new();
        for state in &states[1..] {
            let report = ledger
                .set_one(COLLECTION, &key("X"), &tags, state.clone(), SetMode::Update, &operator())
                .await
                .unwrap();
            log_ids.push(report.log_id.unwrap());
        }

        ledger
            .restore_one(COLLECTION, &key("X"), &log_ids[target - 1], &operator())
            .await
            .unwrap();

        let doc = document(&ledger, "X").await;
        assert_eq!(
            as_set(doc.get(&tags)),
            as_set(Some(&states[target - 1])),
            "restoring update {target}"
        );
    }
}

#[tokio::test]
async fn restore_of_scalar_update_uses_snapshot() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "title": "one"})]).await;
    let title = path("title");

    let first = ledger
        .set_one(COLLECTION, &key("X"), &title, json!("two"), SetMode::Update, &operator())
        .await
        .unwrap();
    ledger
        .set_one(COLLECTION, &key("X"), &title, json!("three"), SetMode::Update, &operator())
        .await
        .unwrap();

    ledger
        .restore_one(COLLECTION, &key("X"), &first.log_id.unwrap(), &operator())
        .await
        .unwrap();

    assert_eq!(document(&ledger, "X").await.get(&title), Some(&json!("one")));
}

#[tokio::test]
async fn remove_then_restore_brings_back_value_and_type() {
    let original = json!({"sex": "female", "age": 42, "codes": [1, 2]});
    let (_store, ledger) =
        seeded(vec![json!({"stable_id": "X", "sample": original.clone()})]).await;
    let sample = path("sample");

    let removed = ledger
        .remove(COLLECTION, &sample, &AlwaysConfirm, &operator())
        .await
        .unwrap();
    assert!(document(&ledger, "X").await.get(&sample).is_none());

    ledger
        .restore_one(COLLECTION, &key("X"), &removed.log_id.unwrap(), &operator())
        .await
        .unwrap();

    assert_eq!(document(&ledger, "X").await.get(&sample), Some(&original));
}

#[tokio::test]
async fn restore_of_upsert_baseline_unsets_field() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X"})]).await;
    let notes = path("notes");

    let created = ledger
        .set_one(COLLECTION, &key("X"), &notes, json!("n"), SetMode::Upsert, &operator())
        .await
        .unwrap();
    ledger
        .restore_one(COLLECTION, &key("X"), &created.log_id.unwrap(), &operator())
        .await
        .unwrap();

    let doc = document(&ledger, "X").await;
    assert!(doc.get(&notes).is_none());
    let log = doc.log("log").unwrap();
    assert_eq!(log[0].restored_value, Some(FieldState::Missing));
    assert_eq!(log[0].previous_value, Some(FieldState::Present(json!("n"))));
}

#[tokio::test]
async fn rename_swap_restores_name_and_value() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "a": {"v": [1, 2]}})]).await;

    ledger
        .rename(COLLECTION, &path("a"), &path("b"), &operator())
        .await
        .unwrap();
    ledger
        .rename(COLLECTION, &path("b"), &path("a"), &operator())
        .await
        .unwrap();

    let doc = document(&ledger, "X").await;
    assert_eq!(doc.get(&path("a")), Some(&json!({"v": [1, 2]})));
    assert!(doc.get(&path("b")).is_none());

    let log = doc.log("log").unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].renamed_fields(), Some((path("b"), path("a"))));
    assert_eq!(log[1].renamed_fields(), Some((path("a"), path("b"))));
}

#[tokio::test]
async fn restore_of_rename_renames_back() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "old": "v"})]).await;

    let renamed = ledger
        .rename(COLLECTION, &path("old"), &path("new"), &operator())
        .await
        .unwrap();
    ledger
        .restore_one(COLLECTION, &key("X"), &renamed.log_id.unwrap(), &operator())
        .await
        .unwrap();

    let doc = document(&ledger, "X").await;
    assert_eq!(doc.get(&path("old")), Some(&json!("v")));
    assert!(doc.get(&path("new")).is_none());

    let log = doc.log("log").unwrap();
    assert_eq!(log[0].operation, Operation::Restore);
    assert_eq!(log[0].previous_value, Some(FieldState::Present(json!("new"))));
    assert_eq!(log[0].restored_value, Some(FieldState::Present(json!("old"))));
}

#[tokio::test]
async fn restore_to_current_value_is_no_change() {
    let (store, ledger) = seeded(vec![json!({"stable_id": "X", "title": "one"})]).await;
    let title = path("title");

    let first = ledger
        .set_one(COLLECTION, &key("X"), &title, json!("two"), SetMode::Update, &operator())
        .await
        .unwrap();
    ledger
        .set_one(COLLECTION, &key("X"), &title, json!("one"), SetMode::Update, &operator())
        .await
        .unwrap();
    let audits_before = store.len("log_details").unwrap();

    let report = ledger
        .restore_one(COLLECTION, &key("X"), &first.log_id.unwrap(), &operator())
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::NoChange);
    assert_eq!(store.len("log_details").unwrap(), audits_before);
}

#[tokio::test]
async fn restore_errors_leave_no_audit_record() {
    let (store, ledger) = seeded(vec![]).await;
    ledger
        .insert_documents(COLLECTION, vec![body(json!({"stable_id": "X"}))], &operator())
        .await
        .unwrap();
    let insert_id = document(&ledger, "X").await.log("log").unwrap()[0].log_id.clone();
    let audits_before = store.len("log_details").unwrap();

    let err = ledger
        .restore_one(COLLECTION, &key("missing"), &insert_id, &operator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(NotFoundError::Document { .. })));

    let err = ledger
        .restore_one(COLLECTION, &key("X"), &LogId::new("unknown"), &operator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(NotFoundError::LogEntry { .. })));

    let err = ledger
        .restore_one(COLLECTION, &key("X"), &insert_id, &operator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRestorable { .. }));

    let err = ledger
        .restore_all(COLLECTION, &insert_id, &operator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRestorable { .. }));

    assert_eq!(store.len("log_details").unwrap(), audits_before);
}

#[tokio::test]
async fn restore_all_skips_documents_per_document() {
    let (store, ledger) = seeded(vec![
        json!({"stable_id": "A", "status": "draft"}),
        json!({"stable_id": "B", "status": "draft"}),
        json!({"stable_id": "C"}),
    ])
    .await;
    let status = path("status");

    let batch = ledger
        .set_all(COLLECTION, &status, json!("final"), SetMode::Update, &operator())
        .await
        .unwrap();
    let log_id = batch.log_id.unwrap();
    assert_eq!(batch.modified, 2);

    // B is put back by hand; restoring it again would change nothing.
    ledger
        .set_one(COLLECTION, &key("B"), &status, json!("draft"), SetMode::Update, &operator())
        .await
        .unwrap();

    let report = ledger
        .restore_all(COLLECTION, &log_id, &operator())
        .await
        .unwrap();

    assert_eq!(report.outcome, Outcome::Modified);
    assert_eq!(report.modified, 1);
    assert_eq!(report.count(&DocumentStatus::Modified), 1);
    assert_eq!(
        report.count(&DocumentStatus::Skipped("value unchanged".to_string())),
        1
    );
    assert_eq!(document(&ledger, "A").await.get(&status), Some(&json!("draft")));
    assert!(document(&ledger, "C").await.get(&status).is_none());

    let again = ledger
        .restore_all(COLLECTION, &log_id, &operator())
        .await
        .unwrap();
    assert_eq!(again.outcome, Outcome::NoChange);
    assert_eq!(
        store.len("log_details").unwrap(),
        3,
        "set_all, set_one and the first restore_all"
    );
}

#[tokio::test]
async fn restore_after_rename_is_rejected() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "tags": ["a", "b"]})]).await;

    let update = ledger
        .set_one(COLLECTION, &key("X"), &path("tags"), json!(["a"]), SetMode::Update, &operator())
        .await
        .unwrap();
    ledger
        .rename(COLLECTION, &path("tags"), &path("labels"), &operator())
        .await
        .unwrap();

    let err = ledger
        .restore_one(COLLECTION, &key("X"), &update.log_id.unwrap(), &operator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRestorable { .. }));
}

#[tokio::test]
async fn restoring_a_restore_target_twice_steps_back() {
    let (_store, ledger) = seeded(vec![json!({"stable_id": "X", "tags": ["a", "b"]})]).await;
    let tags = path("tags");

    let first = ledger
        .set_one(COLLECTION, &key("X"), &tags, json!(["b", "c"]), SetMode::Update, &operator())
        .await
        .unwrap()
        .log_id
        .unwrap();
    let second = ledger
        .set_one(COLLECTION, &key("X"), &tags, json!(["c", "d"]), SetMode::Update, &operator())
        .await
        .unwrap()
        .log_id
        .unwrap();

    ledger
        .restore_one(COLLECTION, &key("X"), &first, &operator())
        .await
        .unwrap();
    assert_eq!(as_set(document(&ledger, "X").await.get(&tags)), vec!["\"a\"", "\"b\""]);

    // The restore entry is replayed as a snapshot on the way back.
    ledger
        .restore_one(COLLECTION, &key("X"), &second, &operator())
        .await
        .unwrap();
    let value: Option<Value> = document(&ledger, "X").await.get(&tags).cloned();
    assert_eq!(as_set(value.as_ref()), vec!["\"b\"", "\"c\""]);
}
