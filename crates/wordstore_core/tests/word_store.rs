use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use wordstore_core::{
    ConflictPolicy, InsertOutcome, SqliteWordStore, StoreError, WordStore, WordValidationError,
};

fn memory_store(policy: ConflictPolicy) -> SqliteWordStore {
    SqliteWordStore::open_in_memory(policy).unwrap()
}

#[test]
fn insert_assigns_sequential_ids() {
    let store = memory_store(ConflictPolicy::Ignore);

    let first = store.insert_word("alpha").unwrap().into_word();
    let second = store.insert_word("beta").unwrap().into_word();

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
}

#[test]
fn ids_are_unique_across_inserts() {
    let store = memory_store(ConflictPolicy::Allow);
    for text in ["m", "a", "z", "a", "q", "m"] {
        store.insert_word(text).unwrap();
    }

    let words = store.scan_ordered().unwrap();
    let ids = words.iter().map(|word| word.id).collect::<HashSet<_>>();
    assert_eq!(ids.len(), words.len());
    assert_eq!(words.len(), 6);
}

#[test]
fn duplicate_insert_is_ignored_and_returns_existing_identity() {
    let store = memory_store(ConflictPolicy::Ignore);

    let created = store.insert_word("Hello").unwrap();
    let repeated = store.insert_word("Hello").unwrap();

    assert!(created.is_inserted());
    assert_eq!(repeated, InsertOutcome::Existing(created.word().clone()));
    assert_eq!(store.scan_ordered().unwrap().len(), 1);
}

#[test]
fn duplicate_check_is_case_sensitive() {
    let store = memory_store(ConflictPolicy::Ignore);
    store.insert_word("hello").unwrap();
    assert!(store.insert_word("Hello").unwrap().is_inserted());
}

#[test]
fn scan_orders_by_text_then_id() {
    let store = memory_store(ConflictPolicy::Allow);
    for text in ["World", "apple", "Hello", "World", "Banana"] {
        store.insert_word(text).unwrap();
    }

    let words = store.scan_ordered().unwrap();
    let texts = words.iter().map(|word| word.text.as_str()).collect::<Vec<_>>();
    assert_eq!(texts, vec!["Banana", "Hello", "World", "World", "apple"]);

    let worlds = words
        .iter()
        .filter(|word| word.text == "World")
        .map(|word| word.id)
        .collect::<Vec<_>>();
    assert_eq!(worlds, vec![1, 4]);
}

#[test]
fn delete_all_does_not_reuse_ids() {
    let store = memory_store(ConflictPolicy::Ignore);

    let a = store.insert_word("A").unwrap().into_word();
    assert_eq!(a.id, 1);
    assert_eq!(store.delete_all().unwrap(), 1);

    let b = store.insert_word("B").unwrap().into_word();
    assert_eq!(b.id, 2);
}

#[test]
fn reinserting_deleted_text_gets_fresh_id() {
    let store = memory_store(ConflictPolicy::Ignore);
    let before = store.insert_word("again").unwrap().into_word();
    store.delete_all().unwrap();

    let after = store.insert_word("again").unwrap();
    assert!(after.is_inserted());
    assert!(after.word().id > before.id);
}

#[test]
fn empty_text_is_rejected_without_writing() {
    let store = memory_store(ConflictPolicy::Ignore);

    let err = store.insert_word("").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(WordValidationError::EmptyText)
    ));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn delete_all_on_empty_store_removes_nothing() {
    let store = memory_store(ConflictPolicy::Ignore);
    assert_eq!(store.delete_all().unwrap(), 0);
}

#[test]
fn file_store_keeps_words_and_id_sequence_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.db");

    let store = SqliteWordStore::open(&path, ConflictPolicy::Ignore).unwrap();
    store.insert_word("persisted").unwrap();
    store.insert_word("removed later").unwrap();
    store.delete_all().unwrap();
    store.insert_word("persisted").unwrap();
    drop(store);

    let reopened = SqliteWordStore::open(&path, ConflictPolicy::Ignore).unwrap();
    let words = reopened.scan_ordered().unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].id, 3);

    let next = reopened.insert_word("next").unwrap().into_word();
    assert_eq!(next.id, 4);
}

#[test]
fn reads_run_alongside_writer_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteWordStore::open(dir.path().join("shared.db"), ConflictPolicy::Ignore).unwrap(),
    );

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for index in 0..50 {
                store.insert_word(&format!("word-{index:03}")).unwrap();
            }
        })
    };

    let mut last_len = 0;
    while !writer.is_finished() {
        let words = store.scan_ordered().unwrap();
        assert!(words.len() >= last_len);
        assert!(words.windows(2).all(|pair| pair[0].text <= pair[1].text));
        last_len = words.len();
    }
    writer.join().unwrap();

    assert_eq!(store.count().unwrap(), 50);
}

#[test]
fn invalid_persisted_rows_are_reported() {
    let conn = wordstore_core::db::open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         INSERT INTO word_table (word) VALUES ('');",
    )
    .unwrap();
    let store = SqliteWordStore::from_connection(conn, ConflictPolicy::Ignore);

    let err = store.scan_ordered().unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}
