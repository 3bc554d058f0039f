//! Integration tests for RecordStore over the in-memory and file media.

mod fixtures;

use std::sync::Arc;
use std::thread;

use dayx_core::{
    DayRecord, FileMedium, RecordMedium, RecordStore, StoreError, WordColor, WordEntry,
};
use fixtures::{add, numbered_dates, store, store_with_days};
use serde_json::json;

// =============================================================================
// Day numbering
// =============================================================================

#[test]
fn day_numbers_follow_dates_not_insertion_order() {
    let store = store_with_days(&["2024-03-01", "2024-01-01", "2024-02-01"]);
    assert_eq!(
        numbered_dates(&store),
        vec![
            (1, "2024-01-01".to_string()),
            (2, "2024-02-01".to_string()),
            (3, "2024-03-01".to_string()),
        ]
    );
}

#[test]
fn inserting_an_earlier_day_renumbers_later_days() {
    let store = store_with_days(&["2024-01-10", "2024-01-20"]);
    assert_eq!(store.get_by_date("2024-01-20").unwrap().unwrap().day_number, 2);

    add(&store, "2024-01-01", "first");
    assert_eq!(store.get_by_date("2024-01-20").unwrap().unwrap().day_number, 3);
}

#[test]
fn deleting_a_day_closes_the_gap() {
    let store = store_with_days(&["2024-01-01", "2024-01-02", "2024-01-03"]);
    assert!(store.delete_word(2, 0).unwrap().is_removed());
    assert_eq!(
        numbered_dates(&store),
        vec![(1, "2024-01-01".to_string()), (2, "2024-01-03".to_string())]
    );
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn deleting_last_word_removes_record() {
    let store = store();
    add(&store, "2024-01-05", "only");
    store.delete_word(1, 0).unwrap();
    assert_eq!(store.get_by_date("2024-01-05").unwrap(), None);
    assert!(store.medium().is_empty());
}

#[test]
fn every_mutation_is_visible_to_the_next_read() {
    let store = store();
    add(&store, "2024-01-05", "a");
    assert_eq!(store.view().unwrap()[0].words().len(), 1);
    assert!(store.cache().is_warm());

    add(&store, "2024-01-05", "b");
    assert!(!store.cache().is_warm());
    assert_eq!(store.view().unwrap()[0].words().len(), 2);

    store.set_word_color(1, 1, WordColor::Red).unwrap();
    assert_eq!(store.view().unwrap()[0].words()[1].color, WordColor::Red);

    store.set_word_text(1, 0, "alpha").unwrap();
    assert_eq!(store.view().unwrap()[0].words()[0].text, "alpha");

    store.set_review_count(1, 3).unwrap();
    assert_eq!(store.view().unwrap()[0].record.review_count, 3);

    store
        .reorder_words(1, vec![WordEntry::new("b"), WordEntry::new("alpha")])
        .unwrap();
    assert_eq!(store.view().unwrap()[0].words()[0].text, "b");

    store.clear_all().unwrap();
    assert!(store.view().unwrap().is_empty());
}

#[test]
fn duplicate_words_are_accepted() {
    let store = store();
    add(&store, "2024-01-01", "echo");
    add(&store, "2024-01-02", "echo");
    add(&store, "2024-01-02", "echo");

    let found = store.find_word("echo").unwrap().unwrap();
    assert_eq!(found.date, "2024-01-01");
    assert_eq!(store.get_by_date("2024-01-02").unwrap().unwrap().words().len(), 2);
}

#[test]
fn concurrent_writers_do_not_lose_words() {
    let store = Arc::new(store());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    store
                        .add_word("2024-06-01", "Sat", &format!("w{}-{}", t, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.stats().unwrap().total_words, 100);
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn offsets_count_back_from_latest_day() {
    let store = store_with_days(&[
        "2024-01-01",
        "2024-01-02",
        "2024-01-03",
        "2024-01-04",
        "2024-01-05",
    ]);
    let days = store.get_by_offsets(&[0, 1, 10]).unwrap();
    assert_eq!(days[0].as_ref().map(|d| d.day_number), Some(5));
    assert_eq!(days[1].as_ref().map(|d| d.day_number), Some(4));
    assert!(days[2].is_none());
}

#[test]
fn search_and_counts() {
    let store = store();
    add(&store, "2024-01-30", "Lucid");
    add(&store, "2024-01-31", "lucidity");
    add(&store, "2024-02-01", "opaque");
    add(&store, "2023-12-31", "lucid");

    let matches = store.search_words("LUCID", true).unwrap();
    let words: Vec<&str> = matches.iter().map(|m| m.word.as_str()).collect();
    assert_eq!(words, vec!["Lucid", "lucid", "lucidity"]);

    let months = store.monthly_word_counts(2024).unwrap();
    assert_eq!(months.get("2024-01"), Some(&2));
    assert_eq!(months.get("2024-02"), Some(&1));
    assert!(!months.contains_key("2023-12"));

    let stats = store.stats().unwrap();
    assert_eq!((stats.total_days, stats.total_words), (4, 4));
    assert_eq!(
        store.dates_with_word_counts().unwrap()[0],
        ("2023-12-31".to_string(), 1)
    );
}

// =============================================================================
// Bulk replace
// =============================================================================

#[test]
fn invalid_bulk_payload_leaves_store_untouched() {
    let store = store_with_days(&["2024-05-01", "2024-05-02"]);
    let before = store.export_all().unwrap();

    let err = store
        .bulk_replace(&json!([
            { "date": "2024-01-01", "weekday": "Mon", "words": ["a"] },
            { "date": "2024-01-02", "weekday": "Tue", "words": ["b"] },
            { "weekday": "Wed", "words": ["c"] },
        ]))
        .unwrap_err();

    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.export_all().unwrap(), before);
}

#[test]
fn bulk_replace_swaps_everything() {
    let store = store_with_days(&["2024-05-01"]);
    let count = store
        .bulk_replace(&json!([
            { "date": "2024-01-02", "weekday": "Tue",
              "words": [{ "text": "x", "color": "blue" }], "review_count": 4 },
            { "date": "2024-01-01", "weekday": "Mon", "words": ["y"], "day_number": 99 },
        ]))
        .unwrap();
    assert_eq!(count, 2);

    let view = store.view().unwrap();
    assert_eq!(view[0].date(), "2024-01-01");
    assert_eq!(view[0].day_number, 1);
    assert_eq!(view[1].record.review_count, 4);
    assert_eq!(view[1].words()[0].color, WordColor::Blue);
    assert_eq!(store.get_by_date("2024-05-01").unwrap(), None);
}

#[test]
fn imported_empty_day_is_kept() {
    let store = store();
    store
        .bulk_replace_records(vec![DayRecord::new("2024-01-01", "Mon")])
        .unwrap();
    store.set_review_count(1, 2).unwrap();
    assert_eq!(store.stats().unwrap().total_days, 1);
}

// =============================================================================
// Legacy documents
// =============================================================================

#[test]
fn legacy_bare_words_read_as_grey_entries() {
    let store = store();
    let legacy = br#"{"date":"2024-01-05","weekday":"Fri","words":["old",{"text":"new","color":"purple"}]}"#.to_vec();
    store.medium().put_raw("2024-01-05", legacy.clone()).unwrap();

    let day = store.get_by_date("2024-01-05").unwrap().unwrap();
    assert_eq!(
        day.words(),
        &[WordEntry::new("old"), WordEntry::new("new")][..]
    );
    assert_eq!(day.record.review_count, 0);
    assert_eq!(store.medium().get_raw("2024-01-05").unwrap(), Some(legacy));
}

// =============================================================================
// File medium and file helpers
// =============================================================================

#[test]
fn file_backed_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("days.bin");
    {
        let store = RecordStore::new(FileMedium::open(&path).unwrap());
        store.add_word("2024-01-02", "Tue", "b").unwrap();
        store.add_word("2024-01-01", "Mon", "a").unwrap();
        store.set_word_color(2, 0, WordColor::Green).unwrap();
    }

    let store = RecordStore::new(FileMedium::open(&path).unwrap());
    let view = store.view().unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view[1].words()[0], WordEntry::new("b").with_color(WordColor::Green));
}

#[test]
fn version_one_file_is_upgraded_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("days.json");
    std::fs::write(
        &path,
        r#"[{"date":"2024-01-01","weekday":"Mon","words":["legacy"]}]"#,
    )
    .unwrap();

    let store = RecordStore::new(FileMedium::open(&path).unwrap());
    assert_eq!(store.view().unwrap()[0].words()[0], WordEntry::new("legacy"));

    store.add_word("2024-01-02", "Tue", "fresh").unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"DAYX");

    let reopened = RecordStore::new(FileMedium::open(&path).unwrap());
    assert_eq!(reopened.stats().unwrap().total_words, 2);
}

#[test]
fn export_and_import_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");

    let source = store_with_days(&["2024-01-01", "2024-01-02"]);
    assert_eq!(source.export_to_file(&path).unwrap(), 2);

    let target = store_with_days(&["2025-01-01"]);
    assert_eq!(target.import_from_file(&path).unwrap(), 2);
    assert_eq!(target.export_all().unwrap(), source.export_all().unwrap());

    let missing = target.import_from_file(dir.path().join("nope.json"));
    assert!(matches!(missing, Err(StoreError::Storage(_))));
}
