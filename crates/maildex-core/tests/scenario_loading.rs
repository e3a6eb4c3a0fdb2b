//! Scenario loading against files on disk

use maildex_core::{ScenarioLoader, Shuffle, Split};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_array_file(dir: &TempDir, count: usize) -> PathBuf {
    let rows: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            let split = if i % 5 == 0 { "test" } else { "train" };
            let message_ids: Vec<String> = (0..(i % 3)).map(|m| format!("<{i}.{m}@enron>")).collect();
            serde_json::json!({
                "id": i,
                "question": format!("Who approved deal {i}?"),
                "answer": "Louise",
                "inbox_address": "louise.kitchen@enron.com",
                "query_date": "2001-09-01",
                "message_ids": message_ids,
                "how_realistic": 0.7,
                "split": split,
            })
        })
        .collect();

    let path = dir.path().join("scenarios.json");
    std::fs::write(&path, serde_json::to_string_pretty(&rows).unwrap()).unwrap();
    path
}

#[test]
fn same_seed_gives_identical_order_across_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_array_file(&dir, 60);

    let loader = ScenarioLoader::new(Split::Train)
        .max_messages(Some(1))
        .shuffle(Shuffle::Seeded(42))
        .limit(Some(10));

    let first = serde_json::to_string(&loader.load(&path).unwrap()).unwrap();
    let second = serde_json::to_string(&loader.load(&path).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn split_filter_cap_and_limit_compose() {
    let dir = TempDir::new().unwrap();
    let path = write_array_file(&dir, 60);

    let scenarios = ScenarioLoader::new(Split::Test)
        .max_messages(None)
        .limit(Some(100))
        .load(&path)
        .unwrap();

    // Every fifth row is tagged "test"
    assert_eq!(scenarios.len(), 12);
    assert!(scenarios.iter().all(|s| s.split == Some(Split::Test)));

    let capped = ScenarioLoader::new(Split::Train)
        .max_messages(Some(0))
        .load(&path)
        .unwrap();
    assert!(capped.iter().all(|s| s.message_ids.is_empty()));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ScenarioLoader::default()
        .load("/definitely/not/here.jsonl")
        .unwrap_err();
    assert!(matches!(err, maildex_core::ScenarioError::Io { .. }));
}
