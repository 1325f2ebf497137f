use group_forecast::records::RecordTable;
use group_forecast::store::RESULT_SUFFIX;
use group_forecast::{GroupKey, PipelineError, ResultStore};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn table(ids: &[&str], day: &str, values: &[f64]) -> RecordTable {
    RecordTable::from_columns(
        &[("id".to_string(), ids.iter().map(|s| s.to_string()).collect())],
        &[(day.to_string(), values.to_vec())],
    )
}

#[test]
fn test_put_then_get_returns_equal_tables() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    let key = GroupKey::new(["TX_1", "HOBBIES"]);
    let valid = table(&["a", "b"], "d_60", &[3.0, 0.0]);
    let pred = table(&["a", "b"], "d_60", &[2.5, 0.25]);

    store.put(&key, &valid, &pred).unwrap();
    let document = store.get(&key).unwrap();

    assert_eq!(document.valid_df, valid);
    assert_eq!(document.pred_df, pred);
}

#[test]
fn test_document_layout() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    let key = GroupKey::new(["CA"]);
    store
        .put(&key, &table(&["a"], "d_3", &[1.0]), &table(&["a"], "d_3", &[2.0]))
        .unwrap();

    let text = fs::read_to_string(dir.path().join(format!("CA{}", RESULT_SUFFIX))).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["valid_df"][0]["id"], "a");
    assert_eq!(json["valid_df"][0]["d_3"], 1.0);
    assert_eq!(json["pred_df"][0]["d_3"], 2.0);
}

#[test]
fn test_list_decodes_keys_from_disk() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    let keys = [
        GroupKey::new(["CA", "FOODS"]),
        GroupKey::new(["HOBBIES_1_001", "TX_1"]),
        GroupKey::new(["a+b"]),
        GroupKey::new(["a", "b"]),
        GroupKey::new(["Île de France"]),
    ];
    for key in &keys {
        store.put(key, &RecordTable::default(), &RecordTable::default()).unwrap();
    }
    fs::write(dir.path().join("README.md"), "not a result").unwrap();

    // a fresh handle sees the same keys
    let reopened = ResultStore::new(dir.path()).unwrap();
    let listed = reopened.list().unwrap();
    assert_eq!(listed, keys.iter().cloned().collect::<BTreeSet<_>>());
}

#[test]
fn test_listed_keys_can_always_be_fetched() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    store
        .put(&GroupKey::new(["CA_1"]), &RecordTable::default(), &RecordTable::default())
        .unwrap();
    // decodable names that `put` would never write
    for name in ["CA%5f1", "%41", "TX%5F1%2d"] {
        fs::write(dir.path().join(format!("{}{}", name, RESULT_SUFFIX)), "{}").unwrap();
    }

    let listed = store.list().unwrap();

    assert_eq!(listed.len(), 1);
    for key in &listed {
        store.get(key).unwrap();
    }
}

#[test]
fn test_put_replaces_previous_document() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    let key = GroupKey::new(["WI"]);

    store.put(&key, &table(&["a"], "d_1", &[1.0]), &table(&["a"], "d_1", &[1.0])).unwrap();
    store.put(&key, &table(&["a"], "d_1", &[1.0]), &table(&["a"], "d_1", &[4.0])).unwrap();

    assert_eq!(store.list().unwrap().len(), 1);
    assert_eq!(store.get(&key).unwrap().pred_df.numeric_column("d_1"), vec![Some(4.0)]);
    // no temporary files are left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_get_unknown_key() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    match store.get(&GroupKey::new(["nowhere"])) {
        Err(PipelineError::NotFound(key)) => assert_eq!(key, "nowhere"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_reset_clears_results() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();
    let key = GroupKey::new(["CA_1"]);
    store.put(&key, &RecordTable::default(), &RecordTable::default()).unwrap();

    store.reset().unwrap();

    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.get(&key), Err(PipelineError::NotFound(_))));
}

#[test]
fn test_store_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("runs").join("latest");
    let store = ResultStore::new(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.dir(), nested.as_path());
}

#[test]
fn test_concurrent_puts_with_distinct_keys() {
    let dir = TempDir::new().unwrap();
    let store = ResultStore::new(dir.path()).unwrap();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let store = &store;
            scope.spawn(move || {
                let key = GroupKey::new([format!("store_{}", i)]);
                let values = table(&["a"], "d_9", &[i as f64]);
                store.put(&key, &values, &values).unwrap();
            });
        }
    });

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 8);
    for key in listed {
        let document = store.get(&key).unwrap();
        assert_eq!(document.valid_df, document.pred_df);
    }
}
