use citizens_core::db::open_db;
use citizens_core::{ImportRepository, ImportService, SchemaValidator, SqliteImportRepository};
use serde_json::json;
use std::collections::BTreeSet;
use std::thread;

const IMPORTS_PER_WRITER: usize = 5;

#[test]
fn concurrent_creators_get_distinct_sequential_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let connections = vec![open_db(&path).unwrap(), open_db(&path).unwrap()];
    let validator = SchemaValidator::builtin().unwrap();

    let ids: Vec<i64> = thread::scope(|scope| {
        let handles: Vec<_> = connections
            .into_iter()
            .map(|mut conn| {
                let validator = &validator;
                scope.spawn(move || {
                    let mut service =
                        ImportService::new(SqliteImportRepository::new(&mut conn), validator);
                    (0..IMPORTS_PER_WRITER)
                        .map(|_| service.create_import(&json!({ "citizens": [] })).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    let expected: BTreeSet<i64> = (1..=(2 * IMPORTS_PER_WRITER) as i64).collect();
    assert_eq!(unique, expected);

    let mut conn = open_db(&path).unwrap();
    let repo = SqliteImportRepository::new(&mut conn);
    assert_eq!(repo.count_imports().unwrap(), (2 * IMPORTS_PER_WRITER) as i64);
}
