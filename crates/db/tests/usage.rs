mod support;

use rusqlite::Connection;
use support::{aggregate_of, key, setup_db};
use webextract_core::ReconcileStats;

#[test]
fn reconcile_inserts_new_buckets() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let first = key(7, "2024-03-05T10:00:00Z", 15);
    let second = key(7, "2024-03-05T10:15:00Z", 15);
    let aggregate = aggregate_of(&[(first, 3500), (second, 500)]);

    let stats = db.reconcile_usage(&aggregate).expect("reconcile");
    assert_eq!(
        stats,
        ReconcileStats {
            inserted: 2,
            updated: 0
        }
    );

    let rows = db.list_data_usage(Some(7)).expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key(), first);
    assert_eq!(rows[0].bytes, 3500);
    assert_eq!(rows[1].key(), second);
    assert_eq!(rows[1].bytes, 500);
}

#[test]
fn reconcile_overwrites_instead_of_adding() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let bucket = key(7, "2024-03-05T10:00:00Z", 15);

    db.reconcile_usage(&aggregate_of(&[(bucket, 3500)]))
        .expect("first reconcile");
    let stats = db
        .reconcile_usage(&aggregate_of(&[(bucket, 3500)]))
        .expect("second reconcile");
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.updated, 1);

    let stored = db.find_data_usage(&bucket).expect("find").expect("row");
    assert_eq!(stored.bytes, 3500);
    assert_eq!(db.count_data_usage().expect("count"), 1);

    db.reconcile_usage(&aggregate_of(&[(bucket, 10)]))
        .expect("third reconcile");
    let stored = db.find_data_usage(&bucket).expect("find").expect("row");
    assert_eq!(stored.bytes, 10);
}

#[test]
fn reconcile_matches_on_full_triple() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let fifteen = key(7, "2024-03-05T10:00:00Z", 15);
    let hourly = key(7, "2024-03-05T10:00:00Z", 60);
    let other_tenant = key(8, "2024-03-05T10:00:00Z", 15);

    db.reconcile_usage(&aggregate_of(&[(fifteen, 1)]))
        .expect("seed");
    let stats = db
        .reconcile_usage(&aggregate_of(&[(hourly, 2), (other_tenant, 3)]))
        .expect("reconcile");
    assert_eq!(stats.inserted, 2);
    assert_eq!(db.count_data_usage().expect("count"), 3);
    assert_eq!(
        db.find_data_usage(&fifteen)
            .expect("find")
            .expect("row")
            .bytes,
        1
    );
}

#[test]
fn reconcile_rolls_back_on_failure() {
    let mut test_db = setup_db();
    let db = &mut test_db.db;
    let fits = key(1, "2024-03-05T10:00:00Z", 15);
    let overflows = key(2, "2024-03-05T10:00:00Z", 15);

    let err = db
        .reconcile_usage(&aggregate_of(&[(fits, 10), (overflows, u64::MAX)]))
        .expect_err("overflow should fail");
    assert!(err.to_string().contains("does not fit"));
    assert_eq!(db.count_data_usage().expect("count"), 0);
}

#[test]
fn reconcile_stamps_updated_at() {
    let mut test_db = setup_db();
    let bucket = key(3, "2024-03-05T10:00:00Z", 15);
    test_db
        .db
        .reconcile_usage(&aggregate_of(&[(bucket, 42)]))
        .expect("reconcile");

    let conn = Connection::open(&test_db.path).expect("open conn");
    let (start, updated_at): (String, Option<String>) = conn
        .query_row(
            "SELECT interval_start, updated_at FROM data_usage LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("row");
    assert_eq!(start, "2024-03-05T10:00:00.000Z");
    assert!(updated_at.is_some());
}

#[test]
fn reconcile_empty_aggregate_is_noop() {
    let mut test_db = setup_db();
    let stats = test_db
        .db
        .reconcile_usage(&aggregate_of(&[]))
        .expect("reconcile");
    assert_eq!(stats, ReconcileStats::default());
    assert_eq!(test_db.db.count_data_usage().expect("count"), 0);
}
