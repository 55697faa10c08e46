//! End-to-end seeding tests against the mock database
//!
//! ```bash
//! cargo test -p seedorder-engine --test seeding_tests
//! ```

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use seedorder_catalog::{DbError, MockDatabase, SeedRegistry};
use seedorder_core::{CellValue, Config, SeedKind, TableAction, TableNode};
use seedorder_engine::{SeedError, Seeder};
use seedorder_graph::GraphError;
use std::collections::BTreeSet;
use std::time::Duration;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Ordering and scope
// =============================================================================

#[test]
fn test_chain_global_order_and_scope() {
    let h = Harness::chain();
    assert_eq!(h.seeder.compute_global_order().unwrap(), names(&["a", "b", "c"]));

    let scope = h.seeder.compute_scope_for_table("c").unwrap();
    assert_eq!(scope.insertion_order, names(&["a", "b", "c"]));
    assert_eq!(scope.required_ancestor_ids, BTreeSet::from([1, 2, 3]));

    let scope = h.seeder.compute_scope_for_table("a").unwrap();
    assert_eq!(scope.insertion_order, names(&["a"]));
}

#[test]
fn test_clinic_scope_follows_global_order() {
    let h = Harness::new(clinic_tables(), MockDatabase::new());

    let order = h.seeder.compute_global_order().unwrap();
    assert_eq!(
        order,
        names(&[
            "employees",
            "service_categories",
            "care_packages",
            "member_care_packages",
            "services",
            "care_package_item_details",
            "member_care_package_details",
            "member_care_package_transaction_logs",
        ])
    );

    let scope = h
        .seeder
        .compute_scope_for_table("member_care_package_transaction_logs")
        .unwrap();
    assert_eq!(
        scope.insertion_order,
        names(&[
            "employees",
            "service_categories",
            "member_care_packages",
            "services",
            "member_care_package_details",
            "member_care_package_transaction_logs",
        ])
    );
    assert_eq!(scope.required_ancestor_ids, BTreeSet::from([1, 4, 5, 6, 7, 8]));
}

#[test]
fn test_every_table_appears_once_with_parents_first() {
    let h = Harness::new(clinic_tables(), MockDatabase::new());
    let order = h.seeder.compute_global_order().unwrap();
    assert_eq!(order.len(), h.seeder.hierarchy().len());

    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    for table in h.seeder.hierarchy().tables() {
        for parent in &table.depends_on {
            let parent = h.seeder.hierarchy().find_by_id(*parent).unwrap();
            assert!(position(&parent.name) < position(&table.name));
        }
    }
}

#[test]
fn test_scope_ids_exclude_undeclared_dependencies() {
    let h = Harness::new(
        vec![
            TableNode::new(1, "a", vec![]),
            TableNode::new(2, "b", vec![1, 99]),
        ],
        MockDatabase::new(),
    );

    let scope = h.seeder.compute_scope_for_table("b").unwrap();
    assert_eq!(scope.required_ancestor_ids, BTreeSet::from([1, 2]));
    assert_eq!(scope.insertion_order, names(&["a", "b"]));
}

#[test]
fn test_unknown_table_is_rejected() {
    let h = Harness::chain();
    assert!(matches!(
        h.seeder.compute_scope_for_table("ghost"),
        Err(SeedError::UnknownTable(ref t)) if t == "ghost"
    ));
}

#[tokio::test]
async fn test_cycle_fails_before_any_database_work() {
    let h = Harness::new(
        vec![
            TableNode::new(1, "x", vec![3]),
            TableNode::new(2, "y", vec![1]),
            TableNode::new(3, "z", vec![2]),
        ],
        MockDatabase::new(),
    );

    let err = h.seeder.compute_global_order().unwrap_err();
    match &err {
        SeedError::Graph(GraphError::Cycle { remaining }) => {
            let names: Vec<&str> = remaining.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["x", "y", "z"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("x (ID: 1)"));
    assert!(message.contains("z (ID: 3)"));

    let result = h
        .seeder
        .seed_table("z", &bindings(&[("x", "f"), ("y", "f"), ("z", "f")]), SeedKind::Pre)
        .await;
    assert!(matches!(result, Err(SeedError::Graph(_))));
    assert_eq!(h.db.begin_count(), 0);
}

// =============================================================================
// Seeding
// =============================================================================

#[tokio::test]
async fn test_fresh_seed_truncates_reverse_and_inserts_forward() {
    let h = Harness::chain();
    h.write_chain_files();

    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    assert_eq!(outcome.tables_seeded, names(&["a", "b", "c"]));
    assert_eq!(h.deleted_tables().await, names(&["c", "b", "a"]));
    assert_eq!(h.inserted_tables().await, names(&["a", "b", "c"]));

    assert_eq!(h.db.row_count("a").await, 2);
    assert_eq!(h.db.row_count("b").await, 2);
    assert_eq!(h.db.row_count("c").await, 1);
    assert_eq!(h.db.next_id("a").await, Some(3));

    let report = &outcome.report;
    assert_eq!(report.truncation_order, names(&["c", "b", "a"]));
    assert_eq!(report.summary.tables_reseeded, 3);
    assert_eq!(report.summary.rows_inserted, 5);
    assert!(outcome.message.contains("a, b, c"));

    let active = h
        .seeder
        .registry()
        .get_active_seed_info("b", SeedKind::Pre)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.file_name, "base");
}

#[tokio::test]
async fn test_second_identical_run_does_nothing() {
    let h = Harness::chain();
    h.write_chain_files();
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    h.db.clear_statements().await;
    let begins = h.db.begin_count();

    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    assert!(outcome.tables_seeded.is_empty());
    assert!(outcome.message.contains("already live"));
    assert!(outcome.report.is_noop());
    assert_eq!(outcome.report.summary.tables_skipped, 3);
    assert_eq!(h.db.data_write_count().await, 0);
    assert_eq!(h.db.begin_count(), begins);
}

#[tokio::test]
async fn test_binding_extension_is_optional() {
    let h = Harness::chain();
    h.write_chain_files();

    let with_ext = bindings(&[("a", "base.csv"), ("b", "base.csv"), ("c", "base")]);
    h.seeder.seed_table("c", &with_ext, SeedKind::Pre).await.unwrap();

    h.db.clear_statements().await;
    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();
    assert!(outcome.tables_seeded.is_empty());
}

#[tokio::test]
async fn test_table_without_identity_column_seeds() {
    let db = MockDatabase::builder().natural_key("tags").build();
    let h = Harness::new(vec![TableNode::new(1, "tags", vec![])], db);
    h.write("tags", "base", "code,label\nvip,VIP\nnew,Newcomer\n");

    let outcome = h
        .seeder
        .seed_table("tags", &bindings(&[("tags", "base")]), SeedKind::Pre)
        .await
        .unwrap();

    assert_eq!(outcome.tables_seeded, names(&["tags"]));
    assert_eq!(h.db.row_count("tags").await, 2);
    assert!(h.db.rows("tags").await.iter().all(|row| row.get("id").is_none()));
    assert_eq!(h.db.next_id("tags").await, None);
}

#[tokio::test]
async fn test_leaf_change_reseeds_only_the_leaf() {
    let h = Harness::chain();
    h.write_chain_files();
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();
    h.db.clear_statements().await;

    // One byte differs
    h.write("c", "base", "id,b_id,note\n1,1,firsT\n");

    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    assert_eq!(outcome.tables_seeded, names(&["c"]));
    assert_eq!(h.deleted_tables().await, names(&["c"]));
    let rows = h.db.rows("c").await;
    assert_eq!(rows[0].get("note"), Some(&CellValue::Text("firsT".to_string())));

    let actions: Vec<(String, TableAction)> = outcome
        .report
        .tables
        .iter()
        .map(|t| (t.table.clone(), t.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("a".to_string(), TableAction::Skipped),
            ("b".to_string(), TableAction::Skipped),
            ("c".to_string(), TableAction::Reseeded),
        ]
    );
}

#[tokio::test]
async fn test_middle_change_reseeds_descendants_too() {
    let h = Harness::chain();
    h.write_chain_files();
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();
    h.db.clear_statements().await;

    h.write("b", "base", "id,a_id\n1,2\n2,2\n");

    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    // c's own file did not change, but its rows referenced stale b rows
    assert_eq!(outcome.tables_seeded, names(&["b", "c"]));
    assert_eq!(h.deleted_tables().await, names(&["c", "b"]));
    assert_eq!(h.db.row_count("a").await, 2);
}

#[tokio::test]
async fn test_sibling_branch_is_untouched_by_leaf_change() {
    let h = Harness::branching();
    h.write_chain_files();
    h.write("d", "base", D_CSV);

    let mut all = chain_bindings();
    all.extend(bindings(&[("d", "base")]));
    h.seeder.seed_table("c", &all, SeedKind::Pre).await.unwrap();
    assert_eq!(h.db.row_count("d").await, 1);
    let d_rows = h.db.rows("d").await;
    assert_eq!(
        d_rows[0].get("label"),
        Some(&CellValue::Text("side, branch".to_string()))
    );

    h.db.clear_statements().await;
    h.write("c", "base", "id,b_id,note\n1,2,second\n");
    h.seeder.seed_table("c", &all, SeedKind::Pre).await.unwrap();

    assert_eq!(h.deleted_tables().await, names(&["c"]));
    assert_eq!(h.db.row_count("d").await, 1);
}

#[tokio::test]
async fn test_unbound_descendant_is_cleared_and_forgotten() {
    let h = Harness::branching();
    h.write_chain_files();
    h.write("d", "base", D_CSV);

    // First load everything, including d
    let mut all = chain_bindings();
    all.extend(bindings(&[("d", "base")]));
    h.seeder.seed_table("d", &all, SeedKind::Pre).await.unwrap();
    assert!(h
        .seeder
        .registry()
        .get_active_seed_info("d", SeedKind::Pre)
        .await
        .unwrap()
        .is_some());

    // a changes; seeding c without a binding for d must still clear d
    h.write("a", "base", "id,name\n1,alpha\n2,gamma\n");
    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    assert_eq!(outcome.tables_seeded, names(&["a", "b", "c"]));
    assert_eq!(outcome.report.truncation_order, names(&["c", "d", "b", "a"]));
    assert_eq!(h.db.row_count("d").await, 0);
    assert!(h
        .seeder
        .registry()
        .get_active_seed_info("d", SeedKind::Pre)
        .await
        .unwrap()
        .is_none());

    let d = outcome.report.tables.iter().find(|t| t.table == "d").unwrap();
    assert_eq!(d.action, TableAction::Cleared);
}

#[tokio::test]
async fn test_malformed_row_is_dropped_and_others_still_seed() {
    let h = Harness::chain();
    h.write("a", "base", A_CSV);
    h.write("b", "base", "id,a_id\n1,1\n2,2,extra\n3,2\n");
    h.write("c", "base", C_CSV);

    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    assert_eq!(outcome.tables_seeded, names(&["a", "b", "c"]));
    assert_eq!(h.db.row_count("a").await, 2);
    assert_eq!(h.db.row_count("b").await, 2);
    assert_eq!(h.db.row_count("c").await, 1);
}

#[tokio::test]
async fn test_failure_mid_insert_rolls_everything_back() {
    let h = Harness::chain();
    h.write_chain_files();
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();
    let before = h.db.snapshot().await;
    let active_before = h
        .seeder
        .registry()
        .get_active_seed_info("a", SeedKind::Pre)
        .await
        .unwrap();

    h.write("a", "base", "id,name\n1,alpha\n2,beta\n3,gamma\n");
    h.db.fail_inserts_into(
        "c",
        DbError::QueryError {
            table: "c".to_string(),
            message: "value too long for type character varying(5)".to_string(),
        },
    )
    .await;

    let err = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Transaction { table: Some(ref t), .. } if t == "c"));
    assert!(err.to_string().contains("no changes applied"));
    assert_eq!(h.db.snapshot().await, before);

    // Bookkeeping only follows a commit
    let active_after = h
        .seeder
        .registry()
        .get_active_seed_info("a", SeedKind::Pre)
        .await
        .unwrap();
    assert_eq!(active_after, active_before);

    // Once the fault clears, the pending change is picked up
    h.db.clear_errors().await;
    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();
    assert_eq!(outcome.tables_seeded, names(&["a", "b", "c"]));
    assert_eq!(h.db.row_count("a").await, 3);
}

#[tokio::test]
async fn test_timeout_rolls_back() {
    let db = MockDatabase::builder()
        .table("a")
        .foreign_key("b", "a_id", "a")
        .foreign_key("c", "b_id", "b")
        .with_latency(20)
        .build();
    let h = Harness::new(chain_tables(), db).with_timeout(Duration::from_millis(50));
    h.write_chain_files();

    let err = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Timeout(_)));
    assert_eq!(h.db.row_count("a").await, 0);
    assert_eq!(h.db.rollback_count(), 1);
    assert!(h
        .seeder
        .registry()
        .active_records()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_dropping_a_run_midway_rolls_back() {
    let db = MockDatabase::builder()
        .table("a")
        .foreign_key("b", "a_id", "a")
        .foreign_key("c", "b_id", "b")
        .with_latency(15)
        .build();
    let h = Harness::new(chain_tables(), db);
    h.write_chain_files();
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    let before = h.db.snapshot().await;
    let records_before = h.seeder.registry().active_records().await.unwrap();
    let rollbacks_before = h.db.rollback_count();

    h.write("a", "base", "id,name\n1,alpha\n2,beta\n3,gamma\n");
    let result = tokio::time::timeout(
        Duration::from_millis(70),
        h.seeder.seed_table("c", &chain_bindings(), SeedKind::Pre),
    )
    .await;

    assert!(result.is_err(), "run should still be in flight");
    assert_eq!(h.db.snapshot().await, before);
    assert_eq!(h.db.rollback_count(), rollbacks_before + 1);
    assert_eq!(
        h.seeder.registry().active_records().await.unwrap(),
        records_before
    );
}

#[tokio::test]
async fn test_missing_binding_aborts_before_database() {
    let h = Harness::chain();
    h.write_chain_files();

    let err = h
        .seeder
        .seed_table("c", &bindings(&[("a", "base"), ("c", "base")]), SeedKind::Pre)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SeedError::MissingFile { ref table, file_name: None, .. } if table == "b"
    ));
    assert_eq!(h.db.begin_count(), 0);
    assert!(h.db.statements().await.is_empty());
}

#[tokio::test]
async fn test_missing_file_aborts_before_database() {
    let h = Harness::chain();
    h.write_chain_files();

    let err = h
        .seeder
        .seed_table(
            "c",
            &bindings(&[("a", "base"), ("b", "nope"), ("c", "base")]),
            SeedKind::Pre,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SeedError::MissingFile { ref table, file_name: Some(ref f), .. } if table == "b" && f == "nope"
    ));
    assert_eq!(h.db.begin_count(), 0);
}

#[tokio::test]
async fn test_kinds_are_tracked_separately() {
    let h = Harness::chain();
    h.write_chain_files();
    h.write_kind(SeedKind::Post, "a", "base", A_CSV);
    h.write_kind(SeedKind::Post, "b", "base", B_CSV);
    h.write_kind(SeedKind::Post, "c", "base", C_CSV);

    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    // Same contents, but post data was never loaded
    let outcome = h
        .seeder
        .seed_table("c", &chain_bindings(), SeedKind::Post)
        .await
        .unwrap();
    assert_eq!(outcome.tables_seeded, names(&["a", "b", "c"]));

    // Loading post replaced the pre data, so pre is no longer live
    let pre = h
        .seeder
        .registry()
        .get_active_seed_info("a", SeedKind::Pre)
        .await
        .unwrap();
    assert_eq!(pre, None);
}

// =============================================================================
// Seed file management
// =============================================================================

#[tokio::test]
async fn test_candidate_files_report_liveness() {
    let h = Harness::chain();
    h.write_chain_files();
    h.write("c", "alt", "id,b_id,note\n1,2,alt\n");

    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    let files = h.seeder.list_candidate_files("c", SeedKind::Pre).await.unwrap();
    let summary: Vec<(&str, bool)> = files.iter().map(|f| (f.name.as_str(), f.is_live)).collect();
    assert_eq!(summary, vec![("alt", false), ("base", true)]);
    assert_eq!(files[1].hash.len(), 64);

    assert!(h
        .seeder
        .list_candidate_files("c", SeedKind::Post)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_deleting_live_file_clears_active_record() {
    let h = Harness::chain();
    h.write_chain_files();
    h.write("c", "alt", "id,b_id,note\n1,2,alt\n");
    h.seeder
        .seed_table("c", &chain_bindings(), SeedKind::Pre)
        .await
        .unwrap();

    // Deleting a file that is not live keeps the record
    h.seeder
        .delete_seed_file(SeedKind::Pre, "c", "alt.csv")
        .await
        .unwrap();
    assert!(h
        .seeder
        .registry()
        .get_active_seed_info("c", SeedKind::Pre)
        .await
        .unwrap()
        .is_some());

    h.seeder
        .delete_seed_file(SeedKind::Pre, "c", "base")
        .await
        .unwrap();
    assert!(h
        .seeder
        .registry()
        .get_active_seed_info("c", SeedKind::Pre)
        .await
        .unwrap()
        .is_none());
    assert!(h.seeder.list_candidate_files("c", SeedKind::Pre).await.unwrap().is_empty());

    let err = h
        .seeder
        .delete_seed_file(SeedKind::Pre, "c", "base")
        .await
        .unwrap_err();
    assert!(matches!(err, SeedError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_inventory_and_preview() {
    let h = Harness::branching();
    h.write("a", "base", A_CSV);
    h.write_kind(SeedKind::Post, "d", "extra", D_CSV);

    let inventory: Vec<(String, bool, bool)> = h
        .seeder
        .table_inventory()
        .into_iter()
        .map(|t| (t.name, t.pre, t.post))
        .collect();
    assert_eq!(
        inventory,
        vec![
            ("a".to_string(), true, false),
            ("b".to_string(), false, false),
            ("c".to_string(), false, false),
            ("d".to_string(), false, true),
        ]
    );

    let preview = h
        .seeder
        .preview_file(SeedKind::Post, "d", "extra")
        .await
        .unwrap();
    assert_eq!(preview.headers, names(&["id", "a_id", "label"]));
    assert_eq!(preview.rows, vec![names(&["1", "2", "side, branch"])]);
}

#[test]
fn test_save_rejects_unknown_tables_and_bad_names() {
    let h = Harness::chain();
    assert!(matches!(
        h.seeder.save_seed_file(SeedKind::Pre, "ghost", "f", b"id\n"),
        Err(SeedError::UnknownTable(_))
    ));
    assert!(matches!(
        h.seeder.save_seed_file(SeedKind::Pre, "a", "../escape", b"id\n"),
        Err(SeedError::Store(_))
    ));
}

#[tokio::test]
async fn test_seeder_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("seedorder.toml");
    std::fs::write(
        &config_path,
        r#"
seed_dir = "data"
transaction_timeout_secs = 30

[[tables]]
id = 1
name = "a"

[[tables]]
id = 2
name = "b"
depends_on = [1]

[[tables]]
id = 3
name = "c"
depends_on = [2]
"#,
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let seeder = Seeder::from_config(
        &config,
        MockDatabase::builder()
            .table("a")
            .foreign_key("b", "a_id", "a")
            .foreign_key("c", "b_id", "b")
            .build(),
        seedorder_catalog::MemoryRegistry::new(),
    )
    .unwrap();

    assert_eq!(seeder.store().root(), dir.path().join("data").as_path());
    seeder
        .save_seed_file(SeedKind::Pre, "a", "base", A_CSV.as_bytes())
        .unwrap();
    assert!(dir.path().join("data/pre/a/base.csv").is_file());

    let outcome = seeder
        .seed_table("a", &bindings(&[("a", "base")]), SeedKind::Pre)
        .await
        .unwrap();
    assert_eq!(outcome.tables_seeded, names(&["a"]));
}
