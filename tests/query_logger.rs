//! # Integration Tests for Query History Logging
//!
//! Verifies the advisory table the periodic advisor reads: statements
//! are published with their fingerprints, transactional statements
//! become visible only once their transaction commits, and the
//! high-water read (`queries_after`) sees exactly the published rows.

use turtune::history::{fingerprint, QueryHistory, QueryLogger};

/// Executes the statement and checks that everything executed so far is
/// visible, mirroring how the advisor would read the table.
fn run_simple(
    logger: &mut QueryLogger<'_>,
    history: &QueryHistory,
    sql: &str,
    expected: &mut Vec<(String, String)>,
) {
    expected.push((sql.to_string(), fingerprint(sql)));
    logger.log_statement(sql);

    let visible: Vec<(String, String)> = history
        .queries_after(0)
        .into_iter()
        .map(|row| (row.sql_text, row.fingerprint))
        .collect();
    assert_eq!(&visible, expected);
}

/// Executes the statement inside an explicit transaction; visibility is
/// only checked once the transaction has committed.
fn run_transactional(
    logger: &mut QueryLogger<'_>,
    history: &QueryHistory,
    sql: &str,
    expected: &mut Vec<(String, String)>,
    pending: &mut Vec<(String, String)>,
    committed: bool,
) {
    pending.push((sql.to_string(), fingerprint(sql)));
    logger.log_statement(sql);

    if committed {
        expected.append(pending);

        let visible: Vec<(String, String)> = history
            .queries_after(0)
            .into_iter()
            .map(|row| (row.sql_text, row.fingerprint))
            .collect();
        assert_eq!(&visible, expected);
    }
}

#[test]
fn queries_are_logged_with_fingerprints() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);
    let mut expected = Vec::new();

    run_simple(&mut logger, &history, "CREATE TABLE test(a INT);", &mut expected);
    run_simple(&mut logger, &history, "INSERT INTO test VALUES (1);", &mut expected);
    run_simple(&mut logger, &history, "INSERT INTO test VALUES (2);", &mut expected);
}

#[test]
fn transactional_statements_appear_only_after_commit() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);
    let mut expected = Vec::new();
    let mut pending = Vec::new();

    run_simple(&mut logger, &history, "CREATE TABLE test(a INT);", &mut expected);

    run_transactional(&mut logger, &history, "BEGIN;", &mut expected, &mut pending, false);
    run_transactional(
        &mut logger,
        &history,
        "INSERT INTO test VALUES (1);",
        &mut expected,
        &mut pending,
        false,
    );
    assert_eq!(
        history.len(),
        1,
        "uncommitted transactional statements SHOULD NOT be visible"
    );
    run_transactional(&mut logger, &history, "COMMIT;", &mut expected, &mut pending, true);

    // Everything is visible afterwards, in execution order.
    run_simple(&mut logger, &history, "INSERT INTO test VALUES (3);", &mut expected);
}

#[test]
fn uncommitted_transaction_publishes_nothing() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);

    logger.log_statement("BEGIN;");
    logger.log_statement("INSERT INTO test VALUES (1);");

    assert!(history.is_empty());
    assert!(logger.in_transaction());
}

#[test]
fn rolled_back_transaction_publishes_nothing() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);

    logger.log_statement("BEGIN;");
    logger.log_statement("INSERT INTO test VALUES (1);");
    logger.log_statement("ROLLBACK;");

    assert!(history.is_empty());
    assert!(!logger.in_transaction());
}

#[test]
fn equal_shaped_statements_share_a_fingerprint() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);

    logger.log_statement("INSERT INTO test VALUES (1);");
    logger.log_statement("insert into test values (999);");

    let rows = history.queries_after(0);
    assert_eq!(rows[0].fingerprint, rows[1].fingerprint);
    assert_ne!(rows[0].sql_text, rows[1].sql_text);
}

#[test]
fn high_water_reads_skip_already_seen_rows() {
    let history = QueryHistory::new();
    let mut logger = QueryLogger::new(&history);

    logger.log_statement("SELECT 1;");
    let seen = history.latest_timestamp();
    logger.log_statement("SELECT 2;");
    logger.log_statement("SELECT 3;");

    let fresh = history.queries_after(seen);
    assert_eq!(fresh.len(), 2);
    assert!(fresh.iter().all(|row| row.timestamp > seen));
}
