#![cfg(feature = "test-utils")]

use sql_bridge::prelude::*;
use sql_bridge::test_utils::{GONE_AWAY, MemoryBackend, Script, column_names};

fn database(backend: &MemoryBackend, reconnect: bool) -> Database {
    let options = DatabaseOptions::builder(DriverKind::Sqlite)
        .table_prefix("t_")
        .reconnect_on_failure(reconnect)
        .finish();
    Database::with_connector(options, Box::new(backend.connector()))
}

#[test]
fn dead_connection_is_reopened_and_the_query_retried_once() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    backend.on_query(
        "SELECT v FROM t_kv WHERE k = ?",
        column_names(&["v"]),
        vec![vec![SqlValue::Text("one".into())]],
    );
    let mut db = database(&backend, true);

    db.set_query("SELECT v FROM #__kv WHERE k = :k")
        .bind("k", "a", ParamType::Str);
    assert_eq!(db.load_result()?, Some(SqlValue::Text("one".into())));
    assert_eq!(backend.connects(), 1);

    backend.kill();
    assert!(!db.connected());
    assert_eq!(db.load_result()?, Some(SqlValue::Text("one".into())));
    assert_eq!(backend.connects(), 2);
    assert!(db.connected());
    Ok(())
}

#[test]
fn errors_on_a_live_connection_are_not_retried() {
    let backend = MemoryBackend::default();
    backend.script(
        "DELETE FROM t_kv",
        Script::Fail {
            message: "foreign key constraint fails".into(),
            code: 1451,
        },
    );
    let mut db = database(&backend, true);

    db.set_query("DELETE FROM #__kv");
    let err = db.execute().unwrap_err();
    assert_eq!(err.code(), Some(1451));
    assert_eq!(err.sql(), Some("DELETE FROM t_kv"));
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.executed().len(), 1);
}

#[test]
fn retry_is_skipped_when_disabled() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    let mut db = database(&backend, false);
    db.connect()?;
    backend.kill();

    db.set_query("UPDATE #__kv SET v = 1");
    let err = db.execute().unwrap_err();
    assert_eq!(err.code(), Some(sql_bridge::test_utils::memory::GONE_AWAY));
    assert_eq!(backend.connects(), 1);
    Ok(())
}

#[test]
fn failed_reconnect_returns_the_original_error() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    let mut db = database(&backend, true);
    db.connect()?;
    backend.kill();
    backend.set_accepting(false);

    db.set_query("UPDATE #__kv SET v = 1");
    let err = db.execute().unwrap_err();
    assert!(err.is_execution_failure());
    assert!(!db.connected());
    Ok(())
}

#[test]
fn prepared_statement_is_reused_for_the_same_sql() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    backend.on_execute("UPDATE t_kv SET v = ? WHERE k = ?", 1);
    let mut db = database(&backend, true);

    db.set_query("UPDATE #__kv SET v = :v WHERE k = :k")
        .bind("v", 1, ParamType::Int)
        .bind("k", "a", ParamType::Str);
    db.execute()?;
    db.query_mut().bind("v", 2, ParamType::Int);
    db.execute()?;

    let binds = backend.binds();
    assert_eq!(binds.len(), 2);
    assert_eq!(binds[0].types, "is");
    assert_eq!(binds[1].values[0], SqlValue::Int(2));
    assert_eq!(db.affected_rows(), 1);
    Ok(())
}

#[test]
fn lost_connection_inside_a_transaction_is_not_retried() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    let mut db = database(&backend, true);

    db.transaction_start()?;
    db.set_query("UPDATE #__a SET x = 1");
    db.execute()?;
    assert_eq!(db.transaction_depth(), 1);

    backend.kill();
    db.set_query("UPDATE #__b SET y = 2");
    let err = db.execute().unwrap_err();
    assert_eq!(err.code(), Some(GONE_AWAY));

    assert!(db.transaction_commit().is_err());
    assert_eq!(db.transaction_depth(), 1);
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.executed(), vec!["BEGIN", "UPDATE t_a SET x = 1"]);

    // rolling back closes the transaction; later work may reconnect
    assert!(db.transaction_rollback().is_err());
    assert_eq!(db.transaction_depth(), 0);
    db.set_query("UPDATE #__b SET y = 2");
    db.execute()?;
    assert_eq!(backend.connects(), 2);
    Ok(())
}

#[test]
fn transaction_helper_leaves_no_open_depth() -> Result<(), SqlBridgeError> {
    let backend = MemoryBackend::default();
    let mut db = database(&backend, true);
    db.transaction(["UPDATE #__a SET x = 1", "UPDATE #__b SET y = 2"])?;
    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(
        backend.executed(),
        vec!["BEGIN", "UPDATE t_a SET x = 1", "UPDATE t_b SET y = 2", "COMMIT"]
    );
    Ok(())
}
