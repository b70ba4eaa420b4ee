#![cfg(feature = "sqlite")]

use sql_bridge::connection::Connection;
use sql_bridge::prelude::*;

fn seeded() -> Result<SqliteConnection, SqlBridgeError> {
    let conn = SqliteConnection::open(":memory:")?;
    conn.raw().execute_batch(
        "CREATE TABLE app_users (id INTEGER PRIMARY KEY, name TEXT, note TEXT, active INTEGER);
         INSERT INTO app_users (name, note, active) VALUES ('ann', 'uses :name literally', 1);
         INSERT INTO app_users (name, note, active) VALUES ('O''Brien', 'uses :name literally', 0);",
    )?;
    Ok(conn)
}

#[test]
fn named_statement_binds_unescaped_text() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt =
        conn.prepare("SELECT * FROM app_users WHERE name = :name AND note = 'uses :name literally'")?;
    assert!(!stmt.is_emulated());
    assert_eq!(stmt.placeholders().names(), vec!["name"]);

    let mut params = BoundParams::new();
    params.bind("name", "O'Brien", ParamType::Str);
    stmt.execute(&params)?;

    let row = stmt
        .fetch(FetchMode::Associative)?
        .and_then(FetchedRow::into_assoc)
        .ok_or("no row")?;
    assert_eq!(row.get("name"), Some(&SqlValue::Text("O'Brien".into())));
    assert_eq!(row.get("id"), Some(&SqlValue::Int(2)));
    assert!(stmt.fetch(FetchMode::Associative)?.is_none());
    Ok(())
}

#[test]
fn shapes_agree_across_executions() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("SELECT id, name FROM app_users WHERE active >= :min ORDER BY id")?;
    let mut params = BoundParams::new();
    params.bind("min", 0, ParamType::Int);

    stmt.execute(&params)?;
    let assoc: Vec<_> = stmt
        .fetch_all(FetchMode::Associative)?
        .into_iter()
        .map(FetchedRow::into_values)
        .collect();

    stmt.execute(&params)?;
    let numeric: Vec<_> = stmt
        .fetch_all(FetchMode::Numeric)?
        .into_iter()
        .map(FetchedRow::into_values)
        .collect();

    assert_eq!(assoc, numeric);
    assert_eq!(assoc.len(), 2);
    Ok(())
}

#[test]
fn rebinding_changes_the_result() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("SELECT name FROM app_users WHERE active = :active")?;
    let mut params = BoundParams::new();

    params.bind("active", true, ParamType::Bool);
    stmt.execute(&params)?;
    assert_eq!(stmt.fetch_column(0)?, Some(SqlValue::Text("ann".into())));

    params.bind("active", false, ParamType::Bool);
    stmt.execute(&params)?;
    assert_eq!(stmt.fetch_column(0)?, Some(SqlValue::Text("O'Brien".into())));
    Ok(())
}

#[test]
fn update_row_count_is_affected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("UPDATE app_users SET active = 1")?;
    stmt.execute(&BoundParams::new())?;
    assert_eq!(stmt.row_count(), 2);
    assert_eq!(stmt.column_names(), None);
    Ok(())
}

#[test]
fn missing_column_reads_as_null() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("SELECT id FROM app_users ORDER BY id")?;
    stmt.execute(&BoundParams::new())?;
    assert_eq!(stmt.fetch_column(5)?, Some(SqlValue::Null));
    Ok(())
}

#[test]
fn positional_index_keys_bind_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("SELECT count(*) FROM app_users WHERE id >= ? AND id <= ?")?;
    let mut params = BoundParams::new();
    params.bind(1usize, 2, ParamType::Int);
    params.bind(0usize, 1, ParamType::Int);
    stmt.execute(&params)?;
    assert_eq!(stmt.fetch_column(0)?, Some(SqlValue::Int(2)));
    Ok(())
}

#[test]
fn unbound_name_is_a_bind_failure() -> Result<(), Box<dyn std::error::Error>> {
    let conn = seeded()?;
    let mut stmt = conn.prepare("SELECT * FROM app_users WHERE name = :name")?;
    let err = stmt.execute(&BoundParams::new()).unwrap_err();
    match err {
        SqlBridgeError::PrepareOrBindFailure { message, .. } => {
            assert_eq!(message, "no value bound for :name");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}
