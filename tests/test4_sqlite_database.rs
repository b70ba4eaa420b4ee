#![cfg(feature = "sqlite")]

use serde::Deserialize;
use sql_bridge::prelude::*;
use tempfile::tempdir;

fn open(dir: &tempfile::TempDir) -> Result<Database, SqlBridgeError> {
    let path = dir.path().join("bridge.db");
    let options = DatabaseOptions::builder(DriverKind::Sqlite)
        .sqlite_path(path.to_string_lossy())
        .table_prefix("app_")
        .finish();
    let mut db = Database::open(options)?;
    db.set_query(
        "CREATE TABLE #__users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, note TEXT, score INTEGER DEFAULT 0)",
    );
    db.execute()?;
    db.transaction([
        "INSERT INTO #__users (name, note, score) VALUES ('ann', 'uses :name literally', 10)",
        "INSERT INTO #__users (name, note, score) VALUES ('bob', 'x', 20)",
        "INSERT INTO #__users (name, note, score) VALUES ('O''Brien', 'uses :name literally', 30)",
    ])?;
    Ok(db)
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
    score: i64,
}

#[test]
fn prefixed_query_with_literal_placeholder() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    db.set_query("SELECT * FROM #__users WHERE name = :name AND note = 'uses :name literally'")
        .bind("name", "O'Brien", ParamType::Str);
    let row = db.load_assoc()?.ok_or("no row")?;
    assert_eq!(row.get("id"), Some(&SqlValue::Int(3)));
    assert_eq!(row.get("name"), Some(&SqlValue::Text("O'Brien".into())));
    Ok(())
}

#[test]
fn loaders_return_each_shape() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    db.set_query("SELECT id, name, score FROM #__users ORDER BY id");
    assert_eq!(
        db.load_row()?,
        Some(vec![
            SqlValue::Int(1),
            SqlValue::Text("ann".into()),
            SqlValue::Int(10)
        ])
    );
    assert_eq!(
        db.load_column(1)?,
        vec![
            SqlValue::Text("ann".into()),
            SqlValue::Text("bob".into()),
            SqlValue::Text("O'Brien".into()),
        ]
    );
    assert_eq!(db.load_result()?, Some(SqlValue::Int(1)));
    assert_eq!(db.load_row_list()?.len(), 3);
    assert_eq!(db.load_assoc_list()?.len(), 3);

    let record = db.load_object()?.ok_or("no record")?;
    assert_eq!(record.field("score"), Some(&SqlValue::Int(10)));

    let user: Option<User> = db.load_object_as()?;
    assert_eq!(
        user,
        Some(User {
            id: 1,
            name: "ann".into(),
            score: 10
        })
    );
    let users: Vec<User> = db.load_object_list_as()?;
    assert_eq!(users.len(), 3);
    assert_eq!(users[2].name, "O'Brien");
    Ok(())
}

#[test]
fn keyed_loaders() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    db.set_query("SELECT name, score FROM #__users ORDER BY id");
    let scores = db.load_column_map("name", "score")?;
    assert_eq!(scores[1], (SqlValue::Text("bob".into()), SqlValue::Int(20)));

    let by_name = db.load_object_map("name")?;
    assert_eq!(by_name.len(), 3);
    assert!(matches!(
        db.load_assoc_map("nope"),
        Err(SqlBridgeError::Other(_))
    ));
    Ok(())
}

#[test]
fn limit_and_offset_window_the_result() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    db.set_query("SELECT name FROM #__users ORDER BY id").set_limit(1, 1);
    assert_eq!(db.load_column(0)?, vec![SqlValue::Text("bob".into())]);
    Ok(())
}

#[test]
fn counts_and_insert_id() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    db.set_query("INSERT INTO #__users (name) VALUES (:name)")
        .bind("name", "cat", ParamType::Str);
    db.execute()?;
    assert_eq!(db.affected_rows(), 1);
    assert_eq!(db.insert_id()?, 4);

    db.set_query("UPDATE #__users SET score = score + 1 WHERE score >= :min")
        .bind("min", "20", ParamType::Int);
    db.execute()?;
    assert_eq!(db.affected_rows(), 2);

    db.set_query("SELECT id FROM #__users");
    db.execute()?;
    assert_eq!(db.num_rows(), 4);
    db.free_result();
    Ok(())
}

#[test]
fn failed_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    let err = db
        .transaction([
            "INSERT INTO #__users (name) VALUES ('dave')",
            "INSERT INTO #__users (id, name) VALUES (1, 'duplicate')",
        ])
        .unwrap_err();
    assert!(err.is_execution_failure());
    assert_eq!(
        err.sql(),
        Some("INSERT INTO app_users (id, name) VALUES (1, 'duplicate')")
    );

    db.set_query("SELECT count(*) FROM #__users");
    assert_eq!(db.load_result()?, Some(SqlValue::Int(3)));

    assert!(matches!(
        db.transaction(Vec::<Query>::new()),
        Err(SqlBridgeError::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn schema_queries_and_cache() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    assert_eq!(db.table_list()?, vec!["app_users".to_string()]);
    assert!(db.table_exists("#__users")?);
    assert!(!db.table_exists("#__missing")?);

    let columns = db.table_columns("#__users")?;
    let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "note", "score"]);
    assert!(columns[0].primary_key);
    assert!(!columns[1].nullable);
    assert_eq!(columns[3].default_value.as_deref(), Some("0"));
    assert!(db.schema_cache().get("app_users").is_some());

    db.rename_table("#__users", "#__people")?;
    assert!(db.schema_cache().get("app_users").is_none());
    assert!(db.table_exists("#__people")?);

    db.table_columns("#__people")?;
    db.truncate_table("#__people")?;
    assert!(db.schema_cache().get("app_people").is_none());
    db.set_query("SELECT count(*) FROM #__people");
    assert_eq!(db.load_result()?, Some(SqlValue::Int(0)));

    db.drop_table("#__people")?;
    assert!(db.table_list()?.is_empty());
    Ok(())
}

#[test]
fn quoting_helpers() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut db = open(&dir)?;

    assert_eq!(db.quote("O'Brien", true)?, "'O''Brien'");
    assert_eq!(db.quote("42", true)?, "42");
    assert_eq!(db.quote("007", true)?, "'007'");
    assert_eq!(db.escape("10%", true)?, "10\\%");
    assert_eq!(db.quote_name("u.name", Some("n"))?, "`u`.`name` AS `n`");
    assert_eq!(db.values_to_string(&["a", "1"])?, "'a', 1");

    assert!(db.record_exists("app_users", &[("name", SqlValue::from("bob"))])?);
    assert!(!db.record_exists("app_users", &[("name", SqlValue::from("zed"))])?);
    Ok(())
}
