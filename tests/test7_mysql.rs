#![cfg(feature = "mysql")]

use sql_bridge::prelude::*;

// Runs against a disposable server, e.g. SQL_BRIDGE_MYSQL_URL=mysql://root:pw@127.0.0.1:3306/test
const URL_VAR: &str = "SQL_BRIDGE_MYSQL_URL";

fn server_url() -> Option<String> {
    std::env::var(URL_VAR).ok().filter(|url| !url.is_empty())
}

#[test]
fn mysql_positional_driver_against_a_live_server() -> Result<(), SqlBridgeError> {
    let Some(url) = server_url() else {
        eprintln!("{URL_VAR} not set; skipping");
        return Ok(());
    };
    let conn = MysqlConnection::connect(&url)?;
    assert!(conn.ping());

    conn.prepare("DROP TABLE IF EXISTS sb_people")?
        .execute(&BoundParams::new())?;
    conn.prepare(
        "CREATE TABLE sb_people (id INT AUTO_INCREMENT PRIMARY KEY, name TEXT NOT NULL, nick TEXT)",
    )?
    .execute(&BoundParams::new())?;

    let mut insert = conn.prepare("INSERT INTO sb_people (name, nick) VALUES (:name, :name)")?;
    assert_eq!(insert.native_sql(), "INSERT INTO sb_people (name, nick) VALUES (?, ?)");
    let mut params = BoundParams::new();
    params.bind("name", "O'Brien", ParamType::Str);
    insert.execute(&params)?;
    assert_eq!(insert.row_count(), 1);
    assert_eq!(conn.last_insert_id()?, 1);

    let mut select = conn.prepare("SELECT id, nick FROM sb_people WHERE id = :id")?;
    let mut by_id = BoundParams::new();
    by_id.bind("id", "1", ParamType::Int);
    select.execute(&by_id)?;
    let rows = select.fetch_all(FetchMode::Associative)?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("nick"), Some(&SqlValue::Text("O'Brien".into())));

    let options = DatabaseOptions::mysql(url.as_str());
    let mut db = Database::open(options)?;
    assert!(db.table_exists("sb_people")?);
    let columns = db.table_columns("sb_people")?;
    assert!(columns[0].primary_key);
    db.truncate_table("sb_people")?;
    db.set_query("SELECT COUNT(*) FROM sb_people");
    assert_eq!(db.load_result()?, Some(SqlValue::Int(0)));
    db.drop_table("sb_people")?;
    Ok(())
}
