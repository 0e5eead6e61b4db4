//! Integration tests against a running MySQL server.
//!
//! Credentials come from `CONNECT_SQL_TEST` (`user=…,password=…,host=…,port=…`).
//! Each test works in its own scratch database and drops it afterwards.
//! Run: `cargo test --test live_mysql -- --nocapture --ignored`

use std::io::Write;

use connect_sql::prelude::*;

const CREDENTIALS_KEY: &str = "CONNECT_SQL_TEST";

async fn open(database: &str) -> SqlResult<Session> {
    let mut options = SessionOptions::new(Credentials::from_env(CREDENTIALS_KEY)?);
    options.database = Some(database.to_string());
    options.reset_database = true;
    Session::open(options).await
}

async fn count(session: &mut Session, table: &str) -> SqlResult<usize> {
    session.select(table, Columns::All).await
}

#[tokio::test]
#[ignore = "Requires a MySQL server - set CONNECT_SQL_TEST and run with --ignored"]
async fn test_overwrite_recreates_table() -> SqlResult<()> {
    let mut session = open("connect_sql_test_overwrite").await?;

    session.create_table("items", ["id tinyint unique", "name varchar(255)"], false).await?;
    session
        .insert_rows("items", &[vec![1.into(), "one".into()]], None, true)
        .await?;

    // Redeclaring without overwrite keeps the data.
    session.create_table("items", ["id tinyint unique", "name varchar(255)"], false).await?;
    assert_eq!(count(&mut session, "items").await?, 1);

    session.create_table("items", ["id tinyint unique", "name varchar(255)"], true).await?;
    assert_eq!(count(&mut session, "items").await?, 0);

    session.drop_database("connect_sql_test_overwrite").await?;
    session.close().await
}

#[tokio::test]
#[ignore = "Requires a MySQL server - set CONNECT_SQL_TEST and run with --ignored"]
async fn test_load_csv_row() -> SqlResult<()> {
    let mut session = open("connect_sql_test_csv").await?;
    session
        .create_table("products", ["id tinyint", "name varchar(255)", "price float(15, 5)"], true)
        .await?;

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "id,name,price\n1,Widget,9.99")?;

    assert_eq!(session.load_csv("products", file.path(), true).await?, 1);
    assert_eq!(session.select("products", Columns::All).await?, 1);

    let rows = session.fetch_all()?;
    assert_eq!(rows[0].get_named("id"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get_string(1).as_deref(), Some("Widget"));

    session.drop_database("connect_sql_test_csv").await?;
    session.close().await
}

#[tokio::test]
#[ignore = "Requires a MySQL server - set CONNECT_SQL_TEST and run with --ignored"]
async fn test_select_keeps_insertion_order() -> SqlResult<()> {
    let mut session = open("connect_sql_test_order").await?;
    session
        .create_table("events", ["seq int", "label varchar(32)"], true)
        .await?;

    let rows: Vec<Vec<Value>> = (0..20)
        .map(|i| vec![Value::from(i), Value::from(format!("event-{}", i))])
        .collect();
    assert_eq!(session.insert_rows("events", &rows, None, true).await?, 20);

    session.select("events", ["seq"]).await?;
    let first: Vec<Value> = session.fetch_all()?.into_iter().map(|r| r.values[0].clone()).collect();
    session.select("events", ["seq"]).await?;
    let second: Vec<Value> = session.fetch_all()?.into_iter().map(|r| r.values[0].clone()).collect();

    let expected: Vec<Value> = (0..20).map(Value::from).collect();
    assert_eq!(first, expected);
    assert_eq!(first, second);

    session.drop_database("connect_sql_test_order").await?;
    session.close().await
}

#[tokio::test]
#[ignore = "Requires a MySQL server - set CONNECT_SQL_TEST and run with --ignored"]
async fn test_keys_and_join() -> SqlResult<()> {
    let mut session = open("connect_sql_test_join").await?;
    session.create_table("orders", ["order_id int", "customer_id int"], true).await?;
    session.create_table("customers", ["customer_id int", "name varchar(64)"], true).await?;
    session
        .insert_rows("customers", &[vec![7.into(), "Ada".into()]], None, true)
        .await?;
    session
        .insert_rows("orders", &[vec![1.into(), 7.into()]], None, true)
        .await?;

    session.add_key("customers", "customer_id", Some("orders"), None).await?;

    let clause = session
        .join(&["orders", "customers"], JoinType::Inner, &["customer_id"])
        .await?;
    assert_eq!(session.select(&clause, ["orders.order_id", "customers.name"]).await?, 1);

    // The foreign key now rejects orphans.
    let err = session
        .insert_rows("orders", &[vec![2.into(), 99.into()]], None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlError::Constraint { .. }), "{:?}", err);
    session.rollback().await?;

    session.drop_database("connect_sql_test_join").await?;
    session.close().await
}
