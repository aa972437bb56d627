use common::row::row_string::RowString;
use connection::conn::connection::{Connection, IConnection};
use connection::conn::connection_options::ConnectionOptions;
use connection::conn::query_result::{QueryColumn, StreamQueryResult};

#[test]
fn test_options_round_trip() {
    let config: common::config::ToolConfig = toml::from_str(
        r#"
        [mysql]
        host = "db.internal"
        port = 3307
        username = "ops"
        password = "pw"
        database = "orders"
        "#,
    )
    .unwrap();

    let options = ConnectionOptions::from_config(&config.mysql);
    assert_eq!(options.hostname, "db.internal");
    assert_eq!(options.port, 3307);
    assert_eq!(options.database.as_deref(), Some("orders"));
}

#[test]
fn test_escape_for_insert_literal() {
    let conn = Connection::new(ConnectionOptions::default());

    let escaped = conn.escape_string("O'Brien said \"hi\"\n");
    assert_eq!(escaped, "O\\'Brien said \\\"hi\\\"\\n");
}

#[test]
fn test_stream_drains_canned_rows() {
    let rows = vec![
        RowString::new_row(vec![Some("1".into())]),
        RowString::new_row(vec![Some("2".into())]),
        RowString::new_row(vec![Some("3".into())]),
    ];
    let stream = StreamQueryResult::from_rows(vec![QueryColumn::named("id")], rows);

    let collected: Vec<_> = stream.map(|r| r.unwrap().get_or_empty(0).to_string()).collect();
    assert_eq!(collected, vec!["1", "2", "3"]);
}
