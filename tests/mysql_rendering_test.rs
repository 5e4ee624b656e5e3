//! Golden SQL for the MySQL dialect

use serde_json::{json, Map, Value as JsonValue};
use sqlcrud::database::SqlValue;
use sqlcrud::query_builder::{compile_update, DatabaseBackend, QueryBuilder, UpdateOperator};
use sqlcrud::request::{CreateRequest, JoinOption, ReadOperation, ReadOptions, ReadRequest};

fn map(value: JsonValue) -> Map<String, JsonValue> {
    value.as_object().cloned().unwrap()
}

fn builder() -> QueryBuilder {
    QueryBuilder::new(DatabaseBackend::MySQL).db_name("test")
}

fn read(find: JsonValue, options: ReadOptions, op: ReadOperation) -> (String, Vec<SqlValue>) {
    let req = ReadRequest::new(op).find(map(find)).options(options);
    let rendered = builder().render_read("table", &req).unwrap();
    (rendered.sql, rendered.args)
}

#[test]
fn test_select_equality() {
    let (sql, args) = read(json!({"String1": "1"}), ReadOptions::default(), ReadOperation::All);
    assert_eq!(sql, "SELECT * FROM table WHERE (String1 = ?)");
    assert_eq!(args, vec![SqlValue::from("1")]);
}

#[test]
fn test_select_operators() {
    let (sql, args) = read(
        json!({"String1": {"$in": ["1"]}}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE (String1 IN (?))");
    assert_eq!(args, vec![SqlValue::from("1")]);

    let (sql, _) = read(
        json!({"age": {"$gte": 18, "$lt": 65}}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE ((age >= ?) AND (age < ?))");

    let (sql, args) = read(
        json!({"$or": [{"String1": "1"}, {"String2": "2"}]}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE ((String1 = ?) OR (String2 = ?))");
    assert_eq!(args, vec![SqlValue::from("1"), SqlValue::from("2")]);

    let (sql, args) = read(
        json!({"$or": [{"a": 1}, {"b": {}}]}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE ((a = ?) OR (1 = 1))");
    assert_eq!(args, vec![SqlValue::BigInt(1)]);
}

#[test]
fn test_select_null_and_like() {
    let (sql, args) = read(
        json!({"deleted": null, "name": {"$like": "a%"}, "owner": {"$ne": null}}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(
        sql,
        "SELECT * FROM table WHERE ((deleted IS NULL) AND (name LIKE ?) AND (owner IS NOT NULL))"
    );
    assert_eq!(args, vec![SqlValue::from("a%")]);
}

#[test]
fn test_select_regex() {
    let (sql, args) = read(
        json!({"fieldName": {"$regex": "/*"}}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE (fieldName REGEXP ?)");
    assert_eq!(args, vec![SqlValue::from("/*")]);
}

#[test]
fn test_select_contains() {
    let (sql, args) = read(
        json!({"Obj1": {"$contains": {"obj1": "value1"}}}),
        ReadOptions::default(),
        ReadOperation::All,
    );
    assert_eq!(sql, "SELECT * FROM table WHERE json_contains(Obj1,?)");
    assert_eq!(args, vec![SqlValue::from(r#"{"obj1":"value1"}"#)]);
}

#[test]
fn test_select_projection_sort_and_paging() {
    let options: ReadOptions = serde_json::from_value(json!({
        "select": {"Column1": 1, "Column2": 1},
        "sort": ["Column1", "-Column2"],
        "limit": 10,
        "skip": 5
    }))
    .unwrap();
    let (sql, args) = read(json!({"Column1": "1"}), options, ReadOperation::All);
    assert_eq!(
        sql,
        "SELECT Column1, Column2 FROM table WHERE (Column1 = ?) ORDER BY Column1 ASC, Column2 DESC LIMIT ? OFFSET ?"
    );
    assert_eq!(
        args,
        vec![
            SqlValue::from("1"),
            SqlValue::UnsignedBigInt(10),
            SqlValue::UnsignedBigInt(5)
        ]
    );
}

#[test]
fn test_count_and_distinct() {
    let (sql, args) = read(json!({}), ReadOptions::default(), ReadOperation::Count);
    assert_eq!(sql, "SELECT COUNT(*) FROM table");
    assert!(args.is_empty());

    let options = ReadOptions {
        distinct: Some("Column1".to_string()),
        ..Default::default()
    };
    let (sql, _) = read(json!({}), options, ReadOperation::Distinct);
    assert_eq!(sql, "SELECT DISTINCT Column1 FROM table");
}

#[test]
fn test_match_where_is_anded() {
    let mut req = ReadRequest::new(ReadOperation::All).find(map(json!({"a": 1})));
    req.match_where.push(map(json!({"b": 2})));
    let rendered = builder().render_read("table", &req).unwrap();
    assert_eq!(rendered.sql, "SELECT * FROM table WHERE ((b = ?) AND (a = ?))");
}

#[test]
fn test_left_join() {
    let mut options = ReadOptions::default();
    options.select.insert("t1.col1".to_string());
    options.select.insert("t2.col2".to_string());
    options
        .join
        .push(JoinOption::new("t2", map(json!({"t1.col1": "t2.col2"}))));
    let req = ReadRequest::new(ReadOperation::All).options(options);
    let rendered = builder().render_read("t1", &req).unwrap();
    assert_eq!(
        rendered.sql,
        "SELECT t1.col1 AS t1__col1, t2.col2 AS t2__col2 FROM t1 LEFT JOIN t2 ON (t1.col1 = t2.col2)"
    );
    assert!(rendered.args.is_empty());
}

#[test]
fn test_insert_single_and_bulk() {
    let req = CreateRequest::one(json!({"string1": "1", "string2": "2", "string3": "3"}));
    let rendered = builder().render_create("footable1", &req).unwrap();
    assert_eq!(
        rendered.sql,
        "INSERT INTO footable1 (string1, string2, string3) VALUES (?, ?, ?)"
    );
    assert_eq!(rendered.args.len(), 3);

    let req = CreateRequest::all(json!([
        {"a": 1, "b": 2},
        {"b": 4, "a": 3},
        {"a": 5, "b": 6}
    ]));
    let rendered = builder().render_create("footable1", &req).unwrap();
    assert_eq!(
        rendered.sql,
        "INSERT INTO footable1 (a, b) VALUES (?, ?), (?, ?), (?, ?)"
    );
    assert_eq!(
        rendered.args,
        (1..=6).map(SqlValue::BigInt).collect::<Vec<_>>()
    );
}

#[test]
fn test_insert_empty_document() {
    let rendered = builder()
        .render_create("footable1", &CreateRequest::one(json!({})))
        .unwrap();
    assert_eq!(rendered.sql, "INSERT INTO footable1 () VALUES ()");
    assert!(rendered.args.is_empty());
}

#[test]
fn test_bulk_insert_empty_documents() {
    let rendered = builder()
        .render_create("footable1", &CreateRequest::all(json!([{}, {}])))
        .unwrap();
    assert_eq!(rendered.sql, "INSERT INTO footable1 () VALUES (), ()");
    assert!(rendered.args.is_empty());
}

#[test]
fn test_bulk_insert_mismatched_keys() {
    let err = builder()
        .render_create("t", &CreateRequest::all(json!([{"a": 1, "b": 2}, {"a": 1}])))
        .unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_PARAMS");

    let err = builder()
        .render_create("t", &CreateRequest::all(json!([{"a": 1}, 7])))
        .unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_PARAMS");
}

fn update(update: JsonValue, op: UpdateOperator) -> (String, Vec<SqlValue>) {
    let rendered = compile_update(
        &builder(),
        "col",
        &map(json!({"FindString1": "1"})),
        &map(update),
        op,
    )
    .unwrap();
    (rendered.sql, rendered.args)
}

#[test]
fn test_update_operators() {
    let (sql, args) = update(json!({"$set": {"String1": "1"}}), UpdateOperator::Set);
    assert_eq!(sql, "UPDATE col SET String1=? WHERE (FindString1 = ?)");
    assert_eq!(args, vec![SqlValue::from("1"), SqlValue::from("1")]);

    let (sql, _) = update(json!({"$inc": {"String1": 1}}), UpdateOperator::Inc);
    assert_eq!(sql, "UPDATE col SET String1=String1+? WHERE (FindString1 = ?)");

    let (sql, _) = update(json!({"$mul": {"String1": 2}}), UpdateOperator::Mul);
    assert_eq!(sql, "UPDATE col SET String1=String1*? WHERE (FindString1 = ?)");

    let (sql, _) = update(json!({"$max": {"String1": 2}}), UpdateOperator::Max);
    assert_eq!(sql, "UPDATE col SET String1=GREATEST(String1,?) WHERE (FindString1 = ?)");

    let (sql, _) = update(json!({"$min": {"String1": 2}}), UpdateOperator::Min);
    assert_eq!(sql, "UPDATE col SET String1=LEAST(String1,?) WHERE (FindString1 = ?)");
}

#[test]
fn test_update_current_date_drops_placeholder() {
    let (sql, args) = update(
        json!({"$currentDate": {"String1": {"$type": "date"}, "String2": {"$type": "timestamp"}}}),
        UpdateOperator::CurrentDate,
    );
    assert_eq!(
        sql,
        "UPDATE col SET String1=CURRENT_DATE,String2=CURRENT_TIMESTAMP WHERE (FindString1 = ?)"
    );
    assert_eq!(args, vec![SqlValue::from("1")]);
}

#[test]
fn test_numeric_operator_rejects_text() {
    for (key, op) in [
        ("$inc", UpdateOperator::Inc),
        ("$mul", UpdateOperator::Mul),
        ("$max", UpdateOperator::Max),
        ("$min", UpdateOperator::Min),
    ] {
        let err = compile_update(
            &builder(),
            "col",
            &Map::new(),
            &map(json!({ key: {"String1": "abc"} })),
            op,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_FORMAT", "{}", key);
    }
}

#[test]
fn test_delete() {
    let rendered = builder()
        .render_delete("fooTable", &map(json!({"String1": "1"})))
        .unwrap();
    assert_eq!(rendered.sql, "DELETE FROM fooTable WHERE (String1 = ?)");

    let rendered = builder().render_delete("fooTable", &Map::new()).unwrap();
    assert_eq!(rendered.sql, "DELETE FROM fooTable");
    assert!(rendered.args.is_empty());
}
