//! Property tests: placeholders in the text always match the argument list

use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};
use sqlcrud::query_builder::{compile_update, DatabaseBackend, QueryBuilder, UpdateOperator};
use sqlcrud::request::{CreateRequest, ReadOperation, ReadOptions, ReadRequest};
use sqlcrud::RenderedStatement;

/// Positions of `$n` / `@pn` placeholders in order of appearance
fn numbered_placeholders(sql: &str, prefix: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut rest = sql;
    while let Some(pos) = rest.find(prefix) {
        rest = &rest[pos + prefix.len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse() {
            found.push(n);
        }
    }
    found
}

fn assert_in_sync(backend: DatabaseBackend, rendered: &RenderedStatement) {
    match backend {
        DatabaseBackend::MySQL => {
            assert_eq!(rendered.sql.matches('?').count(), rendered.args.len(), "{}", rendered.sql)
        }
        DatabaseBackend::Postgres => {
            let expected: Vec<usize> = (1..=rendered.args.len()).collect();
            assert_eq!(numbered_placeholders(&rendered.sql, "$"), expected, "{}", rendered.sql)
        }
        DatabaseBackend::SqlServer => {
            let expected: Vec<usize> = (1..=rendered.args.len()).collect();
            assert_eq!(numbered_placeholders(&rendered.sql, "@p"), expected, "{}", rendered.sql)
        }
    }
}

fn backend() -> impl Strategy<Value = DatabaseBackend> {
    prop_oneof![
        Just(DatabaseBackend::MySQL),
        Just(DatabaseBackend::Postgres),
        Just(DatabaseBackend::SqlServer),
    ]
}

fn field() -> impl Strategy<Value = String> + Clone {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string)
}

fn scalar() -> impl Strategy<Value = JsonValue> + Clone {
    prop_oneof![
        any::<i32>().prop_map(JsonValue::from),
        "[a-z]{0,6}".prop_map(JsonValue::from),
        any::<bool>().prop_map(JsonValue::from),
        Just(JsonValue::Null),
    ]
}

fn condition() -> impl Strategy<Value = JsonValue> + Clone {
    prop_oneof![
        scalar(),
        scalar().prop_map(|v| json!({"$ne": v})),
        scalar().prop_map(|v| json!({"$gt": v, "$lte": v})),
        prop::collection::vec(scalar(), 0..4).prop_map(|v| json!({"$in": v})),
        prop::collection::vec(scalar(), 0..4).prop_map(|v| json!({"$nin": v})),
    ]
}

fn filter_spec() -> impl Strategy<Value = Map<String, JsonValue>> {
    let flat = prop::collection::btree_map(field(), condition(), 0..4)
        .prop_map(|m| m.into_iter().collect::<Map<String, JsonValue>>());
    (flat.clone(), prop::collection::vec(flat, 0..3)).prop_map(|(mut base, ors)| {
        if !ors.is_empty() {
            base.insert(
                "$or".to_string(),
                JsonValue::Array(ors.into_iter().map(JsonValue::Object).collect()),
            );
        }
        base
    })
}

fn update_spec() -> impl Strategy<Value = (UpdateOperator, JsonValue)> {
    let numbers = prop::collection::btree_map(field(), any::<i32>(), 1..4);
    prop_oneof![
        prop::collection::btree_map(field(), scalar(), 1..4)
            .prop_map(|m| (UpdateOperator::Set, json!({ "$set": m }))),
        numbers.clone().prop_map(|m| (UpdateOperator::Inc, json!({ "$inc": m }))),
        numbers.clone().prop_map(|m| (UpdateOperator::Max, json!({ "$max": m }))),
        numbers.prop_map(|m| (UpdateOperator::Min, json!({ "$min": m }))),
        prop::collection::btree_map(
            field(),
            prop::sample::select(vec!["date", "timestamp"]),
            1..4
        )
        .prop_map(|m| {
            let fields: Map<String, JsonValue> = m
                .into_iter()
                .map(|(k, t)| (k, json!({"$type": t})))
                .collect();
            (UpdateOperator::CurrentDate, json!({ "$currentDate": fields }))
        }),
    ]
}

proptest! {
    #[test]
    fn read_placeholders_match_args(
        backend in backend(),
        find in filter_spec(),
        limit in prop::option::of(1u64..100),
        skip in prop::option::of(0u64..100),
    ) {
        let options = ReadOptions {
            limit,
            skip,
            sort: vec!["a".to_string()],
            ..Default::default()
        };
        let req = ReadRequest::new(ReadOperation::All).find(find).options(options);
        let builder = QueryBuilder::new(backend).db_name("db");
        let rendered = builder.render_read("t", &req).unwrap();
        assert_in_sync(backend, &rendered);
    }

    #[test]
    fn update_placeholders_match_args(
        backend in backend(),
        find in filter_spec(),
        spec in update_spec(),
    ) {
        let (op, update) = spec;
        let builder = QueryBuilder::new(backend).db_name("db");
        let update = update.as_object().cloned().unwrap();
        let rendered = compile_update(&builder, "t", &find, &update, op).unwrap();
        assert_in_sync(backend, &rendered);
    }

    #[test]
    fn bulk_insert_requires_uniform_keys(
        rows in prop::collection::vec(
            prop::collection::btree_set(prop::sample::select(vec!["a", "b", "c"]), 1..=3),
            1..5,
        ),
    ) {
        let uniform = rows.iter().all(|keys| keys == &rows[0]);
        let docs: Vec<JsonValue> = rows
            .iter()
            .enumerate()
            .map(|(i, keys)| {
                JsonValue::Object(keys.iter().map(|k| (k.to_string(), JsonValue::from(i))).collect())
            })
            .collect();

        let builder = QueryBuilder::new(DatabaseBackend::MySQL);
        let result = builder.render_create("t", &CreateRequest::all(JsonValue::Array(docs)));
        match result {
            Ok(rendered) => {
                prop_assert!(uniform);
                prop_assert_eq!(rendered.args.len(), rows.len() * rows[0].len());
            }
            Err(err) => {
                prop_assert!(!uniform);
                prop_assert_eq!(err.error_code(), "E_INVALID_PARAMS");
            }
        }
    }
}
