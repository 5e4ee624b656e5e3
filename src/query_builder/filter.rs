//! Filter compilation
//!
//! A [`FilterSpec`] is first parsed into a [`Filter`] tree and then lowered
//! into statement fragments. Entries of a spec, and operators on the same
//! field, combine with AND; members of `$or` combine with OR.

use super::dialects::SqlDialect;
use super::statement::Statement;
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use crate::request::FilterSpec;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(JsonValue),
    /// Column reference, only produced in join context
    Column(String),
}

impl Operand {
    fn new(value: &JsonValue, is_join: bool) -> Self {
        match value {
            JsonValue::String(s) if is_join => Operand::Column(s.clone()),
            other => Operand::Value(other.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        field: String,
        op: CompareOp,
        operand: Operand,
    },
    In {
        field: String,
        values: Vec<Operand>,
    },
    Nin {
        field: String,
        values: Vec<Operand>,
    },
    Regex {
        field: String,
        pattern: Operand,
    },
    Contains {
        field: String,
        value: JsonValue,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    /// Matches every row; stands in for an empty `$or` member
    Always,
}

impl Filter {
    /// Parse a filter spec; `is_join` turns string operands into column references
    pub fn parse(spec: &FilterSpec, is_join: bool) -> Result<Filter> {
        let mut members = Vec::new();

        for (key, value) in spec {
            if key.starts_with("$or") {
                members.push(Self::parse_or(value, is_join)?);
                continue;
            }

            match value {
                JsonValue::Object(ops) => {
                    for (op, operand) in ops {
                        members.push(Self::parse_operator(key, op, operand, is_join)?);
                    }
                }
                other => members.push(Filter::Compare {
                    field: key.clone(),
                    op: CompareOp::Eq,
                    operand: Operand::new(other, is_join),
                }),
            }
        }

        Ok(Filter::And(members))
    }

    fn parse_or(value: &JsonValue, is_join: bool) -> Result<Filter> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::invalid_params("$or expects an array of filters"))?;

        let mut members = Vec::with_capacity(items.len());
        for item in items {
            let spec = item
                .as_object()
                .ok_or_else(|| Error::invalid_params("$or members must be filter objects"))?;
            // A member without constraints matches every row
            let member = Self::parse(spec, is_join)?;
            if member.is_empty() {
                members.push(Filter::Always);
            } else {
                members.push(member);
            }
        }
        Ok(Filter::Or(members))
    }

    fn parse_operator(field: &str, op: &str, operand: &JsonValue, is_join: bool) -> Result<Filter> {
        let compare = |op: CompareOp| Filter::Compare {
            field: field.to_string(),
            op,
            operand: Operand::new(operand, is_join),
        };

        let filter = match op {
            "$eq" => compare(CompareOp::Eq),
            "$ne" => compare(CompareOp::Ne),
            "$gt" => compare(CompareOp::Gt),
            "$gte" => compare(CompareOp::Gte),
            "$lt" => compare(CompareOp::Lt),
            "$lte" => compare(CompareOp::Lte),
            "$like" => compare(CompareOp::Like),
            "$in" => Filter::In {
                field: field.to_string(),
                values: set_operands(operand, is_join),
            },
            "$nin" => Filter::Nin {
                field: field.to_string(),
                values: set_operands(operand, is_join),
            },
            "$regex" => Filter::Regex {
                field: field.to_string(),
                pattern: Operand::new(operand, is_join),
            },
            "$contains" => Filter::Contains {
                field: field.to_string(),
                value: operand.clone(),
            },
            unknown => {
                return Err(Error::invalid_params(format!(
                    "unknown filter operator {} on field {}",
                    unknown, field
                )))
            }
        };
        Ok(filter)
    }

    /// True when the filter renders no predicate at all
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::And(members) | Filter::Or(members) => members.iter().all(Filter::is_empty),
            _ => false,
        }
    }

    /// Fields carrying a regex predicate, in render order
    pub fn regex_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_regex_fields(&mut fields);
        fields
    }

    fn collect_regex_fields(&self, out: &mut Vec<String>) {
        match self {
            Filter::Regex { field, .. } => out.push(field.clone()),
            Filter::And(members) | Filter::Or(members) => {
                for member in members {
                    member.collect_regex_fields(out);
                }
            }
            _ => {}
        }
    }

    /// Lower into statement fragments
    pub fn render(&self, dialect: &dyn SqlDialect, out: &mut Statement) -> Result<()> {
        match self {
            Filter::Compare { field, op, operand } => {
                out.push_sql("(").push_ident(field);
                match (op, operand) {
                    (CompareOp::Eq, Operand::Value(JsonValue::Null)) => {
                        out.push_sql(" IS NULL");
                    }
                    (CompareOp::Ne, Operand::Value(JsonValue::Null)) => {
                        out.push_sql(" IS NOT NULL");
                    }
                    _ => {
                        out.push_sql(format!(" {} ", op.as_sql()));
                        push_operand(out, operand);
                    }
                }
                out.push_sql(")");
            }
            Filter::In { field, values } => render_set(out, field, values, "IN", "(1 = 0)"),
            Filter::Nin { field, values } => render_set(out, field, values, "NOT IN", "(1 = 1)"),
            Filter::Regex { field, pattern } => {
                out.push_sql("(").push_ident(field).push_sql(" ");
                out.push_regex_operator(field);
                out.push_sql(" ");
                push_operand(out, pattern);
                out.push_sql(")");
            }
            Filter::Contains { field, value } => {
                let (before, after) = dialect
                    .json_contains(&super::statement::strip_quotes(field))
                    .ok_or_else(|| Error::unsupported(dialect.backend(), "$contains"))?;
                out.push_sql(before)
                    .push_param(dialect.json_contains_arg(value)?)
                    .push_sql(after);
            }
            Filter::And(members) => render_group(dialect, out, members, " AND ")?,
            Filter::Or(members) => render_group(dialect, out, members, " OR ")?,
            Filter::Always => {
                out.push_sql("(1 = 1)");
            }
        }
        Ok(())
    }
}

/// Output of [`compile`]: the predicate plus fields whose regex operator
/// still has to be resolved for the dialect
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub expr: Statement,
    pub regex_markers: Vec<String>,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }
}

/// Compile a filter spec for `dialect`
pub fn compile(spec: &FilterSpec, dialect: &dyn SqlDialect, is_join: bool) -> Result<CompiledFilter> {
    let filter = Filter::parse(spec, is_join)?;
    compile_filter(&filter, dialect)
}

pub fn compile_filter(filter: &Filter, dialect: &dyn SqlDialect) -> Result<CompiledFilter> {
    let mut expr = Statement::new();
    filter.render(dialect, &mut expr)?;
    Ok(CompiledFilter {
        expr,
        regex_markers: filter.regex_fields(),
    })
}

fn set_operands(operand: &JsonValue, is_join: bool) -> Vec<Operand> {
    match operand {
        JsonValue::Array(items) => items.iter().map(|v| Operand::new(v, is_join)).collect(),
        single => vec![Operand::new(single, is_join)],
    }
}

fn push_operand(out: &mut Statement, operand: &Operand) {
    match operand {
        Operand::Value(value) => {
            out.push_param(SqlValue::from_json(value));
        }
        Operand::Column(column) => {
            out.push_ident(column);
        }
    }
}

fn render_set(out: &mut Statement, field: &str, values: &[Operand], keyword: &str, when_empty: &str) {
    if values.is_empty() {
        out.push_sql(when_empty);
        return;
    }
    out.push_sql("(").push_ident(field).push_sql(format!(" {} (", keyword));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_sql(", ");
        }
        push_operand(out, value);
    }
    out.push_sql("))");
}

fn render_group(
    dialect: &dyn SqlDialect,
    out: &mut Statement,
    members: &[Filter],
    joiner: &str,
) -> Result<()> {
    let members: Vec<&Filter> = members.iter().filter(|m| !m.is_empty()).collect();
    match members.as_slice() {
        [] => {}
        [single] => single.render(dialect, out)?,
        many => {
            out.push_sql("(");
            for (i, member) in many.iter().enumerate() {
                if i > 0 {
                    out.push_sql(joiner);
                }
                member.render(dialect, out)?;
            }
            out.push_sql(")");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::dialects::{create_dialect, DatabaseBackend};
    use serde_json::json;

    fn spec(value: JsonValue) -> FilterSpec {
        value.as_object().cloned().unwrap()
    }

    fn render(backend: DatabaseBackend, value: JsonValue) -> (String, Vec<SqlValue>) {
        let dialect = create_dialect(backend);
        let compiled = compile(&spec(value), dialect.as_ref(), false).unwrap();
        let mut expr = compiled.expr;
        crate::query_builder::post_process::resolve_regex(&mut expr, &compiled.regex_markers, dialect.as_ref())
            .unwrap();
        let rendered = expr.finish(dialect.as_ref()).unwrap();
        (rendered.sql, rendered.args)
    }

    #[test]
    fn test_implicit_equality() {
        let (sql, args) = render(DatabaseBackend::MySQL, json!({"String1": "1"}));
        assert_eq!(sql, "(String1 = ?)");
        assert_eq!(args, vec![SqlValue::from("1")]);
    }

    #[test]
    fn test_multiple_operators_and_together() {
        let (sql, args) = render(DatabaseBackend::Postgres, json!({"age": {"$gte": 18, "$lt": 65}}));
        assert_eq!(sql, "((age >= $1) AND (age < $2))");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_or_with_empty_member() {
        let (sql, _) = render(DatabaseBackend::MySQL, json!({"$or": [{"a": 1}, {}]}));
        assert_eq!(sql, "((a = ?) OR (1 = 1))");
    }

    #[test]
    fn test_or_with_unconstrained_member() {
        let (sql, args) = render(DatabaseBackend::MySQL, json!({"$or": [{"a": 1}, {"b": {}}]}));
        assert_eq!(sql, "((a = ?) OR (1 = 1))");
        assert_eq!(args, vec![SqlValue::BigInt(1)]);
    }

    #[test]
    fn test_or_requires_array() {
        let dialect = create_dialect(DatabaseBackend::MySQL);
        let err = compile(&spec(json!({"$or": {"a": 1}})), dialect.as_ref(), false).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_PARAMS");
    }

    #[test]
    fn test_in_with_array_and_scalar() {
        let (sql, args) = render(DatabaseBackend::Postgres, json!({"id": {"$in": [1, 2, 3]}}));
        assert_eq!(sql, "(id IN ($1, $2, $3))");
        assert_eq!(args.len(), 3);

        let (sql, _) = render(DatabaseBackend::MySQL, json!({"id": {"$nin": "x"}}));
        assert_eq!(sql, "(id NOT IN (?))");
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let (sql, args) = render(DatabaseBackend::MySQL, json!({"id": {"$in": []}}));
        assert_eq!(sql, "(1 = 0)");
        assert!(args.is_empty());
    }

    #[test]
    fn test_null_comparisons() {
        let (sql, args) = render(DatabaseBackend::MySQL, json!({"deleted_at": null}));
        assert_eq!(sql, "(deleted_at IS NULL)");
        assert!(args.is_empty());

        let (sql, _) = render(DatabaseBackend::MySQL, json!({"deleted_at": {"$ne": null}}));
        assert_eq!(sql, "(deleted_at IS NOT NULL)");
    }

    #[test]
    fn test_contains_per_dialect() {
        let (sql, args) = render(DatabaseBackend::MySQL, json!({"Obj1": {"$contains": {"obj1": "value1"}}}));
        assert_eq!(sql, "json_contains(Obj1,?)");
        assert_eq!(args, vec![SqlValue::from(r#"{"obj1":"value1"}"#)]);

        let (sql, args) = render(DatabaseBackend::Postgres, json!({"Obj1": {"$contains": {"obj1": "value1"}}}));
        assert_eq!(sql, "Obj1 @> $1");
        assert_eq!(args, vec![SqlValue::Json(json!({"obj1": "value1"}))]);
    }

    #[test]
    fn test_contains_unsupported_is_error() {
        let dialect = create_dialect(DatabaseBackend::SqlServer);
        let err = compile(
            &spec(json!({"Obj1": {"$contains": {"a": 1}}})),
            dialect.as_ref(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "E_UNSUPPORTED");
    }

    #[test]
    fn test_regex_marker_recorded() {
        let dialect = create_dialect(DatabaseBackend::MySQL);
        let compiled = compile(&spec(json!({"fieldName": {"$regex": "^a"}})), dialect.as_ref(), false).unwrap();
        assert_eq!(compiled.regex_markers, vec!["fieldName".to_string()]);
    }

    #[test]
    fn test_join_context_column_reference() {
        let dialect = create_dialect(DatabaseBackend::MySQL);
        let compiled = compile(&spec(json!({"t1.col1": "t2.col2"})), dialect.as_ref(), true).unwrap();
        let rendered = compiled.expr.finish(dialect.as_ref()).unwrap();
        assert_eq!(rendered.sql, "(t1.col1 = t2.col2)");
        assert!(rendered.args.is_empty());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let dialect = create_dialect(DatabaseBackend::MySQL);
        let err = compile(&spec(json!({"a": {"$near": 1}})), dialect.as_ref(), false).unwrap_err();
        assert_eq!(err.error_code(), "E_INVALID_PARAMS");
    }

    #[test]
    fn test_empty_filter() {
        let dialect = create_dialect(DatabaseBackend::MySQL);
        let compiled = compile(&FilterSpec::new(), dialect.as_ref(), false).unwrap();
        assert!(compiled.is_empty());
    }
}
