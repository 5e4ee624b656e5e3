//! Request and response shapes consumed by the CRUD layer
//!
//! These mirror the JSON documents sent by the HTTP/RPC front end, so
//! field names are camelCase on the wire.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};

/// Mongo-style filter: field (or `$or`) to literal or operator object
pub type FilterSpec = Map<String, JsonValue>;

/// A result row keyed by column name
pub type Row = Map<String, JsonValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadOperation {
    One,
    All,
    Count,
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateOperation {
    One,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOperation {
    One,
    All,
    Upsert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    #[default]
    #[serde(alias = "")]
    Left,
    Right,
    Inner,
    Outer,
}

/// One joined table, possibly with its own nested joins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOption {
    pub table: String,
    #[serde(default)]
    pub on: FilterSpec,
    #[serde(default, rename = "type")]
    pub join_type: JoinType,
    /// `One` nests a single object, anything else nests an array
    #[serde(default)]
    pub op: Option<ReadOperation>,
    #[serde(default, rename = "as")]
    pub alias: Option<String>,
    #[serde(default)]
    pub join: Vec<JoinOption>,
}

impl JoinOption {
    pub fn new(table: impl Into<String>, on: FilterSpec) -> Self {
        Self {
            table: table.into(),
            on,
            ..Default::default()
        }
    }

    /// Key the joined rows are nested under
    pub fn nested_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOptions {
    /// Projection as a presence set; accepts `["a","b"]` or `{"a":1,"b":1}`
    #[serde(default, deserialize_with = "deserialize_selection")]
    pub select: BTreeSet<String>,
    /// Field names, `-` prefix for descending
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub distinct: Option<String>,
    #[serde(default)]
    pub join: Vec<JoinOption>,
    /// Stamp `_dbFetchTs` on every returned row
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    #[serde(default)]
    pub find: FilterSpec,
    #[serde(default)]
    pub match_where: Vec<FilterSpec>,
    pub operation: ReadOperation,
    #[serde(default)]
    pub options: ReadOptions,
}

impl ReadRequest {
    pub fn new(operation: ReadOperation) -> Self {
        Self {
            find: FilterSpec::new(),
            match_where: Vec::new(),
            operation,
            options: ReadOptions::default(),
        }
    }

    pub fn find(mut self, find: FilterSpec) -> Self {
        self.find = find;
        self
    }

    pub fn options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// A single row object, or an array of row objects for `All`
    pub document: JsonValue,
    pub operation: CreateOperation,
}

impl CreateRequest {
    pub fn one(document: JsonValue) -> Self {
        Self {
            document,
            operation: CreateOperation::One,
        }
    }

    pub fn all(documents: JsonValue) -> Self {
        Self {
            document: documents,
            operation: CreateOperation::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub find: FilterSpec,
    pub operation: UpdateOperation,
    /// Operator key (`$set`, `$inc`, ...) to a field/operand object
    pub update: Map<String, JsonValue>,
}

impl UpdateRequest {
    pub fn new(operation: UpdateOperation, find: FilterSpec, update: Map<String, JsonValue>) -> Self {
        Self {
            find,
            operation,
            update,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub find: FilterSpec,
}

/// One entry of a transactional batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchRequest {
    Create { col: String, request: CreateRequest },
    Update { col: String, request: UpdateRequest },
    Delete { col: String, request: DeleteRequest },
}

/// Payload returned by a read
#[derive(Debug, Clone, PartialEq)]
pub enum ReadData {
    Row(Row),
    Rows(Vec<JsonValue>),
    Count(i64),
}

impl ReadData {
    pub fn into_json(self) -> JsonValue {
        match self {
            ReadData::Row(row) => JsonValue::Object(row),
            ReadData::Rows(rows) => JsonValue::Array(rows),
            ReadData::Count(count) => JsonValue::from(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub count: i64,
    pub data: ReadData,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionRepr {
    Keys(Vec<String>),
    Flags(BTreeMap<String, JsonValue>),
}

fn deserialize_selection<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<SelectionRepr>::deserialize(deserializer)?;
    Ok(match repr {
        None => BTreeSet::new(),
        Some(SelectionRepr::Keys(keys)) => keys.into_iter().collect(),
        Some(SelectionRepr::Flags(flags)) => flags.into_keys().collect(),
    })
}
