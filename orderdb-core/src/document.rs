//! Document and Value types
//!
//! A [`Document`] is an ordered map of field names to [`Value`]s plus an
//! optional `_id`. Stored documents always carry a [`DocumentId`]; derived
//! documents (projections, `$group` output) may not, in which case `_id` can
//! live in the field map as an ordinary value.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Maximum document size in bytes (16 MB)
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum nesting depth for documents (16 levels)
pub const MAX_NESTING_DEPTH: usize = 16;

/// Name of the identity field
pub const ID_FIELD: &str = "_id";

/// Unique identifier for stored documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new random document ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse the hyphenated string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Field value. Serializes as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is a number (int or float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int32(_) | Value::Int64(_) | Value::Float64(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (integers only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 (any numeric variant)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(i) => Some(*i as f64),
            Value::Int64(i) => Some(*i as f64),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int",
            Value::Int64(_) => "long",
            Value::Float64(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Approximate in-memory size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Value::Null | Value::Bool(_) => 1,
            Value::Int32(_) => 4,
            Value::Int64(_) | Value::Float64(_) => 8,
            Value::String(s) => s.len(),
            Value::Array(arr) => arr.iter().map(Value::size_bytes).sum::<usize>() + 8,
            Value::Object(obj) => {
                obj.iter().map(|(k, v)| k.len() + v.size_bytes()).sum::<usize>() + 8
            }
        }
    }

    pub fn nesting_depth(&self) -> usize {
        match self {
            Value::Array(arr) => 1 + arr.iter().map(Value::nesting_depth).max().unwrap_or(0),
            Value::Object(obj) => 1 + obj.values().map(Value::nesting_depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map(Value::Int32).unwrap_or(Value::Int64(i))
                } else {
                    // u64 beyond i64::MAX falls through to f64 as well
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            JsonValue::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Int32(i) => JsonValue::from(i),
            Value::Int64(i) => JsonValue::from(i),
            // Non-finite floats have no JSON form
            Value::Float64(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s),
            Value::Array(arr) => JsonValue::Array(arr.into_iter().map(JsonValue::from).collect()),
            Value::Object(obj) => {
                JsonValue::Object(obj.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(obj: BTreeMap<String, Value>) -> Self {
        Value::Object(obj)
    }
}

/// A document: optional identity plus ordered fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "JsonValue", into = "JsonValue")]
pub struct Document {
    /// Identity assigned by the collection on insert
    pub id: Option<DocumentId>,

    /// Fields in key order
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document without an identity
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: DocumentId) -> Self {
        Self {
            id: Some(id),
            fields: BTreeMap::new(),
        }
    }

    pub fn from_fields(fields: BTreeMap<String, Value>) -> Self {
        Self { id: None, fields }
    }

    /// Insert a field, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Get field by dotted path (e.g., "customer.address.city").
    /// Numeric segments index into arrays.
    pub fn get_by_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;

        for part in parts {
            current = match current {
                Value::Object(obj) => obj.get(part)?,
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Field lookup as queries see it: `_id` resolves to the identity, as a
    /// string, unless the field map carries its own `_id`.
    pub fn lookup(&self, path: &str) -> Option<Cow<'_, Value>> {
        if path == ID_FIELD && !self.fields.contains_key(ID_FIELD) {
            return self.id.map(|id| Cow::Owned(Value::String(id.to_string())));
        }
        self.get_by_path(path).map(Cow::Borrowed)
    }

    /// Approximate document size in bytes
    pub fn size_bytes(&self) -> usize {
        self.fields.iter().map(|(k, v)| k.len() + v.size_bytes()).sum()
    }

    /// Validate document constraints
    pub fn validate(&self) -> Result<(), DocumentError> {
        let size = self.size_bytes();
        if size > MAX_DOCUMENT_SIZE {
            return Err(DocumentError::DocumentTooLarge {
                size,
                max: MAX_DOCUMENT_SIZE,
            });
        }

        let depth = self.fields.values().map(Value::nesting_depth).max().unwrap_or(0);
        if depth > MAX_NESTING_DEPTH {
            return Err(DocumentError::NestingTooDeep {
                depth,
                max: MAX_NESTING_DEPTH,
            });
        }

        if let Some(key) = self.fields.keys().find(|k| k.starts_with('$')) {
            return Err(DocumentError::InvalidFieldName(key.clone()));
        }

        Ok(())
    }

    /// Build a document from a JSON object. A string `_id` holding a UUID
    /// becomes the identity; any other `_id` stays in the field map.
    pub fn from_json_value(json: JsonValue) -> Result<Self, DocumentError> {
        let obj = match json {
            JsonValue::Object(obj) => obj,
            other => return Err(DocumentError::NotAnObject(json_type_name(&other))),
        };

        let mut doc = Document::new();
        for (key, value) in obj {
            if key == ID_FIELD {
                if let Some(id) = value.as_str().and_then(DocumentId::parse) {
                    doc.id = Some(id);
                    continue;
                }
            }
            doc.fields.insert(key, Value::from(value));
        }
        Ok(doc)
    }

    pub fn to_json_value(&self) -> JsonValue {
        JsonValue::from(self.clone())
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|e| DocumentError::SerializationError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DocumentError::SerializationError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let value: JsonValue = serde_json::from_str(json)
            .map_err(|e| DocumentError::DeserializationError(e.to_string()))?;
        Self::from_json_value(value)
    }
}

impl TryFrom<JsonValue> for Document {
    type Error = DocumentError;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        Document::from_json_value(json)
    }
}

impl From<Document> for JsonValue {
    fn from(doc: Document) -> Self {
        let mut obj = serde_json::Map::new();
        if let Some(id) = doc.id {
            obj.insert(ID_FIELD.to_string(), JsonValue::String(id.to_string()));
        }
        for (key, value) in doc.fields {
            obj.insert(key, JsonValue::from(value));
        }
        JsonValue::Object(obj)
    }
}

fn json_type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Document-related errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document too large: {size} bytes (max: {max})")]
    DocumentTooLarge { size: usize, max: usize },

    #[error("Nesting too deep: {depth} levels (max: {max})")]
    NestingTooDeep { depth: usize, max: usize },

    #[error("Invalid field name: {0}")]
    InvalidFieldName(String),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id_creation() {
        let id1 = DocumentId::new();
        let id2 = DocumentId::new();
        assert_ne!(id1, id2);
        assert_eq!(DocumentId::parse(&id1.to_string()), Some(id1));
    }

    #[test]
    fn test_value_from_json_numbers() {
        assert_eq!(Value::from(json!(250)), Value::Int32(250));
        assert_eq!(Value::from(json!(5_000_000_000i64)), Value::Int64(5_000_000_000));
        assert_eq!(Value::from(json!(12.5)), Value::Float64(12.5));
        assert_eq!(Value::from(json!(-3)), Value::Int32(-3));
    }

    #[test]
    fn test_value_accessors() {
        assert!(Value::Null.is_null());
        assert!(Value::Int32(42).is_number());
        assert_eq!(Value::Int32(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float64(1.5).as_i64(), None);
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }

    #[test]
    fn test_document_basic_operations() {
        let mut doc = Document::new();
        doc.insert("cust_name", "abc");
        doc.insert("price", 250i32);

        assert_eq!(doc.get("cust_name").unwrap().as_str(), Some("abc"));
        assert!(doc.contains_key("price"));
        assert!(doc.id.is_none());

        doc.remove("price");
        assert!(!doc.contains_key("price"));
    }

    #[test]
    fn test_document_path_navigation() {
        let doc = Document::from_json_value(json!({
            "customer": { "name": "abc", "tags": ["vip", "new"] }
        }))
        .unwrap();

        assert_eq!(doc.get_by_path("customer.name").unwrap().as_str(), Some("abc"));
        assert_eq!(doc.get_by_path("customer.tags.1").unwrap().as_str(), Some("new"));
        assert!(doc.get_by_path("customer.email").is_none());
        assert!(doc.get_by_path("customer.name.first").is_none());
    }

    #[test]
    fn test_lookup_resolves_identity() {
        let id = DocumentId::new();
        let mut doc = Document::with_id(id);
        doc.insert("status", "A");

        assert_eq!(doc.lookup(ID_FIELD).as_deref(), Some(&Value::String(id.to_string())));
        assert_eq!(doc.lookup("status").as_deref(), Some(&Value::from("A")));
        assert!(Document::new().lookup(ID_FIELD).is_none());

        let mut grouped = Document::new();
        grouped.insert(ID_FIELD, "pqr");
        assert_eq!(grouped.lookup(ID_FIELD).as_deref(), Some(&Value::from("pqr")));
    }

    #[test]
    fn test_json_identity_handling() {
        let id = DocumentId::new();
        let doc = Document::from_json_value(json!({ "_id": id.to_string(), "status": "A" })).unwrap();
        assert_eq!(doc.id, Some(id));
        assert!(!doc.contains_key("_id"));

        // A non-UUID _id is an ordinary field
        let grouped = Document::from_json_value(json!({ "_id": "pqr", "totalPrice": 300 })).unwrap();
        assert!(grouped.id.is_none());
        assert_eq!(grouped.get("_id").unwrap().as_str(), Some("pqr"));
    }

    #[test]
    fn test_json_round_trip_through_serde() {
        let mut doc = Document::with_id(DocumentId::new());
        doc.insert("cust_name", "xyz");
        doc.insert("price", 450.0);

        let json = doc.to_json().unwrap();
        let back = Document::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = Document::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject("array")));
    }

    #[test]
    fn test_document_validation() {
        let mut doc = Document::new();
        doc.insert("status", "A");
        assert!(doc.validate().is_ok());

        doc.insert("$bad", 1i32);
        assert!(matches!(doc.validate(), Err(DocumentError::InvalidFieldName(_))));

        let mut deep = Value::Null;
        for _ in 0..=MAX_NESTING_DEPTH {
            deep = Value::Array(vec![deep]);
        }
        let mut doc = Document::new();
        doc.insert("deep", deep);
        assert!(matches!(doc.validate(), Err(DocumentError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_value_nesting_depth() {
        assert_eq!(Value::Int32(42).nesting_depth(), 0);
        assert_eq!(Value::Array(vec![Value::Int32(1)]).nesting_depth(), 1);
        assert_eq!(
            Value::Array(vec![Value::Array(vec![Value::Int32(1)])]).nesting_depth(),
            2
        );
    }
}
