//! Order records and the rows derived from them
//!
//! The store is document-shaped; this module is the typed boundary. Field
//! names match the `orderinfo` collection layout.

use orderdb_core::{Document, Value, ID_FIELD};
use serde::{Deserialize, Serialize, Serializer};

pub const CUST_ID: &str = "cust_id";
pub const CUST_NAME: &str = "cust_name";
pub const STATUS: &str = "status";
pub const PRICE: &str = "price";

/// Output field of the per-customer `$sum`
pub const TOTAL_PRICE: &str = "totalPrice";

/// One purchase line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "cust_id")]
    pub customer_id: i64,
    #[serde(rename = "cust_name")]
    pub customer_name: String,
    pub status: String,
    #[serde(serialize_with = "serialize_amount")]
    pub price: f64,
}

impl OrderRecord {
    pub fn new(customer_id: i64, customer_name: impl Into<String>, status: impl Into<String>, price: f64) -> Self {
        Self {
            customer_id,
            customer_name: customer_name.into(),
            status: status.into(),
            price,
        }
    }

    /// Document form. Whole prices are stored as integers.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(CUST_ID, self.customer_id);
        doc.insert(CUST_NAME, self.customer_name.as_str());
        doc.insert(STATUS, self.status.as_str());
        doc.insert(PRICE, price_value(self.price));
        doc
    }

    pub fn from_document(doc: &Document) -> Result<Self, OrderError> {
        Ok(Self {
            customer_id: int_field(doc, CUST_ID)?,
            customer_name: string_field(doc, CUST_NAME)?,
            status: string_field(doc, STATUS)?,
            price: number_field(doc, PRICE)?,
        })
    }
}

/// Projected row of a status lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(rename = "cust_name")]
    pub customer_name: String,
    #[serde(serialize_with = "serialize_amount")]
    pub price: f64,
}

impl OrderLine {
    pub fn from_document(doc: &Document) -> Result<Self, OrderError> {
        Ok(Self {
            customer_name: string_field(doc, CUST_NAME)?,
            price: number_field(doc, PRICE)?,
        })
    }
}

/// Aggregated spend of one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerTotal {
    #[serde(rename = "_id")]
    pub customer_name: String,
    #[serde(rename = "totalPrice", serialize_with = "serialize_amount")]
    pub total_price: f64,
}

impl CustomerTotal {
    pub fn from_document(doc: &Document) -> Result<Self, OrderError> {
        Ok(Self {
            customer_name: string_field(doc, ID_FIELD)?,
            total_price: number_field(doc, TOTAL_PRICE)?,
        })
    }
}

/// Errors converting store documents into typed rows
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Field '{field}' should be {expected}, found {found}")]
    InvalidField {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Whole amounts as integers, so `300.0` is stored and printed as `300`
fn whole_amount(amount: f64) -> Option<i64> {
    (amount.fract() == 0.0 && amount.abs() < i64::MAX as f64).then_some(amount as i64)
}

fn price_value(price: f64) -> Value {
    whole_amount(price).map_or(Value::Float64(price), Value::from)
}

fn serialize_amount<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match whole_amount(*amount) {
        Some(whole) => serializer.serialize_i64(whole),
        None => serializer.serialize_f64(*amount),
    }
}

fn field<'a>(doc: &'a Document, name: &str) -> Result<&'a Value, OrderError> {
    doc.get(name).ok_or_else(|| OrderError::MissingField(name.to_string()))
}

fn invalid(name: &str, expected: &'static str, found: &Value) -> OrderError {
    OrderError::InvalidField {
        field: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

pub(crate) fn expect_string(name: &str, value: &Value) -> Result<String, OrderError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(name, "a string", value))
}

fn string_field(doc: &Document, name: &str) -> Result<String, OrderError> {
    expect_string(name, field(doc, name)?)
}

fn int_field(doc: &Document, name: &str) -> Result<i64, OrderError> {
    let value = field(doc, name)?;
    value.as_i64().ok_or_else(|| invalid(name, "an integer", value))
}

fn number_field(doc: &Document, name: &str) -> Result<f64, OrderError> {
    let value = field(doc, name)?;
    value.as_f64().ok_or_else(|| invalid(name, "a number", value))
}
