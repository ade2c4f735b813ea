//! Product catalog records.
//!
//! Product lists arrive from untrusted places (browser-side storage, request
//! bodies, a JSON file edited by hand), so they are filtered entry by entry
//! rather than rejected wholesale.
//!
//! Only `id` and `name` are checked. Every other field is carried as raw JSON
//! so that a load/save cycle returns exactly what another client wrote,
//! including its value types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Errors for product list input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// The input is not a JSON array.
    #[error("products must be a JSON array")]
    NotAnArray,
}

/// Product identifier as written by the client.
///
/// Admin screens mint millisecond timestamps, while imported catalogs often
/// use SKU strings. Both are kept verbatim: `"42"` and `42` are different ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(Number),
    Text(String),
}

impl ProductId {
    /// Numeric id.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self::Number(id.into())
    }

    /// The id as an integer, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::Text(_) => None,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

/// A product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Everything except `id`, as written.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Product {
    /// Create a product with only an id and a name.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_owned(), Value::String(name.into()));
        Self { id, fields }
    }

    /// Convert one untyped entry into a product, or `None` if it is malformed.
    ///
    /// An entry is malformed when it is not an object, has no usable `id`
    /// (missing, null, blank, or not a number or string), or has a `name`
    /// that is neither a string nor null.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let id = ProductId::from_json(&fields.remove("id")?)?;
        if !matches!(fields.get("name"), None | Some(Value::Null | Value::String(_))) {
            return None;
        }

        Some(Self { id, fields })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Price as a decimal, whether it was written as a number or a numeric
    /// string. `None` when absent or unparsable.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        match self.fields.get("price")? {
            Value::Number(n) => n.to_string().parse().ok(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Filter a list of untyped entries down to the valid products.
    #[must_use]
    pub fn filter_valid(values: Vec<Value>) -> Vec<Self> {
        values.into_iter().filter_map(Self::from_value).collect()
    }

    /// Filter an untyped JSON document that must be an array.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotAnArray`] if `value` is not an array.
    pub fn filter_valid_array(value: Value) -> Result<Vec<Self>, ProductError> {
        match value {
            Value::Array(values) => Ok(Self::filter_valid(values)),
            _ => Err(ProductError::NotAnArray),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_drops_malformed_entries() {
        let input = json!([
            {"id": 1, "name": "Mug", "price": 12.5},
            {"name": "no id"},
            {"id": null, "name": "null id"},
            {"id": 2, "name": 42},
            {"id": 3, "name": null},
            {"id": 4},
            "not an object",
            {"id": "5", "name": "string id"},
            {"id": "  ", "name": "blank id"},
            {"id": true, "name": "bool id"}
        ]);

        let products = Product::filter_valid_array(input).unwrap();
        let ids: Vec<String> = products.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "3", "4", "5"]);
        assert_eq!(products[0].price(), Some(Decimal::new(125, 1)));
        assert_eq!(products[3].id, ProductId::from("5"));
    }

    #[test]
    fn test_odd_typed_fields_are_kept() {
        let input = json!([
            {"id": 1, "name": "Mug", "stock": "3"},
            {"id": 2, "name": "Tee", "price": "$12.99"},
            {"id": 3, "name": "Cap", "description": 42},
            {"id": "sku-4", "name": "Bag"},
            {"id": 5, "name": "Pen", "price": 12.5}
        ]);

        let products = Product::filter_valid_array(input.clone()).unwrap();
        assert_eq!(products.len(), 5);
        assert_eq!(products[1].price(), None);
        assert_eq!(products[3].id, ProductId::from("sku-4"));
        assert_eq!(serde_json::to_value(&products).unwrap(), input);
    }

    #[test]
    fn test_numeric_price_stays_a_number() {
        let product = Product::from_value(json!({"id": 5, "name": "Pen", "price": 12.5})).unwrap();
        let raw = serde_json::to_string(&product).unwrap();
        assert_eq!(raw, r#"{"id":5,"name":"Pen","price":12.5}"#);
    }

    #[test]
    fn test_filter_requires_array() {
        assert_eq!(
            Product::filter_valid_array(json!({"id": 1})),
            Err(ProductError::NotAnArray)
        );
    }

    #[test]
    fn test_product_id_holds_millisecond_timestamps() {
        let id: ProductId = serde_json::from_str("1717171717171").unwrap();
        assert_eq!(id.as_i64(), Some(1_717_171_717_171));
        assert_eq!(serde_json::to_string(&id).unwrap(), "1717171717171");
    }

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let product = Product::from_value(json!({
            "id": 7,
            "name": "Lamp",
            "colorOptions": ["red", "blue"]
        }))
        .unwrap();
        assert_eq!(product.fields["colorOptions"], json!(["red", "blue"]));

        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["colorOptions"], json!(["red", "blue"]));
        assert_eq!(Product::from_value(back).unwrap(), product);
    }
}
