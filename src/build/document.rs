//! JSON node dump format.
//!
//! ```json
//! {
//!   "id": "f3a1...",
//!   "primaryType": "demo:news",
//!   "mixinTypes": ["demo:taggable"],
//!   "path": "/content/news/item",
//!   "position": [0, 2, 5],
//!   "revision": 12,
//!   "properties": [
//!     {"name": "demo:date", "type": "DATE", "value": "2024-03-01T00:00:00Z"},
//!     {"name": "demo:tags", "type": "STRING", "values": ["a", "b"]}
//!   ]
//! }
//! ```
//!
//! `value` marks a single-valued property, `values` a multi-valued one.
//! DATE accepts RFC 3339 strings or epoch milliseconds. Numbers may also be
//! given as strings.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IndexError;
use crate::types::{ContentNode, NodeId, Property, PropertyType, PropertyValue};

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    pub primary_type: String,
    #[serde(default)]
    pub mixin_types: Vec<String>,
    pub path: String,
    #[serde(default)]
    pub position: Vec<u32>,
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub properties: Vec<RawProperty>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RawProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub values: Option<Vec<Value>>,
}

/// A dump file holds one node or an array of nodes.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RawDump {
    Many(Vec<RawNode>),
    One(Box<RawNode>),
}

impl RawDump {
    pub fn into_nodes(self) -> Vec<RawNode> {
        match self {
            RawDump::Many(nodes) => nodes,
            RawDump::One(node) => vec![*node],
        }
    }
}

impl RawNode {
    /// Convert to a typed content node. Fails on the first bad property.
    pub fn into_content_node(self) -> Result<ContentNode, IndexError> {
        let id = NodeId::new(self.id);
        let properties = self
            .properties
            .into_iter()
            .map(|p| p.into_property(&id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ContentNode {
            id,
            primary_type: self.primary_type,
            mixin_types: self.mixin_types,
            path: self.path,
            position: self.position,
            revision: self.revision,
            properties,
        })
    }
}

impl RawProperty {
    fn into_property(self, node: &NodeId) -> Result<Property, IndexError> {
        let kind = PropertyType::from_name(&self.type_name).ok_or_else(|| {
            IndexError::UnknownPropertyType {
                node: node.clone(),
                property: self.name.clone(),
                type_name: self.type_name.clone(),
            }
        })?;
        let (multiple, raw) = match (self.values, self.value) {
            (Some(values), _) => (true, values),
            (None, Some(value)) => (false, vec![value]),
            (None, None) => (false, Vec::new()),
        };
        let values = raw
            .into_iter()
            .map(|v| {
                convert(kind, v).map_err(|reason| IndexError::InvalidValue {
                    node: node.clone(),
                    property: self.name.clone(),
                    kind,
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Property {
            name: self.name,
            multiple,
            values,
        })
    }
}

fn convert(kind: PropertyType, value: Value) -> Result<PropertyValue, String> {
    let converted = match kind {
        PropertyType::Boolean => PropertyValue::Boolean(match &value {
            Value::Bool(b) => *b,
            Value::String(s) if s.eq_ignore_ascii_case("true") => true,
            Value::String(s) if s.eq_ignore_ascii_case("false") => false,
            _ => return Err(format!("expected a boolean, got {}", value)),
        }),
        PropertyType::Long => PropertyValue::Long(match &value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| format!("{} is not a 64-bit integer", n))?,
            Value::String(s) => s.trim().parse().map_err(|e| format!("'{}': {}", s, e))?,
            _ => return Err(format!("expected an integer, got {}", value)),
        }),
        PropertyType::Double => PropertyValue::Double(match &value {
            Value::Number(n) => n.as_f64().ok_or_else(|| format!("{} is not a double", n))?,
            Value::String(s) => s.trim().parse().map_err(|e| format!("'{}': {}", s, e))?,
            _ => return Err(format!("expected a number, got {}", value)),
        }),
        PropertyType::Date => PropertyValue::Date(parse_date(&value)?),
        PropertyType::Decimal => PropertyValue::Decimal(match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            other => return Err(format!("expected a decimal, got {}", other)),
        }),
        PropertyType::Binary => PropertyValue::Binary(text(value)?.into_bytes()),
        PropertyType::String => PropertyValue::String(text(value)?),
        PropertyType::Reference => PropertyValue::Reference(text(value)?),
        PropertyType::Path => PropertyValue::Path(text(value)?),
        PropertyType::Name => PropertyValue::Name(text(value)?),
        PropertyType::Uri => PropertyValue::Uri(text(value)?),
        PropertyType::WeakReference => PropertyValue::WeakReference(text(value)?),
    };
    Ok(converted)
}

fn text(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(format!("expected a string, got {}", other)),
    }
}

fn parse_date(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| format!("'{}': {}", s, e)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| format!("{} is not a valid epoch millisecond value", n)),
        other => Err(format!("expected a date, got {}", other)),
    }
}
