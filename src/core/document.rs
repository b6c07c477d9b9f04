//! Self-describing response document model
//!
//! Backend responses are decoded into [`Document`] so the orchestration core
//! can read fields whose shape is only known from configuration.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Leaf value of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// A decoded response document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    Scalar(Scalar),
    Record(BTreeMap<String, Document>),
    List(Vec<Document>),
}

impl Document {
    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Document::Scalar(Scalar::Null) => "null",
            Document::Scalar(_) => "scalar",
            Document::Record(_) => "record",
            Document::List(_) => "list",
        }
    }

    /// Look up a direct child: a key for records, an index for lists
    pub fn child(&self, segment: &str) -> Option<&Document> {
        match self {
            Document::Record(map) => map.get(segment),
            Document::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Document::Scalar(_) => None,
        }
    }

    /// Render a scalar as text. Null, records and lists have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Document::Scalar(Scalar::Text(s)) => Some(s.clone()),
            Document::Scalar(Scalar::Number(n)) => Some(n.to_string()),
            Document::Scalar(Scalar::Bool(b)) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The item collection of this document.
    ///
    /// A list is its own collection, a record carrying `items_field` as a list
    /// yields that list, and any other record is a collection of one.
    pub fn items<'a>(&'a self, items_field: &str) -> &'a [Document] {
        match self {
            Document::List(items) => items,
            Document::Record(map) => match map.get(items_field) {
                Some(Document::List(items)) => items,
                _ => std::slice::from_ref(self),
            },
            Document::Scalar(_) => &[],
        }
    }
}

impl From<JsonValue> for Document {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Document::Scalar(Scalar::Null),
            JsonValue::Bool(b) => Document::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => Document::Scalar(Scalar::Number(n)),
            JsonValue::String(s) => Document::Scalar(Scalar::Text(s)),
            JsonValue::Array(items) => Document::List(items.into_iter().map(Into::into).collect()),
            JsonValue::Object(map) => {
                Document::Record(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
