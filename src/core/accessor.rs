//! Dynamic field access over decoded documents

use super::{
    document::Document,
    error::{OrchestrationError, OrchestrationResult},
};

/// Name of the item collection field when a shape does not configure one
pub const DEFAULT_ITEMS_FIELD: &str = "items";

/// Reads named fields from documents whose shape is known only at configuration time.
#[derive(Debug, Clone)]
pub struct FieldAccessor<'a> {
    items_field: &'a str,
}

impl Default for FieldAccessor<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_FIELD)
    }
}

impl<'a> FieldAccessor<'a> {
    pub fn new(items_field: &'a str) -> Self {
        Self { items_field }
    }

    /// Read `field_path` from the first item of `document`.
    pub fn read(&self, document: &Document, field_path: &str) -> OrchestrationResult<String> {
        let first = document
            .items(self.items_field)
            .first()
            .ok_or_else(|| OrchestrationError::FieldNotFound {
                field: field_path.to_string(),
                detail: "item collection is empty".to_string(),
            })?;
        read_item(first, field_path)
    }
}

/// Read a dot-separated `field_path` from a single item.
pub fn read_item(item: &Document, field_path: &str) -> OrchestrationResult<String> {
    let mut current = item;
    for segment in field_path.split('.') {
        current = current
            .child(segment)
            .ok_or_else(|| OrchestrationError::FieldNotFound {
                field: field_path.to_string(),
                detail: format!("no '{segment}' in {}", current.type_name()),
            })?;
    }

    current
        .as_text()
        .ok_or_else(|| OrchestrationError::TypeMismatch {
            field: field_path.to_string(),
            found: current.type_name(),
        })
}

/// Read `field_path` using the default item collection name.
pub fn read(document: &Document, field_path: &str) -> OrchestrationResult<String> {
    FieldAccessor::default().read(document, field_path)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_read_first_item() {
        let doc = Document::from(json!({"items": [{"name": "x"}, {"name": "y"}]}));
        assert_eq!(read(&doc, "name").unwrap(), "x");
    }

    #[test]
    fn test_read_empty_collection() {
        let doc = Document::from(json!({"items": []}));
        let err = read(&doc, "name").unwrap_err();
        assert_eq!(err.kind(), "FieldNotFound");
    }

    #[test]
    fn test_read_missing_field() {
        let doc = Document::from(json!({"items": [{"other": "x"}]}));
        assert!(matches!(
            read(&doc, "name"),
            Err(OrchestrationError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_read_type_mismatch() {
        let doc = Document::from(json!({"items": [{"name": {"first": "x"}, "gone": null}]}));
        assert!(matches!(
            read(&doc, "name"),
            Err(OrchestrationError::TypeMismatch { found: "record", .. })
        ));
        assert!(matches!(
            read(&doc, "gone"),
            Err(OrchestrationError::TypeMismatch { found: "null", .. })
        ));
    }

    #[test]
    fn test_read_nested_path_and_numbers() {
        let doc = Document::from(json!({"items": [{"customer": {"id": 17, "tags": ["a", "b"]}}]}));
        assert_eq!(read(&doc, "customer.id").unwrap(), "17");
        assert_eq!(read(&doc, "customer.tags.1").unwrap(), "b");
    }

    #[test]
    fn test_custom_items_field() {
        let doc = Document::from(json!({"results": [{"name": "x"}]}));
        assert_eq!(FieldAccessor::new("results").read(&doc, "name").unwrap(), "x");
        // a record without the configured collection is read as a single item
        assert!(read(&doc, "name").is_err());
    }
}
