//! Response aggregation
//!
//! Joins the items of independent and dependent records on a correlation key
//! and builds the legacy output fields from each joined pair.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::{
    config::{Aggregation, Combine, FieldRule},
    core::{accessor::read_item, document::Document, error::OrchestrationResult},
};

use super::executor::ResponseRecord;

/// One joined entity of the legacy response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyEntry {
    /// Correlation key value shared by both sides
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

/// Final legacy-shaped output of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedLegacyResponse {
    pub correlation_key: String,
    pub entries: Vec<LegacyEntry>,
}

impl AggregatedLegacyResponse {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Items of one side, each with its rendered correlation key
struct KeyedItem<'a> {
    key: String,
    item: &'a Document,
}

/// Joins response records into the legacy output
pub struct ResponseAggregator<'a> {
    rules: &'a Aggregation,
}

impl<'a> ResponseAggregator<'a> {
    pub fn new(rules: &'a Aggregation) -> Self {
        Self { rules }
    }

    /// Aggregate `records`. Items without a partner on the other side are dropped.
    ///
    /// Keys are compared in their rendered text form, so `2` and `"2"` match.
    pub fn aggregate(&self, records: &[ResponseRecord]) -> OrchestrationResult<AggregatedLegacyResponse> {
        let (dependent, independent): (Vec<&ResponseRecord>, Vec<&ResponseRecord>) =
            records.iter().partition(|record| record.target.is_dependent());

        let left = self.keyed_items(&independent);
        let right = self.keyed_items(&dependent);

        let mut entries = Vec::new();
        let mut matched_right = vec![false; right.len()];
        let mut unmatched_left = 0usize;

        for l in &left {
            let mut matched = false;
            for (i, r) in right.iter().enumerate() {
                if l.key != r.key {
                    continue;
                }
                matched = true;
                matched_right[i] = true;
                entries.push(self.join(l, r)?);
            }
            if !matched {
                unmatched_left += 1;
            }
        }

        let unmatched_right = matched_right.iter().filter(|m| !**m).count();
        if unmatched_left > 0 || unmatched_right > 0 {
            debug!(
                "Dropped {unmatched_left} independent and {unmatched_right} dependent items without a {} match",
                self.rules.correlation_key
            );
        }

        Ok(AggregatedLegacyResponse {
            correlation_key: self.rules.correlation_key.clone(),
            entries,
        })
    }

    fn keyed_items<'r>(&self, records: &[&'r ResponseRecord]) -> Vec<KeyedItem<'r>> {
        let mut keyed = Vec::new();
        for &record in records {
            for item in record.document.items(&record.target.shape.items) {
                // items without a readable key can never match
                match read_item(item, &self.rules.correlation_key) {
                    Ok(key) => keyed.push(KeyedItem { key, item }),
                    Err(err) => debug!("Skipping item from {}: {err}", record.target.url),
                }
            }
        }
        keyed
    }

    fn join(&self, left: &KeyedItem<'_>, right: &KeyedItem<'_>) -> OrchestrationResult<LegacyEntry> {
        let mut fields = BTreeMap::new();
        for rule in &self.rules.fields {
            fields.insert(rule.output.clone(), combine(rule, left.item, right.item)?);
        }

        Ok(LegacyEntry {
            key: left.key.clone(),
            fields,
        })
    }
}

fn combine(rule: &FieldRule, left: &Document, right: &Document) -> OrchestrationResult<String> {
    match rule.combine {
        Combine::Concat => {
            let a = read_item(left, &rule.independent)?;
            let b = read_item(right, &rule.dependent)?;
            Ok(format!("{a}{}{b}", rule.separator))
        }
        Combine::Independent => read_item(left, &rule.independent),
        Combine::Dependent => read_item(right, &rule.dependent),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::core::{
        error::OrchestrationError,
        mapping::{Dependency, ResponseShape, TargetDescriptor},
    };

    use super::*;

    fn record(dependent: bool, value: serde_json::Value) -> ResponseRecord {
        let target = TargetDescriptor {
            url: if dependent { "http://b/items" } else { "http://a/items" }.to_string(),
            dependency: dependent.then(|| Dependency {
                depends_on: "http://a/items".to_string(),
                field: "commonId".to_string(),
                param: "dependency".to_string(),
            }),
            shape: Arc::new(ResponseShape::default()),
            max_concurrency: 1,
        };
        ResponseRecord {
            target: Arc::new(target),
            document: Document::from(value),
        }
    }

    fn rules(combine: Combine) -> Aggregation {
        Aggregation {
            correlation_key: "commonId".to_string(),
            fields: vec![FieldRule {
                output: "property1".to_string(),
                independent: "a".to_string(),
                dependent: "b".to_string(),
                combine,
                separator: " ".to_string(),
            }],
        }
    }

    #[test]
    fn test_join_concatenates() {
        let records = vec![
            record(false, json!({"items": [{"commonId": "1", "a": "foo"}]})),
            record(true, json!({"items": [{"commonId": "1", "b": "bar"}]})),
        ];
        let rules = rules(Combine::Concat);
        let response = ResponseAggregator::new(&rules).aggregate(&records).unwrap();

        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].key, "1");
        assert_eq!(response.entries[0].fields.len(), 1);
        assert_eq!(response.entries[0].fields["property1"], "foo bar");
    }

    #[test]
    fn test_no_key_overlap_is_empty() {
        let records = vec![
            record(false, json!({"items": [{"commonId": "1", "a": "foo"}]})),
            record(true, json!({"items": [{"commonId": "2", "b": "bar"}]})),
        ];
        let rules = rules(Combine::Concat);
        let response = ResponseAggregator::new(&rules).aggregate(&records).unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn test_only_matching_items_are_kept() {
        let records = vec![
            record(
                false,
                json!({"items": [
                    {"commonId": "1", "a": "foo"},
                    {"commonId": "2", "a": "baz"},
                    {"a": "no key"}
                ]}),
            ),
            record(
                true,
                json!({"items": [{"commonId": 2, "b": "qux"}, {"commonId": "3", "b": "bar"}]}),
            ),
        ];
        let rules = rules(Combine::Concat);
        let response = ResponseAggregator::new(&rules).aggregate(&records).unwrap();

        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].key, "2");
        assert_eq!(response.entries[0].fields["property1"], "baz qux");
    }

    #[test]
    fn test_single_side_strategies() {
        let records = vec![
            record(false, json!([{"commonId": "1", "a": "foo"}])),
            record(true, json!([{"commonId": "1", "b": "bar"}])),
        ];

        let left = rules(Combine::Independent);
        let response = ResponseAggregator::new(&left).aggregate(&records).unwrap();
        assert_eq!(response.entries[0].fields["property1"], "foo");

        let right = rules(Combine::Dependent);
        let response = ResponseAggregator::new(&right).aggregate(&records).unwrap();
        assert_eq!(response.entries[0].fields["property1"], "bar");
    }

    #[test]
    fn test_missing_source_field_fails() {
        let records = vec![
            record(false, json!({"items": [{"commonId": "1"}]})),
            record(true, json!({"items": [{"commonId": "1", "b": "bar"}]})),
        ];
        let rules = rules(Combine::Concat);
        let err = ResponseAggregator::new(&rules).aggregate(&records).unwrap_err();
        assert!(matches!(err, OrchestrationError::FieldNotFound { .. }));
    }

    #[test]
    fn test_serialized_shape() {
        let records = vec![
            record(false, json!({"items": [{"commonId": "1", "a": "foo"}]})),
            record(true, json!({"items": [{"commonId": "1", "b": "bar"}]})),
        ];
        let rules = rules(Combine::Concat);
        let response = ResponseAggregator::new(&rules).aggregate(&records).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "correlation_key": "commonId",
                "entries": [{"key": "1", "fields": {"property1": "foo bar"}}]
            })
        );
    }
}
