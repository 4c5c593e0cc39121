// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Selector strings pushed down to the Kubernetes API
//!
//! Label selectors are rendered from the controller's own selector so a pod
//! list can be narrowed server-side. Field selectors only support `=` and `!=`
//! and are used to narrow event lists to one involved object or to the
//! events that are not routine.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

/// Represents a field selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelectorOperator {
    /// Equals operator (=)
    Equals,
    /// Not equals operator (!=)
    NotEquals,
}

/// One `path op value` term of a field selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    /// Field path in Kubernetes notation (e.g., "involvedObject.name")
    pub path: String,
    pub operator: FieldSelectorOperator,
    pub value: String,
}

impl FieldSelector {
    pub fn equals(path: &str, value: &str) -> Self {
        Self {
            path: path.to_string(),
            operator: FieldSelectorOperator::Equals,
            value: value.to_string(),
        }
    }

    pub fn not_equals(path: &str, value: &str) -> Self {
        Self {
            path: path.to_string(),
            operator: FieldSelectorOperator::NotEquals,
            value: value.to_string(),
        }
    }

    /// Convert to Kubernetes field selector string format
    ///
    /// - `involvedObject.name = web` → `"involvedObject.name=web"`
    /// - `type != Normal` → `"type!=Normal"`
    pub fn to_k8s_string(&self) -> String {
        match self.operator {
            FieldSelectorOperator::Equals => format!("{}={}", self.path, self.value),
            FieldSelectorOperator::NotEquals => format!("{}!={}", self.path, self.value),
        }
    }
}

/// Join field selector terms with commas (logical AND)
pub fn join_field_selectors(selectors: &[FieldSelector]) -> String {
    selectors
        .iter()
        .map(FieldSelector::to_k8s_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Field selector matching the events of one object
pub fn involved_object_selector(kind: &str, name: &str) -> String {
    join_field_selectors(&[
        FieldSelector::equals("involvedObject.kind", kind),
        FieldSelector::equals("involvedObject.name", name),
    ])
}

/// Field selector dropping `Normal` events, leaving warnings
pub fn non_normal_events_selector() -> String {
    FieldSelector::not_equals("type", "Normal").to_k8s_string()
}

/// Render a full LabelSelector, including set-based expressions
///
/// Returns None when the selector has no terms at all.
pub fn label_selector_to_string(selector: &LabelSelector) -> Option<String> {
    let mut terms: Vec<String> = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    for expr in selector.match_expressions.iter().flatten() {
        let values = expr.values.clone().unwrap_or_default().join(",");
        let term = match expr.operator.as_str() {
            "In" => format!("{} in ({})", expr.key, values),
            "NotIn" => format!("{} notin ({})", expr.key, values),
            "Exists" => expr.key.clone(),
            "DoesNotExist" => format!("!{}", expr.key),
            _ => continue,
        };
        terms.push(term);
    }

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use std::collections::BTreeMap;

    #[test]
    fn test_field_selector_to_k8s_string() {
        let eq = FieldSelector::equals("status.phase", "Running");
        assert_eq!(eq.to_k8s_string(), "status.phase=Running");

        let ne = FieldSelector::not_equals("type", "Normal");
        assert_eq!(ne.operator, FieldSelectorOperator::NotEquals);
        assert_eq!(ne.to_k8s_string(), "type!=Normal");
        assert_eq!(non_normal_events_selector(), "type!=Normal");
    }

    #[test]
    fn test_involved_object_selector() {
        assert_eq!(
            involved_object_selector("Deployment", "web"),
            "involvedObject.kind=Deployment,involvedObject.name=web"
        );
    }

    #[test]
    fn test_label_selector_with_expressions() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "env".to_string(),
                    operator: "In".to_string(),
                    values: Some(vec!["prod".to_string(), "staging".to_string()]),
                },
                LabelSelectorRequirement {
                    key: "canary".to_string(),
                    operator: "DoesNotExist".to_string(),
                    values: None,
                },
            ]),
        };
        assert_eq!(
            label_selector_to_string(&selector).as_deref(),
            Some("app=web,env in (prod,staging),!canary")
        );
        assert_eq!(label_selector_to_string(&LabelSelector::default()), None);
    }
}
