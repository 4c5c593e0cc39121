// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use std::collections::BTreeMap;

fn requirement_matches(req: &LabelSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
    let value = labels.get(&req.key);
    let values = req.values.as_deref().unwrap_or_default();
    match req.operator.as_str() {
        "In" => value.is_some_and(|v| values.contains(v)),
        "NotIn" => value.is_none_or(|v| !values.contains(v)),
        "Exists" => value.is_some(),
        "DoesNotExist" => value.is_none(),
        _ => false,
    }
}

/// Whether `labels` satisfy every term of `selector`
///
/// A selector with no terms matches nothing. Controllers always carry a
/// selector, so an empty one means "no pods", not "all pods".
pub fn label_selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let match_labels = selector.match_labels.as_ref().filter(|m| !m.is_empty());
    let expressions = selector
        .match_expressions
        .as_deref()
        .filter(|e| !e.is_empty());

    if match_labels.is_none() && expressions.is_none() {
        return false;
    }

    match_labels
        .into_iter()
        .flatten()
        .all(|(k, v)| labels.get(k) == Some(v))
        && expressions
            .into_iter()
            .flatten()
            .all(|req| requirement_matches(req, labels))
}

fn in_namespace(pod: &Pod, namespace: &str) -> bool {
    pod.metadata.namespace.as_deref() == Some(namespace)
}

fn pod_labels(pod: &Pod) -> BTreeMap<String, String> {
    pod.metadata.labels.clone().unwrap_or_default()
}

/// Pods in `namespace` whose labels contain every `match_labels` pair
pub fn filter_namespaced_pods_by_selector(
    pods: &[Pod],
    namespace: &str,
    match_labels: Option<&BTreeMap<String, String>>,
) -> Vec<Pod> {
    let Some(match_labels) = match_labels.filter(|m| !m.is_empty()) else {
        return Vec::new();
    };
    pods.iter()
        .filter(|pod| in_namespace(pod, namespace))
        .filter(|pod| {
            let labels = pod.metadata.labels.as_ref();
            match_labels
                .iter()
                .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
        })
        .cloned()
        .collect()
}

/// Pods in `namespace` matched by a full label selector
pub fn filter_namespaced_pods_by_label_selector(
    pods: &[Pod],
    namespace: &str,
    selector: &LabelSelector,
) -> Vec<Pod> {
    pods.iter()
        .filter(|pod| in_namespace(pod, namespace))
        .filter(|pod| label_selector_matches(selector, &pod_labels(pod)))
        .cloned()
        .collect()
}
