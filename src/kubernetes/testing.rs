// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-process cluster client and JSON fixtures for unit tests

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{ClusterClient, FetchError, ListOptions, ResourceKind};

/// Canned answer for one kind
#[derive(Debug, Clone)]
pub enum MockResponse {
    Items(Vec<Value>),
    NotFound,
    ApiError(u16),
}

/// A recorded list call: kind, namespace and pushed-down options
pub type RecordedCall = (ResourceKind, Option<String>, ListOptions);

#[derive(Default)]
pub struct MockClusterClient {
    responses: HashMap<ResourceKind, MockResponse>,
    delays: HashMap<ResourceKind, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, kind: ResourceKind, items: Vec<Value>) -> Self {
        self.responses.insert(kind, MockResponse::Items(items));
        self
    }

    pub fn not_found(mut self, kind: ResourceKind) -> Self {
        self.responses.insert(kind, MockResponse::NotFound);
        self
    }

    pub fn api_error(mut self, kind: ResourceKind, code: u16) -> Self {
        self.responses.insert(kind, MockResponse::ApiError(code));
        self
    }

    pub fn delayed(mut self, kind: ResourceKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, kind: ResourceKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    fn error_for(kind: ResourceKind, response: &MockResponse) -> Option<FetchError> {
        match response {
            MockResponse::NotFound => Some(FetchError::NotFound {
                kind,
                message: "the server could not find the requested resource".to_string(),
            }),
            MockResponse::ApiError(code) => Some(FetchError::Api {
                kind,
                code: *code,
                reason: "InternalError".to_string(),
                message: "mock failure".to_string(),
            }),
            MockResponse::Items(_) => None,
        }
    }
}

/// Equality-only label selector check, enough for the fixtures
fn matches_label_selector(item: &Value, selector: &str) -> bool {
    selector.split(',').filter(|t| !t.is_empty()).all(|term| {
        match term.split_once('=') {
            Some((key, value)) => item["metadata"]["labels"][key].as_str() == Some(value),
            None => true,
        }
    })
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, namespace.map(String::from), options.clone()));

        if let Some(delay) = self.delays.get(&kind) {
            tokio::time::sleep(*delay).await;
        }

        let Some(response) = self.responses.get(&kind) else {
            return Ok(Vec::new());
        };
        if let Some(err) = Self::error_for(kind, response) {
            return Err(err);
        }
        let MockResponse::Items(items) = response else {
            return Ok(Vec::new());
        };

        Ok(items
            .iter()
            .filter(|item| {
                namespace.is_none_or(|ns| item["metadata"]["namespace"].as_str() == Some(ns))
            })
            .filter(|item| {
                options
                    .label_selector
                    .as_deref()
                    .is_none_or(|sel| matches_label_selector(item, sel))
            })
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, FetchError> {
        let not_found = || FetchError::NotFound {
            kind,
            message: format!("{} \"{}\" not found", kind, name),
        };
        let response = self.responses.get(&kind).ok_or_else(not_found)?;
        if let Some(err) = Self::error_for(kind, response) {
            return Err(err);
        }
        let MockResponse::Items(items) = response else {
            return Err(not_found());
        };
        items
            .iter()
            .find(|item| {
                item["metadata"]["name"].as_str() == Some(name)
                    && namespace.is_none_or(|ns| item["metadata"]["namespace"].as_str() == Some(ns))
            })
            .cloned()
            .ok_or_else(not_found)
    }
}

/// Decode a fixture into its typed k8s-openapi struct
pub fn typed<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture should decode")
}

fn labels_json(labels: &[(&str, &str)]) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

pub fn pod(namespace: &str, name: &str, labels: &[(&str, &str)], phase: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("uid-{namespace}-{name}"),
            "labels": labels_json(labels),
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": { "containers": [{ "name": "main", "image": "nginx:1.27" }] },
        "status": { "phase": phase }
    })
}

/// A pod whose Ready and Initialized conditions are both True
pub fn ready_pod(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Value {
    let mut value = pod(namespace, name, labels, "Running");
    value["status"]["conditions"] = json!([
        { "type": "Initialized", "status": "True" },
        { "type": "Ready", "status": "True" }
    ]);
    value
}

pub fn deployment(
    namespace: &str,
    name: &str,
    match_labels: &[(&str, &str)],
    replicas: i32,
) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": {
            "replicas": replicas,
            "selector": { "matchLabels": labels_json(match_labels) },
            "template": {
                "metadata": { "labels": labels_json(match_labels) },
                "spec": { "containers": [{ "name": "main", "image": "nginx:1.27" }] }
            }
        },
        "status": { "replicas": replicas }
    })
}

pub fn job(namespace: &str, name: &str, match_labels: &[(&str, &str)], active: i32) -> Value {
    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": {
            "completions": 1,
            "selector": { "matchLabels": labels_json(match_labels) },
            "template": {
                "metadata": { "labels": labels_json(match_labels) },
                "spec": {
                    "restartPolicy": "Never",
                    "containers": [{ "name": "main", "image": "busybox:1.36" }]
                }
            }
        },
        "status": { "active": active }
    })
}

/// A job carrying the legacy created-by annotation for `cron_name`
pub fn cron_owned_job(
    namespace: &str,
    name: &str,
    cron_name: &str,
    match_labels: &[(&str, &str)],
) -> Value {
    let mut value = job(namespace, name, match_labels, 0);
    let reference = json!({
        "kind": "SerializedReference",
        "apiVersion": "v1",
        "reference": { "kind": "CronJob", "namespace": namespace, "name": cron_name }
    });
    value["metadata"]["annotations"] =
        json!({ "kubernetes.io/created-by": reference.to_string() });
    value
}

pub fn cron_job(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": "batch/v1",
        "kind": "CronJob",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": {
            "schedule": "*/5 * * * *",
            "jobTemplate": {
                "spec": {
                    "template": {
                        "spec": {
                            "restartPolicy": "OnFailure",
                            "containers": [{ "name": "main", "image": "busybox:1.36" }]
                        }
                    }
                }
            }
        }
    })
}

/// A Warning event whose involved object is the pod `pod_name`
pub fn warning_event(namespace: &str, pod_name: &str, reason: &str, message: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Event",
        "metadata": {
            "name": format!("{pod_name}.{reason}"),
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "involvedObject": {
            "kind": "Pod",
            "namespace": namespace,
            "name": pod_name,
            "uid": format!("uid-{namespace}-{pod_name}")
        },
        "reason": reason,
        "message": message,
        "type": "Warning",
        "count": 1,
        "firstTimestamp": "2024-01-01T00:00:00Z",
        "lastTimestamp": "2024-01-01T00:05:00Z"
    })
}

pub fn node(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": { "name": name, "creationTimestamp": "2024-01-01T00:00:00Z" },
        "status": { "conditions": [{ "type": "Ready", "status": "True" }] }
    })
}

pub fn namespace(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name, "creationTimestamp": "2024-01-01T00:00:00Z" },
        "status": { "phase": "Active" }
    })
}

pub fn service(namespace: &str, name: &str, selector: &[(&str, &str)]) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": { "selector": labels_json(selector), "ports": [{ "port": 80 }] }
    })
}

pub fn config_map(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "data": { "key": "value" }
    })
}
