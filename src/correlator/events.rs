// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, Pod};
use serde::Serialize;
use std::collections::HashSet;

/// Presentation view of one event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub name: String,
    pub namespace: String,
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub count: i32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub object_kind: String,
    pub object_name: String,
    #[serde(skip)]
    pub object_uid: Option<String>,
    pub source_component: String,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        let involved = &event.involved_object;
        EventSummary {
            name: event.metadata.name.clone().unwrap_or_default(),
            namespace: event.metadata.namespace.clone().unwrap_or_default(),
            reason: event.reason.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            type_: event.type_.clone().unwrap_or_default(),
            count: event.count.unwrap_or(1),
            first_seen: event.first_timestamp.as_ref().map(|t| t.0),
            last_seen: event.last_timestamp.as_ref().map(|t| t.0),
            object_kind: involved.kind.clone().unwrap_or_default(),
            object_name: involved.name.clone().unwrap_or_default(),
            object_uid: involved.uid.clone(),
            source_component: event
                .source
                .as_ref()
                .and_then(|s| s.component.clone())
                .unwrap_or_default(),
        }
    }
}

impl EventSummary {
    pub fn is_warning(&self) -> bool {
        self.type_ == "Warning"
    }

    /// Whether the event's involved object is `pod`
    pub fn concerns(&self, pod: &Pod) -> bool {
        match (&self.object_uid, &pod.metadata.uid) {
            (Some(event_uid), Some(pod_uid)) => event_uid == pod_uid,
            _ => {
                self.object_kind == "Pod"
                    && Some(self.object_name.as_str()) == pod.metadata.name.as_deref()
                    && Some(self.namespace.as_str()) == pod.metadata.namespace.as_deref()
            }
        }
    }
}

/// Whether a pod finished successfully or is running and ready
fn is_ready_or_succeeded(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    match status.phase.as_deref() {
        Some("Succeeded") => true,
        Some("Running") => status
            .conditions
            .iter()
            .flatten()
            .any(|c| c.type_ == "Ready" && c.status == "True"),
        _ => false,
    }
}

/// Warning events of the pods that are not healthy
///
/// Every matching event is kept, so pods sharing a message each see it.
pub fn get_pods_event_warnings(events: &[Event], pods: &[Pod]) -> Vec<EventSummary> {
    let unhealthy: Vec<&Pod> = pods.iter().filter(|p| !is_ready_or_succeeded(p)).collect();
    if unhealthy.is_empty() {
        return Vec::new();
    }

    events
        .iter()
        .map(EventSummary::from)
        .filter(EventSummary::is_warning)
        .filter(|event| unhealthy.iter().any(|pod| event.concerns(pod)))
        .collect()
}

/// Keep the first warning of each message
pub fn distinct_messages(warnings: Vec<EventSummary>) -> Vec<EventSummary> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|event| seen.insert(event.message.clone()))
        .collect()
}
