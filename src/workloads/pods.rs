// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::core::v1::{Event, Pod};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Dashboard, ListMeta, ObjectSummary, ResourceList, WorkloadError};
use crate::correlator::{
    EventSummary, PodPhase, distinct_messages, get_pods_event_warnings, pod_phase_status,
};
use crate::dataselect::{CachedResources, DataSelectQuery, select_resources};
use crate::kubernetes::{NamespaceQuery, ResourceKind};
use crate::metrics::{CPU_USAGE, MEMORY_USAGE, MetricSet, MetricsClient};

/// Presentation view of one pod
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodView {
    #[serde(flatten)]
    pub object: ObjectSummary,
    /// "success", "failed" or "pending"
    pub pod_status: &'static str,
    pub phase: PodPhase,
    pub restart_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Latest CPU sample in millicores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_millicores: Option<f64>,
    /// Latest memory sample in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<f64>,
    pub warnings: Vec<EventSummary>,
}

/// Three-way status label derived from the pod's phase
fn pod_status_label(phase: PodPhase) -> &'static str {
    match phase {
        PodPhase::Failed => "failed",
        PodPhase::Succeeded | PodPhase::Running => "success",
        PodPhase::Pending | PodPhase::Unknown => "pending",
    }
}

fn restart_count(pod: &Pod) -> i32 {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| statuses.iter().map(|c| c.restart_count).sum())
        .unwrap_or(0)
}

fn latest_sample(set: &MetricSet, pod: &Pod, metric_name: &str) -> Option<f64> {
    let name = pod.metadata.name.as_deref()?;
    set.for_resource(
        ResourceKind::Pod,
        pod.metadata.namespace.as_deref(),
        name,
        metric_name,
    )
    .and_then(|metric| metric.data_points.last())
    .map(|point| point.value)
}

fn to_pod_view(pod: &Pod, events: &[Event], metrics: &MetricSet) -> PodView {
    let warnings = get_pods_event_warnings(events, std::slice::from_ref(pod));
    let phase = pod_phase_status(pod, &warnings);
    PodView {
        object: ObjectSummary {
            status: phase.to_string(),
            ..ObjectSummary::new(ResourceKind::Pod, &pod.metadata)
        },
        pod_status: pod_status_label(phase),
        phase,
        restart_count: restart_count(pod),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        cpu_millicores: latest_sample(metrics, pod, CPU_USAGE),
        memory_bytes: latest_sample(metrics, pod, MEMORY_USAGE),
        warnings: distinct_messages(warnings),
    }
}

/// Select a page of pods and attach their status, warnings and metrics
pub(super) async fn build_pod_list(
    pods: Vec<Pod>,
    events: &[Event],
    query: &DataSelectQuery,
    metrics_client: Option<Arc<dyn MetricsClient>>,
) -> ResourceList<PodView> {
    let mut selection = select_resources(
        pods,
        query,
        Arc::new(CachedResources::default()),
        metrics_client,
    );

    let metric_set = match selection.metrics.get_metric_set().await {
        Ok(set) => set.clone(),
        Err(e) => {
            warn!(error = %e, "Pod metrics unavailable, listing without them");
            MetricSet::default()
        }
    };

    let items: Vec<PodView> = selection
        .items
        .iter()
        .map(|pod| to_pod_view(pod, events, &metric_set))
        .collect();
    debug!(pods = items.len(), total = selection.total_items, "Built pod list");

    ResourceList {
        list_meta: ListMeta {
            total_items: selection.total_items,
        },
        items,
        cumulative_metrics: metric_set.cumulative,
    }
}

impl Dashboard {
    /// Pods in `namespaces` with their warnings and latest usage
    pub async fn pod_list(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<ResourceList<PodView>, WorkloadError> {
        let mut channels = self.channels(namespaces).with_pods().with_warning_events();
        let pods = channels.pods()?.recv().await?;
        let events = channels.events()?.recv_optional().await?;
        Ok(build_pod_list(pods, &events, query, self.metrics.clone()).await)
    }
}
