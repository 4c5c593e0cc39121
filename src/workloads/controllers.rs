// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Pod, PodTemplateSpec, ReplicationController};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::pods::build_pod_list;
use super::{Dashboard, ListMeta, ObjectSummary, PodView, ResourceList, WorkloadError};
use crate::correlator::{
    EventSummary, PodInfo, filter_namespaced_pods_by_label_selector,
    filter_namespaced_pods_by_selector, get_pod_event_info, get_pod_info,
    get_pods_event_warnings,
};
use crate::dataselect::{CachedResources, DataSelectQuery, ResourceCell, select_resources};
use crate::kubernetes::selectors::{involved_object_selector, label_selector_to_string};
use crate::kubernetes::{FetchError, ListOptions, NamespaceQuery, ResourceChannel, ResourceKind};

/// A resource that owns pods through a label selector
pub trait PodController:
    DeserializeOwned + Into<ResourceCell> + TryFrom<ResourceCell> + Send + 'static
{
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;
    fn selector(&self) -> Option<LabelSelector>;
    fn template(&self) -> Option<&PodTemplateSpec>;
    /// Pods the controller currently runs
    fn current(&self) -> i32;
    /// Pods the controller should run
    fn desired(&self) -> i32;

    /// Pods of this controller among `pods`; without a selector there are none
    fn owned_pods(&self, pods: &[Pod]) -> Vec<Pod> {
        let namespace = self.meta().namespace.as_deref();
        let (Some(namespace), Some(selector)) = (namespace, self.selector()) else {
            return Vec::new();
        };
        filter_namespaced_pods_by_label_selector(pods, namespace, &selector)
    }
}

fn map_selector(labels: Option<&BTreeMap<String, String>>) -> Option<LabelSelector> {
    labels.map(|labels| LabelSelector {
        match_labels: Some(labels.clone()),
        match_expressions: None,
    })
}

impl PodController for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployment;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|s| s.selector.clone())
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
    fn current(&self) -> i32 {
        self.status.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }
}

impl PodController for ReplicaSet {
    const KIND: ResourceKind = ResourceKind::ReplicaSet;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|s| s.selector.clone())
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().and_then(|s| s.template.as_ref())
    }
    fn current(&self) -> i32 {
        self.status.as_ref().map(|s| s.replicas).unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }
}

impl PodController for DaemonSet {
    const KIND: ResourceKind = ResourceKind::DaemonSet;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|s| s.selector.clone())
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
    fn current(&self) -> i32 {
        self.status
            .as_ref()
            .map(|s| s.current_number_scheduled)
            .unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.status
            .as_ref()
            .map(|s| s.desired_number_scheduled)
            .unwrap_or(0)
    }
}

impl PodController for StatefulSet {
    const KIND: ResourceKind = ResourceKind::StatefulSet;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().map(|s| s.selector.clone())
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
    fn current(&self) -> i32 {
        self.status.as_ref().map(|s| s.replicas).unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }
}

impl PodController for ReplicationController {
    const KIND: ResourceKind = ResourceKind::ReplicationController;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        map_selector(self.spec.as_ref().and_then(|s| s.selector.as_ref()))
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().and_then(|s| s.template.as_ref())
    }
    fn current(&self) -> i32 {
        self.status.as_ref().map(|s| s.replicas).unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }
    fn owned_pods(&self, pods: &[Pod]) -> Vec<Pod> {
        let Some(namespace) = self.metadata.namespace.as_deref() else {
            return Vec::new();
        };
        let selector = self.spec.as_ref().and_then(|s| s.selector.as_ref());
        filter_namespaced_pods_by_selector(pods, namespace, selector)
    }
}

impl PodController for Job {
    const KIND: ResourceKind = ResourceKind::Job;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn selector(&self) -> Option<LabelSelector> {
        self.spec.as_ref().and_then(|s| s.selector.clone())
    }
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
    fn current(&self) -> i32 {
        self.status.as_ref().and_then(|s| s.active).unwrap_or(0)
    }
    fn desired(&self) -> i32 {
        self.spec.as_ref().and_then(|s| s.completions).unwrap_or(0)
    }
}

/// Kinds older or trimmed-down clusters may not serve
fn served_optionally(kind: ResourceKind) -> bool {
    matches!(kind, ResourceKind::Job | ResourceKind::StatefulSet)
}

fn container_images<T: PodController>(controller: &T) -> Vec<String> {
    controller
        .template()
        .and_then(|t| t.spec.as_ref())
        .map(|spec| {
            spec.containers
                .iter()
                .filter_map(|c| c.image.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// List row of a pod controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerView {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub container_images: Vec<String>,
    pub pods: PodInfo,
}

pub(super) fn to_controller_view<T: PodController>(
    controller: &T,
    pods: &[Pod],
    events: &[Event],
) -> ControllerView {
    controller_view_of_owned(controller, &controller.owned_pods(pods), events)
}

/// View of a controller whose pods are already matched
pub(super) fn controller_view_of_owned<T: PodController>(
    controller: &T,
    owned: &[Pod],
    events: &[Event],
) -> ControllerView {
    let warnings = get_pods_event_warnings(events, owned);
    ControllerView {
        object: ObjectSummary::new(T::KIND, controller.meta()),
        container_images: container_images(controller),
        pods: get_pod_event_info(controller.current(), controller.desired(), owned, warnings),
    }
}

/// One controller with its pods and its own events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDetail {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub container_images: Vec<String>,
    pub pods: PodInfo,
    pub pod_list: ResourceList<PodView>,
    pub events: Vec<EventSummary>,
}

impl Dashboard {
    /// Controllers of kind `T` with the pod counts behind each of them
    pub async fn controller_list<T: PodController>(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<ResourceList<ControllerView>, WorkloadError> {
        let controllers = ResourceChannel::<Vec<T>>::list(
            self.client.clone(),
            T::KIND,
            namespaces,
            ListOptions::default(),
        );
        let mut channels = self.channels(namespaces).with_pods().with_warning_events();

        let controllers = if served_optionally(T::KIND) {
            controllers.recv_optional().await?
        } else {
            controllers.recv().await?
        };
        let pods = channels.pods()?.recv().await?;
        let events = channels.events()?.recv_optional().await?;

        let cached = Arc::new(CachedResources::new(pods));
        let mut selection =
            select_resources(controllers, query, cached.clone(), self.metrics.clone());
        let items: Vec<ControllerView> = selection
            .items
            .iter()
            .map(|c| to_controller_view(c, &cached.pods, &events))
            .collect();
        let kind = T::KIND;
        debug!(kind = %kind, items = items.len(), "Built controller list");

        Ok(ResourceList {
            list_meta: ListMeta {
                total_items: selection.total_items,
            },
            items,
            cumulative_metrics: selection.metrics.metrics_or_empty().await,
        })
    }

    /// Pods selected by one controller, fetched with its selector pushed down
    pub async fn controller_pods<T: PodController>(
        &self,
        namespace: &str,
        name: &str,
        query: &DataSelectQuery,
    ) -> Result<ControllerDetail, WorkloadError> {
        let controller: T =
            ResourceChannel::get(self.client.clone(), T::KIND, Some(namespace), name)
                .recv()
                .await?;

        let scope = NamespaceQuery::Single(namespace.to_string());
        let kind_name = T::KIND.info().api_resource.kind.clone();
        let own_events = ResourceChannel::<Vec<Event>>::list(
            self.client.clone(),
            ResourceKind::Event,
            &scope,
            ListOptions::with_fields(involved_object_selector(&kind_name, name)),
        );
        let mut channels = self.channels(&scope).with_events();
        let pods = match controller.selector().as_ref().and_then(label_selector_to_string) {
            Some(labels) => {
                let mut labelled = self
                    .channels(&scope)
                    .with_list_options(ListOptions::with_labels(labels))
                    .with_pods();
                labelled.pods()?.recv().await?
            }
            None => Vec::new(),
        };
        let pod_events = channels.events()?.recv_optional().await?;
        let own_events: Vec<Event> = match own_events.recv().await {
            Err(FetchError::NotFound { .. }) => Vec::new(),
            other => other?,
        };

        // the server already filtered by labels, this narrows to the namespace
        let pods = controller.owned_pods(&pods);
        let pod_info = get_pod_info(controller.current(), controller.desired(), &pods);
        let pod_list = build_pod_list(pods, &pod_events, query, self.metrics.clone()).await;

        Ok(ControllerDetail {
            object: ObjectSummary::new(T::KIND, controller.meta()),
            container_images: container_images(&controller),
            pods: pod_info,
            pod_list,
            events: own_events.iter().map(EventSummary::from).collect(),
        })
    }
}
