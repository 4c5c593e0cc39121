// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Uniform cell wrapper over the supported resource kinds
//!
//! One variant per kind, with properties resolved by an explicit match. The
//! conversions in and out of cells move the resource, so wrapping and
//! unwrapping a list is lossless and keeps its order.

use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
    batch::v1::{CronJob, Job},
    core::v1::{
        ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
        ReplicationController, Secret, Service,
    },
    networking::v1::Ingress,
    storage::v1::StorageClass,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::property::{ComparableValue, PropertyName};
use crate::kubernetes::{
    ClusterClient, FetchError, ListOptions, NamespaceQuery, ResourceChannel, ResourceKind,
};
use crate::metrics::ResourceSelector;

macro_rules! resource_cells {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// One resource instance of any supported kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum ResourceCell {
            $($variant($ty),)*
        }

        $(
            impl From<$ty> for ResourceCell {
                fn from(resource: $ty) -> Self {
                    ResourceCell::$variant(resource)
                }
            }

            impl TryFrom<ResourceCell> for $ty {
                type Error = ResourceCell;

                fn try_from(cell: ResourceCell) -> Result<Self, Self::Error> {
                    match cell {
                        ResourceCell::$variant(resource) => Ok(resource),
                        other => Err(other),
                    }
                }
            }
        )*

        impl ResourceCell {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(ResourceCell::$variant(_) => ResourceKind::$variant,)*
                }
            }

            pub fn metadata(&self) -> &ObjectMeta {
                match self {
                    $(ResourceCell::$variant(resource) => &resource.metadata,)*
                }
            }
        }

        /// List every object of `kind` and wrap the result into cells
        pub async fn fetch_cells(
            client: Arc<dyn ClusterClient>,
            kind: ResourceKind,
            namespaces: &NamespaceQuery,
            options: ListOptions,
        ) -> Result<Vec<ResourceCell>, FetchError> {
            match kind {
                $(ResourceKind::$variant => {
                    let items = ResourceChannel::<Vec<$ty>>::list(client, kind, namespaces, options)
                        .recv()
                        .await?;
                    Ok(to_cells(items))
                })*
            }
        }
    };
}

resource_cells! {
    Pod => Pod,
    Event => Event,
    Service => Service,
    ConfigMap => ConfigMap,
    Secret => Secret,
    PersistentVolumeClaim => PersistentVolumeClaim,
    Deployment => Deployment,
    ReplicaSet => ReplicaSet,
    DaemonSet => DaemonSet,
    StatefulSet => StatefulSet,
    ReplicationController => ReplicationController,
    Job => Job,
    CronJob => CronJob,
    Ingress => Ingress,
    Node => Node,
    Namespace => Namespace,
    PersistentVolume => PersistentVolume,
    StorageClass => StorageClass,
}

/// Wrap a typed list into cells, keeping order
pub fn to_cells<T: Into<ResourceCell>>(resources: Vec<T>) -> Vec<ResourceCell> {
    resources.into_iter().map(Into::into).collect()
}

/// Unwrap cells back into a typed list, keeping order
///
/// Cells of a different kind than `T` are skipped; selection never mixes
/// kinds, so for cells produced by `to_cells` nothing is lost.
pub fn from_cells<T: TryFrom<ResourceCell>>(cells: Vec<ResourceCell>) -> Vec<T> {
    cells
        .into_iter()
        .filter_map(|cell| T::try_from(cell).ok())
        .collect()
}

impl ResourceCell {
    /// Value of a well-known property, or the neutral value
    pub fn property(&self, name: &PropertyName) -> ComparableValue {
        let meta = self.metadata();
        match name {
            PropertyName::Name => ComparableValue::opt_text(meta.name.as_deref()),
            PropertyName::Namespace => ComparableValue::opt_text(meta.namespace.as_deref()),
            PropertyName::CreationTimestamp => {
                ComparableValue::opt_time(meta.creation_timestamp.as_ref().map(|t| t.0))
            }
            PropertyName::Status => self.status(),
            PropertyName::FirstSeen | PropertyName::LastSeen | PropertyName::Reason => {
                self.event_property(name)
            }
            PropertyName::Other(_) => ComparableValue::Neutral,
        }
    }

    fn status(&self) -> ComparableValue {
        match self {
            ResourceCell::Pod(pod) => {
                ComparableValue::opt_text(pod.status.as_ref().and_then(|s| s.phase.as_deref()))
            }
            ResourceCell::Namespace(ns) => {
                ComparableValue::opt_text(ns.status.as_ref().and_then(|s| s.phase.as_deref()))
            }
            ResourceCell::PersistentVolume(pv) => {
                ComparableValue::opt_text(pv.status.as_ref().and_then(|s| s.phase.as_deref()))
            }
            ResourceCell::PersistentVolumeClaim(pvc) => {
                ComparableValue::opt_text(pvc.status.as_ref().and_then(|s| s.phase.as_deref()))
            }
            ResourceCell::Event(event) => ComparableValue::opt_text(event.type_.as_deref()),
            ResourceCell::Node(node) => {
                let ready = node
                    .status
                    .as_ref()
                    .and_then(|s| s.conditions.as_ref())
                    .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
                    .map(|c| c.status.as_str());
                ComparableValue::text(match ready {
                    Some("True") => "Ready",
                    Some("False") => "NotReady",
                    _ => "Unknown",
                })
            }
            _ => ComparableValue::Neutral,
        }
    }

    fn event_property(&self, name: &PropertyName) -> ComparableValue {
        let ResourceCell::Event(event) = self else {
            return ComparableValue::Neutral;
        };
        match name {
            PropertyName::FirstSeen => {
                ComparableValue::opt_time(event.first_timestamp.as_ref().map(|t| t.0))
            }
            PropertyName::LastSeen => {
                ComparableValue::opt_time(event.last_timestamp.as_ref().map(|t| t.0))
            }
            PropertyName::Reason => ComparableValue::opt_text(event.reason.as_deref()),
            _ => ComparableValue::Neutral,
        }
    }

    /// Label selector of a pod-owning resource, from its own spec
    fn pod_selector(&self) -> Option<LabelSelector> {
        fn from_map(map: Option<&BTreeMap<String, String>>) -> Option<LabelSelector> {
            map.map(|labels| LabelSelector {
                match_labels: Some(labels.clone()),
                match_expressions: None,
            })
        }

        match self {
            ResourceCell::Deployment(d) => d.spec.as_ref().map(|s| s.selector.clone()),
            ResourceCell::ReplicaSet(rs) => rs.spec.as_ref().map(|s| s.selector.clone()),
            ResourceCell::DaemonSet(ds) => ds.spec.as_ref().map(|s| s.selector.clone()),
            ResourceCell::StatefulSet(sts) => sts.spec.as_ref().map(|s| s.selector.clone()),
            ResourceCell::Job(job) => job.spec.as_ref().and_then(|s| s.selector.clone()),
            ResourceCell::ReplicationController(rc) => {
                from_map(rc.spec.as_ref().and_then(|s| s.selector.as_ref()))
            }
            ResourceCell::Service(svc) => {
                from_map(svc.spec.as_ref().and_then(|s| s.selector.as_ref()))
            }
            _ => None,
        }
    }

    /// Metric lookup key derived from the resource's own identity
    pub fn resource_selector(&self) -> ResourceSelector {
        let meta = self.metadata();
        ResourceSelector {
            namespace: meta.namespace.clone(),
            kind: self.kind(),
            name: meta.name.clone().unwrap_or_default(),
            selector: self.pod_selector(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::testing::{self, MockClusterClient, typed};
    use serde_json::json;

    #[test]
    fn test_cells_round_trip_keeps_order() {
        let pods: Vec<Pod> = vec![
            typed(testing::pod("default", "b", &[], "Running")),
            typed(testing::pod("default", "a", &[], "Pending")),
        ];
        let cells = to_cells(pods.clone());
        assert!(cells.iter().all(|c| c.kind() == ResourceKind::Pod));
        let back: Vec<Pod> = from_cells(cells);
        assert_eq!(back, pods);
    }

    #[test]
    fn test_from_cells_skips_other_kinds() {
        let mut cells = to_cells::<Pod>(vec![typed(testing::pod("ns", "p", &[], "Running"))]);
        cells.push(ResourceCell::from(typed::<Node>(testing::node("n1"))));
        let nodes: Vec<Node> = from_cells(cells);
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_common_properties() {
        let cell = ResourceCell::from(typed::<Pod>(testing::pod("kube-system", "dns", &[], "Running")));
        assert_eq!(cell.property(&PropertyName::Name), ComparableValue::text("dns"));
        assert_eq!(
            cell.property(&PropertyName::Namespace),
            ComparableValue::text("kube-system")
        );
        assert_eq!(
            cell.property(&PropertyName::Status),
            ComparableValue::text("Running")
        );
        assert!(matches!(
            cell.property(&PropertyName::CreationTimestamp),
            ComparableValue::Time(_)
        ));
        assert_eq!(
            cell.property(&PropertyName::Other("restarts".to_string())),
            ComparableValue::Neutral
        );
        // event-only properties are neutral on other kinds
        assert_eq!(cell.property(&PropertyName::Reason), ComparableValue::Neutral);
    }

    #[test]
    fn test_event_properties() {
        let cell = ResourceCell::from(typed::<Event>(testing::warning_event(
            "default",
            "web-1",
            "BackOff",
            "Back-off restarting failed container",
        )));
        assert_eq!(cell.kind(), ResourceKind::Event);
        assert_eq!(cell.property(&PropertyName::Reason), ComparableValue::text("BackOff"));
        assert_eq!(cell.property(&PropertyName::Status), ComparableValue::text("Warning"));
        assert!(
            cell.property(&PropertyName::FirstSeen) < cell.property(&PropertyName::LastSeen)
        );
    }

    #[test]
    fn test_node_status() {
        let cell = ResourceCell::from(typed::<Node>(testing::node("worker-1")));
        assert_eq!(cell.property(&PropertyName::Status), ComparableValue::text("Ready"));
    }

    #[test]
    fn test_resource_selectors() {
        let deployment = ResourceCell::from(typed::<Deployment>(testing::deployment(
            "default",
            "web",
            &[("app", "web")],
            2,
        )));
        let selector = deployment.resource_selector();
        assert_eq!(selector.kind, ResourceKind::Deployment);
        assert_eq!(selector.namespace.as_deref(), Some("default"));
        assert_eq!(selector.name, "web");
        let labels = selector.selector.and_then(|s| s.match_labels).unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("web"));

        let service = ResourceCell::from(typed::<Service>(testing::service(
            "default",
            "web",
            &[("app", "web")],
        )));
        assert!(service.resource_selector().selector.is_some());

        let pod = ResourceCell::from(typed::<Pod>(testing::pod("default", "web-1", &[], "Running")));
        assert!(pod.resource_selector().selector.is_none());

        let node = ResourceCell::from(typed::<Node>(testing::node("n1")));
        assert_eq!(node.resource_selector().namespace, None);
    }

    #[test]
    fn test_missing_metadata_is_tolerated() {
        let cell = ResourceCell::from(typed::<ConfigMap>(json!({ "metadata": {} })));
        assert_eq!(cell.property(&PropertyName::Name), ComparableValue::text(""));
        assert_eq!(cell.resource_selector().name, "");
    }

    #[tokio::test]
    async fn test_fetch_cells_by_kind() {
        let mock = MockClusterClient::new()
            .with_items(ResourceKind::ConfigMap, vec![testing::config_map("default", "settings")])
            .with_items(ResourceKind::Node, vec![testing::node("n1"), testing::node("n2")]);
        let client: Arc<dyn ClusterClient> = Arc::new(mock);

        let cells = fetch_cells(
            client.clone(),
            ResourceKind::ConfigMap,
            &NamespaceQuery::Single("default".to_string()),
            ListOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].kind(), ResourceKind::ConfigMap);

        let cells = fetch_cells(client, ResourceKind::Node, &NamespaceQuery::All, ListOptions::default())
            .await
            .unwrap();
        let nodes: Vec<Node> = from_cells(cells);
        assert_eq!(nodes.len(), 2);
    }
}
