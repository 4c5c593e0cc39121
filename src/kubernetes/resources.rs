// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Registry of the resource kinds the dashboard knows how to fetch.
//!
//! Built once from k8s-openapi compile-time type information, so it stays in
//! sync with the Kubernetes API version we're building against and needs no
//! discovery round-trip.

use kube::discovery::ApiResource;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Resource type tag used throughout the aggregation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Event,
    Service,
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    Deployment,
    ReplicaSet,
    DaemonSet,
    StatefulSet,
    ReplicationController,
    Job,
    CronJob,
    Ingress,
    Node,
    Namespace,
    PersistentVolume,
    StorageClass,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 18] = [
        ResourceKind::Pod,
        ResourceKind::Event,
        ResourceKind::Service,
        ResourceKind::ConfigMap,
        ResourceKind::Secret,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::Deployment,
        ResourceKind::ReplicaSet,
        ResourceKind::DaemonSet,
        ResourceKind::StatefulSet,
        ResourceKind::ReplicationController,
        ResourceKind::Job,
        ResourceKind::CronJob,
        ResourceKind::Ingress,
        ResourceKind::Node,
        ResourceKind::Namespace,
        ResourceKind::PersistentVolume,
        ResourceKind::StorageClass,
    ];

    /// Registry entry for this kind
    pub fn info(self) -> &'static ResourceInfo {
        RESOURCE_REGISTRY.info(self)
    }

    /// Plural API name (e.g., "pods", "statefulsets")
    pub fn plural(self) -> &'static str {
        &self.info().plural
    }

    pub fn is_namespaced(self) -> bool {
        self.info().namespaced
    }

    /// Look up a kind by plural name or alias (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        RESOURCE_REGISTRY.get(name)
    }

    /// Whether this kind owns pods through a label selector
    pub fn is_pod_controller(self) -> bool {
        matches!(
            self,
            ResourceKind::Deployment
                | ResourceKind::ReplicaSet
                | ResourceKind::DaemonSet
                | ResourceKind::StatefulSet
                | ResourceKind::ReplicationController
                | ResourceKind::Job
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Accessor metadata for one resource kind
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    /// The API resource definition used to build list/get requests
    pub api_resource: ApiResource,
    /// Plural name (primary lookup name)
    pub plural: String,
    /// Short names and singular forms (e.g., "po", "pod")
    pub aliases: Vec<String>,
    pub namespaced: bool,
}

impl ResourceInfo {
    /// Get the full API group/version string
    pub fn api_version(&self) -> &str {
        &self.api_resource.api_version
    }
}

/// Registry of all supported resource kinds
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    by_kind: HashMap<ResourceKind, ResourceInfo>,
    /// Alias (and plural) to kind mapping
    alias_map: HashMap<String, ResourceKind>,
}

impl ResourceRegistry {
    fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            alias_map: HashMap::new(),
        }
    }

    fn add(&mut self, info: ResourceInfo) {
        for alias in &info.aliases {
            self.alias_map.insert(alias.clone(), info.kind);
        }
        self.alias_map.insert(info.plural.clone(), info.kind);
        self.by_kind.insert(info.kind, info);
    }

    /// Look up a kind by plural name or alias
    pub fn get(&self, name: &str) -> Option<ResourceKind> {
        self.alias_map.get(&name.trim().to_lowercase()).copied()
    }

    fn info(&self, kind: ResourceKind) -> &ResourceInfo {
        // build_core_registry registers every variant of ResourceKind::ALL
        &self.by_kind[&kind]
    }

    /// All registered kinds, sorted by plural name
    pub fn list(&self) -> Vec<&ResourceInfo> {
        let mut infos: Vec<_> = self.by_kind.values().collect();
        infos.sort_by(|a, b| a.plural.cmp(&b.plural));
        infos
    }
}

pub static RESOURCE_REGISTRY: LazyLock<ResourceRegistry> = LazyLock::new(build_core_registry);

fn build_core_registry() -> ResourceRegistry {
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
    use kube::Resource;

    let mut registry = ResourceRegistry::new();

    macro_rules! add_resource {
        ($kind:ident, $type:ty, namespaced, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $kind, $type, true, [$($alias),*])
        }};
        ($kind:ident, $type:ty, cluster, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $kind, $type, false, [$($alias),*])
        }};
        (@inner $kind:ident, $type:ty, $namespaced:expr, [$($alias:expr),* $(,)?]) => {{
            let ar = ApiResource {
                group: <$type>::group(&()).to_string(),
                version: <$type>::version(&()).to_string(),
                api_version: <$type>::api_version(&()).to_string(),
                kind: <$type>::kind(&()).to_string(),
                plural: <$type>::plural(&()).to_string(),
            };
            registry.add(ResourceInfo {
                kind: ResourceKind::$kind,
                plural: ar.plural.clone(),
                api_resource: ar,
                aliases: vec![$($alias.to_string()),*],
                namespaced: $namespaced,
            });
        }};
    }

    add_resource!(Pod, Pod, namespaced, ["pod", "po"]);
    add_resource!(Event, Event, namespaced, ["event", "ev"]);
    add_resource!(Service, Service, namespaced, ["service", "svc"]);
    add_resource!(ConfigMap, ConfigMap, namespaced, ["configmap", "cm"]);
    add_resource!(Secret, Secret, namespaced, ["secret"]);
    add_resource!(
        PersistentVolumeClaim,
        PersistentVolumeClaim,
        namespaced,
        ["persistentvolumeclaim", "pvc", "pvcs"]
    );
    add_resource!(Deployment, Deployment, namespaced, ["deployment", "deploy"]);
    add_resource!(ReplicaSet, ReplicaSet, namespaced, ["replicaset", "rs"]);
    add_resource!(DaemonSet, DaemonSet, namespaced, ["daemonset", "ds"]);
    add_resource!(StatefulSet, StatefulSet, namespaced, ["statefulset", "sts"]);
    add_resource!(
        ReplicationController,
        ReplicationController,
        namespaced,
        ["replicationcontroller", "rc"]
    );
    add_resource!(Job, Job, namespaced, ["job"]);
    add_resource!(CronJob, CronJob, namespaced, ["cronjob", "cj"]);
    add_resource!(Ingress, Ingress, namespaced, ["ingress", "ing"]);

    add_resource!(Node, Node, cluster, ["node", "no"]);
    add_resource!(Namespace, Namespace, cluster, ["namespace", "ns"]);
    add_resource!(PersistentVolume, PersistentVolume, cluster, ["persistentvolume", "pv", "pvs"]);
    add_resource!(StorageClass, StorageClass, cluster, ["storageclass", "sc"]);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_registered() {
        for kind in ResourceKind::ALL {
            let info = kind.info();
            assert_eq!(info.kind, kind);
            assert!(!info.plural.is_empty());
        }
        assert_eq!(RESOURCE_REGISTRY.list().len(), ResourceKind::ALL.len());
    }

    #[test]
    fn test_lookup_by_alias() {
        assert_eq!(ResourceKind::from_name("pods"), Some(ResourceKind::Pod));
        assert_eq!(ResourceKind::from_name("po"), Some(ResourceKind::Pod));
        assert_eq!(ResourceKind::from_name("Deploy"), Some(ResourceKind::Deployment));
        assert_eq!(ResourceKind::from_name("cj"), Some(ResourceKind::CronJob));
        assert_eq!(ResourceKind::from_name("certificates"), None);
    }

    #[test]
    fn test_scope_and_api_version() {
        assert!(ResourceKind::Pod.is_namespaced());
        assert!(!ResourceKind::Node.is_namespaced());
        assert!(!ResourceKind::StorageClass.is_namespaced());
        assert_eq!(ResourceKind::Deployment.info().api_version(), "apps/v1");
        assert_eq!(ResourceKind::CronJob.info().api_version(), "batch/v1");
        assert_eq!(ResourceKind::Pod.info().api_version(), "v1");
    }

    #[test]
    fn test_display_uses_plural() {
        assert_eq!(ResourceKind::StatefulSet.to_string(), "statefulsets");
        assert_eq!(ResourceKind::Ingress.to_string(), "ingresses");
    }
}
