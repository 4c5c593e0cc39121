// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Dashboard list and detail builders
//!
//! Each builder requests the collections it needs up front, waits on them,
//! runs the primary collection through data-select, correlates pods and
//! events, and resolves the metric promise last.

mod controllers;
mod jobs;
mod overview;
mod pods;

pub use controllers::{ControllerDetail, ControllerView};
pub use jobs::CronJobView;
pub use overview::Overview;
pub use pods::PodView;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::correlator::{CreatedByError, CreatedByPolicy};
use crate::dataselect::{
    CachedResources, DataSelectQuery, PropertyName, ResourceCell, fetch_cells, select,
};
use crate::kubernetes::{
    ClusterClient, FetchError, ListOptions, NamespaceQuery, ResourceChannels, ResourceKind,
};
use crate::metrics::{Metric, MetricsClient};

/// Failure of an aggregate request
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    CreatedBy(#[from] CreatedByError),

    #[error("{0} is not a pod controller")]
    NotAController(ResourceKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Items that passed the filter, across all pages
    pub total_items: usize,
}

/// One page of a dashboard list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<T> {
    pub list_meta: ListMeta,
    pub items: Vec<T>,
    pub cumulative_metrics: Vec<Metric>,
}

impl<T> ResourceList<T> {
    pub fn empty() -> Self {
        Self {
            list_meta: ListMeta { total_items: 0 },
            items: Vec::new(),
            cumulative_metrics: Vec::new(),
        }
    }
}

/// Identity and status of any resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
}

impl ObjectSummary {
    pub fn new(kind: ResourceKind, meta: &ObjectMeta) -> Self {
        Self {
            kind,
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone(),
            labels: meta.labels.clone().unwrap_or_default(),
            creation_timestamp: meta.creation_timestamp.as_ref().map(|t| t.0),
            status: String::new(),
        }
    }

    pub fn from_cell(cell: &ResourceCell) -> Self {
        Self {
            status: cell.property(&PropertyName::Status).to_string(),
            ..Self::new(cell.kind(), cell.metadata())
        }
    }
}

/// Any list the dashboard can build for a single kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Pods(ResourceList<PodView>),
    Controllers(ResourceList<ControllerView>),
    CronJobs(ResourceList<CronJobView>),
    Objects(ResourceList<ObjectSummary>),
}

/// Entry point for every aggregate request
#[derive(Clone)]
pub struct Dashboard {
    client: Arc<dyn ClusterClient>,
    metrics: Option<Arc<dyn MetricsClient>>,
    created_by_policy: CreatedByPolicy,
}

impl Dashboard {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            client,
            metrics: None,
            created_by_policy: CreatedByPolicy::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsClient>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_created_by_policy(mut self, policy: CreatedByPolicy) -> Self {
        self.created_by_policy = policy;
        self
    }

    fn channels(&self, namespaces: &NamespaceQuery) -> ResourceChannels {
        ResourceChannels::new(self.client.clone(), namespaces.clone())
    }

    /// List any supported kind with the aggregates that apply to it
    pub async fn list(
        &self,
        kind: ResourceKind,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<Listing, WorkloadError> {
        use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
        use k8s_openapi::api::batch::v1::Job;
        use k8s_openapi::api::core::v1::ReplicationController;

        info!(kind = %kind, namespaces = ?namespaces, "Building list");
        let listing = match kind {
            ResourceKind::Pod => Listing::Pods(self.pod_list(namespaces, query).await?),
            ResourceKind::CronJob => Listing::CronJobs(self.cron_job_list(namespaces, query).await?),
            ResourceKind::Deployment => Listing::Controllers(
                self.controller_list::<Deployment>(namespaces, query).await?,
            ),
            ResourceKind::ReplicaSet => Listing::Controllers(
                self.controller_list::<ReplicaSet>(namespaces, query).await?,
            ),
            ResourceKind::DaemonSet => Listing::Controllers(
                self.controller_list::<DaemonSet>(namespaces, query).await?,
            ),
            ResourceKind::StatefulSet => Listing::Controllers(
                self.controller_list::<StatefulSet>(namespaces, query).await?,
            ),
            ResourceKind::ReplicationController => Listing::Controllers(
                self.controller_list::<ReplicationController>(namespaces, query)
                    .await?,
            ),
            ResourceKind::Job => {
                Listing::Controllers(self.controller_list::<Job>(namespaces, query).await?)
            }
            other => Listing::Objects(self.object_list(other, namespaces, query).await?),
        };
        Ok(listing)
    }

    /// Pods of one controller, with the controller's own events
    pub async fn controller_detail(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        query: &DataSelectQuery,
    ) -> Result<ControllerDetail, WorkloadError> {
        use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
        use k8s_openapi::api::batch::v1::Job;
        use k8s_openapi::api::core::v1::ReplicationController;

        match kind {
            ResourceKind::Deployment => self.controller_pods::<Deployment>(namespace, name, query).await,
            ResourceKind::ReplicaSet => self.controller_pods::<ReplicaSet>(namespace, name, query).await,
            ResourceKind::DaemonSet => self.controller_pods::<DaemonSet>(namespace, name, query).await,
            ResourceKind::StatefulSet => {
                self.controller_pods::<StatefulSet>(namespace, name, query).await
            }
            ResourceKind::ReplicationController => {
                self.controller_pods::<ReplicationController>(namespace, name, query)
                    .await
            }
            ResourceKind::Job => self.controller_pods::<Job>(namespace, name, query).await,
            other => Err(WorkloadError::NotAController(other)),
        }
    }

    /// Plain list of a kind without pod correlation
    pub async fn object_list(
        &self,
        kind: ResourceKind,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<ResourceList<ObjectSummary>, WorkloadError> {
        let cells = fetch_cells(self.client.clone(), kind, namespaces, ListOptions::default()).await;
        let cells = match cells {
            Err(e) if e.is_not_found() => {
                debug!(kind = %kind, "Kind not served, listing nothing");
                return Ok(ResourceList::empty());
            }
            other => other?,
        };
        Ok(self.summarize(cells, query).await)
    }

    async fn summarize(
        &self,
        cells: Vec<ResourceCell>,
        query: &DataSelectQuery,
    ) -> ResourceList<ObjectSummary> {
        let mut selection = select(
            cells,
            query,
            Arc::new(CachedResources::default()),
            self.metrics.clone(),
        );
        let items = selection.cells.iter().map(ObjectSummary::from_cell).collect();
        ResourceList {
            list_meta: ListMeta {
                total_items: selection.total_items,
            },
            items,
            cumulative_metrics: selection.metrics.metrics_or_empty().await,
        }
    }
}
