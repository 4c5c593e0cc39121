// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Category overviews: cluster, discovery and config
//!
//! A category spawns every collection it shows at once and then builds its
//! lists concurrently. The first failing list fails the whole category and
//! the remaining results are dropped.

use serde::Serialize;
use tracing::{info, warn};

use super::{Dashboard, ObjectSummary, ResourceList, WorkloadError};
use crate::dataselect::{DataSelectQuery, ResourceCell, to_cells};
use crate::kubernetes::{FetchError, NamespaceQuery, ResourceChannel};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub namespaces: ResourceList<ObjectSummary>,
    pub nodes: ResourceList<ObjectSummary>,
    pub persistent_volumes: ResourceList<ObjectSummary>,
    pub storage_classes: ResourceList<ObjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub services: ResourceList<ObjectSummary>,
    pub ingresses: ResourceList<ObjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResources {
    pub config_maps: ResourceList<ObjectSummary>,
    pub secrets: ResourceList<ObjectSummary>,
    pub persistent_volume_claims: ResourceList<ObjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub cluster: Cluster,
    pub discovery: Discovery,
    pub config: ConfigResources,
}

impl Dashboard {
    async fn summary_list<T>(
        &self,
        channel: Result<ResourceChannel<Vec<T>>, FetchError>,
        optional: bool,
        query: &DataSelectQuery,
    ) -> Result<ResourceList<ObjectSummary>, WorkloadError>
    where
        T: Into<ResourceCell>,
    {
        let channel = channel?;
        let items = if optional {
            channel.recv_optional().await?
        } else {
            channel.recv().await?
        };
        Ok(self.summarize(to_cells(items), query).await)
    }

    /// Namespaces, nodes, persistent volumes and storage classes
    pub async fn cluster(&self, query: &DataSelectQuery) -> Result<Cluster, WorkloadError> {
        info!("Getting cluster category");
        let mut channels = self
            .channels(&NamespaceQuery::All)
            .with_namespaces()
            .with_nodes()
            .with_persistent_volumes()
            .with_storage_classes();

        let (namespaces, nodes, persistent_volumes, storage_classes) = tokio::try_join!(
            self.summary_list(channels.namespaces(), false, query),
            self.summary_list(channels.nodes(), false, query),
            self.summary_list(channels.persistent_volumes(), false, query),
            self.summary_list(channels.storage_classes(), true, query),
        )?;

        Ok(Cluster {
            namespaces,
            nodes,
            persistent_volumes,
            storage_classes,
        })
    }

    /// Services and ingresses
    pub async fn discovery(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<Discovery, WorkloadError> {
        info!(namespaces = ?namespaces, "Getting discovery category");
        let mut channels = self
            .channels(namespaces)
            .with_services()
            .with_ingresses();

        let (services, ingresses) = tokio::try_join!(
            self.summary_list(channels.services(), false, query),
            self.summary_list(channels.ingresses(), true, query),
        )?;

        Ok(Discovery {
            services,
            ingresses,
        })
    }

    /// Config maps, secrets and persistent volume claims
    pub async fn config(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<ConfigResources, WorkloadError> {
        info!(namespaces = ?namespaces, "Getting config category");
        let mut channels = self
            .channels(namespaces)
            .with_config_maps()
            .with_secrets()
            .with_persistent_volume_claims();

        let (config_maps, secrets, persistent_volume_claims) = tokio::try_join!(
            self.summary_list(channels.config_maps(), false, query),
            self.summary_list(channels.secrets(), false, query),
            self.summary_list(channels.persistent_volume_claims(), false, query),
        )?;

        Ok(ConfigResources {
            config_maps,
            secrets,
            persistent_volume_claims,
        })
    }

    /// All three categories, joined first-error-wins
    pub async fn overview(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<Overview, WorkloadError> {
        let (cluster, discovery, config) = tokio::try_join!(
            self.cluster(query),
            self.discovery(namespaces, query),
            self.config(namespaces, query),
        )
        .inspect_err(|e| {
            if let WorkloadError::Fetch(fetch) = e {
                warn!(kind = %fetch.kind(), error = %fetch, "Overview aborted by failed fetch");
            }
        })?;
        Ok(Overview {
            cluster,
            discovery,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::ResourceKind;
    use crate::kubernetes::testing::{self, MockClusterClient};
    use std::sync::Arc;
    use std::time::Duration;

    fn populated() -> MockClusterClient {
        MockClusterClient::new()
            .with_items(
                ResourceKind::Namespace,
                vec![testing::namespace("default"), testing::namespace("kube-system")],
            )
            .with_items(ResourceKind::Node, vec![testing::node("n1")])
            .with_items(
                ResourceKind::Service,
                vec![testing::service("default", "web", &[("app", "web")])],
            )
            .with_items(ResourceKind::ConfigMap, vec![testing::config_map("default", "settings")])
    }

    #[tokio::test]
    async fn test_overview_collects_categories() {
        let dashboard = Dashboard::new(Arc::new(populated()));
        let overview = dashboard
            .overview(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await
            .unwrap();

        assert_eq!(overview.cluster.namespaces.list_meta.total_items, 2);
        assert_eq!(overview.cluster.nodes.items[0].status, "Ready");
        assert!(overview.cluster.storage_classes.items.is_empty());
        assert_eq!(overview.discovery.services.items[0].name, "web");
        assert_eq!(overview.config.config_maps.items[0].name, "settings");
    }

    #[tokio::test]
    async fn test_unserved_ingresses_are_empty() {
        let mock = populated().not_found(ResourceKind::Ingress);
        let discovery = Dashboard::new(Arc::new(mock))
            .discovery(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await
            .unwrap();
        assert_eq!(discovery.services.items.len(), 1);
        assert!(discovery.ingresses.items.is_empty());
    }

    #[tokio::test]
    async fn test_first_error_wins_without_waiting() {
        let mock = populated()
            .api_error(ResourceKind::Secret, 403)
            .delayed(ResourceKind::ConfigMap, Duration::from_secs(30));
        let dashboard = Dashboard::new(Arc::new(mock));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            dashboard.overview(&NamespaceQuery::All, &DataSelectQuery::no_select()),
        )
        .await
        .expect("a failing category should not wait for slow siblings");

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            WorkloadError::Fetch(FetchError::Api { code: 403, .. })
        ));
        if let WorkloadError::Fetch(fetch) = err {
            assert_eq!(fetch.kind(), ResourceKind::Secret);
        }
    }
}
