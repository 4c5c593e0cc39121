// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Concurrent resource fetching
//!
//! Every requested collection is fetched by its own tokio task and delivered
//! through a oneshot slot. Siblings never wait on each other: the consumer
//! awaits each channel in whatever order it needs, and a failed fetch only
//! surfaces when its own channel is received.

use k8s_openapi::api::{
    batch::v1::{CronJob, Job},
    core::v1::{
        ConfigMap, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
        Service,
    },
    networking::v1::Ingress,
    storage::v1::StorageClass,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::selectors::non_normal_events_selector;
use super::{ClusterClient, FetchError, ListOptions, NamespaceQuery, ResourceKind};

/// Single-use delivery slot for one asynchronous fetch
///
/// The spawned task writes exactly once; `recv` consumes the channel so the
/// value can be read at most once. Dropping an unread channel is fine: the
/// task's send simply fails and the task ends.
pub struct ResourceChannel<T> {
    kind: ResourceKind,
    rx: oneshot::Receiver<Result<T, FetchError>>,
}

impl<T> ResourceChannel<T> {
    /// Wait for the fetch to finish
    pub async fn recv(self) -> Result<T, FetchError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Interrupted { kind: self.kind }),
        }
    }

    /// Wait for the fetch, treating "kind not served" as an empty result
    ///
    /// Clusters without e.g. the batch API answer list calls with 404.
    pub async fn recv_optional(self) -> Result<T, FetchError>
    where
        T: Default,
    {
        let kind = self.kind;
        match self.recv().await {
            Err(e) if e.is_not_found() => {
                debug!(kind = %kind, "Resource kind not served, using empty list");
                Ok(T::default())
            }
            other => other,
        }
    }

    fn spawn<F>(kind: ResourceKind, fetch: F) -> Self
    where
        T: Send + 'static,
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = fetch.await;
            if tx.send(result).is_err() {
                trace!(kind = %kind, "Receiver dropped before fetch completed");
            }
        });
        Self { kind, rx }
    }
}

impl<T> ResourceChannel<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Spawn a list fetch of `kind` scoped by `namespaces`
    pub fn list(
        client: Arc<dyn ClusterClient>,
        kind: ResourceKind,
        namespaces: &NamespaceQuery,
        options: ListOptions,
    ) -> Self {
        let namespaces = namespaces.clone();
        Self::spawn(kind, async move {
            let values = list_values(client.as_ref(), kind, &namespaces, &options).await?;
            values
                .into_iter()
                .map(|value| decode(kind, value))
                .collect()
        })
    }
}

impl<T> ResourceChannel<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Spawn a fetch of one named object
    pub fn get(
        client: Arc<dyn ClusterClient>,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Self {
        let namespace = namespace.map(String::from);
        let name = name.to_string();
        Self::spawn(kind, async move {
            let value = client.get(kind, namespace.as_deref(), &name).await?;
            decode(kind, value)
        })
    }
}

async fn list_values(
    client: &dyn ClusterClient,
    kind: ResourceKind,
    namespaces: &NamespaceQuery,
    options: &ListOptions,
) -> Result<Vec<Value>, FetchError> {
    if !kind.is_namespaced() {
        return client.list(kind, None, options).await;
    }

    let items = client
        .list(kind, namespaces.to_request_param(), options)
        .await?;

    // Multiple namespaces are fetched cluster-wide, filter here
    if let NamespaceQuery::List(_) = namespaces {
        let before = items.len();
        let filtered: Vec<Value> = items
            .into_iter()
            .filter(|item| {
                item["metadata"]["namespace"]
                    .as_str()
                    .is_some_and(|ns| namespaces.matches(ns))
            })
            .collect();
        trace!(
            kind = %kind,
            before = before,
            after = filtered.len(),
            "Filtered multi-namespace list"
        );
        return Ok(filtered);
    }

    Ok(items)
}

fn decode<T: DeserializeOwned>(kind: ResourceKind, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|source| FetchError::Decode { kind, source })
}

macro_rules! resource_channels {
    ($($field:ident, $with:ident: $kind:ident => $ty:ty;)*) => {
        /// The set of collections one aggregate request needs
        ///
        /// Built per request with the `with_*` methods, which spawn the fetches
        /// immediately. Each collection is then taken exactly once.
        pub struct ResourceChannels {
            client: Arc<dyn ClusterClient>,
            namespace_query: NamespaceQuery,
            options: ListOptions,
            $($field: Option<ResourceChannel<Vec<$ty>>>,)*
        }

        impl ResourceChannels {
            pub fn new(client: Arc<dyn ClusterClient>, namespace_query: NamespaceQuery) -> Self {
                Self {
                    client,
                    namespace_query,
                    options: ListOptions::default(),
                    $($field: None,)*
                }
            }

            /// Options applied to every fetch spawned after this call
            pub fn with_list_options(mut self, options: ListOptions) -> Self {
                self.options = options;
                self
            }

            $(
                pub fn $with(mut self) -> Self {
                    self.$field = Some(ResourceChannel::list(
                        self.client.clone(),
                        ResourceKind::$kind,
                        &self.namespace_query,
                        self.options.clone(),
                    ));
                    self
                }

                pub fn $field(&mut self) -> Result<ResourceChannel<Vec<$ty>>, FetchError> {
                    self.$field
                        .take()
                        .ok_or(FetchError::NotRequested { kind: ResourceKind::$kind })
                }
            )*
        }
    };
}

resource_channels! {
    pods, with_pods: Pod => Pod;
    events, with_events: Event => Event;
    jobs, with_jobs: Job => Job;
    cron_jobs, with_cron_jobs: CronJob => CronJob;
    services, with_services: Service => Service;
    ingresses, with_ingresses: Ingress => Ingress;
    config_maps, with_config_maps: ConfigMap => ConfigMap;
    secrets, with_secrets: Secret => Secret;
    persistent_volume_claims, with_persistent_volume_claims: PersistentVolumeClaim => PersistentVolumeClaim;
    persistent_volumes, with_persistent_volumes: PersistentVolume => PersistentVolume;
    namespaces, with_namespaces: Namespace => Namespace;
    nodes, with_nodes: Node => Node;
    storage_classes, with_storage_classes: StorageClass => StorageClass;
}

impl ResourceChannels {
    /// Request events with `Normal` ones filtered out by the API server
    ///
    /// Options set earlier still apply to the fetches spawned afterwards.
    pub fn with_warning_events(self) -> Self {
        let options = self.options.clone();
        self.with_list_options(ListOptions::with_fields(non_normal_events_selector()))
            .with_events()
            .with_list_options(options)
    }
}
