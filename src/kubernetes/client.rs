// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::{FetchError, ListOptions, ResourceKind};
use crate::progress::ProgressHandle;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Cluster resource client consumed by the aggregation pipeline.
///
/// Items come back as JSON values; the channel layer decodes them into the
/// typed k8s-openapi structs. One `list` call is one logical request, even if
/// the implementation pages through the result internally.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List all objects of `kind`, cluster-wide when `namespace` is None
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, FetchError>;

    /// Get one named object of `kind`
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, FetchError>;
}

/// kube-backed cluster client for a single kubeconfig context
pub struct KubeClusterClient {
    client: Client,
    context: String,
    /// Progress reporter for fetch status updates
    progress: ProgressHandle,
}

impl KubeClusterClient {
    /// Connect using the given kubeconfig context, the kubeconfig default,
    /// or the in-cluster service account when no kubeconfig is available
    pub async fn connect(context: Option<&str>, progress: ProgressHandle) -> Result<Self> {
        let label = context.unwrap_or("default").to_string();
        progress.connecting(&label);
        let start = Instant::now();

        let mut config = match context {
            Some(ctx) => {
                let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;
                if !kubeconfig.contexts.iter().any(|c| c.name == ctx) {
                    anyhow::bail!("Context '{}' not found in kubeconfig", ctx);
                }
                Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(ctx.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .with_context(|| format!("Failed to load kubeconfig for context '{}'", ctx))?
            }
            None => Config::infer()
                .await
                .context("Failed to infer Kubernetes configuration")?,
        };

        // Set timeouts for reliability
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", label))?;

        progress.connected(&label, start.elapsed().as_millis() as u64);
        info!(context = %label, "Connected to cluster");

        Ok(Self {
            client,
            context: label,
            progress,
        })
    }

    /// Underlying kube client (shared with the metrics client)
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Create API handle based on resource scope
    fn api_for(&self, kind: ResourceKind, namespace: Option<&str>) -> (Api<DynamicObject>, &'static str) {
        let ar = &kind.info().api_resource;
        let client = self.client.clone();
        if kind.is_namespaced() {
            match namespace {
                Some(ns) => (Api::namespaced_with(client, ns, ar), "namespaced"),
                None => (Api::all_with(client, ar), "all-namespaces"),
            }
        } else {
            (Api::all_with(client, ar), "cluster-scoped")
        }
    }

    /// List resources with pagination and retry logic
    /// Uses continue tokens to fetch all pages
    async fn list_all_pages(
        &self,
        api: &Api<DynamicObject>,
        base_params: &ListParams,
        kind: ResourceKind,
    ) -> Result<Vec<DynamicObject>, FetchError> {
        let mut all_items: Vec<DynamicObject> = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = base_params.clone().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = self.list_page_with_retry(api, &params, kind).await?;

            let items_count = list.items.len();
            all_items.extend(list.items);
            page_count += 1;

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!(
                        kind = %kind,
                        context = %self.context,
                        page = page_count,
                        items_this_page = items_count,
                        total_so_far = all_items.len(),
                        "Fetched page, continuing"
                    );
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        if page_count > 1 {
            debug!(
                kind = %kind,
                context = %self.context,
                pages = page_count,
                total_items = all_items.len(),
                "Pagination complete"
            );
        }

        Ok(all_items)
    }

    /// Fetch a single page with retry logic
    async fn list_page_with_retry(
        &self,
        api: &Api<DynamicObject>,
        params: &ListParams,
        kind: ResourceKind,
    ) -> Result<kube::api::ObjectList<DynamicObject>, FetchError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match api.list(params).await {
                Ok(list) => return Ok(list),
                Err(e) => {
                    if Self::is_retryable_error(&e) {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                        warn!(
                            kind = %kind,
                            context = %self.context,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Retryable error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(e);
                    } else {
                        debug!(
                            kind = %kind,
                            context = %self.context,
                            error = %e,
                            "Non-retryable error"
                        );
                        return Err(FetchError::from_kube(kind, e));
                    }
                }
            }
        }

        Err(FetchError::Transport {
            kind,
            message: format!(
                "Failed after {} retries: {}",
                MAX_RETRIES,
                last_error.map(|e| e.to_string()).unwrap_or_default()
            ),
        })
    }

    /// Check if an error is retryable (transient failures)
    fn is_retryable_error(err: &kube::Error) -> bool {
        match err {
            // Network/connection errors are retryable
            kube::Error::HyperError(_) => true,
            // API errors: retry on 429 (rate limit), 503 (unavailable), 504 (timeout)
            kube::Error::Api(api_err) => {
                matches!(api_err.code, 429 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Build ListParams from list options (label selectors, field selectors)
    fn build_list_params(options: &ListOptions) -> ListParams {
        let mut params = ListParams::default();

        if let Some(ref label_sel) = options.label_selector {
            params = params.labels(label_sel);
        }

        if let Some(ref field_sel) = options.field_selector {
            params = params.fields(field_sel);
        }

        trace!(
            label_selector = ?options.label_selector,
            field_selector = ?options.field_selector,
            "Built ListParams"
        );

        params
    }

    /// Serialize a dynamic object, injecting apiVersion and kind
    /// (K8s list API doesn't include these per-item)
    fn to_value(kind: ResourceKind, object: DynamicObject) -> Result<Value, FetchError> {
        let mut value =
            serde_json::to_value(object).map_err(|source| FetchError::Decode { kind, source })?;
        if let Value::Object(ref mut map) = value {
            let ar = &kind.info().api_resource;
            map.insert(
                "apiVersion".to_string(),
                Value::String(ar.api_version.clone()),
            );
            map.insert("kind".to_string(), Value::String(ar.kind.clone()));
        }
        Ok(value)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, FetchError> {
        let (api, scope) = self.api_for(kind, namespace);
        debug!(
            kind = %kind,
            context = %self.context,
            namespace = ?namespace,
            scope = %scope,
            "Fetching K8s resource"
        );

        self.progress.fetch_started(kind);
        let start = Instant::now();

        let params = Self::build_list_params(options);
        let items = self.list_all_pages(&api, &params, kind).await?;

        self.progress
            .fetch_complete(kind, items.len(), start.elapsed().as_millis() as u64);

        items
            .into_iter()
            .map(|item| Self::to_value(kind, item))
            .collect()
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, FetchError> {
        let (api, _) = self.api_for(kind, namespace);
        debug!(
            kind = %kind,
            context = %self.context,
            namespace = ?namespace,
            name = %name,
            "Getting K8s resource"
        );

        let object = api
            .get(name)
            .await
            .map_err(|e| FetchError::from_kube(kind, e))?;
        Self::to_value(kind, object)
    }
}
