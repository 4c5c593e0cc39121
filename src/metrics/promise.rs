// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use super::{Metric, MetricError};
use crate::kubernetes::ResourceKind;

/// Resolved metrics of one selection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSet {
    /// One series per (selected resource with data, metric name)
    pub resource_metrics: Vec<Metric>,
    /// One series per (metric name, aggregation) across the selection
    pub cumulative: Vec<Metric>,
}

impl MetricSet {
    /// Series of `metric_name` for one resource, if it had data
    pub fn for_resource(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        metric_name: &str,
    ) -> Option<&Metric> {
        self.resource_metrics.iter().find(|m| {
            m.metric_name == metric_name
                && m.resources.first().is_some_and(|r| {
                    r.kind == kind && r.name == name && r.namespace.as_deref() == namespace
                })
        })
    }
}

/// Deferred result of a background metric fetch
///
/// Resolves at most once: the first `get_*` call awaits the background task
/// and caches its outcome, later calls return the cached value. Dropping an
/// unresolved promise is always safe; the task finishes and its result is
/// discarded.
pub struct MetricPromise {
    receiver: Option<oneshot::Receiver<Result<MetricSet, MetricError>>>,
    resolved: Option<Result<MetricSet, MetricError>>,
}

impl MetricPromise {
    /// An already-resolved promise with no metrics
    pub fn empty() -> Self {
        Self {
            receiver: None,
            resolved: Some(Ok(MetricSet::default())),
        }
    }

    /// Run `fetch` on a background task
    pub fn spawn<F>(fetch: F) -> Self
    where
        F: Future<Output = Result<MetricSet, MetricError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if tx.send(fetch.await).is_err() {
                trace!("Metric promise dropped before resolution");
            }
        });
        Self {
            receiver: Some(rx),
            resolved: None,
        }
    }

    #[cfg(test)]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    async fn resolve(&mut self) -> &Result<MetricSet, MetricError> {
        if let Some(rx) = self.receiver.take() {
            let result = rx.await.unwrap_or(Err(MetricError::TaskFailed));
            self.resolved = Some(result);
        }
        self.resolved.get_or_insert_with(|| Ok(MetricSet::default()))
    }

    /// Per-resource and cumulative metrics
    pub async fn get_metric_set(&mut self) -> Result<&MetricSet, MetricError> {
        self.resolve().await.as_ref().map_err(Clone::clone)
    }

    /// Cumulative metrics of the selection
    pub async fn get_metrics(&mut self) -> Result<Vec<Metric>, MetricError> {
        self.get_metric_set().await.map(|set| set.cumulative.clone())
    }

    /// Cumulative metrics, or nothing when the fetch failed
    pub async fn metrics_or_empty(&mut self) -> Vec<Metric> {
        match self.get_metrics().await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "Metric fetch failed, continuing without metrics");
                Vec::new()
            }
        }
    }
}
