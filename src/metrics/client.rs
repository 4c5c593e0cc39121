// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use async_trait::async_trait;
use chrono::DateTime;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use kube::{Api, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use super::{CPU_USAGE, DataPoint, DataPoints, MEMORY_USAGE, MetricError, MetricSource};
use super::quantity::parse_quantity;
use crate::progress::ProgressHandle;

/// Source of per-resource metric series
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// Series of `metric_name` for one source, or None when the backend has
    /// no data for it
    async fn fetch_metric(
        &self,
        source: &MetricSource,
        metric_name: &str,
    ) -> Result<Option<DataPoints>, MetricError>;

    /// Width of the time buckets series are aligned to before aggregation
    fn resolution(&self) -> Duration;

    /// Called once the metrics of a selection have been fetched
    fn resolved(&self, _series: usize, _elapsed: Duration) {}
}

/// Reads current usage from the `metrics.k8s.io` API
///
/// The resource metrics API only serves the latest sample, so every series
/// has a single point at the sample's timestamp.
pub struct KubeMetricsClient {
    client: Client,
    resolution: Duration,
    progress: ProgressHandle,
}

fn metrics_api_resource(kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: "metrics.k8s.io".to_string(),
        version: "v1beta1".to_string(),
        api_version: "metrics.k8s.io/v1beta1".to_string(),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

impl KubeMetricsClient {
    pub fn new(client: Client, resolution: Duration, progress: ProgressHandle) -> Self {
        Self {
            client,
            resolution,
            progress,
        }
    }

    async fn fetch_object(&self, source: &MetricSource) -> Result<Option<DynamicObject>, MetricError> {
        let (api, name): (Api<DynamicObject>, &str) = match source {
            MetricSource::Pod { namespace, name } => (
                Api::namespaced_with(
                    self.client.clone(),
                    namespace,
                    &metrics_api_resource("PodMetrics", "pods"),
                ),
                name,
            ),
            MetricSource::Node { name } => (
                Api::all_with(
                    self.client.clone(),
                    &metrics_api_resource("NodeMetrics", "nodes"),
                ),
                name,
            ),
        };

        match api.get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!(source = %source, "No metrics available");
                Ok(None)
            }
            Err(kube::Error::Api(err)) => Err(MetricError::Api {
                source_name: source.to_string(),
                code: err.code,
                message: err.message,
            }),
            Err(e) => Err(MetricError::Transport {
                source_name: source.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Usage entries of a metrics object: all containers of a pod, or the node
fn usage_entries(source: &MetricSource, data: &Value) -> Vec<Value> {
    match source {
        MetricSource::Pod { .. } => data["containers"]
            .as_array()
            .map(|containers| containers.iter().map(|c| c["usage"].clone()).collect())
            .unwrap_or_default(),
        MetricSource::Node { .. } => vec![data["usage"].clone()],
    }
}

/// Extract one sample from a PodMetrics/NodeMetrics payload
pub(crate) fn sample_from_metrics(
    source: &MetricSource,
    data: &Value,
    metric_name: &str,
) -> Result<DataPoint, MetricError> {
    let (field, scale) = match metric_name {
        CPU_USAGE => ("cpu", 1000.0),
        MEMORY_USAGE => ("memory", 1.0),
        other => return Err(MetricError::Unsupported(other.to_string())),
    };

    let decode_err = |message: String| MetricError::Decode {
        source_name: source.to_string(),
        message,
    };

    let timestamp = data["timestamp"]
        .as_str()
        .ok_or_else(|| decode_err("missing timestamp".to_string()))
        .and_then(|ts| {
            DateTime::parse_from_rfc3339(ts).map_err(|e| decode_err(format!("timestamp: {e}")))
        })?
        .timestamp();

    let mut total = 0.0;
    for usage in usage_entries(source, data) {
        let raw = usage[field]
            .as_str()
            .ok_or_else(|| decode_err(format!("missing {field} usage")))?;
        total += parse_quantity(raw).ok_or_else(|| decode_err(format!("bad quantity '{raw}'")))?;
    }

    Ok(DataPoint {
        timestamp,
        value: total * scale,
    })
}

#[async_trait]
impl MetricsClient for KubeMetricsClient {
    async fn fetch_metric(
        &self,
        source: &MetricSource,
        metric_name: &str,
    ) -> Result<Option<DataPoints>, MetricError> {
        if metric_name != CPU_USAGE && metric_name != MEMORY_USAGE {
            return Err(MetricError::Unsupported(metric_name.to_string()));
        }

        let Some(object) = self.fetch_object(source).await? else {
            return Ok(None);
        };
        let point = sample_from_metrics(source, &object.data, metric_name)?;
        trace!(source = %source, metric = %metric_name, value = point.value, "Fetched metric sample");
        Ok(Some(vec![point]))
    }

    fn resolution(&self) -> Duration {
        self.resolution
    }

    fn resolved(&self, series: usize, elapsed: Duration) {
        self.progress
            .metrics_resolved(series, elapsed.as_millis() as u64);
    }
}
