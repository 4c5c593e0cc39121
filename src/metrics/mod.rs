// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Metric overlay for selected resources
//!
//! Metrics are best effort. The overlay runs in the background after a
//! selection and its failures never reach the resource list itself.

mod aggregate;
mod client;
mod overlay;
mod promise;
mod quantity;
#[cfg(test)]
pub mod testing;

pub use aggregate::{aggregate, sum_series};
pub use client::{KubeMetricsClient, MetricsClient};
pub(crate) use overlay::fetch_metric_set;
pub use promise::{MetricPromise, MetricSet};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::kubernetes::ResourceKind;

/// CPU usage in millicores
pub const CPU_USAGE: &str = "cpu/usage_rate";
/// Memory usage in bytes
pub const MEMORY_USAGE: &str = "memory/usage";

/// Metric lookup key of one selected resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    pub namespace: Option<String>,
    pub kind: ResourceKind,
    pub name: String,
    /// Pod selector for controllers; None for pods and nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

/// Concrete object the metrics backend reports on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricSource {
    Pod { namespace: String, name: String },
    Node { name: String },
}

impl fmt::Display for MetricSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricSource::Pod { namespace, name } => write!(f, "pod {}/{}", namespace, name),
            MetricSource::Node { name } => write!(f, "node {}", name),
        }
    }
}

/// A single sample: unix timestamp in seconds and value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    #[serde(rename = "x")]
    pub timestamp: i64,
    #[serde(rename = "y")]
    pub value: f64,
}

/// Samples ordered by timestamp
pub type DataPoints = Vec<DataPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Sum,
    Average,
    Max,
    Min,
}

impl AggregationMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sum" => Some(AggregationMode::Sum),
            "average" | "avg" => Some(AggregationMode::Average),
            "max" => Some(AggregationMode::Max),
            "min" => Some(AggregationMode::Min),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::Sum => "sum",
            AggregationMode::Average => "average",
            AggregationMode::Max => "max",
            AggregationMode::Min => "min",
        }
    }

    /// Combine the values of one time bucket; None when there are none
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            AggregationMode::Sum => values.iter().sum(),
            AggregationMode::Average => values.iter().sum::<f64>() / values.len() as f64,
            AggregationMode::Max => values.iter().copied().fold(f64::MIN, f64::max),
            AggregationMode::Min => values.iter().copied().fold(f64::MAX, f64::min),
        })
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named series, either for a single resource or aggregated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub metric_name: String,
    pub aggregation: AggregationMode,
    pub data_points: DataPoints,
    /// Resources whose data went into this series
    pub resources: Vec<ResourceSelector>,
}

/// Metric retrieval failures; only ever surfaced through a MetricPromise
#[derive(Debug, Clone, Error)]
pub enum MetricError {
    #[error("unsupported metric '{0}'")]
    Unsupported(String),

    #[error("metrics API error for {source_name} ({code}): {message}")]
    Api {
        source_name: String,
        code: u16,
        message: String,
    },

    #[error("metrics transport error for {source_name}: {message}")]
    Transport { source_name: String, message: String },

    #[error("invalid metrics payload for {source_name}: {message}")]
    Decode { source_name: String, message: String },

    #[error("metric task ended without a result")]
    TaskFailed,
}
