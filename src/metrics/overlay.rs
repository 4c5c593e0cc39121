// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::{
    DataPoints, Metric, MetricError, MetricSet, MetricSource, MetricsClient, ResourceSelector,
    aggregate, sum_series,
};
use crate::correlator::filter_namespaced_pods_by_label_selector;
use crate::dataselect::{CachedResources, MetricQuery};
use crate::kubernetes::ResourceKind;

/// Concrete metric sources behind one selected resource
///
/// Pods and nodes map to themselves. Pod owners map to the cached pods their
/// selector matches; anything else has no metrics.
pub fn resolve_sources(selector: &ResourceSelector, cached: &CachedResources) -> Vec<MetricSource> {
    match selector.kind {
        ResourceKind::Pod => vec![MetricSource::Pod {
            namespace: selector.namespace.clone().unwrap_or_default(),
            name: selector.name.clone(),
        }],
        ResourceKind::Node => vec![MetricSource::Node {
            name: selector.name.clone(),
        }],
        _ => {
            let (Some(namespace), Some(label_selector)) = (&selector.namespace, &selector.selector)
            else {
                return Vec::new();
            };
            filter_namespaced_pods_by_label_selector(&cached.pods, namespace, label_selector)
                .into_iter()
                .filter_map(|pod| {
                    Some(MetricSource::Pod {
                        namespace: pod.metadata.namespace?,
                        name: pod.metadata.name?,
                    })
                })
                .collect()
        }
    }
}

/// Series of one metric for one selected resource, summed over its sources
async fn resource_metric(
    client: &dyn MetricsClient,
    selector: &ResourceSelector,
    sources: &[MetricSource],
    metric_name: &str,
) -> Result<Option<Metric>, MetricError> {
    let fetched = try_join_all(
        sources
            .iter()
            .map(|source| client.fetch_metric(source, metric_name)),
    )
    .await?;

    let present: Vec<DataPoints> = fetched.into_iter().flatten().collect();
    if present.is_empty() {
        debug!(
            kind = %selector.kind,
            name = %selector.name,
            metric = %metric_name,
            "No metric data for resource"
        );
        return Ok(None);
    }

    Ok(Some(Metric {
        metric_name: metric_name.to_string(),
        aggregation: super::AggregationMode::Sum,
        data_points: sum_series(&present, client.resolution()),
        resources: vec![selector.clone()],
    }))
}

/// Per-resource and cumulative metrics for the selected resources
pub(crate) async fn fetch_metric_set(
    selectors: Vec<ResourceSelector>,
    query: MetricQuery,
    cached: Arc<CachedResources>,
    client: Arc<dyn MetricsClient>,
) -> Result<MetricSet, MetricError> {
    let start = Instant::now();
    let resolved: Vec<(ResourceSelector, Vec<MetricSource>)> = selectors
        .into_iter()
        .map(|selector| {
            let sources = resolve_sources(&selector, &cached);
            (selector, sources)
        })
        .collect();

    let requests = resolved.iter().flat_map(|(selector, sources)| {
        query
            .metric_names
            .iter()
            .map(|name| resource_metric(client.as_ref(), selector, sources, name))
    });
    let resource_metrics: Vec<Metric> = try_join_all(requests).await?.into_iter().flatten().collect();

    let cumulative = aggregate(&resource_metrics, &query, client.resolution());
    debug!(
        series = resource_metrics.len(),
        cumulative = cumulative.len(),
        "Resolved metric set"
    );
    client.resolved(resource_metrics.len(), start.elapsed());
    Ok(MetricSet {
        resource_metrics,
        cumulative,
    })
}
