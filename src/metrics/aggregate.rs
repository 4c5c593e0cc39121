// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeMap;
use std::time::Duration;

use super::{AggregationMode, DataPoint, DataPoints, Metric};
use crate::dataselect::MetricQuery;

fn bucket_of(timestamp: i64, resolution: Duration) -> i64 {
    let width = resolution.as_secs() as i64;
    if width <= 0 {
        timestamp
    } else {
        timestamp - timestamp.rem_euclid(width)
    }
}

/// One value per bucket for a single series (mean of its samples in the bucket)
fn bucketed(points: &[DataPoint], resolution: Duration) -> BTreeMap<i64, f64> {
    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for point in points {
        let entry = buckets
            .entry(bucket_of(point.timestamp, resolution))
            .or_insert((0.0, 0));
        entry.0 += point.value;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(ts, (sum, count))| (ts, sum / count as f64))
        .collect()
}

/// Combine series across buckets with `mode`
///
/// A bucket only sees the series that have a value in it, so a resource
/// without data never drags an average down.
fn combine<'a>(
    series: impl IntoIterator<Item = &'a DataPoints>,
    mode: AggregationMode,
    resolution: Duration,
) -> DataPoints {
    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for points in series {
        for (ts, value) in bucketed(points, resolution) {
            buckets.entry(ts).or_default().push(value);
        }
    }
    buckets
        .into_iter()
        .filter_map(|(timestamp, values)| {
            mode.apply(&values)
                .map(|value| DataPoint { timestamp, value })
        })
        .collect()
}

/// Point-wise sum of several series, e.g. all pods of one controller
pub fn sum_series(series: &[DataPoints], resolution: Duration) -> DataPoints {
    combine(series, AggregationMode::Sum, resolution)
}

/// Cumulative series per requested metric and aggregation
///
/// `resource_metrics` holds only resources that had data; every requested
/// combination yields one metric, with no points when nothing had data.
pub fn aggregate(
    resource_metrics: &[Metric],
    query: &MetricQuery,
    resolution: Duration,
) -> Vec<Metric> {
    let mut cumulative = Vec::with_capacity(query.metric_names.len() * query.aggregations.len());
    for metric_name in &query.metric_names {
        let present: Vec<&Metric> = resource_metrics
            .iter()
            .filter(|m| &m.metric_name == metric_name)
            .collect();

        for &mode in &query.aggregations {
            cumulative.push(Metric {
                metric_name: metric_name.clone(),
                aggregation: mode,
                data_points: combine(present.iter().map(|m| &m.data_points), mode, resolution),
                resources: present
                    .iter()
                    .flat_map(|m| m.resources.iter().cloned())
                    .collect(),
            });
        }
    }
    cumulative
}
