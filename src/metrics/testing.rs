// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! In-process metrics backend for unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{DataPoints, MetricError, MetricSource, MetricsClient};

#[derive(Default)]
pub struct MockMetricsClient {
    series: HashMap<(MetricSource, String), DataPoints>,
    failing: HashSet<MetricSource>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockMetricsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, source: MetricSource, metric_name: &str, points: DataPoints) -> Self {
        self.series.insert((source, metric_name.to_string()), points);
        self
    }

    /// Every fetch for `source` fails with an API error
    pub fn failing(mut self, source: MetricSource) -> Self {
        self.failing.insert(source);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsClient for MockMetricsClient {
    async fn fetch_metric(
        &self,
        source: &MetricSource,
        metric_name: &str,
    ) -> Result<Option<DataPoints>, MetricError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(source) {
            return Err(MetricError::Api {
                source_name: source.to_string(),
                code: 500,
                message: "mock failure".to_string(),
            });
        }
        Ok(self
            .series
            .get(&(source.clone(), metric_name.to_string()))
            .cloned())
    }

    fn resolution(&self) -> Duration {
        Duration::from_secs(60)
    }
}
