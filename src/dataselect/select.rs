// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::cell::{ResourceCell, from_cells, to_cells};
use super::query::{
    DataSelectQuery, FilterBy, FilterMode, FilterQuery, MetricQuery, PaginationQuery,
    SortDirection, SortQuery,
};
use super::CachedResources;
use crate::metrics::{MetricPromise, MetricsClient};

/// Outcome of a selection over cells
pub struct DataSelection {
    /// The requested page, in sort order
    pub cells: Vec<ResourceCell>,
    /// Number of cells that passed the filter, before pagination
    pub total_items: usize,
    /// Metrics of the cells on this page
    pub metrics: MetricPromise,
}

/// Outcome of a selection over a typed list
pub struct TypedSelection<T> {
    pub items: Vec<T>,
    pub total_items: usize,
    pub metrics: MetricPromise,
}

fn term_matches(cell: &ResourceCell, term: &FilterBy) -> bool {
    let value = cell.property(&term.property);
    match term.mode {
        FilterMode::Contains => value.contains(&term.value),
        FilterMode::Exact => value.equals(&term.value),
    }
}

fn filter(cells: Vec<ResourceCell>, query: &FilterQuery) -> Vec<ResourceCell> {
    if query.is_empty() {
        return cells;
    }
    cells
        .into_iter()
        .filter(|cell| query.filter_by.iter().all(|term| term_matches(cell, term)))
        .collect()
}

fn compare_cells(a: &ResourceCell, b: &ResourceCell, query: &SortQuery) -> Ordering {
    for key in &query.sort_by {
        let ordering = a.property(&key.property).compare(&b.property(&key.property));
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn paginate(mut cells: Vec<ResourceCell>, query: &PaginationQuery) -> Vec<ResourceCell> {
    let range = query.range(cells.len());
    cells.truncate(range.end);
    cells.drain(..range.start);
    cells
}

fn dispatch_metrics(
    cells: &[ResourceCell],
    query: &MetricQuery,
    cached: Arc<CachedResources>,
    client: Option<Arc<dyn MetricsClient>>,
) -> MetricPromise {
    let Some(client) = client else {
        return MetricPromise::empty();
    };
    if query.is_empty() || cells.is_empty() {
        return MetricPromise::empty();
    }

    let selectors = cells.iter().map(ResourceCell::resource_selector).collect();
    MetricPromise::spawn(crate::metrics::fetch_metric_set(
        selectors,
        query.clone(),
        cached,
        client,
    ))
}

/// Filter, sort, paginate, then start the metric fetch for the page
///
/// Never blocks on metrics: with a metric query and a client, the returned
/// promise is backed by a background task, which requires a Tokio runtime.
pub fn select(
    cells: Vec<ResourceCell>,
    query: &DataSelectQuery,
    cached: Arc<CachedResources>,
    metrics_client: Option<Arc<dyn MetricsClient>>,
) -> DataSelection {
    let input = cells.len();
    let mut cells = filter(cells, &query.filter);
    let total_items = cells.len();

    if !query.sort.is_empty() {
        // stable: equal keys keep their input order
        cells.sort_by(|a, b| compare_cells(a, b, &query.sort));
    }

    let cells = paginate(cells, &query.pagination);
    debug!(
        input = input,
        filtered = total_items,
        page = cells.len(),
        "Selected cells"
    );

    let metrics = dispatch_metrics(&cells, &query.metrics, cached, metrics_client);
    DataSelection {
        cells,
        total_items,
        metrics,
    }
}

/// `select` over a typed list, converting through cells
pub fn select_resources<T>(
    resources: Vec<T>,
    query: &DataSelectQuery,
    cached: Arc<CachedResources>,
    metrics_client: Option<Arc<dyn MetricsClient>>,
) -> TypedSelection<T>
where
    T: Into<ResourceCell> + TryFrom<ResourceCell>,
{
    let selection = select(to_cells(resources), query, cached, metrics_client);
    TypedSelection {
        items: from_cells(selection.cells),
        total_items: selection.total_items,
        metrics: selection.metrics,
    }
}
