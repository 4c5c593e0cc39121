// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Declarative selection queries
//!
//! Each part is parsed from the dashboard's comma-separated wire form and is
//! independent of the others: a missing or malformed part falls back to its
//! identity value without affecting the rest of the query.

use serde::Serialize;

use super::property::PropertyName;
use crate::metrics::{AggregationMode, CPU_USAGE, MEMORY_USAGE};

/// Offset + limit window over the sorted, filtered cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationQuery {
    #[default]
    NoPagination,
    Window { offset: usize, limit: usize },
}

impl PaginationQuery {
    /// Zero-based page of `items_per_page` items
    pub fn from_page(items_per_page: usize, page: usize) -> Self {
        if items_per_page == 0 {
            return PaginationQuery::NoPagination;
        }
        PaginationQuery::Window {
            offset: items_per_page.saturating_mul(page),
            limit: items_per_page,
        }
    }

    /// Parse `itemsPerPage` and the 1-based `page` parameters
    pub fn parse(items_per_page: Option<&str>, page: Option<&str>) -> Self {
        let items = items_per_page.and_then(|v| v.trim().parse::<usize>().ok());
        let page = page.and_then(|v| v.trim().parse::<usize>().ok());
        match (items, page) {
            (Some(items), Some(page)) if page >= 1 => Self::from_page(items, page - 1),
            _ => PaginationQuery::NoPagination,
        }
    }

    /// Index range of the page within `len` items, clipped to the input
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        match *self {
            PaginationQuery::NoPagination => 0..len,
            PaginationQuery::Window { offset, limit } => {
                let start = offset.min(len);
                let end = offset.saturating_add(limit).min(len);
                start..end
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortBy {
    pub property: PropertyName,
    pub direction: SortDirection,
}

/// Ordered sort keys; earlier keys take precedence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortQuery {
    pub sort_by: Vec<SortBy>,
}

impl SortQuery {
    pub fn new(sort_by: Vec<SortBy>) -> Self {
        Self { sort_by }
    }

    /// Parse `a,name,d,creationTimestamp`
    ///
    /// A malformed spec (odd number of parts or an unknown direction) yields
    /// an empty sort rather than a partial one.
    pub fn parse(spec: &str) -> Self {
        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        if parts.len() % 2 != 0 {
            return Self::default();
        }

        let mut sort_by = Vec::with_capacity(parts.len() / 2);
        for pair in parts.chunks(2) {
            let direction = match pair[0] {
                "a" => SortDirection::Ascending,
                "d" => SortDirection::Descending,
                _ => return Self::default(),
            };
            sort_by.push(SortBy {
                property: PropertyName::parse(pair[1]),
                direction,
            });
        }
        Self { sort_by }
    }

    pub fn is_empty(&self) -> bool {
        self.sort_by.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Case-insensitive substring match
    Contains,
    /// Exact match of the rendered value
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBy {
    pub property: PropertyName,
    pub value: String,
    pub mode: FilterMode,
}

impl FilterBy {
    /// Names match by substring, every other property exactly
    pub fn new(property: PropertyName, value: impl Into<String>) -> Self {
        let mode = if property == PropertyName::Name {
            FilterMode::Contains
        } else {
            FilterMode::Exact
        };
        Self {
            property,
            value: value.into(),
            mode,
        }
    }
}

/// Conjunction of filter terms
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterQuery {
    pub filter_by: Vec<FilterBy>,
}

impl FilterQuery {
    /// Parse `name,nginx,namespace,default`; a dangling property is dropped
    pub fn parse(spec: &str) -> Self {
        let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
        let filter_by = parts
            .chunks_exact(2)
            .filter(|pair| !pair[0].is_empty())
            .map(|pair| FilterBy::new(PropertyName::parse(pair[0]), pair[1]))
            .collect();
        Self { filter_by }
    }

    pub fn is_empty(&self) -> bool {
        self.filter_by.is_empty()
    }
}

/// Requested metric series and how to aggregate them across cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricQuery {
    pub metric_names: Vec<String>,
    pub aggregations: Vec<AggregationMode>,
}

impl MetricQuery {
    pub fn new(metric_names: Vec<String>, aggregations: Vec<AggregationMode>) -> Self {
        let aggregations = if aggregations.is_empty() {
            vec![AggregationMode::Sum]
        } else {
            aggregations
        };
        Self {
            metric_names,
            aggregations,
        }
    }

    /// No metrics at all
    pub fn none() -> Self {
        Self::default()
    }

    /// CPU and memory usage summed across cells
    pub fn standard() -> Self {
        Self::new(
            vec![CPU_USAGE.to_string(), MEMORY_USAGE.to_string()],
            vec![AggregationMode::Sum],
        )
    }

    /// Parse `metricNames` and `aggregations`; unknown aggregations are skipped
    pub fn parse(metric_names: Option<&str>, aggregations: Option<&str>) -> Self {
        let names: Vec<String> = metric_names
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if names.is_empty() {
            return Self::none();
        }
        let aggregations = aggregations
            .unwrap_or_default()
            .split(',')
            .filter_map(AggregationMode::parse)
            .collect();
        Self::new(names, aggregations)
    }

    pub fn is_empty(&self) -> bool {
        self.metric_names.is_empty()
    }
}

/// Complete selection query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataSelectQuery {
    pub pagination: PaginationQuery,
    pub sort: SortQuery,
    pub filter: FilterQuery,
    pub metrics: MetricQuery,
}

impl DataSelectQuery {
    /// Everything, unsorted, without metrics
    #[cfg(test)]
    pub fn no_select() -> Self {
        Self::default()
    }

    /// First page of `items_per_page`, newest first
    pub fn default_page(items_per_page: usize) -> Self {
        Self {
            pagination: PaginationQuery::from_page(items_per_page, 0),
            sort: SortQuery::new(vec![SortBy {
                property: PropertyName::CreationTimestamp,
                direction: SortDirection::Descending,
            }]),
            ..Self::default()
        }
    }

    /// Everything, unsorted, with the standard CPU/memory metrics
    #[cfg(test)]
    pub fn with_standard_metrics() -> Self {
        Self {
            metrics: MetricQuery::standard(),
            ..Self::default()
        }
    }
}
