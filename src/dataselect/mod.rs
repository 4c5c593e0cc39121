// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Filtering, sorting, pagination and metric dispatch over resource cells

mod cached;
mod cell;
mod property;
mod query;
mod select;

pub use cached::CachedResources;
pub use cell::{ResourceCell, fetch_cells, to_cells};
pub use property::PropertyName;
pub use query::{DataSelectQuery, FilterQuery, MetricQuery, PaginationQuery, SortQuery};
pub use select::{select, select_resources};
