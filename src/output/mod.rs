// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod json;
mod rows;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use rows::KindRow;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use anyhow::Result;
use serde::Serialize;

use crate::cli::OutputFormat;

/// One titled block of table output
#[derive(Debug, Clone, Default)]
pub struct Section {
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Items matching before pagination, when it differs from the row count
    pub total: Option<usize>,
}

impl Section {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Something that renders as one or more table sections
///
/// Structured formats serialize the value itself, so sections only need to
/// carry what a terminal reader wants to see.
pub trait Tabular {
    fn sections(&self) -> Vec<Section>;
}

/// Render `value` in the requested format
pub fn format<T: Serialize + Tabular>(
    value: &T,
    format: &OutputFormat,
    no_headers: bool,
) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(TableFormatter::format(&value.sections(), no_headers)),
        OutputFormat::Json => JsonFormatter::format(value),
        OutputFormat::Yaml => YamlFormatter::format(value),
    }
}
