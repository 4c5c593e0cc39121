// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;
use std::collections::HashSet;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::Section;

/// Maximum width for free-text columns
const MAX_WIDE_COLUMN_WIDTH: usize = 60;

/// Columns that should have width limits in table mode
const WIDE_COLUMNS: &[&str] = &["labels", "images", "message", "warnings"];

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

fn footer(section: &Section) -> String {
    let shown = section.rows.len();
    match section.total {
        Some(total) if total != shown => format!("({} of {} rows)", shown, total),
        _ => format!("({} rows)", shown),
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(sections: &[Section], no_headers: bool) -> String {
        if sections.is_empty() {
            return "(0 rows)".to_string();
        }
        sections
            .iter()
            .map(|section| Self::format_section(section, no_headers))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_section(section: &Section, no_headers: bool) -> String {
        let title = section
            .title
            .as_ref()
            .map(|t| format!("{}:\n", t))
            .unwrap_or_default();

        if section.rows.is_empty() {
            return format!("{}{}", title, footer(section));
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        let truncate_cols: HashSet<usize> = section
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| WIDE_COLUMNS.contains(&col.as_str()))
            .map(|(idx, _)| idx)
            .collect();

        if !no_headers {
            table.set_header(&section.columns);
        }

        for row in &section.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if truncate_cols.contains(&idx) {
                        truncate_value(val, MAX_WIDE_COLUMN_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        format!("{}{}\n{}", title, table, footer(section))
    }
}
