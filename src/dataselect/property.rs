// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Property names and comparable values exposed by resource cells

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Well-known properties a query can sort or filter on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyName {
    Name,
    Namespace,
    CreationTimestamp,
    Status,
    FirstSeen,
    LastSeen,
    Reason,
    /// Any name no resource kind recognizes; evaluates to the neutral value
    Other(String),
}

impl PropertyName {
    /// Parse the camelCase wire name used by sortby/filterby
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "name" => PropertyName::Name,
            "namespace" => PropertyName::Namespace,
            "creationTimestamp" => PropertyName::CreationTimestamp,
            "status" => PropertyName::Status,
            "firstSeen" => PropertyName::FirstSeen,
            "lastSeen" => PropertyName::LastSeen,
            "reason" => PropertyName::Reason,
            other => PropertyName::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyName::Name => "name",
            PropertyName::Namespace => "namespace",
            PropertyName::CreationTimestamp => "creationTimestamp",
            PropertyName::Status => "status",
            PropertyName::FirstSeen => "firstSeen",
            PropertyName::LastSeen => "lastSeen",
            PropertyName::Reason => "reason",
            PropertyName::Other(name) => name,
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value that sorts and filters uniformly across kinds
///
/// Values of the same variant compare by content. `Neutral` is what unknown
/// properties evaluate to; it is equal to every other `Neutral`, so sorting on
/// an unknown property keeps the input order. Mixed variants order by variant
/// rank so the comparison stays a total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ComparableValue {
    Neutral,
    Integer(i64),
    Text(String),
    Time(DateTime<Utc>),
}

impl ComparableValue {
    pub fn text(value: impl Into<String>) -> Self {
        ComparableValue::Text(value.into())
    }

    /// Text from an optional field; a missing field compares as empty text
    pub fn opt_text(value: Option<&str>) -> Self {
        ComparableValue::Text(value.unwrap_or_default().to_string())
    }

    /// Time from an optional field; a missing time sorts first
    pub fn opt_time(value: Option<DateTime<Utc>>) -> Self {
        ComparableValue::Time(value.unwrap_or(DateTime::UNIX_EPOCH))
    }

    fn rank(&self) -> u8 {
        match self {
            ComparableValue::Neutral => 0,
            ComparableValue::Integer(_) => 1,
            ComparableValue::Text(_) => 2,
            ComparableValue::Time(_) => 3,
        }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ComparableValue::Integer(a), ComparableValue::Integer(b)) => a.cmp(b),
            (ComparableValue::Text(a), ComparableValue::Text(b)) => a.cmp(b),
            (ComparableValue::Time(a), ComparableValue::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Case-insensitive substring match against the rendered value
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            ComparableValue::Neutral => false,
            other => other
                .to_string()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }

    /// Exact match against the rendered value
    pub fn equals(&self, value: &str) -> bool {
        match self {
            ComparableValue::Neutral => false,
            ComparableValue::Time(t) => DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc) == *t)
                .unwrap_or(false),
            other => other.to_string() == value,
        }
    }
}

impl PartialOrd for ComparableValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparableValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparableValue::Neutral => Ok(()),
            ComparableValue::Integer(i) => write!(f, "{}", i),
            ComparableValue::Text(s) => f.write_str(s),
            ComparableValue::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}
