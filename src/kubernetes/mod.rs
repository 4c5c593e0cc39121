// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod channels;
mod client;
mod error;
pub mod resources;
pub mod selectors;
#[cfg(test)]
pub mod testing;

pub use channels::{ResourceChannel, ResourceChannels};
pub use client::{ClusterClient, KubeClusterClient};
pub use error::FetchError;
pub use resources::ResourceKind;

/// Parameters to push down to the Kubernetes API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Label selector string (e.g., "app=nginx,version=v1")
    pub label_selector: Option<String>,
    /// Field selector string (e.g., "status.phase=Running")
    pub field_selector: Option<String>,
}

impl ListOptions {
    pub fn with_labels(label_selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(label_selector.into()),
            field_selector: None,
        }
    }

    pub fn with_fields(field_selector: impl Into<String>) -> Self {
        Self {
            label_selector: None,
            field_selector: Some(field_selector.into()),
        }
    }
}

/// Which namespaces a list request covers
///
/// A single namespace is pushed down to the API as a namespaced request.
/// Multiple namespaces are fetched cluster-wide and filtered client-side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceQuery {
    #[default]
    All,
    Single(String),
    List(Vec<String>),
}

impl NamespaceQuery {
    /// Parse a comma separated namespace list; empty entries are dropped
    /// and an empty list means all namespaces.
    pub fn parse(spec: &str) -> Self {
        let namespaces: Vec<String> = spec
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(String::from)
            .collect();
        Self::from_namespaces(namespaces)
    }

    pub fn from_namespaces(mut namespaces: Vec<String>) -> Self {
        match namespaces.len() {
            0 => Self::All,
            1 => Self::Single(namespaces.remove(0)),
            _ => Self::List(namespaces),
        }
    }

    /// Namespace to use for the API request, or None for a cluster-wide request
    pub fn to_request_param(&self) -> Option<&str> {
        match self {
            Self::Single(ns) => Some(ns.as_str()),
            Self::All | Self::List(_) => None,
        }
    }

    /// Check whether a resource in `namespace` belongs to this query
    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Single(ns) => ns == namespace,
            Self::List(list) => list.iter().any(|ns| ns == namespace),
        }
    }
}
