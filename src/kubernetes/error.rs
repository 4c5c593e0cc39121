// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use thiserror::Error;

use super::ResourceKind;

/// Errors emitted while fetching one resource collection.
///
/// Every variant carries the kind that failed so the aggregate caller can
/// report which sibling fetch broke the request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API server does not serve this kind (or the named object is gone)
    #[error("{kind} not found: {message}")]
    NotFound { kind: ResourceKind, message: String },

    /// Any other API status error
    #[error("K8s API error fetching {kind} ({code} {reason}): {message}")]
    Api {
        kind: ResourceKind,
        code: u16,
        reason: String,
        message: String,
    },

    /// Connection, TLS or timeout failure after retries were exhausted
    #[error("transport error fetching {kind}: {message}")]
    Transport { kind: ResourceKind, message: String },

    /// The API returned an object that does not match the typed schema
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },

    /// The fetch task ended without delivering a result
    #[error("fetch task for {kind} ended without a result")]
    Interrupted { kind: ResourceKind },

    /// The caller asked a ResourceChannels bundle for a kind it never requested
    #[error("{kind} was not requested in this channel bundle")]
    NotRequested { kind: ResourceKind },
}

impl FetchError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            FetchError::NotFound { kind, .. }
            | FetchError::Api { kind, .. }
            | FetchError::Transport { kind, .. }
            | FetchError::Decode { kind, .. }
            | FetchError::Interrupted { kind }
            | FetchError::NotRequested { kind } => *kind,
        }
    }

    /// Check if this is a "not found" condition
    ///
    /// For list calls this means the cluster does not serve the kind at all,
    /// which optional aggregations translate into an empty collection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    pub(crate) fn from_kube(kind: ResourceKind, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => FetchError::NotFound {
                kind,
                message: api_err.message,
            },
            kube::Error::Api(api_err) => FetchError::Api {
                kind,
                code: api_err.code,
                reason: api_err.reason,
                message: api_err.message,
            },
            other => FetchError::Transport {
                kind,
                message: other.to_string(),
            },
        }
    }
}
