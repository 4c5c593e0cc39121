// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::core::v1::Pod;

/// Already-fetched collections a selection may consult
///
/// Shared through an `Arc` with the background metric task; never mutated
/// after construction.
#[derive(Debug, Clone, Default)]
pub struct CachedResources {
    pub pods: Vec<Pod>,
}

impl CachedResources {
    pub fn new(pods: Vec<Pod>) -> Self {
        Self { pods }
    }
}
