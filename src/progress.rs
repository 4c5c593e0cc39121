// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for long-running operations
//!
//! The cluster client reports each resource fetch here, and the CLI spinner
//! subscribes to show which collections are still in flight.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

use crate::kubernetes::ResourceKind;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    // === Connection phase ===
    /// Connecting to a cluster
    Connecting { cluster: String },
    /// Connected to a cluster
    Connected { cluster: String, elapsed_ms: u64 },

    // === Fetch phase ===
    /// A resource list request was issued
    FetchStarted { kind: ResourceKind },
    /// A resource list request returned
    FetchComplete {
        kind: ResourceKind,
        items: usize,
        elapsed_ms: u64,
    },
    /// The background metric fetch of a selection resolved
    MetricsResolved { series: usize, elapsed_ms: u64 },
}

/// Global progress reporter
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    /// Fetches started since creation
    fetches_started: AtomicUsize,
    /// Fetches completed since creation
    fetches_done: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            fetches_started: AtomicUsize::new(0),
            fetches_done: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    /// Report connecting to a cluster
    pub fn connecting(&self, cluster: &str) {
        let _ = self.sender.send(ProgressUpdate::Connecting {
            cluster: cluster.to_string(),
        });
    }

    /// Report connected to a cluster
    pub fn connected(&self, cluster: &str, elapsed_ms: u64) {
        let _ = self.sender.send(ProgressUpdate::Connected {
            cluster: cluster.to_string(),
            elapsed_ms,
        });
    }

    /// Report a list request going out
    pub fn fetch_started(&self, kind: ResourceKind) {
        self.fetches_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::FetchStarted { kind });
    }

    /// Report a list request returning
    pub fn fetch_complete(&self, kind: ResourceKind, items: usize, elapsed_ms: u64) {
        self.fetches_done.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::FetchComplete {
            kind,
            items,
            elapsed_ms,
        });
    }

    pub fn metrics_resolved(&self, series: usize, elapsed_ms: u64) {
        let _ = self
            .sender
            .send(ProgressUpdate::MetricsResolved { series, elapsed_ms });
    }

    /// Get current progress (done/started)
    pub fn progress(&self) -> (usize, usize) {
        (
            self.fetches_done.load(Ordering::SeqCst),
            self.fetches_started.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}
