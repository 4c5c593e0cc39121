// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Associates dependent resources with their owners
//!
//! Pods are matched to controllers through label selectors, jobs to cron jobs
//! through the created-by back-reference, and warning events to pods through
//! the event's involved object.

mod created_by;
mod events;
mod podinfo;
mod selector;

pub use created_by::{CreatedByError, CreatedByPolicy, filter_jobs_by_created_by};
pub use events::{EventSummary, distinct_messages, get_pods_event_warnings};
pub use podinfo::{PodInfo, PodPhase, get_pod_event_info, get_pod_info, pod_phase_status};
pub use selector::{
    filter_namespaced_pods_by_label_selector, filter_namespaced_pods_by_selector,
};
