// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use std::fmt;

use super::events::{EventSummary, distinct_messages};

/// Pod lifecycle phase as the dashboard reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => PodPhase::Pending,
            Some("Running") => PodPhase::Running,
            Some("Succeeded") => PodPhase::Succeeded,
            Some("Failed") => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Aggregate state of a group of pods
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodInfo {
    pub current: i32,
    pub desired: i32,
    pub running: i32,
    pub pending: i32,
    pub failed: i32,
    pub succeeded: i32,
    /// Distinct warning events of the group's pods
    pub warnings: Vec<EventSummary>,
}

impl PodInfo {
    fn new(current: i32, desired: i32) -> Self {
        Self {
            current,
            desired,
            ..Self::default()
        }
    }

    /// Fold one job's counts into the totals of the cron job that created it
    ///
    /// A cron job's current count is the number of its jobs' succeeded pods.
    pub fn absorb_job(&mut self, job: PodInfo) {
        self.current += job.succeeded;
        self.desired += job.desired;
        self.running += job.running;
        self.pending += job.pending;
        self.failed += job.failed;
        self.succeeded += job.succeeded;
        self.warnings.extend(job.warnings);
    }

    fn count(&mut self, phase: PodPhase) {
        match phase {
            PodPhase::Running => self.running += 1,
            PodPhase::Pending => self.pending += 1,
            PodPhase::Failed => self.failed += 1,
            PodPhase::Succeeded => self.succeeded += 1,
            PodPhase::Unknown => {}
        }
    }
}

fn condition_true(pod: &Pod, condition: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conds| {
            conds
                .iter()
                .any(|c| c.type_ == condition && c.status == "True")
        })
}

/// Derived phase of a pod given the warnings that concern it
///
/// Terminal phases win. A ready and initialized pod is running. Otherwise
/// any warning marks it failed, and anything else is still pending.
pub fn pod_phase_status(pod: &Pod, warnings: &[EventSummary]) -> PodPhase {
    let phase = PodPhase::parse(pod.status.as_ref().and_then(|s| s.phase.as_deref()));
    if matches!(phase, PodPhase::Failed | PodPhase::Succeeded) {
        return phase;
    }

    if condition_true(pod, "Initialized") && condition_true(pod, "Ready") {
        return PodPhase::Running;
    }

    if !warnings.is_empty() {
        return PodPhase::Failed;
    }

    PodPhase::Pending
}

/// Counts by the pods' reported phase
pub fn get_pod_info(current: i32, desired: i32, pods: &[Pod]) -> PodInfo {
    let mut info = PodInfo::new(current, desired);
    for pod in pods {
        info.count(PodPhase::parse(
            pod.status.as_ref().and_then(|s| s.phase.as_deref()),
        ));
    }
    info
}

/// Counts by derived phase, attributing each warning only to its own pod
pub fn get_pod_event_info(
    current: i32,
    desired: i32,
    pods: &[Pod],
    warnings: Vec<EventSummary>,
) -> PodInfo {
    let mut info = PodInfo::new(current, desired);
    for pod in pods {
        let own: Vec<EventSummary> = warnings
            .iter()
            .filter(|w| w.concerns(pod))
            .cloned()
            .collect();
        info.count(pod_phase_status(pod, &own));
    }
    info.warnings = distinct_messages(warnings);
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::events::get_pods_event_warnings;
    use crate::kubernetes::testing::{self, typed};
    use k8s_openapi::api::core::v1::Event;
    use serde_json::json;

    fn warning_for(pod_name: &str) -> EventSummary {
        EventSummary::from(&typed::<Event>(testing::warning_event(
            "default", pod_name, "BackOff", "back-off",
        )))
    }

    #[test]
    fn test_terminal_phase_wins() {
        let pod: Pod = typed(testing::pod("default", "done", &[], "Succeeded"));
        assert_eq!(pod_phase_status(&pod, &[warning_for("done")]), PodPhase::Succeeded);

        let pod: Pod = typed(testing::pod("default", "crashed", &[], "Failed"));
        assert_eq!(pod_phase_status(&pod, &[]), PodPhase::Failed);
    }

    #[test]
    fn test_ready_and_initialized_is_running() {
        let pod: Pod = typed(testing::ready_pod("default", "web", &[]));
        assert_eq!(pod_phase_status(&pod, &[warning_for("web")]), PodPhase::Running);

        // ready without initialized is not enough
        let mut value = testing::pod("default", "half", &[], "Running");
        value["status"]["conditions"] = json!([{ "type": "Ready", "status": "True" }]);
        let pod: Pod = typed(value);
        assert_eq!(pod_phase_status(&pod, &[]), PodPhase::Pending);
    }

    #[test]
    fn test_warning_marks_failed() {
        let pod: Pod = typed(testing::pod("default", "stuck", &[], "Pending"));
        assert_eq!(pod_phase_status(&pod, &[warning_for("stuck")]), PodPhase::Failed);
        assert_eq!(pod_phase_status(&pod, &[]), PodPhase::Pending);
    }

    #[test]
    fn test_get_pod_info_counts_raw_phases() {
        let pods: Vec<Pod> = vec![
            typed(testing::pod("default", "a", &[], "Running")),
            typed(testing::pod("default", "b", &[], "Running")),
            typed(testing::pod("default", "c", &[], "Pending")),
            typed(testing::pod("default", "d", &[], "Failed")),
            typed(testing::pod("default", "e", &[], "Succeeded")),
        ];
        let info = get_pod_info(5, 6, &pods);
        assert_eq!(
            (info.current, info.desired, info.running, info.pending, info.failed, info.succeeded),
            (5, 6, 2, 1, 1, 1)
        );
        assert!(info.warnings.is_empty());
    }

    #[test]
    fn test_event_info_attributes_warnings_per_pod() {
        let pods: Vec<Pod> = vec![
            typed(testing::pod("default", "stuck", &[], "Pending")),
            typed(testing::pod("default", "waiting", &[], "Pending")),
            typed(testing::ready_pod("default", "ok", &[])),
        ];
        let events: Vec<Event> = vec![typed(testing::warning_event(
            "default", "stuck", "BackOff", "back-off",
        ))];
        let warnings = get_pods_event_warnings(&events, &pods);
        let info = get_pod_event_info(3, 3, &pods, warnings);

        assert_eq!(info.failed, 1);
        assert_eq!(info.pending, 1);
        assert_eq!(info.running, 1);
        assert_eq!(info.warnings.len(), 1);
    }

    #[test]
    fn test_shared_warning_message_fails_every_pod() {
        let message = "Back-off restarting failed container";
        let pods: Vec<Pod> = vec![
            typed(testing::pod("default", "a", &[], "Pending")),
            typed(testing::pod("default", "b", &[], "Pending")),
        ];
        let events: Vec<Event> = vec![
            typed(testing::warning_event("default", "a", "BackOff", message)),
            typed(testing::warning_event("default", "b", "BackOff", message)),
        ];
        let info = get_pod_event_info(2, 2, &pods, get_pods_event_warnings(&events, &pods));

        assert_eq!((info.failed, info.pending), (2, 0));
        // the summary still lists the message once
        assert_eq!(info.warnings.len(), 1);
        assert_eq!(info.warnings[0].message, message);
    }

    #[test]
    fn test_absorb_job_counts_succeeded_as_current() {
        let first = PodInfo {
            current: 1,
            desired: 1,
            succeeded: 1,
            ..PodInfo::default()
        };
        let second = PodInfo {
            current: 1,
            desired: 1,
            running: 1,
            warnings: vec![warning_for("job-2-pod")],
            ..PodInfo::default()
        };
        let mut cron = PodInfo::default();
        cron.absorb_job(first);
        cron.absorb_job(second);
        assert_eq!((cron.current, cron.desired, cron.running), (1, 2, 1));
        assert_eq!(cron.warnings.len(), 1);
    }
}
