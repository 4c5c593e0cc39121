// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Event, Pod};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::controllers::{PodController, controller_view_of_owned};
use super::{Dashboard, ListMeta, ObjectSummary, ResourceList, WorkloadError};
use crate::correlator::{CreatedByPolicy, PodInfo, filter_jobs_by_created_by};
use crate::dataselect::{CachedResources, DataSelectQuery, select_resources};
use crate::kubernetes::{NamespaceQuery, ResourceKind};

/// List row of a cron job, with the pods of every job it created
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJobView {
    #[serde(flatten)]
    pub object: ObjectSummary,
    pub schedule: String,
    pub suspend: bool,
    pub active: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_schedule: Option<DateTime<Utc>>,
    /// Names of the jobs attributed to this cron job
    pub jobs: Vec<String>,
    pub pods: PodInfo,
}

fn to_cron_job_view(
    cron_job: &CronJob,
    jobs: &[Job],
    pods: &[Pod],
    events: &[Event],
    policy: CreatedByPolicy,
) -> Result<CronJobView, WorkloadError> {
    let owned = filter_jobs_by_created_by(cron_job, jobs, policy)?;

    let mut info = PodInfo::default();
    let mut pod_count = 0;
    for job in &owned {
        let owned_pods = job.owned_pods(pods);
        pod_count += owned_pods.len();
        info.absorb_job(controller_view_of_owned(*job, &owned_pods, events).pods);
    }
    info.desired = info.desired.max(i32::try_from(pod_count).unwrap_or(i32::MAX));

    let spec = cron_job.spec.as_ref();
    let status = cron_job.status.as_ref();
    Ok(CronJobView {
        object: ObjectSummary::new(ResourceKind::CronJob, &cron_job.metadata),
        schedule: spec.map(|s| s.schedule.clone()).unwrap_or_default(),
        suspend: spec.and_then(|s| s.suspend).unwrap_or(false),
        active: status
            .and_then(|s| s.active.as_ref())
            .map(Vec::len)
            .unwrap_or(0),
        last_schedule: status.and_then(|s| s.last_schedule_time.as_ref()).map(|t| t.0),
        jobs: owned
            .iter()
            .filter_map(|job| job.metadata.name.clone())
            .collect(),
        pods: info,
    })
}

impl Dashboard {
    /// Cron jobs with the pod counts summed over the jobs each one created
    pub async fn cron_job_list(
        &self,
        namespaces: &NamespaceQuery,
        query: &DataSelectQuery,
    ) -> Result<ResourceList<CronJobView>, WorkloadError> {
        let mut channels = self
            .channels(namespaces)
            .with_cron_jobs()
            .with_jobs()
            .with_pods()
            .with_warning_events();

        let cron_jobs = channels.cron_jobs()?.recv_optional().await?;
        let jobs = channels.jobs()?.recv_optional().await?;
        let pods = channels.pods()?.recv().await?;
        let events = channels.events()?.recv_optional().await?;

        let cached = Arc::new(CachedResources::new(pods));
        let mut selection = select_resources(cron_jobs, query, cached.clone(), self.metrics.clone());
        let items = selection
            .items
            .iter()
            .map(|cron| {
                to_cron_job_view(cron, &jobs, &cached.pods, &events, self.created_by_policy)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(cron_jobs = items.len(), jobs = jobs.len(), "Built cron job list");

        Ok(ResourceList {
            list_meta: ListMeta {
                total_items: selection.total_items,
            },
            items,
            cumulative_metrics: selection.metrics.metrics_or_empty().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::testing::{self, MockClusterClient};
    use serde_json::json;

    fn pod_with_phase(name: &str, job: &str, phase: &str) -> serde_json::Value {
        testing::pod("default", name, &[("job-name", job)], phase)
    }

    fn cron_cluster() -> MockClusterClient {
        MockClusterClient::new()
            .with_items(
                ResourceKind::CronJob,
                vec![
                    testing::cron_job("default", "backup"),
                    testing::cron_job("default", "report"),
                ],
            )
            .with_items(
                ResourceKind::Job,
                vec![
                    testing::cron_owned_job("default", "backup-1", "backup", &[("job-name", "backup-1")]),
                    testing::cron_owned_job("default", "backup-2", "backup", &[("job-name", "backup-2")]),
                    testing::cron_owned_job("other", "backup-3", "backup", &[("job-name", "backup-3")]),
                ],
            )
            .with_items(
                ResourceKind::Pod,
                vec![
                    pod_with_phase("backup-1-a", "backup-1", "Succeeded"),
                    pod_with_phase("backup-2-a", "backup-2", "Succeeded"),
                    pod_with_phase("backup-2-b", "backup-2", "Failed"),
                ],
            )
    }

    #[tokio::test]
    async fn test_cron_pod_info_sums_jobs() {
        let list = Dashboard::new(Arc::new(cron_cluster()))
            .cron_job_list(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await
            .unwrap();
        assert_eq!(list.list_meta.total_items, 2);

        let backup = &list.items[0];
        assert_eq!(backup.object.name, "backup");
        assert_eq!(backup.schedule, "*/5 * * * *");
        assert_eq!(backup.jobs, vec!["backup-1", "backup-2"]);
        assert_eq!(backup.pods.current, 2);
        assert_eq!((backup.pods.succeeded, backup.pods.failed), (2, 1));
        // desired covers at least the pods actually seen
        assert_eq!(backup.pods.desired, 3);

        let report = &list.items[1];
        assert!(report.jobs.is_empty());
        assert_eq!(report.pods, PodInfo::default());
    }

    #[tokio::test]
    async fn test_unserved_cron_jobs_list_empty() {
        let mock = MockClusterClient::new()
            .not_found(ResourceKind::CronJob)
            .not_found(ResourceKind::Job);
        let list = Dashboard::new(Arc::new(mock))
            .cron_job_list(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await
            .unwrap();
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_malformed_annotation() {
        let mut broken = testing::job("default", "broken", &[], 0);
        broken["metadata"]["annotations"] = json!({ "kubernetes.io/created-by": "{" });
        let mock = Arc::new(cron_cluster().with_items(ResourceKind::Job, vec![broken]));

        let lenient = Dashboard::new(mock.clone())
            .cron_job_list(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await;
        assert!(lenient.is_ok());

        let err = Dashboard::new(mock)
            .with_created_by_policy(CreatedByPolicy::Fail)
            .cron_job_list(&NamespaceQuery::All, &DataSelectQuery::no_select())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkloadError::CreatedBy(_)));
    }
}
