// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::ObjectReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Legacy annotation holding a JSON `SerializedReference` to the creator
pub const CREATED_BY_ANNOTATION: &str = "kubernetes.io/created-by";

#[derive(Deserialize)]
struct SerializedReference {
    reference: ObjectReference,
}

/// What to do with a job whose created-by annotation does not decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatedByPolicy {
    /// Treat the job as having no annotation
    #[default]
    Skip,
    /// Abort the correlation
    Fail,
}

#[derive(Debug, Error)]
#[error("job {namespace}/{name} has a malformed kubernetes.io/created-by annotation: {source}")]
pub struct CreatedByError {
    pub namespace: String,
    pub name: String,
    #[source]
    pub source: serde_json::Error,
}

/// Decode the created-by reference, if the annotation is present
pub fn extract_created_by(
    annotations: Option<&BTreeMap<String, String>>,
) -> Option<Result<ObjectReference, serde_json::Error>> {
    let raw = annotations?.get(CREATED_BY_ANNOTATION)?;
    Some(serde_json::from_str::<SerializedReference>(raw).map(|r| r.reference))
}

fn owned_by_cron_job(job: &Job, cron_name: &str) -> bool {
    job.metadata
        .owner_references
        .iter()
        .flatten()
        .any(|owner| owner.kind == "CronJob" && owner.name == cron_name)
}

/// Jobs created by `cron_job`
///
/// A job belongs to the cron job when it lives in the same namespace and its
/// created-by annotation names the cron job. Jobs without the annotation fall
/// back to their owner references.
pub fn filter_jobs_by_created_by<'a>(
    cron_job: &CronJob,
    jobs: &'a [Job],
    policy: CreatedByPolicy,
) -> Result<Vec<&'a Job>, CreatedByError> {
    let cron_name = cron_job.metadata.name.as_deref().unwrap_or_default();
    let cron_namespace = cron_job.metadata.namespace.as_deref();

    let mut matching = Vec::new();
    for job in jobs {
        if job.metadata.namespace.as_deref() != cron_namespace {
            continue;
        }

        let created_by = match extract_created_by(job.metadata.annotations.as_ref()) {
            Some(Ok(reference)) => Some(reference),
            Some(Err(source)) => match policy {
                CreatedByPolicy::Fail => {
                    return Err(CreatedByError {
                        namespace: job.metadata.namespace.clone().unwrap_or_default(),
                        name: job.metadata.name.clone().unwrap_or_default(),
                        source,
                    });
                }
                CreatedByPolicy::Skip => {
                    debug!(
                        job = ?job.metadata.name,
                        error = %source,
                        "Ignoring malformed created-by annotation"
                    );
                    None
                }
            },
            None => None,
        };

        let belongs = match created_by {
            Some(reference) => reference.name.as_deref() == Some(cron_name),
            None => owned_by_cron_job(job, cron_name),
        };
        if belongs {
            matching.push(job);
        }
    }
    Ok(matching)
}
