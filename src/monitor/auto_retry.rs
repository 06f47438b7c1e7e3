use indexmap::IndexMap;

use super::audit::{AuditEvent, AuditLog};
use super::reconcile::IntentMap;
use super::types::{Job, JobId, MergeRequest, MrId};
use crate::providers::RemoteDataPort;

/// Counts from one auto-retry invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub triggered: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for RetryReport {
    fn add_assign(&mut self, other: Self) {
        self.triggered += other.triggered;
        self.failed += other.failed;
    }
}

/// Jobs worth retrying: failed and not allowed to fail, in source order.
pub fn retry_candidates(jobs: &[Job]) -> Vec<&Job> {
    jobs.iter()
        .filter(|job| job.is_failed() && !job.allow_failure)
        .collect()
}

/// Runs auto-retry for every merge request that opted in.
pub async fn run_pass<P>(
    port: &P,
    merge_requests: &mut IndexMap<MrId, MergeRequest>,
    intents: &IntentMap,
    audit: &mut AuditLog,
) -> RetryReport
where
    P: RemoteDataPort + ?Sized,
{
    let mut report = RetryReport::default();
    for merge_request in merge_requests.values_mut() {
        let opted_in = intents
            .get(&merge_request.iid)
            .is_some_and(|intent| intent.auto_retry);
        if opted_in {
            report += retry_merge_request(port, merge_request, audit).await;
        }
    }
    report
}

/// Reloads the pipeline's jobs and resubmits the retry candidates one by one.
///
/// Nothing is retried from stale data: if the job list cannot be loaded the
/// merge request is skipped. Merge requests without a pipeline are ignored.
pub async fn retry_merge_request<P>(
    port: &P,
    merge_request: &mut MergeRequest,
    audit: &mut AuditLog,
) -> RetryReport
where
    P: RemoteDataPort + ?Sized,
{
    let iid = merge_request.iid;
    let mut report = RetryReport::default();
    let Some(pipeline) = merge_request.pipeline.as_mut() else {
        return report;
    };

    match port.pipeline_jobs(pipeline.id).await {
        Ok(jobs) => pipeline.jobs = jobs,
        Err(e) => {
            audit.record(AuditEvent::JobsUnavailable {
                iid,
                message: e.server_message(),
            });
            return report;
        }
    }

    let candidates: Vec<(JobId, String)> = retry_candidates(&pipeline.jobs)
        .into_iter()
        .map(|job| (job.id, job.name.clone()))
        .collect();

    if candidates.is_empty() {
        audit.record(AuditEvent::NothingToRetry { iid });
        return report;
    }

    for (job_id, job_name) in candidates {
        match port.retry_job(job_id).await {
            Ok(()) => {
                report.triggered += 1;
                audit.record(AuditEvent::RetryTriggered {
                    iid,
                    job_id,
                    job_name,
                });
            }
            Err(e) => {
                report.failed += 1;
                audit.record(AuditEvent::RetryFailed {
                    iid,
                    job_id,
                    job_name,
                    message: e.server_message(),
                });
            }
        }
    }

    report
}
