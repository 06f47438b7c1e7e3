use indexmap::IndexMap;
use log::{debug, warn};

use super::reconcile::IntentMap;
use super::types::{MergeRequest, MrId, Pipeline};
use crate::providers::RemoteDataPort;

/// Outcome of one enrichment batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub merge_requests: usize,
    pub failed_fetches: usize,
}

/// Enriches every merge request concurrently and waits for all of them.
///
/// Jobs are only fetched for active pipelines or expanded merge requests. A
/// failed fetch leaves the affected field at its default and never touches
/// the other merge requests.
pub async fn enrich_all<P>(
    port: &P,
    merge_requests: &mut IndexMap<MrId, MergeRequest>,
    intents: &IntentMap,
) -> EnrichmentReport
where
    P: RemoteDataPort + ?Sized,
{
    let futures: Vec<_> = merge_requests
        .values_mut()
        .map(|merge_request| {
            let expanded = intents
                .get(&merge_request.iid)
                .is_some_and(|intent| intent.expanded);
            enrich_one(port, merge_request, expanded)
        })
        .collect();

    let results = futures::future::join_all(futures).await;

    EnrichmentReport {
        merge_requests: results.len(),
        failed_fetches: results.into_iter().sum(),
    }
}

/// Returns the number of fetches that failed.
async fn enrich_one<P>(port: &P, merge_request: &mut MergeRequest, expanded: bool) -> usize
where
    P: RemoteDataPort + ?Sized,
{
    let iid = merge_request.iid;
    let mut failures = 0;

    let (pipeline, approval, threads) = tokio::join!(
        port.latest_pipeline(iid),
        port.approval(iid),
        port.unresolved_threads(iid),
    );

    merge_request.pipeline = match pipeline {
        Ok(pipeline) => pipeline.map(Pipeline::from),
        Err(e) => {
            warn!("Failed to fetch pipeline for !{iid}: {e}");
            failures += 1;
            None
        }
    };

    merge_request.approved = match approval {
        Ok(approved) => Some(approved),
        Err(e) => {
            warn!("Failed to fetch approvals for !{iid}: {e}");
            failures += 1;
            None
        }
    };

    merge_request.unresolved_threads = match threads {
        Ok(count) => count,
        Err(e) => {
            warn!("Failed to fetch discussions for !{iid}: {e}");
            failures += 1;
            0
        }
    };

    if let Some(pipeline) = merge_request.pipeline.as_mut() {
        if pipeline.is_active() || expanded {
            match port.pipeline_jobs(pipeline.id).await {
                Ok(jobs) => pipeline.jobs = jobs,
                Err(e) => {
                    warn!("Failed to fetch jobs for pipeline {}: {e}", pipeline.id);
                    failures += 1;
                }
            }
        } else {
            debug!("Skipping jobs for !{iid}: pipeline {} is idle", pipeline.id);
        }
    }

    failures
}
