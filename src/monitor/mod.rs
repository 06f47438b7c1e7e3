//! Refresh, reconciliation and auto-retry engine.
//!
//! A [`Monitor`] owns the last fetched merge requests, the user's local intent
//! for each of them and the audit log. The [`scheduler`] drives it.

mod audit;
mod auto_retry;
mod enrich;
mod fuzzy;
mod reconcile;
pub mod scheduler;
mod types;
mod view;

#[cfg(test)]
pub(crate) mod testing;

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::providers::RemoteDataPort;

use auto_retry::RetryReport;
use enrich::EnrichmentReport;
use reconcile::{merge_rows, reconcile_intents, IntentMap};
use view::{visible_rows, ViewFilter};

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use fuzzy::fuzzy_match;
pub use types::{
    Job, JobId, LocalIntent, MergeRequest, MergeRequestSummary, MrId, MrRow, Pipeline,
    PipelineId, PipelineSummary, Scope, Status,
};

/// What one refresh cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The merge request list was fetched and the snapshot replaced
    pub listed: bool,
    pub enrichment: EnrichmentReport,
    pub retries: RetryReport,
}

/// Published state for the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub scope: Scope,
    pub current_user: Option<String>,
    pub rows: Vec<MrRow>,
    pub audit: Vec<AuditEntry>,
}

impl Snapshot {
    pub fn visible<'a>(&'a self, show_drafts: bool, query: &'a str) -> Vec<&'a MrRow> {
        let filter = ViewFilter {
            scope: self.scope,
            current_user: self.current_user.as_deref(),
            show_drafts,
            query,
        };
        visible_rows(&self.rows, &filter)
    }
}

pub struct Monitor<P: ?Sized> {
    port: Arc<P>,
    scope: Scope,
    merge_requests: IndexMap<MrId, MergeRequest>,
    intents: IntentMap,
    audit: AuditLog,
    current_user: Option<String>,
}

impl<P: RemoteDataPort + ?Sized> Monitor<P> {
    pub fn new(port: Arc<P>, scope: Scope, audit_capacity: usize) -> Self {
        Self {
            port,
            scope,
            merge_requests: IndexMap::new(),
            intents: IntentMap::new(),
            audit: AuditLog::new(audit_capacity),
            current_user: None,
        }
    }

    /// Runs one full cycle: list, reconcile, enrich, auto-retry.
    ///
    /// If the list cannot be fetched the previous snapshot stays in place and
    /// the failure is recorded in the audit log.
    pub async fn refresh(&mut self) -> CycleReport {
        if self.current_user.is_none() {
            match self.port.current_user().await {
                Ok(username) => self.current_user = Some(username),
                Err(e) => debug!("Could not resolve current user: {e}"),
            }
        }

        let summaries = match self.port.list_merge_requests(self.scope).await {
            Ok(summaries) => summaries,
            Err(e) => {
                self.audit.record(AuditEvent::RefreshFailed {
                    message: e.to_string(),
                });
                return CycleReport::default();
            }
        };

        let mut fresh: IndexMap<MrId, MergeRequest> = IndexMap::with_capacity(summaries.len());
        for summary in summaries {
            fresh.entry(summary.iid).or_insert_with(|| summary.into());
        }

        self.intents = reconcile_intents(&self.intents, fresh.keys().copied());

        let enrichment = enrich::enrich_all(self.port.as_ref(), &mut fresh, &self.intents).await;
        if enrichment.failed_fetches > 0 {
            warn!(
                "{} of the fetches for {} merge requests failed",
                enrichment.failed_fetches, enrichment.merge_requests
            );
        }
        self.merge_requests = fresh;

        let retries = auto_retry::run_pass(
            self.port.as_ref(),
            &mut self.merge_requests,
            &self.intents,
            &mut self.audit,
        )
        .await;

        info!(
            "Refreshed {} merge requests ({} retries triggered, {} failed)",
            self.merge_requests.len(),
            retries.triggered,
            retries.failed
        );

        CycleReport {
            listed: true,
            enrichment,
            retries,
        }
    }

    /// Flips auto-retry for a merge request and, when enabling, retries its
    /// failed jobs right away. Returns the new state, or `None` for an
    /// unknown iid.
    pub async fn toggle_auto_retry(&mut self, iid: MrId) -> Option<bool> {
        let merge_request = self.merge_requests.get_mut(&iid)?;
        let intent = self.intents.entry(iid).or_default();
        intent.auto_retry = !intent.auto_retry;
        let enabled = intent.auto_retry;

        self.audit.record(AuditEvent::AutoRetryToggled { iid, enabled });
        if enabled {
            auto_retry::retry_merge_request(self.port.as_ref(), merge_request, &mut self.audit)
                .await;
        }
        Some(enabled)
    }

    /// Flips the detail view for a merge request, loading its jobs when it is
    /// opened without any. Returns the new state, or `None` for an unknown iid.
    pub async fn toggle_expanded(&mut self, iid: MrId) -> Option<bool> {
        let merge_request = self.merge_requests.get_mut(&iid)?;
        let intent = self.intents.entry(iid).or_default();
        intent.expanded = !intent.expanded;
        let expanded = intent.expanded;

        if let Some(pipeline) = merge_request.pipeline.as_mut() {
            if expanded && pipeline.jobs.is_empty() {
                match self.port.pipeline_jobs(pipeline.id).await {
                    Ok(jobs) => pipeline.jobs = jobs,
                    Err(e) => warn!("Failed to fetch jobs for pipeline {}: {e}", pipeline.id),
                }
            }
        }
        Some(expanded)
    }

    pub async fn open_in_browser(&mut self, iid: MrId) {
        if let Err(e) = self.port.open_in_browser(iid).await {
            self.audit.record(AuditEvent::OpenFailed {
                iid,
                message: e.to_string(),
            });
        }
    }

    /// Takes effect on the next refresh.
    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[cfg(test)]
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn rows(&self) -> Vec<MrRow> {
        merge_rows(&self.merge_requests, &self.intents)
    }

    #[cfg(test)]
    pub fn intent(&self, iid: MrId) -> LocalIntent {
        self.intents.get(&iid).copied().unwrap_or_default()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            scope: self.scope,
            current_user: self.current_user.clone(),
            rows: self.rows(),
            audit: self.audit.entries().cloned().collect(),
        }
    }
}
