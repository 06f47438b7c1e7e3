//! In-memory `RemoteDataPort` for exercising the monitor without a server.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::types::{
    Job, JobId, MergeRequestSummary, MrId, PipelineId, PipelineSummary, Scope, Status,
};
use crate::error::{MonitorError, Result};
use crate::providers::RemoteDataPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Scope),
    Pipeline(MrId),
    Jobs(PipelineId),
    Approval(MrId),
    Threads(MrId),
    Retry(JobId),
    Open(MrId),
    CurrentUser,
}

#[derive(Default)]
struct State {
    merge_requests: Vec<MergeRequestSummary>,
    list_error: Option<String>,
    list_delay: Option<Duration>,
    pipelines: HashMap<MrId, PipelineSummary>,
    failing_pipelines: HashSet<MrId>,
    jobs: HashMap<PipelineId, Vec<Job>>,
    failing_jobs: HashSet<PipelineId>,
    approvals: HashMap<MrId, bool>,
    threads: HashMap<MrId, u32>,
    retry_errors: HashMap<JobId, String>,
    user: Option<String>,
    calls: Vec<Call>,
}

/// Answers from canned data and records every call.
///
/// Unset approvals and an unset user are errors; anything else left unset
/// answers empty.
#[derive(Default)]
pub struct FakePort {
    state: Mutex<State>,
}

impl FakePort {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_merge_requests(&self, merge_requests: Vec<MergeRequestSummary>) {
        self.with_state(|s| s.merge_requests = merge_requests);
    }

    pub fn fail_list(&self, message: &str) {
        self.with_state(|s| s.list_error = Some(message.to_string()));
    }

    pub fn clear_list_failure(&self) {
        self.with_state(|s| s.list_error = None);
    }

    pub fn delay_list(&self, delay: Duration) {
        self.with_state(|s| s.list_delay = Some(delay));
    }

    pub fn set_pipeline(&self, iid: MrId, pipeline_id: PipelineId, status: Status) {
        self.with_state(|s| {
            s.pipelines.insert(
                iid,
                PipelineSummary {
                    id: pipeline_id,
                    status,
                    web_url: format!("https://gitlab.example.com/-/pipelines/{pipeline_id}"),
                },
            );
        });
    }

    pub fn fail_pipeline(&self, iid: MrId) {
        self.with_state(|s| s.failing_pipelines.insert(iid));
    }

    pub fn set_jobs(&self, pipeline_id: PipelineId, jobs: Vec<Job>) {
        self.with_state(|s| s.jobs.insert(pipeline_id, jobs));
    }

    pub fn fail_jobs(&self, pipeline_id: PipelineId) {
        self.with_state(|s| s.failing_jobs.insert(pipeline_id));
    }

    pub fn set_approval(&self, iid: MrId, approved: bool) {
        self.with_state(|s| s.approvals.insert(iid, approved));
    }

    pub fn set_threads(&self, iid: MrId, count: u32) {
        self.with_state(|s| s.threads.insert(iid, count));
    }

    pub fn fail_retry(&self, job_id: JobId, message: &str) {
        self.with_state(|s| s.retry_errors.insert(job_id, message.to_string()));
    }

    pub fn set_user(&self, username: &str) {
        self.with_state(|s| s.user = Some(username.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn retried_jobs(&self) -> Vec<JobId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Retry(job_id) => Some(job_id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|&call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.with_state(|s| s.calls.push(call));
    }
}

fn api_error(message: &str) -> MonitorError {
    MonitorError::Api {
        status: 500,
        message: message.to_string(),
    }
}

#[async_trait]
impl RemoteDataPort for FakePort {
    async fn list_merge_requests(&self, scope: Scope) -> Result<Vec<MergeRequestSummary>> {
        self.record(Call::List(scope));
        let delay = self.with_state(|s| s.list_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| match &s.list_error {
            Some(message) => Err(api_error(message)),
            None => Ok(s.merge_requests.clone()),
        })
    }

    async fn latest_pipeline(&self, iid: MrId) -> Result<Option<PipelineSummary>> {
        self.record(Call::Pipeline(iid));
        self.with_state(|s| {
            if s.failing_pipelines.contains(&iid) {
                Err(api_error("pipeline lookup failed"))
            } else {
                Ok(s.pipelines.get(&iid).cloned())
            }
        })
    }

    async fn pipeline_jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>> {
        self.record(Call::Jobs(pipeline_id));
        self.with_state(|s| {
            if s.failing_jobs.contains(&pipeline_id) {
                Err(api_error("job lookup failed"))
            } else {
                Ok(s.jobs.get(&pipeline_id).cloned().unwrap_or_default())
            }
        })
    }

    async fn approval(&self, iid: MrId) -> Result<bool> {
        self.record(Call::Approval(iid));
        self.with_state(|s| {
            s.approvals
                .get(&iid)
                .copied()
                .ok_or_else(|| api_error("approval lookup failed"))
        })
    }

    async fn unresolved_threads(&self, iid: MrId) -> Result<u32> {
        self.record(Call::Threads(iid));
        self.with_state(|s| Ok(s.threads.get(&iid).copied().unwrap_or(0)))
    }

    async fn retry_job(&self, job_id: JobId) -> Result<()> {
        self.record(Call::Retry(job_id));
        self.with_state(|s| match s.retry_errors.get(&job_id) {
            Some(message) => Err(MonitorError::Api {
                status: 403,
                message: message.clone(),
            }),
            None => Ok(()),
        })
    }

    async fn open_in_browser(&self, iid: MrId) -> Result<()> {
        self.record(Call::Open(iid));
        Ok(())
    }

    async fn current_user(&self) -> Result<String> {
        self.record(Call::CurrentUser);
        self.with_state(|s| s.user.clone().ok_or_else(|| api_error("not authenticated")))
    }
}

pub fn summary(iid: MrId, title: &str) -> MergeRequestSummary {
    MergeRequestSummary {
        iid,
        title: title.to_string(),
        source_branch: format!("branch-{iid}"),
        web_url: format!("https://gitlab.example.com/group/project/-/merge_requests/{iid}"),
        assignees: Vec::new(),
    }
}

pub fn job(id: JobId, name: &str, stage: &str, status: Status, allow_failure: bool) -> Job {
    Job {
        id,
        name: name.to_string(),
        stage: stage.to_string(),
        status,
        duration: Some(12.0),
        allow_failure,
        web_url: format!("https://gitlab.example.com/group/project/-/jobs/{id}"),
    }
}
