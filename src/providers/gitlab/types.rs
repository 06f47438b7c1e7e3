//! Response bodies of the GitLab REST API, reduced to the fields the monitor reads.

use serde::Deserialize;

use crate::monitor::{Job, JobId, MergeRequestSummary, MrId, PipelineId, PipelineSummary, Status};

#[derive(Debug, Deserialize)]
pub struct GitLabUser {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct GitLabMergeRequest {
    pub iid: MrId,
    pub title: String,
    pub source_branch: String,
    pub web_url: String,
    #[serde(default)]
    pub assignees: Vec<GitLabUser>,
}

impl From<GitLabMergeRequest> for MergeRequestSummary {
    fn from(mr: GitLabMergeRequest) -> Self {
        Self {
            iid: mr.iid,
            title: mr.title,
            source_branch: mr.source_branch,
            web_url: mr.web_url,
            assignees: mr.assignees.into_iter().map(|user| user.username).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitLabPipeline {
    pub id: PipelineId,
    pub status: Status,
    #[serde(default)]
    pub web_url: String,
}

impl From<GitLabPipeline> for PipelineSummary {
    fn from(pipeline: GitLabPipeline) -> Self {
        Self {
            id: pipeline.id,
            status: pipeline.status,
            web_url: pipeline.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitLabJob {
    pub id: JobId,
    pub name: String,
    pub stage: String,
    pub status: Status,
    pub duration: Option<f64>,
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub web_url: String,
}

impl From<GitLabJob> for Job {
    fn from(job: GitLabJob) -> Self {
        Self {
            id: job.id,
            name: job.name,
            stage: job.stage,
            status: job.status,
            duration: job.duration,
            allow_failure: job.allow_failure,
            web_url: job.web_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitLabApprovals {
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct GitLabDiscussion {
    #[serde(default)]
    pub notes: Vec<GitLabNote>,
}

impl GitLabDiscussion {
    /// A thread is open while any of its resolvable notes is unresolved.
    pub fn is_unresolved(&self) -> bool {
        self.notes.iter().any(|note| note.resolvable && !note.resolved)
    }
}

#[derive(Debug, Deserialize)]
pub struct GitLabNote {
    #[serde(default)]
    pub resolvable: bool,
    #[serde(default)]
    pub resolved: bool,
}

/// Answer to `POST jobs/:id/retry`: the new job, or a `message` explaining why not.
#[derive(Debug, Deserialize)]
pub struct GitLabRetriedJob {
    pub id: Option<JobId>,
    pub message: Option<serde_json::Value>,
}
