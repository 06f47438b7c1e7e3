use async_trait::async_trait;
use log::{debug, info};

use super::browser;
use super::client::GitLabClient;
use crate::auth::Token;
use crate::error::Result;
use crate::monitor::{Job, JobId, MergeRequestSummary, MrId, PipelineId, PipelineSummary, Scope};
use crate::providers::RemoteDataPort;

/// GitLab merge request provider.
///
/// Talks to the REST v4 API of a single project and answers everything the
/// monitor asks through [`RemoteDataPort`].
pub struct GitLabProvider {
    client: GitLabClient,
    project_path: String,
    max_merge_requests: usize,
}

impl GitLabProvider {
    /// Creates a provider for the specified project.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitLab instance base URL (e.g., <https://gitlab.com>)
    /// * `project_path` - Project path or numeric id (e.g., "group/project")
    /// * `token` - Optional personal access token
    /// * `max_merge_requests` - Cap on the number of merge requests listed per refresh
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL cannot be constructed.
    pub fn new(
        base_url: &str,
        project_path: String,
        token: Option<Token>,
        max_merge_requests: usize,
    ) -> Result<Self> {
        let client = GitLabClient::new(base_url, token)?;

        Ok(Self {
            client,
            project_path,
            max_merge_requests,
        })
    }

    pub fn project_path(&self) -> &str {
        &self.project_path
    }

    /// Web page of a merge request as GitLab reports it.
    pub async fn merge_request_web_url(&self, iid: MrId) -> Result<String> {
        let merge_request = self
            .client
            .fetch_merge_request(&self.project_path, iid)
            .await?;
        Ok(merge_request.web_url)
    }
}

#[async_trait]
impl RemoteDataPort for GitLabProvider {
    async fn list_merge_requests(&self, scope: Scope) -> Result<Vec<MergeRequestSummary>> {
        info!(
            "Fetching open merge requests for {} ({})",
            self.project_path,
            scope.label()
        );
        let merge_requests = self
            .client
            .fetch_merge_requests(&self.project_path, scope, self.max_merge_requests)
            .await?;
        Ok(merge_requests.into_iter().map(Into::into).collect())
    }

    async fn latest_pipeline(&self, iid: MrId) -> Result<Option<PipelineSummary>> {
        let pipelines = self
            .client
            .fetch_merge_request_pipelines(&self.project_path, iid)
            .await?;
        Ok(pipelines.into_iter().next().map(Into::into))
    }

    async fn pipeline_jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>> {
        let jobs = self
            .client
            .fetch_pipeline_jobs(&self.project_path, pipeline_id)
            .await?;
        Ok(jobs.into_iter().map(Into::into).collect())
    }

    async fn approval(&self, iid: MrId) -> Result<bool> {
        let approvals = self.client.fetch_approvals(&self.project_path, iid).await?;
        Ok(approvals.approved)
    }

    async fn unresolved_threads(&self, iid: MrId) -> Result<u32> {
        let discussions = self
            .client
            .fetch_discussions(&self.project_path, iid)
            .await?;
        let unresolved = discussions.iter().filter(|d| d.is_unresolved()).count();
        Ok(u32::try_from(unresolved).unwrap_or(u32::MAX))
    }

    async fn retry_job(&self, job_id: JobId) -> Result<()> {
        let new_job_id = self.client.retry_job(&self.project_path, job_id).await?;
        debug!("Job {job_id} retried as job {new_job_id}");
        Ok(())
    }

    async fn open_in_browser(&self, iid: MrId) -> Result<()> {
        let url = self.merge_request_web_url(iid).await?;
        debug!("Opening {url}");
        browser::open_url(&url)
    }

    async fn current_user(&self) -> Result<String> {
        Ok(self.client.fetch_current_user().await?.username)
    }
}
