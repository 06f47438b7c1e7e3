use super::core::{GitLabClient, PAGE_SIZE};
use crate::error::{MonitorError, Result};
use crate::monitor::{JobId, MrId, PipelineId};
use crate::providers::gitlab::types::{GitLabJob, GitLabPipeline, GitLabRetriedJob};

impl GitLabClient {
    /// Pipelines of a merge request, most recent first.
    pub async fn fetch_merge_request_pipelines(
        &self,
        project: &str,
        iid: MrId,
    ) -> Result<Vec<GitLabPipeline>> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/pipelines"))?;
        self.get_json(url).await
    }

    /// Every job of a pipeline, across all pages.
    pub async fn fetch_pipeline_jobs(
        &self,
        project: &str,
        pipeline_id: PipelineId,
    ) -> Result<Vec<GitLabJob>> {
        let mut all_jobs = Vec::new();
        let mut page = 1;
        loop {
            let url = self.project_endpoint(
                project,
                &format!("pipelines/{pipeline_id}/jobs?per_page={PAGE_SIZE}&page={page}"),
            )?;
            let batch: Vec<GitLabJob> = self.get_json(url).await?;
            let fetched = batch.len();
            all_jobs.extend(batch);

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(all_jobs)
    }

    /// Submits a retry. GitLab answers with the new job on success; a body
    /// without an `id` is treated as a refusal.
    pub async fn retry_job(&self, project: &str, job_id: JobId) -> Result<JobId> {
        let url = self.project_endpoint(project, &format!("jobs/{job_id}/retry"))?;
        let retried: GitLabRetriedJob = self.post_json(url).await?;

        retried.id.ok_or_else(|| MonitorError::Api {
            status: 200,
            message: match retried.message {
                Some(serde_json::Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => String::new(),
            },
        })
    }
}
