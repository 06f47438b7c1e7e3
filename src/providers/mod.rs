pub mod gitlab;

use async_trait::async_trait;

use crate::error::Result;
use crate::monitor::{Job, JobId, MergeRequestSummary, MrId, PipelineId, PipelineSummary, Scope};

pub use gitlab::GitLabProvider;

/// Everything the monitor needs from the review service.
///
/// Each call may fail on its own. Callers treat transport failures and error
/// responses the same way.
#[async_trait]
pub trait RemoteDataPort: Send + Sync {
    /// Open merge requests in server order.
    async fn list_merge_requests(&self, scope: Scope) -> Result<Vec<MergeRequestSummary>>;

    /// Most recent pipeline of a merge request, if it has one.
    async fn latest_pipeline(&self, iid: MrId) -> Result<Option<PipelineSummary>>;

    async fn pipeline_jobs(&self, pipeline_id: PipelineId) -> Result<Vec<Job>>;

    /// Whether the merge request satisfies its approval rules.
    async fn approval(&self, iid: MrId) -> Result<bool>;

    async fn unresolved_threads(&self, iid: MrId) -> Result<u32>;

    /// Asks the server to run a job again. The error carries the server's reason.
    async fn retry_job(&self, job_id: JobId) -> Result<()>;

    async fn open_in_browser(&self, iid: MrId) -> Result<()>;

    /// Username of the authenticated user.
    async fn current_user(&self) -> Result<String>;
}
