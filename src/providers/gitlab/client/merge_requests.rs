use super::core::{GitLabClient, PAGE_SIZE};
use crate::error::Result;
use crate::monitor::{MrId, Scope};
use crate::providers::gitlab::types::{
    GitLabApprovals, GitLabDiscussion, GitLabMergeRequest, GitLabUser,
};

impl GitLabClient {
    /// Open merge requests, newest first, up to `limit`.
    pub async fn fetch_merge_requests(
        &self,
        project: &str,
        scope: Scope,
        limit: usize,
    ) -> Result<Vec<GitLabMergeRequest>> {
        let scope = match scope {
            Scope::Mine => "assigned_to_me",
            Scope::All => "all",
        };
        let per_page = limit.clamp(1, PAGE_SIZE);

        let mut all_merge_requests = Vec::new();
        let mut page = 1;
        while all_merge_requests.len() < limit {
            let url = self.project_endpoint(
                project,
                &format!(
                    "merge_requests?state=opened&scope={scope}&per_page={per_page}&page={page}"
                ),
            )?;
            let batch: Vec<GitLabMergeRequest> = self.get_json(url).await?;
            let fetched = batch.len();
            all_merge_requests.extend(batch);

            if fetched < per_page {
                break;
            }
            page += 1;
        }

        all_merge_requests.truncate(limit);
        Ok(all_merge_requests)
    }

    pub async fn fetch_merge_request(
        &self,
        project: &str,
        iid: MrId,
    ) -> Result<GitLabMergeRequest> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}"))?;
        self.get_json(url).await
    }

    pub async fn fetch_approvals(&self, project: &str, iid: MrId) -> Result<GitLabApprovals> {
        let url = self.project_endpoint(project, &format!("merge_requests/{iid}/approvals"))?;
        self.get_json(url).await
    }

    /// Every discussion on a merge request, across all pages.
    pub async fn fetch_discussions(
        &self,
        project: &str,
        iid: MrId,
    ) -> Result<Vec<GitLabDiscussion>> {
        let mut all_discussions = Vec::new();
        let mut page = 1;
        loop {
            let url = self.project_endpoint(
                project,
                &format!("merge_requests/{iid}/discussions?per_page={PAGE_SIZE}&page={page}"),
            )?;
            let batch: Vec<GitLabDiscussion> = self.get_json(url).await?;
            let fetched = batch.len();
            all_discussions.extend(batch);

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(all_discussions)
    }

    pub async fn fetch_current_user(&self) -> Result<GitLabUser> {
        self.get_json(self.endpoint("user")?).await
    }
}
