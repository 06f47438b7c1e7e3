use serde::{Deserialize, Serialize};
use std::fmt;

pub type MrId = u64;
pub type PipelineId = u64;
pub type JobId = u64;

/// Status shared by GitLab pipelines and jobs.
///
/// Anything GitLab reports that is not listed here deserializes to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
    Running,
    Pending,
    Canceled,
    Skipped,
    Manual,
    Created,
    WaitingForResource,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Manual => "manual",
            Self::Created => "created",
            Self::WaitingForResource => "waiting_for_resource",
            Self::Unknown => "unknown",
        }
    }

    /// Still queued or executing.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Running | Self::Pending | Self::Created | Self::WaitingForResource
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Canceled | Self::Skipped
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which merge requests a refresh lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Assigned to the authenticated user
    #[default]
    Mine,
    All,
}

impl Scope {
    pub fn toggled(self) -> Self {
        match self {
            Self::Mine => Self::All,
            Self::All => Self::Mine,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mine => "Mine",
            Self::All => "All",
        }
    }
}

/// A job within a pipeline, as last fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub stage: String,
    pub status: Status,
    /// Execution time in seconds
    pub duration: Option<f64>,
    /// Failure does not block the pipeline
    pub allow_failure: bool,
    pub web_url: String,
}

impl Job {
    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Pipeline metadata without jobs, as returned by the pipeline lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub id: PipelineId,
    pub status: Status,
    pub web_url: String,
}

/// The most recent pipeline of a merge request.
///
/// `jobs` is empty until fetched and is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub status: Status,
    pub web_url: String,
    pub jobs: Vec<Job>,
}

impl Pipeline {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Distinct stage names ordered by the lowest job id in each stage.
    pub fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = Vec::new();
        for job in self.jobs_by_id() {
            if !stages.iter().any(|stage| stage == &job.stage) {
                stages.push(job.stage.clone());
            }
        }
        stages
    }

    /// Jobs of one stage, ascending by id.
    pub fn jobs_in_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.jobs_by_id()
            .into_iter()
            .filter(move |job| job.stage == stage)
    }

    fn jobs_by_id(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.iter().collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }
}

impl From<PipelineSummary> for Pipeline {
    fn from(summary: PipelineSummary) -> Self {
        Self {
            id: summary.id,
            status: summary.status,
            web_url: summary.web_url,
            jobs: Vec::new(),
        }
    }
}

/// An open merge request as listed by GitLab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRequestSummary {
    pub iid: MrId,
    pub title: String,
    pub source_branch: String,
    pub web_url: String,
    pub assignees: Vec<String>,
}

const DRAFT_PREFIXES: [&str; 3] = ["draft:", "[draft]", "(draft)"];

/// Server-side view of a merge request after enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRequest {
    pub iid: MrId,
    pub title: String,
    pub source_branch: String,
    pub web_url: String,
    pub assignees: Vec<String>,
    pub pipeline: Option<Pipeline>,
    /// `None` until an approval lookup succeeds
    pub approved: Option<bool>,
    pub unresolved_threads: u32,
}

impl MergeRequest {
    pub fn is_draft(&self) -> bool {
        let title = self.title.trim_start().to_lowercase();
        DRAFT_PREFIXES.iter().any(|prefix| title.starts_with(prefix))
    }

    pub fn is_assigned_to(&self, username: &str) -> bool {
        self.assignees.iter().any(|assignee| assignee == username)
    }
}

impl From<MergeRequestSummary> for MergeRequest {
    fn from(summary: MergeRequestSummary) -> Self {
        Self {
            iid: summary.iid,
            title: summary.title,
            source_branch: summary.source_branch,
            web_url: summary.web_url,
            assignees: summary.assignees,
            pipeline: None,
            approved: None,
            unresolved_threads: 0,
        }
    }
}

/// Per merge request state owned by the user, never written by a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LocalIntent {
    pub auto_retry: bool,
    pub expanded: bool,
}

/// A merge request joined with its local intent for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MrRow {
    #[serde(flatten)]
    pub merge_request: MergeRequest,
    #[serde(flatten)]
    pub intent: LocalIntent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: JobId, name: &str, stage: &str, status: Status) -> Job {
        Job {
            id,
            name: name.to_string(),
            stage: stage.to_string(),
            status,
            duration: None,
            allow_failure: false,
            web_url: String::new(),
        }
    }

    fn pipeline(status: Status, jobs: Vec<Job>) -> Pipeline {
        Pipeline {
            id: 1,
            status,
            web_url: String::new(),
            jobs,
        }
    }

    fn merge_request(title: &str) -> MergeRequest {
        MergeRequest::from(MergeRequestSummary {
            iid: 1,
            title: title.to_string(),
            source_branch: "feature".to_string(),
            web_url: String::new(),
            assignees: vec!["alice".to_string()],
        })
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_deserializes_known_and_unknown_values() {
            let statuses: Vec<Status> = serde_json::from_str(
                r#"["success","waiting_for_resource","scheduled","preparing"]"#,
            )
            .unwrap();
            assert_eq!(
                statuses,
                vec![
                    Status::Success,
                    Status::WaitingForResource,
                    Status::Unknown,
                    Status::Unknown
                ]
            );
        }

        #[test]
        fn test_active_statuses() {
            for status in [
                Status::Running,
                Status::Pending,
                Status::Created,
                Status::WaitingForResource,
            ] {
                assert!(status.is_active(), "{status} should be active");
            }
            for status in [Status::Success, Status::Failed, Status::Manual, Status::Unknown] {
                assert!(!status.is_active(), "{status} should not be active");
            }
        }

        #[test]
        fn test_terminal_statuses() {
            assert!(job(1, "a", "s", Status::Success).is_terminal());
            assert!(job(1, "a", "s", Status::Failed).is_terminal());
            assert!(job(1, "a", "s", Status::Canceled).is_terminal());
            assert!(job(1, "a", "s", Status::Skipped).is_terminal());
            assert!(!job(1, "a", "s", Status::Running).is_terminal());
            assert!(!job(1, "a", "s", Status::Manual).is_terminal());
        }

        #[test]
        fn test_only_failed_counts_as_failed() {
            assert!(job(1, "a", "s", Status::Failed).is_failed());
            assert!(!job(1, "a", "s", Status::Canceled).is_failed());
        }
    }

    mod stages_tests {
        use super::*;

        #[test]
        fn test_empty_pipeline_has_no_stages() {
            assert!(pipeline(Status::Success, vec![]).stages().is_empty());
        }

        #[test]
        fn test_ordered_by_lowest_job_id() {
            let pipeline = pipeline(
                Status::Failed,
                vec![
                    job(30, "lint", "lint", Status::Failed),
                    job(10, "build", "build", Status::Success),
                    job(25, "unit", "test", Status::Success),
                    job(20, "integration", "test", Status::Failed),
                ],
            );
            assert_eq!(pipeline.stages(), vec!["build", "test", "lint"]);
        }

        #[test]
        fn test_jobs_in_stage_are_sorted_by_id() {
            let pipeline = pipeline(
                Status::Failed,
                vec![
                    job(25, "unit", "test", Status::Success),
                    job(20, "integration", "test", Status::Failed),
                    job(10, "build", "build", Status::Success),
                ],
            );
            let names: Vec<&str> = pipeline
                .jobs_in_stage("test")
                .map(|job| job.name.as_str())
                .collect();
            assert_eq!(names, vec!["integration", "unit"]);
        }
    }

    mod merge_request_tests {
        use super::*;

        #[test]
        fn test_recognises_draft_prefixes() {
            assert!(merge_request("Draft: rework parser").is_draft());
            assert!(merge_request("[Draft] rework parser").is_draft());
            assert!(merge_request("(draft) rework parser").is_draft());
            assert!(!merge_request("Rework draft parser").is_draft());
        }

        #[test]
        fn test_starts_without_enrichment() {
            let mr = merge_request("Fix login bug");
            assert!(mr.pipeline.is_none());
            assert!(mr.approved.is_none());
            assert_eq!(mr.unresolved_threads, 0);
        }

        #[test]
        fn test_matches_assignee_by_username() {
            let mr = merge_request("Fix login bug");
            assert!(mr.is_assigned_to("alice"));
            assert!(!mr.is_assigned_to("bob"));
        }
    }
}
