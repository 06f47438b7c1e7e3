use chrono::{DateTime, Local};
use log::{info, warn};
use std::collections::VecDeque;
use std::fmt;

use super::types::{JobId, MrId};

/// Something the user should be able to see happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    AutoRetryToggled {
        iid: MrId,
        enabled: bool,
    },
    RetryTriggered {
        iid: MrId,
        job_id: JobId,
        job_name: String,
    },
    RetryFailed {
        iid: MrId,
        job_id: JobId,
        job_name: String,
        message: String,
    },
    NothingToRetry {
        iid: MrId,
    },
    JobsUnavailable {
        iid: MrId,
        message: String,
    },
    RefreshFailed {
        message: String,
    },
    OpenFailed {
        iid: MrId,
        message: String,
    },
}

impl AuditEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::RetryFailed { .. }
                | Self::JobsUnavailable { .. }
                | Self::RefreshFailed { .. }
                | Self::OpenFailed { .. }
        )
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoRetryToggled { iid, enabled } => {
                let state = if *enabled { "ON" } else { "OFF" };
                write!(f, "Auto-retry for !{iid}: {state}")
            }
            Self::RetryTriggered {
                iid,
                job_id,
                job_name,
            } => write!(f, "Retrying !{iid} job {job_name} ({job_id}): ✓ retry triggered"),
            Self::RetryFailed {
                iid,
                job_id,
                job_name,
                message,
            } => write!(
                f,
                "Retrying !{iid} job {job_name} ({job_id}): ✗ retry failed: {message}"
            ),
            Self::NothingToRetry { iid } => write!(f, "No failed jobs for !{iid} to retry"),
            Self::JobsUnavailable { iid, message } => {
                write!(f, "Could not load jobs for !{iid}, skipping retry: {message}")
            }
            Self::RefreshFailed { message } => write!(f, "Error fetching MRs: {message}"),
            Self::OpenFailed { iid, message } => write!(f, "Could not open !{iid}: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub at: DateTime<Local>,
    pub event: AuditEvent,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.format("%H:%M:%S"), self.event)
    }
}

/// Bounded in-memory record of retry activity, oldest entries dropped first.
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, event: AuditEvent) {
        if event.is_failure() {
            warn!("{event}");
        } else {
            info!("{event}");
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(AuditEntry {
            at: Local::now(),
            event,
        });
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &AuditEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &AuditEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
