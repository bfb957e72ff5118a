//! Job entity, lifecycle states and listing DTOs.
//!
//! A job moves strictly along `pending -> running -> {done | failed}`.
//! [`JobState::can_transition_to`] is the single source of truth for that
//! rule; every store backend checks it before mutating a job.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, Timestamp, WorkerId};

/// State ID type matching the SMALLINT `job_states` lookup table.
pub type StateId = i16;

/// Maximum page size for job listing.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Job lifecycle state. Discriminants match the seed order of `job_states`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending = 1,
    Running = 2,
    Done = 3,
    Failed = 4,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::Pending,
        JobState::Running,
        JobState::Done,
        JobState::Failed,
    ];

    /// Return the database state ID.
    pub fn id(self) -> StateId {
        self as StateId
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    /// `done` and `failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Done)
                | (JobState::Running, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<JobState> for StateId {
    fn from(value: JobState) -> Self {
        value as StateId
    }
}

impl TryFrom<StateId> for JobState {
    type Error = CoreError;

    fn try_from(id: StateId) -> Result<Self, Self::Error> {
        JobState::ALL
            .into_iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| CoreError::Storage(format!("Unknown job state id {id}")))
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown job state '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of work and its lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub payload: serde_json::Value,
    pub state: JobState,
    pub assigned_worker: Option<WorkerId>,
    pub failure_reason: Option<String>,
    /// Set when this job was created by manually retrying a failed one.
    pub retry_of_job_id: Option<JobId>,
    pub created_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Create a new pending job with a fresh time-ordered id.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: JobId::now_v7(),
            payload,
            state: JobState::Pending,
            assigned_worker: None,
            failure_reason: None,
            retry_of_job_id: None,
            created_at: chrono::Utc::now(),
            claimed_at: None,
            completed_at: None,
        }
    }

    /// Create a pending copy of a failed job, linked back to it.
    pub fn retry_of(original: &Job) -> Self {
        Self {
            retry_of_job_id: Some(original.id),
            ..Self::new(original.payload.clone())
        }
    }

    /// Check that moving to `next` is allowed from the current state.
    pub fn ensure_transition(&self, next: JobState) -> Result<(), CoreError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                job_id: self.id,
                from: self.state,
                to: next,
            })
        }
    }

    /// Apply pending -> running.
    pub fn start(&mut self, worker_id: &str) -> Result<(), CoreError> {
        self.ensure_transition(JobState::Running)?;
        self.state = JobState::Running;
        self.assigned_worker = Some(worker_id.to_string());
        self.claimed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Apply running -> done.
    pub fn finish(&mut self) -> Result<(), CoreError> {
        self.ensure_transition(JobState::Done)?;
        self.state = JobState::Done;
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Apply running -> failed.
    pub fn fail(&mut self, reason: &str) -> Result<(), CoreError> {
        self.ensure_transition(JobState::Failed)?;
        self.state = JobState::Failed;
        self.failure_reason = Some(reason.to_string());
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Filter and pagination for job listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub state: Option<JobState>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl JobListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Number of jobs in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub pending: i64,
    pub running: i64,
    pub done: i64,
    pub failed: i64,
}

impl JobCounts {
    pub fn add(&mut self, state: JobState, n: i64) {
        match state {
            JobState::Pending => self.pending += n,
            JobState::Running => self.running += n,
            JobState::Done => self.done += n,
            JobState::Failed => self.failed += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.pending + self.running + self.done + self.failed
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn state_ids_match_seed_data() {
        assert_eq!(JobState::Pending.id(), 1);
        assert_eq!(JobState::Running.id(), 2);
        assert_eq!(JobState::Done.id(), 3);
        assert_eq!(JobState::Failed.id(), 4);
    }

    #[test]
    fn state_id_round_trips_through_lookup() {
        for state in JobState::ALL {
            assert_eq!(JobState::try_from(state.id()).unwrap(), state);
        }
        assert_matches!(JobState::try_from(9), Err(CoreError::Storage(_)));
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        let allowed = [
            (JobState::Pending, JobState::Running),
            (JobState::Running, JobState::Done),
            (JobState::Running, JobState::Failed),
        ];
        for from in JobState::ALL {
            for to in JobState::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn parses_lowercase_names() {
        assert_eq!("running".parse::<JobState>().unwrap(), JobState::Running);
        assert_matches!("RUNNING".parse::<JobState>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn job_walks_happy_path() {
        let mut job = Job::new(serde_json::json!({"n": 1}));
        job.start("worker-a").unwrap();
        assert_eq!(job.assigned_worker.as_deref(), Some("worker-a"));
        assert!(job.claimed_at.is_some());
        job.finish().unwrap();
        assert_eq!(job.state, JobState::Done);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn finishing_a_pending_job_is_rejected() {
        let mut job = Job::new(serde_json::Value::Null);
        assert_matches!(
            job.finish(),
            Err(CoreError::InvalidTransition {
                from: JobState::Pending,
                to: JobState::Done,
                ..
            })
        );
        assert_eq!(job.state, JobState::Pending);
    }

    #[test]
    fn failed_job_is_terminal() {
        let mut job = Job::new(serde_json::Value::Null);
        job.start("w").unwrap();
        job.fail("boom").unwrap();
        assert!(job.state.is_terminal());
        assert_eq!(job.failure_reason.as_deref(), Some("boom"));
        assert_matches!(job.finish(), Err(CoreError::InvalidTransition { .. }));
        assert_matches!(job.start("w2"), Err(CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn retry_copies_payload_and_links_original() {
        let original = Job::new(serde_json::json!({"cmd": "x"}));
        let retry = Job::retry_of(&original);
        assert_ne!(retry.id, original.id);
        assert_eq!(retry.payload, original.payload);
        assert_eq!(retry.retry_of_job_id, Some(original.id));
        assert_eq!(retry.state, JobState::Pending);
    }

    #[test]
    fn list_query_clamps_limits() {
        let q = JobListQuery {
            limit: Some(1000),
            offset: Some(-4),
            ..Default::default()
        };
        assert_eq!(q.limit(), MAX_LIST_LIMIT);
        assert_eq!(q.offset(), 0);
        assert_eq!(JobListQuery::default().limit(), DEFAULT_LIST_LIMIT);
    }
}
