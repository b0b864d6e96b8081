//! Job store backing the status-polling surface.
//!
//! Keeps the latest snapshot per job id in memory and writes through to the
//! `jobs` table when a database is attached, so status survives restarts.
//! Readers always see a complete snapshot: events replace the stored job
//! atomically under the lock, never mutate it piecemeal.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::{self, JobRow};
use crate::db::Database;
use crate::provision::{GroupResult, Progress};
use crate::queue::job::{JobState, QueueKind};

use super::job_progress::JobProgressEvent;

// ─── StoredJob ──────────────────────────────────────────────────────────────

/// The latest observable snapshot of one job. This is the shape the status
/// query returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredJob {
    /// Unique job identifier (stable across retry attempts).
    pub id: String,
    pub queue: QueueKind,
    pub student_id: String,
    pub status: JobState,
    pub progress: Progress,
    /// VK group id once known; lets a retried execution resume without
    /// re-issuing the non-idempotent create call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GroupResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Execution attempts so far.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StoredJob {
    /// Creates a fresh record at enqueue time.
    pub fn new(id: &str, queue: QueueKind, student_id: &str, status: JobState) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            queue,
            student_id: student_id.to_string(),
            status,
            progress: Progress::default(),
            group_id: None,
            result: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn to_row(&self) -> JobRow {
        JobRow {
            id: self.id.clone(),
            queue: self.queue.as_str().to_string(),
            student_id: self.student_id.clone(),
            status: self.status.to_string(),
            progress: serde_json::to_string(&self.progress).unwrap_or_else(|_| "{}".to_string()),
            vk_group_id: self.group_id,
            result: self
                .result
                .as_ref()
                .and_then(|r| serde_json::to_string(r).ok()),
            error: self.error.clone(),
            attempts: self.attempts,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
            completed_at: self.completed_at.map(|t| t.to_rfc3339()),
        }
    }

    fn from_row(row: &JobRow) -> Self {
        Self {
            id: row.id.clone(),
            queue: parse_queue(&row.queue),
            student_id: row.student_id.clone(),
            status: parse_status(&row.status, &row.id),
            progress: serde_json::from_str(&row.progress).unwrap_or_default(),
            group_id: row.vk_group_id,
            result: row
                .result
                .as_ref()
                .and_then(|r| serde_json::from_str(r).ok()),
            error: row.error.clone(),
            attempts: row.attempts,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
            completed_at: row.completed_at.as_ref().map(|t| parse_timestamp(t)),
        }
    }
}

fn parse_queue(s: &str) -> QueueKind {
    match s {
        "post_scheduling" => QueueKind::PostScheduling,
        _ => QueueKind::GroupCreation,
    }
}

fn parse_status(s: &str, job_id: &str) -> JobState {
    match s {
        "waiting" => JobState::Waiting,
        "active" => JobState::Active,
        "completed" => JobState::Completed,
        "failed" => JobState::Failed,
        "delayed" => JobState::Delayed,
        other => {
            log::warn!(
                "Unknown job status '{}' for job {}, defaulting to waiting",
                other,
                job_id
            );
            JobState::Waiting
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Latest-snapshot store for all jobs, optionally write-through persistent.
pub struct JobStore {
    jobs: RwLock<HashMap<String, StoredJob>>,
    db: Option<Database>,
}

impl JobStore {
    /// Creates a store; pass a database to persist snapshots across
    /// restarts, or `None` for a purely in-memory store (tests).
    pub fn new(db: Option<Database>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            db,
        }
    }

    /// Registers a fresh job at enqueue time.
    pub fn insert(&self, job: StoredJob) {
        self.persist(&job);
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.insert(job.id.clone(), job);
        }
    }

    /// Applies a progress event, replacing the stored snapshot.
    pub fn apply(&self, event: &JobProgressEvent) {
        let Ok(mut jobs) = self.jobs.write() else {
            return;
        };
        let Some(job) = jobs.get_mut(&event.job_id) else {
            log::warn!("Progress event for unknown job {}", event.job_id);
            return;
        };

        job.status = event.status;
        job.progress = event.progress.clone();
        if event.group_id.is_some() {
            job.group_id = event.group_id;
        }
        if event.result.is_some() {
            job.result = event.result.clone();
        }
        job.error = event.error.clone();
        job.updated_at = event.timestamp;
        if event.status.is_terminal() {
            job.completed_at = Some(event.timestamp);
        }

        let snapshot = job.clone();
        drop(jobs);
        self.persist(&snapshot);
    }

    /// Records the start of an execution attempt.
    pub fn mark_active(&self, job_id: &str, attempt: u32) {
        let Ok(mut jobs) = self.jobs.write() else {
            return;
        };
        let Some(job) = jobs.get_mut(job_id) else {
            return;
        };
        job.status = JobState::Active;
        job.attempts = attempt;
        job.updated_at = Utc::now();

        let snapshot = job.clone();
        drop(jobs);
        self.persist(&snapshot);
    }

    /// Returns the latest snapshot for a job, falling back to the database
    /// for jobs from a previous process lifetime.
    pub fn get(&self, job_id: &str) -> Option<StoredJob> {
        if let Ok(jobs) = self.jobs.read() {
            if let Some(job) = jobs.get(job_id) {
                return Some(job.clone());
            }
        }

        let db = self.db.as_ref()?;
        match job_repo::find_by_id(db, job_id) {
            Ok(row) => row.as_ref().map(StoredJob::from_row),
            Err(e) => {
                log::warn!("Job lookup failed for {}: {}", job_id, e);
                None
            }
        }
    }

    fn persist(&self, job: &StoredJob) {
        let Some(ref db) = self.db else {
            return;
        };
        if let Err(e) = job_repo::upsert(db, &job.to_row()) {
            log::warn!("Failed to persist job {}: {}", job.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiting_job(id: &str) -> StoredJob {
        StoredJob::new(id, QueueKind::GroupCreation, "student-1", JobState::Waiting)
    }

    #[test]
    fn test_insert_and_get() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        let job = store.get("job-1").unwrap();
        assert_eq!(job.status, JobState::Waiting);
        assert_eq!(job.attempts, 0);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_apply_snapshot() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        let mut progress = Progress::default();
        progress.group_created = true;
        let event = JobProgressEvent::snapshot(
            "job-1",
            QueueKind::GroupCreation,
            "student-1",
            &progress,
            Some(42),
        );
        store.apply(&event);

        let job = store.get("job-1").unwrap();
        assert_eq!(job.status, JobState::Active);
        assert!(job.progress.group_created);
        assert_eq!(job.group_id, Some(42));
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_group_id_not_cleared_by_later_events() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        let progress = Progress::default();
        store.apply(&JobProgressEvent::snapshot(
            "job-1",
            QueueKind::GroupCreation,
            "student-1",
            &progress,
            Some(42),
        ));
        // A later event without a group id keeps the recorded one.
        store.apply(&JobProgressEvent::snapshot(
            "job-1",
            QueueKind::GroupCreation,
            "student-1",
            &progress,
            None,
        ));

        assert_eq!(store.get("job-1").unwrap().group_id, Some(42));
    }

    #[test]
    fn test_terminal_event_sets_completed_at() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        let progress = Progress::default();
        store.apply(&JobProgressEvent::failed(
            "job-1",
            QueueKind::GroupCreation,
            "student-1",
            &progress,
            None,
            "VK API error 100: bad params",
        ));

        let job = store.get("job-1").unwrap();
        assert_eq!(job.status, JobState::Failed);
        assert!(job.completed_at.is_some());
        assert!(job.error.unwrap().contains("100"));
    }

    #[test]
    fn test_mark_active_counts_attempts() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        store.mark_active("job-1", 1);
        assert_eq!(store.get("job-1").unwrap().attempts, 1);
        store.mark_active("job-1", 2);
        let job = store.get("job-1").unwrap();
        assert_eq!(job.attempts, 2);
        assert_eq!(job.status, JobState::Active);
    }

    #[test]
    fn test_persistence_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let store = JobStore::new(Some(db.clone()));
        store.insert(waiting_job("job-1"));

        let mut progress = Progress::default();
        progress.group_created = true;
        progress.posts_published = 2;
        store.apply(&JobProgressEvent::snapshot(
            "job-1",
            QueueKind::GroupCreation,
            "student-1",
            &progress,
            Some(42),
        ));

        // A fresh store over the same database sees the snapshot.
        let rehydrated = JobStore::new(Some(db));
        let job = rehydrated.get("job-1").unwrap();
        assert_eq!(job.status, JobState::Active);
        assert!(job.progress.group_created);
        assert_eq!(job.progress.posts_published, 2);
        assert_eq!(job.group_id, Some(42));
        assert_eq!(job.queue, QueueKind::GroupCreation);
    }

    #[test]
    fn test_status_response_shape() {
        let store = JobStore::new(None);
        store.insert(waiting_job("job-1"));

        let json = serde_json::to_string(&store.get("job-1").unwrap()).unwrap();
        assert!(json.contains("\"id\":\"job-1\""));
        assert!(json.contains("\"status\":\"waiting\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        // Unset optional fields are omitted.
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }
}
