//! Job repository — CRUD operations for the `jobs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database. Progress and result are stored as JSON
/// text; decoding them is the caller's concern.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub queue: String,
    pub student_id: String,
    pub status: String,
    pub progress: String,
    pub vk_group_id: Option<i64>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            queue: row.get("queue")?,
            student_id: row.get("student_id")?,
            status: row.get("status")?,
            progress: row.get("progress")?,
            vk_group_id: row.get("vk_group_id")?,
            result: row.get("result")?,
            error: row.get("error")?,
            attempts: row.get("attempts")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Inserts or fully replaces a job row (the id is stable across attempts).
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, queue, student_id, status, progress, vk_group_id, result,
             error, attempts, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
               status = ?4,
               progress = ?5,
               vk_group_id = ?6,
               result = ?7,
               error = ?8,
               attempts = ?9,
               updated_at = ?11,
               completed_at = ?12",
            params![
                job.id,
                job.queue,
                job.student_id,
                job.status,
                job.progress,
                job.vk_group_id,
                job.result,
                job.error,
                job.attempts,
                job.created_at,
                job.updated_at,
                job.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all jobs for a student, newest first.
pub fn find_by_student(db: &Database, student_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT * FROM jobs WHERE student_id = ?1 ORDER BY created_at DESC")?;
        let rows: Vec<JobRow> = stmt
            .query_map(params![student_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
