//! Group repository — the durable record of a provisioned VK community,
//! keyed by student id.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw group row from the database.
#[derive(Debug, Clone)]
pub struct GroupRow {
    pub student_id: String,
    pub vk_group_id: i64,
    pub screen_name: String,
    pub url: String,
    pub status: String,
    pub progress: String,
    pub created_at: String,
    pub updated_at: String,
}

impl GroupRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            student_id: row.get("student_id")?,
            vk_group_id: row.get("vk_group_id")?,
            screen_name: row.get("screen_name")?,
            url: row.get("url")?,
            status: row.get("status")?,
            progress: row.get("progress")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts or updates the group record for a student.
pub fn upsert(db: &Database, group: &GroupRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO groups (student_id, vk_group_id, screen_name, url, status, progress,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(student_id) DO UPDATE SET
               vk_group_id = ?2,
               screen_name = ?3,
               url = ?4,
               status = ?5,
               progress = ?6,
               updated_at = ?8",
            params![
                group.student_id,
                group.vk_group_id,
                group.screen_name,
                group.url,
                group.status,
                group.progress,
                group.created_at,
                group.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds the group record for a student.
pub fn find_by_student(db: &Database, student_id: &str) -> Result<Option<GroupRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM groups WHERE student_id = ?1")?;
        let mut rows = stmt.query_map(params![student_id], GroupRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_group() -> GroupRow {
        GroupRow {
            student_id: "student-1".to_string(),
            vk_group_id: 222001,
            screen_name: "club222001".to_string(),
            url: "https://vk.com/club222001".to_string(),
            status: "completed".to_string(),
            progress: "{}".to_string(),
            created_at: "2026-08-01T10:00:00+00:00".to_string(),
            updated_at: "2026-08-01T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let db = test_db();
        upsert(&db, &sample_group()).unwrap();

        let found = find_by_student(&db, "student-1").unwrap().unwrap();
        assert_eq!(found.vk_group_id, 222001);
        assert_eq!(found.screen_name, "club222001");
        assert_eq!(found.url, "https://vk.com/club222001");
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = test_db();
        upsert(&db, &sample_group()).unwrap();

        let mut updated = sample_group();
        updated.status = "failed".to_string();
        updated.updated_at = "2026-08-02T00:00:00+00:00".to_string();
        upsert(&db, &updated).unwrap();

        let found = find_by_student(&db, "student-1").unwrap().unwrap();
        assert_eq!(found.status, "failed");
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_student(&db, "missing").unwrap().is_none());
    }
}
