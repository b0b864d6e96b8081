//! VK token repository — encrypted access tokens, one per student.
//!
//! The `access_token` column holds AES-GCM ciphertext (hex), never the raw
//! token; see [`crate::secrets::TokenEncryptor`].

use rusqlite::params;

use super::{Database, DatabaseError};

/// A raw token row from the database.
#[derive(Debug, Clone)]
pub struct TokenRow {
    pub student_id: String,
    /// Encrypted token, hex-encoded.
    pub access_token: String,
    pub vk_user_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Inserts or updates a student's token.
pub fn upsert(db: &Database, row: &TokenRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO vk_tokens (student_id, access_token, vk_user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(student_id) DO UPDATE SET
               access_token = ?2,
               vk_user_id = ?3,
               updated_at = ?5",
            params![
                row.student_id,
                row.access_token,
                row.vk_user_id,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a token by student id.
pub fn find(db: &Database, student_id: &str) -> Result<Option<TokenRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT student_id, access_token, vk_user_id, created_at, updated_at
             FROM vk_tokens WHERE student_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![student_id], |row| {
            Ok(TokenRow {
                student_id: row.get(0)?,
                access_token: row.get(1)?,
                vk_user_id: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Deletes a student's token (access revocation).
pub fn delete(db: &Database, student_id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "DELETE FROM vk_tokens WHERE student_id = ?1",
            params![student_id],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_token(student_id: &str) -> TokenRow {
        TokenRow {
            student_id: student_id.to_string(),
            access_token: "deadbeef".to_string(),
            vk_user_id: Some(9001),
            created_at: "2026-08-01T10:00:00+00:00".to_string(),
            updated_at: "2026-08-01T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_upsert_and_find() {
        let db = test_db();
        upsert(&db, &sample_token("student-1")).unwrap();

        let found = find(&db, "student-1").unwrap().unwrap();
        assert_eq!(found.access_token, "deadbeef");
        assert_eq!(found.vk_user_id, Some(9001));
    }

    #[test]
    fn test_upsert_overwrites() {
        let db = test_db();
        upsert(&db, &sample_token("student-1")).unwrap();

        let mut updated = sample_token("student-1");
        updated.access_token = "cafebabe".to_string();
        upsert(&db, &updated).unwrap();

        let found = find(&db, "student-1").unwrap().unwrap();
        assert_eq!(found.access_token, "cafebabe");
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        upsert(&db, &sample_token("student-1")).unwrap();
        delete(&db, "student-1").unwrap();
        assert!(find(&db, "student-1").unwrap().is_none());
    }
}
