use crate::Database;
use crate::models::{ThoughtRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const THOUGHT_COLUMNS: &str = "id, message, hearts, created_at, created_by";
const USER_COLUMNS: &str = "id, email, password, access_token, created_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        access_token: &str,
    ) -> Result<UserRow> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO users (id, email, password, access_token) VALUES (?1, ?2, ?3, ?4)
                 RETURNING {USER_COLUMNS}"
            );
            let row = conn.query_row(&sql, (id, email, password_hash, access_token), user_from_row)?;
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_token(&self, access_token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "access_token", access_token))
    }

    /// Not used by any route; lets callers and tests inspect how many accounts exist.
    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    // -- Thoughts --

    pub fn insert_thought(
        &self,
        id: &str,
        message: &str,
        created_by: Option<&str>,
    ) -> Result<ThoughtRow> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO thoughts (id, message, created_by) VALUES (?1, ?2, ?3)
                 RETURNING {THOUGHT_COLUMNS}"
            );
            let row = conn.query_row(&sql, (id, message, created_by), thought_from_row)?;
            Ok(row)
        })
    }

    pub fn get_thought(&self, id: &str) -> Result<Option<ThoughtRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {THOUGHT_COLUMNS} FROM thoughts WHERE id = ?1");
            conn.query_row(&sql, [id], thought_from_row).optional()
        })
    }

    /// Newest first. Rows sharing a timestamp fall back to insertion order.
    pub fn list_thoughts(&self, limit: u32, offset: u64) -> Result<Vec<ThoughtRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {THOUGHT_COLUMNS} FROM thoughts
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let offset = i64::try_from(offset).unwrap_or(i64::MAX);
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], thought_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_thoughts(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM thoughts", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    /// Single-statement increment, so concurrent likes are never lost.
    pub fn like_thought(&self, id: &str) -> Result<Option<ThoughtRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE thoughts SET hearts = hearts + 1 WHERE id = ?1 RETURNING {THOUGHT_COLUMNS}"
            );
            conn.query_row(&sql, [id], thought_from_row).optional()
        })
    }

    pub fn update_thought_message(&self, id: &str, message: &str) -> Result<Option<ThoughtRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE thoughts SET message = ?2 WHERE id = ?1 RETURNING {THOUGHT_COLUMNS}"
            );
            conn.query_row(&sql, (id, message), thought_from_row).optional()
        })
    }

    /// Returns false if no such thought existed.
    pub fn delete_thought(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM thoughts WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    conn.query_row(&sql, [value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        access_token: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn thought_from_row(row: &Row<'_>) -> rusqlite::Result<ThoughtRow> {
    Ok(ThoughtRow {
        id: row.get(0)?,
        message: row.get(1)?,
        hearts: row.get(2)?,
        created_at: row.get(3)?,
        created_by: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_and_get_thought() {
        let db = db();
        let row = db.insert_thought("t1", "hello there", None).unwrap();
        assert_eq!(row.hearts, 0);
        assert!(row.created_by.is_none());
        assert!(row.created_at.ends_with('Z'));

        let fetched = db.get_thought("t1").unwrap().unwrap();
        assert_eq!(fetched.message, "hello there");
        assert!(db.get_thought("missing").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let db = db();
        for i in 0..5 {
            db.insert_thought(&format!("t{i}"), "some words", None).unwrap();
        }

        let page = db.list_thoughts(2, 0).unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t3"]);

        let last = db.list_thoughts(2, 4).unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, "t0");

        assert_eq!(db.count_thoughts().unwrap(), 5);
    }

    #[test]
    fn like_increments() {
        let db = db();
        db.insert_thought("t1", "like me please", None).unwrap();
        db.like_thought("t1").unwrap();
        let row = db.like_thought("t1").unwrap().unwrap();
        assert_eq!(row.hearts, 2);
        assert!(db.like_thought("missing").unwrap().is_none());
    }

    #[test]
    fn update_and_delete() {
        let db = db();
        db.insert_thought("t1", "first draft", None).unwrap();

        let row = db.update_thought_message("t1", "second draft").unwrap().unwrap();
        assert_eq!(row.message, "second draft");
        assert!(db.update_thought_message("missing", "whatever").unwrap().is_none());

        assert!(db.delete_thought("t1").unwrap());
        assert!(!db.delete_thought("t1").unwrap());
        assert!(db.get_thought("t1").unwrap().is_none());
    }

    #[test]
    fn users_by_email_and_token() {
        let db = db();
        db.create_user("u1", "a@example.com", "hash", "tok").unwrap();
        db.insert_thought("t1", "owned thought", Some("u1")).unwrap();

        assert_eq!(db.get_user_by_email("a@example.com").unwrap().unwrap().id, "u1");
        assert_eq!(db.get_user_by_token("tok").unwrap().unwrap().email, "a@example.com");
        assert!(db.get_user_by_token("nope").unwrap().is_none());
        assert_eq!(db.get_thought("t1").unwrap().unwrap().created_by.as_deref(), Some("u1"));
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let db = db();
        db.create_user("u1", "a@example.com", "hash", "tok1").unwrap();
        let err = db.create_user("u2", "a@example.com", "hash", "tok2").unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn unknown_author_is_rejected() {
        let db = db();
        let err = db.insert_thought("t1", "orphan thought", Some("ghost")).unwrap_err();
        assert!(!is_unique_violation(&err));
    }
}
