/// Database row types — these map directly to SQLite rows.
/// Distinct from thoughts-types API models to keep the DB layer independent.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ThoughtRow {
    pub id: String,
    pub message: String,
    pub hearts: i64,
    pub created_at: String,
    pub created_by: Option<String>,
}
