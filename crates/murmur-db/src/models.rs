/// Database row types — these map directly to SQLite rows.
/// Distinct from murmur-types API models to keep the DB layer independent.

pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub verify_code: String,
    /// Unix seconds; the code is invalid at or after this instant.
    pub verify_code_expiry: i64,
    pub is_verified: bool,
    pub is_accepting: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub account_id: String,
    pub content: String,
    pub created_at: String,
}
