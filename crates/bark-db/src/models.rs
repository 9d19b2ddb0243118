/// Database row types — these map directly to SQLite rows.
/// Distinct from bark-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub picture: String,
    pub roles: String,
    pub created_at: String,
}

impl UserRow {
    /// `roles` is stored comma-joined, e.g. "User" or "User,Admin".
    pub fn role_list(&self) -> Vec<String> {
        self.roles.split(',').map(|r| r.trim().to_string()).collect()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.split(',').any(|r| r.trim() == "Admin")
    }
}

pub struct BarkRow {
    pub id: String,
    pub content: String,
    pub likes: i64,
    pub creator_id: String,
    pub creator_username: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub content: String,
    pub creator_id: String,
    pub creator_username: String,
    pub bark_id: String,
    pub created_at: String,
}

pub struct ReportRow {
    pub id: String,
    pub content: String,
    pub bark_id: String,
    pub created_at: String,
}
