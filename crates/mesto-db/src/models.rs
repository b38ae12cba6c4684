/// Database row types. These map directly to SQLite rows and stay separate
/// from the mesto-types wire models so the store has no HTTP concerns.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub about: String,
    pub avatar: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    pub password: String,
    pub created_at: String,
}

/// Fields for a user that does not exist yet.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub about: &'a str,
    pub avatar: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug)]
pub struct CardRow {
    pub id: String,
    pub name: String,
    pub link: String,
    pub owner_id: String,
    pub created_at: String,
    /// Ids of liking users, in the order the likes were recorded.
    pub likes: Vec<String>,
}
