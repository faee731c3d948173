use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User row in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String, // Argon2 PHC string
    pub email: String,
    pub created_at: OffsetDateTime,
    pub created_by: Uuid,
    pub updated_at: Option<OffsetDateTime>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<Uuid>,
}

impl UserRecord {
    /// A fresh, self-created record.
    pub fn new(
        id: Uuid,
        name: String,
        username: String,
        email: String,
        password_hash: String,
    ) -> Self {
        Self {
            id,
            name,
            username,
            password_hash,
            email,
            created_at: OffsetDateTime::now_utc(),
            created_by: id,
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some() && self.deleted_by.is_some()
    }
}

/// Which uniqueness guard rejected a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Id,
    Email,
    Username,
}

impl ConflictField {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictField::Id => "id",
            ConflictField::Email => "email",
            ConflictField::Username => "username",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_created_by_itself_and_active() {
        let id = Uuid::new_v4();
        let user = UserRecord::new(
            id,
            "Alice".into(),
            "alice".into(),
            "alice@example.com".into(),
            "h".into(),
        );
        assert_eq!(user.created_by, id);
        assert!(user.updated_at.is_none() && user.updated_by.is_none());
        assert!(!user.is_deleted());
    }

    #[test]
    fn deleted_requires_both_timestamp_and_actor() {
        let id = Uuid::new_v4();
        let mut user = UserRecord::new(
            id,
            "Bob".into(),
            "bob".into(),
            "bob@example.com".into(),
            "h".into(),
        );
        user.deleted_at = Some(OffsetDateTime::now_utc());
        assert!(!user.is_deleted());
        user.deleted_by = Some(id);
        assert!(user.is_deleted());
    }
}
