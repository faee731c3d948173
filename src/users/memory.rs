use axum::async_trait;
use tokio::sync::RwLock;

use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{ConflictField, UserRecord};

/// In-process `UserStore` used by `AppState::fake`.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<UserRecord>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError> {
        // Write lock spans checks and insert.
        let mut users = self.users.write().await;
        let active = || users.iter().filter(|u| !u.is_deleted());
        if users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Conflict(ConflictField::Id));
        }
        if active().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(ConflictField::Email));
        }
        if active().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(ConflictField::Username));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| !u.is_deleted() && u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| !u.is_deleted() && u.username == username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn record(username: &str, email: &str) -> UserRecord {
        UserRecord::new(
            Uuid::new_v4(),
            username.to_uppercase(),
            username.into(),
            email.into(),
            "hash".into(),
        )
    }

    #[tokio::test]
    async fn create_then_lookup_both_ways() {
        let store = MemoryUserStore::default();
        let user = record("carol", "carol@example.com");
        store.create(&user).await.unwrap();

        assert_eq!(store.find_by_username("carol").await.unwrap().id, user.id);
        assert_eq!(store.find_by_email("carol@example.com").await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn lookups_are_case_sensitive() {
        let store = MemoryUserStore::default();
        store.create(&record("dave", "dave@example.com")).await.unwrap();

        assert!(matches!(
            store.find_by_username("Dave").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.find_by_email("DAVE@example.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn conflicts_report_the_colliding_field() {
        let store = MemoryUserStore::default();
        let first = record("erin", "erin@example.com");
        store.create(&first).await.unwrap();

        let same_id = UserRecord {
            username: "other".into(),
            email: "other@example.com".into(),
            ..first.clone()
        };
        assert!(matches!(
            store.create(&same_id).await,
            Err(StoreError::Conflict(ConflictField::Id))
        ));
        assert!(matches!(
            store.create(&record("erin2", "erin@example.com")).await,
            Err(StoreError::Conflict(ConflictField::Email))
        ));
        assert!(matches!(
            store.create(&record("erin", "erin2@example.com")).await,
            Err(StoreError::Conflict(ConflictField::Username))
        ));
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_invisible_and_release_their_names() {
        let store = MemoryUserStore::default();
        let mut gone = record("frank", "frank@example.com");
        gone.deleted_at = Some(OffsetDateTime::now_utc());
        gone.deleted_by = Some(gone.id);
        store.create(&gone).await.unwrap();

        assert!(matches!(
            store.find_by_username("frank").await,
            Err(StoreError::NotFound)
        ));
        store.create(&record("frank", "frank@example.com")).await.unwrap();
    }
}
