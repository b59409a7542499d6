//! Users known to the service.

use chrono::Utc;
use serde::Deserialize;
use store::{InventoryStore, User};

use crate::error::DomainError;

/// Identifier of the built-in demo user.
pub const DEMO_USER_ID: &str = "demo-user-1";

/// Profile fields reported by the identity provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
}

impl UserProfile {
    /// The always-signed-in user of demo mode.
    pub fn demo() -> Self {
        Self {
            id: DEMO_USER_ID.to_string(),
            email: Some("demo@example.com".to_string()),
            first_name: Some("Demo".to_string()),
            last_name: Some("User".to_string()),
            profile_image_url: None,
        }
    }
}

pub struct UserService<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<User>, DomainError> {
        Ok(self.store.get_user(id).await?)
    }

    /// Stores the profile, keeping the creation time of a known user.
    #[tracing::instrument(skip(self), fields(user_id = %profile.id))]
    pub async fn upsert(&self, profile: UserProfile) -> Result<User, DomainError> {
        let now = Utc::now();
        let user = User {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_image_url: profile.profile_image_url,
            created_at: now,
            updated_at: now,
        };
        Ok(self.store.upsert_user(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use store::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn upsert_demo_user_twice_keeps_created_at() {
        let service = UserService::new(InMemoryStore::new());
        let first = service.upsert(UserProfile::demo()).await.unwrap();
        let second = service.upsert(UserProfile::demo()).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);

        let stored = service.get(DEMO_USER_ID).await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("demo@example.com"));
        assert!(service.get("someone-else").await.unwrap().is_none());
    }
}
