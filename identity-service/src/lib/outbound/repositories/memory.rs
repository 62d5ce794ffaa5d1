use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::identity::models::Identity;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::CredentialStore;
use crate::identity::errors::StoreError;

/// Credential store kept in process memory, keyed by username.
///
/// Each instance owns its own map. The existence check and the insert happen
/// under one write lock, so two concurrent inserts of the same username
/// cannot both succeed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    identities: Arc<RwLock<HashMap<Username, Identity>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &Username) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(username).cloned())
    }

    async fn insert(&self, identity: Identity) -> Result<Identity, StoreError> {
        match self.identities.write().await.entry(identity.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(
                identity.username.as_str().to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(identity.clone());
                Ok(identity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::identity::models::IdentityId;
    use crate::domain::identity::models::Profile;
    use crate::domain::identity::models::Role;
    use crate::domain::identity::models::Roles;

    fn identity(name: &str) -> Identity {
        Identity {
            id: IdentityId::new(),
            username: Username::new(name.to_string()).unwrap(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            roles: Roles::single(Role::user()),
            profile: Profile::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryCredentialStore::new();
        let alice = identity("alice");

        store.insert(alice.clone()).await.expect("Insert failed");

        let found = store
            .find_by_username(&alice.username)
            .await
            .unwrap()
            .expect("Identity missing");
        assert_eq!(found.id, alice.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_unknown_returns_none() {
        let store = InMemoryCredentialStore::new();
        let username = Username::new("nobody".to_string()).unwrap();

        assert!(store.find_by_username(&username).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = InMemoryCredentialStore::new();
        let first = identity("alice");

        store.insert(first.clone()).await.expect("Insert failed");
        let result = store.insert(identity("alice")).await;

        assert_eq!(
            result.unwrap_err(),
            StoreError::DuplicateKey("alice".to_string())
        );

        let kept = store.find_by_username(&first.username).await.unwrap().unwrap();
        assert_eq!(kept.id, first.id);
    }

    #[tokio::test]
    async fn test_instances_do_not_share_state() {
        let first = InMemoryCredentialStore::new();
        let second = InMemoryCredentialStore::new();

        first.insert(identity("alice")).await.unwrap();

        assert!(second.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_admit_one() {
        let store = InMemoryCredentialStore::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(identity("alice")).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }
}
