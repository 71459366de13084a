//! In-memory user store, the default backend.

use super::{Error, User, UserStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn user_by_name(&self, name: &str) -> Result<User, Error> {
        self.users
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create(&self, user: User) -> Result<(), Error> {
        // The write lock spans check-plus-insert, so concurrent duplicate
        // names resolve to exactly one winner.
        let mut users = self.users.write().await;
        if users.contains_key(&user.name) {
            return Err(Error::Conflict);
        }
        users.insert(user.name.clone(), user);
        Ok(())
    }
}
