//! The user store capability.
//!
//! The engine depends on the narrow [`UserStore`] trait only; backends are
//! wired in at startup. Name uniqueness is the store's contract: `create`
//! must be atomic with respect to duplicate names under concurrent calls.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// PHC-format hash; opaque everywhere outside the `password` module.
    pub password_hash: String,
}

impl User {
    #[must_use]
    pub fn new(name: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            password_hash,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("user not found")]
    NotFound,
    #[error("name already taken")]
    Conflict,
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by unique name.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if no user carries the name.
    async fn user_by_name(&self, name: &str) -> Result<User, Error>;

    /// Insert a new user. Exactly one of any set of concurrent calls with
    /// the same name succeeds.
    ///
    /// # Errors
    ///
    /// `Error::Conflict` if the name is already taken.
    async fn create(&self, user: User) -> Result<(), Error>;
}
