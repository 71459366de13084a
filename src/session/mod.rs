//! The session engine: login, logout, info, create and the token-pair
//! rotation state machine behind `validate`.
//!
//! The engine holds read-only references (store, codec) and takes no locks
//! of its own; `create` atomicity is the store's contract. Errors are plain
//! values, translated to wire codes by the transport adapters.

use crate::{
    password,
    store::{self, User, UserStore},
    token::{self, TokenCodec},
};
use regex::Regex;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown name and wrong password collapse into this one kind on
    /// purpose: callers must not be able to probe which accounts exist.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("name already taken")]
    Conflict,
    #[error("invalid username")]
    InvalidName,
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid token")]
    InvalidToken,
    #[error("session expired")]
    SessionExpired,
    #[error("internal error")]
    Internal,
}

/// Public-safe projection of a user. The password hash has no field here,
/// so it cannot leak through any serializer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// An access/refresh token pair as issued by login or rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn valid_name(name: &str) -> bool {
    Regex::new(r"^\w{3,32}$").is_ok_and(|re| re.is_match(name))
}

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn UserStore>,
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Engine {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }

    #[must_use]
    pub fn with_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_ttl = access;
        self.refresh_ttl = refresh;
        self
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Authenticate `name`/`pass` and issue a fresh token pair.
    ///
    /// # Errors
    ///
    /// `Error::InvalidCredentials` for unknown names and wrong passwords
    /// alike.
    pub async fn login(&self, name: &str, pass: &str) -> Result<TokenPair, Error> {
        let user = match self.store.user_by_name(name).await {
            Ok(user) => user,
            Err(store::Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(err) => {
                error!("login: user lookup failed: {err}");
                return Err(Error::Internal);
            }
        };

        if !password::verify(pass, &user.password_hash) {
            return Err(Error::InvalidCredentials);
        }

        self.issue_pair(&user.name)
    }

    /// Stateless logout: confirms the user still exists, nothing more.
    /// Outstanding tokens stay valid until their embedded expiry.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the user is gone.
    pub async fn logout(&self, name: &str) -> Result<(), Error> {
        self.lookup(name, "logout").await.map(|_| ())
    }

    /// Public projection of the user behind `name`.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the user is gone.
    pub async fn info(&self, name: &str) -> Result<UserInfo, Error> {
        self.lookup(name, "info").await.map(|user| UserInfo::from(&user))
    }

    /// Create a user, hashing the password first.
    ///
    /// # Errors
    ///
    /// `Error::InvalidName` / `Error::InvalidPassword` on bad input,
    /// `Error::Conflict` if the name is taken.
    pub async fn create(&self, name: &str, pass: &str) -> Result<(), Error> {
        if !valid_name(name) {
            return Err(Error::InvalidName);
        }
        if pass.is_empty() {
            return Err(Error::InvalidPassword);
        }

        let hash = password::hash(pass).map_err(|err| {
            error!("create: password hashing failed: {err}");
            Error::Internal
        })?;

        match self.store.create(User::new(name, hash)).await {
            Ok(()) => Ok(()),
            Err(store::Error::Conflict) => Err(Error::Conflict),
            Err(err) => {
                error!("create: store insert failed: {err}");
                Err(Error::Internal)
            }
        }
    }

    /// Rotate a token pair.
    ///
    /// State machine over the pair: while the access token is unexpired
    /// (`Fresh`) the call is an idempotent no-op returning the same pair;
    /// once it expires but the refresh token is still good
    /// (`AccessExpired`) a brand-new pair is issued for the same subject;
    /// with both expired (`BothExpired`) the session is over.
    ///
    /// # Errors
    ///
    /// `Error::InvalidToken` if either token fails to parse or verify,
    /// `Error::SessionExpired` once both tokens are past their expiry.
    pub async fn validate(&self, access: &str, refresh: &str) -> Result<TokenPair, Error> {
        let now = token::unix_now();

        let access_claims = self.codec.parse(access).map_err(|_| Error::InvalidToken)?;
        if !access_claims.is_expired(now) {
            return Ok(TokenPair {
                access: access.to_string(),
                refresh: refresh.to_string(),
            });
        }

        let refresh_claims = self.codec.parse(refresh).map_err(|_| Error::InvalidToken)?;
        if refresh_claims.is_expired(now) {
            return Err(Error::SessionExpired);
        }

        // The refresh token is the credential that proved validity, so the
        // new pair is bound to its subject.
        self.issue_pair(&refresh_claims.sub)
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, Error> {
        let access = self.issue(subject, self.access_ttl)?;
        let refresh = self.issue(subject, self.refresh_ttl)?;
        Ok(TokenPair { access, refresh })
    }

    fn issue(&self, subject: &str, ttl: Duration) -> Result<String, Error> {
        self.codec.issue(subject, ttl).map_err(|err| {
            error!("token issue failed for {subject}: {err}");
            Error::Internal
        })
    }

    async fn lookup(&self, name: &str, operation: &str) -> Result<User, Error> {
        match self.store.user_by_name(name).await {
            Ok(user) => Ok(user),
            Err(store::Error::NotFound) => Err(Error::NotFound),
            Err(err) => {
                error!("{operation}: user lookup failed: {err}");
                Err(Error::Internal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryUserStore;
    use crate::token::unix_now;
    use secrecy::SecretString;

    fn engine() -> Engine {
        Engine::new(
            Arc::new(MemoryUserStore::new()),
            TokenCodec::new(SecretString::from("engine-test-secret".to_string())),
        )
    }

    async fn engine_with_alice() -> Engine {
        let engine = engine();
        engine
            .create("alice", "wonderland")
            .await
            .expect("create should succeed");
        engine
    }

    #[tokio::test]
    async fn login_issues_pair_bound_to_name() {
        let engine = engine_with_alice().await;
        let pair = engine
            .login("alice", "wonderland")
            .await
            .expect("login should succeed");

        let access = engine.codec().parse(&pair.access).expect("access parses");
        let refresh = engine.codec().parse(&pair.refresh).expect("refresh parses");
        assert_eq!(access.sub, "alice");
        assert_eq!(refresh.sub, "alice");
        assert!(access.exp < refresh.exp);
    }

    #[tokio::test]
    async fn ttls_are_configurable() {
        let engine = engine()
            .with_ttls(Duration::from_secs(5), Duration::from_secs(10));
        engine
            .create("alice", "wonderland")
            .await
            .expect("create should succeed");

        let pair = engine
            .login("alice", "wonderland")
            .await
            .expect("login should succeed");
        let access = engine.codec().parse(&pair.access).expect("access parses");
        let refresh = engine.codec().parse(&pair.refresh).expect("refresh parses");

        assert_eq!(engine.access_ttl(), Duration::from_secs(5));
        assert_eq!(engine.refresh_ttl(), Duration::from_secs(10));
        assert_eq!(access.exp - access.iat, 5);
        assert_eq!(refresh.exp - refresh.iat, 10);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let engine = engine_with_alice().await;

        let wrong_password = engine.login("alice", "looking-glass").await;
        let unknown_name = engine.login("rabbit", "wonderland").await;

        assert!(matches!(wrong_password, Err(Error::InvalidCredentials)));
        assert!(matches!(unknown_name, Err(Error::InvalidCredentials)));
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let engine = engine_with_alice().await;

        assert!(matches!(
            engine.create("alice", "again").await,
            Err(Error::Conflict)
        ));
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let engine = engine();

        assert!(matches!(
            engine.create("al", "wonderland").await,
            Err(Error::InvalidName)
        ));
        assert!(matches!(
            engine.create("al ice", "wonderland").await,
            Err(Error::InvalidName)
        ));
        assert!(matches!(
            engine.create("alice", "").await,
            Err(Error::InvalidPassword)
        ));
    }

    #[tokio::test]
    async fn info_returns_projection() {
        let engine = engine_with_alice().await;
        let info = engine.info("alice").await.expect("info should succeed");

        assert_eq!(info.name, "alice");
        assert!(matches!(
            engine.info("rabbit").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn logout_requires_existing_user() {
        let engine = engine_with_alice().await;

        engine.logout("alice").await.expect("logout should succeed");
        assert!(matches!(
            engine.logout("rabbit").await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn validate_is_idempotent_while_access_is_fresh() {
        let engine = engine_with_alice().await;
        let pair = engine
            .login("alice", "wonderland")
            .await
            .expect("login should succeed");

        let first = engine
            .validate(&pair.access, &pair.refresh)
            .await
            .expect("validate should succeed");
        let second = engine
            .validate(&first.access, &first.refresh)
            .await
            .expect("validate should succeed");

        // Byte-identical on every call while the access token is unexpired.
        assert_eq!(first.access, pair.access);
        assert_eq!(first.refresh, pair.refresh);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn validate_rotates_once_access_expires() {
        let engine = engine_with_alice().await;
        let now = unix_now();
        let expired_access = engine
            .codec()
            .sign_at("alice", now - 120, now - 60)
            .expect("sign expired access");
        let live_refresh = engine
            .codec()
            .sign_at("alice", now - 120, now + 3600)
            .expect("sign live refresh");

        let rotated = engine
            .validate(&expired_access, &live_refresh)
            .await
            .expect("rotation should succeed");

        assert_ne!(rotated.access, expired_access);
        assert_ne!(rotated.refresh, live_refresh);

        let access = engine.codec().parse(&rotated.access).expect("access parses");
        let refresh = engine
            .codec()
            .parse(&rotated.refresh)
            .expect("refresh parses");
        assert_eq!(access.sub, "alice");
        assert_eq!(refresh.sub, "alice");
        // Strictly later than the expired access token it replaces.
        assert!(access.exp > now - 60);
    }

    #[tokio::test]
    async fn validate_fails_once_both_tokens_expire() {
        let engine = engine_with_alice().await;
        let now = unix_now();
        let expired_access = engine
            .codec()
            .sign_at("alice", now - 7200, now - 3660)
            .expect("sign expired access");
        let expired_refresh = engine
            .codec()
            .sign_at("alice", now - 7200, now - 60)
            .expect("sign expired refresh");

        assert!(matches!(
            engine.validate(&expired_access, &expired_refresh).await,
            Err(Error::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn validate_rejects_garbage_tokens() {
        let engine = engine_with_alice().await;
        let pair = engine
            .login("alice", "wonderland")
            .await
            .expect("login should succeed");

        assert!(matches!(
            engine.validate("garbage", &pair.refresh).await,
            Err(Error::InvalidToken)
        ));

        let now = unix_now();
        let expired_access = engine
            .codec()
            .sign_at("alice", now - 120, now - 60)
            .expect("sign expired access");
        assert!(matches!(
            engine.validate(&expired_access, "garbage").await,
            Err(Error::InvalidToken)
        ));
    }
}
