//! PostgreSQL user store.
//!
//! Uniqueness rides on the `users.name` unique index; a duplicate-key error
//! (SQLSTATE 23505) maps to [`Error::Conflict`], so concurrent duplicate
//! creates resolve in the database, not here.

use super::{Error, User, UserStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    id uuid PRIMARY KEY,
    name text NOT NULL UNIQUE,
    password_hash text NOT NULL
)";

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connect to the database behind `dsn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Create the `users` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("Failed to create users table")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn user_by_name(&self, name: &str) -> Result<User, Error> {
        let row = sqlx::query("SELECT id, name, password_hash FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Backend(err.to_string()))?;

        row.map(|row| User {
            id: row.get("id"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
        })
        .ok_or(Error::NotFound)
    }

    async fn create(&self, user: User) -> Result<(), Error> {
        sqlx::query("INSERT INTO users (id, name, password_hash) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::Conflict
                } else {
                    Error::Backend(err.to_string())
                }
            })?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
