//! Credential store - owns the `users` table

use std::path::{Path, PathBuf};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use crate::{Error, Result};
use crate::password;
use super::{is_unique_violation, schema};
use super::scope::{ensure_database_file, with_scope};

/// Result of checking a username/password pair.
///
/// Keeps "no such user" apart from "wrong password" so callers can word
/// their messages differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub username_matched: bool,
    pub password_matched: bool,
}

impl LoginOutcome {
    pub const UNKNOWN_USER: Self = Self { username_matched: false, password_matched: false };
    pub const WRONG_PASSWORD: Self = Self { username_matched: true, password_matched: false };
    pub const ACCEPTED: Self = Self { username_matched: true, password_matched: true };

    pub fn is_authenticated(&self) -> bool {
        self.username_matched && self.password_matched
    }

    pub fn as_pair(&self) -> (bool, bool) {
        (self.username_matched, self.password_matched)
    }
}

/// SQLite-backed user registry
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Open the users database, creating the file and table if missing.
    ///
    /// A store that fails here must not be used.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tracing::debug!("Initializing credential store at {}", path.display());

        if let Err(e) = Self::initialize_schema(&path) {
            tracing::error!("Unable to initialize the users database: {}", e);
            return Err(Error::StorageInit { path, source: Box::new(e) });
        }

        Ok(Self { path })
    }

    fn initialize_schema(path: &Path) -> Result<()> {
        ensure_database_file(path)?;
        with_scope(path, |conn| {
            conn.execute(schema::CREATE_USERS_TABLE, [])?;
            Ok(())
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if at least one user has registered
    pub fn has_any_users(&self) -> Result<bool> {
        with_scope(&self.path, |conn| {
            let any: bool = conn.query_row("SELECT EXISTS(SELECT 1 FROM users)", [], |row| row.get(0))?;
            Ok(any)
        })
    }

    /// Count registered users
    pub fn count(&self) -> Result<usize> {
        with_scope(&self.path, |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Register a user with an already hashed password.
    ///
    /// Fails with [`Error::DuplicateUser`] if the lowercased name is taken.
    pub fn register(&self, username: &str, password_hash: &str) -> Result<bool> {
        let username = normalize_username(username)?;

        with_scope(&self.path, |conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                params![username, password_hash],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    tracing::warn!("Username '{}' is already in use", username);
                    Error::DuplicateUser(username.clone())
                } else {
                    tracing::error!("Unable to register '{}': {}", username, e);
                    Error::Storage(e)
                }
            })?;
            Ok(())
        })?;

        tracing::debug!("User '{}' registered", username);
        Ok(true)
    }

    /// Check a plaintext password against the stored hash for `username`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let username = normalize_username(username)?;

        let stored: Option<String> = with_scope(&self.path, |conn| {
            Ok(conn
                .query_row(
                    "SELECT password FROM users WHERE username = ?1",
                    [&username],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        let Some(hash) = stored else {
            tracing::debug!("No user named '{}'", username);
            return Ok(LoginOutcome::UNKNOWN_USER);
        };

        if password::verify_password(password, &hash) {
            Ok(LoginOutcome::ACCEPTED)
        } else {
            tracing::debug!("Password mismatch for '{}'", username);
            Ok(LoginOutcome::WRONG_PASSWORD)
        }
    }
}

/// Fold a username to its stored form.
pub fn normalize_username(username: &str) -> Result<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    Ok(trimmed.to_lowercase())
}
