//! # Stockroom - small inventory manager
//!
//! Users, sessions and a product catalog on top of plain SQLite files.
//!
//! Stockroom provides:
//! - A credential store (`users` table) with salted password hashes
//! - A product store (`products` table) with case-normalized names
//! - A connection scope that commits on success and discards writes on failure
//! - An axum web layer with cookie sessions
//! - A command-line front end for the same operations

pub mod product;
pub mod password;
pub mod storage;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use product::{Product, ProductUpdate, InventoryStats};
pub use storage::{CredentialStore, LoginOutcome, ProductStore};

use std::path::PathBuf;

/// Result type alias for Stockroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stockroom operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Unable to initialize storage at {}: {source}", .path.display())]
    StorageInit {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Username already in use: {0}")]
    DuplicateUser(String),

    #[error("Product already exists: {0}")]
    ProductExists(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Unable to add product {name}: {source}")]
    UnableToAdd {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
