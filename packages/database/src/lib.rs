#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database access for the parking and vehicle dashboard.
//!
//! Uses `switchy_database` against a `MySQL`-compatible store. Every
//! statement is assembled as SQL text with `?` placeholders plus a separate
//! list of bound values (see [`statement`]); user input never becomes part
//! of the SQL text. Concurrent queries are bounded by the
//! [`db::DatabaseGateway`].

pub mod db;
pub mod markers;
pub mod quarterly;
pub mod queries;
pub mod statement;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The database connection could not be opened.
    #[error(transparent)]
    Connect(#[from] db::ConnectError),

    /// The gateway was closed while the query was waiting for a connection.
    #[error("Connection pool is closed")]
    PoolClosed,
}
