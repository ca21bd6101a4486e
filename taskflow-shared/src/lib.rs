//! # TaskFlow Shared Library
//!
//! This crate contains the domain types, persistence, and business rules used
//! by the TaskFlow API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, groups, tasks) and their queries
//! - `membership`: Group roster rules (join, promote, remove, leave)
//! - `invitation`: Invitation code generation and normalization
//! - `auth`: Password hashing, JWT tokens, request auth context, authorization
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod invitation;
pub mod membership;
pub mod models;

/// Current version of the TaskFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
