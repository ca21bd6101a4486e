/// API route handlers, one module per resource
///
/// - `health`: service health
/// - `auth`: register, login, refresh, current user
/// - `groups`: groups, invitations and membership
/// - `tasks`: personal and group tasks

pub mod auth;
pub mod groups;
pub mod health;
pub mod tasks;
