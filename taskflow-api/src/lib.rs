//! # TaskFlow API Server Library
//!
//! HTTP layer of the TaskFlow backend: users, groups joined by invitation
//! code, and tasks scoped to a user or a group.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `envelope`: Success response envelope
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod routes;
