//! # FreeCRM Shared Library
//!
//! Domain types, persistence and business rules shared by the FreeCRM API
//! server and its typed client.
//!
//! ## Module Organization
//!
//! - `models`: Owner-scoped database models (users, clients, prospects, tasks, invoices)
//! - `billing`: Invoice status lifecycle and revenue aggregation
//! - `auth`: Password hashing, JWT tokens and the request session
//! - `db`: Connection pool and migrations
//! - `storage`: Object storage for invoice attachments

pub mod auth;
pub mod billing;
pub mod db;
pub mod models;
pub mod storage;

/// Current version of the FreeCRM shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
