//! # FreeCRM Client
//!
//! Typed async client for the FreeCRM HTTP API.
//!
//! ## Module Organization
//!
//! - `session`: Signup/login and the [`session::Session`] they produce
//! - `forms`: Request bodies, including the exclusive task link picker
//! - `store`: Normalized per-entity stores updated by reducer actions
//! - `error`: [`ClientError`] decoded from the API's JSON error bodies
//!
//! [`CrmClient`] wraps a session and exposes every entity operation, the
//! status transitions, revenue and the dashboard.

mod client;
mod http;

pub mod error;
pub mod forms;
pub mod session;
pub mod store;

pub use client::{Conversion, CrmClient, Dashboard, Revenue};
pub use error::{ClientError, ClientResult};
