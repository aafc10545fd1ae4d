/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, refresh, logout, current user
/// - `clients`, `prospects`, `tasks`, `invoices`: Owner-scoped CRUD and status actions
/// - `attachments`: Files attached to an invoice
/// - `dashboard`: Aggregated landing view
///
/// Every protected handler takes `Extension<Session>` and passes the
/// session's owner id to the model layer.

pub mod attachments;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod fields;
pub mod health;
pub mod invoices;
pub mod prospects;
pub mod tasks;
