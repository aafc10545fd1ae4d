/// Middleware for the API server
///
/// - `security`: Security response headers
///
/// Bearer-token checking lives in `app::session_layer`, next to the router
/// it guards.

pub mod security;
