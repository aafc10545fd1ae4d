/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use freecrm_api::{app::{build_router, AppState}, config::Config};
/// use freecrm_shared::storage::local::LocalObjectStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let storage = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
///
/// let app = build_router(AppState::new(pool, config, storage));
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use freecrm_shared::{auth::session::Session, storage::ObjectStore};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    error::ApiError,
    middleware::security::SecurityHeadersLayer,
    routes::{self, attachments::MAX_ATTACHMENT_BYTES},
};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Attachment storage
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, storage: Arc<dyn ObjectStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            storage,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Calendar date used for overdue checks and default periods (UTC)
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health                         (public)
/// └── /v1/
///     ├── /auth/signup | /login | /refresh  (public)
///     ├── /auth/logout | /me
///     ├── /clients[/:id]
///     ├── /prospects[/:id[/convert]]
///     ├── /tasks[/overdue | /:id[/done | /reopen]]
///     ├── /invoices[/revenue | /:id[/send | /pay | /attachments[/:file_name]]]
///     └── /dashboard
/// ```
///
/// Everything under `/v1` except the public auth routes goes through
/// [`session_layer`]. Outer layers, innermost first: tracing, compression,
/// CORS, security headers.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let client_routes = Router::new()
        .route(
            "/",
            get(routes::clients::list_clients).post(routes::clients::create_client),
        )
        .route(
            "/:id",
            get(routes::clients::get_client)
                .patch(routes::clients::update_client)
                .delete(routes::clients::delete_client),
        );

    let prospect_routes = Router::new()
        .route(
            "/",
            get(routes::prospects::list_prospects).post(routes::prospects::create_prospect),
        )
        .route(
            "/:id",
            get(routes::prospects::get_prospect)
                .patch(routes::prospects::update_prospect)
                .delete(routes::prospects::delete_prospect),
        )
        .route("/:id/convert", post(routes::prospects::convert_prospect));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/overdue", get(routes::tasks::list_overdue_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/done", post(routes::tasks::mark_task_done))
        .route("/:id/reopen", post(routes::tasks::reopen_task));

    let attachment_routes = Router::new()
        .route("/:id/attachments", get(routes::attachments::list_attachments))
        .route(
            "/:id/attachments/:file_name",
            put(routes::attachments::upload_attachment)
                .get(routes::attachments::download_attachment)
                .delete(routes::attachments::delete_attachment),
        )
        .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES));

    let invoice_routes = Router::new()
        .route(
            "/",
            get(routes::invoices::list_invoices).post(routes::invoices::create_invoice),
        )
        .route("/revenue", get(routes::invoices::revenue))
        .route(
            "/:id",
            get(routes::invoices::get_invoice)
                .patch(routes::invoices::update_invoice)
                .delete(routes::invoices::delete_invoice),
        )
        .route("/:id/send", post(routes::invoices::send_invoice))
        .route("/:id/pay", post(routes::invoices::pay_invoice))
        .merge(attachment_routes);

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .nest("/clients", client_routes)
        .nest("/prospects", prospect_routes)
        .nest("/tasks", task_routes)
        .nest("/invoices", invoice_routes)
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route_layer(middleware::from_fn_with_state(state.clone(), session_layer));

    let v1_routes = Router::new().merge(public_auth_routes).merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the bearer token and inserts the [`Session`] into request
/// extensions for `Extension<Session>` extractors
async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = Session::from_headers(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
