//! Client tests against a stub API server.
//!
//! Each test starts a small axum router on a random local port that answers
//! like the FreeCRM API does, then drives it through `AuthClient` and
//! `CrmClient`.

use std::net::SocketAddr;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use freecrm_client::{
    forms::TaskForm,
    session::AuthClient,
    store::{EntityStore, StoreAction},
    CrmClient,
};
use freecrm_shared::{
    billing::{RevenuePeriod, RevenueSummary},
    models::{
        client::Client,
        task::{TaskLink, TaskStatus},
    },
};
use serde_json::{json, Value};
use uuid::Uuid;

const ACCESS_TOKEN: &str = "access-123";
const USER_ID: &str = "6f1c2f9e-7d3a-4c55-9d3e-2a0b1c4d5e6f";
const ACME_ID: &str = "0b5a4c1e-2f3d-4e5f-8a9b-0c1d2e3f4a5b";
const GLOBEX_ID: &str = "1c6b5d2f-3a4e-4f60-9b0c-1d2e3f4a5b6c";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", ACCESS_TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": "Missing or invalid token" })),
    )
        .into_response()
}

fn client_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "owner_id": USER_ID,
        "name": name,
        "email": null,
        "phone": null,
        "address": null,
        "notes": null,
        "prospect_id": null,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "secret1" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized", "message": "Invalid email or password" })),
        )
            .into_response();
    }

    Json(json!({
        "user": {
            "id": USER_ID,
            "email": body["email"],
            "name": "Marie",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z",
            "last_login_at": null
        },
        "access_token": ACCESS_TOKEN,
        "refresh_token": "refresh-456"
    }))
    .into_response()
}

async fn logout(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_clients(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([client_json(ACME_ID, "Acme"), client_json(GLOBEX_ID, "Globex")])).into_response()
}

async fn delete_client(headers: HeaderMap, Path(_id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": "conflict",
            "message": "Client still has 2 invoice(s) and cannot be deleted"
        })),
    )
        .into_response()
}

/// Echoes the submitted task back the way the API stores it
async fn create_task(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let link = &body["link"];
    (
        StatusCode::CREATED,
        Json(json!({
            "id": Uuid::new_v4(),
            "owner_id": USER_ID,
            "title": body["title"],
            "description": null,
            "due_date": body["due_date"],
            "priority": body["priority"],
            "status": "todo",
            "completed_at": null,
            "client_id": link.get("client").cloned().unwrap_or(Value::Null),
            "prospect_id": link.get("prospect").cloned().unwrap_or(Value::Null),
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z"
        })),
    )
        .into_response()
}

async fn reopen_task(headers: HeaderMap, Path(id): Path<Uuid>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    Json(json!({
        "id": id,
        "owner_id": USER_ID,
        "title": "Send quote",
        "description": null,
        "due_date": "2025-03-14",
        "priority": "medium",
        "status": "todo",
        "completed_at": null,
        "client_id": null,
        "prospect_id": null,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-02T10:00:00Z"
    }))
    .into_response()
}

async fn broken_revenue() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response()
}

async fn start_stub_server() -> SocketAddr {
    let app = Router::new()
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/logout", post(logout))
        .route("/v1/clients", get(list_clients))
        .route("/v1/clients/:id", delete(delete_client))
        .route("/v1/tasks", post(create_task))
        .route("/v1/tasks/:id/reopen", post(reopen_task))
        .route("/v1/invoices/revenue", get(broken_revenue));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().expect("Stub server has no address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub server failed");
    });

    addr
}

async fn signed_in(addr: SocketAddr) -> CrmClient {
    let base = format!("http://{}", addr);
    let session = AuthClient::new(&base)
        .unwrap()
        .sign_in("marie@example.com", "secret1")
        .await
        .expect("Sign-in failed");

    CrmClient::new(&base, session).unwrap()
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    assert_eq!(crm.current_user().email, "marie@example.com");
    assert_eq!(crm.session().access_token, ACCESS_TOKEN);

    crm.sign_out().await.expect("Sign-out failed");
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let addr = start_stub_server().await;

    let err = AuthClient::new(&format!("http://{}", addr))
        .unwrap()
        .sign_in("marie@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Invalid email or password (401)");
}

#[tokio::test]
async fn test_failed_delete_leaves_store_unchanged() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    let mut clients: EntityStore<Client> = EntityStore::new();
    assert!(clients.apply_result(crm.list_clients().await.map(StoreAction::Loaded)));
    assert_eq!(
        clients.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Acme", "Globex"]
    );

    let acme: Uuid = ACME_ID.parse().unwrap();
    let result = crm.delete_client(acme).await;
    assert!(result.as_ref().unwrap_err().is_conflict());

    let changed = clients.apply_result(result.map(|()| StoreAction::Removed(acme)));
    assert!(!changed);
    assert_eq!(clients.len(), 2);
    assert!(clients.get(acme).is_some());
    assert_eq!(
        clients.last_error(),
        Some("Client still has 2 invoice(s) and cannot be deleted (409)")
    );
}

#[tokio::test]
async fn test_task_keeps_last_selected_link() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    let client_id: Uuid = ACME_ID.parse().unwrap();
    let mut form = TaskForm::new("Send quote", NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    form.select_prospect(Uuid::new_v4());
    form.select_client(client_id);

    let task = crm.create_task(&form).await.expect("Task creation failed");
    assert_eq!(task.link(), Some(TaskLink::Client(client_id)));
    assert!(task.prospect_id.is_none());
    assert_eq!(task.status, TaskStatus::Todo);
}

#[tokio::test]
async fn test_reopened_task_has_no_completion_time() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    let id = Uuid::new_v4();
    let task = crm.reopen_task(id).await.expect("Reopen failed");
    assert_eq!(task.id, id);
    assert_eq!(task.status, TaskStatus::Todo);
    assert!(task.completed_at.is_none());
}

#[tokio::test]
async fn test_revenue_degrades_to_zero() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    let revenue = crm.revenue(RevenuePeriod::Quarter, None).await;
    assert_eq!(revenue.period, RevenuePeriod::Quarter);
    assert_eq!(revenue.summary, RevenueSummary::default());
    assert!(revenue.start.is_none());
}

#[tokio::test]
async fn test_requests_without_server_fail_with_http_error() {
    let addr = start_stub_server().await;
    let crm = signed_in(addr).await;

    // Nothing listens on port 1
    let offline = CrmClient::new("http://127.0.0.1:1", crm.session().clone()).unwrap();
    let err = offline.list_clients().await.unwrap_err();
    assert!(matches!(err, freecrm_client::ClientError::Http(_)));
    assert!(err.status().is_none());
}
