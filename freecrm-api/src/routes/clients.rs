/// Client endpoints
///
/// - `GET /v1/clients` - List clients, by name
/// - `POST /v1/clients` - Create a client
/// - `GET /v1/clients/:id` - Get a client
/// - `PATCH /v1/clients/:id` - Update a client
/// - `DELETE /v1/clients/:id` - Delete a client (409 while it has invoices)
///
/// Tasks and prospects pointing at a deleted client are unlinked by the
/// database.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use freecrm_shared::{
    auth::session::Session,
    models::{
        client::{Client, CreateClient, UpdateClient},
        invoice::Invoice,
        ContactFields,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::fields::{validate_email_or_blank, validate_not_blank, validate_phone};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Contact details as submitted by the client and prospect forms
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Name must be at most 200 characters")
    )]
    pub name: String,

    #[validate(
        custom(function = "validate_email_or_blank"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,

    #[validate(
        custom(function = "validate_phone"),
        length(max = 50, message = "Phone must be at most 50 characters")
    )]
    pub phone: Option<String>,

    pub address: Option<String>,
    pub notes: Option<String>,
}

impl ContactRequest {
    pub fn into_contact(self) -> ContactFields {
        ContactFields {
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            notes: self.notes,
        }
        .normalized()
    }
}

/// Partial client update; an empty string clears an optional field
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Name must be at most 200 characters")
    )]
    pub name: Option<String>,

    #[validate(
        custom(function = "validate_email_or_blank"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,

    #[validate(
        custom(function = "validate_phone"),
        length(max = 50, message = "Phone must be at most 50 characters")
    )]
    pub phone: Option<String>,

    pub address: Option<String>,
    pub notes: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Client not found".to_string())
}

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Client>>> {
    let clients = Client::list_by_owner(&state.db, session.owner_id()).await?;
    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    req.validate()?;

    let client = Client::create(
        &state.db,
        CreateClient {
            owner_id: session.owner_id(),
            contact: req.into_contact(),
        },
    )
    .await?;

    tracing::info!(client_id = %client.id, owner_id = %client.owner_id, "Client created");

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    let client = Client::find_by_id_and_owner(&state.db, id, session.owner_id())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> ApiResult<Json<Client>> {
    req.validate()?;

    let client = Client::update(
        &state.db,
        id,
        session.owner_id(),
        UpdateClient {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            notes: req.notes,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let invoices = Invoice::count_by_client(&state.db, session.owner_id(), id).await?;
    if invoices > 0 {
        return Err(ApiError::Conflict(format!(
            "Client still has {} invoice(s) and cannot be deleted",
            invoices
        )));
    }

    if !Client::delete(&state.db, id, session.owner_id()).await? {
        return Err(not_found());
    }

    tracing::info!(client_id = %id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}
