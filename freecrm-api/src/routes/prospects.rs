/// Prospect endpoints
///
/// - `GET /v1/prospects` - List prospects, newest first
/// - `POST /v1/prospects` - Create a prospect
/// - `GET /v1/prospects/:id` - Get a prospect
/// - `PATCH /v1/prospects/:id` - Update a prospect
/// - `DELETE /v1/prospects/:id` - Delete a prospect
/// - `POST /v1/prospects/:id/convert` - Convert into a client

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use freecrm_shared::{
    auth::session::Session,
    models::{
        client::Client,
        prospect::{CreateProspect, Prospect, ProspectStatus, UpdateProspect},
        ContactFields,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::fields::{validate_email_or_blank, validate_not_blank, validate_phone};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// New prospect
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProspectRequest {
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

    /// Defaults to `new`; `converted` is refused
    pub status: Option<ProspectStatus>,
}

/// Partial prospect update; an empty string clears an optional field
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProspectRequest {
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
    pub status: Option<ProspectStatus>,
}

/// Both records touched by a conversion
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub prospect: Prospect,
    pub client: Client,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Prospect not found".to_string())
}

/// `converted` is only reachable through the convert endpoint
fn check_status(status: Option<ProspectStatus>) -> ApiResult<()> {
    match status {
        Some(status) if !status.is_editable() => Err(ApiError::invalid(
            "status",
            "Use the convert action to convert a prospect",
        )),
        _ => Ok(()),
    }
}

pub async fn list_prospects(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Prospect>>> {
    let prospects = Prospect::list_by_owner(&state.db, session.owner_id()).await?;
    Ok(Json(prospects))
}

pub async fn create_prospect(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateProspectRequest>,
) -> ApiResult<(StatusCode, Json<Prospect>)> {
    req.validate()?;
    check_status(req.status)?;

    let prospect = Prospect::create(
        &state.db,
        CreateProspect {
            owner_id: session.owner_id(),
            contact: ContactFields {
                name: req.name,
                email: req.email,
                phone: req.phone,
                address: req.address,
                notes: req.notes,
            },
            status: req.status,
        },
    )
    .await?;

    tracing::info!(prospect_id = %prospect.id, status = prospect.status.as_str(), "Prospect created");

    Ok((StatusCode::CREATED, Json(prospect)))
}

pub async fn get_prospect(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Prospect>> {
    let prospect = Prospect::find_by_id_and_owner(&state.db, id, session.owner_id())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(prospect))
}

/// Update a prospect
///
/// A converted prospect keeps its status; other fields stay editable.
pub async fn update_prospect(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProspectRequest>,
) -> ApiResult<Json<Prospect>> {
    req.validate()?;
    check_status(req.status)?;

    if req.status.is_some() {
        let current = Prospect::find_by_id_and_owner(&state.db, id, session.owner_id())
            .await?
            .ok_or_else(not_found)?;

        if current.status == ProspectStatus::Converted {
            return Err(ApiError::Conflict(
                "A converted prospect cannot change status".to_string(),
            ));
        }
    }

    let prospect = Prospect::update(
        &state.db,
        id,
        session.owner_id(),
        UpdateProspect {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            notes: req.notes,
            status: req.status,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(prospect))
}

pub async fn delete_prospect(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Prospect::delete(&state.db, id, session.owner_id()).await? {
        return Err(not_found());
    }

    tracing::info!(prospect_id = %id, "Prospect deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Convert a prospect into a client
///
/// Creates the client and marks the prospect `converted` in one transaction.
///
/// # Errors
///
/// - `404 Not Found`: no such prospect for this user
/// - `409 Conflict`: already converted
pub async fn convert_prospect(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ConversionResponse>)> {
    let (prospect, client) = Prospect::convert_to_client(&state.db, id, session.owner_id()).await?;

    Ok((StatusCode::CREATED, Json(ConversionResponse { prospect, client })))
}
