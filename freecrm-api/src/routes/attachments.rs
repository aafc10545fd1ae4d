/// Invoice attachment endpoints
///
/// - `GET /v1/invoices/:id/attachments` - List attachments
/// - `PUT /v1/invoices/:id/attachments/:file_name` - Upload (raw body, no overwrite)
/// - `GET /v1/invoices/:id/attachments/:file_name` - Download
/// - `DELETE /v1/invoices/:id/attachments/:file_name` - Delete
///
/// Files live under `<owner_id>/invoices/<invoice_id>/`. The invoice is
/// looked up with the session's owner id before the store is touched, so
/// a foreign invoice id is a 404 like a missing one.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use freecrm_shared::{
    auth::session::Session,
    models::invoice::Invoice,
    storage::{attachment_key, attachment_prefix, ObjectInfo, StoredObject},
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Largest accepted upload
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

async fn ensure_invoice(state: &AppState, invoice_id: Uuid, owner_id: Uuid) -> ApiResult<()> {
    Invoice::find_by_id_and_owner(&state.db, invoice_id, owner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invoice not found".to_string()))?;
    Ok(())
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(invoice_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ObjectInfo>>> {
    let owner_id = session.owner_id();
    ensure_invoice(&state, invoice_id, owner_id).await?;

    let objects = state.storage.list(&attachment_prefix(owner_id, invoice_id)).await?;
    Ok(Json(objects))
}

/// Upload an attachment
///
/// The file name is sanitized into a single key segment; the response
/// carries the final key, the size and a SHA-256 of the content.
///
/// # Errors
///
/// - `409 Conflict`: a file with this name already exists
/// - `422 Unprocessable Entity`: empty body or unusable file name
pub async fn upload_attachment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((invoice_id, file_name)): Path<(Uuid, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StoredObject>)> {
    let owner_id = session.owner_id();
    if body.is_empty() {
        return Err(ApiError::invalid("body", "Attachment is empty"));
    }

    let key = attachment_key(owner_id, invoice_id, &file_name)?;
    ensure_invoice(&state, invoice_id, owner_id).await?;

    let stored = state.storage.put(&key, body).await?;
    tracing::info!(%invoice_id, key = %stored.key, size = stored.size, "Attachment uploaded");

    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn download_attachment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((invoice_id, file_name)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let owner_id = session.owner_id();
    let key = attachment_key(owner_id, invoice_id, &file_name)?;
    ensure_invoice(&state, invoice_id, owner_id).await?;

    let data = state.storage.get(&key).await?;
    let name = key.rsplit('/').next().unwrap_or_default().to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        data,
    )
        .into_response())
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path((invoice_id, file_name)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    let owner_id = session.owner_id();
    let key = attachment_key(owner_id, invoice_id, &file_name)?;
    ensure_invoice(&state, invoice_id, owner_id).await?;

    state.storage.delete(&key).await?;
    tracing::info!(%invoice_id, %key, "Attachment deleted");

    Ok(StatusCode::NO_CONTENT)
}
