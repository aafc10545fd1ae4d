/// Invoice endpoints
///
/// - `GET /v1/invoices` - List invoices, `?status=draft|sent|overdue|paid&client_id=<uuid>`
/// - `GET /v1/invoices/revenue` - Revenue summary, `?period=month|quarter|year&date=YYYY-MM-DD`
/// - `POST /v1/invoices` - Create a draft invoice
/// - `GET /v1/invoices/:id` - Get an invoice
/// - `PATCH /v1/invoices/:id` - Update an invoice (never its status)
/// - `DELETE /v1/invoices/:id` - Delete an invoice and its attachments
/// - `POST /v1/invoices/:id/send` - draft → sent
/// - `POST /v1/invoices/:id/pay` - sent/overdue → paid
///
/// Every invoice is served with its `effective_status`, which reads
/// `overdue` for a sent invoice past its due date.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use freecrm_shared::{
    auth::session::Session,
    billing::{
        lifecycle::{check_transition, InvoiceAction},
        summarize, EffectiveStatus, RevenuePeriod, RevenueSummary, RevenueWindow,
    },
    models::{
        client::Client,
        invoice::{CreateInvoice, Invoice, InvoiceView, UpdateInvoice},
    },
    storage::attachment_prefix,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::fields::validate_not_blank;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// New invoice
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    /// Generated as `F-<year>-<NNNN>` when missing or blank
    #[validate(length(max = 50, message = "Number must be at most 50 characters"))]
    pub number: Option<String>,

    pub client_id: Uuid,

    /// Defaults to today
    pub issue_date: Option<NaiveDate>,

    pub due_date: NaiveDate,

    #[validate(range(min = 0.0, max = 1_000_000_000.0, message = "Amount must be a positive number"))]
    pub net_amount: f64,

    /// Percent; defaults to the configured rate
    #[validate(range(min = 0.0, max = 100.0, message = "Tax rate must be between 0 and 100"))]
    pub tax_rate: Option<f64>,
}

/// Partial invoice update
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 50, message = "Number must be at most 50 characters")
    )]
    pub number: Option<String>,

    pub client_id: Option<Uuid>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    #[validate(range(min = 0.0, max = 1_000_000_000.0, message = "Amount must be a positive number"))]
    pub net_amount: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0, message = "Tax rate must be between 0 and 100"))]
    pub tax_rate: Option<f64>,
}

/// Query string of `GET /v1/invoices`
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceQuery {
    /// Filters on the effective status
    pub status: Option<EffectiveStatus>,
    pub client_id: Option<Uuid>,
}

/// Query string of `GET /v1/invoices/revenue`
#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    #[serde(default)]
    pub period: RevenuePeriod,

    /// Reference date; defaults to today
    pub date: Option<NaiveDate>,
}

/// Revenue summary with the window it covers (`start` inclusive, `end` exclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueReport {
    pub period: RevenuePeriod,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    #[serde(flatten)]
    pub summary: RevenueSummary,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Invoice not found".to_string())
}

fn check_dates(issue_date: NaiveDate, due_date: NaiveDate) -> ApiResult<()> {
    if due_date < issue_date {
        return Err(ApiError::invalid(
            "due_date",
            "Due date cannot be before the issue date",
        ));
    }
    Ok(())
}

async fn check_client(state: &AppState, owner_id: Uuid, client_id: Uuid) -> ApiResult<()> {
    if !Client::exists_for_owner(&state.db, client_id, owner_id).await? {
        return Err(ApiError::invalid("client_id", "Client not found"));
    }
    Ok(())
}

async fn find_invoice(state: &AppState, id: Uuid, owner_id: Uuid) -> ApiResult<Invoice> {
    Invoice::find_by_id_and_owner(&state.db, id, owner_id)
        .await?
        .ok_or_else(not_found)
}

/// Revenue for one period; a failed read yields zeros
pub async fn revenue_report(
    state: &AppState,
    owner_id: Uuid,
    period: RevenuePeriod,
    reference: NaiveDate,
) -> RevenueReport {
    let Some(window) = RevenueWindow::for_period(period, reference) else {
        tracing::warn!(%reference, period = period.as_str(), "No revenue window for reference date");
        return RevenueReport {
            period,
            start: None,
            end: None,
            summary: RevenueSummary::default(),
        };
    };

    let summary = match Invoice::list_in_window(&state.db, owner_id, window).await {
        Ok(invoices) => summarize(&invoices, state.today()),
        Err(e) => {
            tracing::warn!(error = %e, %owner_id, "Revenue read failed, reporting zeros");
            RevenueSummary::default()
        }
    };

    RevenueReport {
        period,
        start: Some(window.start),
        end: Some(window.end),
        summary,
    }
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<InvoiceQuery>,
) -> ApiResult<Json<Vec<InvoiceView>>> {
    let owner_id = session.owner_id();
    let invoices = match query.client_id {
        Some(client_id) => Invoice::list_by_client(&state.db, owner_id, client_id).await?,
        None => Invoice::list_by_owner(&state.db, owner_id).await?,
    };

    let today = state.today();
    let views = invoices
        .into_iter()
        .map(|invoice| InvoiceView::at(invoice, today))
        .filter(|view| query.status.map_or(true, |status| view.effective_status == status))
        .collect();

    Ok(Json(views))
}

pub async fn revenue(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RevenueQuery>,
) -> Json<RevenueReport> {
    let reference = query.date.unwrap_or_else(|| state.today());
    Json(revenue_report(&state, session.owner_id(), query.period, reference).await)
}

/// Create a draft invoice
///
/// Gross is computed from net and rate; it is never read from the body.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: invalid amounts, unknown client, due before issue
/// - `409 Conflict`: number already used
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<InvoiceView>)> {
    req.validate()?;

    let today = state.today();
    check_dates(req.issue_date.unwrap_or(today), req.due_date)?;
    check_client(&state, session.owner_id(), req.client_id).await?;

    let invoice = Invoice::create(
        &state.db,
        CreateInvoice {
            owner_id: session.owner_id(),
            number: req
                .number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            client_id: req.client_id,
            issue_date: req.issue_date,
            due_date: req.due_date,
            net_amount: req.net_amount,
            tax_rate: req.tax_rate.unwrap_or(state.config.billing.default_tax_rate),
        },
    )
    .await?;

    tracing::info!(
        invoice_id = %invoice.id,
        number = %invoice.number,
        gross_amount = invoice.gross_amount,
        "Invoice created"
    );

    Ok((StatusCode::CREATED, Json(InvoiceView::at(invoice, today))))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceView>> {
    let invoice = find_invoice(&state, id, session.owner_id()).await?;
    Ok(Json(InvoiceView::at(invoice, state.today())))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> ApiResult<Json<InvoiceView>> {
    req.validate()?;

    let current = find_invoice(&state, id, session.owner_id()).await?;
    check_dates(
        req.issue_date.unwrap_or(current.issue_date),
        req.due_date.unwrap_or(current.due_date),
    )?;
    if let Some(client_id) = req.client_id {
        check_client(&state, session.owner_id(), client_id).await?;
    }

    let invoice = Invoice::update(
        &state.db,
        id,
        session.owner_id(),
        UpdateInvoice {
            number: req.number.map(|n| n.trim().to_string()),
            client_id: req.client_id,
            issue_date: req.issue_date,
            due_date: req.due_date,
            net_amount: req.net_amount,
            tax_rate: req.tax_rate,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(InvoiceView::at(invoice, state.today())))
}

async fn transition(state: &AppState, session: Session, id: Uuid, action: InvoiceAction) -> ApiResult<InvoiceView> {
    let today = state.today();
    let current = find_invoice(state, id, session.owner_id()).await?;
    check_transition(&current, action, today)?;

    let changed = Invoice::apply_action(&state.db, id, session.owner_id(), action).await?;

    // Another request moved the invoice between the read and the write
    let invoice = changed.ok_or_else(|| {
        ApiError::Conflict("Invoice status changed concurrently".to_string())
    })?;

    tracing::info!(invoice_id = %id, status = invoice.status.as_str(), "Invoice status changed");
    Ok(InvoiceView::at(invoice, today))
}

/// Mark a draft invoice as sent (409 from any other status)
pub async fn send_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceView>> {
    Ok(Json(transition(&state, session, id, InvoiceAction::MarkSent).await?))
}

/// Mark a sent or overdue invoice as paid (409 from any other status)
pub async fn pay_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceView>> {
    Ok(Json(transition(&state, session, id, InvoiceAction::MarkPaid).await?))
}

/// Delete an invoice whatever its status, then its attachments
pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let owner_id = session.owner_id();
    if !Invoice::delete(&state.db, id, owner_id).await? {
        return Err(not_found());
    }

    match state.storage.delete_prefix(&attachment_prefix(owner_id, id)).await {
        Ok(removed) => tracing::info!(invoice_id = %id, attachments = removed, "Invoice deleted"),
        Err(e) => tracing::warn!(invoice_id = %id, error = %e, "Invoice deleted, attachments left behind"),
    }

    Ok(StatusCode::NO_CONTENT)
}
