use bytes::Bytes;
use chrono::NaiveDate;
use freecrm_shared::{
    billing::{EffectiveStatus, RevenuePeriod, RevenueSummary},
    models::{
        client::{Client, UpdateClient},
        invoice::{InvoiceView, UpdateInvoice},
        prospect::{Prospect, UpdateProspect},
        task::{DueFilter, Task},
        user::User,
    },
    storage::{sanitize_file_name, ObjectInfo, StoredObject},
};
use reqwest::{header::AUTHORIZATION, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    forms::{ContactForm, InvoiceForm, ProspectForm, TaskChanges, TaskForm},
    http::Transport,
    session::{RefreshBody, RefreshedToken, Session},
};

/// Revenue buckets for one period window
///
/// `start` and `end` are `None` when the figures were degraded to zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Revenue {
    pub period: RevenuePeriod,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    #[serde(flatten)]
    pub summary: RevenueSummary,
}

impl Revenue {
    fn zero(period: RevenuePeriod) -> Self {
        Self {
            period,
            start: None,
            end: None,
            summary: RevenueSummary::default(),
        }
    }
}

/// Everything the dashboard shows, in one call
#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    pub revenue: Revenue,
    pub overdue_tasks: Vec<Task>,
    pub prospects: Vec<Prospect>,
    pub clients: Vec<Client>,
}

/// Result of converting a prospect
#[derive(Debug, Clone, Deserialize)]
pub struct Conversion {
    pub prospect: Prospect,
    pub client: Client,
}

#[derive(Serialize)]
struct InvoiceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<EffectiveStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<Uuid>,
}

#[derive(Serialize)]
struct RevenueParams {
    period: RevenuePeriod,

    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
}

/// Authenticated FreeCRM API client
///
/// Owns the [`Session`] it was built with. Every call sends the session's
/// access token; the server scopes all data to that user.
#[derive(Debug, Clone)]
pub struct CrmClient {
    transport: Transport,
    session: Session,
}

impl CrmClient {
    pub fn new(base_url: &str, session: Session) -> ClientResult<Self> {
        Ok(Self {
            transport: Transport::new(base_url)?,
            session,
        })
    }

    pub fn current_user(&self) -> &User {
        &self.session.user
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn authed(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self
            .transport
            .request(method, path)?
            .header(AUTHORIZATION, self.session.bearer()))
    }

    /// Signs out and drops the session
    pub async fn sign_out(self) -> ClientResult<()> {
        self.transport
            .send_empty(self.authed(Method::POST, "/v1/auth/logout")?)
            .await?;

        tracing::debug!(user_id = %self.session.user.id, "Signed out");
        Ok(())
    }

    /// Trades the refresh token for a new access token
    pub async fn refresh_session(&mut self) -> ClientResult<()> {
        let refreshed: RefreshedToken = self
            .transport
            .send_json(self.transport.post("/v1/auth/refresh")?.json(&RefreshBody {
                refresh_token: &self.session.refresh_token,
            }))
            .await?;

        self.session.access_token = refreshed.access_token;
        Ok(())
    }

    // Clients

    pub async fn list_clients(&self) -> ClientResult<Vec<Client>> {
        self.transport
            .send_json(self.authed(Method::GET, "/v1/clients")?)
            .await
    }

    pub async fn get_client(&self, id: Uuid) -> ClientResult<Client> {
        self.transport
            .send_json(self.authed(Method::GET, &format!("/v1/clients/{}", id))?)
            .await
    }

    pub async fn create_client(&self, form: &ContactForm) -> ClientResult<Client> {
        self.transport
            .send_json(self.authed(Method::POST, "/v1/clients")?.json(form))
            .await
    }

    pub async fn update_client(&self, id: Uuid, changes: &UpdateClient) -> ClientResult<Client> {
        self.transport
            .send_json(
                self.authed(Method::PATCH, &format!("/v1/clients/{}", id))?
                    .json(changes),
            )
            .await
    }

    /// Fails with a conflict while the client still has invoices
    pub async fn delete_client(&self, id: Uuid) -> ClientResult<()> {
        self.transport
            .send_empty(self.authed(Method::DELETE, &format!("/v1/clients/{}", id))?)
            .await
    }

    // Prospects

    pub async fn list_prospects(&self) -> ClientResult<Vec<Prospect>> {
        self.transport
            .send_json(self.authed(Method::GET, "/v1/prospects")?)
            .await
    }

    pub async fn get_prospect(&self, id: Uuid) -> ClientResult<Prospect> {
        self.transport
            .send_json(self.authed(Method::GET, &format!("/v1/prospects/{}", id))?)
            .await
    }

    pub async fn create_prospect(&self, form: &ProspectForm) -> ClientResult<Prospect> {
        self.transport
            .send_json(self.authed(Method::POST, "/v1/prospects")?.json(form))
            .await
    }

    pub async fn update_prospect(
        &self,
        id: Uuid,
        changes: &UpdateProspect,
    ) -> ClientResult<Prospect> {
        self.transport
            .send_json(
                self.authed(Method::PATCH, &format!("/v1/prospects/{}", id))?
                    .json(changes),
            )
            .await
    }

    pub async fn delete_prospect(&self, id: Uuid) -> ClientResult<()> {
        self.transport
            .send_empty(self.authed(Method::DELETE, &format!("/v1/prospects/{}", id))?)
            .await
    }

    /// Creates a client from the prospect and marks the prospect converted
    pub async fn convert_prospect(&self, id: Uuid) -> ClientResult<Conversion> {
        let conversion: Conversion = self
            .transport
            .send_json(self.authed(Method::POST, &format!("/v1/prospects/{}/convert", id))?)
            .await?;

        tracing::debug!(
            prospect_id = %id,
            client_id = %conversion.client.id,
            "Prospect converted"
        );
        Ok(conversion)
    }

    // Tasks

    pub async fn list_tasks(&self, due: Option<DueFilter>) -> ClientResult<Vec<Task>> {
        let mut request = self.authed(Method::GET, "/v1/tasks")?;
        if let Some(due) = due {
            request = request.query(&[("due", due)]);
        }
        self.transport.send_json(request).await
    }

    pub async fn list_overdue_tasks(&self) -> ClientResult<Vec<Task>> {
        self.transport
            .send_json(self.authed(Method::GET, "/v1/tasks/overdue")?)
            .await
    }

    pub async fn get_task(&self, id: Uuid) -> ClientResult<Task> {
        self.transport
            .send_json(self.authed(Method::GET, &format!("/v1/tasks/{}", id))?)
            .await
    }

    pub async fn create_task(&self, form: &TaskForm) -> ClientResult<Task> {
        self.transport
            .send_json(
                self.authed(Method::POST, "/v1/tasks")?
                    .json(&form.to_request()),
            )
            .await
    }

    pub async fn update_task(&self, id: Uuid, changes: &TaskChanges) -> ClientResult<Task> {
        self.transport
            .send_json(
                self.authed(Method::PATCH, &format!("/v1/tasks/{}", id))?
                    .json(changes),
            )
            .await
    }

    pub async fn mark_task_done(&self, id: Uuid) -> ClientResult<Task> {
        self.transport
            .send_json(self.authed(Method::POST, &format!("/v1/tasks/{}/done", id))?)
            .await
    }

    pub async fn reopen_task(&self, id: Uuid) -> ClientResult<Task> {
        self.transport
            .send_json(self.authed(Method::POST, &format!("/v1/tasks/{}/reopen", id))?)
            .await
    }

    pub async fn delete_task(&self, id: Uuid) -> ClientResult<()> {
        self.transport
            .send_empty(self.authed(Method::DELETE, &format!("/v1/tasks/{}", id))?)
            .await
    }

    // Invoices

    pub async fn list_invoices(
        &self,
        status: Option<EffectiveStatus>,
        client_id: Option<Uuid>,
    ) -> ClientResult<Vec<InvoiceView>> {
        self.transport
            .send_json(
                self.authed(Method::GET, "/v1/invoices")?
                    .query(&InvoiceFilter { status, client_id }),
            )
            .await
    }

    pub async fn get_invoice(&self, id: Uuid) -> ClientResult<InvoiceView> {
        self.transport
            .send_json(self.authed(Method::GET, &format!("/v1/invoices/{}", id))?)
            .await
    }

    pub async fn create_invoice(&self, form: &InvoiceForm) -> ClientResult<InvoiceView> {
        self.transport
            .send_json(self.authed(Method::POST, "/v1/invoices")?.json(form))
            .await
    }

    /// Edits an invoice; status never changes through this call
    pub async fn update_invoice(
        &self,
        id: Uuid,
        changes: &UpdateInvoice,
    ) -> ClientResult<InvoiceView> {
        self.transport
            .send_json(
                self.authed(Method::PATCH, &format!("/v1/invoices/{}", id))?
                    .json(changes),
            )
            .await
    }

    pub async fn delete_invoice(&self, id: Uuid) -> ClientResult<()> {
        self.transport
            .send_empty(self.authed(Method::DELETE, &format!("/v1/invoices/{}", id))?)
            .await
    }

    /// `draft` → `sent`
    pub async fn mark_invoice_sent(&self, id: Uuid) -> ClientResult<InvoiceView> {
        self.transport
            .send_json(self.authed(Method::POST, &format!("/v1/invoices/{}/send", id))?)
            .await
    }

    /// `sent` (or overdue) → `paid`
    pub async fn mark_invoice_paid(&self, id: Uuid) -> ClientResult<InvoiceView> {
        self.transport
            .send_json(self.authed(Method::POST, &format!("/v1/invoices/{}/pay", id))?)
            .await
    }

    /// Revenue for the window of `period` around `date` (default today)
    ///
    /// Never fails: any error is logged and reported as all-zero figures.
    pub async fn revenue(&self, period: RevenuePeriod, date: Option<NaiveDate>) -> Revenue {
        match self.fetch_revenue(period, date).await {
            Ok(revenue) => revenue,
            Err(e) => {
                tracing::warn!(error = %e, period = %period, "Revenue unavailable, reporting zero");
                Revenue::zero(period)
            }
        }
    }

    async fn fetch_revenue(&self, period: RevenuePeriod, date: Option<NaiveDate>) -> ClientResult<Revenue> {
        self.transport
            .send_json(
                self.authed(Method::GET, "/v1/invoices/revenue")?
                    .query(&RevenueParams { period, date }),
            )
            .await
    }

    pub async fn dashboard(&self) -> ClientResult<Dashboard> {
        self.transport
            .send_json(self.authed(Method::GET, "/v1/dashboard")?)
            .await
    }

    // Attachments

    fn attachment_path(invoice_id: Uuid, file_name: &str) -> ClientResult<String> {
        let name = sanitize_file_name(file_name)
            .map_err(|_| ClientError::InvalidFileName(file_name.to_string()))?;
        Ok(format!("/v1/invoices/{}/attachments/{}", invoice_id, name))
    }

    pub async fn list_attachments(&self, invoice_id: Uuid) -> ClientResult<Vec<ObjectInfo>> {
        self.transport
            .send_json(self.authed(
                Method::GET,
                &format!("/v1/invoices/{}/attachments", invoice_id),
            )?)
            .await
    }

    /// Uploads a file; an existing file with the same name is a conflict
    pub async fn upload_attachment(
        &self,
        invoice_id: Uuid,
        file_name: &str,
        content: impl Into<Bytes>,
    ) -> ClientResult<StoredObject> {
        let path = Self::attachment_path(invoice_id, file_name)?;
        self.transport
            .send_json(self.authed(Method::PUT, &path)?.body(content.into()))
            .await
    }

    pub async fn download_attachment(&self, invoice_id: Uuid, file_name: &str) -> ClientResult<Bytes> {
        let path = Self::attachment_path(invoice_id, file_name)?;
        self.transport
            .send_bytes(self.authed(Method::GET, &path)?)
            .await
    }

    pub async fn delete_attachment(&self, invoice_id: Uuid, file_name: &str) -> ClientResult<()> {
        let path = Self::attachment_path(invoice_id, file_name)?;
        self.transport
            .send_empty(self.authed(Method::DELETE, &path)?)
            .await
    }
}
