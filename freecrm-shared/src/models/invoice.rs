/// Invoice model and database operations
///
/// Invoices belong to one owner and bill one of that owner's clients. The
/// stored status is `draft`, `sent` or `paid`; the overdue reading is
/// derived at read time by [`crate::billing::effective_status`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE invoice_status AS ENUM ('draft', 'sent', 'paid');
///
/// CREATE TABLE invoices (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     number VARCHAR(64) NOT NULL,
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
///     issue_date DATE NOT NULL DEFAULT CURRENT_DATE,
///     due_date DATE NOT NULL,
///     net_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
///     tax_rate DOUBLE PRECISION NOT NULL DEFAULT 20,
///     gross_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
///     status invoice_status NOT NULL DEFAULT 'draft',
///     sent_at TIMESTAMPTZ,
///     paid_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT invoices_owner_number_key UNIQUE (owner_id, number)
/// );
/// ```
///
/// Reads join `clients` to expose `client_name`. Statements that modify a row
/// wrap the write in a CTE so the returned row carries the same expansion.
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use freecrm_shared::billing::lifecycle::InvoiceAction;
/// use freecrm_shared::models::invoice::{CreateInvoice, Invoice};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid, client_id: Uuid) -> Result<(), sqlx::Error> {
/// let invoice = Invoice::create(&pool, CreateInvoice {
///     owner_id,
///     number: None,
///     client_id,
///     issue_date: None,
///     due_date: NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
///     net_amount: 1_000.0,
///     tax_rate: 20.0,
/// }).await?;
///
/// assert_eq!(invoice.gross_amount, 1_200.0);
/// Invoice::apply_action(&pool, invoice.id, owner_id, InvoiceAction::MarkSent).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::billing::lifecycle::{compute_gross, effective_status, EffectiveStatus, InvoiceAction};
use crate::billing::revenue::RevenueWindow;

/// Stored invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Being written, not sent to the client yet
    Draft,

    /// Sent to the client, awaiting payment
    Sent,

    /// Payment received
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        matches!(
            (self, target),
            (InvoiceStatus::Draft, InvoiceStatus::Sent) | (InvoiceStatus::Sent, InvoiceStatus::Paid)
        )
    }
}

/// Invoice as read from the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,

    /// Ownership key
    pub owner_id: Uuid,

    /// Human-facing invoice number, unique per owner
    pub number: String,

    /// Billed client
    pub client_id: Uuid,

    /// Name of the billed client (expanded from `clients`)
    pub client_name: Option<String>,

    pub issue_date: NaiveDate,

    pub due_date: NaiveDate,

    /// Amount before tax
    pub net_amount: f64,

    /// Tax rate in percent
    pub tax_rate: f64,

    /// `net_amount × (1 + tax_rate / 100)`, maintained on every write
    pub gross_amount: f64,

    /// Stored status; see [`Invoice::effective_status`] for the read-time status
    pub status: InvoiceStatus,

    /// Set when the invoice is marked as sent
    pub sent_at: Option<DateTime<Utc>>,

    /// Set when the invoice is marked as paid
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new invoice
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub owner_id: Uuid,

    /// Generated as `F-<year>-<NNNN>` when `None`
    pub number: Option<String>,

    /// Must be a client of the same owner; callers check this first
    pub client_id: Uuid,

    /// Defaults to today
    pub issue_date: Option<NaiveDate>,

    pub due_date: NaiveDate,

    pub net_amount: f64,

    pub tax_rate: f64,
}

/// Input for updating an invoice
///
/// There is deliberately no status field: status only moves through
/// [`Invoice::apply_action`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInvoice {
    pub number: Option<String>,
    pub client_id: Option<Uuid>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub net_amount: Option<f64>,
    pub tax_rate: Option<f64>,
}

impl UpdateInvoice {
    /// Whether the update touches an input of the gross amount
    pub fn changes_amounts(&self) -> bool {
        self.net_amount.is_some() || self.tax_rate.is_some()
    }
}

/// Invoice with its read-time status, as served to API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,

    pub effective_status: EffectiveStatus,
}

impl InvoiceView {
    pub fn at(invoice: Invoice, today: NaiveDate) -> Self {
        let effective_status = effective_status(&invoice, today);
        Self {
            invoice,
            effective_status,
        }
    }

    /// Re-derives `effective_status` for `today`; returns whether it changed
    ///
    /// A view kept across a date change goes stale: a sent invoice becomes
    /// overdue once its due date has passed.
    pub fn refresh(&mut self, today: NaiveDate) -> bool {
        let resolved = self.invoice.effective_status(today);
        let changed = resolved != self.effective_status;
        self.effective_status = resolved;
        changed
    }
}

/// Generates an invoice number of the form `F-<year>-<4 random digits>`
pub fn generate_invoice_number(year: i32) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("F-{}-{:04}", year, suffix)
}

const SELECT_INVOICE: &str = r#"
    SELECT i.id, i.owner_id, i.number, i.client_id, c.name AS client_name,
           i.issue_date, i.due_date, i.net_amount, i.tax_rate, i.gross_amount,
           i.status, i.sent_at, i.paid_at, i.created_at, i.updated_at
    FROM invoices i
    LEFT JOIN clients c ON c.id = i.client_id
"#;

const SELECT_CHANGED: &str = r#"
    SELECT changed.id, changed.owner_id, changed.number, changed.client_id, c.name AS client_name,
           changed.issue_date, changed.due_date, changed.net_amount, changed.tax_rate,
           changed.gross_amount, changed.status, changed.sent_at, changed.paid_at,
           changed.created_at, changed.updated_at
    FROM changed
    LEFT JOIN clients c ON c.id = changed.client_id
"#;

impl Invoice {
    /// Status as it reads on `today`
    pub fn effective_status(&self, today: NaiveDate) -> EffectiveStatus {
        effective_status(self, today)
    }

    /// Creates a draft invoice
    ///
    /// Gross is computed here from net and rate. A duplicate number for the
    /// same owner fails on `invoices_owner_number_key`.
    pub async fn create(pool: &PgPool, data: CreateInvoice) -> Result<Self, sqlx::Error> {
        let issue_date = data.issue_date.unwrap_or_else(|| Utc::now().date_naive());
        let number = data
            .number
            .unwrap_or_else(|| generate_invoice_number(issue_date.year()));
        let gross_amount = compute_gross(data.net_amount, data.tax_rate);

        let query = format!(
            r#"
            WITH changed AS (
                INSERT INTO invoices (owner_id, number, client_id, issue_date, due_date,
                                      net_amount, tax_rate, gross_amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            {}
            "#,
            SELECT_CHANGED
        );

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(data.owner_id)
            .bind(number)
            .bind(data.client_id)
            .bind(issue_date)
            .bind(data.due_date)
            .bind(data.net_amount)
            .bind(data.tax_rate)
            .bind(gross_amount)
            .fetch_one(pool)
            .await?;

        Ok(invoice)
    }

    /// Finds an invoice by ID with owner isolation
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{} WHERE i.id = $1 AND i.owner_id = $2", SELECT_INVOICE);

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(invoice)
    }

    /// Lists an owner's invoices, most recently issued first
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE i.owner_id = $1 ORDER BY i.issue_date DESC, i.created_at DESC",
            SELECT_INVOICE
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

        Ok(invoices)
    }

    /// Lists an owner's invoices issued inside `window` (`start <= issue_date < end`)
    pub async fn list_in_window(
        pool: &PgPool,
        owner_id: Uuid,
        window: RevenueWindow,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE i.owner_id = $1 AND i.issue_date >= $2 AND i.issue_date < $3 ORDER BY i.issue_date DESC",
            SELECT_INVOICE
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(owner_id)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(pool)
            .await?;

        Ok(invoices)
    }

    /// Lists an owner's invoices for one client
    pub async fn list_by_client(
        pool: &PgPool,
        owner_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "{} WHERE i.owner_id = $1 AND i.client_id = $2 ORDER BY i.issue_date DESC",
            SELECT_INVOICE
        );

        let invoices = sqlx::query_as::<_, Invoice>(&query)
            .bind(owner_id)
            .bind(client_id)
            .fetch_all(pool)
            .await?;

        Ok(invoices)
    }

    /// Updates invoice fields, recomputing gross when net or rate changes
    ///
    /// Gross is computed by the UPDATE itself from the row's own amounts, so
    /// concurrent edits of net and rate can never leave it stale. Never
    /// touches status.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateInvoice,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut sets = String::from("updated_at = NOW()");
        let mut bind_count = 2;

        if data.number.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", number = ${}", bind_count));
        }
        if data.client_id.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", client_id = ${}", bind_count));
        }
        if data.issue_date.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", issue_date = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", due_date = ${}", bind_count));
        }

        // SET expressions see the row before the update
        let mut net = String::from("net_amount");
        let mut rate = String::from("tax_rate");
        if data.net_amount.is_some() {
            bind_count += 1;
            net = format!("${}::DOUBLE PRECISION", bind_count);
            sets.push_str(&format!(", net_amount = {}", net));
        }
        if data.tax_rate.is_some() {
            bind_count += 1;
            rate = format!("${}::DOUBLE PRECISION", bind_count);
            sets.push_str(&format!(", tax_rate = {}", rate));
        }
        if data.changes_amounts() {
            sets.push_str(&format!(
                ", gross_amount = {} * (1.0 + {} / 100.0)",
                net, rate
            ));
        }

        let query = format!(
            r#"
            WITH changed AS (
                UPDATE invoices SET {}
                WHERE id = $1 AND owner_id = $2
                RETURNING *
            )
            {}
            "#,
            sets, SELECT_CHANGED
        );

        let mut q = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(owner_id);

        if let Some(number) = data.number {
            q = q.bind(number);
        }
        if let Some(client_id) = data.client_id {
            q = q.bind(client_id);
        }
        if let Some(issue_date) = data.issue_date {
            q = q.bind(issue_date);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(net_amount) = data.net_amount {
            q = q.bind(net_amount);
        }
        if let Some(tax_rate) = data.tax_rate {
            q = q.bind(tax_rate);
        }

        let invoice = q.fetch_optional(pool).await?;

        Ok(invoice)
    }

    /// Applies a status change and stamps `sent_at` or `paid_at`
    ///
    /// The row only moves when its stored status is still
    /// [`InvoiceAction::required_status`]. Returns `None` when the invoice is
    /// missing, owned by someone else, or in another status.
    pub async fn apply_action(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        action: InvoiceAction,
    ) -> Result<Option<Self>, sqlx::Error> {
        let stamp = match action {
            InvoiceAction::MarkSent => "sent_at",
            InvoiceAction::MarkPaid => "paid_at",
        };

        let query = format!(
            r#"
            WITH changed AS (
                UPDATE invoices
                SET status = $4,
                    {} = NOW(),
                    updated_at = NOW()
                WHERE id = $1 AND owner_id = $2 AND status = $3
                RETURNING *
            )
            {}
            "#,
            stamp, SELECT_CHANGED
        );

        let invoice = sqlx::query_as::<_, Invoice>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(action.required_status())
            .bind(action.target_status())
            .fetch_optional(pool)
            .await?;

        Ok(invoice)
    }

    /// Counts invoices billed to a client
    pub async fn count_by_client(pool: &PgPool, owner_id: Uuid, client_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM invoices WHERE owner_id = $1 AND client_id = $2"
        )
        .bind(owner_id)
        .bind(client_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Deletes an invoice, whatever its status
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Draft invoice for unit tests, due and issued on 2025-03-01
#[cfg(test)]
pub(crate) fn test_invoice(net_amount: f64, tax_rate: f64) -> Invoice {
    let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let now = Utc::now();

    Invoice {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        number: "F-2025-0001".to_string(),
        client_id: Uuid::new_v4(),
        client_name: Some("Acme".to_string()),
        issue_date: day,
        due_date: day,
        net_amount,
        tax_rate,
        gross_amount: compute_gross(net_amount, tax_rate),
        status: InvoiceStatus::Draft,
        sent_at: None,
        paid_at: None,
        created_at: now,
        updated_at: now,
    }
}
