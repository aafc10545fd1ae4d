/// Prospect model and database operations
///
/// # Pipeline
///
/// ```text
/// new → contacted → in_discussion → proposal → converted
///                                            → lost
/// ```
///
/// Statuses other than `converted` are set freely by editing. `converted` is
/// reached only through [`Prospect::convert_to_client`], which creates the
/// client and links both records in one transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE prospect_status AS ENUM (
///     'new', 'contacted', 'in_discussion', 'proposal', 'converted', 'lost'
/// );
///
/// CREATE TABLE prospects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(50),
///     address TEXT,
///     notes TEXT,
///     status prospect_status NOT NULL DEFAULT 'new',
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use freecrm_shared::models::{prospect::{CreateProspect, Prospect}, ContactFields};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let prospect = Prospect::create(&pool, CreateProspect {
///     owner_id,
///     contact: ContactFields::named("Durand & Fils"),
///     status: None,
/// }).await?;
///
/// let (prospect, client) = Prospect::convert_to_client(&pool, prospect.id, owner_id).await?;
/// assert_eq!(prospect.client_id, Some(client.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::client::Client;
use super::ContactFields;

/// Prospect pipeline status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "prospect_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProspectStatus {
    #[default]
    New,
    Contacted,
    InDiscussion,
    Proposal,
    Converted,
    Lost,
}

impl ProspectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProspectStatus::New => "new",
            ProspectStatus::Contacted => "contacted",
            ProspectStatus::InDiscussion => "in_discussion",
            ProspectStatus::Proposal => "proposal",
            ProspectStatus::Converted => "converted",
            ProspectStatus::Lost => "lost",
        }
    }

    /// Whether the status may be set by editing the prospect
    pub fn is_editable(&self) -> bool {
        !matches!(self, ProspectStatus::Converted)
    }
}

/// Prospect model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prospect {
    pub id: Uuid,

    /// Ownership key
    pub owner_id: Uuid,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    pub status: ProspectStatus,

    /// Client created by conversion
    pub client_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new prospect
#[derive(Debug, Clone)]
pub struct CreateProspect {
    pub owner_id: Uuid,
    pub contact: ContactFields,

    /// Defaults to `new`
    pub status: Option<ProspectStatus>,
}

/// Input for updating a prospect
///
/// `None` leaves a field unchanged. An empty string clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProspect {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ProspectStatus>,
}

/// Error type for prospect conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// No such prospect for this owner
    #[error("Prospect not found")]
    NotFound,

    /// The prospect already has a client
    #[error("Prospect has already been converted")]
    AlreadyConverted,

    /// Database failure; the transaction was rolled back
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const PROSPECT_COLUMNS: &str =
    "id, owner_id, name, email, phone, address, notes, status, client_id, created_at, updated_at";

impl Prospect {
    /// Contact details as they would be copied onto a client
    pub fn contact(&self) -> ContactFields {
        ContactFields {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Creates a new prospect
    pub async fn create(pool: &PgPool, data: CreateProspect) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO prospects (owner_id, name, email, phone, address, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROSPECT_COLUMNS
        );

        let contact = data.contact.normalized();
        let prospect = sqlx::query_as::<_, Prospect>(&query)
            .bind(data.owner_id)
            .bind(contact.name)
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.address)
            .bind(contact.notes)
            .bind(data.status.unwrap_or_default())
            .fetch_one(pool)
            .await?;

        Ok(prospect)
    }

    /// Finds a prospect by ID with owner isolation
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM prospects WHERE id = $1 AND owner_id = $2",
            PROSPECT_COLUMNS
        );

        let prospect = sqlx::query_as::<_, Prospect>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(prospect)
    }

    /// Checks that a prospect exists and belongs to the owner
    pub async fn exists_for_owner(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM prospects WHERE id = $1 AND owner_id = $2)"
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists an owner's prospects, newest first
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM prospects WHERE owner_id = $1 ORDER BY created_at DESC",
            PROSPECT_COLUMNS
        );

        let prospects = sqlx::query_as::<_, Prospect>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

        Ok(prospects)
    }

    /// Updates a prospect
    ///
    /// Callers reject `converted` as a target status before getting here.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateProspect,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE prospects SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }

        let optional = [
            ("email", data.email),
            ("phone", data.phone),
            ("address", data.address),
            ("notes", data.notes),
        ];
        for (column, value) in &optional {
            if value.is_some() {
                bind_count += 1;
                query.push_str(&format!(", {} = NULLIF(${}, '')", column, bind_count));
            }
        }

        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {}",
            PROSPECT_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Prospect>(&query).bind(id).bind(owner_id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        for (_, value) in optional {
            if let Some(value) = value {
                q = q.bind(value.trim().to_string());
            }
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let prospect = q.fetch_optional(pool).await?;

        Ok(prospect)
    }

    /// Converts a prospect into a client
    ///
    /// Inside one transaction: locks the prospect row, copies its contact
    /// details into a new client carrying `prospect_id`, then marks the
    /// prospect `converted` with `client_id`. Any failure rolls both writes
    /// back.
    pub async fn convert_to_client(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<(Prospect, Client), ConversionError> {
        let mut tx = pool.begin().await?;

        let select = format!(
            "SELECT {} FROM prospects WHERE id = $1 AND owner_id = $2 FOR UPDATE",
            PROSPECT_COLUMNS
        );
        let prospect = sqlx::query_as::<_, Prospect>(&select)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ConversionError::NotFound)?;

        if prospect.status == ProspectStatus::Converted || prospect.client_id.is_some() {
            return Err(ConversionError::AlreadyConverted);
        }

        let contact = prospect.contact();
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (owner_id, name, email, phone, address, notes, prospect_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, name, email, phone, address, notes, prospect_id,
                      created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(contact.name)
        .bind(contact.email)
        .bind(contact.phone)
        .bind(contact.address)
        .bind(contact.notes)
        .bind(prospect.id)
        .fetch_one(&mut *tx)
        .await?;

        let update = format!(
            r#"
            UPDATE prospects
            SET status = 'converted',
                client_id = $3,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            PROSPECT_COLUMNS
        );
        let prospect = sqlx::query_as::<_, Prospect>(&update)
            .bind(id)
            .bind(owner_id)
            .bind(client.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            prospect_id = %prospect.id,
            client_id = %client.id,
            "Prospect converted to client"
        );

        Ok((prospect, client))
    }

    /// Deletes a prospect
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prospects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prospect_status_as_str() {
        assert_eq!(ProspectStatus::New.as_str(), "new");
        assert_eq!(ProspectStatus::InDiscussion.as_str(), "in_discussion");
        assert_eq!(ProspectStatus::Converted.as_str(), "converted");
    }

    #[test]
    fn test_prospect_status_serde() {
        assert_eq!(
            serde_json::to_string(&ProspectStatus::InDiscussion).unwrap(),
            "\"in_discussion\""
        );
        let status: ProspectStatus = serde_json::from_str("\"proposal\"").unwrap();
        assert_eq!(status, ProspectStatus::Proposal);
        assert_eq!(ProspectStatus::default(), ProspectStatus::New);
    }

    #[test]
    fn test_only_converted_is_not_editable() {
        assert!(ProspectStatus::Lost.is_editable());
        assert!(ProspectStatus::Proposal.is_editable());
        assert!(!ProspectStatus::Converted.is_editable());
    }

    #[test]
    fn test_conversion_error_messages() {
        assert_eq!(ConversionError::NotFound.to_string(), "Prospect not found");
        assert_eq!(
            ConversionError::AlreadyConverted.to_string(),
            "Prospect has already been converted"
        );
    }
}
