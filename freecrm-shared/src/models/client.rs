/// Client model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(50),
///     address TEXT,
///     notes TEXT,
///     prospect_id UUID REFERENCES prospects(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `prospect_id` is set only when the client was created by converting a
/// prospect. Invoices reference clients with `ON DELETE RESTRICT`, so a
/// client with invoices cannot be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::ContactFields;

/// Client model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,

    /// Ownership key
    pub owner_id: Uuid,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    /// Prospect this client was converted from
    pub prospect_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new client
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub owner_id: Uuid,
    pub contact: ContactFields,
}

/// Input for updating a client
///
/// `None` leaves a field unchanged. An empty string clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

const CLIENT_COLUMNS: &str =
    "id, owner_id, name, email, phone, address, notes, prospect_id, created_at, updated_at";

impl Client {
    /// Creates a new client
    pub async fn create(pool: &PgPool, data: CreateClient) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO clients (owner_id, name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        );

        let contact = data.contact.normalized();
        let client = sqlx::query_as::<_, Client>(&query)
            .bind(data.owner_id)
            .bind(contact.name)
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.address)
            .bind(contact.notes)
            .fetch_one(pool)
            .await?;

        Ok(client)
    }

    /// Finds a client by ID with owner isolation
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM clients WHERE id = $1 AND owner_id = $2",
            CLIENT_COLUMNS
        );

        let client = sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(client)
    }

    /// Checks that a client exists and belongs to the owner
    pub async fn exists_for_owner(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM clients WHERE id = $1 AND owner_id = $2)"
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Lists an owner's clients by name
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM clients WHERE owner_id = $1 ORDER BY name ASC, created_at ASC",
            CLIENT_COLUMNS
        );

        let clients = sqlx::query_as::<_, Client>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

        Ok(clients)
    }

    /// Updates a client
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE clients SET updated_at = NOW()");
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

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {}",
            CLIENT_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Client>(&query).bind(id).bind(owner_id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        for (_, value) in optional {
            if let Some(value) = value {
                q = q.bind(value.trim().to_string());
            }
        }

        let client = q.fetch_optional(pool).await?;

        Ok(client)
    }

    /// Deletes a client
    ///
    /// Fails on `invoices_client_id_fkey` while invoices still reference the
    /// client. Tasks and prospects linking to it are unlinked by the database.
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
