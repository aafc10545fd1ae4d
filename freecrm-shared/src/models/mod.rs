/// Database models for FreeCRM
///
/// Every CRM table carries an `owner_id`, and every operation here that reads
/// or writes one of those tables takes the owner id and filters on it. A row
/// owned by someone else is indistinguishable from a missing row.
///
/// # Models
///
/// - `user`: Accounts; the user id is the ownership key
/// - `client`: Customers, optionally converted from a prospect
/// - `prospect`: Leads and their pipeline status, plus conversion to a client
/// - `task`: To-dos with a due date, linked to at most one client or prospect
/// - `invoice`: Invoices billed to a client, with a draft/sent/paid lifecycle
///
/// # Example
///
/// ```no_run
/// use freecrm_shared::models::{client::{Client, CreateClient}, ContactFields};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let client = Client::create(&pool, CreateClient {
///     owner_id,
///     contact: ContactFields::named("Acme SARL"),
/// }).await?;
///
/// let clients = Client::list_by_owner(&pool, owner_id).await?;
/// assert!(clients.iter().any(|c| c.id == client.id));
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};

pub mod client;
pub mod invoice;
pub mod prospect;
pub mod task;
pub mod user;

/// Contact details shared by clients and prospects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl ContactFields {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trims every field and turns blank optional fields into `None`
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            email: clean(self.email),
            phone: clean(self.phone),
            address: clean(self.address),
            notes: clean(self.notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_normalized() {
        let contact = ContactFields {
            name: "  Acme  ".to_string(),
            email: Some("  ".to_string()),
            phone: Some(" 01 23 ".to_string()),
            address: None,
            notes: Some(String::new()),
        }
        .normalized();

        assert_eq!(contact.name, "Acme");
        assert_eq!(contact.email, None);
        assert_eq!(contact.phone.as_deref(), Some("01 23"));
        assert_eq!(contact.notes, None);
    }
}
