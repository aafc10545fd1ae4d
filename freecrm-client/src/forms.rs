/// Request bodies for create and update calls
///
/// Update calls reuse the shared `Update*` structs: `None` fields are left
/// unchanged by the API and an empty string clears an optional field.
///
/// [`TaskForm`] owns the exclusive task link. Choosing a client drops any
/// chosen prospect and the other way round, so a submitted task points at
/// the most recent choice only.

use chrono::NaiveDate;
use freecrm_shared::models::{
    prospect::ProspectStatus,
    task::{TaskLink, TaskPriority},
    ContactFields,
};
use serde::Serialize;
use uuid::Uuid;

/// Client creation form; also the contact part of [`ProspectForm`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactForm {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ContactForm {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl From<ContactFields> for ContactForm {
    fn from(contact: ContactFields) -> Self {
        Self {
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            address: contact.address,
            notes: contact.notes,
        }
    }
}

/// Prospect creation form
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProspectForm {
    #[serde(flatten)]
    pub contact: ContactForm,

    /// Defaults to `new` on the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProspectStatus>,
}

impl ProspectForm {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            contact: ContactForm::named(name),
            status: None,
        }
    }
}

/// Invoice creation form
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceForm {
    /// Generated by the server when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub client_id: Uuid,

    /// Defaults to today on the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,

    pub due_date: NaiveDate,
    pub net_amount: f64,

    /// Defaults to the server's configured rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

impl InvoiceForm {
    pub fn new(client_id: Uuid, due_date: NaiveDate, net_amount: f64) -> Self {
        Self {
            number: None,
            client_id,
            issue_date: None,
            due_date,
            net_amount,
            tax_rate: None,
        }
    }
}

/// Body of `POST /v1/tasks`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRequest {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    pub link: Option<TaskLink>,
}

/// Task creation form with an exclusive client/prospect picker
#[derive(Debug, Clone)]
pub struct TaskForm {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    client_id: Option<Uuid>,
    prospect_id: Option<Uuid>,
}

impl TaskForm {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date,
            priority: TaskPriority::default(),
            client_id: None,
            prospect_id: None,
        }
    }

    /// Starts from an existing link, e.g. when editing a task
    pub fn with_link(mut self, link: Option<TaskLink>) -> Self {
        (self.client_id, self.prospect_id) = TaskLink::into_columns(link);
        self
    }

    /// Links the task to a client and unlinks any prospect
    pub fn select_client(&mut self, client_id: Uuid) {
        self.client_id = Some(client_id);
        self.prospect_id = None;
    }

    /// Links the task to a prospect and unlinks any client
    pub fn select_prospect(&mut self, prospect_id: Uuid) {
        self.prospect_id = Some(prospect_id);
        self.client_id = None;
    }

    pub fn clear_link(&mut self) {
        self.client_id = None;
        self.prospect_id = None;
    }

    pub fn link(&self) -> Option<TaskLink> {
        TaskLink::from_columns(self.client_id, self.prospect_id)
    }

    pub fn to_request(&self) -> TaskRequest {
        let description = self
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        TaskRequest {
            title: self.title.trim().to_string(),
            description,
            due_date: self.due_date,
            priority: self.priority,
            link: self.link(),
        }
    }
}

/// Partial task update
///
/// `link: None` leaves the link alone; `Some(None)` unlinks the task.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<TaskLink>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_most_recent_selection_wins() {
        let client_id = Uuid::new_v4();
        let prospect_id = Uuid::new_v4();
        let mut form = TaskForm::new("Call back", due());

        form.select_client(client_id);
        form.select_prospect(prospect_id);
        assert_eq!(form.link(), Some(TaskLink::Prospect(prospect_id)));

        form.select_client(client_id);
        assert_eq!(form.link(), Some(TaskLink::Client(client_id)));

        form.clear_link();
        assert_eq!(form.link(), None);
    }

    #[test]
    fn test_task_request_body() {
        let client_id = Uuid::new_v4();
        let mut form = TaskForm::new("  Send quote ", due());
        form.description = Some("   ".to_string());
        form.priority = TaskPriority::High;
        form.select_client(client_id);

        let body = serde_json::to_value(form.to_request()).unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Send quote",
                "due_date": "2025-03-14",
                "priority": "high",
                "link": { "client": client_id },
            })
        );
    }

    #[test]
    fn test_unlinked_task_sends_null_link() {
        let body = serde_json::to_value(TaskForm::new("Plan", due()).to_request()).unwrap();
        assert_eq!(body["link"], serde_json::Value::Null);
        assert_eq!(body["priority"], "medium");
    }

    #[test]
    fn test_with_link_round_trips_existing_task() {
        let prospect_id = Uuid::new_v4();
        let form = TaskForm::new("Follow up", due()).with_link(Some(TaskLink::Prospect(prospect_id)));
        assert_eq!(form.link(), Some(TaskLink::Prospect(prospect_id)));
    }

    #[test]
    fn test_task_changes_distinguish_unlink_from_untouched() {
        let untouched = serde_json::to_value(TaskChanges {
            title: Some("Renamed".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(untouched, json!({ "title": "Renamed" }));

        let unlink = serde_json::to_value(TaskChanges {
            link: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(unlink, json!({ "link": null }));
    }

    #[test]
    fn test_forms_omit_unset_fields() {
        let prospect = serde_json::to_value(ProspectForm::named("Globex")).unwrap();
        assert_eq!(prospect, json!({ "name": "Globex" }));

        let client_id = Uuid::new_v4();
        let invoice = serde_json::to_value(InvoiceForm::new(client_id, due(), 100.0)).unwrap();
        assert_eq!(
            invoice,
            json!({ "client_id": client_id, "due_date": "2025-03-14", "net_amount": 100.0 })
        );
    }
}
