/// Integration tests for the owner-scoped models
///
/// Skipped unless DATABASE_URL is set.

mod common;

use chrono::{Duration, Utc};
use common::{create_owner, test_pool};
use freecrm_shared::billing::lifecycle::InvoiceAction;
use freecrm_shared::billing::{compute_gross, summarize, EffectiveStatus, RevenuePeriod, RevenueWindow};
use freecrm_shared::models::client::{Client, CreateClient, UpdateClient};
use freecrm_shared::models::invoice::{CreateInvoice, Invoice, InvoiceStatus, UpdateInvoice};
use freecrm_shared::models::prospect::{ConversionError, CreateProspect, Prospect, ProspectStatus};
use freecrm_shared::models::task::{CreateTask, DueFilter, Task, TaskLink, TaskStatus, UpdateTask};
use freecrm_shared::models::ContactFields;
use uuid::Uuid;

fn contact(name: &str) -> ContactFields {
    ContactFields {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: Some("+33 1 02 03 04 05".to_string()),
        address: Some("1 rue de la Paix".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn test_prospect_conversion_creates_linked_client() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;

    let prospect = Prospect::create(&pool, CreateProspect {
        owner_id: owner.id,
        contact: contact("Durand"),
        status: Some(ProspectStatus::Proposal),
    })
    .await
    .unwrap();

    let (converted, client) = Prospect::convert_to_client(&pool, prospect.id, owner.id).await.unwrap();

    let copied = prospect.contact();
    assert_eq!(client.name, copied.name);
    assert_eq!(client.email, copied.email);
    assert_eq!(client.phone, copied.phone);
    assert_eq!(client.address, copied.address);
    assert_eq!(client.notes, copied.notes);
    assert_eq!(client.prospect_id, Some(prospect.id));
    assert_eq!(converted.status, ProspectStatus::Converted);
    assert_eq!(converted.client_id, Some(client.id));

    // the prospect is kept
    assert!(Prospect::find_by_id_and_owner(&pool, prospect.id, owner.id).await.unwrap().is_some());

    let again = Prospect::convert_to_client(&pool, prospect.id, owner.id).await;
    assert!(matches!(again, Err(ConversionError::AlreadyConverted)));

    let clients = Client::list_by_owner(&pool, owner.id).await.unwrap();
    assert_eq!(clients.len(), 1);
}

#[tokio::test]
async fn test_conversion_is_owner_scoped() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let stranger = create_owner(&pool).await;

    let prospect = Prospect::create(&pool, CreateProspect {
        owner_id: owner.id,
        contact: contact("Martin"),
        status: None,
    })
    .await
    .unwrap();

    let result = Prospect::convert_to_client(&pool, prospect.id, stranger.id).await;
    assert!(matches!(result, Err(ConversionError::NotFound)));
    assert!(Client::list_by_owner(&pool, stranger.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_only_affects_owner() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let other = create_owner(&pool).await;

    let mine = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Alpha") })
        .await
        .unwrap();
    let theirs = Client::create(&pool, CreateClient { owner_id: other.id, contact: contact("Alpha") })
        .await
        .unwrap();

    // someone else's id looks missing
    assert!(!Client::delete(&pool, theirs.id, owner.id).await.unwrap());
    assert!(Client::find_by_id_and_owner(&pool, theirs.id, owner.id).await.unwrap().is_none());

    assert!(Client::delete(&pool, mine.id, owner.id).await.unwrap());
    assert!(Client::list_by_owner(&pool, owner.id).await.unwrap().is_empty());
    assert_eq!(Client::list_by_owner(&pool, other.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_update_clears_blank_fields() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;

    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Beta") })
        .await
        .unwrap();

    let updated = Client::update(&pool, client.id, owner.id, UpdateClient {
        name: Some("Beta SAS".to_string()),
        email: Some(String::new()),
        ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.name, "Beta SAS");
    assert_eq!(updated.email, None);
    assert_eq!(updated.phone, client.phone);
}

#[tokio::test]
async fn test_invoice_lifecycle_and_gross() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Gamma") })
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let invoice = Invoice::create(&pool, CreateInvoice {
        owner_id: owner.id,
        number: None,
        client_id: client.id,
        issue_date: None,
        due_date: today + Duration::days(30),
        net_amount: 100.0,
        tax_rate: 20.0,
    })
    .await
    .unwrap();

    assert_eq!(invoice.gross_amount, 120.0);
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.issue_date, today);
    assert_eq!(invoice.client_name.as_deref(), Some("Gamma"));
    assert!(invoice.number.starts_with("F-"));

    // a draft cannot be paid
    assert!(Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkPaid).await.unwrap().is_none());

    let updated = Invoice::update(&pool, invoice.id, owner.id, UpdateInvoice {
        tax_rate: Some(10.0),
        ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
    assert!((updated.gross_amount - 110.0).abs() < 1e-9);
    assert_eq!(updated.status, InvoiceStatus::Draft);

    let sent = Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkSent).await.unwrap().unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert!(sent.sent_at.is_some());
    assert!(Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkSent).await.unwrap().is_none());

    let paid = Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkPaid).await.unwrap().unwrap();
    assert_eq!(paid.effective_status(today), EffectiveStatus::Paid);
    assert!(paid.paid_at.is_some());

    let window = RevenueWindow::for_period(RevenuePeriod::Month, today).unwrap();
    let in_window = Invoice::list_in_window(&pool, owner.id, window).await.unwrap();
    let summary = summarize(&in_window, today);
    assert!((summary.collected - 110.0).abs() < 1e-9);
    assert_eq!(summary.pending, 0.0);
}

#[tokio::test]
async fn test_gross_follows_interleaved_amount_updates() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Zeta") })
        .await
        .unwrap();

    let invoice = Invoice::create(&pool, CreateInvoice {
        owner_id: owner.id,
        number: None,
        client_id: client.id,
        issue_date: None,
        due_date: Utc::now().date_naive() + Duration::days(30),
        net_amount: 100.0,
        tax_rate: 20.0,
    })
    .await
    .unwrap();

    // two editors load the same invoice, then each changes one amount
    let seen_by_a = Invoice::find_by_id_and_owner(&pool, invoice.id, owner.id).await.unwrap().unwrap();
    let seen_by_b = Invoice::find_by_id_and_owner(&pool, invoice.id, owner.id).await.unwrap().unwrap();

    Invoice::update(&pool, seen_by_a.id, owner.id, UpdateInvoice {
        net_amount: Some(200.0),
        ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
    let stored = Invoice::update(&pool, seen_by_b.id, owner.id, UpdateInvoice {
        tax_rate: Some(10.0),
        ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stored.net_amount, 200.0);
    assert_eq!(stored.tax_rate, 10.0);
    assert!((stored.gross_amount - compute_gross(200.0, 10.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_overdue_is_derived_not_stored() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Delta") })
        .await
        .unwrap();

    let today = Utc::now().date_naive();
    let invoice = Invoice::create(&pool, CreateInvoice {
        owner_id: owner.id,
        number: Some("F-TEST-0001".to_string()),
        client_id: client.id,
        issue_date: Some(today - Duration::days(40)),
        due_date: today - Duration::days(10),
        net_amount: 50.0,
        tax_rate: 20.0,
    })
    .await
    .unwrap();

    let sent = Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkSent).await.unwrap().unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert_eq!(sent.effective_status(today), EffectiveStatus::Overdue);

    // overdue invoices can still be paid
    assert!(Invoice::apply_action(&pool, invoice.id, owner.id, InvoiceAction::MarkPaid).await.unwrap().is_some());
}

#[tokio::test]
async fn test_duplicate_invoice_number_and_client_delete_are_refused() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Epsilon") })
        .await
        .unwrap();

    let data = CreateInvoice {
        owner_id: owner.id,
        number: Some("F-2025-4242".to_string()),
        client_id: client.id,
        issue_date: None,
        due_date: Utc::now().date_naive(),
        net_amount: 10.0,
        tax_rate: 20.0,
    };
    let invoice = Invoice::create(&pool, data.clone()).await.unwrap();

    let duplicate = Invoice::create(&pool, data).await.unwrap_err();
    let constraint = duplicate.as_database_error().and_then(|e| e.constraint().map(str::to_string));
    assert_eq!(constraint.as_deref(), Some("invoices_owner_number_key"));

    let refused = Client::delete(&pool, client.id, owner.id).await.unwrap_err();
    let constraint = refused.as_database_error().and_then(|e| e.constraint().map(str::to_string));
    assert_eq!(constraint.as_deref(), Some("invoices_client_id_fkey"));

    assert!(Invoice::delete(&pool, invoice.id, owner.id).await.unwrap());
    assert!(Client::delete(&pool, client.id, owner.id).await.unwrap());
}

#[tokio::test]
async fn test_task_link_and_done() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_owner(&pool).await;
    let client = Client::create(&pool, CreateClient { owner_id: owner.id, contact: contact("Zeta") })
        .await
        .unwrap();
    let prospect = Prospect::create(&pool, CreateProspect {
        owner_id: owner.id,
        contact: contact("Eta"),
        status: None,
    })
    .await
    .unwrap();

    let today = Utc::now().date_naive();
    let task = Task::create(&pool, CreateTask {
        owner_id: owner.id,
        title: "Send the quote".to_string(),
        description: Some("  ".to_string()),
        due_date: today - Duration::days(1),
        priority: None,
        link: Some(TaskLink::Client(client.id)),
    })
    .await
    .unwrap();

    assert_eq!(task.link(), Some(TaskLink::Client(client.id)));
    assert_eq!(task.description, None);

    let relinked = Task::update(&pool, task.id, owner.id, UpdateTask {
        link: Some(Some(TaskLink::Prospect(prospect.id))),
        ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(relinked.client_id, None);
    assert_eq!(relinked.prospect_id, Some(prospect.id));

    let overdue = Task::list_overdue(&pool, owner.id, today).await.unwrap();
    assert_eq!(overdue.len(), 1);

    let done = Task::mark_done(&pool, task.id, owner.id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Done);
    assert!(done.completed_at.is_some());

    assert!(Task::list_overdue(&pool, owner.id, today).await.unwrap().is_empty());

    let reopened = Task::reopen(&pool, task.id, owner.id).await.unwrap().unwrap();
    assert_eq!(reopened.status, TaskStatus::Todo);
    assert_eq!(reopened.completed_at, None);
    assert_eq!(Task::list_overdue(&pool, owner.id, today).await.unwrap().len(), 1);
    assert!(Task::reopen(&pool, task.id, Uuid::new_v4()).await.unwrap().is_none());

    let all = Task::list_by_owner(&pool, owner.id, None, today).await.unwrap();
    assert_eq!(all.len(), 1);
    let due_today = Task::list_by_owner(&pool, owner.id, Some(DueFilter::Today), today).await.unwrap();
    assert!(due_today.is_empty());
}
