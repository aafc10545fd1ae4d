/// Invoice status lifecycle
///
/// ```text
/// draft ──send──> sent ──pay──> paid
///                  │             ▲
///                  └─(due date passes, derived)─> overdue ──pay──┘
/// ```
///
/// Only `draft`, `sent` and `paid` are ever stored. `overdue` is how a
/// stored `sent` invoice reads once its due date is behind today, and
/// [`effective_status`] is the one place that rule lives. Aggregation,
/// list filters and API responses all go through it.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::invoice::{Invoice, InvoiceStatus};

/// VAT rate applied when an invoice is created without one
pub const DEFAULT_TAX_RATE: f64 = 20.0;

/// Gross amount from net amount and a tax rate in percent
///
/// `gross = net × (1 + rate / 100)`, native floating point, no rounding.
pub fn compute_gross(net_amount: f64, tax_rate: f64) -> f64 {
    net_amount * (1.0 + tax_rate / 100.0)
}

/// Status of an invoice as reported to readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Draft,
    Sent,
    Overdue,
    Paid,
}

impl EffectiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveStatus::Draft => "draft",
            EffectiveStatus::Sent => "sent",
            EffectiveStatus::Overdue => "overdue",
            EffectiveStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectiveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EffectiveStatus::Draft),
            "sent" => Ok(EffectiveStatus::Sent),
            "overdue" => Ok(EffectiveStatus::Overdue),
            "paid" => Ok(EffectiveStatus::Paid),
            other => Err(format!("Unknown invoice status: {}", other)),
        }
    }
}

/// Resolves the read-time status from the stored status and due date
///
/// A `sent` invoice whose due date is strictly before `today` is overdue.
/// An invoice due today is still `sent`. Drafts and paid invoices are never
/// reclassified.
pub fn resolve_status(stored: InvoiceStatus, due_date: NaiveDate, today: NaiveDate) -> EffectiveStatus {
    match stored {
        InvoiceStatus::Draft => EffectiveStatus::Draft,
        InvoiceStatus::Paid => EffectiveStatus::Paid,
        InvoiceStatus::Sent if due_date < today => EffectiveStatus::Overdue,
        InvoiceStatus::Sent => EffectiveStatus::Sent,
    }
}

/// Effective status of an invoice on `today`
pub fn effective_status(invoice: &Invoice, today: NaiveDate) -> EffectiveStatus {
    resolve_status(invoice.status, invoice.due_date, today)
}

/// A user-triggered status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    /// draft → sent
    MarkSent,
    /// sent/overdue → paid
    MarkPaid,
}

impl InvoiceAction {
    /// Stored status the invoice must be in for the action to apply
    pub fn required_status(&self) -> InvoiceStatus {
        match self {
            InvoiceAction::MarkSent => InvoiceStatus::Draft,
            InvoiceAction::MarkPaid => InvoiceStatus::Sent,
        }
    }

    /// Stored status after the action
    pub fn target_status(&self) -> InvoiceStatus {
        match self {
            InvoiceAction::MarkSent => InvoiceStatus::Sent,
            InvoiceAction::MarkPaid => InvoiceStatus::Paid,
        }
    }
}

/// Refused status change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot mark a {current} invoice as {target}")]
pub struct TransitionError {
    pub current: EffectiveStatus,
    pub target: &'static str,
}

/// Checks that `action` is allowed from the invoice's current status
pub fn check_transition(
    invoice: &Invoice,
    action: InvoiceAction,
    today: NaiveDate,
) -> Result<(), TransitionError> {
    if invoice.status.can_transition_to(action.target_status()) {
        return Ok(());
    }

    Err(TransitionError {
        current: effective_status(invoice, today),
        target: action.target_status().as_str(),
    })
}
