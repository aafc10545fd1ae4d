/// Revenue aggregation
///
/// A period selector and a reference date define a half-open window
/// `[start, end)` over invoice issue dates. Every invoice in the window adds
/// its gross amount to `total` and to exactly one bucket, chosen from its
/// effective status:
///
/// | effective status | bucket      |
/// |------------------|-------------|
/// | `paid`           | `collected` |
/// | `overdue`        | `overdue`   |
/// | `draft`, `sent`  | `pending`   |
///
/// so `total == collected + pending + overdue` up to floating-point error.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::lifecycle::{effective_status, EffectiveStatus};
use crate::models::invoice::Invoice;

/// Aggregation period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenuePeriod {
    #[default]
    Month,
    Quarter,
    Year,
}

impl RevenuePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenuePeriod::Month => "month",
            RevenuePeriod::Quarter => "quarter",
            RevenuePeriod::Year => "year",
        }
    }
}

impl fmt::Display for RevenuePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevenuePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(RevenuePeriod::Month),
            "quarter" => Ok(RevenuePeriod::Quarter),
            "year" => Ok(RevenuePeriod::Year),
            other => Err(format!("Unknown period: {}", other)),
        }
    }
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// First day of the month `month0` months after January of `year`
fn month_start(year: i32, month0: u32) -> Option<NaiveDate> {
    let year = year.checked_add((month0 / 12) as i32)?;
    NaiveDate::from_ymd_opt(year, month0 % 12 + 1, 1)
}

impl RevenueWindow {
    /// Window of `period` containing `reference`
    ///
    /// `None` only at the edges of the supported calendar.
    pub fn for_period(period: RevenuePeriod, reference: NaiveDate) -> Option<Self> {
        let year = reference.year();
        let (first, span) = match period {
            RevenuePeriod::Month => (reference.month0(), 1),
            RevenuePeriod::Quarter => (reference.month0() / 3 * 3, 3),
            RevenuePeriod::Year => (0, 12),
        };

        Some(Self {
            start: month_start(year, first)?,
            end: month_start(year, first + span)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Revenue buckets for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub total: f64,
    pub collected: f64,
    pub pending: f64,
    pub overdue: f64,
}

impl RevenueSummary {
    /// Adds one gross amount to `total` and to the bucket for `status`
    pub fn add(&mut self, gross_amount: f64, status: EffectiveStatus) {
        let amount = if gross_amount.is_finite() { gross_amount } else { 0.0 };

        self.total += amount;
        match status {
            EffectiveStatus::Paid => self.collected += amount,
            EffectiveStatus::Overdue => self.overdue += amount,
            EffectiveStatus::Draft | EffectiveStatus::Sent => self.pending += amount,
        }
    }
}

/// Buckets `invoices` by their effective status on `today`
///
/// Callers select the window; every invoice passed in is counted.
pub fn summarize(invoices: &[Invoice], today: NaiveDate) -> RevenueSummary {
    invoices.iter().fold(RevenueSummary::default(), |mut summary, invoice| {
        summary.add(invoice.gross_amount, effective_status(invoice, today));
        summary
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{test_invoice, InvoiceStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(net: f64, status: InvoiceStatus, due: NaiveDate) -> Invoice {
        let mut invoice = test_invoice(net, 20.0);
        invoice.status = status;
        invoice.due_date = due;
        invoice
    }

    #[test]
    fn test_period_parse_and_default() {
        assert_eq!(RevenuePeriod::default(), RevenuePeriod::Month);
        assert_eq!("quarter".parse::<RevenuePeriod>(), Ok(RevenuePeriod::Quarter));
        assert!("week".parse::<RevenuePeriod>().is_err());
        assert_eq!(RevenuePeriod::Year.to_string(), "year");
    }

    #[test]
    fn test_month_window() {
        let window = RevenueWindow::for_period(RevenuePeriod::Month, date(2025, 2, 14)).unwrap();
        assert_eq!(window.start, date(2025, 2, 1));
        assert_eq!(window.end, date(2025, 3, 1));

        assert!(window.contains(date(2025, 2, 1)));
        assert!(window.contains(date(2025, 2, 28)));
        assert!(!window.contains(date(2025, 3, 1)));
        assert!(!window.contains(date(2025, 1, 31)));
    }

    #[test]
    fn test_december_window_rolls_into_next_year() {
        let window = RevenueWindow::for_period(RevenuePeriod::Month, date(2024, 12, 31)).unwrap();
        assert_eq!(window.start, date(2024, 12, 1));
        assert_eq!(window.end, date(2025, 1, 1));
    }

    #[test]
    fn test_quarter_windows() {
        let q1 = RevenueWindow::for_period(RevenuePeriod::Quarter, date(2025, 3, 31)).unwrap();
        assert_eq!((q1.start, q1.end), (date(2025, 1, 1), date(2025, 4, 1)));

        let q3 = RevenueWindow::for_period(RevenuePeriod::Quarter, date(2025, 7, 1)).unwrap();
        assert_eq!((q3.start, q3.end), (date(2025, 7, 1), date(2025, 10, 1)));

        let q4 = RevenueWindow::for_period(RevenuePeriod::Quarter, date(2025, 11, 15)).unwrap();
        assert_eq!((q4.start, q4.end), (date(2025, 10, 1), date(2026, 1, 1)));
    }

    #[test]
    fn test_year_window() {
        let window = RevenueWindow::for_period(RevenuePeriod::Year, date(2024, 6, 30)).unwrap();
        assert_eq!((window.start, window.end), (date(2024, 1, 1), date(2025, 1, 1)));
        assert!(window.contains(date(2024, 12, 31)));
    }

    #[test]
    fn test_summarize_buckets() {
        let today = date(2025, 3, 15);
        let invoices = vec![
            invoice(100.0, InvoiceStatus::Paid, date(2025, 3, 1)),
            invoice(50.0, InvoiceStatus::Sent, date(2025, 3, 10)),
            invoice(30.0, InvoiceStatus::Sent, date(2025, 3, 15)),
            invoice(20.0, InvoiceStatus::Draft, date(2025, 3, 1)),
        ];

        let summary = summarize(&invoices, today);
        assert_eq!(summary.collected, 120.0);
        assert!((summary.overdue - 60.0).abs() < 1e-9);
        assert!((summary.pending - 60.0).abs() < 1e-9);
        assert!((summary.total - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_equals_sum_of_buckets() {
        let today = date(2025, 6, 1);
        let statuses = [InvoiceStatus::Draft, InvoiceStatus::Sent, InvoiceStatus::Paid];
        let invoices: Vec<Invoice> = (0..30)
            .map(|i| {
                let due = date(2025, 5, 1) + chrono::Duration::days(i);
                invoice(13.37 * (i as f64 + 1.0), statuses[i as usize % 3], due)
            })
            .collect();

        let s = summarize(&invoices, today);
        assert!((s.total - (s.collected + s.pending + s.overdue)).abs() < 1e-6);
        assert!(s.overdue > 0.0 && s.pending > 0.0 && s.collected > 0.0);
    }

    #[test]
    fn test_paid_invoice_lands_in_collected() {
        let paid = invoice(100.0, InvoiceStatus::Paid, date(2020, 1, 1));
        let summary = summarize(&[paid], date(2025, 3, 15));

        assert_eq!(summary, RevenueSummary { total: 120.0, collected: 120.0, pending: 0.0, overdue: 0.0 });
    }

    #[test]
    fn test_empty_and_non_finite_amounts() {
        assert_eq!(summarize(&[], date(2025, 1, 1)), RevenueSummary::default());

        let mut summary = RevenueSummary::default();
        summary.add(f64::NAN, EffectiveStatus::Sent);
        summary.add(0.0, EffectiveStatus::Paid);
        assert_eq!(summary, RevenueSummary::default());
    }
}
