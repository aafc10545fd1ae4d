/// Invoice business rules
///
/// - [`lifecycle`]: gross amount computation, the read-time overdue rule and
///   allowed status transitions
/// - [`revenue`]: period windows and the four-bucket revenue summary
///
/// Everything here is pure: callers pass the invoices and the current date,
/// which keeps the rules testable without a database or a clock.

pub mod lifecycle;
pub mod revenue;

pub use lifecycle::{compute_gross, effective_status, EffectiveStatus};
pub use revenue::{summarize, RevenuePeriod, RevenueSummary, RevenueWindow};
