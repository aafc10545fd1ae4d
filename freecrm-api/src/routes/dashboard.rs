/// Dashboard endpoint
///
/// ```text
/// GET /v1/dashboard
/// ```
///
/// Loads the current month's revenue, overdue tasks, prospects and clients
/// concurrently. Each part degrades to zero or an empty list when its read
/// fails, so one broken query never blanks the whole page.

use axum::{extract::State, Extension, Json};
use freecrm_shared::{
    auth::session::Session,
    billing::RevenuePeriod,
    models::{client::Client, prospect::Prospect, task::Task},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoices::{revenue_report, RevenueReport};
use crate::app::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub revenue: RevenueReport,
    pub overdue_tasks: Vec<Task>,
    pub prospects: Vec<Prospect>,
    pub clients: Vec<Client>,
}

/// Logs a failed dashboard read and shows it as an empty list
fn or_empty<T>(result: Result<Vec<T>, sqlx::Error>, part: &str, owner_id: Uuid) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, %owner_id, part, "Dashboard read failed, showing none");
        Vec::new()
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<DashboardResponse> {
    let owner_id = session.owner_id();
    let today = state.today();

    let (revenue, overdue_tasks, prospects, clients) = futures::join!(
        revenue_report(&state, owner_id, RevenuePeriod::Month, today),
        Task::list_overdue(&state.db, owner_id, today),
        Prospect::list_by_owner(&state.db, owner_id),
        Client::list_by_owner(&state.db, owner_id),
    );

    Json(DashboardResponse {
        revenue,
        overdue_tasks: or_empty(overdue_tasks, "overdue_tasks", owner_id),
        prospects: or_empty(prospects, "prospects", owner_id),
        clients: or_empty(clients, "clients", owner_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_read_shows_empty_list() {
        let failed: Result<Vec<Client>, sqlx::Error> = Err(sqlx::Error::PoolTimedOut);
        assert!(or_empty(failed, "clients", Uuid::new_v4()).is_empty());

        let loaded: Result<Vec<u32>, sqlx::Error> = Ok(vec![1, 2]);
        assert_eq!(or_empty(loaded, "prospects", Uuid::new_v4()), vec![1, 2]);
    }
}
