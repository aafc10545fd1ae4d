/// Task model and database operations
///
/// A task is a dated to-do. It may point at one client or one prospect,
/// never both: [`TaskLink`] cannot express both, and the `tasks_single_link`
/// CHECK constraint refuses it at the database.
///
/// # State Machine
///
/// ```text
/// todo → done   (stamps completed_at)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date DATE NOT NULL,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'todo',
///     completed_at TIMESTAMPTZ,
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     prospect_id UUID REFERENCES prospects(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_single_link CHECK (client_id IS NULL OR prospect_id IS NULL)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use freecrm_shared::models::task::{CreateTask, Task, TaskLink};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid, client_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     owner_id,
///     title: "Call back about the quote".to_string(),
///     description: None,
///     due_date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
///     priority: None,
///     link: Some(TaskLink::Client(client_id)),
/// }).await?;
///
/// Task::mark_done(&pool, task.id, owner_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task completion status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

/// The one record a task may point at
///
/// Serialized externally tagged: `{"client": "<uuid>"}` or
/// `{"prospect": "<uuid>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLink {
    Client(Uuid),
    Prospect(Uuid),
}

impl TaskLink {
    /// Rebuilds a link from the two nullable columns
    ///
    /// Both columns set cannot come out of the database; client wins if it did.
    pub fn from_columns(client_id: Option<Uuid>, prospect_id: Option<Uuid>) -> Option<Self> {
        match (client_id, prospect_id) {
            (Some(id), _) => Some(TaskLink::Client(id)),
            (None, Some(id)) => Some(TaskLink::Prospect(id)),
            (None, None) => None,
        }
    }

    /// Splits an optional link into `(client_id, prospect_id)`
    pub fn into_columns(link: Option<Self>) -> (Option<Uuid>, Option<Uuid>) {
        match link {
            Some(TaskLink::Client(id)) => (Some(id), None),
            Some(TaskLink::Prospect(id)) => (None, Some(id)),
            None => (None, None),
        }
    }
}

/// Due-date views over the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueFilter {
    /// Due today
    Today,

    /// Due between today and seven days from now, inclusive
    Week,

    /// Not done and due before today
    Overdue,
}

/// Date bounds a [`DueFilter`] resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueBounds {
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,

    /// Exclusive upper bound
    pub until: Option<NaiveDate>,

    /// Restrict to tasks still `todo`
    pub open_only: bool,
}

impl DueFilter {
    pub fn bounds(&self, today: NaiveDate) -> DueBounds {
        match self {
            DueFilter::Today => DueBounds {
                from: Some(today),
                until: Some(today + Duration::days(1)),
                open_only: false,
            },
            DueFilter::Week => DueBounds {
                from: Some(today),
                until: Some(today + Duration::days(8)),
                open_only: false,
            },
            DueFilter::Overdue => DueBounds {
                from: None,
                until: Some(today),
                open_only: true,
            },
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Ownership key
    pub owner_id: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    pub status: TaskStatus,

    /// Set by [`Task::mark_done`], cleared by [`Task::reopen`]
    pub completed_at: Option<DateTime<Utc>>,

    /// Linked client; exclusive with `prospect_id`
    pub client_id: Option<Uuid>,

    /// Linked prospect; exclusive with `client_id`
    pub prospect_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,

    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,

    /// Must point at a record of the same owner; callers check this first
    pub link: Option<TaskLink>,
}

/// Input for updating a task
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,

    /// `Some("")` clears the description
    pub description: Option<String>,

    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,

    /// `Some(None)` unlinks, `Some(Some(_))` replaces the link
    pub link: Option<Option<TaskLink>>,
}

const TASK_COLUMNS: &str = "id, owner_id, title, description, due_date, priority, status, \
                            completed_at, client_id, prospect_id, created_at, updated_at";

impl Task {
    /// Current link, if any
    pub fn link(&self) -> Option<TaskLink> {
        TaskLink::from_columns(self.client_id, self.prospect_id)
    }

    /// Creates a new task in `todo` status
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let (client_id, prospect_id) = TaskLink::into_columns(data.link);
        let query = format!(
            r#"
            INSERT INTO tasks (owner_id, title, description, due_date, priority, client_id, prospect_id)
            VALUES ($1, $2, NULLIF($3, ''), $4, $5, $6, $7)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.owner_id)
            .bind(data.title.trim().to_string())
            .bind(data.description.map(|d| d.trim().to_string()))
            .bind(data.due_date)
            .bind(data.priority.unwrap_or_default())
            .bind(client_id)
            .bind(prospect_id)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID with owner isolation
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists an owner's tasks by due date, optionally narrowed to a view
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: Option<DueFilter>,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let bounds = filter.map(|f| f.bounds(today)).unwrap_or(DueBounds {
            from: None,
            until: None,
            open_only: false,
        });

        let query = format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE owner_id = $1
              AND ($2::DATE IS NULL OR due_date >= $2)
              AND ($3::DATE IS NULL OR due_date < $3)
              AND (NOT $4 OR status = 'todo')
            ORDER BY due_date ASC, created_at ASC
            "#,
            TASK_COLUMNS
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(owner_id)
            .bind(bounds.from)
            .bind(bounds.until)
            .bind(bounds.open_only)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Tasks still `todo` whose due date is before `today`
    pub async fn list_overdue(
        pool: &PgPool,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_by_owner(pool, owner_id, Some(DueFilter::Overdue), today).await
    }

    /// Updates a task; never changes status
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = NULLIF(${}, '')", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.link.is_some() {
            // both columns move together so the pair stays exclusive
            query.push_str(&format!(
                ", client_id = ${}, prospect_id = ${}",
                bind_count + 1,
                bind_count + 2
            ));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {}",
            TASK_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(owner_id);

        if let Some(title) = data.title {
            q = q.bind(title.trim().to_string());
        }
        if let Some(description) = data.description {
            q = q.bind(description.trim().to_string());
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(link) = data.link {
            let (client_id, prospect_id) = TaskLink::into_columns(link);
            q = q.bind(client_id).bind(prospect_id);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Marks a task as done and stamps `completed_at`
    ///
    /// Marking an already done task again keeps its original `completed_at`.
    pub async fn mark_done(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'done',
                completed_at = COALESCE(completed_at, NOW()),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Reopens a done task: back to `todo` with `completed_at` cleared
    pub async fn reopen(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = 'todo',
                completed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
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

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert!(TaskPriority::Urgent > TaskPriority::High);
        assert_eq!(TaskPriority::Urgent.as_str(), "urgent");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_task_link_json_shape() {
        let id = Uuid::new_v4();

        let json = serde_json::to_value(TaskLink::Client(id)).unwrap();
        assert_eq!(json, serde_json::json!({ "client": id }));

        let link: TaskLink = serde_json::from_value(serde_json::json!({ "prospect": id })).unwrap();
        assert_eq!(link, TaskLink::Prospect(id));

        let both = serde_json::json!({ "client": id, "prospect": id });
        assert!(serde_json::from_value::<TaskLink>(both).is_err());
    }

    #[test]
    fn test_task_link_columns() {
        let id = Uuid::new_v4();

        assert_eq!(TaskLink::into_columns(Some(TaskLink::Client(id))), (Some(id), None));
        assert_eq!(TaskLink::into_columns(Some(TaskLink::Prospect(id))), (None, Some(id)));
        assert_eq!(TaskLink::into_columns(None), (None, None));

        assert_eq!(TaskLink::from_columns(None, Some(id)), Some(TaskLink::Prospect(id)));
        assert_eq!(TaskLink::from_columns(None, None), None);
    }

    #[test]
    fn test_due_filter_bounds() {
        let today = date(2025, 3, 15);

        let b = DueFilter::Today.bounds(today);
        assert_eq!((b.from, b.until, b.open_only), (Some(today), Some(date(2025, 3, 16)), false));

        let b = DueFilter::Week.bounds(today);
        assert_eq!(b.until, Some(date(2025, 3, 23)));
        assert!(!b.open_only);

        let b = DueFilter::Overdue.bounds(today);
        assert_eq!((b.from, b.until, b.open_only), (None, Some(today), true));
    }

}
