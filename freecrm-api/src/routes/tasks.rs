/// Task endpoints
///
/// - `GET /v1/tasks` - List tasks by due date, `?due=today|week|overdue`
/// - `GET /v1/tasks/overdue` - Open tasks past their due date
/// - `POST /v1/tasks` - Create a task
/// - `GET /v1/tasks/:id` - Get a task
/// - `PATCH /v1/tasks/:id` - Update a task
/// - `DELETE /v1/tasks/:id` - Delete a task
/// - `POST /v1/tasks/:id/done` - Mark a task as done
/// - `POST /v1/tasks/:id/reopen` - Reopen a done task
///
/// A task links to at most one client or prospect:
///
/// ```json
/// { "title": "Call back", "due_date": "2025-03-01", "link": { "client": "<uuid>" } }
/// ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use freecrm_shared::{
    auth::session::Session,
    models::{
        client::Client,
        prospect::Prospect,
        task::{CreateTask, DueFilter, Task, TaskLink, TaskPriority, UpdateTask},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::fields::{double_option, validate_not_blank};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// New task
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,

    pub description: Option<String>,
    pub due_date: NaiveDate,

    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,

    pub link: Option<TaskLink>,
}

/// Partial task update
///
/// `link: null` unlinks the task; a missing `link` leaves it alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: Option<String>,

    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub link: Option<Option<TaskLink>>,
}

/// Query string of `GET /v1/tasks`
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub due: Option<DueFilter>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// The linked record must exist and belong to the same owner
async fn check_link(state: &AppState, owner_id: Uuid, link: Option<TaskLink>) -> ApiResult<()> {
    let exists = match link {
        None => return Ok(()),
        Some(TaskLink::Client(id)) => Client::exists_for_owner(&state.db, id, owner_id).await?,
        Some(TaskLink::Prospect(id)) => Prospect::exists_for_owner(&state.db, id, owner_id).await?,
    };

    if !exists {
        return Err(ApiError::invalid("link", "Linked record not found"));
    }
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_owner(&state.db, session.owner_id(), query.due, state.today()).await?;
    Ok(Json(tasks))
}

pub async fn list_overdue_tasks(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_overdue(&state.db, session.owner_id(), state.today()).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    check_link(&state, session.owner_id(), req.link).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            owner_id: session.owner_id(),
            title: req.title.trim().to_string(),
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            link: req.link,
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, due_date = %task.due_date, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id_and_owner(&state.db, id, session.owner_id())
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    if let Some(link) = req.link {
        check_link(&state, session.owner_id(), link).await?;
    }

    let task = Task::update(
        &state.db,
        id,
        session.owner_id(),
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            link: req.link,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(task))
}

/// Mark a task as done; repeating it keeps the first completion time
pub async fn mark_task_done(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::mark_done(&state.db, id, session.owner_id())
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(task_id = %task.id, "Task done");
    Ok(Json(task))
}

/// Reopen a task, clearing its completion time
pub async fn reopen_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::reopen(&state.db, id, session.owner_id())
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(task_id = %task.id, "Task reopened");
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Task::delete(&state.db, id, session.owner_id()).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
