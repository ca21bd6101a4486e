/// Task endpoints
///
/// - `POST /api/tasks` - create a personal or group task
/// - `GET /api/tasks` - tasks created by or assigned to the requester
/// - `GET /api/tasks/stats` - counts by status for the requester
/// - `GET /api/tasks/group/:group_id` - tasks of a group (members only)
/// - `GET /api/tasks/:id` - one task
/// - `PUT /api/tasks/:id` - change fields (creator or group admin)
/// - `DELETE /api/tasks/:id` - delete (creator)
/// - `PUT /api/tasks/:id/status` - change status (creator, assignee or group admin)
///
/// Any denied access to an existing task answers exactly like a missing task.

use crate::{
    app::AppState,
    envelope::{Empty, Envelope},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use taskflow_shared::{
    auth::{
        authorization::{can_act, can_act_on_task, GroupAction, TaskAction},
        middleware::AuthContext,
    },
    membership::Roster,
    models::{
        group::Group,
        task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStats, TaskStatus, UpdateTask},
        user::{User, UserSummary},
    },
};
use tracing::info;
use uuid::Uuid;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Create request
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    #[serde(alias = "group")]
    pub group_id: Option<Uuid>,
}

/// Status-only update
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// Filters for `GET /api/tasks`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub group_id: Option<Uuid>,
}

impl From<TaskListQuery> for TaskFilter {
    fn from(query: TaskListQuery) -> Self {
        TaskFilter {
            status: query.status,
            priority: query.priority,
            group_id: query.group_id,
        }
    }
}

/// A task with creator and assignee display fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub created_by: Option<UserSummary>,
    pub assigned_to: Option<UserSummary>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    fn new(task: &Task, users: &HashMap<Uuid, UserSummary>, now: DateTime<Utc>) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            is_overdue: task.is_overdue(now),
            created_by: users.get(&task.created_by).cloned(),
            assigned_to: task.assigned_to.and_then(|id| users.get(&id).cloned()),
            group_id: task.group_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskPayload {
    pub task: TaskView,
}

#[derive(Debug, Serialize)]
pub struct TasksPayload {
    pub count: usize,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub stats: TaskStats,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found or access denied".to_string())
}

fn group_not_found() -> ApiError {
    ApiError::NotFound("Group not found or access denied".to_string())
}

fn validate_title(raw: &str) -> ApiResult<String> {
    let title = raw.trim();

    if title.is_empty() {
        return Err(ApiError::invalid_field("title", "Please add a task title"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::invalid_field(
            "title",
            format!("Title cannot be more than {} characters", MAX_TITLE_LENGTH),
        ));
    }

    Ok(title.to_string())
}

fn validate_description(raw: &str) -> ApiResult<String> {
    let description = raw.trim();

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::invalid_field(
            "description",
            format!(
                "Description cannot be more than {} characters",
                MAX_DESCRIPTION_LENGTH
            ),
        ));
    }

    Ok(description.to_string())
}

/// Checks who a task may be assigned to
///
/// Group tasks go to group members; personal tasks only to their creator.
fn check_assignee(assignee: Option<Uuid>, creator: Uuid, group: Option<&Roster>) -> ApiResult<()> {
    let Some(assignee) = assignee else {
        return Ok(());
    };

    match group {
        Some(roster) if !roster.contains(assignee) => Err(ApiError::invalid_field(
            "assignedTo",
            "Assignee must be a member of the task's group",
        )),
        None if assignee != creator => Err(ApiError::invalid_field(
            "assignedTo",
            "Personal tasks can only be assigned to their creator",
        )),
        _ => Ok(()),
    }
}

/// Loads a task and checks `action` against the creator, assignee and the
/// roster of its group (if the group still exists)
async fn load_task(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    action: TaskAction,
) -> ApiResult<(Task, Option<Group>)> {
    let task = Task::find_by_id(db, id).await?.ok_or_else(task_not_found)?;

    let group = match task.group_id {
        Some(group_id) => Group::find_by_id(db, group_id).await?,
        None => None,
    };

    can_act_on_task(user_id, &task, group.as_ref().map(Group::roster), action)?;

    Ok((task, group))
}

/// Expands creator and assignee references with one user lookup
async fn expand_tasks(db: &PgPool, tasks: &[Task]) -> ApiResult<Vec<TaskView>> {
    let mut ids: Vec<Uuid> = tasks
        .iter()
        .flat_map(|task| std::iter::once(task.created_by).chain(task.assigned_to))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = User::find_summaries(db, &ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let now = Utc::now();
    Ok(tasks.iter().map(|task| TaskView::new(task, &users, now)).collect())
}

async fn expand_task(db: &PgPool, task: Task) -> ApiResult<TaskView> {
    let mut views = expand_tasks(db, std::slice::from_ref(&task)).await?;
    views.pop().ok_or_else(task_not_found)
}

/// Creates a task
///
/// # Errors
///
/// - `400`: title missing or too long, description too long, bad assignee
/// - `404`: `groupId` names a group the requester is not a member of
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<TaskPayload>>)> {
    let Json(req) = payload?;

    let title = validate_title(&req.title)?;
    let description = validate_description(&req.description)?;

    let group = match req.group_id {
        Some(group_id) => {
            let group = Group::find_by_id(&state.db, group_id)
                .await?
                .ok_or_else(group_not_found)?;
            can_act(auth.user_id, group.roster(), GroupAction::View)?;
            Some(group)
        }
        None => None,
    };

    check_assignee(req.assigned_to, auth.user_id, group.as_ref().map(Group::roster))?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title,
            description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date,
            created_by: auth.user_id,
            assigned_to: req.assigned_to,
            group_id: req.group_id,
        },
    )
    .await?;

    info!(task_id = %task.id, user_id = %auth.user_id, group_id = ?task.group_id, "Task created");

    let task = expand_task(&state.db, task).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Task created successfully",
            TaskPayload { task },
        )),
    ))
}

/// Lists tasks created by or assigned to the requester
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<TasksPayload>>> {
    let Query(query) = query?;

    let tasks = Task::list_for_user(&state.db, auth.user_id, &query.into()).await?;
    let tasks = expand_tasks(&state.db, &tasks).await?;

    Ok(Json(Envelope::ok(TasksPayload {
        count: tasks.len(),
        tasks,
    })))
}

/// Counts the requester's tasks by status
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<StatsPayload>>> {
    let stats = Task::stats_for_user(&state.db, auth.user_id).await?;

    Ok(Json(Envelope::ok(StatsPayload { stats })))
}

/// Lists the tasks of a group the requester belongs to
pub async fn list_group_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<TasksPayload>>> {
    let Path(group_id) = path?;

    let group = Group::find_by_id(&state.db, group_id)
        .await?
        .ok_or_else(group_not_found)?;
    can_act(auth.user_id, group.roster(), GroupAction::View)?;

    let tasks = Task::list_by_group(&state.db, group_id).await?;
    let tasks = expand_tasks(&state.db, &tasks).await?;

    Ok(Json(Envelope::ok(TasksPayload {
        count: tasks.len(),
        tasks,
    })))
}

/// Fetches one task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<TaskPayload>>> {
    let Path(id) = path?;

    let (task, _) = load_task(&state.db, id, auth.user_id, TaskAction::View).await?;

    let task = expand_task(&state.db, task).await?;
    Ok(Json(Envelope::ok(TaskPayload { task })))
}

/// Changes task fields; the group of a task is fixed at creation
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> ApiResult<Json<Envelope<TaskPayload>>> {
    let Path(id) = path?;
    let Json(mut changes) = payload?;

    changes.title = changes.title.as_deref().map(validate_title).transpose()?;
    changes.description = changes
        .description
        .as_deref()
        .map(validate_description)
        .transpose()?;

    let (task, group) = load_task(&state.db, id, auth.user_id, TaskAction::Update).await?;

    if let Some(assignee) = changes.assigned_to {
        check_assignee(assignee, task.created_by, group.as_ref().map(Group::roster))?;
    }

    let task = if changes.is_empty() {
        task
    } else {
        Task::update(&state.db, id, changes)
            .await?
            .ok_or_else(task_not_found)?
    };

    info!(task_id = %id, user_id = %auth.user_id, "Task updated");

    let task = expand_task(&state.db, task).await?;
    Ok(Json(Envelope::with_message(
        "Task updated successfully",
        TaskPayload { task },
    )))
}

/// Changes only the status of a task
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<TaskPayload>>> {
    let Path(id) = path?;
    let Json(req) = payload?;

    load_task(&state.db, id, auth.user_id, TaskAction::UpdateStatus).await?;

    let task = Task::update_status(&state.db, id, req.status)
        .await?
        .ok_or_else(task_not_found)?;

    info!(task_id = %id, user_id = %auth.user_id, status = req.status.as_str(), "Task status changed");

    let task = expand_task(&state.db, task).await?;
    Ok(Json(Envelope::with_message(
        "Task status updated successfully",
        TaskPayload { task },
    )))
}

/// Deletes a task (creator only)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<Empty>>> {
    let Path(id) = path?;

    load_task(&state.db, id, auth.user_id, TaskAction::Delete).await?;

    if !Task::delete(&state.db, id).await? {
        return Err(task_not_found());
    }

    info!(task_id = %id, user_id = %auth.user_id, "Task deleted");

    Ok(Json(Envelope::message("Task deleted successfully")))
}
