use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::RouteGroup;
use crate::{
    auth::AuthenticatedUser,
    db::Database,
    error::{AppError, ErrorBody},
    models::{Task, TaskInput, TaskQuery},
};

macro_rules! task_columns {
    () => {
        "id, title, description, priority, status, due_date, created_at, updated_at, user_id, assigned_to"
    };
}

const SELECT_TASKS: &str = concat!("SELECT ", task_columns!(), " FROM tasks WHERE user_id = ");

const SELECT_TASK: &str = concat!(
    "SELECT ",
    task_columns!(),
    " FROM tasks WHERE id = $1 AND user_id = $2"
);

const INSERT_TASK: &str = concat!(
    "INSERT INTO tasks (id, title, description, priority, status, due_date, created_at, updated_at, user_id, assigned_to) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
    task_columns!()
);

const UPDATE_TASK: &str = concat!(
    "UPDATE tasks \
     SET title = $1, description = $2, priority = $3, status = $4, due_date = $5, assigned_to = $6, updated_at = NOW() \
     WHERE id = $7 AND user_id = $8 RETURNING ",
    task_columns!()
);

pub const GROUP: RouteGroup = RouteGroup {
    prefix: "/tasks",
    tag: "tasks",
    description: "Tasks owned by the authenticated user",
    configure,
};

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_tasks)
        .service(create_task)
        .service(get_task)
        .service(update_task)
        .service(delete_task);
}

/// Lists the caller's tasks, newest first.
///
/// Every filter given must match.
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "Matching tasks", body = [Task]),
        (status = 400, description = "Unknown status or priority filter", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[get("")]
pub async fn get_tasks(
    db: web::Data<Database>,
    query: web::Query<TaskQuery>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let AuthenticatedUser(user_id) = user;
    let filters = query.into_inner();

    let tasks = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let mut builder = QueryBuilder::<Postgres>::new(SELECT_TASKS);
                builder.push_bind(user_id);

                if let Some(status) = filters.status {
                    builder.push(" AND status = ").push_bind(status);
                }
                if let Some(priority) = filters.priority {
                    builder.push(" AND priority = ").push_bind(priority);
                }
                if let Some(assigned_to) = filters.assigned_to {
                    builder.push(" AND assigned_to = ").push_bind(assigned_to);
                }
                if let Some(search) = filters.search.as_deref() {
                    let pattern = like_pattern(search);
                    builder
                        .push(" AND (title ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR description ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
                builder.push(" ORDER BY created_at DESC");

                let tasks: Vec<Task> = builder
                    .build_query_as()
                    .fetch_all(session.conn())
                    .await?;
                Ok::<_, AppError>(tasks)
            })
        })
        .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task owned by the caller.
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body = TaskInput,
    responses(
        (status = 201, description = "The stored task", body = Task),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Title empty or too long, or description too long", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[post("")]
pub async fn create_task(
    db: web::Data<Database>,
    payload: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    payload.validate()?;
    let task = Task::new(payload.into_inner(), user.0);

    let created = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let created: Task = sqlx::query_as(INSERT_TASK)
                    .bind(task.id)
                    .bind(task.title)
                    .bind(task.description)
                    .bind(task.priority)
                    .bind(task.status)
                    .bind(task.due_date)
                    .bind(task.created_at)
                    .bind(task.updated_at)
                    .bind(task.user_id)
                    .bind(task.assigned_to)
                    .fetch_one(session.conn())
                    .await?;
                Ok::<_, AppError>(created)
            })
        })
        .await?;

    log::debug!("user {} created task {}", created.user_id, created.id);
    Ok(HttpResponse::Created().json(created))
}

/// Fetches one of the caller's tasks. Tasks of other users are reported as
/// not found.
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "The task", body = Task),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such task for this user", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[get("/{id}")]
pub async fn get_task(
    db: web::Data<Database>,
    task_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let AuthenticatedUser(user_id) = user;
    let task_id = task_id.into_inner();

    let task = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let task: Option<Task> = sqlx::query_as(SELECT_TASK)
                    .bind(task_id)
                    .bind(user_id)
                    .fetch_optional(session.conn())
                    .await?;
                Ok::<_, AppError>(task)
            })
        })
        .await?;

    task.map(|task| HttpResponse::Ok().json(task))
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Replaces the editable fields of one of the caller's tasks.
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskInput,
    responses(
        (status = 200, description = "The updated task", body = Task),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such task for this user", body = ErrorBody),
        (status = 422, description = "Invalid task fields", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[put("/{id}")]
pub async fn update_task(
    db: web::Data<Database>,
    task_id: web::Path<Uuid>,
    payload: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    payload.validate()?;
    let AuthenticatedUser(user_id) = user;
    let task_id = task_id.into_inner();
    let input = payload.into_inner();

    let updated = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let updated: Option<Task> = sqlx::query_as(UPDATE_TASK)
                    .bind(input.title)
                    .bind(input.description)
                    .bind(input.priority)
                    .bind(input.status)
                    .bind(input.due_date)
                    .bind(input.assigned_to)
                    .bind(task_id)
                    .bind(user_id)
                    .fetch_optional(session.conn())
                    .await?;
                Ok::<_, AppError>(updated)
            })
        })
        .await?;

    updated
        .map(|task| HttpResponse::Ok().json(task))
        .ok_or_else(|| AppError::NotFound("Task not found or not owned by user".into()))
}

/// Deletes one of the caller's tasks.
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such task for this user", body = ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
#[delete("/{id}")]
pub async fn delete_task(
    db: web::Data<Database>,
    task_id: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let AuthenticatedUser(user_id) = user;
    let task_id = task_id.into_inner();

    let deleted = db
        .run_with_session(move |session| {
            Box::pin(async move {
                let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
                    .bind(task_id)
                    .bind(user_id)
                    .execute(session.conn())
                    .await?;
                Ok::<_, AppError>(result.rows_affected())
            })
        })
        .await?;

    if deleted == 0 {
        return Err(AppError::NotFound(
            "Task not found or not owned by user".into(),
        ));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
