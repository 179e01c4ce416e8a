use crate::config::Config;
use crate::db::{Database, TaskInput, TaskKind};
use crate::stats;
use crate::stats::StreakOverview;
use crate::stats::calendar::DayKey;
use crate::stats::hours::{self, UserStats};
use crate::stats::streak::update_streak;
use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/tasks", post(create_task))
        .route("/api/v1/breaks", post(create_break))
        .route("/api/v1/moods", post(create_mood))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/dashboard/cached", get(cached_dashboard))
        .route("/api/v1/stats", get(user_stats))
        .route("/api/v1/streak", get(streak))
        .route("/api/v1/goal", put(update_goal))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: String,
}

#[derive(Debug, Deserialize)]
struct CreateTaskPayload {
    user: String,
    title: String,
    kind: Option<TaskKind>,
    completed: Option<bool>,
    started_at: Option<i64>,
    ended_at: Option<i64>,
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateBreakPayload {
    user: String,
    occurred_at: Option<i64>,
    logged_at: Option<i64>,
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateMoodPayload {
    user: String,
    mood: Option<f64>,
    stress: Option<f64>,
    occurred_at: Option<i64>,
    logged_at: Option<i64>,
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoalUpdatePayload {
    user: String,
    weekly_goal_hours: f64,
}

#[derive(Debug, Serialize)]
struct TaskCreatedPayload {
    id: i64,
    streak: StreakOverview,
}

#[derive(Debug, Serialize)]
struct RecordCreatedPayload {
    id: i64,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    users: i64,
    tasks: i64,
    breaks: i64,
    moods: i64,
    last_refreshed_at: Option<i64>,
    api_port: u16,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let counts = database.record_counts()?;

    let payload = StatusPayload {
        users: counts.users,
        tasks: counts.tasks,
        breaks: counts.breaks,
        moods: counts.moods,
        last_refreshed_at: database.latest_refresh_at()?,
        api_port: state.config.api_port,
    };

    Ok(Json(payload))
}

async fn create_task(
    State(state): State<ApiState>,
    Json(payload): Json<CreateTaskPayload>,
) -> ApiResult<Json<TaskCreatedPayload>> {
    let user = validated_user(&payload.user)?;
    let database = Database::open(&state.config.db_path)?;
    database.ensure_user(user, state.config.default_weekly_goal_hours)?;

    let now = Local::now();
    let task = TaskInput {
        user: user.to_string(),
        title: payload.title.trim().to_string(),
        kind: payload.kind.unwrap_or(TaskKind::Work),
        completed: payload.completed.unwrap_or(false),
        started_at: payload.started_at,
        ended_at: payload.ended_at,
        created_at: payload.created_at.or(Some(now.timestamp())),
    };
    let id = database.insert_task(&task)?;

    // A qualifying work task extends the streak with its attributed day;
    // break tasks fold in no new days but still get a consistent recompute.
    let row = task.into_row(id);
    let observed = stats::active_days(std::slice::from_ref(&row));
    let prior = database.streak_state(user)?;
    let updated = update_streak(DayKey::from_datetime(now), &prior, &observed);
    database.upsert_streak(user, &updated, now.timestamp())?;

    Ok(Json(TaskCreatedPayload {
        id,
        streak: StreakOverview::from(&updated),
    }))
}

async fn create_break(
    State(state): State<ApiState>,
    Json(payload): Json<CreateBreakPayload>,
) -> ApiResult<Json<RecordCreatedPayload>> {
    let user = validated_user(&payload.user)?;
    let database = Database::open(&state.config.db_path)?;
    database.ensure_user(user, state.config.default_weekly_goal_hours)?;

    let created_at = payload.created_at.or(Some(Local::now().timestamp()));
    let id = database.insert_break(user, payload.occurred_at, payload.logged_at, created_at)?;

    Ok(Json(RecordCreatedPayload { id }))
}

async fn create_mood(
    State(state): State<ApiState>,
    Json(payload): Json<CreateMoodPayload>,
) -> ApiResult<Json<RecordCreatedPayload>> {
    let user = validated_user(&payload.user)?;
    let database = Database::open(&state.config.db_path)?;
    database.ensure_user(user, state.config.default_weekly_goal_hours)?;

    let created_at = payload.created_at.or(Some(Local::now().timestamp()));
    let id = database.insert_mood(
        user,
        payload.mood,
        payload.stress,
        payload.occurred_at,
        payload.logged_at,
        created_at,
    )?;

    Ok(Json(RecordCreatedPayload { id }))
}

async fn dashboard(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<stats::DashboardSnapshot>> {
    let user = validated_user(&query.user)?;
    let database = Database::open(&state.config.db_path)?;

    let snapshot = stats::refresh_user_snapshot(
        &database,
        Local::now(),
        user,
        state.config.default_weekly_goal_hours,
    )?;

    Ok(Json(snapshot))
}

async fn cached_dashboard(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Value>> {
    let user = validated_user(&query.user)?;
    let database = Database::open(&state.config.db_path)?;

    let row = database
        .weekly_cache(user)?
        .ok_or_else(|| ApiError::NotFound(format!("No cached snapshot for user: {user}")))?;

    let payload: Value = serde_json::from_str(&row.payload)
        .context("Failed to parse cached dashboard payload")?;

    Ok(Json(payload))
}

async fn user_stats(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<UserStats>> {
    let user = validated_user(&query.user)?;
    let database = Database::open(&state.config.db_path)?;

    let now = Local::now();
    let tasks = database.tasks_since(user, hours::week_start(now))?;
    let weekly_goal_hours = database
        .weekly_goal(user)?
        .unwrap_or(state.config.default_weekly_goal_hours);

    Ok(Json(hours::compute_user_stats(
        now,
        &tasks,
        weekly_goal_hours,
    )))
}

async fn streak(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<StreakOverview>> {
    let user = validated_user(&query.user)?;
    let database = Database::open(&state.config.db_path)?;
    let state_row = database.streak_state(user)?;

    Ok(Json(StreakOverview::from(&state_row)))
}

async fn update_goal(
    State(state): State<ApiState>,
    Json(payload): Json<GoalUpdatePayload>,
) -> ApiResult<Json<Value>> {
    let user = validated_user(&payload.user)?;

    if !payload.weekly_goal_hours.is_finite() || payload.weekly_goal_hours < 0.0 {
        return Err(ApiError::BadRequest(
            "weekly_goal_hours must be a non-negative number".to_string(),
        ));
    }

    let database = Database::open(&state.config.db_path)?;
    database.set_weekly_goal(user, payload.weekly_goal_hours)?;

    Ok(Json(json!({
        "saved": true,
        "user": user,
        "weekly_goal_hours": payload.weekly_goal_hours
    })))
}

fn validated_user(user: &str) -> Result<&str, ApiError> {
    let trimmed = user.trim();

    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("user must not be empty".to_string()));
    }

    Ok(trimmed)
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
