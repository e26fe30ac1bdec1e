use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    achievements::dto::Pagination,
    auth::extractors::ActiveUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{CreateGoalRequest, UpdateGoalRequest};
use super::repo::{self, Goal, GoalChanges, NewGoal};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/goals", get(list_goals).post(create_goal))
        .route(
            "/goals/:id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
}

fn validate_progress(pct: i32) -> ApiResult<()> {
    if !(0..=100).contains(&pct) {
        return Err(ApiError::Validation(
            "progress_percentage must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user))]
pub async fn list_goals(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Goal>>> {
    let rows = repo::list_by_user(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn create_goal(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateGoalRequest>,
) -> ApiResult<(StatusCode, Json<Goal>)> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }
    validate_progress(payload.progress_percentage)?;

    let row = repo::create(
        &state.db,
        user.id,
        &NewGoal {
            title: payload.title,
            description: payload.description,
            target_date: payload.target_date,
            status: payload.status,
            progress_percentage: payload.progress_percentage,
        },
    )
    .await?;

    info!(user_id = %user.id, goal_id = %row.id, "goal created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, user))]
pub async fn get_goal(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Goal>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Goal"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    Ok(Json(row))
}

#[instrument(skip(state, user, payload))]
pub async fn update_goal(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGoalRequest>,
) -> ApiResult<Json<Goal>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Goal"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    if let Some(pct) = payload.progress_percentage {
        validate_progress(pct)?;
    }

    let updated = repo::update(
        &state.db,
        id,
        &GoalChanges {
            title: payload.title,
            description: payload.description,
            target_date: payload.target_date,
            status: payload.status,
            progress_percentage: payload.progress_percentage,
        },
    )
    .await?;
    Ok(Json(updated))
}

#[instrument(skip(state, user))]
pub async fn delete_goal(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Goal>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Goal"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }

    repo::delete(&state.db, id).await?;
    info!(user_id = %user.id, goal_id = %id, "goal deleted");
    Ok(Json(row))
}
