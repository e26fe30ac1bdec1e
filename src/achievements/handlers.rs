use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::ActiveUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{AchievementFilter, CreateAchievementRequest, Pagination, UpdateAchievementRequest};
use super::repo::{self, Achievement, AchievementChanges, NewAchievement};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/achievements", get(list_achievements).post(create_achievement))
        .route(
            "/achievements/:id",
            get(get_achievement)
                .put(update_achievement)
                .delete(delete_achievement),
        )
        .route("/achievements/public/all", get(list_public_achievements))
}

fn validate_importance(level: i32) -> ApiResult<()> {
    if !(1..=5).contains(&level) {
        return Err(ApiError::Validation(
            "importance_level must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user))]
pub async fn list_achievements(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Query(filter): Query<AchievementFilter>,
) -> ApiResult<Json<Vec<Achievement>>> {
    let rows = repo::list_by_user(
        &state.db,
        user.id,
        filter.limit,
        filter.offset,
        filter.category_id,
    )
    .await?;
    Ok(Json(rows))
}

/// No authentication: only rows explicitly marked public.
#[instrument(skip(state))]
pub async fn list_public_achievements(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Achievement>>> {
    let rows = repo::list_public(&state.db, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn create_achievement(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateAchievementRequest>,
) -> ApiResult<(StatusCode, Json<Achievement>)> {
    validate_importance(payload.importance_level)?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".into()));
    }

    let row = repo::create(
        &state.db,
        user.id,
        &NewAchievement {
            category_id: payload.category_id,
            title: payload.title,
            description: payload.description,
            date_achieved: payload.date_achieved,
            importance_level: payload.importance_level,
            is_public: payload.is_public,
        },
    )
    .await?;

    info!(user_id = %user.id, achievement_id = %row.id, "achievement created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, user))]
pub async fn get_achievement(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Achievement>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Achievement"))?;

    if row.user_id != user.id && !row.is_public {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    Ok(Json(row))
}

#[instrument(skip(state, user, payload))]
pub async fn update_achievement(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAchievementRequest>,
) -> ApiResult<Json<Achievement>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Achievement"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    if let Some(level) = payload.importance_level {
        validate_importance(level)?;
    }

    let updated = repo::update(
        &state.db,
        id,
        &AchievementChanges {
            category_id: payload.category_id,
            title: payload.title,
            description: payload.description,
            date_achieved: payload.date_achieved,
            importance_level: payload.importance_level,
            is_public: payload.is_public,
        },
    )
    .await?;
    Ok(Json(updated))
}

#[instrument(skip(state, user))]
pub async fn delete_achievement(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Achievement>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Achievement"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }

    repo::delete(&state.db, id).await?;
    info!(user_id = %user.id, achievement_id = %id, "achievement deleted");
    Ok(Json(row))
}
