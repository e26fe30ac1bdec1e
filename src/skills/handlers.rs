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

use super::dto::{CreateSkillRequest, UpdateSkillRequest};
use super::repo::{self, Skill, SkillChanges};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills).post(create_skill))
        .route(
            "/skills/:id",
            get(get_skill).put(update_skill).delete(delete_skill),
        )
}

fn validate_proficiency(level: i32) -> ApiResult<()> {
    if !(1..=5).contains(&level) {
        return Err(ApiError::Validation(
            "proficiency_level must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, user))]
pub async fn list_skills(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Skill>>> {
    let rows = repo::list_by_user(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn create_skill(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<CreateSkillRequest>,
) -> ApiResult<(StatusCode, Json<Skill>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    validate_proficiency(payload.proficiency_level)?;

    let row = repo::create(
        &state.db,
        user.id,
        &payload.name,
        payload.proficiency_level,
        payload.category.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, skill_id = %row.id, "skill created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, user))]
pub async fn get_skill(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Skill>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Skill"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    Ok(Json(row))
}

#[instrument(skip(state, user, payload))]
pub async fn update_skill(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSkillRequest>,
) -> ApiResult<Json<Skill>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Skill"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    if let Some(level) = payload.proficiency_level {
        validate_proficiency(level)?;
    }

    let updated = repo::update(
        &state.db,
        id,
        &SkillChanges {
            name: payload.name,
            proficiency_level: payload.proficiency_level,
            category: payload.category,
        },
    )
    .await?;
    Ok(Json(updated))
}

#[instrument(skip(state, user))]
pub async fn delete_skill(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Skill>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Skill"))?;
    if row.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }

    repo::delete(&state.db, id).await?;
    info!(user_id = %user.id, skill_id = %id, "skill deleted");
    Ok(Json(row))
}
