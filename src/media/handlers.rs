use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    achievements::repo as achievements_repo,
    auth::extractors::ActiveUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::AttachMediaRequest;
use super::repo::{self, Media};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/achievements/:id/media",
            get(list_media).post(attach_media),
        )
        .route("/media/:id", delete(delete_media))
}

/// Loads the parent achievement and enforces ownership. Readable when
/// public, writable only by the owner.
async fn parent_achievement(
    state: &AppState,
    achievement_id: Uuid,
    user_id: Uuid,
    write: bool,
) -> ApiResult<achievements_repo::Achievement> {
    let row = achievements_repo::find_by_id(&state.db, achievement_id)
        .await?
        .ok_or(ApiError::NotFound("Achievement"))?;
    let readable = row.user_id == user_id || (!write && row.is_public);
    if !readable {
        return Err(ApiError::Forbidden("Not enough permissions"));
    }
    Ok(row)
}

#[instrument(skip(state, user))]
pub async fn list_media(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(achievement_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Media>>> {
    parent_achievement(&state, achievement_id, user.id, false).await?;
    let rows = repo::list_by_achievement(&state.db, achievement_id).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn attach_media(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(achievement_id): Path<Uuid>,
    Json(payload): Json<AttachMediaRequest>,
) -> ApiResult<(StatusCode, Json<Media>)> {
    if payload.file_url.trim().is_empty() {
        return Err(ApiError::Validation("file_url must not be empty".into()));
    }
    parent_achievement(&state, achievement_id, user.id, true).await?;

    let row = repo::create(
        &state.db,
        achievement_id,
        &payload.file_url,
        &payload.file_type,
        payload.caption.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, media_id = %row.id, "media attached");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, user))]
pub async fn delete_media(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Media>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Media"))?;
    parent_achievement(&state, row.achievement_id, user.id, true).await?;

    repo::delete(&state.db, id).await?;
    info!(user_id = %user.id, media_id = %id, "media deleted");
    Ok(Json(row))
}
