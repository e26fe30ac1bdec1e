use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::MessageResponse,
        extractors::AdminUser,
        repo::{AdminChanges, User},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{GrowthQuery, UserSearch};
use super::repo::{self, GrowthPoint, SystemStats, UserWithCounts};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route(
            "/admin/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/admin/stats/overview", get(stats_overview))
        .route("/admin/stats/growth", get(stats_growth))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<UserSearch>,
) -> ApiResult<Json<Vec<UserWithCounts>>> {
    let rows = repo::list_users(&state.db, q.limit, q.offset, q.search.as_deref()).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserWithCounts>> {
    let row = repo::get_user(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(row))
}

/// Tier, ban, verify and admin flags; nothing else is reachable from here.
#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminChanges>,
) -> ApiResult<Json<UserWithCounts>> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    User::admin_update(&state.db, id, &payload).await?;
    info!(admin_id = %admin.id, user_id = %id, "user updated by admin");

    let row = repo::get_user(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(row))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if id == admin.id {
        return Err(ApiError::Validation(
            "Cannot delete your own admin account".into(),
        ));
    }

    User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    User::delete(&state.db, id).await?;
    info!(admin_id = %admin.id, user_id = %id, "user deleted by admin");
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}

#[instrument(skip(state, _admin))]
pub async fn stats_overview(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<SystemStats>> {
    let stats = repo::system_stats(&state.db).await?;
    Ok(Json(stats))
}

#[instrument(skip(state, _admin))]
pub async fn stats_growth(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<GrowthQuery>,
) -> ApiResult<Json<Vec<GrowthPoint>>> {
    if !(1..=365).contains(&q.days) {
        return Err(ApiError::Validation("days must be between 1 and 365".into()));
    }
    let points = repo::user_growth(&state.db, q.days).await?;
    Ok(Json(points))
}
