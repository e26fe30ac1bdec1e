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
    auth::extractors::{ActiveUser, AdminUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{CreateCategoryRequest, UpdateCategoryRequest};
use super::repo::{self, Category, CategoryChanges};

/// Categories are readable by any active user; only admins shape the
/// catalogue.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

#[instrument(skip(state, _user))]
pub async fn list_categories(
    State(state): State<AppState>,
    _user: ActiveUser,
    Query(p): Query<Pagination>,
) -> ApiResult<Json<Vec<Category>>> {
    let rows = repo::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, _user))]
pub async fn get_category(
    State(state): State<AppState>,
    _user: ActiveUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;
    Ok(Json(row))
}

#[instrument(skip(state, admin, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if repo::find_by_name(&state.db, name).await?.is_some() {
        return Err(ApiError::Conflict("Category already exists".into()));
    }

    let row = repo::create(
        &state.db,
        name,
        payload.icon.as_deref(),
        payload.color.as_deref(),
        payload.description.as_deref(),
    )
    .await?;

    info!(admin_id = %admin.id, category_id = %row.id, "category created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;

    if let Some(name) = payload.name.as_deref() {
        if let Some(existing) = repo::find_by_name(&state.db, name).await? {
            if existing.id != id {
                return Err(ApiError::Conflict("Category already exists".into()));
            }
        }
    }

    let updated = repo::update(
        &state.db,
        id,
        &CategoryChanges {
            name: payload.name,
            icon: payload.icon,
            color: payload.color,
            description: payload.description,
        },
    )
    .await?;

    info!(admin_id = %admin.id, category_id = %id, "category updated");
    Ok(Json(updated))
}

#[instrument(skip(state, admin))]
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let row = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Category"))?;

    repo::delete(&state.db, id).await?;
    info!(admin_id = %admin.id, category_id = %id, "category deleted");
    Ok(Json(row))
}
