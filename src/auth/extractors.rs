use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::{JwtKeys, TokenKind};
use super::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer token resolved to an existing user. No activity check yet.
pub struct CurrentUser(pub User);

/// `CurrentUser` plus the active-account check.
pub struct ActiveUser(pub User);

/// `ActiveUser` plus the admin check, for admin-scoped routes.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthenticated
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthenticated);
        }

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            warn!(user_id = %user.id, "inactive account rejected");
            return Err(ApiError::Forbidden("Inactive user"));
        }
        Ok(ActiveUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ActiveUser(user) = ActiveUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            warn!(user_id = %user.id, "non-admin on admin route");
            return Err(ApiError::Forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
