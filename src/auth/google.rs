use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    config::GoogleConfig,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::{
    dto::TokenResponse,
    jwt::JwtKeys,
    password::hash_password,
    repo::{NewUser, User},
};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub fn google_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google/login", get(google_login))
        .route("/auth/google/callback", post(google_callback))
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokens {
    access_token: String,
}

/// What Google asserts about the account after a successful exchange.
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

fn google_config(state: &AppState) -> ApiResult<&GoogleConfig> {
    state
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Google OAuth not configured")))
}

#[instrument(skip(state))]
pub async fn google_login(State(state): State<AppState>) -> ApiResult<Json<GoogleLoginResponse>> {
    let cfg = google_config(&state)?;
    let url = reqwest::Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", cfg.client_id.as_str()),
            ("redirect_uri", cfg.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("access_type", "offline"),
        ],
    )
    .context("build google authorize url")?;

    Ok(Json(GoogleLoginResponse {
        auth_url: url.into(),
    }))
}

async fn fetch_profile(cfg: &GoogleConfig, code: &str) -> anyhow::Result<GoogleProfile> {
    let client = reqwest::Client::new();

    let tokens: GoogleTokens = client
        .post(TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", cfg.client_id.as_str()),
            ("client_secret", cfg.client_secret.as_str()),
            ("redirect_uri", cfg.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("google token request")?
        .error_for_status()
        .context("google token exchange")?
        .json()
        .await
        .context("google token response")?;

    let profile = client
        .get(USERINFO_URL)
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .context("google userinfo request")?
        .error_for_status()
        .context("google userinfo")?
        .json()
        .await
        .context("google userinfo response")?;

    Ok(profile)
}

/// Exchanges the authorization code, then logs in or provisions the user.
/// Accounts created here get an unusable random password; the email is
/// considered verified by Google.
#[instrument(skip(state, payload))]
pub async fn google_callback(
    State(state): State<AppState>,
    Json(payload): Json<GoogleCallbackRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let cfg = google_config(&state)?.clone();

    let profile = fetch_profile(&cfg, &payload.code).await?;
    let email = profile
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email not provided by Google".into()))?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let placeholder: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();
            let user = User::create(
                &state.db,
                &NewUser {
                    email,
                    password_hash: hash_password(&placeholder)?,
                    full_name: profile.name,
                    avatar_url: profile.picture,
                    is_email_verified: true,
                },
            )
            .await?;
            info!(user_id = %user.id, "user provisioned via google oauth");
            user
        }
    };

    if !user.is_active {
        return Err(ApiError::Forbidden("Inactive user"));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;

    info!(user_id = %user.id, "google oauth login");
    Ok(Json(TokenResponse::bearer(access_token)))
}
