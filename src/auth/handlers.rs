use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    email,
    error::{ApiError, ApiResult},
    otp::{DeliveryMethod, IssueError, OtpPurpose, OtpSubject},
    state::AppState,
};

use super::{
    dto::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, MessageResponse,
        RegisterRequest, RegisterResponse, RequestOtpRequest, ResetPasswordRequest, TokenResponse,
        UserOut, VerifyOtpRequest, VerifyOtpResponse,
    },
    extractors::ActiveUser,
    jwt::JwtKeys,
    password::{hash_password, validate_password_strength, verify_password},
    repo::{NewUser, ProfileChanges, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register/request-otp", post(register_request_otp))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", post(change_password))
        .route("/auth/me", get(get_me).put(update_me))
}

/// Step 1 of registration: prove control of the email before any account
/// row exists. The OTP subject is the email itself.
#[instrument(skip(state, payload))]
pub async fn register_request_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<RequestOtpRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let subject = OtpSubject::email(&payload.email);
    let otp = match state
        .otp
        .issue(&subject, OtpPurpose::Registration, DeliveryMethod::Email)
        .await
    {
        Ok(otp) => otp,
        Err(IssueError::Cooldown) => return Err(ApiError::Cooldown),
        Err(IssueError::Store(e)) => return Err(e.into()),
    };

    let greeting = payload.full_name.as_deref().unwrap_or("there");
    email::deliver(
        state.mailer.clone(),
        payload.email.clone(),
        "Your registration code".into(),
        format!(
            "Hi {greeting},\n\nYour verification code is {}. It expires in 10 minutes.",
            otp.code
        ),
    );

    Ok(Json(MessageResponse {
        message: "OTP sent to your email",
    }))
}

/// Step 2 of registration: the OTP must verify against the same
/// email-derived subject that issuance used.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    validate_password_strength(&payload.password).map_err(ApiError::Validation)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let subject = OtpSubject::email(&payload.email);
    let verified = state
        .otp
        .verify(&subject, OtpPurpose::Registration, &payload.otp_code)
        .await?;
    if !verified {
        warn!(email = %payload.email, "registration otp rejected");
        return Err(ApiError::InvalidOtp);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            email: payload.email,
            password_hash: hash,
            full_name: payload.full_name,
            avatar_url: None,
            // the OTP just proved control of the inbox
            is_email_verified: true,
        },
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            access_token,
            token_type: "bearer",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password produce the same answer.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(ApiError::Forbidden("Inactive user"));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse::bearer(access_token)))
}

/// Responds identically whether or not the email exists, so the endpoint
/// cannot be used to enumerate accounts.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    const GENERIC: MessageResponse = MessageResponse {
        message: "If the email exists, an OTP has been sent",
    };

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            info!(email = %payload.email, "password reset for unknown email");
            return Ok(Json(GENERIC));
        }
    };

    let subject = OtpSubject::UserId(user.id);
    match state
        .otp
        .issue(&subject, OtpPurpose::PasswordReset, DeliveryMethod::Email)
        .await
    {
        Ok(otp) => {
            let greeting = user.full_name.as_deref().unwrap_or("there");
            email::deliver(
                state.mailer.clone(),
                user.email.clone(),
                "Your password reset code".into(),
                format!(
                    "Hi {greeting},\n\nYour password reset code is {}. It expires in 10 minutes.",
                    otp.code
                ),
            );
        }
        // a 429 here would reveal the account exists
        Err(IssueError::Cooldown) => {
            warn!(user_id = %user.id, "reset otp still in cooldown");
        }
        Err(IssueError::Store(e)) => return Err(e.into()),
    }

    Ok(Json(GENERIC))
}

/// Consumes the password-reset OTP and hands back a short-lived reset
/// token; reset-password refuses to act without it.
#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> ApiResult<Json<VerifyOtpResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email is indistinguishable from a wrong code.
    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(ApiError::InvalidOtp)?;

    let subject = OtpSubject::UserId(user.id);
    let verified = state
        .otp
        .verify(&subject, OtpPurpose::PasswordReset, &payload.otp_code)
        .await?;
    if !verified {
        warn!(user_id = %user.id, "password reset otp rejected");
        return Err(ApiError::InvalidOtp);
    }

    let keys = JwtKeys::from_ref(&state);
    let reset_token = keys.sign_reset(user.id)?;

    info!(user_id = %user.id, "password reset otp verified");
    Ok(Json(VerifyOtpResponse {
        message: "OTP verified successfully",
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_reset(&payload.reset_token).map_err(|_| {
        warn!("invalid or expired reset token");
        ApiError::Unauthenticated
    })?;

    validate_password_strength(&payload.new_password).map_err(ApiError::Validation)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    let greeting = user.full_name.as_deref().unwrap_or("there");
    email::deliver(
        state.mailer.clone(),
        user.email.clone(),
        "Your password was changed".into(),
        format!("Hi {greeting},\n\nYour password was just reset. If this wasn't you, contact support."),
    );

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password reset successfully",
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(ApiError::Validation("Incorrect password".into()));
    }

    validate_password_strength(&payload.new_password).map_err(ApiError::Validation)?;

    let hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

#[instrument(skip(user))]
pub async fn get_me(ActiveUser(user): ActiveUser) -> Json<UserOut> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<ProfileChanges>,
) -> ApiResult<Json<UserOut>> {
    let updated = User::update_profile(&state.db, user.id, &payload).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
