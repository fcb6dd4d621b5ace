//! Authentication route handlers.
//!
//! Signup progresses through three client steps (email, code, details); each
//! endpoint re-validates its own preconditions server-side, so the step
//! ordering is enforced here and not trusted from the client.

use axum::{
    Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::{OtpRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::SessionContext;
use crate::services::auth::{AuthService, SignupRequest};
use crate::services::otp::OtpService;
use crate::state::AppState;

// =============================================================================
// Request Bodies
// =============================================================================

/// Request body for OTP issuance.
#[derive(Debug, Deserialize)]
pub struct RequestOtpBody {
    #[serde(default)]
    pub email: String,
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Issue a one-time signup code.
///
/// POST /api/auth/request-otp
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpBody>,
) -> Result<impl IntoResponse> {
    let service = OtpService::new(OtpRepository::new(state.pool()), state.email());
    service.request(&body.email).await?;

    Ok(Json(json!({ "message": "OTP sent successfully!" })))
}

/// Verify a submitted one-time code.
///
/// POST /api/auth/verify-otp
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty() || body.otp.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Email and OTP are required".to_string(),
        ));
    }

    let service = OtpService::new(OtpRepository::new(state.pool()), state.email());
    let email = service.verify(&body.email, body.otp.trim()).await?;

    Ok(Json(json!({ "verified": true, "email": email })))
}

/// Create an account for an OTP-verified email.
///
/// POST /api/auth/signup
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupBody>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty()
        || body.username.trim().is_empty()
        || body.password.is_empty()
    {
        return Err(AppError::BadRequest(
            "Missing required fields".to_string(),
        ));
    }

    let service = AuthService::new(
        UserRepository::new(state.pool()),
        OtpRepository::new(state.pool()),
        state.email(),
    );
    let user = service
        .signup(SignupRequest {
            email: body.email,
            username: body.username.trim().to_string(),
            phone: body.phone.filter(|p| !p.trim().is_empty()),
            password: body.password,
            password_confirm: body.password_confirm,
        })
        .await?;

    let session = state
        .tokens()
        .issue(&user)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        AppendHeaders([(SET_COOKIE, session.cookie)]),
        Json(json!({ "user": user, "message": "Signup successful" })),
    ))
}

/// Password login.
///
/// POST /api/auth/login
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password required".to_string(),
        ));
    }

    let service = AuthService::new(
        UserRepository::new(state.pool()),
        OtpRepository::new(state.pool()),
        state.email(),
    );
    let user = service.login(&body.email, &body.password).await?;

    let session = state
        .tokens()
        .issue(&user)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        AppendHeaders([(SET_COOKIE, session.cookie)]),
        Json(json!({ "user": user, "message": "Login successful" })),
    ))
}

/// Report the current session identity.
///
/// GET /api/auth/session
///
/// Always responds 200: an invalid or missing token is `{"user": null}`,
/// never an error, so pages can render logged-out.
#[instrument(skip(ctx))]
pub async fn session(ctx: SessionContext) -> Json<serde_json::Value> {
    Json(json!({ "user": ctx.user }))
}

/// Clear the session cookie.
///
/// POST /api/auth/logout
///
/// Idempotent: logging out without an active session is not an error.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, state.tokens().logout_cookie())]),
        Json(json!({ "message": "Logged out successfully" })),
    )
}
