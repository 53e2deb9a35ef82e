//! Signup, login and token check handlers.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{ApiJson, AppError, Result, add_breadcrumb, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::MessageResponse;
use crate::models::user::{
    AuthResponse, LoginRequest, ResendOtpRequest, SignupRequest, User, VerifyOtpRequest,
};
use crate::services::auth::AuthService;
use crate::state::AppState;

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(state.pool(), state.email(), state.config().otp_ttl)
}

fn session_for(state: &AppState, user: User) -> Result<AuthResponse> {
    let token = state.tokens().issue(&user)?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(AuthResponse::new(user, token))
}

/// `POST /api/auth/signup-request-otp`
#[instrument(skip(state, request))]
pub async fn signup_request_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state).request_signup(request).await?;

    Ok(Json(MessageResponse::new(
        "OTP sent to your email. Please verify to complete signup.",
    )))
}

/// `POST /api/auth/verify-otp`
#[instrument(skip(state, request))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (Some(email), Some(otp)) = (request.email, request.otp) else {
        return Err(AppError::BadRequest("Email and OTP are required".to_string()));
    };

    let user = auth_service(&state).verify_signup(&email, &otp).await?;
    add_breadcrumb("auth", "Signup verified", None);

    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

/// `POST /api/auth/resend-otp`
#[instrument(skip(state, request))]
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResendOtpRequest>,
) -> Result<Json<MessageResponse>> {
    let email = request
        .email
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;

    auth_service(&state).resend_code(&email).await?;

    Ok(Json(MessageResponse::new("New OTP sent to your email.")))
}

/// `POST /api/auth/login`
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let user = auth_service(&state).login(&email, &password).await?;
    tracing::info!(user_id = %user.id, "Login succeeded");

    Ok(Json(session_for(&state, user)?))
}

/// `GET /api/protected`
pub async fn protected(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<MessageResponse>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(MessageResponse::new(format!(
        "Welcome {}!",
        user.username
    ))))
}
