//! Authentication route handlers.
//!
//! Email/password registration and login, profile and password changes, and
//! the emailed code flows for password reset and email verification. Login
//! state lives in the session.

use axum::extract::State;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::response::{ApiJson, ApiResponse, ApiResult};
use crate::services::{AuthService, VerificationRequest};
use crate::services::auth::Registration;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirmRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

async fn start_session(session: &Session, user: &User) -> Result<(), AppError> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/register
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<User> {
    let user = AuthService::new(state.pool())
        .register(&Registration {
            email: &body.email,
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "customer registered");
    Ok(ApiResponse::created(user).with_message("Kayıt başarılı"))
}

/// POST /api/auth/login
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<User> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    start_session(&session, &user).await?;
    Ok(ApiResponse::data(user).with_message("Giriş başarılı"))
}

/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> ApiResult<()> {
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(ApiResponse::message("Çıkış yapıldı"))
}

/// GET /api/auth/profile
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<User> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(ApiResponse::data(user))
}

/// PUT /api/auth/profile
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> ApiResult<User> {
    let user = AuthService::new(state.pool())
        .update_profile(
            user.id,
            &body.first_name,
            &body.last_name,
            body.phone.as_deref(),
        )
        .await?;
    Ok(ApiResponse::data(user).with_message("Profil güncellendi"))
}

/// PUT /api/auth/password
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    AuthService::new(state.pool())
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::message("Şifreniz güncellendi"))
}

/// POST /api/auth/password-reset
///
/// Answers the same way whether or not the account exists.
#[instrument(skip(state, body))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetRequest>,
) -> ApiResult<()> {
    AuthService::new(state.pool())
        .request_password_reset(&body.email, state.mailer())
        .await?;
    Ok(ApiResponse::message(
        "Bu e-posta adresiyle kayıtlı bir hesap varsa sıfırlama kodu gönderildi",
    ))
}

/// POST /api/auth/password-reset/confirm
#[instrument(skip(state, body))]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetConfirmRequest>,
) -> ApiResult<()> {
    AuthService::new(state.pool())
        .confirm_password_reset(&body.email, &body.code, &body.new_password)
        .await?;
    Ok(ApiResponse::message("Şifreniz sıfırlandı, giriş yapabilirsiniz"))
}

/// POST /api/auth/verify-email
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn request_email_verification(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<()> {
    let outcome = AuthService::new(state.pool())
        .request_email_verification(user.id, state.mailer())
        .await?;
    let message = match outcome {
        VerificationRequest::CodeSent => "E-posta doğrulama kodu gönderildi",
        VerificationRequest::AlreadyVerified => "E-posta adresi zaten doğrulanmış",
    };
    Ok(ApiResponse::message(message))
}

/// POST /api/auth/verify-email/confirm
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn confirm_email_verification(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<VerifyEmailRequest>,
) -> ApiResult<()> {
    AuthService::new(state.pool())
        .confirm_email_verification(user.id, &body.code)
        .await?;
    Ok(ApiResponse::message("E-posta adresi başarıyla doğrulandı"))
}
