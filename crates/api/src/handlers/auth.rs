//! Handlers for `/auth`: registration, login, token refresh, logout and
//! the caller's own profile.

use std::sync::OnceLock;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use propdesk_core::billing::{TRIAL_DAYS, TRIAL_PLAN};
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;
use propdesk_db::models::session::CreateSession;
use propdesk_db::models::user::{CreateUser, UpdateProfile, User, UserResponse};
use propdesk_db::repositories::{SessionRepo, SubscriptionRepo, UserRepo};
use propdesk_events::types::{ENTITY_SUBSCRIPTION, SUBSCRIPTION_CHANGED};
use propdesk_events::PlatformEvent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::non_blank;
use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;
const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Defaults to `property_manager`. `admin` cannot be self-assigned.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Client details recorded on the session row.
struct ClientInfo {
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl ClientInfo {
    fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.chars().take(255).collect::<String>())
        };
        Self {
            user_agent: text(header::USER_AGENT.as_str()),
            ip_address: text("x-forwarded-for")
                .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string())),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

fn validate_email(email: &str) -> Result<String, CoreError> {
    let email = email.trim();
    if email.len() > 254 || !email_regex().is_match(email) {
        return Err(CoreError::Validation("Invalid email address".into()));
    }
    Ok(email.to_lowercase())
}

fn required_name(field: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() || value.len() > 100 {
        return Err(CoreError::Validation(format!(
            "{field} is required and must be at most 100 characters"
        )));
    }
    Ok(value.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
///
/// Self-service sign-up. Property managers start a 14-day trial.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = validate_email(&input.email)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(CoreError::Validation)?;

    let role = match input.role.as_deref() {
        Some(name) => Role::parse(name)?,
        None => Role::PropertyManager,
    };
    if !role.is_self_service() {
        return Err(CoreError::Forbidden(format!(
            "Role '{}' cannot be self-assigned",
            role.as_str()
        ))
        .into());
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            password_hash,
            first_name: required_name("first_name", &input.first_name)?,
            last_name: required_name("last_name", &input.last_name)?,
            phone: non_blank(input.phone),
            role: role.as_str().to_string(),
        },
    )
    .await?;
    tracing::info!(user_id = user.id, role = role.as_str(), "User registered");

    if role == Role::PropertyManager {
        let ends = Utc::now() + chrono::Duration::days(TRIAL_DAYS);
        if let Some(sub) =
            SubscriptionRepo::create_trial(&state.pool, user.id, TRIAL_PLAN.as_str(), ends).await?
        {
            tracing::info!(user_id = user.id, plan = %sub.plan, "Trial started");
            state.event_bus.publish(
                PlatformEvent::new(SUBSCRIPTION_CHANGED)
                    .with_source(ENTITY_SUBSCRIPTION, sub.id)
                    .with_actor(user.id)
                    .with_payload(json!({ "plan": sub.plan, "status": sub.status })),
            );
        }
    }

    let response = issue_tokens(&state, &user, None, ClientInfo::from_headers(&headers)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_email(&state.pool, input.email.trim())
        .await?
        .ok_or_else(|| CoreError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !user.is_active {
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )
            .into());
        }
    }

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()).into());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");

    let response = issue_tokens(&state, &user, None, ClientInfo::from_headers(&headers)).await?;
    Ok(Json(response))
}

/// POST /api/auth/refresh
///
/// Exchanges a refresh token for a new pair. The old token stops working.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || CoreError::Unauthorized("Invalid or expired refresh token".into());

    let token_hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .filter(|s| s.is_live(Utc::now()))
        .ok_or_else(invalid)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| CoreError::Unauthorized("User no longer exists".into()))?;
    if !user.is_active {
        SessionRepo::revoke(&state.pool, session.id).await?;
        return Err(CoreError::Forbidden("Account is deactivated".into()).into());
    }

    let response = issue_tokens(
        &state,
        &user,
        Some(session.id),
        ClientInfo::from_headers(&headers),
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/auth/logout
///
/// Revokes every session of the caller.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    tracing::info!(user_id = user.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let row = load_user(&state, &user).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&row),
    }))
}

/// PUT /api/auth/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<UpdateProfile>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let input = UpdateProfile {
        first_name: input
            .first_name
            .map(|v| required_name("first_name", &v))
            .transpose()?,
        last_name: input
            .last_name
            .map(|v| required_name("last_name", &v))
            .transpose()?,
        phone: input.phone.map(|v| v.trim().to_string()),
    };
    let row = UserRepo::update_profile(&state.pool, user.user_id, &input)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        })?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&row),
    }))
}

/// POST /api/auth/change-password
///
/// Signs the user out everywhere on success.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let row = load_user(&state, &user).await?;

    let valid = verify_password(&input.current_password, &row.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        return Err(CoreError::Unauthorized("Current password is incorrect".into()).into());
    }
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(CoreError::Validation)?;

    let hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.user_id, &hash).await?;
    SessionRepo::revoke_all_for_user(&state.pool, user.user_id).await?;
    tracing::info!(user_id = user.user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "User",
                id: user.user_id,
            }
            .into()
        })
}

/// Mint an access token and a refresh session. With `rotate_from`, the old
/// session is revoked in the same transaction; losing that race is a 401.
async fn issue_tokens(
    state: &AppState,
    user: &User,
    rotate_from: Option<i64>,
    client: ClientInfo,
) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;
    let access_token = generate_access_token(user.id, &user.role, jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    let session =
        CreateSession::lasting(user.id, refresh_hash, Utc::now(), jwt.refresh_token_expiry_days)
            .issued_to(client.user_agent, client.ip_address);

    match rotate_from {
        Some(old_id) => {
            SessionRepo::rotate(&state.pool, old_id, &session)
                .await?
                .ok_or_else(|| {
                    CoreError::Unauthorized("Invalid or expired refresh token".into())
                })?;
        }
        None => {
            SessionRepo::create(&state.pool, &session).await?;
        }
    }

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: jwt.access_token_expiry_secs(),
        user: UserResponse::from(user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalised() {
        assert_eq!(validate_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.io").is_err());
    }

    #[test]
    fn client_info_reads_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.2, 10.0.0.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "curl/8".parse().unwrap());
        let info = ClientInfo::from_headers(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("198.51.100.2"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8"));
    }
}
