/// Authentication endpoints
///
/// - `POST /api/auth/register` - create an account and get tokens
/// - `POST /api/auth/login` - exchange credentials for tokens
/// - `POST /api/auth/refresh` - exchange a refresh token for an access token
/// - `GET /api/auth/me` - the authenticated user

use crate::{
    app::AppState,
    envelope::Envelope,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
        password,
    },
    models::user::{is_duplicate_email, CreateUser, User, UserSummary},
};
use tracing::info;
use validator::Validate;

/// Register request
///
/// `fullname` is accepted as an alias of `name` and wins if both are sent.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(max = 100, message = "Name cannot be more than 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Name cannot be more than 100 characters"))]
    pub fullname: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    pub password: String,
}

impl RegisterRequest {
    /// Trimmed display name from `fullname` or `name`
    fn display_name(&self) -> Option<String> {
        [self.fullname.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(String::from)
    }
}

/// Login request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

/// Tokens plus the user they were issued for
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub user: UserSummary,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPayload {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: UserSummary,
}

fn issue_tokens(state: &AppState, user: &User) -> ApiResult<AuthPayload> {
    let jwt_config = &state.config.jwt;

    let access = Claims::with_expiration(user.id, TokenType::Access, jwt_config.access_ttl());
    let refresh = Claims::with_expiration(user.id, TokenType::Refresh, jwt_config.refresh_ttl());

    Ok(AuthPayload {
        user: UserSummary::from(user),
        token: jwt::create_token(&access, state.jwt_secret())?,
        refresh_token: jwt::create_token(&refresh, state.jwt_secret())?,
    })
}

/// Registers a new user
///
/// # Errors
///
/// - `400`: missing fields, invalid email, weak password, email already taken
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthPayload>>)> {
    let Json(req) = payload?;

    let name = match req.display_name() {
        Some(name) if !req.email.trim().is_empty() && !req.password.is_empty() => name,
        _ => {
            return Err(ApiError::BadRequest(
                "Please provide name, email, and password".to_string(),
            ))
        }
    };

    req.validate()?;
    password::validate_password_strength(&req.password)?;

    let email = req.email.trim().to_string();
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::Duplicate(
            "User already exists with this email".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
        },
    )
    .await
    .map_err(|e| {
        if is_duplicate_email(&e) {
            ApiError::Duplicate("User already exists with this email".to_string())
        } else {
            e.into()
        }
    })?;

    info!(user_id = %user.id, "User registered");

    let tokens = issue_tokens(&state, &user)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("User registered successfully", tokens)),
    ))
}

/// Logs a user in
///
/// # Errors
///
/// - `400`: email or password missing
/// - `401`: unknown email or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<AuthPayload>>> {
    let Json(req) = payload?;

    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide email and password".to_string(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");

    let tokens = issue_tokens(&state, &user)?;
    Ok(Json(Envelope::with_message("Login successful", tokens)))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401`: token invalid, expired, not a refresh token, or its user is gone
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<TokenPayload>>> {
    let Json(req) = payload?;

    let (user_id, token) = jwt::refresh_access_token(
        &req.refresh_token,
        state.jwt_secret(),
        state.config.jwt.access_ttl(),
    )
    .map_err(|e| match e {
        jwt::JwtError::CreateError(msg) => ApiError::Internal(msg),
        _ => ApiError::Unauthorized("Invalid or expired refresh token".to_string()),
    })?;

    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    Ok(Json(Envelope::ok(TokenPayload { token })))
}

/// Returns the authenticated user
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<UserPayload>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(Envelope::ok(UserPayload {
        user: UserSummary::from(&user),
    })))
}
