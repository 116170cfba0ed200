use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{CreateUser, PsychologistProfile, PsychologistProfileInput, User, UserRole};
use crate::db::{PsychologistRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::routes::{check_email, check_len, check_password, check_profile_fields, check_username};
use crate::services::auth::{AuthService, RESET_START_MESSAGE};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signup-psychologist", post(signup_psychologist))
        .route("/login", post(login))
        .route("/forgot-password/start", post(forgot_password_start))
        .route("/forgot-password/verify", post(forgot_password_verify))
        .route("/me", get(me).put(update_me))
        .route("/change-password", post(change_password))
        .route("/psychologist-profile", put(update_psychologist_profile))
}

const DUPLICATE_ACCOUNT: &str = "Username or email already in use";
const DUPLICATE_LICENSE: &str = "License number already in use";
const PASSWORD_UPDATED: &str = "Password updated successfully.";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: Option<i32>,
    #[serde(default = "default_gender")]
    pub gender: Option<i32>,
}

fn default_gender() -> Option<i32> {
    Some(0)
}

#[derive(Debug, Deserialize)]
pub struct PsychologistSignupRequest {
    #[serde(flatten)]
    pub account: SignupRequest,
    #[serde(flatten)]
    pub profile: PsychologistProfileInput,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: String,
    pub role: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordStartRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordVerifyRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub username: String,
    pub email: String,
    pub age: Option<i32>,
    pub gender: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub age: Option<i32>,
    pub gender: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserPublic {
    fn from_user(user: &User, with_role: bool) -> Self {
        UserPublic {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            age: user.age,
            gender: user.gender,
            role: with_role.then(|| user.role.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub age: Option<i32>,
    pub gender: Option<i32>,
    pub role: String,
    pub psychologist_profile: Option<PsychologistProfile>,
}

// ============================================================================
// Handlers
// ============================================================================

fn validate_signup(request: &SignupRequest) -> AppResult<()> {
    check_username(request.username.trim())?;
    check_email(&request.email)?;
    check_password("password", &request.password)?;
    check_profile_fields(request.age, request.gender)
}

async fn ensure_account_free(state: &AppState, username: &str, email: &str) -> AppResult<()> {
    if UserRepository::username_taken(&state.db, username, None).await?
        || UserRepository::email_taken(&state.db, email, None).await?
    {
        return Err(AppError::BadRequest(DUPLICATE_ACCOUNT.to_string()));
    }
    Ok(())
}

async fn create_account(state: &AppState, request: SignupRequest, role: UserRole) -> AppResult<User> {
    let username = request.username.trim().to_string();
    ensure_account_free(state, &username, &request.email).await?;

    let password_hash = AuthService::hash_password(&request.password)?;
    UserRepository::create(
        &state.db,
        CreateUser {
            username,
            email: request.email,
            password_hash,
            age: request.age,
            gender: request.gender,
            role,
        },
    )
    .await
}

/// Register a regular account
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> AppResult<Json<UserPublic>> {
    validate_signup(&request)?;
    let user = create_account(&state, request, UserRole::Regular).await?;

    tracing::info!("New user registered: {}", user.id);
    Ok(Json(UserPublic::from_user(&user, true)))
}

/// Register a psychologist account together with its profile
async fn signup_psychologist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PsychologistSignupRequest>,
) -> AppResult<Json<UserPublic>> {
    validate_signup(&request.account)?;

    ensure_account_free(&state, request.account.username.trim(), &request.account.email).await?;
    if let Some(license) = request.profile.license_number.as_deref() {
        if PsychologistRepository::license_taken(&state.db, license).await? {
            return Err(AppError::BadRequest(DUPLICATE_LICENSE.to_string()));
        }
    }

    let user = create_account(&state, request.account, UserRole::Psychologist).await?;
    PsychologistRepository::upsert_profile(&state.db, &user.id, request.profile).await?;

    tracing::info!("New psychologist registered: {}", user.id);
    Ok(Json(UserPublic::from_user(&user, true)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = UserRepository::find_by_username(&state.db, request.username.trim())
        .await?
        .filter(|u| AuthService::verify_password(&request.password, &u.password_hash));

    let Some(user) = user else {
        tracing::debug!("Failed login for {}", request.username);
        return Err(AppError::InvalidCredentials);
    };

    let access_token = AuthService::create_jwt(&state.config.jwt, &user.id, Some(&user.username))?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user_id: user.id.clone(),
        role: user.role.clone(),
        username: user.username.clone(),
    }))
}

async fn forgot_password_start(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordStartRequest>,
) -> AppResult<Json<serde_json::Value>> {
    check_email(&request.email)?;
    AuthService::start_password_reset(
        &state.db,
        state.mailer.as_ref(),
        &request.email,
        state.config.password_reset.ttl_minutes,
        Utc::now().naive_utc(),
    )
    .await?;

    Ok(Json(serde_json::json!({ "ok": true, "message": RESET_START_MESSAGE })))
}

async fn forgot_password_verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordVerifyRequest>,
) -> AppResult<Json<serde_json::Value>> {
    check_email(&request.email)?;
    check_len("code", request.code.trim(), 4, 10)?;
    check_password("new_password", &request.new_password)?;

    AuthService::verify_password_reset(
        &state.db,
        &request.email,
        &request.code,
        &request.new_password,
        Utc::now().naive_utc(),
    )
    .await?;

    Ok(Json(serde_json::json!({ "ok": true, "message": PASSWORD_UPDATED })))
}

/// Get current user info
async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<MeResponse>> {
    let psychologist_profile = if user.is_psychologist() {
        PsychologistRepository::find_profile(&state.db, &user.id).await?
    } else {
        None
    };

    Ok(Json(MeResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        age: user.age,
        gender: user.gender,
        role: user.role,
        psychologist_profile,
    }))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateMeRequest>,
) -> AppResult<Json<UserPublic>> {
    let username = request.username.trim();
    check_username(username)?;
    check_email(&request.email)?;
    check_profile_fields(request.age, request.gender)?;

    if UserRepository::username_taken(&state.db, username, Some(&user.id)).await?
        || UserRepository::email_taken(&state.db, &request.email, Some(&user.id)).await?
    {
        return Err(AppError::BadRequest(DUPLICATE_ACCOUNT.to_string()));
    }

    let updated = UserRepository::update_profile(
        &state.db,
        &user.id,
        username,
        &request.email,
        request.age,
        request.gender,
    )
    .await?;

    Ok(Json(UserPublic::from_user(&updated, false)))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    check_password("current_password", &request.current_password)?;
    check_password("new_password", &request.new_password)?;

    if !AuthService::verify_password(&request.current_password, &user.password_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    let hash = AuthService::hash_password(&request.new_password)?;
    UserRepository::update_password(&state.db, &user.id, &hash).await?;

    Ok(Json(serde_json::json!({ "ok": true, "message": PASSWORD_UPDATED })))
}

/// Upsert the caller's psychologist profile. Also mounted at
/// `/psychologist-profile`.
pub async fn update_psychologist_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<PsychologistProfileInput>,
) -> AppResult<Json<serde_json::Value>> {
    require_psychologist(&user, "Only psychologists can update this profile")?;
    PsychologistRepository::upsert_profile(&state.db, &user.id, request).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ============================================================================
// Role checks
// ============================================================================

pub fn require_psychologist(user: &User, message: &str) -> AppResult<()> {
    if user.is_psychologist() {
        Ok(())
    } else {
        tracing::debug!("User {} denied: {}", user.id, message);
        Err(AppError::Forbidden(message.to_string()))
    }
}

pub fn require_regular(user: &User, message: &str) -> AppResult<()> {
    if user.role() == UserRole::Regular {
        Ok(())
    } else {
        tracing::debug!("User {} denied: {}", user.id, message);
        Err(AppError::Forbidden(message.to_string()))
    }
}

// ============================================================================
// Auth Middleware / Extractor
// ============================================================================

/// Extractor for authenticated user
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract Authorization header (Bearer token)
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::debug!("Missing or invalid Authorization header");
                AppError::Unauthorized
            })?;

        if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
            tracing::debug!("Authorization header doesn't start with 'Bearer '");
            return Err(AppError::Unauthorized);
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            tracing::debug!("Empty bearer token in Authorization header");
            return Err(AppError::Unauthorized);
        }

        let user = AuthService::get_user_from_token(&state.db, &state.config.jwt, token)
            .await
            .map_err(|e| {
                tracing::debug!("Failed to get user from token: {:?}", e);
                e
            })?;

        tracing::debug!("Authenticated user: {}", user.id);
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::models::UserRole;
    use crate::routes::testing::TestApp;
    use http::StatusCode;

    fn signup_body(username: &str) -> serde_json::Value {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
            "age": 25
        })
    }

    #[tokio::test]
    async fn signup_then_login() {
        let app = TestApp::new().await;

        let (status, body) = app.send("POST", "/auth/signup", None, Some(signup_body("alice"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "regular");
        assert_eq!(body["gender"], 0);

        let (status, _) = app.send("POST", "/auth/signup", None, Some(signup_body("alice"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": "alice", "password": "secret1"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, me) = app.send("GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
        assert!(me["psychologist_profile"].is_null());

        let (status, _) = app
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": "alice", "password": "wrong-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signup_validates_fields() {
        let app = TestApp::new().await;
        let mut body = signup_body("bob");
        body["age"] = json!(5);
        let (status, _) = app.send("POST", "/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let mut body = signup_body("bob");
        body["password"] = json!("123");
        let (status, _) = app.send("POST", "/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn psychologist_signup_rejects_duplicate_license() {
        let app = TestApp::new().await;
        let mut body = signup_body("drwho");
        body["license_number"] = json!("LIC-1");
        body["city"] = json!("Haifa");
        let (status, created) = app
            .send("POST", "/auth/signup-psychologist", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["role"], "psychologist");

        let mut body = signup_body("drno");
        body["license_number"] = json!("LIC-1");
        let (status, err) = app
            .send("POST", "/auth/signup-psychologist", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "License number already in use");
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_unauthorized() {
        let app = TestApp::new().await;
        let (status, _) = app.send("GET", "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.send("GET", "/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_me_rejects_taken_username() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;
        app.user("bob", UserRole::Regular).await;

        let (status, _) = app
            .send(
                "PUT",
                "/auth/me",
                Some(&token),
                Some(json!({"username": "bob", "email": "alice@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                "PUT",
                "/auth/me",
                Some(&token),
                Some(json!({"username": "alice2", "email": "alice@example.com", "age": 40})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice2");
        assert_eq!(body["age"], 40);
        assert!(body.get("role").is_none());
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let app = TestApp::new().await;
        let (status, _) = app.send("POST", "/auth/signup", None, Some(signup_body("carol"))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, login) = app
            .send(
                "POST",
                "/auth/login",
                None,
                Some(json!({"username": "carol", "password": "secret1"})),
            )
            .await;
        let token = login["access_token"].as_str().unwrap().to_string();

        let (status, err) = app
            .send(
                "POST",
                "/auth/change-password",
                Some(&token),
                Some(json!({"current_password": "nottheone", "new_password": "secret2"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "Current password is incorrect");

        let (status, _) = app
            .send(
                "POST",
                "/auth/change-password",
                Some(&token),
                Some(json!({"current_password": "secret1", "new_password": "secret2"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn forgot_password_always_answers_ok() {
        let app = TestApp::new().await;
        app.user("dana", UserRole::Regular).await;

        let (status, body) = app
            .send(
                "POST",
                "/auth/forgot-password/start",
                None,
                Some(json!({"email": "nobody@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert!(app.mailer.sent().is_empty());

        let (status, _) = app
            .send(
                "POST",
                "/auth/forgot-password/start",
                None,
                Some(json!({"email": "dana@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.mailer.sent().len(), 1);

        let (status, err) = app
            .send(
                "POST",
                "/auth/forgot-password/verify",
                None,
                Some(json!({"email": "nobody@example.com", "code": "123456", "new_password": "secret9"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "Invalid or expired code.");
    }

    #[tokio::test]
    async fn profile_update_is_psychologist_only() {
        let app = TestApp::new().await;
        let (_, regular) = app.user("alice", UserRole::Regular).await;
        let (_, psy) = app.user("drsmith", UserRole::Psychologist).await;
        let body = json!({"specialty": "CBT", "city": "Haifa"});

        let (status, err) = app
            .send("PUT", "/auth/psychologist-profile", Some(&regular), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(err["error"]["message"], "Only psychologists can update this profile");

        let (status, ok) = app
            .send("PUT", "/psychologist-profile", Some(&psy), Some(body))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ok["ok"], true);

        let (_, me) = app.send("GET", "/auth/me", Some(&psy), None).await;
        assert_eq!(me["psychologist_profile"]["specialty"], "CBT");
    }
}
