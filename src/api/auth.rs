use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{UserCreate, UserLogin, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    payload.validate().map_err(ApiError::Validation)?;

    let existing = repositories::users::exists_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &payload.email,
            hashed_password,
            full_name: &payload.full_name,
            role: UserRole::Teacher,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let response = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = fetch_user_by_email(&state, &payload.email).await?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user),
    }))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn fetch_user_by_email(state: &AppState, email: &str) -> Result<User, ApiError> {
    repositories::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "email": "durand@example.com",
                    "full_name": "Paul Durand",
                    "password": "teacher-pass"
                })),
            ))
            .await
            .expect("register");

        let status = response.status();
        let created = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {created}");
        assert_eq!(created["user"]["role"], "teacher");
        assert!(created["access_token"].as_str().is_some());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({
                    "email": "durand@example.com",
                    "password": "teacher-pass"
                })),
            ))
            .await
            .expect("login");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        let token = body["access_token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/auth/me",
                Some(&token),
                None,
            ))
            .await
            .expect("me");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["email"], "durand@example.com");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let ctx = test_support::setup_test_context().await;

        test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({
                    "email": "martin@example.com",
                    "password": "not-the-password"
                })),
            ))
            .await
            .expect("login");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let ctx = test_support::setup_test_context().await;

        test_support::insert_teacher(ctx.state.db(), "martin@example.com", "Prof. Martin").await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "email": "martin@example.com",
                    "full_name": "Someone Else",
                    "password": "teacher-pass"
                })),
            ))
            .await
            .expect("register");

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
