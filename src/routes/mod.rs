use std::sync::Arc;

use axum::Router;
use http::HeaderValue;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::error::{AppError, AppResult};
use crate::AppState;

pub mod ai;
pub mod appointments;
pub mod auth;
pub mod checkin;
pub mod devices;
pub mod health;
pub mod journey;
pub mod photo_memories;
pub mod positive_notifications;
pub mod psychologists;
pub mod screenings;
pub mod support;

/// Assemble the full application. `auth_routes` is passed in so the caller
/// can wrap it with the rate limiter.
pub fn build_router(state: Arc<AppState>, auth_routes: Router<Arc<AppState>>) -> Router {
    let media_dir = state.config.server.media_dir.clone();
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(health::router())
        .nest("/auth", auth_routes)
        .nest("/checkin", checkin::router())
        .nest("/journey", journey::router())
        .nest("/ai", ai::router())
        .nest("/devices", devices::router())
        .nest("/positive-notifications", positive_notifications::router())
        .nest("/appointments", appointments::router())
        .merge(psychologists::router())
        .nest("/screenings", screenings::router())
        .nest("/photo-memories", photo_memories::router())
        .nest("/api", support::router())
        .nest_service("/media", ServeDir::new(media_dir))
        .with_state(state)
        // CSP middleware: set Content-Security-Policy headers
        .layer(axum::middleware::from_fn(crate::middleware::csp::csp_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::DELETE,
        http::Method::OPTIONS,
    ];

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(methods)
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

// ============================================================================
// Input validation
// ============================================================================

pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}

pub(crate) fn check_range(field: &str, value: Option<i32>, min: i32, max: i32) -> AppResult<()> {
    match value {
        Some(v) if v < min || v > max => Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            field, min, max
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_email(email: &str) -> AppResult<()> {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("email is not a valid email address".to_string()))
    }
}

pub(crate) fn check_username(username: &str) -> AppResult<()> {
    check_len("username", username, 3, 120)
}

pub(crate) fn check_password(field: &str, password: &str) -> AppResult<()> {
    check_len(field, password, 6, 128)
}

pub(crate) fn check_profile_fields(age: Option<i32>, gender: Option<i32>) -> AppResult<()> {
    check_range("age", age, 10, 120)?;
    check_range("gender", gender, 0, 3)
}

// ============================================================================
// Test harness
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_check_accepts_plain_addresses() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("nope").is_err());
        assert!(check_email("a@b").is_err());
        assert!(check_email("@b.co").is_err());
    }

    #[test]
    fn profile_ranges() {
        assert!(check_profile_fields(Some(10), Some(0)).is_ok());
        assert!(check_profile_fields(Some(9), None).is_err());
        assert!(check_profile_fields(None, Some(4)).is_err());
        assert!(check_profile_fields(None, None).is_ok());
    }
}
