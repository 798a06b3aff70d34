pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers;
use crate::divider::handlers::handle_divide;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume divider
        .route("/api/v1/divide", post(handle_divide))
        // Accounts
        .route("/api/v1/auth/register", post(handlers::handle_register))
        .route("/api/v1/auth/login", post(handlers::handle_login))
        .route("/api/v1/auth/logout", post(handlers::handle_logout))
        .route(
            "/api/v1/auth/password",
            post(handlers::handle_change_password),
        )
        .route("/api/v1/dashboard", get(handlers::handle_dashboard))
        .route("/api/v1/profile", get(handlers::handle_profile))
        .route("/api/v1/users", get(handlers::handle_list_users))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::password::CredentialManager;
    use crate::auth::registry::{NewAccount, UserRegistry};
    use crate::auth::session::InMemorySessionStore;
    use crate::auth::store::InMemoryUserStore;
    use crate::auth::INVALID_CREDENTIALS_MESSAGE;
    use crate::config::Config;

    async fn app_with_demo() -> (Router, AppState) {
        let registry = UserRegistry::new(
            Arc::new(InMemoryUserStore::new()),
            CredentialManager::default(),
        );
        registry
            .register(NewAccount {
                username: "demo".to_string(),
                email: "demo@example.com".to_string(),
                password: "demo123".to_string(),
                first_name: "Demo".to_string(),
                last_name: "User".to_string(),
            })
            .await
            .unwrap();
        let state = AppState {
            registry,
            sessions: Arc::new(InMemorySessionStore::new()),
            config: Config::default(),
        };
        (build_router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router, identifier: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "username_or_email": identifier, "password": password })),
        )
        .await
    }

    fn registration(username: &str, email: &str) -> Value {
        json!({
            "first_name": "grace",
            "last_name": "hopper",
            "username": username,
            "email": email,
            "password": "cobol1959",
            "password_confirm": "cobol1959"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with_demo().await;
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_divide_endpoint_accepts_numbers_and_text() {
        let (app, _) = app_with_demo().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/divide",
            None,
            Some(json!({ "resumes": 10, "reviewers": "3" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["base_count"], 3);
        assert_eq!(body["remainder"], 1);
        assert_eq!(
            body["message"],
            "Each person should review at least 3 resumes. 1 person(s) should review one more resume."
        );
    }

    #[tokio::test]
    async fn test_divide_endpoint_errors() {
        let (app, _) = app_with_demo().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/divide",
            None,
            Some(json!({ "resumes": 10, "reviewers": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Number of people reviewing cannot be zero!");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/divide",
            None,
            Some(json!({ "resumes": "ten", "reviewers": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Please enter valid integer values!");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/divide",
            None,
            Some(json!({ "resumes": -4, "reviewers": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_is_case_insensitive_and_records_login() {
        let (app, state) = app_with_demo().await;
        let (status, body) = login(&app, "DEMO", "demo123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome back, Demo!");
        assert_eq!(body["user"]["username"], "demo");
        assert!(body["user"].get("password_hash").is_none());

        let stored = state
            .registry
            .store()
            .find_by_username("demo")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (app, _) = app_with_demo().await;
        let wrong_password = login(&app, "demo", "wrong-password").await;
        let unknown_user = login(&app, "nonexistent", "anything").await;
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            wrong_password.1["error"]["message"],
            INVALID_CREDENTIALS_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_login_validation() {
        let (app, _) = app_with_demo().await;
        let (status, body) = login(&app, "de", "123").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["fields"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deactivated_account_gets_own_message() {
        let (app, state) = app_with_demo().await;
        let store = state.registry.store();
        let mut user = store.find_by_username("demo").await.unwrap().unwrap();
        user.is_active = false;
        store.save(&user).await.unwrap();

        let (status, body) = login(&app, "demo", "demo123").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "ACCOUNT_DEACTIVATED");
    }

    #[tokio::test]
    async fn test_register_dashboard_logout_flow() {
        let (app, _) = app_with_demo().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("Grace", "Grace@Navy.mil")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Registration successful! Welcome, Grace!");
        assert_eq!(body["user"]["email"], "grace@navy.mil");
        assert!(!body["user"]["last_login"].is_null());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, "GET", "/api/v1/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "grace");

        let (status, body) = send(&app, "GET", "/api/v1/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_name"], "Grace Hopper");

        let (status, body) = send(&app, "GET", "/api/v1/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, body) = send(&app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "You have been logged out successfully. Goodbye, Grace!"
        );

        let (status, _) = send(&app, "GET", "/api/v1/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let (app, _) = app_with_demo().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("DEMO", "fresh@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_USERNAME");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("fresh", "demo@EXAMPLE.com")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");
    }

    #[tokio::test]
    async fn test_signed_in_user_cannot_login_again() {
        let (app, _) = app_with_demo().await;
        let (_, body) = login(&app, "demo", "demo123").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            Some(&token),
            Some(json!({ "username_or_email": "demo", "password": "demo123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ALREADY_AUTHENTICATED");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let (app, _) = app_with_demo().await;
        for uri in ["/api/v1/dashboard", "/api/v1/profile", "/api/v1/users"] {
            let (status, _) = send(&app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            let (status, _) = send(&app, "GET", uri, Some("bogus"), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_change_password() {
        let (app, _) = app_with_demo().await;
        let (_, body) = login(&app, "demo", "demo123").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/password",
            Some(&token),
            Some(json!({
                "current_password": "not-demo",
                "new_password": "better-secret",
                "confirm_password": "better-secret"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/password",
            Some(&token),
            Some(json!({
                "current_password": "demo123",
                "new_password": "better-secret",
                "confirm_password": "better-secret"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = login(&app, "demo", "better-secret").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_divide_null_or_missing_count_uses_envelope() {
        let (app, _) = app_with_demo().await;
        for body in [
            json!({ "resumes": 10, "reviewers": null }),
            json!({ "resumes": 10 }),
            json!({ "resumes": false, "reviewers": 2 }),
        ] {
            let (status, body) = send(&app, "POST", "/api/v1/divide", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
            assert_eq!(body["error"]["message"], "Please enter valid integer values!");
        }
    }

    #[tokio::test]
    async fn test_register_missing_confirmation_is_validation_error() {
        let (app, _) = app_with_demo().await;
        let mut form = registration("grace", "grace@example.com");
        form.as_object_mut().unwrap().remove("password_confirm");
        form["email"] = Value::Null;

        let (status, body) = send(&app, "POST", "/api/v1/auth/register", None, Some(form)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let fields = body["error"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], "email");
        assert_eq!(fields[0]["message"], "Email is required.");
        assert_eq!(fields[1]["field"], "password_confirm");
        assert_eq!(fields[1]["message"], "Please confirm your password.");
    }

    #[tokio::test]
    async fn test_unparseable_body_uses_envelope() {
        let (app, _) = app_with_demo().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username_or_email\": "))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "MALFORMED_BODY");
    }
}
