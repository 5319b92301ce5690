pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::optimizer::handlers as cv;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Access control
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/request-access", post(auth::handle_request_access))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        // Admin dashboard
        .route("/api/v1/admin/requests", get(auth::handle_list_pending))
        .route(
            "/api/v1/admin/requests/:id/approve",
            post(auth::handle_approve),
        )
        .route(
            "/api/v1/admin/requests/:id/reject",
            post(auth::handle_reject),
        )
        // CV workflow
        .route("/api/v1/cv/analyze", post(cv::handle_analyze))
        .route("/api/v1/cv/tailor", post(cv::handle_tailor))
        .route("/api/v1/cv/workspace", get(cv::handle_get_workspace))
        .route("/api/v1/cv/step", post(cv::handle_set_step))
        .route("/api/v1/cv/extract", post(cv::handle_extract))
        // Exports
        .route("/api/v1/cv/report", get(cv::handle_report))
        .route(
            "/api/v1/cv/export/markdown",
            get(cv::handle_export_markdown),
        )
        .route("/api/v1/cv/export/doc", get(cv::handle_export_doc))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AdminSeed;
    use crate::optimizer::fake::FakeGateway;

    const ADMIN_EMAIL: &str = "admin@example.com";
    const ADMIN_PASSWORD: &str = "adm1n-pass";

    async fn app_with(gateway: Arc<FakeGateway>) -> Router {
        let state = AppState::for_tests(gateway);
        state
            .access
            .seed_admin(&AdminSeed {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                name: "Admin".to_string(),
            })
            .await
            .unwrap();
        build_router(state)
    }

    async fn raw(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = raw(app, method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Request access, approve as admin, log in as the new user. Returns the user token.
    async fn onboard_user(app: &Router, email: &str) -> String {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/auth/request-access",
            None,
            Some(json!({"email": email, "name": "Nuevo Usuario"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, admin) = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let admin_token = admin["token"].as_str().unwrap().to_string();
        let request_id = admin["pendingRequests"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["email"] == email)
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, approved) = send(
            app,
            Method::POST,
            &format!("/api/v1/admin/requests/{request_id}/approve"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let password = approved["credentials"]["password"].as_str().unwrap();

        let (status, user) = login(app, email, password).await;
        assert_eq!(status, StatusCode::OK);
        user["token"].as_str().unwrap().to_string()
    }

    fn long_cv() -> String {
        "Ana Pérez. Analista de datos con experiencia en SQL, Excel y reportes comerciales. "
            .repeat(2)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let (status, body) = login(&app, ADMIN_EMAIL, "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_admin_login_returns_pending_list() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        send(
            &app,
            Method::POST,
            "/api/v1/auth/request-access",
            None,
            Some(json!({"email": "x@y.com", "name": "X"})),
        )
        .await;

        let (status, body) = login(&app, "ADMIN@EXAMPLE.COM", ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");
        assert_eq!(body["pendingRequests"].as_array().unwrap().len(), 1);
        assert_eq!(body["pendingRequests"][0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_duplicate_access_requests() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let request = json!({"email": "x@y.com", "name": "X"});
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/request-access",
            None,
            Some(request.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["message"].as_str().unwrap().contains(ADMIN_EMAIL));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/request-access",
            None,
            Some(request),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "PENDING_REQUEST_EXISTS");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/request-access",
            None,
            Some(json!({"email": ADMIN_EMAIL, "name": "Impostor"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "ACCOUNT_ALREADY_ACTIVE");
    }

    #[tokio::test]
    async fn test_role_gating() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let user_token = onboard_user(&app, "new@co.com").await;
        let (_, admin) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let admin_token = admin["token"].as_str().unwrap();

        let (status, _) = send(&app, Method::GET, "/api/v1/admin/requests", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/v1/admin/requests",
            Some(&user_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/v1/cv/workspace",
            Some(admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "new@co.com");
        assert_eq!(me["user"]["role"], "user");
    }

    #[tokio::test]
    async fn test_reject_refreshes_pending_list() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        for email in ["a@co.com", "b@co.com"] {
            send(
                &app,
                Method::POST,
                "/api/v1/auth/request-access",
                None,
                Some(json!({"email": email, "name": "N"})),
            )
            .await;
        }
        let (_, admin) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let token = admin["token"].as_str().unwrap();
        let first_id = admin["pendingRequests"][0]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/admin/requests/{first_id}/reject"),
            Some(token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let remaining = body["requests"].as_array().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["email"], "b@co.com");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/admin/requests/missing/approve",
            Some(token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_short_cv_is_blocked_before_gateway() {
        let gateway = Arc::new(FakeGateway::default());
        let app = app_with(gateway.clone()).await;
        let token = onboard_user(&app, "new@co.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": "x".repeat(99)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("mínimo 100"));
        assert!(message.contains("faltan 1"));
        assert_eq!(gateway.analyze_calls(), 0);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": "x".repeat(100)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gateway.analyze_calls(), 1);
    }

    #[tokio::test]
    async fn test_full_user_flow_and_logout() {
        let gateway = Arc::new(FakeGateway::default());
        let app = app_with(gateway.clone()).await;
        let token = onboard_user(&app, "new@co.com").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/tailor",
            Some(&token),
            Some(json!({"jobDescription": "Analista BI"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, ws) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": long_cv()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ws["step"], "results");
        assert_eq!(ws["processing"], false);
        assert_eq!(ws["analysis"]["overallScore"], 62.0);
        assert!(ws["optimization"]["markdownCV"].is_string());

        let (status, ws) = send(
            &app,
            Method::POST,
            "/api/v1/cv/tailor",
            Some(&token),
            Some(json!({"jobDescription": "Analista BI con Power BI"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ws["step"], "tailoring");
        assert_eq!(ws["tailored"]["matchScore"], 85.0);
        assert_eq!(ws["jobDescription"], "Analista BI con Power BI");

        let response = raw(
            &app,
            Method::GET,
            "/api/v1/cv/export/markdown?variant=tailored",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv_personalizado.md\""
        );

        let response = raw(&app, Method::GET, "/api/v1/cv/export/doc", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/msword"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let doc = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(doc.contains("size: 8.5in 11.0in"));
        assert!(doc.contains("<h1>Ana Pérez</h1>"));

        let response = raw(&app, Method::GET, "/api/v1/cv/report", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/v1/cv/workspace",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Logging back in starts from an empty workspace.
        let (_, admin) = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert!(admin["pendingRequests"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_returns_to_input() {
        let gateway = Arc::new(FakeGateway::default().failing_optimize());
        let app = app_with(gateway.clone()).await;
        let token = onboard_user(&app, "new@co.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": long_cv()})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "GATEWAY_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Error al procesar el CV"));

        let (_, ws) = send(
            &app,
            Method::GET,
            "/api/v1/cv/workspace",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(ws["step"], "input");
        assert!(ws["analysis"].is_null());
        assert_eq!(ws["processing"], false);
        assert_eq!(ws["cvText"], long_cv());
    }

    #[tokio::test]
    async fn test_export_without_results_is_not_found() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let token = onboard_user(&app, "new@co.com").await;
        let (status, _) = send(
            &app,
            Method::GET,
            "/api/v1/cv/export/markdown",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/step",
            Some(&token),
            Some(json!({"step": "results"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_extract_plain_text_upload() {
        let app = app_with(Arc::new(FakeGateway::default())).await;
        let token = onboard_user(&app, "new@co.com").await;

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.txt\"\r\n\
Content-Type: text/plain\r\n\r\nAna Pérez\n\n\nAnalista\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/cv/extract")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["text"], "Ana Pérez\n\nAnalista");
        assert_eq!(value["characters"], 19);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_analyze_request_still_settles_workspace() {
        let gateway = Arc::new(FakeGateway::default().with_delay(Duration::from_secs(5)));
        let app = app_with(gateway.clone()).await;
        let token = onboard_user(&app, "new@co.com").await;

        let request_app = app.clone();
        let request_token = token.clone();
        let in_flight = tokio::spawn(async move {
            send(
                &request_app,
                Method::POST,
                "/api/v1/cv/analyze",
                Some(&request_token),
                Some(json!({"cvText": long_cv()})),
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        in_flight.abort();
        assert!(in_flight.await.unwrap_err().is_cancelled());

        let (_, ws) = send(&app, Method::GET, "/api/v1/cv/workspace", Some(&token), None).await;
        assert_eq!(ws["processing"], true);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let (_, ws) = send(&app, Method::GET, "/api/v1/cv/workspace", Some(&token), None).await;
        assert_eq!(ws["processing"], false);
        assert_eq!(ws["step"], "results");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": long_cv()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gateway.analyze_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_tailor_request_releases_workspace() {
        let gateway = Arc::new(FakeGateway::default().with_delay(Duration::from_secs(5)));
        let app = app_with(gateway.clone()).await;
        let token = onboard_user(&app, "new@co.com").await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/analyze",
            Some(&token),
            Some(json!({"cvText": long_cv()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let request_app = app.clone();
        let request_token = token.clone();
        let in_flight = tokio::spawn(async move {
            send(
                &request_app,
                Method::POST,
                "/api/v1/cv/tailor",
                Some(&request_token),
                Some(json!({"jobDescription": "Analista BI"})),
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        in_flight.abort();
        let _ = in_flight.await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        let (_, ws) = send(&app, Method::GET, "/api/v1/cv/workspace", Some(&token), None).await;
        assert_eq!(ws["processing"], false);
        assert_eq!(ws["tailored"]["matchScore"], 85.0);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/cv/step",
            Some(&token),
            Some(json!({"step": "results"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}
