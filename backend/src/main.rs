use dotenvy::dotenv;
use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnResponse};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use std::sync::Arc;

mod config;
mod error;
mod handlers {
    pub mod subscribe_handlers;
}
mod api {
    pub mod brevo;
    pub mod google_sheets;
    pub mod openrouter;
}

use config::Config;
use handlers::subscribe_handlers::{self, WaitlistServices, WaitlistSteps};

pub struct AppState<S = WaitlistServices> {
    pub steps: S,
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn app<S: WaitlistSteps + 'static>(state: Arc<AppState<S>>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    Router::new()
        .route("/health", get(health_check))
        .route("/subscribe", post(subscribe_handlers::subscribe::<S>))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local dev runs straight off the example file when no .env exists.
    if dotenv().is_err() {
        dotenvy::from_filename(".env.example").ok();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let _guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((dsn, sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        }))
    });

    let state = Arc::new(AppState {
        steps: WaitlistServices::from_config(&config, reqwest::Client::new()),
    });
    let router = app(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    tracing::info!("{} waitlist API listening on {}", config.app_name, config.bind_address);
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use handlers::subscribe_handlers::fake::FakeSteps;
    use tower::ServiceExt;

    fn test_app(steps: FakeSteps) -> (Router, Arc<AppState<FakeSteps>>) {
        let state = Arc::new(AppState { steps });
        (app(state.clone(), &["http://localhost:5173".to_string()]), state)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn subscribe_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/subscribe")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _) = test_app(FakeSteps::default());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn subscribe_runs_pipeline() {
        let (router, state) = test_app(FakeSteps::default());
        let response = router
            .oneshot(subscribe_request(json!({ "email": "ada@example.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "success", "message": "Subscribed successfully!" })
        );
        assert_eq!(state.steps.calls().len(), 4);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_without_side_effects() {
        let (router, state) = test_app(FakeSteps::default());
        let response = router
            .oneshot(subscribe_request(json!({ "email": "not-an-email" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid email address" }));
        assert!(state.steps.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_email_field_is_a_json_error() {
        let (router, state) = test_app(FakeSteps::default());
        let response = router
            .oneshot(subscribe_request(json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
        assert!(state.steps.calls().is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_a_json_error() {
        let (router, state) = test_app(FakeSteps::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/subscribe")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("ada@example.com"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["error"].is_string());
        assert!(state.steps.calls().is_empty());
    }

    #[tokio::test]
    async fn step_failure_maps_to_server_error() {
        let (router, _) = test_app(FakeSteps::failing_at("generate"));
        let response = router
            .oneshot(subscribe_request(json!({ "email": "ada@example.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": "LLM error: timeout" }));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let (router, _) = test_app(FakeSteps::default());
        let response = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/subscribe")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
