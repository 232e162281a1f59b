use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use realtime_voice::UpstreamCredentialProvider;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub const TOKEN_PATH: &str = "/api/openai/token";

#[derive(Clone)]
pub struct AppState {
    provider: Arc<UpstreamCredentialProvider>,
}

impl AppState {
    pub fn new(provider: UpstreamCredentialProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

/// Mints an ephemeral session upstream and relays the body as-is.
async fn token_handler(State(state): State<AppState>) -> Response {
    info!("token request received");
    match state.provider.create_session().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!("failed to create realtime session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    // The browser client is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(TOKEN_PATH, get(token_handler))
        .with_state(state)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_for(server: &MockServer) -> Router {
        let config = realtime_voice::Config::builder()
            .with_base_url(&format!("{}/v1", server.uri()))
            .with_api_key("sk-server")
            .build();
        router(AppState::new(UpstreamCredentialProvider::new(&config)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn token_request() -> Request<Body> {
        Request::builder().uri(TOKEN_PATH).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn relays_upstream_session_verbatim() {
        let server = MockServer::start().await;
        let upstream = json!({
            "id": "sess_001",
            "object": "realtime.session",
            "model": "gpt-4o-realtime-preview",
            "voice": "verse",
            "client_secret": {"value": "ek_abc", "expires_at": 1734626400}
        });
        Mock::given(method("POST"))
            .and(path("/v1/realtime/sessions"))
            .and(header("authorization", "Bearer sk-server"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
            .expect(1)
            .mount(&server)
            .await;

        let response = app_for(&server).oneshot(token_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, upstream);
    }

    #[tokio::test]
    async fn upstream_failure_is_a_500_with_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let response = app_for(&server).oneshot(token_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("401"), "unexpected error body: {message}");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = MockServer::start().await;
        let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let response = app_for(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
