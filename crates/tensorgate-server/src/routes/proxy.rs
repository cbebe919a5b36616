//! Upstream forwarding for everything outside the auth surface.
//!
//! The target URL keeps the inbound path and query string exactly, with only
//! the host substituted. The server-held credential is injected; the
//! client's own `Authorization` and `Cookie` headers never leave the
//! gateway.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, header},
    response::Response,
};
use futures::StreamExt;

use crate::error::{Result, ServerError};
use crate::routes::auth::session_username;
use crate::state::AppState;

/// Upstream response headers never mirrored back to the client.
const SKIPPED_RESPONSE_HEADERS: [header::HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::UPGRADE,
];

/// Fallback handler: authorize (for `/api/` paths) and forward.
pub async fn forward(State(state): State<AppState>, request: Request) -> Result<Response> {
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    // API paths require a session, checked before any upstream traffic.
    if path.starts_with("/api/") {
        let Some(username) = session_username(&state, request.headers()) else {
            return Err(ServerError::Unauthorized);
        };
        tracing::debug!(username = %username, path = %path, "authorized api request");
    }

    let target = format!(
        "{}{}",
        state.config().upstream_url.trim_end_matches('/'),
        path_and_query
    );
    let method = request.method().clone();

    let mut upstream_request = state
        .http()
        .request(method.clone(), &target)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", &state.config().upstream_api_key);

    if method != Method::GET {
        let body = axum::body::to_bytes(request.into_body(), state.config().max_body_size)
            .await
            .map_err(|e| ServerError::Internal(format!("failed to read request body: {e}")))?;
        upstream_request = upstream_request.body(body);
    }

    let upstream = upstream_request
        .send()
        .await
        .map_err(|e| ServerError::BadGateway(format!("upstream request failed: {e}")))?;

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    tracing::debug!(status = %status, path = %path, "upstream response");

    let stream = upstream
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));

    // Mirror status, body, and headers; the CORS middleware overlays its own
    // header set afterwards, so its values win on any conflict.
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    for (name, value) in upstream_headers.iter() {
        if SKIPPED_RESPONSE_HEADERS.contains(name) {
            continue;
        }
        response.headers_mut().append(name.clone(), value.clone());
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gateway;
    use crate::config::GatewayConfig;
    use axum::http::{Request as HttpRequest, StatusCode};
    use mockito::Matcher;
    use tower::ServiceExt;

    fn test_config(upstream: &str) -> GatewayConfig {
        GatewayConfig::new("test-signing-secret", "test-api-key").with_upstream_url(upstream)
    }

    fn session_cookie(state: &AppState, username: &str) -> String {
        let token = state.sessions().issue(username, 3600);
        format!("tensors_session={}", urlencoding::encode(&token))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_api_without_session_is_401_and_never_reaches_upstream() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("GET", "/api/models")
            .expect(0)
            .create_async()
            .await;

        let app = Gateway::new(test_config(&server.url())).router();
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, r#"{"error":"Unauthorized"}"#);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_with_session_forwards_and_mirrors_response() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("GET", "/api/models")
            .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
            .match_header("x-api-key", "test-api-key")
            .match_header("cookie", Matcher::Missing)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let state = AppState::new(test_config(&server.url()));
        let cookie = session_cookie(&state, "alice");
        let app = Gateway::from_state(state).router();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/models?limit=5")
                    .header(header::COOKIE, cookie)
                    .header(header::AUTHORIZATION, "Bearer client-side-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"models":[]}"#);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_with_expired_session_is_401() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("GET", "/api/models")
            .expect(0)
            .create_async()
            .await;

        let state = AppState::new(test_config(&server.url()));
        // Correctly signed token whose expiry is long past.
        let signer = tensorgate_auth::Signer::new("test-signing-secret");
        let expired = format!("alice:1000000000:{}", signer.sign(b"alice:1000000000"));
        let app = Gateway::from_state(state).router();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/models")
                    .header(
                        header::COOKIE,
                        format!("tensors_session={}", urlencoding::encode(&expired)),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_body_is_forwarded() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("POST", "/api/search")
            .match_header("content-type", "application/json")
            .match_body(Matcher::JsonString(r#"{"query":"lora"}"#.into()))
            .with_status(201)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let state = AppState::new(test_config(&server.url()));
        let cookie = session_cookie(&state, "alice");
        let app = Gateway::from_state(state).router();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/api/search")
                    .header(header::COOKIE, cookie)
                    .body(Body::from(r#"{"query":"lora"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_mirrored() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/models")
            .with_status(503)
            .with_body(r#"{"error":"maintenance"}"#)
            .create_async()
            .await;

        let state = AppState::new(test_config(&server.url()));
        let cookie = session_cookie(&state, "alice");
        let app = Gateway::from_state(state).router();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/models")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(response).await, r#"{"error":"maintenance"}"#);
    }

    #[tokio::test]
    async fn test_non_api_path_forwarded_without_session() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("GET", "/public/stats")
            .with_body("ok")
            .create_async()
            .await;

        let app = Gateway::new(test_config(&server.url())).router();
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/public/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_gateway_cors_headers_override_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/public/stats")
            .with_header("access-control-allow-origin", "*")
            .with_header("x-upstream-extra", "kept")
            .with_body("ok")
            .create_async()
            .await;

        let app = Gateway::new(test_config(&server.url())).router();
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/public/stats")
                    .header(header::ORIGIN, "https://sub.saiden.dev")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Gateway's origin wins over the upstream wildcard; unrelated
        // upstream headers pass through.
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://sub.saiden.dev"
        );
        assert_eq!(response.headers().get("x-upstream-extra").unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        // Nothing listens on this port.
        let app = Gateway::new(test_config("http://127.0.0.1:1")).router();
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/public/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
