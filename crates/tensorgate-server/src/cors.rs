//! Cross-origin policy.
//!
//! Cookies are sent cross-origin, so responses must name the request's own
//! origin — never a wildcard — and allow credentials. The policy is applied
//! to every response, error responses included, and short-circuits CORS
//! preflight requests.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Methods advertised on every response.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Request headers advertised on every response.
pub const ALLOWED_HEADERS: &str = "Content-Type, X-API-Key, Authorization";

/// Decides the allowed origin for a request.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    apex_origin: String,
    domain_suffix: String,
    default_origin: String,
}

impl CorsPolicy {
    pub fn new(parent_domain: &str, default_origin: &str) -> Self {
        Self {
            apex_origin: format!("https://{parent_domain}"),
            domain_suffix: format!(".{parent_domain}"),
            default_origin: default_origin.to_string(),
        }
    }

    /// Resolve the `Access-Control-Allow-Origin` value for a request origin.
    ///
    /// Echoes the request's own origin when it is the parent domain, any
    /// subdomain of it, or a local-development loopback origin on any port;
    /// otherwise substitutes the fixed default origin.
    pub fn resolve(&self, origin: Option<&str>) -> String {
        let Some(origin) = origin else {
            return self.default_origin.clone();
        };

        let trusted = origin == self.apex_origin
            || origin.ends_with(&self.domain_suffix)
            || origin.starts_with("http://localhost:")
            || origin.starts_with("http://127.0.0.1:");

        if trusted {
            origin.to_string()
        } else {
            self.default_origin.clone()
        }
    }

    /// Overlay the CORS header set onto a response, replacing any headers of
    /// the same name already present.
    pub fn apply(&self, headers: &mut HeaderMap, request_origin: Option<&str>) {
        let allow_origin = self.resolve(request_origin);
        let allow_origin = HeaderValue::from_str(&allow_origin)
            .or_else(|_| HeaderValue::from_str(&self.default_origin))
            .unwrap_or_else(|_| HeaderValue::from_static("https://localhost"));

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}

/// Middleware attaching CORS headers to every response.
///
/// `OPTIONS` requests short-circuit to an empty 204 carrying only the CORS
/// header set.
pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        state.cors().apply(response.headers_mut(), origin.as_deref());
        return response;
    }

    let mut response = next.run(request).await;
    state.cors().apply(response.headers_mut(), origin.as_deref());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new("saiden.dev", "https://tensors.saiden.dev")
    }

    #[test]
    fn test_subdomain_origin_echoed() {
        assert_eq!(
            policy().resolve(Some("https://sub.saiden.dev")),
            "https://sub.saiden.dev"
        );
    }

    #[test]
    fn test_apex_origin_echoed() {
        assert_eq!(
            policy().resolve(Some("https://saiden.dev")),
            "https://saiden.dev"
        );
    }

    #[test]
    fn test_loopback_origins_echoed_on_any_port() {
        assert_eq!(
            policy().resolve(Some("http://localhost:5173")),
            "http://localhost:5173"
        );
        assert_eq!(
            policy().resolve(Some("http://127.0.0.1:8080")),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_untrusted_origin_gets_default_never_wildcard() {
        let resolved = policy().resolve(Some("https://evil.example"));
        assert_eq!(resolved, "https://tensors.saiden.dev");
        assert_ne!(resolved, "*");
    }

    #[test]
    fn test_lookalike_domain_gets_default() {
        assert_eq!(
            policy().resolve(Some("https://evilsaiden.dev")),
            "https://tensors.saiden.dev"
        );
    }

    #[test]
    fn test_missing_origin_gets_default() {
        assert_eq!(policy().resolve(None), "https://tensors.saiden.dev");
    }

    #[test]
    fn test_apply_sets_full_header_set() {
        let mut headers = HeaderMap::new();
        // Pre-existing value must be replaced, not appended to.
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://stale.example"),
        );

        policy().apply(&mut headers, Some("https://sub.saiden.dev"));

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://sub.saiden.dev"
        );
        assert_eq!(
            headers
                .get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .iter()
                .count(),
            1
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            ALLOWED_HEADERS
        );
        assert_eq!(
            headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }
}
