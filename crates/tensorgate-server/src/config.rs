//! Gateway configuration.
//!
//! Built once at startup (from the environment in production, from the
//! builder methods in tests) and shared read-only for the life of the
//! process. No ambient singletons.

use std::net::SocketAddr;

use tensorgate_auth::Allowlist;
use url::Url;

use crate::error::{Result, ServerError};

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400 * 7;

/// Default maximum request body size forwarded upstream (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "tensors_session";

/// Gateway configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// The gateway's own externally visible origin; used to build the OAuth
    /// callback redirect URI.
    pub public_url: String,

    /// Base URL of the backend API all non-auth traffic is forwarded to.
    pub upstream_url: String,

    /// Credential attached to every forwarded request. Never sent to clients.
    pub upstream_api_key: String,

    /// Secret for signing session tokens. Never leaves the process.
    pub session_secret: String,

    /// GitHub OAuth app credentials. Absence is a recoverable configuration
    /// error at login time, not a startup failure.
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,

    /// Usernames permitted to hold a session. Empty permits everyone.
    pub allowed_users: Allowlist,

    /// Parent domain shared by the gateway and the frontend; scopes the
    /// session cookie and the CORS suffix match.
    pub parent_domain: String,

    /// Origin substituted when a request's own origin is not trusted.
    pub default_origin: String,

    /// Session cookie name.
    pub cookie_name: String,

    /// Session token lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Truncated signature length in hex chars, for tokens minted by the
    /// legacy deployment. `None` means full-length tags.
    pub session_tag_length: Option<usize>,

    /// Maximum request body size forwarded upstream.
    pub max_body_size: usize,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind_address", &self.bind_address)
            .field("public_url", &self.public_url)
            .field("upstream_url", &self.upstream_url)
            .field("upstream_api_key", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .field("github_client_id", &self.github_client_id)
            .field("github_client_secret", &"<redacted>")
            .field("parent_domain", &self.parent_domain)
            .field("default_origin", &self.default_origin)
            .field("cookie_name", &self.cookie_name)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a config with the two required secrets and reference defaults
    /// for everything else.
    pub fn new(session_secret: impl Into<String>, upstream_api_key: impl Into<String>) -> Self {
        Self {
            bind_address: "127.0.0.1:8787".parse().expect("valid literal address"),
            public_url: "https://tensors.saiden.dev".to_string(),
            upstream_url: "https://tensors-api.saiden.dev".to_string(),
            upstream_api_key: upstream_api_key.into(),
            session_secret: session_secret.into(),
            github_client_id: None,
            github_client_secret: None,
            allowed_users: Allowlist::default(),
            parent_domain: "saiden.dev".to_string(),
            default_origin: "https://tensors.saiden.dev".to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_tag_length: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Load configuration from the environment.
    ///
    /// `SESSION_SECRET` and `TENSORS_API_KEY` are required; everything else
    /// has a default or is optional.
    pub fn from_env() -> Result<Self> {
        let session_secret = require_env("SESSION_SECRET")?;
        let upstream_api_key = require_env("TENSORS_API_KEY")?;

        let mut config = Self::new(session_secret, upstream_api_key);

        config.github_client_id = optional_env("GITHUB_CLIENT_ID");
        config.github_client_secret = optional_env("GITHUB_CLIENT_SECRET");
        if let Some(raw) = optional_env("GITHUB_ALLOWED_USERS") {
            config.allowed_users = Allowlist::from_csv(&raw);
        }
        if let Some(url) = optional_env("TENSORGATE_UPSTREAM_URL") {
            config.upstream_url = url;
        }
        if let Some(url) = optional_env("TENSORGATE_PUBLIC_URL") {
            config.public_url = url;
        }
        if let Some(domain) = optional_env("TENSORGATE_PARENT_DOMAIN") {
            config.parent_domain = domain;
        }
        if let Some(origin) = optional_env("TENSORGATE_DEFAULT_ORIGIN") {
            config.default_origin = origin;
        }
        if let Some(addr) = optional_env("TENSORGATE_BIND") {
            config.bind_address = addr
                .parse()
                .map_err(|_| ServerError::Config(format!("invalid TENSORGATE_BIND: {addr}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("upstream URL", &self.upstream_url),
            ("public URL", &self.public_url),
            ("default origin", &self.default_origin),
        ] {
            Url::parse(value)
                .map_err(|e| ServerError::Config(format!("invalid {name} {value}: {e}")))?;
        }
        Ok(())
    }

    /// The `Domain` attribute for the session cookie (shared parent domain).
    pub fn cookie_domain(&self) -> String {
        format!(".{}", self.parent_domain)
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the upstream API base URL.
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    /// Set the gateway's public origin.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into();
        self
    }

    /// Set the GitHub OAuth app credentials.
    pub fn with_github_app(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.github_client_id = Some(client_id.into());
        self.github_client_secret = Some(client_secret.into());
        self
    }

    /// Set the allowlist.
    pub fn with_allowed_users(mut self, allowlist: Allowlist) -> Self {
        self.allowed_users = allowlist;
        self
    }

    /// Set the shared parent domain and the default origin together.
    pub fn with_domain(
        mut self,
        parent_domain: impl Into<String>,
        default_origin: impl Into<String>,
    ) -> Self {
        self.parent_domain = parent_domain.into();
        self.default_origin = default_origin.into();
        self
    }

    /// Set the session token lifetime.
    pub fn with_session_ttl(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// Opt in to truncated session tags (legacy deployments only).
    pub fn with_session_tag_length(mut self, len: usize) -> Self {
        self.session_tag_length = Some(len);
        self
    }
}

fn require_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| ServerError::Config(format!("{name} is not set")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
