//! Shared application state.
//!
//! Everything here is read-only after construction; requests never observe
//! each other's in-flight state.

use std::sync::Arc;

use tensorgate_auth::{GitHubClient, OAuthConfig, SessionCodec, Signer};

use crate::config::GatewayConfig;
use crate::cors::CorsPolicy;

/// Read-only state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<GatewayConfig>,
    sessions: SessionCodec,
    cors: CorsPolicy,
    oauth: Option<Arc<GitHubClient>>,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let mut signer = Signer::new(config.session_secret.as_bytes());
        if let Some(len) = config.session_tag_length {
            signer = signer.with_tag_length(len);
        }

        let http = reqwest::Client::new();
        let oauth = match (&config.github_client_id, &config.github_client_secret) {
            (Some(id), Some(secret)) => Some(Arc::new(GitHubClient::new(
                OAuthConfig::github(id.clone(), secret.clone()),
                http.clone(),
            ))),
            _ => None,
        };

        let cors = CorsPolicy::new(&config.parent_domain, &config.default_origin);

        Self {
            sessions: SessionCodec::new(signer),
            cors,
            oauth,
            http,
            config: Arc::new(config),
        }
    }

    /// Replace the OAuth client. Used by tests to target a stand-in provider.
    pub fn with_oauth(mut self, client: GitHubClient) -> Self {
        self.oauth = Some(Arc::new(client));
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn oauth(&self) -> Option<&GitHubClient> {
        self.oauth.as_deref()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
