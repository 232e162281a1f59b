//! Short-lived credentials for one real-time session.
//!
//! Two sources are provided. [`UpstreamCredentialProvider`] holds the API
//! secret and mints ephemeral keys directly from the provider; it is what the
//! token service runs. [`TokenEndpointClient`] is the client-side counterpart
//! that asks the token service instead, so the secret never leaves the server.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::error::CredentialError;
use crate::types::credential::{SessionCreated, SessionRequest};

/// An ephemeral bearer token, valid for a single negotiation.
#[derive(Debug)]
pub struct Credential {
    token: SecretString,
    expires_at: Option<i64>,
}

impl Credential {
    pub fn new(token: &str) -> Self {
        Self {
            token: SecretString::from(token.to_string()),
            expires_at: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }
}

impl From<SessionCreated> for Credential {
    fn from(created: SessionCreated) -> Self {
        let (value, expires_at) = created.into_client_secret().into_parts();
        Self {
            token: SecretString::from(value),
            expires_at,
        }
    }
}

/// Anything that can hand out a fresh credential. One call, one attempt.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn issue(&self) -> Result<Credential, CredentialError>;
}

fn parse_session(body: serde_json::Value) -> Result<Credential, CredentialError> {
    serde_json::from_value::<SessionCreated>(body)
        .map(Credential::from)
        .map_err(|e| CredentialError::UpstreamUnavailable(format!("malformed session body: {e}")))
}

/// Calls the provider's session-creation endpoint with the held secret.
pub struct UpstreamCredentialProvider {
    client: reqwest::Client,
    sessions_url: String,
    api_key: SecretString,
    request: SessionRequest,
}

impl UpstreamCredentialProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            sessions_url: config.sessions_url(),
            api_key: SecretString::from(config.api_key().expose_secret().to_string()),
            request: SessionRequest::new(config.model(), config.voice().clone()),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Creates an upstream session and returns its body untouched.
    pub async fn create_session(&self) -> Result<serde_json::Value, CredentialError> {
        tracing::debug!(
            model = self.request.model(),
            voice = %self.request.voice(),
            "requesting realtime session"
        );
        let response = self
            .client
            .post(&self.sessions_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "session creation rejected");
            return Err(CredentialError::UpstreamUnavailable(format!(
                "session endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CredentialError::UpstreamUnavailable(format!("malformed session body: {e}")))
    }
}

#[async_trait]
impl CredentialSource for UpstreamCredentialProvider {
    async fn issue(&self) -> Result<Credential, CredentialError> {
        let body = self.create_session().await?;
        parse_session(body)
    }
}

/// Fetches a credential from the local token service (`GET <token_url>`).
pub struct TokenEndpointClient {
    client: reqwest::Client,
    token_url: String,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

impl TokenEndpointClient {
    pub fn new(token_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: token_url.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.token_url())
    }
}

#[async_trait]
impl CredentialSource for TokenEndpointClient {
    async fn issue(&self) -> Result<Credential, CredentialError> {
        let response = self.client.get(&self.token_url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(CredentialError::UpstreamUnavailable(format!(
                "token service returned {}: {}",
                status.as_u16(),
                reason
            )));
        }

        let body = serde_json::from_str::<serde_json::Value>(&text)
            .map_err(|e| CredentialError::UpstreamUnavailable(format!("malformed token body: {e}")))?;
        parse_session(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body() -> serde_json::Value {
        json!({
            "id": "sess_001",
            "object": "realtime.session",
            "model": "gpt-4o-realtime-preview",
            "client_secret": {"value": "ek_test_123", "expires_at": 1734626400}
        })
    }

    fn config_for(server: &MockServer) -> Config {
        Config::builder()
            .with_base_url(&format!("{}/v1", server.uri()))
            .with_api_key("sk-server-secret")
            .build()
    }

    #[tokio::test]
    async fn upstream_provider_mints_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/realtime/sessions"))
            .and(header("authorization", "Bearer sk-server-secret"))
            .and(body_json(json!({"model": "gpt-4o-realtime-preview", "voice": "verse"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = UpstreamCredentialProvider::new(&config_for(&server));
        let credential = provider.issue().await.unwrap();

        assert_eq!(credential.token().expose_secret(), "ek_test_123");
        assert_eq!(credential.expires_at(), Some(1734626400));
    }

    #[tokio::test]
    async fn upstream_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/realtime/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = UpstreamCredentialProvider::new(&config_for(&server));
        let err = provider.issue().await.unwrap_err();

        match err {
            CredentialError::UpstreamUnavailable(reason) => {
                assert!(reason.contains("401"));
                assert!(!reason.contains("sk-server-secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_body_without_secret_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "sess_001"})))
            .mount(&server)
            .await;

        let provider = UpstreamCredentialProvider::new(&config_for(&server));
        assert!(matches!(
            provider.issue().await,
            Err(CredentialError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn create_session_relays_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let provider = UpstreamCredentialProvider::new(&config_for(&server));
        assert_eq!(provider.create_session().await.unwrap(), session_body());
    }

    #[tokio::test]
    async fn token_endpoint_client_reads_service_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/openai/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = TokenEndpointClient::new(&format!("{}/api/openai/token", server.uri()));
        let credential = client.issue().await.unwrap();
        assert_eq!(credential.token().expose_secret(), "ek_test_123");
    }

    #[tokio::test]
    async fn token_endpoint_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "upstream unavailable"})),
            )
            .mount(&server)
            .await;

        let client = TokenEndpointClient::new(&format!("{}/api/openai/token", server.uri()));
        match client.issue().await {
            Err(CredentialError::UpstreamUnavailable(reason)) => {
                assert!(reason.contains("500"));
                assert!(reason.contains("upstream unavailable"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
