use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;

use crate::config::Config;
use crate::consts::SDP_CONTENT_TYPE;
use crate::credential::Credential;
use crate::error::NegotiationError;

/// The provider's offer/answer endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NegotiationEndpoint: Send + Sync {
    /// Sends the SDP offer and returns the SDP answer.
    async fn exchange(&self, credential: &Credential, offer: &str) -> Result<String, NegotiationError>;
}

/// `POST {base_url}/realtime?model=...` with the raw SDP as body.
pub struct HttpNegotiationEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpNegotiationEndpoint {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.negotiation_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NegotiationEndpoint for HttpNegotiationEndpoint {
    async fn exchange(&self, credential: &Credential, offer: &str) -> Result<String, NegotiationError> {
        tracing::debug!("posting SDP offer ({} bytes) to {}", offer.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential.token().expose_secret())
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NegotiationError::Status {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!("received SDP answer ({} bytes)", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OFFER: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=-\r\n";
    const ANSWER: &str = "v=0\r\no=- 1 1 IN IP4 10.0.0.1\r\ns=-\r\n";

    fn endpoint_for(server: &MockServer) -> HttpNegotiationEndpoint {
        let config = Config::builder()
            .with_base_url(&format!("{}/v1", server.uri()))
            .with_model("gpt-4o-realtime-preview")
            .build();
        HttpNegotiationEndpoint::new(&config)
    }

    #[tokio::test]
    async fn posts_offer_with_ephemeral_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/realtime"))
            .and(query_param("model", "gpt-4o-realtime-preview"))
            .and(header("authorization", "Bearer ek_test_123"))
            .and(header("content-type", "application/sdp"))
            .and(body_string(OFFER))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("content-type", "application/sdp")
                    .set_body_string(ANSWER),
            )
            .expect(1)
            .mount(&server)
            .await;

        let answer = endpoint_for(&server)
            .exchange(&Credential::new("ek_test_123"), OFFER)
            .await
            .unwrap();
        assert_eq!(answer, ANSWER);
    }

    #[tokio::test]
    async fn rejected_offer_is_a_negotiation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid offer"))
            .mount(&server)
            .await;

        let err = endpoint_for(&server)
            .exchange(&Credential::new("ek_test_123"), OFFER)
            .await
            .unwrap_err();
        match err {
            NegotiationError::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid offer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
