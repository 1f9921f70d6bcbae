//! Client for payment service providers' read-only credential checks.
//! The adapter normalizes each provider's introspection endpoint into a
//! `VerificationOutcome`; it never stores or logs the credential itself.
//!
//! Transport timeouts and the single bounded retry on transient network
//! errors are handled by the underlying http client; a provider verdict
//! (any http status) is final and never retried.

mod error;
pub mod mock;
mod types;

pub use self::error::*;
pub use self::types::*;

use failure::Fail;
use futures::{future, Future};
use hyper::header::{Authorization, Bearer};
use hyper::{Headers, Method, StatusCode};
use serde_json;

use config;
use http::client::{Error as HttpError, HttpClient, Response};
use models::{PspCredential, PspProvider};

pub trait PspVerifier: Send + Sync + 'static {
    /// Confirms the supplied credential is live and scoped correctly;
    /// pure with respect to (provider, credential)
    fn verify(&self, provider: PspProvider, credential: PspCredential) -> Box<Future<Item = VerificationOutcome, Error = Error> + Send>;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub stripe_url: String,
    pub paypal_url: String,
}

impl From<config::Psp> for Config {
    fn from(config: config::Psp) -> Self {
        let config::Psp { stripe_url, paypal_url } = config;
        Config { stripe_url, paypal_url }
    }
}

#[derive(Clone)]
pub struct HttpPspVerifier<C: HttpClient + Clone> {
    client: C,
    config: Config,
}

impl<C: HttpClient + Clone + Send> HttpPspVerifier<C> {
    pub fn new(client: C, config: Config) -> Self {
        Self { client, config }
    }

    fn check_url(&self, provider: PspProvider) -> String {
        match provider {
            PspProvider::Stripe => format!("{}/v1/account", self.config.stripe_url),
            PspProvider::Paypal => format!("{}/v1/identity/oauth2/userinfo", self.config.paypal_url),
        }
    }

    fn interpret(provider: PspProvider, response: Response) -> Result<VerificationOutcome, Error> {
        match response.status {
            status if status.is_success() => {
                let scopes = serde_json::from_str::<ProviderCheckResponse>(&response.body)
                    .map(|parsed| parsed.scopes)
                    .unwrap_or_default();
                let scopes = if scopes.is_empty() { default_scopes(provider) } else { scopes };
                Ok(VerificationOutcome::valid(scopes))
            }
            StatusCode::Unauthorized | StatusCode::Forbidden => {
                let reason = extract_reason(&response.body)
                    .unwrap_or_else(|| format!("{} rejected the credential", provider));
                Ok(VerificationOutcome::invalid(reason))
            }
            status => Err(ErrorKind::MalformedResponse
                .context(format!("Unexpected {} introspection status {}", provider, status))
                .into()),
        }
    }
}

impl<C: HttpClient + Clone> PspVerifier for HttpPspVerifier<C> {
    fn verify(&self, provider: PspProvider, credential: PspCredential) -> Box<Future<Item = VerificationOutcome, Error = Error> + Send> {
        let url = self.check_url(provider);
        debug!("Verifying {} credential against {}", provider, url);

        let mut headers = Headers::new();
        headers.set(Authorization(Bearer {
            token: credential.expose().to_string(),
        }));

        let fut = self
            .client
            .request(Method::Get, url, None, Some(headers))
            .map_err(|e| -> Error {
                match e {
                    HttpError::Timeout(_) => e.context(ErrorKind::Timeout).into(),
                    _ => e.context(ErrorKind::Network).into(),
                }
            })
            .and_then(move |response| future::result(Self::interpret(provider, response)));

        Box::new(fut)
    }
}

/// Best effort extraction of a human readable rejection reason from a
/// provider error body
fn extract_reason(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.pointer("/error_description"))
            .or_else(|| value.pointer("/message"))
            .and_then(|reason| reason.as_str().map(|s| s.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_stripe_style_reason() {
        let body = r#"{"error": {"message": "Invalid API Key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(extract_reason(body), Some("Invalid API Key provided".to_string()));
    }

    #[test]
    fn extracts_oauth_style_reason() {
        let body = r#"{"error": "invalid_token", "error_description": "Access Token not found"}"#;
        assert_eq!(extract_reason(body), Some("Access Token not found".to_string()));
    }

    #[test]
    fn missing_reason_yields_none() {
        assert_eq!(extract_reason("not even json"), None);
        assert_eq!(extract_reason("{}"), None);
    }
}
