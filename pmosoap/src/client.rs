//! SOAP client for a single base address

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::debug::log_xml;
use crate::envelope::{Credentials, Envelope, RequestConfig};
use crate::error::{Result, SoapError};
use crate::parser::parse;
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Content type used when neither the request nor the client sets one
pub const DEFAULT_CONTENT_TYPE: &str = r#"text/xml; charset="utf-8""#;

/// User agent used when neither the request nor the client sets one
pub const DEFAULT_USER_AGENT: &str = concat!("pmosoap/", env!("CARGO_PKG_VERSION"));

/// Resolves the HTTP headers of an outbound call
///
/// A value set on the request wins over the client default, which wins over
/// the hardcoded fallback. Basic credentials and bearer tokens are resolved
/// independently; when both resolve, the bearer token is the one sent.
pub fn outbound_headers(
    request: &RequestConfig,
    defaults: &RequestConfig,
) -> Vec<(&'static str, String)> {
    let mut headers = Vec::with_capacity(4);

    let content_type = request
        .content_type()
        .or(defaults.content_type())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    headers.push(("Content-Type", content_type.to_string()));

    if let Some(action) = request.action().or(defaults.action()) {
        headers.push(("SOAPAction", action.to_string()));
    }

    let user_agent = request
        .user_agent()
        .or(defaults.user_agent())
        .unwrap_or(DEFAULT_USER_AGENT);
    headers.push(("User-Agent", user_agent.to_string()));

    let basic = request
        .credentials()
        .or(defaults.credentials())
        .map(basic_authorization);
    let bearer = request
        .bearer_token()
        .or(defaults.bearer_token())
        .map(|token| format!("Bearer {}", token));
    if let Some(authorization) = bearer.or(basic) {
        headers.push(("Authorization", authorization));
    }

    headers
}

fn basic_authorization(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", STANDARD.encode(raw))
}

/// SOAP client bound to one base address
///
/// # Example
///
/// ```no_run
/// use pmosoap::{Envelope, SoapClient};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct GetPrice {
///     item: String,
/// }
///
/// #[derive(Default, Deserialize)]
/// struct GetPriceResponse {
///     price: u32,
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), pmosoap::SoapError> {
///     let client = SoapClient::builder("http://localhost:8080")
///         .default_user_agent("shop/1.0")
///         .build()?;
///
///     let request: Envelope<GetPrice> =
///         Envelope::new("/prices", GetPrice { item: "Apples".into() }, Vec::new())
///             .action("urn:shop#GetPrice");
///
///     let mut response = GetPriceResponse::default();
///     match client.call(&request, &mut response).await {
///         Ok(()) => println!("price: {}", response.price),
///         Err(err) if err.is_fault() => println!("server refused: {}", err),
///         Err(err) => return Err(err),
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SoapClient {
    transport: Arc<dyn Transport>,
    base_address: String,
    defaults: RequestConfig,
    debug: bool,
}

impl std::fmt::Debug for SoapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapClient")
            .field("base_address", &self.base_address)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl SoapClient {
    /// Create a builder for the given base address
    pub fn builder(base_address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_address)
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    /// Client-level defaults
    pub fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    /// Sends `envelope` and decodes the response body into `response`
    ///
    /// A SOAP fault is returned as [`SoapError::Fault`]; `response` is then
    /// left untouched, as it is for an empty response body.
    pub async fn call<B, H, T>(&self, envelope: &Envelope<B, H>, response: &mut T) -> Result<()>
    where
        B: Serialize,
        H: Serialize,
        T: DeserializeOwned,
    {
        self.call_with_cancel(&CancellationToken::new(), envelope, response)
            .await
    }

    /// Same as [`call`](Self::call), aborting the network wait when `cancel` fires
    pub async fn call_with_cancel<B, H, T>(
        &self,
        cancel: &CancellationToken,
        envelope: &Envelope<B, H>,
        response: &mut T,
    ) -> Result<()>
    where
        B: Serialize,
        H: Serialize,
        T: DeserializeOwned,
    {
        let body = envelope.serialize()?;
        if self.debug {
            log_xml("Request:", &body);
        }

        let url = format!("{}{}", self.base_address, envelope.path());
        let headers = outbound_headers(envelope.request_config(), &self.defaults);
        debug!(url = %url, bytes = body.len(), "Sending SOAP request");

        let request = HttpRequest::post(url, headers, body);
        let reply = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(path = %envelope.path(), "SOAP call cancelled");
                return Err(SoapError::Cancelled);
            }
            reply = self.transport.send(request) => reply.map_err(SoapError::Transport)?,
        };

        debug!(status = reply.status, bytes = reply.body.len(), "SOAP response received");
        if reply.body.is_empty() {
            return Ok(());
        }

        if self.debug {
            log_xml("Response:", &reply.body);
        }

        parse(&reply.body, response)
    }
}

/// Builder for [`SoapClient`]
pub struct ClientBuilder {
    base_address: String,
    transport: Option<Arc<dyn Transport>>,
    defaults: RequestConfig,
    debug: bool,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into(),
            transport: None,
            defaults: RequestConfig::default(),
            debug: false,
            timeout: None,
        }
    }

    /// Builder pre-filled from a configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::new(config.base_address.clone());

        if let Some(username) = &config.username {
            builder = builder.default_basic_auth(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }
        builder.defaults.bearer_token = config.bearer_token.clone();
        builder.defaults.user_agent = config.user_agent.clone();
        builder.defaults.content_type = config.content_type.clone();
        builder.defaults.action = config.action.clone();
        builder.debug = config.debug;
        builder.timeout = config.timeout_secs.map(Duration::from_secs);

        builder
    }

    /// Use a custom transport instead of the default `reqwest` one
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Log request and response documents
    pub fn debug_mode(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Timeout of the default transport (ignored with a custom transport)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn default_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.defaults.basic_auth = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn default_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.defaults.bearer_token = Some(token.into());
        self
    }

    pub fn default_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.defaults.user_agent = Some(user_agent.into());
        self
    }

    pub fn default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.defaults.content_type = Some(content_type.into());
        self
    }

    pub fn default_action(mut self, action: impl Into<String>) -> Self {
        self.defaults.action = Some(action.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SoapClient> {
        if self.base_address.is_empty() {
            return Err(SoapError::config("base address is required"));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut http = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    http = http.timeout(timeout);
                }
                let http = http
                    .build()
                    .map_err(|e| SoapError::Transport(Box::new(e)))?;
                Arc::new(ReqwestTransport::with_client(http))
            }
        };

        Ok(SoapClient {
            transport,
            base_address: self.base_address,
            defaults: self.defaults,
            debug: self.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn with_user_agent(user_agent: &str) -> RequestConfig {
        RequestConfig {
            user_agent: Some(user_agent.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_agent_precedence() {
        let headers = outbound_headers(&with_user_agent("B"), &with_user_agent("A"));
        assert_eq!(header(&headers, "User-Agent"), Some("B"));

        let headers = outbound_headers(&RequestConfig::default(), &with_user_agent("A"));
        assert_eq!(header(&headers, "User-Agent"), Some("A"));

        let headers = outbound_headers(&RequestConfig::default(), &RequestConfig::default());
        assert_eq!(header(&headers, "User-Agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn test_empty_request_value_does_not_win() {
        let headers = outbound_headers(&with_user_agent(""), &with_user_agent("A"));
        assert_eq!(header(&headers, "User-Agent"), Some("A"));
    }

    #[test]
    fn test_fallback_headers() {
        let headers = outbound_headers(&RequestConfig::default(), &RequestConfig::default());

        assert_eq!(header(&headers, "Content-Type"), Some(DEFAULT_CONTENT_TYPE));
        assert_eq!(header(&headers, "SOAPAction"), None);
        assert_eq!(header(&headers, "Authorization"), None);
    }

    #[test]
    fn test_content_type_and_action_layering() {
        let defaults = RequestConfig {
            content_type: Some("application/soap+xml".into()),
            action: Some("urn:default".into()),
            ..Default::default()
        };
        let request = RequestConfig {
            action: Some("urn:request".into()),
            ..Default::default()
        };

        let headers = outbound_headers(&request, &defaults);
        assert_eq!(header(&headers, "Content-Type"), Some("application/soap+xml"));
        assert_eq!(header(&headers, "SOAPAction"), Some("urn:request"));
    }

    #[test]
    fn test_basic_auth_precedence() {
        let defaults = RequestConfig {
            basic_auth: Some(Credentials {
                username: "client".into(),
                password: "pw".into(),
            }),
            ..Default::default()
        };
        let request = RequestConfig {
            basic_auth: Some(Credentials {
                username: "Aladdin".into(),
                password: "open sesame".into(),
            }),
            ..Default::default()
        };

        let headers = outbound_headers(&request, &defaults);
        assert_eq!(
            header(&headers, "Authorization"),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );

        let headers = outbound_headers(&RequestConfig::default(), &defaults);
        assert_eq!(header(&headers, "Authorization"), Some("Basic Y2xpZW50OnB3"));
    }

    #[test]
    fn test_bearer_replaces_basic() {
        let defaults = RequestConfig {
            bearer_token: Some("client-token".into()),
            ..Default::default()
        };
        let request = RequestConfig {
            basic_auth: Some(Credentials {
                username: "user".into(),
                password: "pw".into(),
            }),
            ..Default::default()
        };

        let headers = outbound_headers(&request, &defaults);
        let authorizations: Vec<_> = headers
            .iter()
            .filter(|(k, _)| *k == "Authorization")
            .collect();
        assert_eq!(authorizations.len(), 1);
        assert_eq!(authorizations[0].1, "Bearer client-token");
    }

    #[test]
    fn test_builder_requires_base_address() {
        let err = SoapClient::builder("").build().unwrap_err();
        assert!(matches!(err, SoapError::Config(_)));
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig::from_yaml_str(
            "base_address: http://svc\nusername: u\nuser_agent: agent\ndebug: true",
        )
        .unwrap();

        let client = SoapClient::from_config(&config).unwrap();
        assert_eq!(client.base_address(), "http://svc");
        assert_eq!(client.defaults().credentials().unwrap().password, "");
        assert_eq!(client.defaults().user_agent(), Some("agent"));
        assert!(client.debug);
    }
}
