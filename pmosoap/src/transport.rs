//! HTTP transport used by [`SoapClient`](crate::SoapClient)
//!
//! The client only needs one capability: POST a fully-formed message and get
//! the response back. Anything implementing [`Transport`] can be plugged in
//! (test doubles, a shared `reqwest::Client`, a proxy-aware stack...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Opaque error returned by a transport, surfaced unchanged by the client
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound HTTP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Builds a POST request
    pub fn post(
        url: impl Into<String>,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method: "POST",
            url: url.into(),
            headers,
            body,
        }
    }

    /// Value of the first header with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw HTTP response; the status code is not interpreted by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Sends a request and returns the response or a transport error
///
/// Implementations must be safe for concurrent use: a single client may
/// issue several calls at once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses an existing client (connection pool, proxy settings...)
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Per-request timeout, covering the whole exchange
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.body(request.body).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        // the body is read whole, which returns the connection to the pool
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_request() {
        let request = HttpRequest::post(
            "http://localhost/svc",
            vec![("Content-Type", "text/xml".to_string())],
            b"<a/>".to_vec(),
        );

        assert_eq!(request.method, "POST");
        assert_eq!(request.header("content-type"), Some("text/xml"));
        assert_eq!(request.header("SOAPAction"), None);
    }
}
