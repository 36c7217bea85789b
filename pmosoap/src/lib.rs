//! # pmosoap - SOAP 1.1 envelopes for Rust
//!
//! `pmosoap` builds and decodes SOAP 1.1 envelopes in the document/literal
//! "wrapped" style, and ships a small async client to exchange them over HTTP.
//!
//! ## Features
//!
//! - **Typed payloads**: bodies and header elements are any `serde` type,
//!   rendered and decoded with `quick-xml`
//! - **Faults as errors**: a `Fault` body is returned as [`SoapError::Fault`],
//!   distinguishable from transport and decoding errors
//! - **WS-I checks**: a body holding more than one element is rejected
//! - **Layered configuration**: per-request values override client defaults,
//!   which override built-in fallbacks
//! - **Pluggable transport**: `reqwest` by default, any [`Transport`] otherwise
//!
//! ## Quick Start
//!
//! ```
//! use pmosoap::{parse, Envelope, SoapError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
//! struct Echo {
//!     message: String,
//! }
//!
//! let request: Envelope<Echo> =
//!     Envelope::new("/echo", Echo { message: "hello".into() }, Vec::new());
//! let xml = request.serialize()?;
//!
//! let mut echoed = Echo::default();
//! parse(&xml, &mut echoed)?;
//! assert_eq!(echoed.message, "hello");
//! # Ok::<(), SoapError>(())
//! ```
//!
//! ## Handling faults
//!
//! ```
//! use pmosoap::{parse, SoapError};
//!
//! let xml = br#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
//!   <s:Body><s:Fault><faultcode>Server.Error</faultcode>
//!   <faultstring>boom</faultstring><faultactor>svc</faultactor></s:Fault></s:Body>
//! </s:Envelope>"#;
//!
//! let mut out = String::new();
//! match parse(xml, &mut out) {
//!     Err(SoapError::Fault(fault)) => {
//!         assert_eq!(fault.to_string(), "Soap Fault: Server.Error: [svc] boom");
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

pub mod client;
pub mod config;
pub mod debug;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod parser;
pub mod transport;

pub use client::{
    ClientBuilder, DEFAULT_CONTENT_TYPE, DEFAULT_USER_AGENT, SoapClient, outbound_headers,
};
pub use config::ClientConfig;
pub use envelope::{
    Attribute, Body, Credentials, Envelope, RequestConfig, SOAP_ENV_NS, SOAP_ENV_PREFIX, Void,
};
pub use error::{Result, SoapError};
pub use fault::Fault;
pub use parser::{Response, decode_response, parse};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

// Re-exported for Transport implementations
pub use async_trait::async_trait;
