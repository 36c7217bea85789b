//! Error types for SOAP envelopes and calls

use crate::fault::Fault;
use crate::transport::TransportError;

/// Result type alias for SOAP operations
pub type Result<T> = std::result::Result<T, SoapError>;

/// Errors that can occur while building, sending or decoding a SOAP envelope
#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    /// Malformed markup
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Text content could not be decoded
    #[error("XML encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// The document is not valid UTF-8
    #[error("Invalid UTF-8 in SOAP document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The body element could not be decoded into the requested type
    #[error("XML deserialization error: {0}")]
    Deserialize(#[from] quick_xml::de::DeError),

    /// The payload could not be rendered by the XML encoder
    #[error("XML serialization error: {0}")]
    Serialize(#[from] quick_xml::se::SeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document root is not a SOAP envelope
    #[error("Missing SOAP Envelope (root element is <{0}>)")]
    MissingEnvelope(String),

    /// The envelope has no body
    #[error("Missing SOAP Body")]
    MissingBody,

    /// More than one element inside the body
    #[error(
        "Found multiple elements inside SOAP body; not wrapped-document/literal WS-I compliant"
    )]
    MultipleBodyElements,

    /// The document ended inside the named element
    #[error("Unexpected end of document inside <{0}>")]
    UnexpectedEof(&'static str),

    /// The remote side answered with a SOAP fault
    #[error(transparent)]
    Fault(#[from] Fault),

    /// The transport failed to complete the exchange
    #[error("HTTP transport error: {0}")]
    Transport(#[source] TransportError),

    /// The call was cancelled before the response arrived
    #[error("SOAP call cancelled")]
    Cancelled,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parsing failed
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SoapError {
    /// Create a configuration error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the fault if the remote side answered with one
    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            SoapError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Consumes the error and returns the fault, if any
    pub fn into_fault(self) -> Option<Fault> {
        match self {
            SoapError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// True when the exchange succeeded but the remote side reported a fault
    pub fn is_fault(&self) -> bool {
        matches!(self, SoapError::Fault(_))
    }
}
