//! SOAP envelope structures and serialization

use std::borrow::Cow;

use quick_xml::escape::escape;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::Result;
use crate::fault::Fault;

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Reserved local name of the envelope namespace declaration
pub const SOAP_ENV_PREFIX: &str = "soapenv";

/// Uninhabited type, for envelopes without typed header or content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Void {}

impl Serialize for Void {
    fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {}
    }
}

/// Attribute of the root `Envelope` element
///
/// An attribute is identified by its local name: `xmlns:ns1` and `ns1` are
/// the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    prefix: Option<String>,
    local: String,
    value: String,
}

impl Attribute {
    /// Unprefixed attribute: `name="value"`
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: name.into(),
            value: value.into(),
        }
    }

    /// Namespace declaration: `xmlns:prefix="uri"`
    pub fn xmlns(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::prefixed("xmlns", prefix, uri)
    }

    /// Prefixed attribute: `prefix:local="value"`
    pub fn prefixed(
        prefix: impl Into<String>,
        local: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
            value: value.into(),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name as written on the wire
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }
}

/// HTTP Basic credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Transport metadata of a SOAP call
///
/// Used both per request (on the envelope) and as client defaults. An empty
/// string is the same as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub basic_auth: Option<Credentials>,
    pub bearer_token: Option<String>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub action: Option<String>,
}

impl RequestConfig {
    /// Basic credentials, when the username is set
    pub fn credentials(&self) -> Option<&Credentials> {
        self.basic_auth
            .as_ref()
            .filter(|credentials| !credentials.username.is_empty())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        non_empty(&self.bearer_token)
    }

    pub fn user_agent(&self) -> Option<&str> {
        non_empty(&self.user_agent)
    }

    pub fn content_type(&self) -> Option<&str> {
        non_empty(&self.content_type)
    }

    pub fn action(&self) -> Option<&str> {
        non_empty(&self.action)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// SOAP body: a fault, application content, or nothing
#[derive(Debug, Clone, PartialEq)]
pub enum Body<T> {
    Empty,
    Fault(Fault),
    Content(T),
}

impl<T> Body<T> {
    pub fn is_fault(&self) -> bool {
        matches!(self, Body::Fault(_))
    }

    /// Application content, if any
    pub fn content(&self) -> Option<&T> {
        match self {
            Body::Content(content) => Some(content),
            _ => None,
        }
    }

    /// Turns the body into a result, a fault becoming the error
    pub fn into_result(self) -> std::result::Result<Option<T>, Fault> {
        match self {
            Body::Empty => Ok(None),
            Body::Fault(fault) => Err(fault),
            Body::Content(content) => Ok(Some(content)),
        }
    }
}

/// Outbound SOAP envelope
///
/// `B` is the body content, `H` the type of the header elements. Both are
/// opaque to the envelope and rendered with `quick_xml::se`.
///
/// # Example
///
/// ```
/// use pmosoap::{Attribute, Envelope};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct GetWeather {
///     city: String,
/// }
///
/// let envelope: Envelope<GetWeather> = Envelope::new(
///     "/weather",
///     GetWeather { city: "Paris".into() },
///     Vec::new(),
/// )
/// .action("urn:weather#GetWeather")
/// .attribute(Attribute::xmlns("ns1", "urn:weather"));
///
/// let xml = String::from_utf8(envelope.serialize().unwrap()).unwrap();
/// assert!(xml.contains("<GetWeather><city>Paris</city></GetWeather>"));
/// assert!(!xml.contains("Header"));
/// ```
#[derive(Debug, Clone)]
pub struct Envelope<B, H = Void> {
    path: String,
    attributes: Vec<Attribute>,
    header: Option<Vec<H>>,
    body: Body<B>,
    config: RequestConfig,
}

impl<B, H> Envelope<B, H> {
    /// Creates an envelope whose body carries `content`
    ///
    /// The header is only attached when `header` is not empty.
    pub fn new(path: impl Into<String>, content: B, header: Vec<H>) -> Self {
        Self::with_body(path, Body::Content(content), header)
    }

    /// Creates an envelope whose body is a fault
    pub fn fault(path: impl Into<String>, fault: Fault) -> Self {
        Self::with_body(path, Body::Fault(fault), Vec::new())
    }

    fn with_body(path: impl Into<String>, body: Body<B>, header: Vec<H>) -> Self {
        Self {
            path: path.into(),
            attributes: vec![Attribute::xmlns(SOAP_ENV_PREFIX, SOAP_ENV_NS)],
            header: (!header.is_empty()).then_some(header),
            body,
            config: RequestConfig::default(),
        }
    }

    // ============= Options =============

    /// HTTP Basic authentication
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.basic_auth = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// OAuth bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.content_type = Some(content_type.into());
        self
    }

    /// Value of the `SOAPAction` header
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.config.action = Some(action.into());
        self
    }

    /// Replaces the whole transport configuration
    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds or replaces a root attribute
    ///
    /// An attribute with the same local name is replaced in place; this is how
    /// the default `soapenv` declaration is overridden. The `soapenv` key always
    /// stays a namespace declaration, since the envelope elements use that
    /// prefix.
    pub fn attribute(mut self, mut attribute: Attribute) -> Self {
        if attribute.local == SOAP_ENV_PREFIX {
            attribute.prefix = Some("xmlns".to_string());
        }
        match self
            .attributes
            .iter()
            .position(|existing| existing.local == attribute.local)
        {
            Some(index) => self.attributes[index] = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    pub fn attributes(self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        attributes
            .into_iter()
            .fold(self, |envelope, attribute| envelope.attribute(attribute))
    }

    // ============= Accessors =============

    /// Path appended to the client base address
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn header(&self) -> Option<&[H]> {
        self.header.as_deref()
    }

    pub fn body(&self) -> &Body<B> {
        &self.body
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.config
    }
}

impl<B: Serialize, H: Serialize> Envelope<B, H> {
    /// Serializes the envelope to XML
    ///
    /// Only fails when the content or a header element cannot be rendered by
    /// the XML encoder.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = String::new();

        out.push('<');
        out.push_str(SOAP_ENV_PREFIX);
        out.push_str(":Envelope");
        for attribute in &self.attributes {
            out.push(' ');
            out.push_str(&attribute.qualified_name());
            out.push_str("=\"");
            out.push_str(&escape(attribute.value.as_str()));
            out.push('"');
        }
        out.push('>');

        if let Some(header) = &self.header {
            out.push_str("<soapenv:Header>");
            for element in header {
                quick_xml::se::to_writer(&mut out, element)?;
            }
            out.push_str("</soapenv:Header>");
        }

        out.push_str("<soapenv:Body>");
        match &self.body {
            Body::Empty => {}
            Body::Fault(fault) => fault.write_xml(&mut out, SOAP_ENV_PREFIX),
            Body::Content(content) => {
                quick_xml::se::to_writer(&mut out, content)?;
            }
        }
        out.push_str("</soapenv:Body></soapenv:Envelope>");

        debug!(path = %self.path, bytes = out.len(), "SOAP envelope serialized");

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    #[derive(Serialize)]
    #[serde(rename = "Ping")]
    struct Ping {
        id: u32,
    }

    #[derive(Serialize)]
    #[serde(rename = "Session")]
    struct Session {
        token: String,
    }

    struct Unrenderable;

    impl Serialize for Unrenderable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("unsupported value shape"))
        }
    }

    fn render<B: Serialize, H: Serialize>(envelope: &Envelope<B, H>) -> String {
        String::from_utf8(envelope.serialize().unwrap()).unwrap()
    }

    #[test]
    fn test_serialize_without_header() {
        let envelope: Envelope<Ping> = Envelope::new("/ping", Ping { id: 7 }, Vec::new());

        assert_eq!(
            render(&envelope),
            "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
             <soapenv:Body><Ping><id>7</id></Ping></soapenv:Body></soapenv:Envelope>"
        );
        assert!(envelope.header().is_none());
    }

    #[test]
    fn test_serialize_with_header() {
        let envelope = Envelope::new(
            "/ping",
            Ping { id: 1 },
            vec![
                Session { token: "a".into() },
                Session { token: "b".into() },
            ],
        );

        let xml = render(&envelope);
        assert!(xml.contains(
            "<soapenv:Header><Session><token>a</token></Session>\
             <Session><token>b</token></Session></soapenv:Header>"
        ));
        assert!(xml.find("<soapenv:Header>").unwrap() < xml.find("<soapenv:Body>").unwrap());
    }

    #[test]
    fn test_soapenv_attribute_override() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new())
            .attribute(Attribute::xmlns("ns1", "urn:one"))
            .attribute(Attribute::xmlns("soapenv", "X"));

        let attributes = envelope.root_attributes();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].local_name(), "soapenv");
        assert_eq!(attributes[0].value(), "X");

        let xml = render(&envelope);
        assert!(xml.starts_with("<soapenv:Envelope xmlns:soapenv=\"X\" xmlns:ns1=\"urn:one\">"));
        assert!(!xml.contains(SOAP_ENV_NS));
    }

    #[test]
    fn test_attributes_last_write_wins() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new());
        let envelope = envelope.attributes([
            Attribute::xmlns("ns2", "urn:first"),
            Attribute::prefixed("soapenv", "encodingStyle", "urn:enc"),
            Attribute::xmlns("ns2", "urn:second"),
        ]);

        let names: Vec<_> = envelope
            .root_attributes()
            .iter()
            .map(|a| a.qualified_name().into_owned())
            .collect();
        assert_eq!(names, ["xmlns:soapenv", "xmlns:ns2", "soapenv:encodingStyle"]);
        assert_eq!(envelope.root_attributes()[1].value(), "urn:second");
    }

    #[test]
    fn test_soapenv_key_stays_a_namespace_declaration() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new())
            .attribute(Attribute::new("soapenv", "X"));

        assert_eq!(envelope.root_attributes().len(), 1);
        assert_eq!(envelope.root_attributes()[0].qualified_name(), "xmlns:soapenv");

        let xml = render(&envelope);
        assert!(xml.starts_with("<soapenv:Envelope xmlns:soapenv=\"X\">"));
    }

    #[test]
    fn test_attribute_value_is_escaped() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new())
            .attribute(Attribute::new("note", "a \"quoted\" <value>"));

        let xml = render(&envelope);
        assert!(xml.contains("note=\"a &quot;quoted&quot; &lt;value&gt;\""));
    }

    #[test]
    fn test_options_are_applied_in_order() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new())
            .user_agent("first")
            .basic_auth("user", "secret")
            .bearer_token("token")
            .content_type("application/soap+xml")
            .action("urn:ping")
            .user_agent("second");

        let config = envelope.request_config();
        assert_eq!(config.user_agent(), Some("second"));
        assert_eq!(config.credentials().unwrap().password, "secret");
        assert_eq!(config.bearer_token(), Some("token"));
        assert_eq!(config.content_type(), Some("application/soap+xml"));
        assert_eq!(config.action(), Some("urn:ping"));
    }

    #[test]
    fn test_empty_option_counts_as_unset() {
        let envelope: Envelope<Ping> = Envelope::new("/", Ping { id: 1 }, Vec::new())
            .user_agent("")
            .basic_auth("", "secret");

        assert_eq!(envelope.request_config().user_agent(), None);
        assert!(envelope.request_config().credentials().is_none());
    }

    #[test]
    fn test_serialize_fault_body() {
        let envelope: Envelope<Void> =
            Envelope::fault("/", Fault::new("soapenv:Server", "boom").with_actor("svc"));

        let xml = render(&envelope);
        assert!(xml.contains(
            "<soapenv:Body><soapenv:Fault><faultcode>soapenv:Server</faultcode>\
             <faultstring>boom</faultstring><faultactor>svc</faultactor>\
             </soapenv:Fault></soapenv:Body>"
        ));
        assert!(envelope.body().is_fault());
    }

    #[test]
    fn test_serialize_error_is_reported() {
        let envelope: Envelope<Unrenderable> = Envelope::new("/", Unrenderable, Vec::new());

        let err = envelope.serialize().unwrap_err();
        assert!(matches!(err, crate::SoapError::Serialize(_)));
    }
}
