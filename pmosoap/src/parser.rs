//! SOAP response decoding
//!
//! The body is walked by a small automaton ([`ScanState`]) fed with the XML
//! reader events: a document/literal "wrapped" body holds exactly one element,
//! either a `Fault` or the application content.

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::envelope::{Body, SOAP_ENV_NS};
use crate::error::{Result, SoapError};
use crate::fault::Fault;

/// Decoded SOAP response
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    /// Raw XML content of the header, not interpreted
    pub header: Option<String>,

    /// Response body
    pub body: Body<T>,
}

impl<T> Response<T> {
    fn empty() -> Self {
        Self {
            header: None,
            body: Body::Empty,
        }
    }
}

/// Parses a SOAP response and fills `destination` with the body content
///
/// * an empty body (zero bytes or `<Body/>`) is not an error and leaves
///   `destination` untouched;
/// * a `Fault` is returned as [`SoapError::Fault`], `destination` is not
///   touched;
/// * `destination` is only written once the whole envelope has been decoded.
pub fn parse<T: DeserializeOwned>(data: &[u8], destination: &mut T) -> Result<()> {
    match decode_response::<T>(data)?.body {
        Body::Empty => Ok(()),
        Body::Fault(fault) => Err(SoapError::Fault(fault)),
        Body::Content(content) => {
            *destination = content;
            Ok(())
        }
    }
}

/// Decodes a SOAP response without turning a fault into an error
pub fn decode_response<T: DeserializeOwned>(data: &[u8]) -> Result<Response<T>> {
    if data.is_empty() {
        debug!("Empty SOAP response, nothing to decode");
        return Ok(Response::empty());
    }

    let text = std::str::from_utf8(data)?;
    // the reader skips the BOM; fragments are sliced from `text` by position
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);

    open_envelope(&mut reader)?;

    let mut header = None;
    let mut body = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let end = e.to_end().into_owned();
                match e.local_name().as_ref() {
                    b"Header" if header.is_none() => {
                        let span = reader.read_to_end(end.name())?;
                        let inner = &text[span.start as usize..span.end as usize];
                        header = Some(inner.trim().to_string());
                    }
                    b"Body" if body.is_none() => {
                        body = Some(scan_body(&mut reader, text)?);
                    }
                    _ => {
                        reader.read_to_end(end.name())?;
                    }
                }
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"Header" if header.is_none() => header = Some(String::new()),
                b"Body" if body.is_none() => body = Some(Body::Empty),
                _ => {}
            },
            // end of the Envelope: children were consumed whole
            Event::End(_) => break,
            Event::Eof => return Err(SoapError::UnexpectedEof("Envelope")),
            _ => {}
        }
    }

    let body = body.ok_or(SoapError::MissingBody)?;
    if let Body::Fault(fault) = &body {
        debug!(code = %fault.code, actor = ?fault.actor, "SOAP fault in response body");
    }

    Ok(Response { header, body })
}

/// Moves the reader past the Envelope start tag
fn open_envelope(reader: &mut NsReader<&[u8]>) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Envelope" => return Ok(()),
            Event::Empty(e) if e.local_name().as_ref() == b"Envelope" => {
                return Err(SoapError::MissingBody);
            }
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return Err(SoapError::MissingEnvelope(name));
            }
            Event::Eof => return Err(SoapError::UnexpectedEof("Envelope")),
            _ => {}
        }
    }
}

/// States of the body scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    OneConsumed,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEvent {
    /// A direct child of the body starts
    ElementStart,
    /// The body closes
    ElementEnd,
    EndOfInput,
}

impl ScanState {
    fn next(self, event: BodyEvent) -> Result<Self> {
        match (self, event) {
            (ScanState::Done, _) => Ok(ScanState::Done),
            (_, BodyEvent::EndOfInput) => Err(SoapError::UnexpectedEof("Body")),
            (ScanState::Scanning, BodyEvent::ElementStart) => Ok(ScanState::OneConsumed),
            (ScanState::OneConsumed, BodyEvent::ElementStart) => {
                Err(SoapError::MultipleBodyElements)
            }
            (_, BodyEvent::ElementEnd) => Ok(ScanState::Done),
        }
    }
}

/// Walks the body; the reader sits right after `<Body>`
fn scan_body<T: DeserializeOwned>(
    reader: &mut NsReader<&[u8]>,
    text: &str,
) -> Result<Body<T>> {
    let mut state = ScanState::Scanning;
    let mut body = Body::Empty;

    while state != ScanState::Done {
        let start = reader.buffer_position() as usize;
        let (ns, event) = reader.read_resolved_event()?;
        let in_soap_ns = matches!(
            ns,
            ResolveResult::Bound(Namespace(uri)) if uri == SOAP_ENV_NS.as_bytes()
        );

        match event {
            Event::Start(e) => {
                state = state.next(BodyEvent::ElementStart)?;
                let end = e.to_end().into_owned();
                reader.read_to_end(end.name())?;
                let fragment = &text[start..reader.buffer_position() as usize];
                let is_fault = in_soap_ns && e.local_name().as_ref() == b"Fault";
                body = decode_child(fragment, is_fault)?;
            }
            Event::Empty(e) => {
                state = state.next(BodyEvent::ElementStart)?;
                let fragment = &text[start..reader.buffer_position() as usize];
                let is_fault = in_soap_ns && e.local_name().as_ref() == b"Fault";
                body = decode_child(fragment, is_fault)?;
            }
            Event::End(_) => state = state.next(BodyEvent::ElementEnd)?,
            Event::Eof => state = state.next(BodyEvent::EndOfInput)?,
            // text, comments, CDATA, PI: ignored
            _ => {}
        }
    }

    Ok(body)
}

fn decode_child<T: DeserializeOwned>(fragment: &str, is_fault: bool) -> Result<Body<T>> {
    let fragment = fragment.trim_start();
    if is_fault {
        Ok(Body::Fault(Fault::from_xml(fragment)?))
    } else {
        Ok(Body::Content(quick_xml::de::from_str(fragment)?))
    }
}
