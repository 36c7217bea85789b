//! SOAP Faults

use std::fmt;

use quick_xml::Reader;
use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::{BytesRef, Event};

use crate::error::{Result, SoapError};

/// SOAP error (Fault) returned by the server
///
/// The display format is fixed: `Soap Fault: {code}: [{actor}] {string}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    /// Fault code, dot-qualified (e.g. "Server.Error", "soapenv:Client")
    pub code: String,

    /// Human readable message
    pub string: String,

    /// Origin of the fault
    pub actor: Option<String>,

    /// Raw XML content of the `<detail>` element
    pub detail: Option<String>,
}

impl Fault {
    /// Creates a simple SOAP fault
    pub fn new(code: impl Into<String>, string: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            actor: None,
            detail: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Adds a detail (raw XML, written as is)
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Writes the `<prefix:Fault>` element; empty fields are omitted
    pub(crate) fn write_xml(&self, out: &mut String, prefix: &str) {
        out.push('<');
        out.push_str(prefix);
        out.push_str(":Fault>");

        write_text_element(out, "faultcode", &self.code);
        write_text_element(out, "faultstring", &self.string);
        if let Some(actor) = &self.actor {
            write_text_element(out, "faultactor", actor);
        }
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("<detail>");
            out.push_str(detail);
            out.push_str("</detail>");
        }

        out.push_str("</");
        out.push_str(prefix);
        out.push_str(":Fault>");
    }

    /// Decodes a complete `Fault` element, start tag included
    ///
    /// Unknown children are skipped. `detail` is kept as raw XML since its
    /// content is service specific.
    pub(crate) fn from_xml(fragment: &str) -> Result<Self> {
        let mut reader = Reader::from_str(fragment);
        let mut fault = Fault::default();
        let mut opened = false;

        loop {
            match reader.read_event()? {
                Event::Start(_) if !opened => opened = true,
                Event::Start(e) => {
                    let end = e.to_end().into_owned();
                    match e.local_name().as_ref() {
                        b"faultcode" => fault.code = read_content(&mut reader)?,
                        b"faultstring" => fault.string = read_content(&mut reader)?,
                        b"faultactor" => fault.actor = Some(read_content(&mut reader)?),
                        b"detail" => {
                            let raw = reader.read_text(end.name())?;
                            fault.detail = Some(raw.trim().to_string());
                        }
                        _ => {
                            reader.read_to_end(end.name())?;
                        }
                    }
                }
                // <Fault/>: no field at all
                Event::Empty(_) if !opened => break,
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"faultactor" => fault.actor = Some(String::new()),
                    b"detail" => fault.detail = Some(String::new()),
                    _ => {}
                },
                // children are consumed whole, so this closes the Fault
                Event::End(_) => break,
                Event::Eof => return Err(SoapError::UnexpectedEof("Fault")),
                _ => {}
            }
        }

        Ok(fault)
    }
}

/// Text of the element just opened, up to its end tag
///
/// Text is unescaped, CDATA sections are taken verbatim.
fn read_content(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut content = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Text(e) => content.push_str(&e.xml_content()?),
            Event::CData(e) => content.push_str(&e.decode()?),
            Event::GeneralRef(e) => push_reference(&mut content, &e)?,
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(SoapError::UnexpectedEof("Fault")),
            _ => {}
        }
    }

    Ok(content.trim().to_string())
}

fn push_reference(content: &mut String, reference: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = reference.resolve_char_ref()? {
        content.push(ch);
        return Ok(());
    }

    let name = reference.decode()?;
    match resolve_predefined_entity(&name) {
        Some(value) => content.push_str(value),
        // unknown entity: kept as written
        None => {
            content.push('&');
            content.push_str(&name);
            content.push(';');
        }
    }
    Ok(())
}

fn write_text_element(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape(value));
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Soap Fault: {}: [{}] {}",
            self.code,
            self.actor.as_deref().unwrap_or_default(),
            self.string
        )
    }
}

impl std::error::Error for Fault {}
