//! Readable dump of SOAP exchanges (client debug mode)

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::info;

use crate::error::Result;

/// Re-indents an XML document (two spaces)
pub fn format_xml(data: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Logs an XML document in readable form
///
/// A document that is not well-formed is logged as is.
pub fn log_xml(label: &str, data: &[u8]) {
    let xml = format_xml(data).unwrap_or_else(|_| String::from_utf8_lossy(data).into_owned());
    info!(target: "pmosoap::wire", "{}\n{}", label, xml);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_xml_indents() {
        let xml = format_xml(b"<a><b>text</b><c/></a>").unwrap();
        assert!(xml.starts_with("<a>\n"));
        assert!(xml.contains("\n  <b>text</b>"));
        assert!(xml.ends_with("</a>"));
    }

    #[test]
    fn test_format_xml_rejects_malformed() {
        assert!(format_xml(b"<a><b></a>").is_err());
    }
}
