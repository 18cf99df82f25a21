//! Parser des réponses SOAP
//!
//! The response envelope is split into the raw inner XML of its `Header` and
//! `Body`. The body is then checked for a fault and, failing that, handed to
//! serde through `quick_xml::de`.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::fault::check_fault;
use super::{SoapBody, SoapEnvelope, SoapHeader};
use crate::error::SoapError;

/// Erreur de parsing SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("response is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Parse une enveloppe SOAP complète
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut in_envelope = false;
    let mut header = None;
    let mut body = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                match (in_envelope, local.as_ref()) {
                    (false, b"Envelope") => in_envelope = true,
                    (false, _) => return Err(SoapParseError::MissingEnvelope),
                    (true, name) => {
                        let span = reader.read_to_end(e.name())?;
                        let contents = xml[span.start as usize..span.end as usize].to_vec();
                        match name {
                            b"Header" => header = Some(SoapHeader { contents }),
                            b"Body" => body = Some(SoapBody { contents }),
                            _ => {}
                        }
                    }
                }
            }
            Event::Empty(e) => {
                let local = e.local_name();
                match (in_envelope, local.as_ref()) {
                    (false, b"Envelope") => return Err(SoapParseError::MissingBody),
                    (false, _) => return Err(SoapParseError::MissingEnvelope),
                    (true, b"Header") => header = Some(SoapHeader::default()),
                    (true, b"Body") => body = Some(SoapBody::default()),
                    (true, _) => {}
                }
            }
            // Children are consumed whole, so the only End we see closes the Envelope.
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    if !in_envelope {
        return Err(SoapParseError::MissingEnvelope);
    }

    let body = body.ok_or(SoapParseError::MissingBody)?;
    trace!(
        header_len = header.as_ref().map_or(0, |h: &SoapHeader| h.contents.len()),
        body_len = body.contents.len(),
        "Parsed SOAP envelope"
    );

    Ok(SoapEnvelope { header, body })
}

/// Désérialise le contenu du Body dans `T`, après la détection des faults.
///
/// The unmarshaller is never reached when the body carries a fault.
pub fn unmarshal_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, SoapError> {
    check_fault(body)?;
    deserialize_body(body)
}

pub(crate) fn deserialize_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, SoapError> {
    let xml = std::str::from_utf8(body).map_err(SoapParseError::from)?;
    Ok(quick_xml::de::from_str(xml.trim())?)
}

/// Parse une réponse complète puis désérialise son Body dans `T`.
pub fn unmarshal_response<T: DeserializeOwned>(response: &[u8]) -> Result<T, SoapError> {
    let envelope = parse_soap_envelope(response)?;
    unmarshal_body(&envelope.body.contents)
}
