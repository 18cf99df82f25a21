//! Détection des SOAP Faults
//!
//! Parsing XML is slow, so a body is only parsed for a fault once a cheap
//! substring scan has found the `Fault` marker.

use quick_xml::Reader;
use quick_xml::escape::{EscapeError, resolve_xml_entity};
use quick_xml::events::{BytesRef, Event};
use thiserror::Error;
use tracing::debug;

use super::parser::SoapParseError;
use crate::error::SoapError;

/// Marqueur recherché avant tout parsing (`<Fault>`, `</soap:Fault >`...)
pub const FAULT_MARKER: &[u8] = b"Fault";

/// Erreur SOAP (Fault) renvoyée par le service distant
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{code} ({description})")]
pub struct SoapFault {
    /// Code d'erreur (ex: "soap:Server")
    pub code: String,

    /// Description de l'erreur
    pub description: String,
}

impl SoapFault {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// A fault with neither code nor description counts as no fault at all.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.description.is_empty()
    }
}

pub fn has_fault_marker(data: &[u8]) -> bool {
    data.windows(FAULT_MARKER.len())
        .any(|window| window == FAULT_MARKER)
}

/// Cherche un `Fault` enfant direct du corps SOAP (`body` = inner XML du Body).
///
/// Both SOAP 1.1 (`faultcode`/`faultstring`) and SOAP 1.2
/// (`Code/Value`, `Reason/Text`) layouts are recognised, by local name.
pub fn detect_fault(body: &[u8]) -> Result<Option<SoapFault>, SoapParseError> {
    if !has_fault_marker(body) {
        return Ok(None);
    }

    let mut reader = Reader::from_reader(body);
    let mut path: Vec<String> = Vec::new();
    let mut fault = SoapFault::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());

                let target = match path.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
                    ["Fault", "faultcode"] | ["Fault", "Code", "Value"] => Some(&mut fault.code),
                    ["Fault", "faultstring"] | ["Fault", "Reason", "Text"] => {
                        Some(&mut fault.description)
                    }
                    _ => None,
                };

                if let Some(target) = target {
                    // read_text consumes the matching End event
                    let text = read_text(&mut reader)?;
                    // Premier élément gagnant (SOAP 1.2 : un Reason/Text par langue)
                    if target.is_empty() {
                        *target = text;
                    }
                    path.pop();
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if fault.is_empty() {
        return Ok(None);
    }

    debug!(code = %fault.code, description = %fault.description, "SOAP fault detected");
    Ok(Some(fault))
}

/// Texte d'un élément : contenu texte, CDATA et références, sans les enfants.
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, SoapParseError> {
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Text(e) if depth == 0 => {
                text.push_str(&e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) if depth == 0 => {
                text.push_str(&e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::GeneralRef(e) if depth == 0 => push_reference(&mut text, &e)?,
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<(), SoapParseError> {
    if let Some(ch) = reference.resolve_char_ref()? {
        text.push(ch);
        return Ok(());
    }

    let name = reference.decode().map_err(quick_xml::Error::from)?;
    match resolve_xml_entity(&name) {
        Some(value) => {
            text.push_str(value);
            Ok(())
        }
        None => Err(EscapeError::UnrecognizedEntity(0..name.len(), name.into_owned()).into()),
    }
}

/// `Err(SoapError::Fault)` when the body carries a non-empty fault.
pub fn check_fault(body: &[u8]) -> Result<(), SoapError> {
    match detect_fault(body)? {
        Some(fault) => Err(SoapError::Fault(fault)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_soap11_fault() {
        let body = b"<Fault><faultcode>Server</faultcode><faultstring>boom</faultstring></Fault>";

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault, SoapFault::new("Server", "boom"));

        let err = check_fault(body).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Server"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_detect_prefixed_fault() {
        let body = br#"<soap:Fault xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <faultcode>soap:Client</faultcode>
            <faultstring>Invalid &amp; unknown item</faultstring>
            <detail><Code>12</Code></detail>
        </soap:Fault>"#;

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault.code, "soap:Client");
        assert_eq!(fault.description, "Invalid & unknown item");
    }

    #[test]
    fn test_detect_soap12_fault() {
        let body = br#"<env:Fault xmlns:env="http://www.w3.org/2003/05/soap-envelope">
            <env:Code><env:Value>env:Receiver</env:Value></env:Code>
            <env:Reason><env:Text xml:lang="en">Processing error</env:Text></env:Reason>
        </env:Fault>"#;

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault.code, "env:Receiver");
        assert_eq!(fault.description, "Processing error");
    }

    #[test]
    fn test_fault_closing_tag_with_whitespace() {
        let body = br#"<soap:Fault xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><faultcode>Server</faultcode><faultstring>boom</faultstring></soap:Fault >"#;

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault, SoapFault::new("Server", "boom"));
    }

    #[test]
    fn test_fault_text_from_cdata_and_references() {
        let body = br#"<Fault>
            <faultcode>Client</faultcode>
            <faultstring>id &#52;2: <![CDATA[a < b]]> &amp; more<detail>ignored</detail></faultstring>
        </Fault>"#;

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault.description, "id 42: a < b & more");
    }

    #[test]
    fn test_first_soap12_reason_wins() {
        let body = br#"<env:Fault xmlns:env="http://www.w3.org/2003/05/soap-envelope">
            <env:Code><env:Value>env:Sender</env:Value></env:Code>
            <env:Reason>
              <env:Text xml:lang="en">Bad request</env:Text>
              <env:Text xml:lang="fr">Requete invalide</env:Text>
            </env:Reason>
        </env:Fault>"#;

        let fault = detect_fault(body).unwrap().unwrap();
        assert_eq!(fault.code, "env:Sender");
        assert_eq!(fault.description, "Bad request");
    }

    #[test]
    fn test_empty_fault_is_not_an_error() {
        let body = b"<Fault><faultcode></faultcode><faultstring></faultstring></Fault>";
        assert_eq!(detect_fault(body).unwrap(), None);
        assert!(check_fault(body).is_ok());
    }

    #[test]
    fn test_no_marker_skips_parsing() {
        // Not even well-formed: only the substring scan runs.
        let body = b"<GetPriceResponse><Price>1.5</Price>";
        assert!(!has_fault_marker(body));
        assert_eq!(detect_fault(body).unwrap(), None);
    }

    #[test]
    fn test_marker_in_other_element_is_not_a_fault() {
        let body = b"<LastFault>none</LastFault>";
        assert!(has_fault_marker(body));
        assert_eq!(detect_fault(body).unwrap(), None);
    }
}
