//! Lecture minimale d'un document WSDL
//!
//! Only what a SOAP call needs is kept: the target namespace, the service
//! addresses and the SOAP action of each binding operation. Elements are
//! matched by local name, so `wsdl:`/`soap:`/`soap12:` prefixes do not matter.

use std::str::Utf8Error;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::escape::{EscapeError, unescape};
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::{debug, warn};
use ureq::Agent;

#[derive(Debug, Error)]
pub enum WsdlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] EscapeError),

    #[error("WSDL is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("Missing required WSDL element: {0}")]
    MissingElement(&'static str),
}

/// Définitions WSDL, lecture seule après chargement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsdlDefinitions {
    pub target_namespace: String,
    pub services: Vec<WsdlService>,
    pub bindings: Vec<WsdlBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsdlService {
    pub name: String,
    pub ports: Vec<WsdlPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsdlPort {
    pub name: String,
    pub binding: String,
    /// Adresses `soap:address` / `soap12:address` du port
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsdlBinding {
    pub name: String,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOperation {
    pub name: String,
    /// Valeurs `soapAction` des éléments `soap:operation`
    pub soap_actions: Vec<String>,
}

impl WsdlDefinitions {
    /// Parse un document WSDL.
    pub fn parse(xml: &[u8]) -> Result<Self, WsdlError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut defs = WsdlDefinitions::default();
        let mut found_root = false;
        let mut path: Vec<String> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    found_root |= defs.visit(&path, &name, &e)?;
                    path.push(name);
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    found_root |= defs.visit(&path, &name, &e)?;
                }
                Event::End(_) => {
                    path.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !found_root {
            return Err(WsdlError::MissingElement("definitions"));
        }

        debug!(
            target_namespace = %defs.target_namespace,
            services = defs.services.len(),
            bindings = defs.bindings.len(),
            "Parsed WSDL definitions"
        );

        Ok(defs)
    }

    /// Handles one element given its parent path. Returns true on the root.
    fn visit(&mut self, path: &[String], name: &str, e: &BytesStart<'_>) -> Result<bool, WsdlError> {
        let parents: Vec<&str> = path.iter().map(String::as_str).collect();

        match (parents.as_slice(), name) {
            ([], "definitions") => {
                self.target_namespace = attribute(e, b"targetNamespace")?.unwrap_or_default();
                return Ok(true);
            }
            (["definitions"], "service") => self.services.push(WsdlService {
                name: attribute(e, b"name")?.unwrap_or_default(),
                ports: Vec::new(),
            }),
            (["definitions", "service"], "port") => {
                let port = WsdlPort {
                    name: attribute(e, b"name")?.unwrap_or_default(),
                    binding: attribute(e, b"binding")?.unwrap_or_default(),
                    addresses: Vec::new(),
                };
                if let Some(service) = self.services.last_mut() {
                    service.ports.push(port);
                }
            }
            (["definitions", "service", "port"], "address") => {
                let location = attribute(e, b"location")?.unwrap_or_default();
                if let Some(port) = self
                    .services
                    .last_mut()
                    .and_then(|service| service.ports.last_mut())
                {
                    port.addresses.push(location);
                }
            }
            (["definitions"], "binding") => self.bindings.push(WsdlBinding {
                name: attribute(e, b"name")?.unwrap_or_default(),
                operations: Vec::new(),
            }),
            (["definitions", "binding"], "operation") => {
                let operation = BindingOperation {
                    name: attribute(e, b"name")?.unwrap_or_default(),
                    soap_actions: Vec::new(),
                };
                if let Some(binding) = self.bindings.last_mut() {
                    binding.operations.push(operation);
                }
            }
            (["definitions", "binding", "operation"], "operation") => {
                let action = attribute(e, b"soapAction")?.unwrap_or_default();
                if let Some(operation) = self
                    .bindings
                    .last_mut()
                    .and_then(|binding| binding.operations.last_mut())
                {
                    operation.soap_actions.push(action);
                }
            }
            _ => {}
        }

        Ok(false)
    }

    /// Première adresse non vide trouvée (services → ports → adresses).
    pub fn location(&self) -> Option<&str> {
        self.services
            .iter()
            .flat_map(|service| &service.ports)
            .flat_map(|port| &port.addresses)
            .map(String::as_str)
            .find(|location| !location.is_empty())
    }

    /// SOAP action liée à `method` dans les bindings, if any.
    pub fn soap_action(&self, method: &str) -> Option<&str> {
        self.bindings
            .iter()
            .flat_map(|binding| &binding.operations)
            .find(|operation| operation.name == method)
            .and_then(|operation| operation.soap_actions.first())
            .map(String::as_str)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, WsdlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == name {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// Télécharge et parse un WSDL, avec un timeout global sur tout l'échange.
pub fn fetch_definitions(url: &str, timeout: Duration) -> Result<WsdlDefinitions, WsdlError> {
    debug!(url, timeout_ms = timeout.as_millis() as u64, "Fetching WSDL");

    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent: Agent = config.into();

    let mut response = agent.get(url).call().inspect_err(|e| {
        warn!(url, error = %e, "WSDL fetch failed");
    })?;
    let body = response.body_mut().read_to_vec()?;

    WsdlDefinitions::parse(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WSDL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                  xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                  xmlns:tns="http://example.com/svc/"
                  targetNamespace="http://example.com/svc/">
  <wsdl:portType name="PriceSoap">
    <wsdl:operation name="GetPrice">
      <wsdl:input message="tns:GetPriceIn"/>
    </wsdl:operation>
  </wsdl:portType>
  <wsdl:binding name="PriceSoap" type="tns:PriceSoap">
    <soap:binding transport="http://schemas.xmlsoap.org/soap/http"/>
    <wsdl:operation name="GetPrice">
      <soap:operation soapAction="http://example.com/svc/GetPrice?a=1&amp;b=2" style="document"/>
    </wsdl:operation>
    <wsdl:operation name="Ping">
      <soap:operation style="document"/>
    </wsdl:operation>
  </wsdl:binding>
  <wsdl:service name="Price">
    <wsdl:port name="PriceSoap" binding="tns:PriceSoap">
      <soap:address location="http://example.com/svc.asmx"/>
    </wsdl:port>
    <wsdl:port name="PriceSoap12" binding="tns:PriceSoap12">
      <soap12:address xmlns:soap12="http://schemas.xmlsoap.org/wsdl/soap12/" location="http://example.com/svc12.asmx"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>"#;

    #[test]
    fn test_parse_definitions() {
        let defs = WsdlDefinitions::parse(WSDL.as_bytes()).unwrap();

        assert_eq!(defs.target_namespace, "http://example.com/svc/");
        assert_eq!(defs.services.len(), 1);
        assert_eq!(defs.services[0].ports.len(), 2);
        assert_eq!(defs.services[0].ports[0].binding, "tns:PriceSoap");
        assert_eq!(defs.bindings.len(), 1);
        assert_eq!(defs.bindings[0].operations.len(), 2);
    }

    #[test]
    fn test_location_is_first_address() {
        let defs = WsdlDefinitions::parse(WSDL.as_bytes()).unwrap();
        assert_eq!(defs.location(), Some("http://example.com/svc.asmx"));
    }

    #[test]
    fn test_soap_action_lookup() {
        let defs = WsdlDefinitions::parse(WSDL.as_bytes()).unwrap();

        assert_eq!(
            defs.soap_action("GetPrice"),
            Some("http://example.com/svc/GetPrice?a=1&b=2")
        );
        // soap:operation without soapAction yields an empty action
        assert_eq!(defs.soap_action("Ping"), Some(""));
        assert_eq!(defs.soap_action("Unknown"), None);
    }

    #[test]
    fn test_port_type_operations_are_ignored() {
        let defs = WsdlDefinitions::parse(WSDL.as_bytes()).unwrap();
        let names: Vec<&str> = defs.bindings[0]
            .operations
            .iter()
            .map(|op| op.name.as_str())
            .collect();
        assert_eq!(names, vec!["GetPrice", "Ping"]);
    }

    #[test]
    fn test_no_service_has_no_location() {
        let xml = br#"<definitions targetNamespace="urn:empty"/>"#;
        let defs = WsdlDefinitions::parse(xml).unwrap();
        assert_eq!(defs.target_namespace, "urn:empty");
        assert_eq!(defs.location(), None);
    }

    #[test]
    fn test_not_a_wsdl() {
        assert!(matches!(
            WsdlDefinitions::parse(b"<html><body/></html>"),
            Err(WsdlError::MissingElement("definitions"))
        ));
    }
}
