//! Client SOAP piloté par un WSDL
//!
//! [`fill_request`] turns a call into an `http::Request`; [`SoapClient`] sends
//! it through a [`SoapTransport`], checks the response for a fault and
//! unmarshals the body.

use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, USER_AGENT};
use http::{Method, Request};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::SoapError;
use crate::params::Params;
use crate::soap::parser::deserialize_body;
use crate::soap::{EnvelopeSpec, SoapEnvelope, check_fault, encode_envelope, parse_soap_envelope};
use crate::transport::{CallTimeout, SoapTransport, UreqTransport};
use crate::wsdl::{WsdlDefinitions, fetch_definitions};

pub const SOAP_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";
pub const SOAP_ACCEPT: &str = "text/xml";
pub const SOAP_ACTION_HEADER: &str = "SOAPAction";

/// Bloc `soap:Header` d'un appel : nom de l'élément englobant et paramètres
#[derive(Debug, Clone, Copy)]
pub struct HeaderBlock<'a> {
    pub name: &'a str,
    pub params: &'a Params,
}

impl<'a> HeaderBlock<'a> {
    pub fn new(name: &'a str, params: &'a Params) -> Self {
        Self { name, params }
    }
}

/// SOAP action d'une méthode : celle du binding WSDL, sinon `{namespace}/{method}`.
///
/// A binding operation that declares an empty `soapAction` falls back to the
/// default as well.
pub fn soap_action(definitions: &WsdlDefinitions, method: &str) -> String {
    match definitions.soap_action(method).filter(|a| !a.is_empty()) {
        Some(action) => action.to_string(),
        None => {
            let namespace = &definitions.target_namespace;
            let base = namespace.strip_suffix('/').unwrap_or(namespace);
            format!("{base}/{method}")
        }
    }
}

/// Remplit une requête HTTP POST pour l'appel `method`.
pub fn fill_request(
    definitions: Option<&WsdlDefinitions>,
    method: &str,
    params: &Params,
    header: Option<HeaderBlock<'_>>,
) -> Result<Request<Vec<u8>>, SoapError> {
    let definitions = definitions.ok_or(SoapError::MissingDefinitions)?;
    let location = definitions.location().ok_or(SoapError::AddressNotFound)?;
    request_to(definitions, location, method, params, header)
}

fn request_to(
    definitions: &WsdlDefinitions,
    location: &str,
    method: &str,
    params: &Params,
    header: Option<HeaderBlock<'_>>,
) -> Result<Request<Vec<u8>>, SoapError> {
    let mut spec = EnvelopeSpec::new(method, &definitions.target_namespace).with_params(params);
    if let Some(header) = header {
        spec = spec.with_header(header.name, header.params);
    }
    let payload = encode_envelope(&spec)?;

    let action = soap_action(definitions, method);
    debug!(method, %action, location, bytes = payload.len(), "Filled SOAP request");

    let request = Request::builder()
        .method(Method::POST)
        .uri(location)
        .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
        .header(ACCEPT, SOAP_ACCEPT)
        .header(SOAP_ACTION_HEADER, action)
        .header(CONTENT_LENGTH, payload.len())
        .body(payload)?;

    Ok(request)
}

/// Client SOAP pour un service décrit par un WSDL.
///
/// Definitions are immutable once loaded, so a client can be shared between
/// threads; every call builds and owns its own envelope.
pub struct SoapClient<T = UreqTransport> {
    definitions: Arc<WsdlDefinitions>,
    location: String,
    user_agent: Option<String>,
    transport: T,
}

impl SoapClient<UreqTransport> {
    /// Télécharge le WSDL et prépare le transport `ureq`.
    pub fn new(config: &ClientConfig) -> Result<Self, SoapError> {
        info!(wsdl_url = %config.wsdl_url, "Loading WSDL definitions");

        let definitions = fetch_definitions(&config.wsdl_url, config.wsdl_timeout())?;
        let transport = UreqTransport::new(config.timeout());

        let mut client = Self::from_definitions(definitions, transport)?;
        client.user_agent = config.user_agent.clone();
        Ok(client)
    }

    pub fn from_url(wsdl_url: &str) -> Result<Self, SoapError> {
        Self::new(&ClientConfig::new(wsdl_url))
    }
}

impl<T: SoapTransport> SoapClient<T> {
    /// Client sur des définitions déjà chargées.
    pub fn from_definitions(definitions: WsdlDefinitions, transport: T) -> Result<Self, SoapError> {
        let location = match definitions.location() {
            Some(location) => location.to_string(),
            None => {
                warn!(
                    target_namespace = %definitions.target_namespace,
                    "No SOAP address in WSDL definitions"
                );
                return Err(SoapError::AddressNotFound);
            }
        };
        info!(%location, "SOAP service location resolved");

        Ok(Self {
            definitions: Arc::new(definitions),
            location,
            user_agent: None,
            transport,
        })
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn definitions(&self) -> &WsdlDefinitions {
        &self.definitions
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn soap_action(&self, method: &str) -> String {
        soap_action(&self.definitions, method)
    }

    /// Requête HTTP complète pour `method`, prête pour le transport.
    pub fn fill_request(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
    ) -> Result<Request<Vec<u8>>, SoapError> {
        self.build_request(method, params, header)
            .map_err(|e| e.in_operation(method))
    }

    fn build_request(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
    ) -> Result<Request<Vec<u8>>, SoapError> {
        let mut request = request_to(&self.definitions, &self.location, method, params, header)?;
        if let Some(user_agent) = &self.user_agent {
            let value = HeaderValue::from_str(user_agent).map_err(http::Error::from)?;
            request.headers_mut().insert(USER_AGENT, value);
        }
        Ok(request)
    }

    /// Appelle `method` et désérialise le Body de la réponse dans `R`.
    pub fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
    ) -> Result<R, SoapError> {
        self.exchange(method, params, header, None)
            .and_then(|envelope| deserialize_body(&envelope.body.contents))
            .map_err(|e| e.in_operation(method))
    }

    /// Comme [`SoapClient::call`], avec un délai propre à cet appel.
    pub fn call_with_timeout<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
        timeout: Duration,
    ) -> Result<R, SoapError> {
        self.exchange(method, params, header, Some(timeout))
            .and_then(|envelope| deserialize_body(&envelope.body.contents))
            .map_err(|e| e.in_operation(method))
    }

    /// Appelle `method` et renvoie l'enveloppe brute, une fois le fault écarté.
    pub fn call_raw(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
    ) -> Result<SoapEnvelope, SoapError> {
        self.exchange(method, params, header, None)
            .map_err(|e| e.in_operation(method))
    }

    pub fn call_raw_with_timeout(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
        timeout: Duration,
    ) -> Result<SoapEnvelope, SoapError> {
        self.exchange(method, params, header, Some(timeout))
            .map_err(|e| e.in_operation(method))
    }

    fn exchange(
        &self,
        method: &str,
        params: &Params,
        header: Option<HeaderBlock<'_>>,
        timeout: Option<Duration>,
    ) -> Result<SoapEnvelope, SoapError> {
        let mut request = self.build_request(method, params, header)?;
        if let Some(timeout) = timeout {
            request.extensions_mut().insert(CallTimeout(timeout));
        }
        let response = self.transport.round_trip(request)?;

        let status = response.status();
        let data = response.into_body();
        debug!(method, %status, bytes = data.len(), "SOAP response received");

        let envelope = match parse_soap_envelope(&data) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => return Err(err.into()),
            Err(_) => {
                return Err(SoapError::HttpStatus {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&data).into_owned(),
                });
            }
        };

        // Un fault prime sur le statut HTTP (SOAP 1.1 renvoie 500)
        check_fault(&envelope.body.contents)?;

        if !status.is_success() {
            return Err(SoapError::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&data).into_owned(),
            });
        }

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> WsdlDefinitions {
        WsdlDefinitions::parse(
            br#"<definitions targetNamespace="http://example.com/svc/">
                <binding name="B">
                  <operation name="GetPrice"><operation soapAction="urn:GetPrice"/></operation>
                  <operation name="Empty"><operation soapAction=""/></operation>
                </binding>
                <service name="S"><port name="P" binding="B"><address location="http://example.com/svc.asmx"/></port></service>
              </definitions>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_soap_action_from_binding() {
        assert_eq!(soap_action(&definitions(), "GetPrice"), "urn:GetPrice");
    }

    #[test]
    fn test_default_soap_action() {
        let defs = definitions();
        assert_eq!(soap_action(&defs, "Other"), "http://example.com/svc/Other");
        assert_eq!(soap_action(&defs, "Empty"), "http://example.com/svc/Empty");
    }

    #[test]
    fn test_fill_request_headers_and_body() {
        let params: Params = vec![("ItemId", "42")].into();
        let request = fill_request(Some(&definitions()), "GetPrice", &params, None).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "http://example.com/svc.asmx");
        assert_eq!(request.headers()[CONTENT_TYPE], SOAP_CONTENT_TYPE);
        assert_eq!(request.headers()[ACCEPT], SOAP_ACCEPT);
        assert_eq!(request.headers()[SOAP_ACTION_HEADER], "urn:GetPrice");
        assert_eq!(
            request.headers()[CONTENT_LENGTH],
            request.body().len().to_string().as_str()
        );

        let body = String::from_utf8(request.body().clone()).unwrap();
        assert!(body.contains(
            r#"<GetPrice xmlns="http://example.com/svc/"><ItemId>42</ItemId></GetPrice>"#
        ));
    }

    #[test]
    fn test_fill_request_with_header_block() {
        let params = Params::new();
        let header: Params = vec![("Token", "t")].into();
        let request = fill_request(
            Some(&definitions()),
            "GetPrice",
            &params,
            Some(HeaderBlock::new("Auth", &header)),
        )
        .unwrap();

        let body = String::from_utf8(request.into_body()).unwrap();
        assert!(body.contains(
            r#"<soap:Header><Auth xmlns="http://example.com/svc/"><Token>t</Token></Auth></soap:Header>"#
        ));
    }

    #[test]
    fn test_fill_request_failures() {
        let params = Params::new();
        assert!(matches!(
            fill_request(None, "GetPrice", &params, None),
            Err(SoapError::MissingDefinitions)
        ));

        let no_address = WsdlDefinitions {
            target_namespace: "urn:svc".to_string(),
            ..WsdlDefinitions::default()
        };
        assert!(matches!(
            fill_request(Some(&no_address), "GetPrice", &params, None),
            Err(SoapError::AddressNotFound)
        ));

        assert!(matches!(
            fill_request(Some(&definitions()), "", &params, None),
            Err(SoapError::EmptyMethodOrNamespace)
        ));
    }
}
