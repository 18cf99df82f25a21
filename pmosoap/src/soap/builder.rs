//! Construction de l'enveloppe SOAP sous forme de jetons
//!
//! Every step appends to a token vector owned by the caller. The resulting
//! sequence always has the shape
//! `Envelope [Header [HeaderMethod] params [/HeaderMethod] /Header] Body Method params /Method /Body /Envelope`.

use super::Token;
use crate::error::SoapError;
use crate::params::Params;

pub const ENVELOPE_TAG: &str = "soap:Envelope";
pub const HEADER_TAG: &str = "soap:Header";
pub const BODY_TAG: &str = "soap:Body";

pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Description d'un appel, entrée du builder
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeSpec<'a> {
    /// Nom de l'opération (élément racine du Body)
    pub method: &'a str,

    /// targetNamespace du WSDL
    pub namespace: &'a str,

    /// Paramètres du corps, dans l'ordre d'émission
    pub params: Option<&'a Params>,

    /// Élément englobant les paramètres d'en-tête (optionnel)
    pub header_name: &'a str,

    /// Paramètres d'en-tête (le bloc Header n'est émis que s'ils existent)
    pub header_params: Option<&'a Params>,
}

impl<'a> EnvelopeSpec<'a> {
    pub fn new(method: &'a str, namespace: &'a str) -> Self {
        Self {
            method,
            namespace,
            params: None,
            header_name: "",
            header_params: None,
        }
    }

    pub fn with_params(mut self, params: &'a Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_header(mut self, header_name: &'a str, header_params: &'a Params) -> Self {
        self.header_name = header_name;
        self.header_params = Some(header_params);
        self
    }
}

/// Construit la séquence complète de jetons d'une enveloppe.
pub fn build_envelope(spec: &EnvelopeSpec<'_>) -> Result<Vec<Token>, SoapError> {
    let mut tokens = Vec::new();

    start_envelope(&mut tokens);

    if let Some(header_params) = spec.header_params.filter(|p| !p.is_empty()) {
        start_header(&mut tokens, spec.header_name, spec.namespace);
        param_tokens(&mut tokens, header_params);
        end_header(&mut tokens, spec.header_name, spec.namespace);
    }

    start_body(&mut tokens, spec.method, spec.namespace)?;
    if let Some(params) = spec.params {
        param_tokens(&mut tokens, params);
    }
    end_body(&mut tokens, spec.method);

    end_envelope(&mut tokens);

    Ok(tokens)
}

pub fn start_envelope(tokens: &mut Vec<Token>) {
    tokens.push(Token::start_with_attributes(
        ENVELOPE_TAG,
        &[
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xmlns:xsd", XSD_NAMESPACE),
            ("xmlns:soap", SOAP_ENVELOPE_NAMESPACE),
        ],
    ));
}

pub fn end_envelope(tokens: &mut Vec<Token>) {
    tokens.push(Token::end(ENVELOPE_TAG));
}

/// Ouvre le Header, et l'élément englobant si nom et namespace sont fournis.
pub fn start_header(tokens: &mut Vec<Token>, header_name: &str, namespace: &str) {
    tokens.push(Token::start(HEADER_TAG));

    if has_header_element(header_name, namespace) {
        tokens.push(Token::start_with_attributes(
            header_name,
            &[("xmlns", namespace)],
        ));
    }
}

pub fn end_header(tokens: &mut Vec<Token>, header_name: &str, namespace: &str) {
    if has_header_element(header_name, namespace) {
        tokens.push(Token::end(header_name));
    }
    tokens.push(Token::end(HEADER_TAG));
}

fn has_header_element(header_name: &str, namespace: &str) -> bool {
    !header_name.is_empty() && !namespace.is_empty()
}

/// Ouvre le Body et l'élément de la méthode.
pub fn start_body(tokens: &mut Vec<Token>, method: &str, namespace: &str) -> Result<(), SoapError> {
    if method.is_empty() || namespace.is_empty() {
        return Err(SoapError::EmptyMethodOrNamespace);
    }

    tokens.push(Token::start(BODY_TAG));
    tokens.push(Token::start_with_attributes(method, &[("xmlns", namespace)]));

    Ok(())
}

pub fn end_body(tokens: &mut Vec<Token>, method: &str) {
    tokens.push(Token::end(method));
    tokens.push(Token::end(BODY_TAG));
}

/// `<key>value</key>` pour chaque paramètre, raw values as [`Token::Raw`].
pub fn param_tokens(tokens: &mut Vec<Token>, params: &Params) {
    for param in params {
        tokens.push(Token::start(param.key.as_str()));
        if param.is_raw() {
            tokens.push(Token::Raw(param.value.clone()));
        } else {
            tokens.push(Token::Text(param.value.clone()));
        }
        tokens.push(Token::end(param.key.as_str()));
    }
}
