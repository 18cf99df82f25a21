use thiserror::Error;

use crate::soap::{EncodeError, SoapFault, SoapParseError};
use crate::transport::TransportError;
use crate::wsdl::WsdlError;

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("WSDL definitions are not loaded")]
    MissingDefinitions,
    #[error("soap address not found in WSDL definitions")]
    AddressNotFound,
    #[error("method or namespace is empty")]
    EmptyMethodOrNamespace,
    #[error("cannot encode envelope: {0}")]
    Encode(#[from] EncodeError),
    #[error("WSDL error: {0}")]
    Wsdl(#[from] WsdlError),
    #[error("invalid HTTP request: {0}")]
    Request(#[from] http::Error),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("SOAP fault: {0}")]
    Fault(#[from] SoapFault),
    #[error("malformed SOAP response: {0}")]
    Parse(#[from] SoapParseError),
    #[error("cannot unmarshal response body: {0}")]
    Unmarshal(#[from] quick_xml::de::DeError),
    #[error("HTTP status {status} without SOAP fault, body: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("{operation}: {source}")]
    Operation {
        operation: String,
        #[source]
        source: Box<SoapError>,
    },
}

impl SoapError {
    /// Attache le nom de l'opération SOAP à l'erreur (une seule fois).
    pub fn in_operation(self, operation: &str) -> Self {
        match self {
            SoapError::Operation { .. } => self,
            other => SoapError::Operation {
                operation: operation.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// L'erreur sans le contexte d'opération
    pub fn root(&self) -> &SoapError {
        match self {
            SoapError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The remote fault, if this error is one.
    pub fn fault(&self) -> Option<&SoapFault> {
        match self.root() {
            SoapError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn is_fault(&self) -> bool {
        self.fault().is_some()
    }

    pub fn operation(&self) -> Option<&str> {
        match self {
            SoapError::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
