//! Structures de l'enveloppe SOAP reçue

use std::str::Utf8Error;

/// Enveloppe SOAP de réponse (header et body en XML brut)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapEnvelope {
    /// En-tête SOAP optionnel
    pub header: Option<SoapHeader>,

    /// Corps SOAP
    pub body: SoapBody,
}

/// En-tête SOAP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapHeader {
    /// Contenu XML brut, entre `<Header>` et `</Header>`
    pub contents: Vec<u8>,
}

/// Corps SOAP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapBody {
    /// Contenu XML brut, entre `<Body>` et `</Body>`
    pub contents: Vec<u8>,
}

impl SoapHeader {
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.contents)
    }
}

impl SoapBody {
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.contents)
    }
}
