//! # Module SOAP - enveloppes de requête et de réponse
//!
//! ## Requête
//!
//! - [`builder`] : séquence de [`Token`] d'une enveloppe (`soap:Envelope`, Header, Body)
//! - [`encoder`] : sérialisation des jetons, raw tokens written verbatim
//!
//! ## Réponse
//!
//! - [`parser`] : découpage Header/Body et désérialisation du Body
//! - [`fault`] : détection des SOAP Faults
//!
//! ## Example
//!
//! ```
//! use pmosoap::Params;
//! use pmosoap::soap::{EnvelopeSpec, build_envelope, encode_tokens};
//!
//! let params: Params = vec![("ItemId", "42")].into();
//! let spec = EnvelopeSpec::new("GetPrice", "http://example.com/svc").with_params(&params);
//! let xml = encode_tokens(&build_envelope(&spec)?)?;
//!
//! assert!(String::from_utf8_lossy(&xml).contains(
//!     r#"<soap:Body><GetPrice xmlns="http://example.com/svc"><ItemId>42</ItemId></GetPrice></soap:Body>"#
//! ));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod encoder;
mod envelope;
pub mod fault;
pub mod parser;
mod token;

pub use builder::{EnvelopeSpec, build_envelope};
pub use encoder::{EncodeError, encode_into, encode_tokens};
pub use envelope::{SoapBody, SoapEnvelope, SoapHeader};
pub use fault::{SoapFault, check_fault, detect_fault};
pub use parser::{SoapParseError, parse_soap_envelope, unmarshal_body, unmarshal_response};
pub use token::Token;

use crate::error::SoapError;

/// Construit et encode l'enveloppe d'un appel en une passe.
pub fn encode_envelope(spec: &EnvelopeSpec<'_>) -> Result<Vec<u8>, SoapError> {
    let tokens = build_envelope(spec)?;
    Ok(encode_tokens(&tokens)?)
}
