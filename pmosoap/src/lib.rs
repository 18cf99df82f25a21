//! # pmosoap - Client SOAP piloté par WSDL
//!
//! Construit des enveloppes SOAP, les envoie en HTTP et interprète les
//! réponses (détection des SOAP Faults, désérialisation du Body).
//!
//! ## Architecture
//!
//! - [`Params`] : paramètres ordonnés d'un appel, valeurs échappées ou brutes
//! - [`soap`] : jetons d'enveloppe, encodeur, parser de réponse, faults
//! - [`wsdl`] : lecture minimale des définitions WSDL
//! - [`transport`] : envoi HTTP, pluggable via [`SoapTransport`]
//! - [`SoapClient`] : remplissage des requêtes et appels
//!
//! ## Example
//!
//! ```no_run
//! use pmosoap::{ClientConfig, Params, SoapClient};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct GetPriceResponse {
//!     #[serde(rename = "Price")]
//!     price: f64,
//! }
//!
//! let client = SoapClient::new(&ClientConfig::new("http://example.com/svc?wsdl"))?;
//!
//! let mut params = Params::new();
//! params.set("ItemId", "42");
//!
//! let response: GetPriceResponse = client.call("GetPrice", &params, None)?;
//! println!("price: {}", response.price);
//! # Ok::<(), pmosoap::SoapError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod soap;
pub mod transport;
pub mod wsdl;

pub use client::{HeaderBlock, SoapClient, fill_request};
pub use config::ClientConfig;
pub use error::SoapError;
pub use params::{Param, Params};
pub use soap::{SoapEnvelope, SoapFault};
pub use transport::{CallTimeout, SoapTransport, TransportError, UreqTransport};
pub use wsdl::{WsdlDefinitions, WsdlError, fetch_definitions};
