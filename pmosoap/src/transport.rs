//! Transport HTTP des requêtes SOAP
//!
//! The client only needs "send a request, get the bytes back"; the HTTP
//! library behind it is pluggable through [`SoapTransport`].

use std::time::Duration;

use http::{Request, Response};
use thiserror::Error;
use tracing::debug;
use ureq::Agent;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("{0}")]
    Other(String),
}

/// Délai maximal d'un appel, attaché à la requête comme extension `http`.
///
/// It replaces the transport's own timeout for that single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeout(pub Duration);

/// Capacité d'envoi d'une requête HTTP.
///
/// Implementations must return non-2xx responses as `Ok`: SOAP faults travel
/// with HTTP 500 and their body still has to be read.
pub trait SoapTransport: Send + Sync {
    fn round_trip(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError>;
}

/// Transport par défaut, basé sur `ureq`
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SoapTransport for UreqTransport {
    fn round_trip(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        debug!(
            uri = %request.uri(),
            bytes = request.body().len(),
            "Sending SOAP request"
        );

        let call_timeout = request.extensions().get::<CallTimeout>().copied();
        let request = match call_timeout {
            Some(CallTimeout(timeout)) => {
                debug!(?timeout, "Per-call timeout");
                self.agent
                    .configure_request(request)
                    .timeout_global(Some(timeout))
                    .build()
            }
            None => request,
        };

        let response = self.agent.run(request)?;
        let (parts, mut body) = response.into_parts();
        let bytes = body.read_to_vec()?;

        debug!(status = %parts.status, bytes = bytes.len(), "Received SOAP response");
        Ok(Response::from_parts(parts, bytes))
    }
}

impl<T: SoapTransport + ?Sized> SoapTransport for std::sync::Arc<T> {
    fn round_trip(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        (**self).round_trip(request)
    }
}
