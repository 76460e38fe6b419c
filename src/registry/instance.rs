//! Backend instance addresses.
//!
//! # Responsibilities
//! - Represent a single reachable backend endpoint (scheme, host, port)
//! - Parse and normalise configured base URLs
//! - Build outbound URLs for proxying, probing and WebSocket relay

use std::fmt;
use thiserror::Error;
use url::Url;

/// Reasons an instance URL is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("not a valid URL: {0}")]
    Url(String),

    #[error("unsupported scheme {0:?} (only http is proxied)")]
    Scheme(String),

    #[error("missing host")]
    MissingHost,

    #[error("instance URL must not carry a path, query or fragment")]
    HasPath,
}

/// A reachable backend endpoint. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceAddress {
    scheme: String,
    host: String,
    port: u16,
}

impl InstanceAddress {
    /// Parse a base URL such as `http://documents:8002`.
    pub fn parse(input: &str) -> Result<Self, InstanceError> {
        let url = Url::parse(input).map_err(|e| InstanceError::Url(e.to_string()))?;

        if url.scheme() != "http" {
            return Err(InstanceError::Scheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or(InstanceError::MissingHost)?.to_string();
        if (url.path() != "/" && !url.path().is_empty())
            || url.query().is_some()
            || url.fragment().is_some()
        {
            return Err(InstanceError::HasPath);
        }
        let port = url.port_or_known_default().unwrap_or(80);

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, suitable for a URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Absolute URL for a path (and optional query) on this instance.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.authority(), path_and_query)
    }

    /// WebSocket URL for a path (and optional query) on this instance.
    pub fn ws_url_for(&self, path_and_query: &str) -> String {
        format!("ws://{}{}", self.authority(), path_and_query)
    }
}

impl fmt::Display for InstanceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl std::str::FromStr for InstanceAddress {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
