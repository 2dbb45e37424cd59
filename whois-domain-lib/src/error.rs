//! Error handling for registration lookups.
//!
//! This module defines the error type that covers all the different ways a
//! lookup can fail, from network issues to unparseable WHOIS text. Outcomes
//! that mean "no record" (unknown domain, no RDAP service for the TLD) are
//! also represented here so the orchestrator can classify them.

use std::time::Duration;
use thiserror::Error;

/// WHOIS error message used when a query is attempted without a domain.
///
/// Some WHOIS servers produce this transiently under load, so the
/// orchestrator treats it as retryable.
pub(crate) const EMPTY_DOMAIN_MESSAGE: &str = "domain is empty";

/// Outcomes of parsing a raw WHOIS response that did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The registry explicitly reported that the domain does not exist.
    #[error("domain not found")]
    NotFound,

    /// The response did not contain enough recognizable data to form a record.
    #[error("domain data is invalid")]
    DataInvalid,

    /// The response was empty.
    #[error("WHOIS response is empty")]
    Empty,

    /// The registry reports the name as reserved.
    #[error("domain is reserved by the registry")]
    Reserved,

    /// The registry reports the name as a premium domain.
    #[error("domain is a premium domain")]
    Premium,

    /// The registry reports the name as blocked.
    #[error("domain is blocked by the registry")]
    Blocked,

    /// The registry refused the query because of query limits.
    #[error("WHOIS query limit exceeded")]
    RateLimited,
}

impl ParseError {
    /// Whether this outcome means "no record" rather than a failed lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::DataInvalid)
    }
}

/// Main error type for registration lookups.
#[derive(Debug, Clone, Error)]
pub enum WhoisDomainError {
    /// Invalid domain name format
    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// No RDAP service is known for the domain's TLD
    #[error("No RDAP servers found for '{domain}'")]
    NoRdapServer { domain: String },

    /// RDAP protocol specific errors
    #[error("RDAP error for '{domain}'{}: {message}", http_suffix(.status_code))]
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Bootstrap registry lookup failures
    #[error("Bootstrap error for TLD '{tld}': {message}")]
    BootstrapError { tld: String, message: String },

    /// WHOIS protocol specific errors
    #[error("WHOIS error for '{domain}': {message}")]
    WhoisError { domain: String, message: String },

    /// The WHOIS server reset the connection
    #[error("WHOIS error for '{domain}': connection reset by peer")]
    ConnectionReset { domain: String },

    /// The WHOIS response could not be turned into a record
    #[error("Parse error for '{domain}': {source}")]
    ParseError {
        domain: String,
        #[source]
        source: ParseError,
    },

    /// Configuration errors (invalid settings, etc.)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// Timeout errors when operations take too long
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Every allowed attempt failed with a retryable error
    #[error("Giving up after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: usize,
        last: Box<WhoisDomainError>,
    },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn http_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (HTTP {})", code))
        .unwrap_or_default()
}

impl WhoisDomainError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "no RDAP server" error.
    pub fn no_rdap_server<D: Into<String>>(domain: D) -> Self {
        Self::NoRdapServer {
            domain: domain.into(),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<D: Into<String>>(domain: D, source: ParseError) -> Self {
        Self::ParseError {
            domain: domain.into(),
            source,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a transient WHOIS failure worth retrying.
    ///
    /// Only two signatures qualify: the server resetting the connection, and
    /// the empty-domain artifact some servers emit under load.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionReset { .. } => true,
            Self::WhoisError { message, .. } => message.contains(EMPTY_DOMAIN_MESSAGE),
            _ => false,
        }
    }

    /// Check if this error means the TLD has no RDAP service at all.
    pub fn is_no_rdap_server(&self) -> bool {
        matches!(self, Self::NoRdapServer { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_signatures() {
        assert!(WhoisDomainError::ConnectionReset {
            domain: "example.com".to_string()
        }
        .is_retryable());
        assert!(WhoisDomainError::whois("", EMPTY_DOMAIN_MESSAGE).is_retryable());

        assert!(!WhoisDomainError::whois("example.com", "connection refused").is_retryable());
        assert!(!WhoisDomainError::timeout("WHOIS query", Duration::from_secs(5)).is_retryable());
        assert!(!WhoisDomainError::no_rdap_server("example.com").is_retryable());
    }

    #[test]
    fn test_parse_error_not_found_classes() {
        assert!(ParseError::NotFound.is_not_found());
        assert!(ParseError::DataInvalid.is_not_found());
        assert!(!ParseError::Empty.is_not_found());
        assert!(!ParseError::Reserved.is_not_found());
        assert!(!ParseError::RateLimited.is_not_found());
    }

    #[test]
    fn test_display_includes_context() {
        let err = WhoisDomainError::rdap_with_status("example.com", "server error", 503);
        assert_eq!(
            err.to_string(),
            "RDAP error for 'example.com' (HTTP 503): server error"
        );

        let err = WhoisDomainError::rdap("example.com", "bad json");
        assert_eq!(err.to_string(), "RDAP error for 'example.com': bad json");

        let err = WhoisDomainError::parse("example.com", ParseError::Reserved);
        assert_eq!(
            err.to_string(),
            "Parse error for 'example.com': domain is reserved by the registry"
        );
    }

    #[test]
    fn test_no_rdap_server_detection() {
        assert!(WhoisDomainError::no_rdap_server("example.zz").is_no_rdap_server());
        assert!(!WhoisDomainError::rdap("example.com", "boom").is_no_rdap_server());
    }
}
