//! Core data types for registration lookups.
//!
//! This module defines the unified record produced by every lookup, the
//! per-role contact details, and the configuration that tunes lookup
//! behavior.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registration data for one domain.
///
/// Both RDAP and WHOIS lookups produce this same shape. Fields the source
/// did not provide are left empty rather than guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain name the record describes (e.g., "example.com")
    pub domain: String,

    /// Registry identifier for the domain (RDAP handle / Registry Domain ID)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,

    /// ASCII (punycode) form of the domain name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punycode: Option<String>,

    /// Top-level extension, the text after the final dot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Hostname of the registry WHOIS server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,

    /// When the domain was first registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,

    /// Last update of the registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,

    /// When the registration expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,

    /// Registry status codes (e.g., "clientTransferProhibited"), in source order
    pub status: Vec<String>,

    /// Name servers delegated for the domain
    pub name_servers: Vec<String>,

    /// True only if the source explicitly asserts a signed delegation
    pub dnssec: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical: Option<Contact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<Contact>,

    /// Which protocol produced this record
    pub source: RecordSource,
}

/// Contact details for one party attached to a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_url: Option<String>,
}

impl Contact {
    /// True when no field has been populated.
    pub fn is_empty(&self) -> bool {
        self == &Contact::default()
    }
}

/// Protocol that produced a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    /// Record normalized from an RDAP response
    #[serde(rename = "rdap")]
    Rdap,

    /// Record parsed from WHOIS text
    #[default]
    #[serde(rename = "whois")]
    Whois,
}

// EPP status codes elevated to boolean flags, in the lowercase whitespace-free
// form used for matching.
pub const CLIENT_DELETE_PROHIBITED: &str = "clientdeleteprohibited";
pub const CLIENT_TRANSFER_PROHIBITED: &str = "clienttransferprohibited";
pub const CLIENT_UPDATE_PROHIBITED: &str = "clientupdateprohibited";
pub const SERVER_DELETE_PROHIBITED: &str = "serverdeleteprohibited";
pub const SERVER_TRANSFER_PROHIBITED: &str = "servertransferprohibited";
pub const SERVER_UPDATE_PROHIBITED: &str = "serverupdateprohibited";

impl DomainRecord {
    /// Check whether a status token is present.
    ///
    /// Comparison ignores case and all whitespace, so "client transfer
    /// prohibited" and "clientTransferProhibited" both match
    /// `"clienttransferprohibited"`.
    pub fn has_status(&self, token: &str) -> bool {
        let wanted = status_key(token);
        self.status.iter().any(|s| status_key(s) == wanted)
    }

    pub fn client_delete_prohibited(&self) -> bool {
        self.has_status(CLIENT_DELETE_PROHIBITED)
    }

    pub fn client_transfer_prohibited(&self) -> bool {
        self.has_status(CLIENT_TRANSFER_PROHIBITED)
    }

    pub fn client_update_prohibited(&self) -> bool {
        self.has_status(CLIENT_UPDATE_PROHIBITED)
    }

    pub fn server_delete_prohibited(&self) -> bool {
        self.has_status(SERVER_DELETE_PROHIBITED)
    }

    pub fn server_transfer_prohibited(&self) -> bool {
        self.has_status(SERVER_TRANSFER_PROHIBITED)
    }

    pub fn server_update_prohibited(&self) -> bool {
        self.has_status(SERVER_UPDATE_PROHIBITED)
    }

    /// All six derived flags, keyed by column name.
    pub fn status_flags(&self) -> [(&'static str, bool); 6] {
        [
            ("client_delete_prohibited", self.client_delete_prohibited()),
            ("client_transfer_prohibited", self.client_transfer_prohibited()),
            ("client_update_prohibited", self.client_update_prohibited()),
            ("server_delete_prohibited", self.server_delete_prohibited()),
            ("server_transfer_prohibited", self.server_transfer_prohibited()),
            ("server_update_prohibited", self.server_update_prohibited()),
        ]
    }
}

fn status_key(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Receives the records produced by a lookup.
///
/// A lookup pushes exactly one record when the domain is found and nothing
/// when it is not.
pub trait RecordSink {
    fn push(&mut self, record: DomainRecord);
}

impl RecordSink for Vec<DomainRecord> {
    fn push(&mut self, record: DomainRecord) {
        Vec::push(self, record);
    }
}

/// Configuration options for lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Overall deadline for one lookup, covering RDAP, WHOIS and retries
    /// Default: 60 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Timeout for the RDAP request
    /// Default: 10 seconds
    #[serde(skip)]
    pub rdap_timeout: Duration,

    /// Timeout for each WHOIS connect and read
    /// Default: 10 seconds
    #[serde(skip)]
    pub whois_timeout: Duration,

    /// Whether to consult the IANA bootstrap registry for TLDs missing from
    /// the built-in RDAP map
    /// Default: true
    pub enable_bootstrap: bool,

    /// Whether any RDAP failure falls back to WHOIS. When false, only a
    /// missing RDAP service falls back and other RDAP errors are returned.
    /// Default: true
    pub fallback_on_rdap_error: bool,

    /// Maximum WHOIS attempts, including the first one
    /// Default: 10
    pub retry_max_attempts: usize,

    /// First delay of the Fibonacci retry sequence
    /// Default: 100 milliseconds
    #[serde(skip)]
    pub retry_base_delay: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            rdap_timeout: Duration::from_secs(10),
            whois_timeout: Duration::from_secs(10),
            enable_bootstrap: true,
            fallback_on_rdap_error: true,
            retry_max_attempts: 10,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

impl LookupConfig {
    /// Set the overall lookup deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the RDAP request timeout.
    pub fn with_rdap_timeout(mut self, timeout: Duration) -> Self {
        self.rdap_timeout = timeout;
        self
    }

    /// Set the WHOIS connect/read timeout.
    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    /// Enable or disable IANA bootstrap discovery.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.enable_bootstrap = enabled;
        self
    }

    /// Choose whether unexpected RDAP failures fall back to WHOIS.
    pub fn with_fallback_on_rdap_error(mut self, enabled: bool) -> Self {
        self.fallback_on_rdap_error = enabled;
        self
    }

    /// Set the WHOIS retry budget. Capped at 50 attempts.
    pub fn with_retry_attempts(mut self, attempts: usize) -> Self {
        self.retry_max_attempts = attempts.min(50);
        self
    }

    /// Set the first retry delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSource::Rdap => write!(f, "RDAP"),
            RecordSource::Whois => write!(f, "WHOIS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_status(status: &[&str]) -> DomainRecord {
        DomainRecord {
            domain: "example.com".to_string(),
            status: status.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_status_sets_single_flag() {
        let record = record_with_status(&["clientTransferProhibited"]);
        let flags = record.status_flags();

        for (name, value) in flags {
            assert_eq!(value, name == "client_transfer_prohibited", "{}", name);
        }
    }

    #[test]
    fn test_status_match_ignores_case_and_spaces() {
        let record = record_with_status(&["server delete prohibited", "CLIENTUPDATEPROHIBITED"]);
        assert!(record.server_delete_prohibited());
        assert!(record.client_update_prohibited());
        assert!(!record.client_delete_prohibited());
    }

    #[test]
    fn test_status_match_requires_whole_token() {
        let record = record_with_status(&["clientTransferProhibitedPending"]);
        assert!(!record.client_transfer_prohibited());
    }

    #[test]
    fn test_empty_status_sets_no_flags() {
        let record = record_with_status(&[]);
        assert!(record.status_flags().iter().all(|(_, v)| !v));
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<DomainRecord> = Vec::new();
        RecordSink::push(&mut sink, record_with_status(&[]));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = LookupConfig::default();
        assert_eq!(config.retry_max_attempts, 10);
        assert_eq!(config.retry_base_delay, Duration::from_millis(100));
        assert!(config.enable_bootstrap);
        assert!(config.fallback_on_rdap_error);
    }

    #[test]
    fn test_retry_attempts_capped() {
        let config = LookupConfig::default().with_retry_attempts(500);
        assert_eq!(config.retry_max_attempts, 50);
    }

    #[test]
    fn test_contact_is_empty() {
        assert!(Contact::default().is_empty());
        let contact = Contact {
            email: Some("abuse@example.com".to_string()),
            ..Default::default()
        };
        assert!(!contact.is_empty());
    }
}
