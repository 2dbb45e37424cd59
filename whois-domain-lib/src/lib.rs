//! # WHOIS Domain Library
//!
//! Looks up domain registration data using RDAP and WHOIS, and returns it as
//! one normalized record regardless of which protocol answered.
//!
//! RDAP is always tried first. When no RDAP service covers the TLD, or the
//! RDAP query fails, the library falls back to WHOIS over TCP port 43 with a
//! Fibonacci retry policy, then parses the free-text response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whois_domain_lib::DomainLookup;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lookup = DomainLookup::new()?;
//!
//!     match lookup.lookup("example.com").await? {
//!         Some(record) => println!("{} via {} expires {:?}", record.domain, record.source, record.expiration_date),
//!         None => println!("example.com is not registered"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP Protocol**: Structured JSON queries against registry servers
//! - **WHOIS Fallback**: Registry and registrar referral lookups with retries
//! - **Bootstrap Registry**: IANA RDAP discovery for TLDs outside the built-in map
//! - **Lenient Parsing**: Free-text WHOIS parsing and date normalization

// Re-export main public API types and functions
pub use config::{
    load_env_config, load_env_config_from, parse_duration, resolve_lookup_config, ConfigManager,
    EnvConfig, FileConfig, LookupSection, OutputSection,
};
pub use dates::normalize_date;
pub use error::{ParseError, WhoisDomainError};
pub use lookup::{classify_whois_response, fetch_whois_with_retry, DomainLookup, NO_MATCH_PREFIX};
pub use normalize::{entity_to_contact, rdap_to_record};
pub use parser::parse_whois;
pub use protocols::{
    Entity, Event, Nameserver, RdapClient, RdapDomain, SecureDns, VCard, VCardProperty,
    WhoisClient,
};
pub use retry::RetryPolicy;
pub use types::{Contact, DomainRecord, LookupConfig, RecordSink, RecordSource};
pub use utils::validate_domain;

// Raw protocol access (registry map, IANA referral helpers)
pub mod protocols;

// Internal modules
mod config;
mod dates;
mod error;
mod lookup;
mod normalize;
mod parser;
mod retry;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisDomainError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "bootstrap")]
    features.push("bootstrap");

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_reports_default_features() {
        let info = info();
        assert_eq!(info.version, VERSION);
        assert_eq!(info.features, vec!["bootstrap"]);
    }
}
