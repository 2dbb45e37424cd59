//! Protocol implementations for registration lookups.
//!
//! This module contains the network side of a lookup: RDAP queries, raw
//! WHOIS exchanges, and RDAP service discovery.

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// WHOIS wire protocol implementation
pub mod whois;

/// Registry mappings and bootstrap discovery
pub mod registry;

// Re-export commonly used functions and types
pub use rdap::{Entity, Event, Nameserver, RdapClient, RdapDomain, SecureDns, VCard, VCardProperty};
pub use registry::{extract_tld, get_rdap_endpoint, get_rdap_registry_map};
pub use whois::WhoisClient;
