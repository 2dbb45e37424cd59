//! Utility functions for domain name handling.

use crate::error::WhoisDomainError;

/// Longest textual domain name allowed by DNS.
const MAX_DOMAIN_LENGTH: usize = 253;

/// Validate a domain name and return its canonical form.
///
/// The canonical form is trimmed, lowercased, and has any trailing root dot
/// removed. Only gross mistakes are rejected here; registries have the final
/// say on what exists.
///
/// # Errors
///
/// Returns `InvalidDomain` for empty names, names containing whitespace, and
/// names longer than 253 characters.
pub fn validate_domain(domain: &str) -> Result<String, WhoisDomainError> {
    let trimmed = domain.trim().trim_end_matches('.');

    if trimmed.is_empty() {
        return Err(WhoisDomainError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(WhoisDomainError::invalid_domain(
            domain,
            "Domain name cannot contain whitespace",
        ));
    }

    if trimmed.chars().count() > MAX_DOMAIN_LENGTH {
        return Err(WhoisDomainError::invalid_domain(
            domain,
            format!("Domain name exceeds {} characters", MAX_DOMAIN_LENGTH),
        ));
    }

    Ok(trimmed.to_lowercase())
}

/// ASCII (punycode) form of a domain for use on the wire.
///
/// Falls back to the input when IDNA conversion fails, leaving the registry
/// to reject it.
pub fn to_ascii(domain: &str) -> String {
    match idna::domain_to_ascii(domain) {
        Ok(ascii) if !ascii.is_empty() => ascii,
        _ => domain.to_string(),
    }
}
