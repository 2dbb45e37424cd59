//! RDAP service discovery.
//!
//! Maps a TLD to the base URL of its RDAP service, first from a small
//! built-in table and then from the IANA bootstrap registry. The bootstrap
//! file is fetched for the lookup that needs it and is not kept between
//! lookups.

use crate::error::WhoisDomainError;
use std::collections::HashMap;
use tracing::debug;

/// IANA RDAP bootstrap file for DNS.
pub const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Built-in RDAP endpoints for common TLDs.
///
/// Every endpoint ends with `/domain/` so the domain name can be appended
/// directly.
pub fn get_rdap_registry_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        ("org", "https://rdap.publicinterestregistry.org/rdap/domain/"),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("br", "https://rdap.registro.br/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
    ])
}

/// Find the RDAP endpoint for a TLD.
///
/// Lookup order:
/// 1. Built-in registry map (no network)
/// 2. IANA bootstrap registry, when `use_bootstrap` is set
///
/// Returns `Ok(None)` when no RDAP service is known for the TLD.
///
/// # Errors
///
/// Returns `BootstrapError` if the bootstrap registry cannot be fetched or
/// is malformed.
pub async fn get_rdap_endpoint(
    http_client: &reqwest::Client,
    tld: &str,
    use_bootstrap: bool,
) -> Result<Option<String>, WhoisDomainError> {
    let tld_lower = tld.to_lowercase();

    if let Some(endpoint) = get_rdap_registry_map().get(tld_lower.as_str()) {
        return Ok(Some(endpoint.to_string()));
    }

    if !use_bootstrap || !cfg!(feature = "bootstrap") {
        debug!(tld = %tld_lower, "No built-in RDAP endpoint and bootstrap disabled");
        return Ok(None);
    }

    let endpoints = fetch_bootstrap(http_client).await?;
    Ok(endpoints.get(&tld_lower).cloned())
}

/// Download the IANA bootstrap registry and index it by TLD.
pub async fn fetch_bootstrap(
    http_client: &reqwest::Client,
) -> Result<HashMap<String, String>, WhoisDomainError> {
    debug!(url = BOOTSTRAP_URL, "Fetching RDAP bootstrap registry");

    let response = http_client.get(BOOTSTRAP_URL).send().await.map_err(|e| {
        WhoisDomainError::bootstrap("*", format!("Failed to fetch bootstrap registry: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(WhoisDomainError::bootstrap(
            "*",
            format!("Bootstrap registry returned HTTP {}", response.status()),
        ));
    }

    let json: serde_json::Value = response.json().await.map_err(|e| {
        WhoisDomainError::bootstrap("*", format!("Failed to parse bootstrap JSON: {}", e))
    })?;

    parse_bootstrap(&json)
}

/// Index the `services` array of an IANA bootstrap document by TLD.
///
/// Each service is `[[tld, ...], [url, ...]]`; the first URL wins.
pub fn parse_bootstrap(
    json: &serde_json::Value,
) -> Result<HashMap<String, String>, WhoisDomainError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| {
            WhoisDomainError::bootstrap(
                "*",
                "Invalid bootstrap JSON: missing or invalid 'services' array",
            )
        })?;

    let mut endpoints = HashMap::new();

    for service in services.iter().filter_map(|s| s.as_array()) {
        if service.len() < 2 {
            continue;
        }

        let url = service[1]
            .as_array()
            .and_then(|urls| urls.first())
            .and_then(|u| u.as_str());

        if let (Some(url), Some(tlds)) = (url, service[0].as_array()) {
            let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
            for tld in tlds.iter().filter_map(|t| t.as_str()) {
                endpoints.insert(tld.to_lowercase(), endpoint.clone());
            }
        }
    }

    Ok(endpoints)
}

/// Extract the TLD (the label after the final dot) from a domain name.
///
/// # Errors
///
/// Returns `InvalidDomain` if the name has no dot or an empty final label.
pub fn extract_tld(domain: &str) -> Result<String, WhoisDomainError> {
    match domain.trim_end_matches('.').rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(WhoisDomainError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}
