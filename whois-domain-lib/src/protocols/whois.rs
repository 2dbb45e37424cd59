//! WHOIS protocol implementation.
//!
//! Speaks RFC 3912 directly: open TCP port 43, send the query line, read
//! until the server closes the connection. The authoritative server for a
//! TLD is discovered through IANA, and thin-registry answers that point at a
//! registrar WHOIS server are followed once.
//!
//! The client only moves text. It never interprets the response; that is
//! the parser's job.

use crate::error::{WhoisDomainError, EMPTY_DOMAIN_MESSAGE};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// IANA's WHOIS server, which knows the authoritative server for each TLD.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Upper bound on the bytes read from one server.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// WHOIS client speaking the wire protocol over TCP.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    /// Timeout applied separately to connecting and to reading the response
    timeout: Duration,
    /// Fixed server, bypassing discovery and referrals
    server: Option<(String, u16)>,
}

impl WhoisClient {
    /// Create a client that discovers servers through IANA.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            server: None,
        }
    }

    /// Create a client that always queries `host:port`.
    ///
    /// Discovery and registrar referrals are skipped.
    pub fn with_server<H: Into<String>>(timeout: Duration, host: H, port: u16) -> Self {
        Self {
            timeout,
            server: Some((host.into(), port)),
        }
    }

    /// Fetch the raw WHOIS text for `domain`.
    ///
    /// When the registry answer names a different registrar WHOIS server,
    /// that server is queried too and its text is appended after the
    /// registry's.
    ///
    /// # Errors
    ///
    /// Returns `WhoisDomainError` if:
    /// - The domain is empty
    /// - The connection cannot be established or times out
    /// - The server resets the connection (`ConnectionReset`)
    pub async fn query(&self, domain: &str) -> Result<String, WhoisDomainError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(WhoisDomainError::whois(domain, EMPTY_DOMAIN_MESSAGE));
        }

        if let Some((host, port)) = &self.server {
            return self.exchange(host, *port, domain, domain).await;
        }

        let server = self.discover_server(domain).await;
        let registry_text = self.exchange(&server, WHOIS_PORT, domain, domain).await?;

        let Some(referral) = find_registrar_referral(&registry_text, &server) else {
            return Ok(registry_text);
        };

        debug!(domain = %domain, server = %referral, "Following registrar WHOIS referral");
        match self.exchange(&referral, WHOIS_PORT, domain, domain).await {
            Ok(registrar_text) => Ok(format!("{}\n{}", registry_text, registrar_text)),
            Err(e) => {
                warn!(domain = %domain, server = %referral, error = %e, "Registrar WHOIS referral failed");
                Ok(registry_text)
            }
        }
    }

    /// Find the authoritative WHOIS server for the TLD of `domain`.
    ///
    /// Asks IANA first; when that fails or names no server, falls back to
    /// `<tld>.whois-servers.net`.
    pub async fn discover_server(&self, domain: &str) -> String {
        let tld = domain
            .trim_end_matches('.')
            .rsplit('.')
            .next()
            .unwrap_or(domain)
            .to_lowercase();

        match self.exchange(IANA_WHOIS_SERVER, WHOIS_PORT, &tld, domain).await {
            Ok(response) => {
                if let Some(server) = parse_iana_refer_response(&response) {
                    debug!(tld = %tld, server = %server, "IANA referral");
                    return server;
                }
            }
            Err(e) => debug!(tld = %tld, error = %e, "IANA referral lookup failed"),
        }

        format!("{}.whois-servers.net", tld)
    }

    /// Send `query` to `host:port` and read the full response.
    async fn exchange(
        &self,
        host: &str,
        port: u16,
        query: &str,
        domain: &str,
    ) -> Result<String, WhoisDomainError> {
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| WhoisDomainError::timeout(format!("WHOIS connect to {}", host), self.timeout))?
            .map_err(|e| map_io_error(domain, host, e))?;

        stream
            .write_all(format!("{}\r\n", query).as_bytes())
            .await
            .map_err(|e| map_io_error(domain, host, e))?;

        let mut buf = Vec::new();
        tokio::time::timeout(
            self.timeout,
            (&mut stream).take(MAX_RESPONSE_BYTES).read_to_end(&mut buf),
        )
        .await
        .map_err(|_| WhoisDomainError::timeout(format!("WHOIS read from {}", host), self.timeout))?
        .map_err(|e| map_io_error(domain, host, e))?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn map_io_error(domain: &str, host: &str, err: std::io::Error) -> WhoisDomainError {
    match err.kind() {
        ErrorKind::ConnectionReset => WhoisDomainError::ConnectionReset {
            domain: domain.to_string(),
        },
        _ => WhoisDomainError::whois(domain, format!("{}: {}", host, err)),
    }
}

/// Parse an IANA WHOIS response for the authoritative WHOIS server.
///
/// IANA uses either `refer:` or `whois:`; `refer:` wins when both appear.
///
/// ```text
/// whois:        whois.verisign-grs.com
/// refer:        whois.verisign-grs.com
/// ```
pub fn parse_iana_refer_response(response: &str) -> Option<String> {
    let mut whois_server = None;

    for line in response.lines() {
        let line = line.trim();
        if let Some(server) = line.strip_prefix("refer:") {
            let server = server.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        } else if let Some(server) = line.strip_prefix("whois:") {
            let server = server.trim();
            if !server.is_empty() {
                whois_server = Some(server.to_string());
            }
        }
    }

    whois_server
}

/// Find a `Registrar WHOIS Server:` line that points somewhere other than
/// `queried`.
///
/// Some registries publish the value as a URL; the scheme and path are
/// dropped.
pub fn find_registrar_referral(response: &str, queried: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(':')?;
        if !key.trim().eq_ignore_ascii_case("registrar whois server") {
            return None;
        }

        let host = value.trim();
        let host = host
            .strip_prefix("https://")
            .or_else(|| host.strip_prefix("http://"))
            .or_else(|| host.strip_prefix("whois://"))
            .unwrap_or(host);
        let host = host.split('/').next().unwrap_or(host).trim();

        if host.is_empty() || host.eq_ignore_ascii_case(queried) {
            None
        } else {
            Some(host.to_lowercase())
        }
    })
}
