//! Lookup orchestration.
//!
//! This module provides `DomainLookup`, which decides which protocol answers
//! a query: RDAP first, then WHOIS with retries, with every outcome mapped to
//! "record", "no record" or an error.

use crate::error::WhoisDomainError;
use crate::normalize::rdap_to_record;
use crate::parser::parse_whois;
use crate::protocols::{RdapClient, RdapDomain, WhoisClient};
use crate::retry::RetryPolicy;
use crate::types::{DomainRecord, LookupConfig, RecordSink};
use crate::utils::{to_ascii, validate_domain};
use futures::stream::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, info, warn};

/// Prefix some registries use instead of an error for unknown domains.
pub const NO_MATCH_PREFIX: &str = "No match for";

/// Looks up registration data for one domain at a time.
///
/// # Example
///
/// ```rust,no_run
/// use whois_domain_lib::DomainLookup;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let lookup = DomainLookup::new()?;
///     match lookup.lookup("example.com").await? {
///         Some(record) => println!("{} expires {:?}", record.domain, record.expiration_date),
///         None => println!("not registered"),
///     }
///     Ok(())
/// }
/// ```
pub struct DomainLookup {
    /// Configuration settings for this instance
    config: LookupConfig,
    /// RDAP client, tried first
    rdap_client: RdapClient,
    /// WHOIS client used as fallback
    whois_client: WhoisClient,
    /// Retry policy for the WHOIS stage
    retry: RetryPolicy,
}

impl DomainLookup {
    /// Create a lookup with default configuration.
    pub fn new() -> Result<Self, WhoisDomainError> {
        Self::with_config(LookupConfig::default())
    }

    /// Create a lookup with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the retry budget is zero, or an internal
    /// error if the HTTP client cannot be built.
    ///
    /// # Example
    ///
    /// ```rust
    /// use whois_domain_lib::{DomainLookup, LookupConfig};
    /// use std::time::Duration;
    ///
    /// let config = LookupConfig::default()
    ///     .with_timeout(Duration::from_secs(30))
    ///     .with_bootstrap(false);
    ///
    /// let lookup = DomainLookup::with_config(config).unwrap();
    /// ```
    pub fn with_config(config: LookupConfig) -> Result<Self, WhoisDomainError> {
        let retry = RetryPolicy::fibonacci(config.retry_base_delay, config.retry_max_attempts)?;
        let rdap_client = RdapClient::with_config(config.rdap_timeout, config.enable_bootstrap)?;
        let whois_client = WhoisClient::with_timeout(config.whois_timeout);

        Ok(Self {
            config,
            rdap_client,
            whois_client,
            retry,
        })
    }

    /// Replace the WHOIS client, e.g. to pin queries to one server.
    pub fn with_whois_client(mut self, whois_client: WhoisClient) -> Self {
        self.whois_client = whois_client;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Look up one domain.
    ///
    /// The process:
    /// 1. Validates the domain name
    /// 2. Queries RDAP and normalizes the answer
    /// 3. On RDAP failure, queries WHOIS with Fibonacci-backoff retries
    /// 4. Parses the WHOIS text
    ///
    /// Returns `Ok(None)` when the registry reports the domain as unknown.
    /// The whole process is bounded by `LookupConfig::timeout`.
    ///
    /// # Errors
    ///
    /// Returns `WhoisDomainError` if:
    /// - The domain name is invalid
    /// - WHOIS fails with a non-transient error, or retries run out
    /// - The registry refuses the query (reserved, rate limited, ...)
    /// - The overall deadline passes
    /// - RDAP fails and `fallback_on_rdap_error` is disabled
    pub async fn lookup(&self, domain: &str) -> Result<Option<DomainRecord>, WhoisDomainError> {
        let domain = validate_domain(domain)?;

        match tokio::time::timeout(self.config.timeout, self.run_lookup(&domain)).await {
            Ok(result) => result,
            Err(_) => {
                error!(domain = %domain, timeout = ?self.config.timeout, "Lookup deadline exceeded");
                Err(WhoisDomainError::timeout(
                    format!("lookup of {}", domain),
                    self.config.timeout,
                ))
            }
        }
    }

    /// Look up one domain and push the record, if any, into `sink`.
    pub async fn lookup_into<S>(&self, domain: &str, sink: &mut S) -> Result<(), WhoisDomainError>
    where
        S: RecordSink + ?Sized,
    {
        if let Some(record) = self.lookup(domain).await? {
            sink.push(record);
        }
        Ok(())
    }

    /// Look up one domain as a stream of zero or one items.
    ///
    /// ```rust,no_run
    /// use futures::StreamExt;
    /// use whois_domain_lib::DomainLookup;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let lookup = DomainLookup::new()?;
    ///     let mut stream = lookup.lookup_stream("example.com");
    ///     while let Some(result) = stream.next().await {
    ///         println!("{:?}", result?.registrar);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn lookup_stream<'a>(
        &'a self,
        domain: &'a str,
    ) -> Pin<Box<dyn Stream<Item = Result<DomainRecord, WhoisDomainError>> + Send + 'a>> {
        let stream = futures::stream::once(self.lookup(domain))
            .filter_map(|result| async move { result.transpose() });
        Box::pin(stream)
    }

    /// Fetch the RDAP domain object without normalizing it.
    ///
    /// Returns `Ok(None)` when no RDAP service exists for the TLD.
    pub async fn lookup_rdap(&self, domain: &str) -> Result<Option<RdapDomain>, WhoisDomainError> {
        let domain = validate_domain(domain)?;
        let query = to_ascii(&domain);

        let result = tokio::time::timeout(self.config.timeout, self.rdap_client.query_domain(&query))
            .await
            .map_err(|_| WhoisDomainError::timeout(format!("RDAP lookup of {}", domain), self.config.timeout))?;

        match result {
            Ok(rdap) => Ok(Some(rdap)),
            Err(e) if e.is_no_rdap_server() => {
                debug!(domain = %domain, "No RDAP server for domain");
                Ok(None)
            }
            Err(e) => {
                error!(domain = %domain, error = %e, "RDAP lookup failed");
                Err(e)
            }
        }
    }

    async fn run_lookup(&self, domain: &str) -> Result<Option<DomainRecord>, WhoisDomainError> {
        let query = to_ascii(domain);

        match self.rdap_client.query_domain(&query).await {
            Ok(rdap) => {
                debug!(domain = %domain, rdap = ?rdap, "RDAP answer");
                let record = rdap_to_record(domain, &rdap);
                info!(domain = %domain, source = %record.source, "Lookup complete");
                return Ok(Some(record));
            }
            Err(e) if e.is_no_rdap_server() => {
                debug!(domain = %domain, "No RDAP server, using WHOIS");
            }
            Err(e) if self.config.fallback_on_rdap_error => {
                warn!(domain = %domain, error = %e, "RDAP lookup failed, falling back to WHOIS");
            }
            Err(e) => {
                error!(domain = %domain, error = %e, "RDAP lookup failed");
                return Err(e);
            }
        }

        let raw = fetch_whois_with_retry(&self.retry, domain, || self.whois_client.query(&query)).await?;
        classify_whois_response(domain, &raw)
    }
}

/// Run a WHOIS fetch under `policy`.
///
/// Only connection resets and the empty-domain artifact are retried.
pub async fn fetch_whois_with_retry<F, Fut>(
    policy: &RetryPolicy,
    domain: &str,
    fetch: F,
) -> Result<String, WhoisDomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, WhoisDomainError>>,
{
    policy
        .run(fetch, WhoisDomainError::is_retryable)
        .await
        .map_err(|e| {
            error!(domain = %domain, error = %e, "WHOIS lookup failed");
            e
        })
}

/// Turn raw WHOIS text into the lookup outcome.
///
/// "No match for" answers and parser `NotFound`/`DataInvalid` become
/// `Ok(None)`; other parse failures are errors.
pub fn classify_whois_response(
    domain: &str,
    raw: &str,
) -> Result<Option<DomainRecord>, WhoisDomainError> {
    if raw.starts_with(NO_MATCH_PREFIX) {
        warn!(domain = %domain, "WHOIS reports no match");
        return Ok(None);
    }

    match parse_whois(raw) {
        Ok(record) => {
            info!(domain = %domain, source = %record.source, "Lookup complete");
            Ok(Some(record))
        }
        Err(e) if e.is_not_found() => {
            warn!(domain = %domain, outcome = %e, "WHOIS has no record");
            debug!(domain = %domain, raw = %raw, "WHOIS response");
            Ok(None)
        }
        Err(e) => {
            error!(domain = %domain, error = %e, "WHOIS parse failed");
            debug!(domain = %domain, raw = %raw, "WHOIS response");
            Err(WhoisDomainError::parse(domain, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const REGISTERED: &str = "Domain Name: EXAMPLE.COM\nCreation Date: 1995-08-14T04:00:00Z\nName Server: A.IANA-SERVERS.NET\nDomain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\n";

    fn reset() -> WhoisDomainError {
        WhoisDomainError::ConnectionReset {
            domain: "example.com".to_string(),
        }
    }

    #[test]
    fn test_lookup_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DomainLookup>();
    }

    #[test]
    fn test_no_match_prefix_is_not_found() {
        let outcome = assert_ok!(classify_whois_response(
            "nope.com",
            "No match for \"NOPE.COM\".\r\n>>> Last update of whois database <<<\n"
        ));
        assert!(outcome.is_none());
    }

    #[test]
    fn test_not_found_parse_outcomes_are_none() {
        assert!(assert_ok!(classify_whois_response("nope.org", "Domain not found.\n")).is_none());
        assert!(assert_ok!(classify_whois_response(
            "example.com",
            "Domain Name: example.com\n"
        ))
        .is_none());
    }

    #[test]
    fn test_fatal_parse_outcome_is_error() {
        let err = assert_err!(classify_whois_response(
            "example.com",
            "Domain name is reserved by the registry\n"
        ));
        assert!(matches!(
            err,
            WhoisDomainError::ParseError {
                source: ParseError::Reserved,
                ..
            }
        ));
    }

    #[test]
    fn test_registered_response_yields_record() {
        let record = assert_ok!(classify_whois_response("example.com", REGISTERED)).unwrap();
        assert_eq!(record.domain, "example.com");
        assert!(record.client_transfer_prohibited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whois_stage_recovers_after_resets() {
        let attempts = AtomicUsize::new(0);
        let raw = fetch_whois_with_retry(&RetryPolicy::default(), "example.com", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(reset())
                } else {
                    Ok(REGISTERED.to_string())
                }
            }
        })
        .await;

        let raw = assert_ok!(raw);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert!(assert_ok!(classify_whois_response("example.com", &raw)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whois_stage_retries_empty_domain_artifact() {
        let attempts = AtomicUsize::new(0);
        let raw = fetch_whois_with_retry(&RetryPolicy::default(), "example.com", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(WhoisDomainError::whois("example.com", "domain is empty"))
                } else {
                    Ok(REGISTERED.to_string())
                }
            }
        })
        .await;

        assert_ok!(raw);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whois_stage_non_retryable_single_attempt() {
        let attempts = AtomicUsize::new(0);
        let result = fetch_whois_with_retry(&RetryPolicy::default(), "example.com", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(WhoisDomainError::whois("example.com", "connection refused")) }
        })
        .await;

        assert_err!(result);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_retry_budget_rejected() {
        let mut config = LookupConfig::default();
        config.retry_max_attempts = 0;
        assert!(matches!(
            DomainLookup::with_config(config),
            Err(WhoisDomainError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_domain_is_invalid() {
        let lookup = DomainLookup::new().unwrap();
        let err = assert_err!(lookup.lookup("   ").await);
        assert!(matches!(err, WhoisDomainError::InvalidDomain { .. }));
    }

    #[tokio::test]
    async fn test_lookup_rdap_without_server_is_none() {
        let lookup = DomainLookup::with_config(
            LookupConfig::default()
                .with_bootstrap(false)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap();

        let result = assert_ok!(lookup.lookup_rdap("example.unknowntld123").await);
        assert!(result.is_none());
    }
}
