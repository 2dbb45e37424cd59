//! RDAP (Registration Data Access Protocol) implementation.
//!
//! This module queries RDAP servers for domain objects and decodes the
//! response into typed structures. Fields the lookup pipeline reads are
//! typed; the rest of the object is kept as opaque JSON so it can be handed
//! back to callers untouched.

use crate::error::WhoisDomainError;
use crate::protocols::registry::{extract_tld, get_rdap_endpoint};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Media type registered for RDAP responses.
const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// RDAP client for domain queries.
///
/// Handles endpoint discovery, request formatting and response decoding.
/// One client owns one `reqwest::Client`, so connections are pooled across
/// the requests it makes.
#[derive(Clone)]
pub struct RdapClient {
    /// HTTP client for making RDAP requests
    http_client: reqwest::Client,
    /// Timeout for a single RDAP request
    timeout: Duration,
    /// Whether to use IANA bootstrap for unknown TLDs
    use_bootstrap: bool,
}

impl RdapClient {
    /// Create a new RDAP client.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, WhoisDomainError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("whois-domain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WhoisDomainError::internal(format!("Failed to create RDAP HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
            use_bootstrap,
        })
    }

    /// Resolve the RDAP base URL serving `domain`.
    ///
    /// # Errors
    ///
    /// Returns `NoRdapServer` when neither the built-in map nor the bootstrap
    /// registry knows the TLD.
    pub async fn endpoint_for(&self, domain: &str) -> Result<String, WhoisDomainError> {
        let tld = extract_tld(domain)?;
        get_rdap_endpoint(&self.http_client, &tld, self.use_bootstrap)
            .await?
            .ok_or_else(|| WhoisDomainError::no_rdap_server(domain))
    }

    /// Query the domain object for `domain`.
    ///
    /// # Errors
    ///
    /// Returns `WhoisDomainError` if:
    /// - No RDAP endpoint is available for the TLD
    /// - The server answers with anything other than 200 (including 404)
    /// - Network errors occur or the request times out
    /// - The response cannot be decoded as a domain object
    pub async fn query_domain(&self, domain: &str) -> Result<RdapDomain, WhoisDomainError> {
        let endpoint = self.endpoint_for(domain).await?;
        let url = format!("{}{}", endpoint, domain);

        debug!(domain = %domain, url = %url, "Sending RDAP request");

        match tokio::time::timeout(self.timeout, self.fetch(&url, domain)).await {
            Ok(result) => result,
            Err(_) => Err(WhoisDomainError::timeout("RDAP request", self.timeout)),
        }
    }

    async fn fetch(&self, url: &str, domain: &str) -> Result<RdapDomain, WhoisDomainError> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, RDAP_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WhoisDomainError::timeout("RDAP request", self.timeout)
                } else {
                    WhoisDomainError::rdap(domain, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        debug!(domain = %domain, status = %status, "RDAP response");

        match status {
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| {
                    WhoisDomainError::rdap(domain, format!("Failed to read response: {}", e))
                })?;
                parse_rdap_domain(domain, &body)
            }
            StatusCode::NOT_FOUND => Err(WhoisDomainError::rdap_with_status(
                domain,
                "Domain object not found",
                status.as_u16(),
            )),
            code => Err(WhoisDomainError::rdap_with_status(
                domain,
                format!("RDAP server returned error: {}", code),
                code.as_u16(),
            )),
        }
    }
}

/// Decode an RDAP domain object from a response body.
pub fn parse_rdap_domain(domain: &str, body: &str) -> Result<RdapDomain, WhoisDomainError> {
    serde_json::from_str(body)
        .map_err(|e| WhoisDomainError::rdap(domain, format!("Failed to parse JSON: {}", e)))
}

/// An RDAP domain object (RFC 9083 section 5.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdapDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldh_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode_name: Option<String>,

    /// Hostname of the registry WHOIS server
    #[serde(default, rename = "port43", skip_serializing_if = "Option::is_none")]
    pub port43: Option<String>,

    #[serde(default)]
    pub status: Vec<String>,

    #[serde(default)]
    pub nameservers: Vec<Nameserver>,

    #[serde(default)]
    pub events: Vec<Event>,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default, rename = "secureDNS", skip_serializing_if = "Option::is_none")]
    pub secure_dns: Option<SecureDns>,

    #[serde(default, rename = "rdapConformance", skip_serializing_if = "Option::is_none")]
    pub conformance: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notices: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ids: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nameserver {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldh_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode_name: Option<String>,
}

/// A lifecycle event such as "registration" or "expiration".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub event_action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_actor: Option<String>,

    #[serde(default)]
    pub event_date: String,
}

/// A contact or organization linked to an RDAP object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcard_array: Option<VCard>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ids: Option<Value>,
}

impl Entity {
    /// Whether the entity carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureDns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_signed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation_signed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sig_life: Option<u64>,
}

/// A decoded jCard (RFC 7095).
///
/// On the wire a jCard is `["vcard", [[name, {params}, type, value...], ...]]`.
/// Structured values (nested arrays) are flattened into plain strings, so
/// an `adr` property becomes a list of its non-empty components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct VCard {
    pub properties: Vec<VCardProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VCardProperty {
    pub name: String,
    pub parameters: BTreeMap<String, Vec<String>>,
    pub value_type: String,
    pub values: Vec<String>,
}

impl VCard {
    /// All properties named `name`, case-insensitively.
    pub fn get<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VCardProperty> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }
}

impl VCardProperty {
    /// Values joined with a single space.
    pub fn joined(&self) -> String {
        self.values.join(" ")
    }
}

impl TryFrom<Value> for VCard {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let outer = value.as_array().ok_or("jCard must be an array")?;

        match outer.first().and_then(Value::as_str) {
            Some("vcard") => {}
            _ => return Err("jCard must start with \"vcard\"".to_string()),
        }

        let raw_properties = match outer.get(1) {
            Some(Value::Array(props)) => props.as_slice(),
            None => &[],
            Some(_) => return Err("jCard properties must be an array".to_string()),
        };

        let properties = raw_properties
            .iter()
            .filter_map(Value::as_array)
            .filter_map(|prop| decode_property(prop))
            .collect();

        Ok(Self { properties })
    }
}

fn decode_property(prop: &[Value]) -> Option<VCardProperty> {
    if prop.len() < 4 {
        return None;
    }

    let name = prop[0].as_str()?.to_lowercase();

    let mut parameters = BTreeMap::new();
    if let Some(params) = prop[1].as_object() {
        for (key, value) in params {
            let mut flat = Vec::new();
            flatten_into(value, &mut flat);
            parameters.insert(key.to_lowercase(), flat);
        }
    }

    let value_type = prop[2].as_str().unwrap_or("text").to_string();

    let mut values = Vec::new();
    for value in &prop[3..] {
        flatten_into(value, &mut values);
    }

    Some(VCardProperty {
        name,
        parameters,
        value_type,
        values,
    })
}

fn flatten_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        _ => {}
    }
}

impl From<VCard> for Value {
    fn from(card: VCard) -> Self {
        let properties: Vec<Value> = card
            .properties
            .into_iter()
            .map(|p| {
                let params: serde_json::Map<String, Value> = p
                    .parameters
                    .into_iter()
                    .map(|(k, mut v)| {
                        let value = if v.len() == 1 {
                            Value::String(v.remove(0))
                        } else {
                            Value::from(v)
                        };
                        (k, value)
                    })
                    .collect();

                let mut entry = vec![
                    Value::String(p.name),
                    Value::Object(params),
                    Value::String(p.value_type),
                ];
                match p.values.len() {
                    0 => entry.push(Value::String(String::new())),
                    1 => entry.extend(p.values.into_iter().map(Value::String)),
                    _ => entry.push(Value::from(p.values)),
                }
                Value::Array(entry)
            })
            .collect();

        Value::Array(vec![
            Value::String("vcard".to_string()),
            Value::Array(properties),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRAR_JSON: &str = r#"{
        "objectClassName": "domain",
        "handle": "2336799_DOMAIN_COM-VRSN",
        "ldhName": "EXAMPLE.COM",
        "port43": "whois.verisign-grs.com",
        "status": ["client delete prohibited", "client transfer prohibited"],
        "nameservers": [
            {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"}
        ],
        "secureDNS": {"delegationSigned": true},
        "events": [
            {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
            {"eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z"}
        ],
        "entities": [{
            "objectClassName": "entity",
            "handle": "376",
            "roles": ["registrar"],
            "publicIds": [{"type": "IANA Registrar ID", "identifier": "376"}],
            "vcardArray": ["vcard", [
                ["version", {}, "text", "4.0"],
                ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
            ]],
            "entities": [{
                "roles": ["abuse"],
                "vcardArray": ["vcard", [
                    ["tel", {"type": ["voice", "work"]}, "uri", "tel:+1.3105551212"],
                    ["email", {}, "text", "abuse@iana.org"]
                ]]
            }]
        }],
        "rdapConformance": ["rdap_level_0"],
        "notices": [{"title": "Terms of Use", "description": ["..."]}]
    }"#;

    #[tokio::test]
    async fn test_rdap_client_creation() {
        let client = RdapClient::with_config(Duration::from_secs(5), false);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_transport_failure_names_the_domain() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = RdapClient::with_config(Duration::from_secs(5), false).unwrap();
        let url = format!("http://127.0.0.1:{}/domain/example.com", port);
        let err = client.fetch(&url, "example.com").await.unwrap_err();

        match err {
            WhoisDomainError::RdapError { domain, .. } => assert_eq!(domain, "example.com"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tld_has_no_server() {
        let client = RdapClient::with_config(Duration::from_secs(5), false).unwrap();
        let err = client.query_domain("example.unknowntld123").await.unwrap_err();
        assert!(err.is_no_rdap_server());
    }

    #[test]
    fn test_parse_domain_object() {
        let domain = parse_rdap_domain("example.com", REGISTRAR_JSON).unwrap();

        assert_eq!(domain.ldh_name.as_deref(), Some("EXAMPLE.COM"));
        assert_eq!(domain.port43.as_deref(), Some("whois.verisign-grs.com"));
        assert_eq!(domain.status.len(), 2);
        assert_eq!(domain.events[0].event_action, "registration");
        assert_eq!(
            domain.secure_dns.as_ref().and_then(|s| s.delegation_signed),
            Some(true)
        );
        assert!(domain.conformance.is_some());
        assert!(domain.notices.is_some());
        assert!(domain.links.is_none());

        let registrar = &domain.entities[0];
        assert!(registrar.has_role("registrar"));
        assert!(registrar.entities[0].has_role("abuse"));
    }

    #[test]
    fn test_vcard_decoding_flattens_values() {
        let value = serde_json::json!(["vcard", [
            ["fn", {}, "text", "Jane Doe"],
            ["adr", {"cc": "US"}, "text", ["", "", "123 Main St", "Springfield", "IL", "62701", ""]],
            ["tel", {"type": ["voice", "work"]}, "uri", "tel:+1.5555551212"],
            ["org", {}, "text", "Example", "Inc"],
            ["broken"]
        ]]);

        let card: VCard = serde_json::from_value(value).unwrap();
        assert_eq!(card.properties.len(), 4);

        let adr = card.get("adr").next().unwrap();
        assert_eq!(adr.values, vec!["123 Main St", "Springfield", "IL", "62701"]);
        assert_eq!(adr.parameters.get("cc"), Some(&vec!["US".to_string()]));

        let tel = card.get("TEL").next().unwrap();
        assert_eq!(tel.value_type, "uri");
        assert_eq!(tel.parameters.get("type").map(Vec::len), Some(2));

        assert_eq!(card.get("org").next().unwrap().joined(), "Example Inc");
    }

    #[test]
    fn test_vcard_rejects_non_jcard() {
        let result: Result<VCard, _> = serde_json::from_value(serde_json::json!({"fn": "x"}));
        assert!(result.is_err());

        let result: Result<VCard, _> = serde_json::from_value(serde_json::json!(["vcard"]));
        assert!(result.unwrap().properties.is_empty());
    }

    #[test]
    fn test_domain_object_serializes_back_to_rdap_names() {
        let domain = parse_rdap_domain("example.com", REGISTRAR_JSON).unwrap();
        let json = serde_json::to_value(&domain).unwrap();

        assert_eq!(json["ldhName"], "EXAMPLE.COM");
        assert_eq!(json["secureDNS"]["delegationSigned"], true);
        assert_eq!(json["rdapConformance"][0], "rdap_level_0");
        assert_eq!(json["entities"][0]["vcardArray"][0], "vcard");

        let reparsed: RdapDomain = serde_json::from_value(json).unwrap();
        assert_eq!(reparsed.entities[0].vcard_array, domain.entities[0].vcard_array);
    }

    #[test]
    fn test_invalid_json_is_rdap_error() {
        let err = parse_rdap_domain("example.com", "not json").unwrap_err();
        assert!(matches!(err, WhoisDomainError::RdapError { .. }));
    }
}
