//! WHOIS response parser.
//!
//! WHOIS has no grammar beyond "mostly `key: value` lines", so the parser is
//! deliberately conservative: it recognizes a fixed vocabulary of keys,
//! understands indented blocks (as used by Nominet and friends), and leaves
//! anything it does not recognize alone.
//!
//! A response either yields a `DomainRecord` or one of the `ParseError`
//! outcomes. `NotFound` and `DataInvalid` mean "no record"; the other
//! variants are registry refusals the caller should surface.

use crate::dates::normalize_date;
use crate::error::ParseError;
use crate::types::{Contact, DomainRecord, RecordSource};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KEY_SEPARATORS: Regex = Regex::new(r"[^a-z0-9]+").expect("static regex");
    static ref RATE_LIMITED: Regex = Regex::new(
        r"(?i)(query limit|rate limit exceeded|limit exceeded|too many requests|quota exceeded|exceeded the maximum allowable)"
    )
    .expect("static regex");
    static ref RESERVED: Regex = Regex::new(
        r"(?i)(domain (name )?(is|has been) reserved|this name is reserved|reserved (domain )?name|reserved by the registry)"
    )
    .expect("static regex");
    static ref PREMIUM: Regex =
        Regex::new(r"(?i)(premium domain|is a premium|premium name)").expect("static regex");
    static ref BLOCKED: Regex = Regex::new(
        r"(?i)(domain (name )?(is|has been) blocked|blocked by dpml|blocked due to)"
    )
    .expect("static regex");
    static ref NOT_FOUND: Regex = Regex::new(
        r"(?i)(no match|not found|no data found|no entries found|no information available|not registered|no matching (record|entry)|no object found|object does not exist|does not exist|status:\s*(free|available)|domain available|has not been registered|no found)"
    )
    .expect("static regex");
}

/// Parse raw WHOIS text into a record.
///
/// # Errors
///
/// - `Empty` for blank input
/// - `RateLimited`, `Reserved`, `Premium`, `Blocked` when the registry
///   refuses the query for that reason
/// - `NotFound` when the registry says the domain does not exist
/// - `DataInvalid` when the text lacks a domain name, or has neither name
///   servers nor a creation date
pub fn parse_whois(raw: &str) -> Result<DomainRecord, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut builder = RecordBuilder::default();
    let mut block: Option<Block> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        let block_key = block
            .as_ref()
            .filter(|b| indent > b.indent)
            .map(|b| b.key.clone());

        match split_pair(trimmed) {
            Some((key, value)) => {
                let key = normalize_key(key);
                if value.is_empty() {
                    block = Some(Block { key, indent });
                    continue;
                }

                let field = match &block_key {
                    Some(parent) => classify(&format!("{} {}", parent, key)).or_else(|| classify(&key)),
                    None => {
                        block = None;
                        classify(&key)
                    }
                };
                if let Some(field) = field {
                    builder.assign(field, value);
                }
            }
            None => match &block_key {
                Some(parent) => {
                    if let Some(field) = classify(parent) {
                        builder.assign(field, trimmed);
                    }
                }
                None => block = None,
            },
        }
    }

    builder.finish().ok_or_else(|| classify_refusal(raw))
}

/// Work out why a response produced no usable record.
fn classify_refusal(raw: &str) -> ParseError {
    if NOT_FOUND.is_match(raw) {
        ParseError::NotFound
    } else if RATE_LIMITED.is_match(raw) {
        ParseError::RateLimited
    } else if RESERVED.is_match(raw) {
        ParseError::Reserved
    } else if PREMIUM.is_match(raw) {
        ParseError::Premium
    } else if BLOCKED.is_match(raw) {
        ParseError::Blocked
    } else {
        ParseError::DataInvalid
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('%') || line.starts_with('#') || line.starts_with(">>>")
}

/// Split `key: value`, rejecting lines whose "key" is really data
/// (hostnames, addresses, URLs).
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty()
        || key.len() > 64
        || key.contains(['.', '@'])
        || value.starts_with("//")
    {
        return None;
    }
    Some((key, value.trim()))
}

/// Lowercase, drop apostrophes, and collapse punctuation into single spaces.
fn normalize_key(key: &str) -> String {
    let lowered = key.to_lowercase().replace('\'', "");
    KEY_SEPARATORS.replace_all(&lowered, " ").trim().to_string()
}

struct Block {
    key: String,
    indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Registrar,
    Registrant,
    Admin,
    Technical,
    Billing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactField {
    Id,
    Name,
    Organization,
    Street,
    City,
    Province,
    PostalCode,
    Country,
    Phone,
    Fax,
    Email,
    ReferralUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DomainName,
    DomainId,
    WhoisServer,
    Created,
    Updated,
    Expiration,
    Status,
    NameServer,
    Dnssec,
    Contact(Party, ContactField),
}

/// Map a normalized key to the field it fills.
fn classify(key: &str) -> Option<Field> {
    let field = match key {
        "domain" | "domain name" | "domainname" => Field::DomainName,
        "registry domain id" | "domain id" | "roid" | "domain object id" => Field::DomainId,
        "registrar whois server" | "whois server" | "whois" => Field::WhoisServer,
        "creation date" | "created" | "created on" | "created date" | "registered on"
        | "registered" | "registration date" | "registration time" | "domain registration date"
        | "domain create date" | "record created" => Field::Created,
        "updated date" | "updated" | "last updated" | "last updated on" | "last update"
        | "last modified" | "modified" | "changed" | "domain last updated date" => Field::Updated,
        "registry expiry date" | "registry expiration date" | "registrar registration expiration date"
        | "expiration date" | "expiry date" | "expires" | "expires on" | "expire date"
        | "expiration time" | "paid till" | "renewal date" | "domain expiration date"
        | "record expires" => Field::Expiration,
        "domain status" | "status" | "state" | "registration status" => Field::Status,
        "name server" | "name servers" | "nameserver" | "nameservers" | "nserver" | "dns" => {
            Field::NameServer
        }
        "dnssec" | "dnssec signed" => Field::Dnssec,
        _ => return party_field(key),
    };
    Some(field)
}

fn party_field(key: &str) -> Option<Field> {
    let mut words = key.split(' ');
    let party = match words.next()? {
        "registrar" => Party::Registrar,
        "registrant" | "registrants" | "holder" | "owner" => Party::Registrant,
        "admin" | "administrative" => Party::Admin,
        "tech" | "technical" => Party::Technical,
        "billing" => Party::Billing,
        _ => return None,
    };

    let rest: Vec<&str> = words.collect();
    let rest = match rest.as_slice() {
        ["contact", tail @ ..] => tail,
        other => other,
    };

    let field = match rest.join(" ").as_str() {
        "" | "name" => ContactField::Name,
        "id" | "handle" | "iana id" => ContactField::Id,
        "organization" | "organisation" | "org" | "company" => ContactField::Organization,
        "street" | "street1" | "street2" | "street3" | "address" => ContactField::Street,
        "city" => ContactField::City,
        "state province" | "state" | "province" | "region" => ContactField::Province,
        "postal code" | "postcode" | "zip" | "zip code" => ContactField::PostalCode,
        "country" | "country code" => ContactField::Country,
        "phone" | "phone number" | "tel" | "telephone" | "abuse contact phone" => {
            ContactField::Phone
        }
        "fax" | "fax number" | "facsimile" => ContactField::Fax,
        "email" | "e mail" | "abuse contact email" => ContactField::Email,
        "url" | "referral url" | "website" => ContactField::ReferralUrl,
        _ => return None,
    };

    Some(Field::Contact(party, field))
}

#[derive(Default)]
struct RecordBuilder {
    record: DomainRecord,
    domain: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    expiration: Option<String>,
}

impl RecordBuilder {
    fn assign(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        match field {
            Field::DomainName => {
                if let Some(name) = value.split_whitespace().next() {
                    set_once(&mut self.domain, name.trim_end_matches('.').to_lowercase());
                }
            }
            Field::DomainId => set_once(&mut self.record.domain_id, value.to_string()),
            Field::WhoisServer => set_once(&mut self.record.whois_server, value.to_lowercase()),
            Field::Created => set_once(&mut self.created, value.to_string()),
            Field::Updated => set_once(&mut self.updated, value.to_string()),
            Field::Expiration => set_once(&mut self.expiration, value.to_string()),
            Field::Status => {
                let status = strip_status_links(value);
                if !status.is_empty() {
                    push_unique(&mut self.record.status, status);
                }
            }
            Field::NameServer => {
                if let Some(host) = value.split_whitespace().next() {
                    let host = host.trim_end_matches('.').to_lowercase();
                    if !host.is_empty() {
                        push_unique(&mut self.record.name_servers, host);
                    }
                }
            }
            Field::Dnssec => {
                if is_signed(value) {
                    self.record.dnssec = true;
                }
            }
            Field::Contact(party, contact_field) => {
                set_contact_field(self.contact_mut(party), contact_field, value)
            }
        }
    }

    fn contact_mut(&mut self, party: Party) -> &mut Contact {
        let slot = match party {
            Party::Registrar => &mut self.record.registrar,
            Party::Registrant => &mut self.record.registrant,
            Party::Admin => &mut self.record.admin,
            Party::Technical => &mut self.record.technical,
            Party::Billing => &mut self.record.billing,
        };
        slot.get_or_insert_with(Contact::default)
    }

    /// Produce the record, or `None` when too little was recognized.
    fn finish(self) -> Option<DomainRecord> {
        let domain = self.domain?;
        if self.record.name_servers.is_empty() && self.created.is_none() {
            return None;
        }

        let punycode = idna::domain_to_ascii(&domain)
            .ok()
            .filter(|p| !p.is_empty());
        let extension = domain
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| !ext.is_empty());

        Some(DomainRecord {
            domain,
            punycode,
            extension,
            created_date: self.created.as_deref().and_then(normalize_date),
            updated_date: self.updated.as_deref().and_then(normalize_date),
            expiration_date: self.expiration.as_deref().and_then(normalize_date),
            source: RecordSource::Whois,
            ..self.record
        })
    }
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn push_unique(items: &mut Vec<String>, value: String) {
    if !items.contains(&value) {
        items.push(value);
    }
}

fn set_contact_field(contact: &mut Contact, field: ContactField, value: &str) {
    let slot = match field {
        ContactField::Street => {
            contact.street = Some(match contact.street.take() {
                Some(existing) => format!("{}, {}", existing, value),
                None => value.to_string(),
            });
            return;
        }
        ContactField::Id => &mut contact.id,
        ContactField::Name => &mut contact.name,
        ContactField::Organization => &mut contact.organization,
        ContactField::City => &mut contact.city,
        ContactField::Province => &mut contact.province,
        ContactField::PostalCode => &mut contact.postal_code,
        ContactField::Country => &mut contact.country,
        ContactField::Phone => &mut contact.phone,
        ContactField::Fax => &mut contact.fax,
        ContactField::Email => &mut contact.email,
        ContactField::ReferralUrl => &mut contact.referral_url,
    };
    set_once(slot, value.to_string());
}

/// Drop ICANN explanation links such as `https://icann.org/epp#ok`.
fn strip_status_links(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|token| !token.trim_start_matches('(').contains("://"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Only an explicit signed assertion counts.
fn is_signed(value: &str) -> bool {
    let token: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    matches!(
        token.as_str(),
        "signed" | "yes" | "signeddelegation" | "true"
    )
}
