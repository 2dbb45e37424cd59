//! Mapping from RDAP domain objects to the unified record.

use crate::dates::normalize_date;
use crate::protocols::rdap::{Entity, RdapDomain};
use crate::types::{Contact, DomainRecord, RecordSource};

/// RDAP role names for each contact slot of a `DomainRecord`.
pub const ROLE_REGISTRAR: &str = "registrar";
pub const ROLE_REGISTRANT: &str = "registrant";
pub const ROLE_ADMINISTRATIVE: &str = "administrative";
pub const ROLE_TECHNICAL: &str = "technical";
pub const ROLE_BILLING: &str = "billing";

const ROLE_ABUSE: &str = "abuse";

/// Convert an RDAP domain object into a `DomainRecord`.
///
/// `domain` is the name as queried; the object's `ldhName` supplies the
/// punycode form and the extension.
pub fn rdap_to_record(domain: &str, rdap: &RdapDomain) -> DomainRecord {
    let ldh_name = rdap.ldh_name.as_deref().map(str::to_lowercase);
    let extension = ldh_name
        .as_deref()
        .map(|name| name.rsplit('.').next().unwrap_or(name).to_string())
        .filter(|ext| !ext.is_empty());

    let mut created = None;
    let mut updated = None;
    let mut expiration = None;
    for event in &rdap.events {
        match event.event_action.as_str() {
            "registration" => created = Some(event.event_date.as_str()),
            "expiration" => expiration = Some(event.event_date.as_str()),
            "last changed" => updated = Some(event.event_date.as_str()),
            _ => {}
        }
    }

    let dnssec = rdap
        .secure_dns
        .as_ref()
        .and_then(|s| s.delegation_signed)
        .unwrap_or(false);

    DomainRecord {
        domain: domain.to_string(),
        domain_id: rdap.handle.clone(),
        punycode: ldh_name,
        extension,
        whois_server: rdap.port43.clone(),
        created_date: created.and_then(normalize_date),
        updated_date: updated.and_then(normalize_date),
        expiration_date: expiration.and_then(normalize_date),
        status: rdap
            .status
            .iter()
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect())
            .collect(),
        name_servers: rdap
            .nameservers
            .iter()
            .filter_map(|ns| ns.ldh_name.clone())
            .collect(),
        dnssec,
        registrar: entity_to_contact(ROLE_REGISTRAR, &rdap.entities),
        registrant: entity_to_contact(ROLE_REGISTRANT, &rdap.entities),
        admin: entity_to_contact(ROLE_ADMINISTRATIVE, &rdap.entities),
        technical: entity_to_contact(ROLE_TECHNICAL, &rdap.entities),
        billing: entity_to_contact(ROLE_BILLING, &rdap.entities),
        source: RecordSource::Rdap,
    }
}

/// Build the contact for `role` from every top-level entity carrying it.
///
/// Matching entities are applied in order, and so are their nested `abuse`
/// entities. Returns `None` when no entity has the role.
pub fn entity_to_contact(role: &str, entities: &[Entity]) -> Option<Contact> {
    let mut contact: Option<Contact> = None;

    for entity in entities.iter().filter(|e| e.has_role(role)) {
        let contact = contact.get_or_insert_with(Contact::default);
        if let Some(handle) = &entity.handle {
            contact.id = Some(handle.clone());
        }
        apply_vcard(contact, entity);

        for inner in entity.entities.iter().filter(|e| e.has_role(ROLE_ABUSE)) {
            apply_vcard(contact, inner);
        }
    }

    contact
}

/// Copy the vCard properties of `entity` onto `contact`.
fn apply_vcard(contact: &mut Contact, entity: &Entity) {
    let Some(card) = &entity.vcard_array else {
        return;
    };

    for property in &card.properties {
        let value = property.joined();
        // Redacted properties arrive empty and must not claim a slot.
        if value.trim().is_empty() && property.name != "adr" {
            continue;
        }

        match property.name.as_str() {
            "fn" => {
                if contact.name.is_none() {
                    contact.name = Some(value);
                }
            }
            "org" => contact.organization = Some(value),
            // Structured addresses are not decomposed; drop whatever was set.
            "adr" => {
                contact.street = None;
                contact.city = None;
                contact.province = None;
                contact.postal_code = None;
                contact.country = None;
            }
            "tel" => {
                contact.phone = Some(value);
                contact.fax = None;
            }
            "email" => contact.email = Some(value),
            "url" => contact.referral_url = Some(value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::rdap::{Event, Nameserver, SecureDns, VCard};
    use chrono::{Datelike, TimeZone, Utc};

    fn vcard(props: serde_json::Value) -> Option<VCard> {
        Some(serde_json::from_value(serde_json::json!(["vcard", props])).unwrap())
    }

    fn entity(handle: &str, roles: &[&str], props: serde_json::Value) -> Entity {
        Entity {
            handle: Some(handle.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            vcard_array: vcard(props),
            ..Default::default()
        }
    }

    fn sample() -> RdapDomain {
        RdapDomain {
            object_class_name: Some("domain".to_string()),
            handle: Some("D123-EXAMPLE".to_string()),
            ldh_name: Some("EXAMPLE.CO.UK".to_string()),
            port43: Some("whois.nic.uk".to_string()),
            status: vec!["client transfer prohibited".to_string(), "active".to_string()],
            nameservers: vec![
                Nameserver {
                    ldh_name: Some("ns1.example.co.uk".to_string()),
                    unicode_name: None,
                },
                Nameserver::default(),
            ],
            events: vec![
                Event {
                    event_action: "registration".to_string(),
                    event_date: "2001-02-03T04:05:06Z".to_string(),
                    ..Default::default()
                },
                Event {
                    event_action: "expiration".to_string(),
                    event_date: "2031-02-03T04:05:06Z".to_string(),
                    ..Default::default()
                },
                Event {
                    event_action: "last changed".to_string(),
                    event_date: "not a date".to_string(),
                    ..Default::default()
                },
            ],
            secure_dns: Some(SecureDns {
                delegation_signed: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_domain_fields() {
        let record = rdap_to_record("example.co.uk", &sample());

        assert_eq!(record.domain, "example.co.uk");
        assert_eq!(record.domain_id.as_deref(), Some("D123-EXAMPLE"));
        assert_eq!(record.punycode.as_deref(), Some("example.co.uk"));
        assert_eq!(record.extension.as_deref(), Some("uk"));
        assert_eq!(record.whois_server.as_deref(), Some("whois.nic.uk"));
        assert_eq!(record.source, RecordSource::Rdap);
        assert_eq!(record.name_servers, vec!["ns1.example.co.uk"]);
        assert!(record.dnssec);

        assert_eq!(
            record.created_date,
            Some(Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).unwrap())
        );
        assert_eq!(record.expiration_date.map(|d| d.year()), Some(2031));
        assert!(record.updated_date.is_none());
    }

    #[test]
    fn test_status_tokens_lose_whitespace() {
        let record = rdap_to_record("example.co.uk", &sample());
        assert_eq!(record.status, vec!["clienttransferprohibited", "active"]);
        assert!(record.client_transfer_prohibited());
        assert!(!record.server_transfer_prohibited());
    }

    #[test]
    fn test_dnssec_needs_explicit_true() {
        let mut rdap = sample();
        rdap.secure_dns = Some(SecureDns::default());
        assert!(!rdap_to_record("example.co.uk", &rdap).dnssec);

        rdap.secure_dns = None;
        assert!(!rdap_to_record("example.co.uk", &rdap).dnssec);
    }

    #[test]
    fn test_contacts_only_from_matching_roles() {
        let mut rdap = sample();
        let mut registrar = entity(
            "292",
            &["registrar"],
            serde_json::json!([["fn", {}, "text", "Example Registrar"]]),
        );
        registrar.entities = vec![
            entity(
                "",
                &["abuse"],
                serde_json::json!([
                    ["fn", {}, "text", "Abuse Desk"],
                    ["email", {}, "text", "abuse@registrar.example"],
                    ["tel", {"type": "voice"}, "uri", "tel:+1.5555550100"]
                ]),
            ),
            entity(
                "",
                &["technical"],
                serde_json::json!([["email", {}, "text", "noc@registrar.example"]]),
            ),
        ];
        rdap.entities = vec![
            registrar,
            entity(
                "REG-1",
                &["registrant", "administrative"],
                serde_json::json!([["org", {}, "text", "Example Holdings"]]),
            ),
        ];

        let record = rdap_to_record("example.co.uk", &rdap);

        let registrar = record.registrar.unwrap();
        assert_eq!(registrar.id.as_deref(), Some("292"));
        assert_eq!(registrar.name.as_deref(), Some("Example Registrar"));
        assert_eq!(registrar.email.as_deref(), Some("abuse@registrar.example"));
        assert_eq!(registrar.phone.as_deref(), Some("tel:+1.5555550100"));

        let registrant = record.registrant.unwrap();
        assert_eq!(registrant.id.as_deref(), Some("REG-1"));
        assert_eq!(registrant.organization.as_deref(), Some("Example Holdings"));
        assert_eq!(
            record.admin.and_then(|c| c.organization).as_deref(),
            Some("Example Holdings")
        );

        // Nested non-abuse entities never contribute.
        assert!(record.technical.is_none());
        assert!(record.billing.is_none());
    }

    #[test]
    fn test_fn_first_wins_org_last_wins() {
        let entities = vec![
            entity(
                "A",
                &["registrant"],
                serde_json::json!([
                    ["fn", {}, "text", "First Name"],
                    ["org", {}, "text", "First Org"]
                ]),
            ),
            entity(
                "B",
                &["registrant"],
                serde_json::json!([
                    ["fn", {}, "text", "Second Name"],
                    ["org", {}, "text", "Second Org"]
                ]),
            ),
        ];

        let contact = entity_to_contact(ROLE_REGISTRANT, &entities).unwrap();
        assert_eq!(contact.name.as_deref(), Some("First Name"));
        assert_eq!(contact.organization.as_deref(), Some("Second Org"));
        assert_eq!(contact.id.as_deref(), Some("B"));
    }

    #[test]
    fn test_vcard_mapping_rules() {
        let mut contact = Contact {
            street: Some("old street".to_string()),
            country: Some("GB".to_string()),
            fax: Some("+44.1".to_string()),
            ..Default::default()
        };
        let source = entity(
            "X",
            &["registrant"],
            serde_json::json!([
                ["adr", {}, "text", ["", "", "1 Road", "Town", "", "AB1 2CD", "UK"]],
                ["tel", {}, "uri", "tel:+44.2"],
                ["url", {}, "uri", "https://registrar.example"],
                ["org", {}, "text", ["Multi", "Part"]]
            ]),
        );

        apply_vcard(&mut contact, &source);

        assert!(contact.street.is_none());
        assert!(contact.country.is_none());
        assert_eq!(contact.phone.as_deref(), Some("tel:+44.2"));
        assert!(contact.fax.is_none());
        assert_eq!(
            contact.referral_url.as_deref(),
            Some("https://registrar.example")
        );
        assert_eq!(contact.organization.as_deref(), Some("Multi Part"));
    }

    #[test]
    fn test_empty_values_do_not_claim_fields() {
        let entities = vec![
            entity(
                "A",
                &["registrant"],
                serde_json::json!([
                    ["fn", {}, "text", ""],
                    ["email", {}, "text", ""]
                ]),
            ),
            entity(
                "B",
                &["registrant"],
                serde_json::json!([["fn", {}, "text", "Jane Doe"]]),
            ),
        ];

        let contact = entity_to_contact(ROLE_REGISTRANT, &entities).unwrap();
        assert_eq!(contact.name.as_deref(), Some("Jane Doe"));
        assert!(contact.email.is_none());
    }

    #[test]
    fn test_missing_role_yields_none() {
        assert!(entity_to_contact(ROLE_BILLING, &[]).is_none());
    }
}
