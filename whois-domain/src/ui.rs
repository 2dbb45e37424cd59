//! Text display logic for whois-domain CLI.
//!
//! Renders a `DomainRecord` as aligned, colored label/value lines. Uses only
//! the `console` crate.

use chrono::{DateTime, Utc};
use console::{pad_str, style, Alignment};
use whois_domain_lib::{Contact, DomainRecord};

const LABEL_WIDTH: usize = 14;

/// Print one record. `full` adds every contact instead of just the registrar.
pub fn print_record(record: &DomainRecord, full: bool) {
    println!(
        "{} {}",
        style(&record.domain).bold(),
        style(format!("(via {})", record.source)).dim(),
    );

    if let Some(punycode) = record.punycode.as_deref().filter(|p| *p != record.domain) {
        print_field("Punycode", punycode);
    }
    if let Some(registrar) = record.registrar.as_ref().and_then(contact_label) {
        print_field("Registrar", &registrar);
    }
    print_date("Created", record.created_date);
    print_date("Updated", record.updated_date);
    print_expiration(record.expiration_date);

    if !record.status.is_empty() {
        print_field("Status", &record.status.join(", "));
    }
    let locks: Vec<&str> = record
        .status_flags()
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name)
        .collect();
    if !locks.is_empty() {
        print_field("Locks", &locks.join(", "));
    }

    if !record.name_servers.is_empty() {
        print_field("Name servers", &record.name_servers.join(", "));
    }
    print_field("DNSSEC", if record.dnssec { "signed" } else { "unsigned" });

    if let Some(server) = &record.whois_server {
        print_field("WHOIS server", server);
    }

    if full {
        let contacts = [
            ("Registrar", &record.registrar),
            ("Registrant", &record.registrant),
            ("Admin", &record.admin),
            ("Technical", &record.technical),
            ("Billing", &record.billing),
        ];
        for (title, contact) in contacts {
            if let Some(contact) = contact.as_ref().filter(|c| !c.is_empty()) {
                print_contact(title, contact);
            }
        }
    }
}

/// Print the "no record" line for a domain.
pub fn print_not_found(domain: &str) {
    println!(
        "{}  {}",
        style(domain).bold(),
        style("NOT REGISTERED").green().bold()
    );
}

fn print_field(label: &str, value: &str) {
    println!(
        "  {} {}",
        style(pad_str(label, LABEL_WIDTH, Alignment::Left, None)).cyan(),
        value
    );
}

fn print_date(label: &str, date: Option<DateTime<Utc>>) {
    if let Some(date) = date {
        print_field(label, &format_date(date));
    }
}

fn print_expiration(date: Option<DateTime<Utc>>) {
    let Some(date) = date else {
        return;
    };

    let formatted = format_date(date);
    if date < Utc::now() {
        print_field("Expires", &style(format!("{} (expired)", formatted)).red().to_string());
    } else {
        print_field("Expires", &formatted);
    }
}

fn print_contact(title: &str, contact: &Contact) {
    println!();
    println!("  {}", style(title).bold());

    let fields = [
        ("ID", &contact.id),
        ("Name", &contact.name),
        ("Organization", &contact.organization),
        ("Street", &contact.street),
        ("City", &contact.city),
        ("Province", &contact.province),
        ("Postal code", &contact.postal_code),
        ("Country", &contact.country),
        ("Phone", &contact.phone),
        ("Fax", &contact.fax),
        ("Email", &contact.email),
        ("URL", &contact.referral_url),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            print_field(label, value);
        }
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Best single-line description of a contact.
fn contact_label(contact: &Contact) -> Option<String> {
    contact
        .name
        .clone()
        .or_else(|| contact.organization.clone())
        .or_else(|| contact.id.clone())
}
