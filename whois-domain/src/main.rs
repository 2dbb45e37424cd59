//! WHOIS Domain CLI Application
//!
//! A command-line interface for looking up domain registration data using
//! RDAP with WHOIS fallback. This binary is a thin host around the
//! whois-domain-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use serde_json::{json, Value};
use std::path::Path;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use whois_domain_lib::{
    parse_duration, resolve_lookup_config, DomainLookup, DomainRecord, FileConfig, LookupConfig,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Largest retry budget accepted on the command line.
const MAX_RETRIES: usize = 50;

/// CLI arguments for whois-domain
#[derive(Parser, Debug)]
#[command(name = "whois-domain")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Look up domain registration data using RDAP with WHOIS fallback")]
#[command(
    long_about = "Look up domain registration data using RDAP with automatic WHOIS fallback.\n\nBoth protocols are normalized into one record with dates, status flags, name servers and contacts."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain name to look up (e.g. example.com)
    #[arg(value_name = "DOMAIN")]
    pub domain: String,

    /// Output the record as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Print the raw RDAP domain object instead of the normalized record
    #[arg(long = "rdap", help_heading = "Output Format")]
    pub rdap: bool,

    /// Overall lookup timeout (e.g. 30s, 2m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Protocol")]
    pub timeout: Option<String>,

    /// Timeout for each WHOIS connect and read
    #[arg(long = "whois-timeout", value_name = "DURATION", help_heading = "Protocol")]
    pub whois_timeout: Option<String>,

    /// Maximum WHOIS attempts (1-50)
    #[arg(long = "retries", value_name = "N", help_heading = "Protocol")]
    pub retries: Option<usize>,

    /// Disable IANA bootstrap (use only the built-in RDAP server map)
    #[arg(long = "no-bootstrap", help_heading = "Protocol")]
    pub no_bootstrap: bool,

    /// Only fall back to WHOIS when no RDAP server exists for the TLD
    #[arg(long = "strict-fallback", help_heading = "Protocol")]
    pub strict_fallback: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging and the full record in text output
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OutputOptions {
    json: bool,
    pretty: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.domain.trim().is_empty() {
        return Err("Domain name cannot be empty".to_string());
    }

    for (flag, value) in [
        ("--timeout", &args.timeout),
        ("--whois-timeout", &args.whois_timeout),
    ] {
        if let Some(value) = value {
            if parse_duration(value).is_none() {
                return Err(format!(
                    "Invalid {} '{}'. Use format like '250ms', '5s', '2m'",
                    flag, value
                ));
            }
        }
    }

    if let Some(retries) = args.retries {
        if retries == 0 || retries > MAX_RETRIES {
            return Err(format!("--retries must be between 1 and {}", MAX_RETRIES));
        }
    }

    Ok(())
}

/// Send logs to stderr so stdout stays clean for records.
///
/// `RUST_LOG` takes precedence over the --verbose/--debug defaults.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(args.debug))
        .with(filter)
        .try_init();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (config, output) = build_config(&args)?;
    debug!(config = ?config, "Effective lookup configuration");

    let lookup = DomainLookup::with_config(config)?;

    if args.rdap {
        return match lookup.lookup_rdap(&args.domain).await? {
            Some(rdap) => {
                println!("{}", to_json_string(&serde_json::to_value(&rdap)?, output.pretty)?);
                Ok(())
            }
            None => {
                println!("{}: no RDAP service for this TLD", args.domain.trim());
                Ok(())
            }
        };
    }

    let record = lookup.lookup(&args.domain).await?;
    info!(domain = %args.domain.trim(), found = record.is_some(), "Lookup finished");

    display_record(args.domain.trim(), record.as_ref(), output, args.debug)
}

/// Resolve configuration: defaults < config files < WD_* env < CLI.
fn build_config(args: &Args) -> Result<(LookupConfig, OutputOptions), Box<dyn std::error::Error>> {
    let explicit = args.config.as_deref().map(Path::new);
    if let Some(path) = explicit {
        info!(path = %path.display(), "Using explicit config file");
    }

    let (config, file_config) = resolve_lookup_config(explicit, args.verbose).map_err(|e| match explicit {
        Some(path) => format!("Failed to load config file '{}': {}", path.display(), e),
        None => e.to_string(),
    })?;

    let output = output_options(&file_config, args);
    let config = apply_cli_args_to_config(config, args)?;

    Ok((config, output))
}

/// CLI flags only switch output modes on; the file can also enable them.
fn output_options(file_config: &FileConfig, args: &Args) -> OutputOptions {
    let file_output = file_config.output.clone().unwrap_or_default();
    OutputOptions {
        json: args.json || file_output.json.unwrap_or(false),
        pretty: args.pretty || file_output.pretty.unwrap_or(false),
    }
}

/// Apply CLI arguments on top of the resolved configuration.
fn apply_cli_args_to_config(
    mut config: LookupConfig,
    args: &Args,
) -> Result<LookupConfig, Box<dyn std::error::Error>> {
    if let Some(value) = &args.timeout {
        let timeout = parse_duration(value).ok_or_else(|| format!("Invalid timeout '{}'", value))?;
        config = config.with_timeout(timeout);
    }

    if let Some(value) = &args.whois_timeout {
        let timeout =
            parse_duration(value).ok_or_else(|| format!("Invalid WHOIS timeout '{}'", value))?;
        config = config.with_whois_timeout(timeout);
    }

    if let Some(retries) = args.retries {
        config = config.with_retry_attempts(retries);
    }

    // Flags can only disable, never re-enable what the config turned off.
    if args.no_bootstrap {
        config = config.with_bootstrap(false);
    }
    if args.strict_fallback {
        config = config.with_fallback_on_rdap_error(false);
    }

    Ok(config)
}

/// Serialize a record with its derived status flags as top-level keys.
fn record_to_json(record: &DomainRecord) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        for (name, set) in record.status_flags() {
            map.insert(name.to_string(), Value::Bool(set));
        }
    }
    Ok(value)
}

fn to_json_string(value: &Value, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn display_record(
    domain: &str,
    record: Option<&DomainRecord>,
    output: OutputOptions,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.json {
        let value = match record {
            Some(record) => record_to_json(record)?,
            None => json!({ "domain": domain, "found": false }),
        };
        println!("{}", to_json_string(&value, output.pretty)?);
        return Ok(());
    }

    match record {
        Some(record) => ui::print_record(record, debug),
        None => ui::print_not_found(domain),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use whois_domain_lib::{OutputSection, RecordSource};

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["whois-domain"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_validate_args_accepts_plain_domain() {
        assert!(validate_args(&parse(&["example.com"])).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_bad_values() {
        assert!(validate_args(&parse(&[" "])).is_err());
        assert!(validate_args(&parse(&["example.com", "--timeout", "soon"])).is_err());
        assert!(validate_args(&parse(&["example.com", "--whois-timeout", "0s"])).is_err());
        assert!(validate_args(&parse(&["example.com", "--retries", "0"])).is_err());
        assert!(validate_args(&parse(&["example.com", "--retries", "51"])).is_err());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = parse(&[
            "example.com",
            "--timeout",
            "2m",
            "--whois-timeout",
            "250ms",
            "--retries",
            "3",
            "--no-bootstrap",
            "--strict-fallback",
        ]);

        let config = apply_cli_args_to_config(LookupConfig::default(), &args).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.whois_timeout, Duration::from_millis(250));
        assert_eq!(config.retry_max_attempts, 3);
        assert!(!config.enable_bootstrap);
        assert!(!config.fallback_on_rdap_error);
    }

    #[test]
    fn test_flags_only_disable() {
        let args = parse(&["example.com"]);
        let base = LookupConfig::default()
            .with_bootstrap(false)
            .with_fallback_on_rdap_error(false);

        let config = apply_cli_args_to_config(base, &args).unwrap();
        assert!(!config.enable_bootstrap);
        assert!(!config.fallback_on_rdap_error);
    }

    #[test]
    fn test_output_options_from_file_and_flags() {
        let file_config = FileConfig {
            lookup: None,
            output: Some(OutputSection {
                json: Some(true),
                pretty: None,
            }),
        };

        let output = output_options(&file_config, &parse(&["example.com", "--pretty"]));
        assert_eq!(output, OutputOptions { json: true, pretty: true });

        let output = output_options(&FileConfig::default(), &parse(&["example.com"]));
        assert_eq!(output, OutputOptions::default());
    }

    #[test]
    fn test_record_json_includes_status_flags() {
        let record = DomainRecord {
            domain: "example.com".to_string(),
            status: vec!["clientTransferProhibited".to_string()],
            source: RecordSource::Rdap,
            ..Default::default()
        };

        let value = record_to_json(&record).unwrap();
        assert_eq!(value["domain"], "example.com");
        assert_eq!(value["source"], "rdap");
        assert_eq!(value["client_transfer_prohibited"], true);
        assert_eq!(value["server_update_prohibited"], false);
    }
}
