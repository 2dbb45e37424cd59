//! Configuration file parsing and management.
//!
//! This module handles loading lookup settings from TOML files and `WD_*`
//! environment variables, and merging them with proper precedence rules:
//! defaults < config files < environment < command line.

use crate::error::WhoisDomainError;
use crate::types::LookupConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Largest accepted WHOIS retry budget.
pub const MAX_RETRY_ATTEMPTS: usize = 50;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Lookup tuning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupSection>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSection>,
}

/// The `[lookup]` table. Durations are strings such as "5s", "2m", "250ms".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LookupSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_on_rdap_error: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_base_delay: Option<String>,
}

/// The `[output]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSection {
    /// Print JSON instead of text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Pretty-print JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report which files were used
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `FileError` if the file is missing or unreadable, and
    /// `ConfigError` if it is not valid TOML or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, WhoisDomainError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(WhoisDomainError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            WhoisDomainError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            WhoisDomainError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. Files that fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, WhoisDomainError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping config file"),
            }
        }

        if self.verbose {
            for path in &loaded_files {
                debug!(path = %path.display(), "Loaded config file");
            }
        }

        Ok(merged_config)
    }

    /// Local configuration in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./whois-domain.toml", "./.whois-domain.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Configuration in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".whois-domain.toml", "whois-domain.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Configuration under the XDG Base Directory.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("whois-domain").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win field by field.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            lookup: match (lower.lookup, higher.lookup) {
                (Some(lower), Some(higher)) => Some(LookupSection {
                    timeout: higher.timeout.or(lower.timeout),
                    rdap_timeout: higher.rdap_timeout.or(lower.rdap_timeout),
                    whois_timeout: higher.whois_timeout.or(lower.whois_timeout),
                    bootstrap: higher.bootstrap.or(lower.bootstrap),
                    fallback_on_rdap_error: higher
                        .fallback_on_rdap_error
                        .or(lower.fallback_on_rdap_error),
                    retry_attempts: higher.retry_attempts.or(lower.retry_attempts),
                    retry_base_delay: higher.retry_base_delay.or(lower.retry_base_delay),
                }),
                (lower, higher) => higher.or(lower),
            },
            output: match (lower.output, higher.output) {
                (Some(lower), Some(higher)) => Some(OutputSection {
                    json: higher.json.or(lower.json),
                    pretty: higher.pretty.or(lower.pretty),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), WhoisDomainError> {
        let Some(lookup) = &config.lookup else {
            return Ok(());
        };

        let durations = [
            ("timeout", &lookup.timeout),
            ("rdap_timeout", &lookup.rdap_timeout),
            ("whois_timeout", &lookup.whois_timeout),
            ("retry_base_delay", &lookup.retry_base_delay),
        ];
        for (name, value) in durations {
            if let Some(value) = value {
                if parse_duration(value).is_none() {
                    return Err(WhoisDomainError::config(format!(
                        "Invalid {} '{}'. Use format like '250ms', '5s', '2m'",
                        name, value
                    )));
                }
            }
        }

        if let Some(attempts) = lookup.retry_attempts {
            if attempts == 0 || attempts > MAX_RETRY_ATTEMPTS {
                return Err(WhoisDomainError::config(format!(
                    "retry_attempts must be between 1 and {}",
                    MAX_RETRY_ATTEMPTS
                )));
            }
        }

        Ok(())
    }
}

impl LookupSection {
    /// Overlay the values set in this section onto `config`.
    pub fn apply(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(d) = self.timeout.as_deref().and_then(parse_duration) {
            config.timeout = d;
        }
        if let Some(d) = self.rdap_timeout.as_deref().and_then(parse_duration) {
            config.rdap_timeout = d;
        }
        if let Some(d) = self.whois_timeout.as_deref().and_then(parse_duration) {
            config.whois_timeout = d;
        }
        if let Some(d) = self.retry_base_delay.as_deref().and_then(parse_duration) {
            config.retry_base_delay = d;
        }
        if let Some(enabled) = self.bootstrap {
            config.enable_bootstrap = enabled;
        }
        if let Some(enabled) = self.fallback_on_rdap_error {
            config.fallback_on_rdap_error = enabled;
        }
        if let Some(attempts) = self.retry_attempts {
            config.retry_max_attempts = attempts;
        }
        config
    }
}

/// Settings taken from `WD_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub timeout: Option<Duration>,
    pub rdap_timeout: Option<Duration>,
    pub whois_timeout: Option<Duration>,
    pub bootstrap: Option<bool>,
    pub fallback_on_rdap_error: Option<bool>,
    pub retry_attempts: Option<usize>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the values set in the environment onto `config`.
    pub fn apply(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(d) = self.timeout {
            config.timeout = d;
        }
        if let Some(d) = self.rdap_timeout {
            config.rdap_timeout = d;
        }
        if let Some(d) = self.whois_timeout {
            config.whois_timeout = d;
        }
        if let Some(enabled) = self.bootstrap {
            config.enable_bootstrap = enabled;
        }
        if let Some(enabled) = self.fallback_on_rdap_error {
            config.fallback_on_rdap_error = enabled;
        }
        if let Some(attempts) = self.retry_attempts {
            config.retry_max_attempts = attempts;
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Load configuration using `get` to read variables.
pub fn load_env_config_from<F>(get: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let duration = |key: &str| {
        let raw = get(key)?;
        let parsed = parse_duration(&raw);
        if parsed.is_none() {
            warn!(variable = key, value = %raw, "Invalid duration, use format like '5s', '2m'");
        }
        parsed
    };
    let flag = |key: &str| {
        let raw = get(key)?;
        let parsed = parse_bool(&raw);
        if parsed.is_none() {
            warn!(variable = key, value = %raw, "Invalid boolean, use true/false");
        }
        parsed
    };

    let retry_attempts = get("WD_RETRY_ATTEMPTS").and_then(|raw| match raw.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_RETRY_ATTEMPTS).contains(&n) => Some(n),
        _ => {
            warn!(variable = "WD_RETRY_ATTEMPTS", value = %raw, "Invalid retry budget, must be 1-50");
            None
        }
    });

    EnvConfig {
        timeout: duration("WD_TIMEOUT"),
        rdap_timeout: duration("WD_RDAP_TIMEOUT"),
        whois_timeout: duration("WD_WHOIS_TIMEOUT"),
        bootstrap: flag("WD_BOOTSTRAP"),
        fallback_on_rdap_error: flag("WD_FALLBACK"),
        retry_attempts,
        config: get("WD_CONFIG").filter(|path| !path.trim().is_empty()),
    }
}

/// Build the effective `LookupConfig` from defaults, files, and environment.
///
/// `explicit_path` (or `WD_CONFIG`) replaces file discovery; an explicit
/// file that fails to load is an error.
pub fn resolve_lookup_config(
    explicit_path: Option<&Path>,
    verbose: bool,
) -> Result<(LookupConfig, FileConfig), WhoisDomainError> {
    let manager = ConfigManager::new(verbose);
    let env_config = load_env_config();

    let file_config = match explicit_path
        .map(Path::to_path_buf)
        .or_else(|| env_config.config.as_ref().map(PathBuf::from))
    {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let mut config = LookupConfig::default();
    if let Some(lookup) = &file_config.lookup {
        config = lookup.apply(config);
    }
    config = env_config.apply(config);

    Ok((config, file_config))
}

/// Parse a duration like "250ms", "5s" or "2m". A bare number means seconds.
///
/// Zero durations are rejected.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let duration = if let Some(ms) = value.strip_suffix("ms") {
        Duration::from_millis(ms.trim().parse().ok()?)
    } else if let Some(s) = value.strip_suffix('s') {
        Duration::from_secs(s.trim().parse().ok()?)
    } else if let Some(m) = value.strip_suffix('m') {
        Duration::from_secs(m.trim().parse::<u64>().ok()?.checked_mul(60)?)
    } else {
        Duration::from_secs(value.parse().ok()?)
    };

    (!duration.is_zero()).then_some(duration)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
