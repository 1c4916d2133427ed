// # Credential Loading
//
// Builds a `VmdnsConfig` from a credential file plus environment overrides.
//
// ## File format
//
// Shell-style `KEY=VALUE` lines. An `export ` prefix, surrounding quotes and
// `#` comment lines are tolerated so the same file can be sourced by a shell.
//
// ```text
// CF_API_TOKEN="..."
// CF_EMAIL=ops@example.com     # only for global-key auth
// CF_DOMAIN=example.com
// CF_ZONE_ID=...               # optional
// ```
//
// ## Discovery
//
// 1. The path given on the command line (must exist)
// 2. `/etc/vmdns/credentials.conf`
// 3. `credentials.conf` next to the executable
//
// Environment variables with the same keys override file values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, HostConfig, ProviderConfig, VmdnsConfig};
use crate::error::{Error, Result};

/// System-wide credential file location
pub const SYSTEM_CREDENTIALS_PATH: &str = "/etc/vmdns/credentials.conf";

/// Credential file name looked up next to the executable
pub const CREDENTIALS_FILE_NAME: &str = "credentials.conf";

/// Keys understood in the credential file and the environment
pub mod keys {
    pub const API_TOKEN: &str = "CF_API_TOKEN";
    pub const EMAIL: &str = "CF_EMAIL";
    pub const DOMAIN: &str = "CF_DOMAIN";
    pub const ZONE_ID: &str = "CF_ZONE_ID";

    pub const MAX_ATTEMPTS: &str = "VMDNS_MAX_ATTEMPTS";
    pub const POLL_DELAY_SECS: &str = "VMDNS_POLL_DELAY_SECS";
    pub const MAX_RETRIES: &str = "VMDNS_MAX_RETRIES";
    pub const RETRY_DELAY_SECS: &str = "VMDNS_RETRY_DELAY_SECS";
    pub const RECORD_TTL: &str = "VMDNS_RECORD_TTL";
    pub const PROXIED: &str = "VMDNS_PROXIED";
    pub const MISMATCH_POLICY: &str = "VMDNS_MISMATCH_POLICY";
    pub const MODE: &str = "VMDNS_MODE";

    pub const LIBVIRT_URI: &str = "VMDNS_LIBVIRT_URI";
    pub const TEMPLATE: &str = "VMDNS_TEMPLATE";
    pub const SWEEP_SUBNET: &str = "VMDNS_SWEEP_SUBNET";
    pub const SWEEP_SETTLE_SECS: &str = "VMDNS_SWEEP_SETTLE_SECS";
    pub const SSH_USER: &str = "VMDNS_SSH_USER";
    pub const SSH_IDENTITY: &str = "VMDNS_SSH_IDENTITY";

    pub const ALL: &[&str] = &[
        API_TOKEN,
        EMAIL,
        DOMAIN,
        ZONE_ID,
        MAX_ATTEMPTS,
        POLL_DELAY_SECS,
        MAX_RETRIES,
        RETRY_DELAY_SECS,
        RECORD_TTL,
        PROXIED,
        MISMATCH_POLICY,
        MODE,
        LIBVIRT_URI,
        TEMPLATE,
        SWEEP_SUBNET,
        SWEEP_SETTLE_SECS,
        SSH_USER,
        SSH_IDENTITY,
    ];
}

/// Parse `KEY=VALUE` lines
///
/// Malformed lines are reported with their line number rather than skipped.
pub fn parse_key_values(text: &str) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::config(format!(
                "Credential file line {} is not KEY=VALUE: '{}'",
                index + 1,
                raw.trim()
            ))
        })?;

        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::config(format!(
                "Credential file line {} has an invalid key: '{}'",
                index + 1,
                key
            )));
        }

        vars.insert(key.to_string(), unquote(value));
    }

    Ok(vars)
}

/// Strip an inline comment and one layer of matching quotes
fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote)
            && let Some(end) = inner.find(quote)
        {
            return inner[..end].to_string();
        }
    }
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end().to_string(),
        None => value.to_string(),
    }
}

/// Locate the credential file
///
/// An explicit path must exist. Without one, the system path and the
/// executable's directory are tried in order; `Ok(None)` means neither exists
/// and the configuration must come from the environment alone.
pub fn discover(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::config(format!(
            "Credential file not found: {}",
            path.display()
        )));
    }

    let mut candidates = vec![PathBuf::from(SYSTEM_CREDENTIALS_PATH)];
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(dir.join(CREDENTIALS_FILE_NAME));
    }

    Ok(candidates.into_iter().find(|p| p.is_file()))
}

/// Load configuration from the discovered credential file and `env`
///
/// `env` is consulted first for every key, so the process environment can
/// override any value in the file.
pub fn load(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(VmdnsConfig, Option<PathBuf>)> {
    let path = discover(explicit)?;

    let mut vars = match &path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Cannot read credential file {}: {}", path.display(), e))
            })?;
            parse_key_values(&text)?
        }
        None => HashMap::new(),
    };

    for key in keys::ALL {
        if let Some(value) = env(key) {
            vars.insert(key.to_string(), value);
        }
    }

    if path.is_none() && !vars.contains_key(keys::API_TOKEN) {
        return Err(Error::config(format!(
            "No credential file found (tried {} and {} next to the executable) \
            and {} is not set in the environment",
            SYSTEM_CREDENTIALS_PATH,
            CREDENTIALS_FILE_NAME,
            keys::API_TOKEN
        )));
    }

    let config = from_vars(&vars)?;
    Ok((config, path))
}

/// Build and validate a configuration from parsed variables
pub fn from_vars(vars: &HashMap<String, String>) -> Result<VmdnsConfig> {
    let get = |key: &str| {
        vars.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let api_token = get(keys::API_TOKEN)
        .ok_or_else(|| Error::config(format!("{} is required", keys::API_TOKEN)))?;
    let domain = get(keys::DOMAIN)
        .ok_or_else(|| Error::config(format!("{} is required", keys::DOMAIN)))?;

    let provider = ProviderConfig::Cloudflare {
        api_token,
        account_email: get(keys::EMAIL),
        domain,
        zone_id: get(keys::ZONE_ID),
    };

    let mut engine = EngineConfig::default();
    if let Some(v) = get(keys::MAX_ATTEMPTS) {
        engine.max_attempts = parse_number(keys::MAX_ATTEMPTS, &v)?;
    }
    if let Some(v) = get(keys::POLL_DELAY_SECS) {
        engine.poll_delay_secs = parse_number(keys::POLL_DELAY_SECS, &v)?;
    }
    if let Some(v) = get(keys::MAX_RETRIES) {
        engine.max_retries = parse_number(keys::MAX_RETRIES, &v)?;
    }
    if let Some(v) = get(keys::RETRY_DELAY_SECS) {
        engine.retry_delay_secs = parse_number(keys::RETRY_DELAY_SECS, &v)?;
    }
    if let Some(v) = get(keys::RECORD_TTL) {
        engine.record_ttl = parse_number(keys::RECORD_TTL, &v)?;
    }
    if let Some(v) = get(keys::PROXIED) {
        engine.proxied = parse_bool(keys::PROXIED, &v)?;
    }
    if let Some(v) = get(keys::MISMATCH_POLICY) {
        engine.mismatch_policy = v.parse()?;
    }
    if let Some(v) = get(keys::MODE) {
        engine.dry_run = match v.to_lowercase().as_str() {
            "dry-run" => true,
            "live" => false,
            other => {
                return Err(Error::config(format!(
                    "{} must be 'live' or 'dry-run'. Got: {}",
                    keys::MODE,
                    other
                )));
            }
        };
    }

    let mut host = HostConfig::default();
    if let Some(v) = get(keys::LIBVIRT_URI) {
        host.libvirt_uri = v;
    }
    host.default_template = get(keys::TEMPLATE);
    host.sweep_subnet = get(keys::SWEEP_SUBNET);
    if let Some(v) = get(keys::SWEEP_SETTLE_SECS) {
        host.sweep_settle_secs = parse_number(keys::SWEEP_SETTLE_SECS, &v)?;
    }
    if let Some(v) = get(keys::SSH_USER) {
        host.ssh_user = v;
    }
    host.ssh_identity = get(keys::SSH_IDENTITY).map(PathBuf::from);

    let config = VmdnsConfig {
        provider,
        engine,
        host,
    };
    config.validate()?;
    Ok(config)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{} must be a non-negative integer. Got: {}", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{} must be true or false. Got: {}", key, value))),
    }
}
