//! Configuration types for vmdns
//!
//! This module defines all configuration structures used throughout the
//! workspace. Values are usually produced by [`crate::credentials`] from a
//! credential file plus environment overrides.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::SweepSubnet;

/// Main vmdns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Discovery and reconciliation settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Hypervisor host settings
    #[serde(default)]
    pub host: HostConfig,
}

impl VmdnsConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            engine: EngineConfig::default(),
            host: HostConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.engine.validate()?;
        self.host.validate()?;
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// API token (or global API key when `account_email` is set)
        api_token: String,
        /// Account email, only needed for global-key authentication
        account_email: Option<String>,
        /// Domain whose zone holds the VM records
        domain: String,
        /// Zone ID (optional, looked up by domain when absent)
        zone_id: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Domain whose zone holds the VM records
        domain: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Keeps the API token out of logs and panic messages
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                account_email,
                domain,
                zone_id,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("account_email", account_email)
                .field("domain", domain)
                .field("zone_id", zone_id)
                .finish(),
            ProviderConfig::Custom {
                factory, domain, ..
            } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("domain", domain)
                .finish_non_exhaustive(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                account_email,
                domain,
                zone_id,
            } => {
                if api_token.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if account_email.as_ref().is_some_and(|e| e.trim().is_empty()) {
                    return Err(crate::Error::config(
                        "Cloudflare account email cannot be empty when set",
                    ));
                }
                if zone_id.as_ref().is_some_and(|z| z.trim().is_empty()) {
                    return Err(crate::Error::config("Cloudflare zone ID cannot be empty when set"));
                }
                validate_domain_name(domain)
            }
            ProviderConfig::Custom {
                factory,
                domain,
                config,
            } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                validate_domain_name(domain)
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }

    /// Domain whose zone holds the VM records
    pub fn domain(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { domain, .. } | ProviderConfig::Custom { domain, .. } => {
                domain.trim().trim_end_matches('.')
            }
        }
    }

    /// Pre-configured zone identifier, skipping the zone lookup
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => zone_id.as_deref(),
            ProviderConfig::Custom { .. } => None,
        }
    }
}

/// How a local-resolver mismatch is weighed against the provider view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchPolicy {
    /// A stale local answer forces a write even if the provider already agrees
    #[default]
    LocalForcesUpdate,
    /// Only the provider view decides; the local answer is logged only
    ProviderAuthoritative,
}

impl std::str::FromStr for MismatchPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local-forces-update" => Ok(MismatchPolicy::LocalForcesUpdate),
            "provider-authoritative" => Ok(MismatchPolicy::ProviderAuthoritative),
            other => Err(crate::Error::config(format!(
                "Unknown mismatch policy '{}'. \
                Valid: local-forces-update, provider-authoritative",
                other
            ))),
        }
    }
}

/// Discovery and reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of probes before discovery gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between empty probes (in seconds)
    #[serde(default = "default_poll_delay_secs")]
    pub poll_delay_secs: u64,

    /// Extra attempts for a DNS mutation that failed with a retryable error
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay between mutation retries (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// TTL written on created and updated records
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,

    /// Proxy flag written on created and updated records
    #[serde(default)]
    pub proxied: bool,

    /// Weighting of the local resolver view
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,

    /// Perform every read but only log the mutation
    #[serde(default)]
    pub dry_run: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be at least 1"));
        }
        if self.max_retries > 10 {
            return Err(crate::Error::config(format!(
                "max_retries must be between 0 and 10. Got: {}",
                self.max_retries
            )));
        }
        if self.record_ttl == 0 {
            return Err(crate::Error::config("record_ttl must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            poll_delay_secs: default_poll_delay_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            record_ttl: default_record_ttl(),
            proxied: false,
            mismatch_policy: MismatchPolicy::default(),
            dry_run: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    12
}

fn default_poll_delay_secs() -> u64 {
    10
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_record_ttl() -> u32 {
    120
}

/// Hypervisor host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// libvirt connection URI passed to virsh
    #[serde(default = "default_libvirt_uri")]
    pub libvirt_uri: String,

    /// Template cloned when `clone` is given no explicit template
    #[serde(default)]
    pub default_template: Option<String>,

    /// Subnet (CIDR) pinged to populate the neighbor cache after a clone
    #[serde(default)]
    pub sweep_subnet: Option<String>,

    /// Wait after a ping sweep before reading the neighbor table (in seconds)
    #[serde(default = "default_sweep_settle_secs")]
    pub sweep_settle_secs: u64,

    /// Remote user for guest hostname configuration
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// Private key for guest hostname configuration
    #[serde(default)]
    pub ssh_identity: Option<PathBuf>,
}

impl HostConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.libvirt_uri.trim().is_empty() {
            return Err(crate::Error::config("libvirt URI cannot be empty"));
        }
        if self.ssh_user.trim().is_empty() {
            return Err(crate::Error::config("SSH user cannot be empty"));
        }
        self.sweep_subnet()?;
        Ok(())
    }

    /// Parsed sweep subnet, if one is configured
    pub fn sweep_subnet(&self) -> Result<Option<SweepSubnet>, crate::Error> {
        self.sweep_subnet
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|e| crate::Error::config(format!("Invalid sweep subnet: {}", e)))
            })
            .transpose()
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            libvirt_uri: default_libvirt_uri(),
            default_template: None,
            sweep_subnet: None,
            sweep_settle_secs: default_sweep_settle_secs(),
            ssh_user: default_ssh_user(),
            ssh_identity: None,
        }
    }
}

fn default_libvirt_uri() -> String {
    "qemu:///system".to_string()
}

fn default_sweep_settle_secs() -> u64 {
    2
}

fn default_ssh_user() -> String {
    "root".to_string()
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: overall length, label length and characters.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }
        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
