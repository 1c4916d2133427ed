// # DNS Provider Trait
//
// Defines the interface to the authoritative DNS provider's API.
//
// ## Implementations
//
// - Cloudflare: `vmdns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use vmdns_core::DnsProvider;
//
// let zone = provider.find_zone("example.com").await?.expect("zone exists");
// let records = provider.list_a_records(&zone, "web1.example.com").await?;
// ```

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{DnsRecord, DnsZone};

/// Body of a create or update mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    /// DNS record type; always "A"
    #[serde(rename = "type")]
    pub record_type: &'static str,
    /// Record name relative to the zone
    pub name: String,
    /// Address written to the record
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Whether the provider proxies traffic for this record
    pub proxied: bool,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// Providers are single-shot: every method performs exactly one API request
/// and maps a non-success status to an error. They must not:
///
/// - Retry or back off (owned by `VmDnsEngine`)
/// - Decide whether a mutation is needed (owned by `dns::decide`)
/// - Cache state between calls
///
/// Errors must be classified so that [`crate::Error::is_retryable`] is
/// meaningful: 429 → `RateLimited`, 5xx → transient `Provider`, transport
/// failure → `Http`, everything else permanent.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the zone for `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(zone))`: the zone exists
    /// - `Ok(None)`: the provider has no zone by that name
    /// - `Err(Error)`: the request failed
    async fn find_zone(&self, domain: &str) -> Result<Option<DnsZone>, crate::Error>;

    /// List A records named `fqdn` in `zone` (empty when none exist)
    async fn list_a_records(
        &self,
        zone: &DnsZone,
        fqdn: &str,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create an A record
    async fn create_a_record(
        &self,
        zone: &DnsZone,
        payload: &RecordPayload,
    ) -> Result<DnsRecord, crate::Error>;

    /// Replace the A record `record_id`
    async fn update_a_record(
        &self,
        zone: &DnsZone,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
