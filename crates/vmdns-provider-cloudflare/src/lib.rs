// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for vmdns.
//
// ## Scope
//
// - One HTTP request per trait call; errors are classified and propagated
// - HTTP timeout configured (30 seconds)
// - Zone lookup by domain, A record listing, create (POST) and replace (PUT)
// - Bearer token authentication, or global API key + account email
// - No retry, backoff or dry-run here: all owned by `vmdns-core`
//
// ### Trust Level: Untrusted (DNS Provider)
//
// Providers are **untrusted** components with strict limitations:
//
// **Allowed Capabilities**:
// - Perform HTTP/HTTPS API calls to their endpoints only
// - Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - Spawn tasks or threads
// - Implement retry logic (owned by VmDnsEngine)
// - Decide whether a write is needed (owned by `dns::decide`)
// - Cache state beyond a single request
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use vmdns_core::config::ProviderConfig;
use vmdns_core::model::{DnsRecord, DnsRecordView, DnsZone};
use vmdns_core::traits::{DnsProvider, DnsProviderFactory, RecordPayload};
use vmdns_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "cloudflare";

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ZoneEntry {
    id: String,
    name: String,
}

fn describe(errors: &[ApiMessage]) -> String {
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Map a non-success HTTP status to a classified error
///
/// 401/403 → `Authentication`, 404 → `NotFound`, 429 → `RateLimited`,
/// 5xx → transient `Provider`, everything else → permanent `Provider`.
fn map_status_error(status: StatusCode, body: &str, context: &str) -> Error {
    let detail = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .map(|env| describe(&env.errors))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API credentials or insufficient permissions (HTTP {}): {}",
            context, status, detail
        )),
        404 => Error::not_found(format!("{}: {}", context, detail)),
        429 => Error::rate_limited(format!("{}: HTTP {}", context, status)),
        500..=599 => Error::provider_transient(
            PROVIDER_NAME,
            format!("{}: server error HTTP {}: {}", context, status, detail),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{}: HTTP {}: {}", context, status, detail),
        ),
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. All coordination
/// (retries, scheduling, dry-run) is owned by `VmDnsEngine`.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token, or global API key when `account_email` is set
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account email for global-key authentication
    account_email: Option<String>,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_email", &self.account_email)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: API token with Zone:Read and DNS:Edit permissions, or
    ///   the global API key when `account_email` is given
    /// - `account_email`: switches authentication to X-Auth-Email/X-Auth-Key
    ///
    /// # Errors
    ///
    /// `Error::Config` for an empty token; `Error::Http` if the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, account_email: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            account_email,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.account_email {
            Some(email) => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", &self.api_token),
            None => request.bearer_auth(&self.api_token),
        }
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", context, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(map_status_error(status, &body, context))
    }

    /// Decode an envelope and return its result
    ///
    /// The status was already 2xx, so the request may have been applied. A
    /// body that cannot be read is therefore a permanent provider error, never
    /// a retryable transport error.
    async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("{}: unreadable response after success status: {}", context, e),
            )
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{}: {}", context, describe(&envelope.errors)),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                PROVIDER_NAME,
                format!("{}: response carries no result", context),
            )
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn find_zone(&self, domain: &str) -> Result<Option<DnsZone>> {
        tracing::debug!("Looking up zone for domain: {}", domain);
        let context = format!("zone lookup for {}", domain);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", domain)]);
        let response = self.send(request, &context).await?;
        let zones: Vec<ZoneEntry> = Self::decode(response, &context).await?;

        let zone = zones
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(domain))
            .map(|zone| DnsZone {
                id: zone.id,
                name: zone.name,
            });

        if let Some(zone) = &zone {
            tracing::debug!("Found zone ID: {}", zone.id);
        }
        Ok(zone)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=web1.example.com
    /// ```
    async fn list_a_records(&self, zone: &DnsZone, fqdn: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Looking up A records for {}", fqdn);
        let context = format!("record lookup for {}", fqdn);

        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.base_url, zone.id))
            .query(&[("type", DnsRecordView::RECORD_TYPE), ("name", fqdn)]);
        let response = self.send(request, &context).await?;
        Self::decode(response, &context).await
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "web1", "content": "10.0.0.9", "ttl": 120, "proxied": false}
    /// ```
    async fn create_a_record(&self, zone: &DnsZone, payload: &RecordPayload) -> Result<DnsRecord> {
        let context = format!("create of {} in {}", payload.name, zone.name);

        let request = self
            .client
            .post(format!("{}/zones/{}/dns_records", self.base_url, zone.id))
            .json(payload);
        let response = self.send(request, &context).await?;
        Self::decode(response, &context).await
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn update_a_record(
        &self,
        zone: &DnsZone,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord> {
        let context = format!("update of {} ({})", payload.name, record_id);

        let request = self
            .client
            .put(format!(
                "{}/zones/{}/dns_records/{}",
                self.base_url, zone.id, record_id
            ))
            .json(payload);
        let response = self.send(request, &context).await?;
        Self::decode(response, &context).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                account_email,
                ..
            } => Ok(Box::new(CloudflareProvider::new(
                api_token.clone(),
                account_email.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use vmdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// vmdns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &vmdns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER_NAME, Box::new(CloudflareFactory));
}
