//! Test doubles and common utilities for engine contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! collaborators were touched, and how often.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vmdns_core::config::{ProviderConfig, VmdnsConfig};
use vmdns_core::error::{Error, Result};
use vmdns_core::model::{DnsRecord, DnsZone, VmId};
use vmdns_core::traits::{
    DnsProvider, DomainState, GuestConfigurator, GuestInterface, Hypervisor, InterfaceAddress,
    IpType, LocalResolver, NeighborEntry, NeighborTable, RecordPayload,
};

pub const TEST_MAC: &str = "52:54:00:ab:cd:ef";

pub fn vm(name: &str) -> VmId {
    VmId::new(name).expect("valid vm name")
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

/// Configuration with short delays so paused-clock tests stay readable
pub fn minimal_config(domain: &str) -> VmdnsConfig {
    let mut config = VmdnsConfig::new(ProviderConfig::Cloudflare {
        api_token: "test-token".to_string(),
        account_email: None,
        domain: domain.to_string(),
        zone_id: None,
    });
    config.engine.max_attempts = 5;
    config.engine.poll_delay_secs = 1;
    config.engine.retry_delay_secs = 1;
    config
}

fn interfaces(address: Option<Ipv4Addr>) -> Vec<GuestInterface> {
    let mut list = vec![GuestInterface {
        name: "lo".to_string(),
        addresses: vec![InterfaceAddress::new(IpType::Ipv4, "127.0.0.1/8")],
    }];
    if let Some(addr) = address {
        list.push(GuestInterface {
            name: "eth0".to_string(),
            addresses: vec![InterfaceAddress::new(IpType::Ipv4, format!("{}/24", addr))],
        });
    }
    list
}

/// Call counters shared between a hypervisor double and the test
#[derive(Default)]
pub struct HypervisorCalls {
    pub state: AtomicUsize,
    pub start: AtomicUsize,
    pub clone: AtomicUsize,
    pub agent_interfaces: AtomicUsize,
    pub lease_interfaces: AtomicUsize,
    pub agent_ping: AtomicUsize,
    pub agent_exec: AtomicUsize,
    pub xml: AtomicUsize,
}

/// A hypervisor whose guest becomes visible through configured channels
pub struct ScriptedHypervisor {
    pub state: DomainState,
    /// Address reported by the agent once `agent_ready_after` queries have missed
    pub agent_address: Option<Ipv4Addr>,
    pub agent_ready_after: usize,
    pub lease_address: Option<Ipv4Addr>,
    /// Address reported by guest-network-get-interfaces; implies a live agent
    pub agent_network_address: Option<Ipv4Addr>,
    /// Whether the domain XML carries [`TEST_MAC`]
    pub with_mac: bool,
    pub fail_start: bool,
    pub calls: HypervisorCalls,
    pub cloned: Mutex<Vec<(String, String)>>,
}

impl ScriptedHypervisor {
    pub fn new() -> Self {
        Self {
            state: DomainState::Running,
            agent_address: None,
            agent_ready_after: 0,
            lease_address: None,
            agent_network_address: None,
            with_mac: false,
            fail_start: false,
            calls: HypervisorCalls::default(),
            cloned: Mutex::new(Vec::new()),
        }
    }

    /// Guest agent reports `address` immediately
    pub fn with_agent_address(address: Ipv4Addr) -> Self {
        Self {
            agent_address: Some(address),
            ..Self::new()
        }
    }

    /// A guest that never shows up on any channel
    pub fn invisible() -> Self {
        Self::new()
    }

    pub fn stopped(mut self) -> Self {
        self.state = DomainState::Stopped;
        self
    }

    pub fn starts(&self) -> usize {
        self.calls.start.load(Ordering::SeqCst)
    }

    pub fn clones(&self) -> usize {
        self.calls.clone.load(Ordering::SeqCst)
    }

    pub fn agent_queries(&self) -> usize {
        self.calls.agent_interfaces.load(Ordering::SeqCst)
    }

    pub fn lease_queries(&self) -> usize {
        self.calls.lease_interfaces.load(Ordering::SeqCst)
    }

    pub fn agent_pings(&self) -> usize {
        self.calls.agent_ping.load(Ordering::SeqCst)
    }

    pub fn xml_reads(&self) -> usize {
        self.calls.xml.load(Ordering::SeqCst)
    }

    /// Total hypervisor calls of any kind
    pub fn total_calls(&self) -> usize {
        [
            &self.calls.state,
            &self.calls.start,
            &self.calls.clone,
            &self.calls.agent_interfaces,
            &self.calls.lease_interfaces,
            &self.calls.agent_ping,
            &self.calls.agent_exec,
            &self.calls.xml,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl Hypervisor for ScriptedHypervisor {
    async fn domain_state(&self, _vm: &VmId) -> Result<DomainState> {
        self.calls.state.fetch_add(1, Ordering::SeqCst);
        Ok(self.state)
    }

    async fn start_domain(&self, vm: &VmId) -> Result<()> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(Error::hypervisor(format!("failed to start domain '{}'", vm)));
        }
        Ok(())
    }

    async fn clone_domain(&self, template: &str, new_name: &VmId) -> Result<String> {
        self.calls.clone.fetch_add(1, Ordering::SeqCst);
        self.cloned
            .lock()
            .unwrap()
            .push((template.to_string(), new_name.to_string()));
        Ok(TEST_MAC.to_string())
    }

    async fn domain_interfaces(&self, _vm: &VmId, via_agent: bool) -> Result<Vec<GuestInterface>> {
        if via_agent {
            let seen = self.calls.agent_interfaces.fetch_add(1, Ordering::SeqCst);
            if seen < self.agent_ready_after || self.agent_address.is_none() {
                return Err(Error::hypervisor("guest agent is not connected"));
            }
            Ok(interfaces(self.agent_address))
        } else {
            self.calls.lease_interfaces.fetch_add(1, Ordering::SeqCst);
            Ok(interfaces(self.lease_address))
        }
    }

    async fn domain_definition_xml(&self, vm: &VmId) -> Result<String> {
        self.calls.xml.fetch_add(1, Ordering::SeqCst);
        let iface = if self.with_mac {
            format!(
                "<interface type='network'><mac address='{}'/></interface>",
                TEST_MAC
            )
        } else {
            String::new()
        };
        Ok(format!(
            "<domain type='kvm'><name>{}</name><devices>{}</devices></domain>",
            vm, iface
        ))
    }

    async fn guest_agent_ping(&self, _vm: &VmId) -> bool {
        self.calls.agent_ping.fetch_add(1, Ordering::SeqCst);
        self.agent_network_address.is_some()
    }

    async fn guest_agent_exec(
        &self,
        _vm: &VmId,
        _command: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.calls.agent_exec.fetch_add(1, Ordering::SeqCst);
        let addr = self
            .agent_network_address
            .ok_or_else(|| Error::hypervisor("guest agent is not connected"))?;
        Ok(serde_json::json!({
            "return": [
                {"name": "lo", "ip-addresses": [{"ip-address-type": "ipv4", "ip-address": "127.0.0.1", "prefix": 8}]},
                {"name": "eth0", "ip-addresses": [{"ip-address-type": "ipv4", "ip-address": addr.to_string(), "prefix": 24}]}
            ]
        }))
    }
}

/// A neighbor table that learns an entry once it has been primed
#[derive(Default)]
pub struct MockNeighbors {
    pub known: Mutex<Vec<NeighborEntry>>,
    /// Entry that appears after the first `prime` call
    pub learned_on_prime: Option<NeighborEntry>,
    pub prime_calls: AtomicUsize,
    pub primed_targets: AtomicUsize,
}

impl MockNeighbors {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entry(address: Ipv4Addr, mac: &str) -> NeighborEntry {
        NeighborEntry {
            address: IpAddr::V4(address),
            mac: Some(mac.to_string()),
            device: Some("virbr0".to_string()),
            state: Some("REACHABLE".to_string()),
        }
    }

    pub fn learning(address: Ipv4Addr) -> Self {
        Self {
            learned_on_prime: Some(Self::entry(address, TEST_MAC)),
            ..Self::default()
        }
    }

    pub fn prime_calls(&self) -> usize {
        self.prime_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NeighborTable for MockNeighbors {
    async fn entries(&self) -> Result<Vec<NeighborEntry>> {
        Ok(self.known.lock().unwrap().clone())
    }

    fn prime(&self, targets: &[Ipv4Addr]) {
        self.prime_calls.fetch_add(1, Ordering::SeqCst);
        self.primed_targets.store(targets.len(), Ordering::SeqCst);
        if let Some(entry) = &self.learned_on_prime {
            self.known.lock().unwrap().push(entry.clone());
        }
    }
}

/// Shared state behind [`MockDnsProvider`]
#[derive(Default)]
pub struct ProviderState {
    pub zone: Option<DnsZone>,
    pub records: Mutex<Vec<DnsRecord>>,
    /// Errors returned by the next mutation calls, front first
    pub mutation_failures: Mutex<VecDeque<Error>>,
    /// Errors returned by the next mutation calls after they were applied
    pub lost_replies: Mutex<VecDeque<Error>>,
    pub find_zone_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub payloads: Mutex<Vec<RecordPayload>>,
    next_id: AtomicUsize,
}

/// An in-memory DNS provider that tracks calls
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Clone)]
pub struct MockDnsProvider {
    pub state: Arc<ProviderState>,
}

impl MockDnsProvider {
    pub fn new(zone_name: &str) -> Self {
        Self {
            state: Arc::new(ProviderState {
                zone: Some(DnsZone {
                    id: "zone123".to_string(),
                    name: zone_name.to_string(),
                }),
                ..ProviderState::default()
            }),
        }
    }

    /// A provider that holds no zones at all
    pub fn without_zone() -> Self {
        Self {
            state: Arc::new(ProviderState::default()),
        }
    }

    pub fn with_record(self, id: &str, fqdn: &str, content: &str) -> Self {
        self.state.records.lock().unwrap().push(DnsRecord {
            id: id.to_string(),
            name: fqdn.to_string(),
            content: content.to_string(),
            ttl: Some(120),
            proxied: Some(false),
        });
        self
    }

    pub fn fail_next_mutation(&self, error: Error) {
        self.state.mutation_failures.lock().unwrap().push_back(error);
    }

    /// Apply the next mutation but answer it with `error`
    pub fn lose_next_reply(&self, error: Error) {
        self.state.lost_replies.lock().unwrap().push_back(error);
    }

    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.state.update_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls()
    }

    pub fn find_zone_calls(&self) -> usize {
        self.state.find_zone_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<RecordPayload> {
        self.state.payloads.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.records.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<Error> {
        self.state.mutation_failures.lock().unwrap().pop_front()
    }

    fn take_lost_reply(&self) -> Option<Error> {
        self.state.lost_replies.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_zone(&self, domain: &str) -> Result<Option<DnsZone>> {
        self.state.find_zone_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.zone.clone().filter(|zone| zone.name == domain))
    }

    async fn list_a_records(&self, _zone: &DnsZone, fqdn: &str) -> Result<Vec<DnsRecord>> {
        self.state.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.name == fqdn)
            .cloned()
            .collect())
    }

    async fn create_a_record(&self, zone: &DnsZone, payload: &RecordPayload) -> Result<DnsRecord> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        self.state.payloads.lock().unwrap().push(payload.clone());
        if let Some(error) = self.take_failure() {
            return Err(error);
        }

        let id = format!("rec{}", self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = DnsRecord {
            id,
            name: format!("{}.{}", payload.name, zone.name),
            content: payload.content.clone(),
            ttl: Some(payload.ttl),
            proxied: Some(payload.proxied),
        };
        self.state.records.lock().unwrap().push(record.clone());
        if let Some(error) = self.take_lost_reply() {
            return Err(error);
        }
        Ok(record)
    }

    async fn update_a_record(
        &self,
        _zone: &DnsZone,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<DnsRecord> {
        self.state.update_calls.fetch_add(1, Ordering::SeqCst);
        self.state.payloads.lock().unwrap().push(payload.clone());
        if let Some(error) = self.take_failure() {
            return Err(error);
        }

        let mut records = self.state.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or_else(|| Error::not_found(format!("record {}", record_id)))?;
        record.content = payload.content.clone();
        record.ttl = Some(payload.ttl);
        record.proxied = Some(payload.proxied);
        let updated = record.clone();
        drop(records);
        if let Some(error) = self.take_lost_reply() {
            return Err(error);
        }
        Ok(updated)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A local resolver with a fixed answer
pub struct StaticResolver(pub Option<Ipv4Addr>);

#[async_trait]
impl LocalResolver for StaticResolver {
    async fn lookup_ipv4(&self, _hostname: &str) -> Option<Ipv4Addr> {
        self.0
    }
}

/// A guest configurator that records hostname changes
#[derive(Clone, Default)]
pub struct RecordingGuest {
    pub changes: Arc<Mutex<Vec<(Ipv4Addr, String)>>>,
    pub fail: bool,
}

impl RecordingGuest {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn changes(&self) -> Vec<(Ipv4Addr, String)> {
        self.changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl GuestConfigurator for RecordingGuest {
    async fn set_hostname(&self, address: Ipv4Addr, hostname: &str) -> Result<()> {
        self.changes
            .lock()
            .unwrap()
            .push((address, hostname.to_string()));
        if self.fail {
            return Err(Error::Other("ssh exited with status 255".to_string()));
        }
        Ok(())
    }
}

/// Everything a test needs to drive and inspect one engine
pub struct Harness {
    pub hypervisor: Arc<ScriptedHypervisor>,
    pub neighbors: Arc<MockNeighbors>,
    pub provider: MockDnsProvider,
    pub guest: RecordingGuest,
    pub engine: vmdns_core::VmDnsEngine,
}

impl Harness {
    pub fn build(
        hypervisor: ScriptedHypervisor,
        neighbors: MockNeighbors,
        provider: MockDnsProvider,
        local: Option<Ipv4Addr>,
        config: VmdnsConfig,
    ) -> Self {
        Self::build_with_guest(
            hypervisor,
            neighbors,
            provider,
            local,
            RecordingGuest::default(),
            config,
        )
    }

    pub fn build_with_guest(
        hypervisor: ScriptedHypervisor,
        neighbors: MockNeighbors,
        provider: MockDnsProvider,
        local: Option<Ipv4Addr>,
        guest: RecordingGuest,
        config: VmdnsConfig,
    ) -> Self {
        let hypervisor = Arc::new(hypervisor);
        let neighbors = Arc::new(neighbors);
        let engine = vmdns_core::VmDnsEngine::new(
            hypervisor.clone(),
            neighbors.clone(),
            Box::new(provider.clone()),
            Box::new(StaticResolver(local)),
            Box::new(guest.clone()),
            config,
        )
        .expect("engine construction succeeds");

        Self {
            hypervisor,
            neighbors,
            provider,
            guest,
            engine,
        }
    }
}
