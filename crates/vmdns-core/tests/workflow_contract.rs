//! Architectural Contract Test: Start and Clone Workflows
//!
//! Constraints verified:
//! - `start` on a running VM does not start it again
//! - `start` on a stopped VM starts it exactly once
//! - `clone` clones, starts, publishes DNS, then sets the guest hostname
//! - Hypervisor failures abort the run before DNS is touched

mod common;

use common::*;
use vmdns_core::Error;
use vmdns_core::engine::Workflow;

fn clone_of(template: &str) -> Workflow {
    Workflow::Clone {
        template: template.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn running_vm_is_not_restarted() {
    let h = Harness::build(
        ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 45)),
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        minimal_config("example.com"),
    );

    let report = h.engine.run(&vm("web1"), &Workflow::Start).await.unwrap();

    assert_eq!(h.hypervisor.starts(), 0);
    assert_eq!(h.hypervisor.clones(), 0);
    assert!(!report.hostname_set);
    assert!(h.guest.changes().is_empty(), "start never reconfigures the guest");
}

#[tokio::test(start_paused = true)]
async fn stopped_vm_is_started_once() {
    let h = Harness::build(
        ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 45)).stopped(),
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        minimal_config("example.com"),
    );

    h.engine.run(&vm("web1"), &Workflow::Start).await.unwrap();

    assert_eq!(h.hypervisor.starts(), 1);
}

#[tokio::test(start_paused = true)]
async fn clone_publishes_dns_then_sets_hostname() {
    let h = Harness::build(
        ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 60)),
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        minimal_config("example.com"),
    );

    let report = h
        .engine
        .run(&vm("web2.example.com"), &clone_of("debian-12"))
        .await
        .unwrap();

    assert_eq!(h.hypervisor.clones(), 1);
    assert_eq!(h.hypervisor.starts(), 1);
    assert_eq!(
        h.hypervisor.cloned.lock().unwrap().clone(),
        vec![("debian-12".to_string(), "web2.example.com".to_string())]
    );
    assert_eq!(report.fqdn, "web2.example.com");
    assert_eq!(h.provider.payloads()[0].name, "web2");
    assert!(report.hostname_set);
    assert_eq!(
        h.guest.changes(),
        vec![(ip(192, 168, 122, 60), "web2".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn dry_run_clone_leaves_guest_hostname_alone() {
    let mut config = minimal_config("example.com");
    config.engine.dry_run = true;
    let h = Harness::build(
        ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 60)),
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        config,
    );

    let report = h.engine.run(&vm("web2"), &clone_of("debian-12")).await.unwrap();

    assert!(!report.hostname_set);
    assert!(h.guest.changes().is_empty());
    assert_eq!(h.provider.mutation_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn guest_failure_is_reported_after_dns_is_published() {
    let h = Harness::build_with_guest(
        ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 60)),
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        RecordingGuest::failing(),
        minimal_config("example.com"),
    );

    let err = h
        .engine
        .run(&vm("web2"), &clone_of("debian-12"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::GuestConfiguration { ref host, .. } if host == "192.168.122.60"));
    assert_eq!(h.provider.create_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_start_aborts_before_dns() {
    let hypervisor = ScriptedHypervisor {
        fail_start: true,
        ..ScriptedHypervisor::with_agent_address(ip(192, 168, 122, 45)).stopped()
    };
    let h = Harness::build(
        hypervisor,
        MockNeighbors::empty(),
        MockDnsProvider::new("example.com"),
        None,
        minimal_config("example.com"),
    );

    let err = h.engine.run(&vm("web1"), &Workflow::Start).await.unwrap_err();

    assert!(matches!(err, Error::Hypervisor(_)));
    assert_eq!(h.hypervisor.agent_queries(), 0);
    assert_eq!(h.provider.list_calls(), 0);
}
