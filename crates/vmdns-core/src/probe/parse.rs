//! Parsers for hypervisor-provided text consumed by discovery strategies
//!
//! Kept apart from process invocation so they can be tested against captured
//! output.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn mac_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<mac\s+address\s*=\s*['"]([0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5})['"]"#)
            .expect("MAC regex is valid")
    })
}

/// MAC addresses of all interfaces in a domain XML definition, lower-cased,
/// in document order
pub fn mac_addresses(domain_xml: &str) -> Vec<String> {
    mac_regex()
        .captures_iter(domain_xml)
        .map(|caps| caps[1].to_lowercase())
        .collect()
}

/// IPv4 addresses from a `guest-network-get-interfaces` reply
///
/// Accepts either the full agent reply (`{"return": [...]}`) or the bare
/// interface array. The interface named `lo` is skipped entirely; only
/// `ipv4`-typed addresses are returned, in reply order.
pub fn agent_ipv4_addresses(reply: &Value) -> Vec<String> {
    let interfaces = match reply.get("return").unwrap_or(reply).as_array() {
        Some(interfaces) => interfaces,
        None => return Vec::new(),
    };

    interfaces
        .iter()
        .filter(|iface| iface.get("name").and_then(Value::as_str) != Some("lo"))
        .filter_map(|iface| iface.get("ip-addresses").and_then(Value::as_array))
        .flatten()
        .filter(|addr| addr.get("ip-address-type").and_then(Value::as_str) == Some("ipv4"))
        .filter_map(|addr| addr.get("ip-address").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}
