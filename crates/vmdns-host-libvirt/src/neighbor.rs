//! Host neighbor cache via iproute2

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::process::Stdio;
use tokio::process::Command;
use vmdns_core::traits::{NeighborEntry, NeighborTable};
use vmdns_core::{Error, Result};

use crate::command::execute;
use crate::parse;

/// Neighbor table read with `ip neigh show`, primed with single pings
#[derive(Debug, Clone, Default)]
pub struct IpNeighborTable {
    /// Restrict reads to one device (e.g. `virbr0`)
    device: Option<String>,
}

impl IpNeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
        }
    }
}

#[async_trait]
impl NeighborTable for IpNeighborTable {
    async fn entries(&self) -> Result<Vec<NeighborEntry>> {
        let mut command = Command::new("ip");
        command.args(["neigh", "show"]);
        if let Some(device) = &self.device {
            command.args(["dev", device.as_str()]);
        }

        let output = execute(&mut command)
            .await
            .map_err(|e| Error::Other(format!("cannot read neighbor table: {}", e)))?;
        Ok(parse::neighbor_entries(&output))
    }

    fn prime(&self, targets: &[Ipv4Addr]) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime; skipping neighbor priming");
            return;
        };

        for target in targets {
            let target = target.to_string();
            runtime.spawn(async move {
                // Only the side effect on the neighbor cache matters
                let _ = Command::new("ping")
                    .args(["-c", "1", "-W", "1", target.as_str()])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await;
            });
        }
    }
}
