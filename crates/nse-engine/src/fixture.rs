//! Demo host/port fixture loader, standing in for the real scanner's live
//! target database (`spec.md` §1 "the rest of the scanner... is out of
//! scope").

use std::path::Path;

use nse_core::{HostSnapshot, PortSnapshot, PortState, Protocol};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FixtureRaw {
    #[serde(default)]
    host: Vec<HostRaw>,
}

#[derive(Debug, Deserialize)]
struct HostRaw {
    id: u64,
    address: String,
    #[serde(default)]
    os_family: Option<String>,
    #[serde(default)]
    port: Vec<PortRaw>,
}

#[derive(Debug, Deserialize)]
struct PortRaw {
    number: u16,
    protocol: String,
    state: String,
    #[serde(default)]
    service: Option<String>,
}

/// Load a demo scan target list from a TOML fixture file.
///
/// Expected shape:
///
/// ```toml
/// [[host]]
/// id = 1
/// address = "10.0.0.5"
///
///   [[host.port]]
///   number = 23
///   protocol = "tcp"
///   state = "open"
/// ```
pub fn load_hosts(path: impl AsRef<Path>) -> anyhow::Result<Vec<HostSnapshot>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let raw: FixtureRaw = toml::from_str(&content)?;
    raw.host.into_iter().map(convert_host).collect()
}

fn convert_host(raw: HostRaw) -> anyhow::Result<HostSnapshot> {
    let ports = raw
        .port
        .into_iter()
        .map(convert_port)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(HostSnapshot {
        id: raw.id,
        address: raw.address,
        os_family: raw.os_family,
        ports,
    })
}

fn convert_port(raw: PortRaw) -> anyhow::Result<PortSnapshot> {
    let protocol = match raw.protocol.as_str() {
        "tcp" => Protocol::Tcp,
        "udp" => Protocol::Udp,
        other => anyhow::bail!("unknown port protocol '{other}'"),
    };
    let state = match raw.state.as_str() {
        "open" => PortState::Open,
        "closed" => PortState::Closed,
        "filtered" => PortState::Filtered,
        other => anyhow::bail!("unknown port state '{other}'"),
    };
    Ok(PortSnapshot {
        number: raw.number,
        protocol,
        state,
        service: raw.service,
    })
}
