use std::fmt;

/// Transport protocol of a scanned port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Scanner-reported state of a port. Scripts only ever see `Open` ports
/// (the Task Factory is never invoked for closed/filtered ports), but the
/// field is kept on the snapshot since scripts may want to display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
        }
    }
}

/// A deep-copyable snapshot of one scanned port.
///
/// Per `spec.md` §3/§5, a fresh copy of this struct is handed to every
/// Task; mutating one Task's copy must never be observable by another
/// Task. `Clone` makes that guarantee mechanical rather than convention.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PortSnapshot {
    pub number: u16,
    pub protocol: Protocol,
    pub state: PortState,
    pub service: Option<String>,
}

/// A deep-copyable snapshot of one scanned host.
///
/// `ports` is the full list reported for the host; `Host Adapter::ports`
/// (§4.6) serves this list to the Scheduler/Task Factory. The `id` is an
/// opaque identity used for timeout-clock bookkeeping (§3 "Ownership");
/// it is not necessarily the address (a host could be re-scanned under a
/// different transient identity in a future extension — callers should
/// not assume `id == address`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HostSnapshot {
    pub id: u64,
    pub address: String,
    pub os_family: Option<String>,
    pub ports: Vec<PortSnapshot>,
}

impl HostSnapshot {
    pub fn open_ports(&self) -> impl Iterator<Item = &PortSnapshot> {
        self.ports.iter().filter(|p| p.state == PortState::Open)
    }
}
