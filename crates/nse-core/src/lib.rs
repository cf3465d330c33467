//! Pure data model shared by the Network Scripting Engine: host/port
//! snapshots, the small `Value` universe scripts compute with, and the
//! output sanitizer (C7). No I/O, no scheduling — those live in
//! `nse-lang` (script loading) and `nse-runtime` (selection/scheduling).

pub mod error;
pub mod host;
pub mod sanitize;
pub mod task_state;
pub mod value;

pub use error::{CoreError, CoreReason, CoreResult};
pub use host::{HostSnapshot, PortSnapshot, PortState, Protocol};
pub use sanitize::sanitize;
pub use task_state::TaskState;
pub use value::Value;

/// A script's runlevel (`spec.md` §3): a positive integer grouping tasks
/// into ordered execution phases. Always >= 1 (the declared rational
/// runlevel is ceiled and floored to 1 at load time, see `nse-lang`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Runlevel(pub u32);

impl Runlevel {
    pub const DEFAULT: Runlevel = Runlevel(1);

    /// Ceil a declared rational runlevel to the next integer, defaulting
    /// to 1 for non-positive or missing values (`spec.md` §3, §4.3 step 5).
    pub fn from_declared(value: Option<f64>) -> Self {
        match value {
            Some(v) if v > 0.0 => Runlevel(v.ceil() as u32),
            _ => Self::DEFAULT,
        }
    }
}

impl Default for Runlevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for Runlevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runlevel_defaults_to_one() {
        assert_eq!(Runlevel::from_declared(None), Runlevel(1));
        assert_eq!(Runlevel::from_declared(Some(0.0)), Runlevel(1));
        assert_eq!(Runlevel::from_declared(Some(-3.0)), Runlevel(1));
    }

    #[test]
    fn runlevel_ceils_rationals() {
        assert_eq!(Runlevel::from_declared(Some(1.2)), Runlevel(2));
        assert_eq!(Runlevel::from_declared(Some(2.0)), Runlevel(2));
    }
}
