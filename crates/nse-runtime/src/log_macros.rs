/// Domain-aware logging macros (`SPEC_FULL.md` §4.10).
///
/// Each macro injects a `domain` field automatically so callers never need
/// to remember the string literal. Domains: `sel` (selector/loader),
/// `sched` (scheduler), `task` (task factory/output), `sys` (lifecycle).
///
/// ```ignore
/// use crate::log_macros::*;
///
/// nse_info!(sys, scripts = scripts.len(), "Loaded N scripts for scanning.");
/// nse_warn!(sched, host = host_id, "<task> target timed out");
/// ```
#[doc(hidden)]
macro_rules! nse_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! nse_error {
    ($domain:ident, $($rest:tt)*) => {
        nse_log!(error, $domain, $($rest)*)
    };
}

macro_rules! nse_warn {
    ($domain:ident, $($rest:tt)*) => {
        nse_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! nse_info {
    ($domain:ident, $($rest:tt)*) => {
        nse_log!(info, $domain, $($rest)*)
    };
}

macro_rules! nse_debug {
    ($domain:ident, $($rest:tt)*) => {
        nse_log!(debug, $domain, $($rest)*)
    };
}

#[allow(unused_macros)]
macro_rules! nse_trace {
    ($domain:ident, $($rest:tt)*) => {
        nse_log!(trace, $domain, $($rest)*)
    };
}
