//! Runtime: Host Adapter (C1), Selector (C3), Task Factory (C4), Runlevel
//! Partitioner (C5), Scheduler (C6), and the lifecycle wiring that ties
//! them together for one scan (`spec.md` §4.2-§4.6, `SPEC_FULL.md` §2).

#[macro_use]
mod log_macros;

pub mod error;
pub mod host_api;
pub mod lifecycle;
pub mod partitioner;
pub mod scheduler;
pub mod selector;
pub mod task;
pub mod wake;

pub use error::{RuntimeError, RuntimeReason, RuntimeResult};
pub use host_api::{FetchKind, Fetched, HostApi, ProgressMeter};
pub use lifecycle::run_scan;
pub use partitioner::partition_by_runlevel;
pub use selector::select;
pub use task::{build_tasks_for_host, Task, TaskId, TaskKind};
pub use wake::{wake_channel, WakeEvent, WakeReceiver, WakeSender};
