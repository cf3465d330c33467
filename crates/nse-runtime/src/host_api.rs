//! The embedded entry point's `api` object (`spec.md` §6), as a trait so
//! the engine can be driven by a real scanner/socket layer or by
//! `nse-engine`'s `DemoHostApi` stand-in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::task::TaskId;
use crate::wake::WakeSender;

/// Result of `fetchfile_absolute` (`spec.md` §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    File,
    Directory,
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub kind: FetchKind,
    pub absolute_path: PathBuf,
}

/// A scan progress meter handle (`spec.md` §6 `scan_progress_meter`).
pub trait ProgressMeter: Send + Sync {
    fn print_stats(&self, frac: f64);
    fn print_stats_if_necessary(&self, frac: f64);
    fn may_be_printed(&self) -> bool;
    fn end_task(&self);
}

/// The host program's interface to the engine (`spec.md` §6), covering
/// script discovery, the outer-loop I/O pump, host timeout bookkeeping,
/// and the output sinks. One `HostApi` is shared for the whole scan.
#[async_trait]
pub trait HostApi: Send + Sync {
    fn fetchfile_absolute(&self, path: &str) -> Fetched;
    fn updatedb(&self) -> bool;

    fn script_dbpath(&self) -> &Path;
    fn scriptversion(&self) -> bool;
    fn default_mode(&self) -> bool;
    fn scriptargs(&self) -> &str;
    fn verbosity(&self) -> i32;
    fn debugging(&self) -> i32;

    fn scan_progress_meter(&self, name: &str) -> Arc<dyn ProgressMeter>;

    /// Drive the external I/O layer for up to `ms` milliseconds, delivering
    /// any wake-ups whose simulated work completed in that window.
    async fn nsock_loop(&self, ms: u64);

    fn key_was_pressed(&self) -> bool;

    fn start_timeout_clock(&self, host_id: u64);
    fn stop_timeout_clock(&self, host_id: u64);
    fn timed_out(&self, host_id: u64) -> bool;

    fn host_set_output(&self, host_id: u64, script_id: &str, text: &str);
    fn port_set_output(&self, host_id: u64, port: u16, script_id: &str, text: &str);

    fn dump_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>>;

    /// Register that `task_id` is suspended on simulated network I/O; the
    /// implementation eventually sends a `WakeEvent` through `wake_tx` once
    /// that I/O completes (`spec.md` §5 "explicit network (or timer) wait
    /// points provided by the asynchronous I/O layer").
    ///
    /// Not itself a `spec.md` §6 bullet — those describe the outer-loop
    /// pump (`nsock_loop`), not how a single task suspends — but required
    /// for a concrete `HostApi` implementation to produce real
    /// suspension/resumption instead of completing every task synchronously.
    fn begin_wait(&self, task_id: TaskId, wake_tx: WakeSender);
}
