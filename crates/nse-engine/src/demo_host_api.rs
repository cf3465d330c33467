//! `DemoHostApi`: a `HostApi` implementation that plays the part of the
//! host scanner's C/C++ core (`spec.md` §1, §6), backed by plain files and
//! a simulated network layer, for end-to-end runs of this binary.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nse_config::ScanConfig;
use nse_runtime::host_api::{FetchKind, Fetched, HostApi, ProgressMeter};
use nse_runtime::task::TaskId;
use nse_runtime::wake::{WakeEvent, WakeSender};

/// A scan progress meter that logs under the `sched` domain instead of
/// drawing a terminal status bar (`spec.md` §6 `scan_progress_meter`;
/// upstream draws an ncurses bar, this CLI has no such surface).
struct TracingMeter {
    name: String,
}

impl ProgressMeter for TracingMeter {
    fn print_stats(&self, frac: f64) {
        tracing::info!(domain = "sched", name = %self.name, pct = (frac * 100.0) as u32, "progress");
    }
    fn print_stats_if_necessary(&self, frac: f64) {
        if frac >= 1.0 {
            self.print_stats(frac);
        }
    }
    fn may_be_printed(&self) -> bool {
        true
    }
    fn end_task(&self) {}
}

/// Demo implementation of the engine's host-program boundary (`spec.md`
/// §6). Scripts are resolved from `script_dir` on disk; the network layer
/// is simulated by waking every outstanding task once per `nsock_loop`
/// tick after a fixed latency, so runs are deterministic and fast.
pub struct DemoHostApi {
    config: ScanConfig,
    script_dir: PathBuf,
    pending: Mutex<Vec<(TaskId, WakeSender)>>,
    clocks: Mutex<std::collections::HashMap<u64, Instant>>,
    seq: AtomicU64,
}

impl DemoHostApi {
    pub fn new(config: ScanConfig, script_dir: PathBuf) -> Self {
        Self {
            config,
            script_dir,
            pending: Mutex::new(Vec::new()),
            clocks: Mutex::new(std::collections::HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = self.script_dir.join(name);
        if direct.is_file() {
            return Some(direct);
        }
        let with_ext = self.script_dir.join(format!("{name}.nse"));
        if with_ext.is_file() {
            return Some(with_ext);
        }
        if direct.is_dir() {
            return Some(direct);
        }
        None
    }
}

#[async_trait]
impl HostApi for DemoHostApi {
    fn fetchfile_absolute(&self, path: &str) -> Fetched {
        match self.resolve(path) {
            Some(p) if p.is_dir() => Fetched {
                kind: FetchKind::Directory,
                absolute_path: p,
            },
            Some(p) => Fetched {
                kind: FetchKind::File,
                absolute_path: p,
            },
            None => Fetched {
                kind: FetchKind::Nil,
                absolute_path: PathBuf::from(path),
            },
        }
    }

    fn updatedb(&self) -> bool {
        false
    }

    fn script_dbpath(&self) -> &Path {
        &self.config.script_dbpath
    }

    fn scriptversion(&self) -> bool {
        self.config.scriptversion
    }

    fn default_mode(&self) -> bool {
        self.config.default
    }

    fn scriptargs(&self) -> &str {
        &self.config.scriptargs
    }

    fn verbosity(&self) -> i32 {
        self.config.verbosity
    }

    fn debugging(&self) -> i32 {
        self.config.debugging
    }

    fn scan_progress_meter(&self, name: &str) -> Arc<dyn ProgressMeter> {
        Arc::new(TracingMeter {
            name: name.to_string(),
        })
    }

    async fn nsock_loop(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms.min(self.config.tick_budget_ms))).await;
        let pending = {
            let mut guard = self.pending.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        for (task_id, tx) in pending {
            let _ = tx.send(WakeEvent {
                task_id,
                args: vec![],
            });
        }
    }

    fn key_was_pressed(&self) -> bool {
        false
    }

    fn start_timeout_clock(&self, host_id: u64) {
        self.clocks.lock().unwrap().insert(host_id, Instant::now());
    }

    fn stop_timeout_clock(&self, host_id: u64) {
        self.clocks.lock().unwrap().remove(&host_id);
    }

    fn timed_out(&self, host_id: u64) -> bool {
        match self.clocks.lock().unwrap().get(&host_id) {
            Some(started) => started.elapsed() >= Duration::from_millis(self.config.host_timeout_ms),
            None => false,
        }
    }

    fn host_set_output(&self, host_id: u64, script_id: &str, text: &str) {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        tracing::info!(domain = "task", host_id, script = script_id, seq = n, "{text}");
    }

    fn port_set_output(&self, host_id: u64, port: u16, script_id: &str, text: &str) {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        tracing::info!(domain = "task", host_id, port, script = script_id, seq = n, "{text}");
    }

    fn dump_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("nse") {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    fn begin_wait(&self, task_id: TaskId, wake_tx: WakeSender) {
        self.pending.lock().unwrap().push((task_id, wake_tx));
    }
}
