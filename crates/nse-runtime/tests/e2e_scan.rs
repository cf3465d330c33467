//! End-to-end scan tests against a self-contained stub `HostApi`, covering
//! the literal scenarios of `spec.md` §8 (`SPEC_FULL.md` §4.12).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use nse_core::{HostSnapshot, PortSnapshot, PortState, Protocol};
use nse_runtime::host_api::{FetchKind, Fetched, HostApi, ProgressMeter};
use nse_runtime::run_scan;
use nse_runtime::task::TaskId;
use nse_runtime::wake::WakeSender;

struct NullMeter;
impl ProgressMeter for NullMeter {
    fn print_stats(&self, _frac: f64) {}
    fn print_stats_if_necessary(&self, _frac: f64) {}
    fn may_be_printed(&self) -> bool {
        false
    }
    fn end_task(&self) {}
}

/// A `HostApi` stub whose `nsock_loop` resolves every outstanding wait on
/// its next call (one simulated network round-trip per tick) unless the
/// task is in `stuck_tasks`, which never wakes (`spec.md` §8 scenario 5).
struct StubApi {
    scripts: Mutex<std::collections::HashMap<String, PathBuf>>,
    dbpath: PathBuf,
    key_pressed: AtomicBool,
    pending_wakes: Mutex<Vec<(TaskId, WakeSender)>>,
    stuck_tasks: Mutex<HashSet<TaskId>>,
    timed_out_hosts: Mutex<HashSet<u64>>,
    host_outputs: Mutex<Vec<(u64, String, String, u64)>>,
    port_outputs: Mutex<Vec<(u64, u16, String, String, u64)>>,
    sequence: AtomicU64,
}

impl StubApi {
    fn new(dbpath: PathBuf) -> Self {
        Self {
            scripts: Mutex::new(std::collections::HashMap::new()),
            dbpath,
            key_pressed: AtomicBool::new(false),
            pending_wakes: Mutex::new(Vec::new()),
            stuck_tasks: Mutex::new(HashSet::new()),
            timed_out_hosts: Mutex::new(HashSet::new()),
            host_outputs: Mutex::new(Vec::new()),
            port_outputs: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    fn register_script(&self, name: &str, path: PathBuf) {
        self.scripts.lock().unwrap().insert(name.to_string(), path);
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl HostApi for StubApi {
    fn fetchfile_absolute(&self, path: &str) -> Fetched {
        let scripts = self.scripts.lock().unwrap();
        let key = path.strip_suffix(".nse").unwrap_or(path);
        match scripts.get(key) {
            Some(p) => Fetched {
                kind: FetchKind::File,
                absolute_path: p.clone(),
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
        &self.dbpath
    }
    fn scriptversion(&self) -> bool {
        false
    }
    fn default_mode(&self) -> bool {
        false
    }
    fn scriptargs(&self) -> &str {
        ""
    }
    fn verbosity(&self) -> i32 {
        0
    }
    fn debugging(&self) -> i32 {
        0
    }
    fn scan_progress_meter(&self, _name: &str) -> Arc<dyn ProgressMeter> {
        Arc::new(NullMeter)
    }
    async fn nsock_loop(&self, _ms: u64) {
        // A small real sleep keeps the outer loop from busy-spinning and
        // lets concurrently-scheduled tokio timers (e.g. the timeout-flip
        // task below) actually interleave.
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        let stuck = self.stuck_tasks.lock().unwrap().clone();
        let mut pending = self.pending_wakes.lock().unwrap();
        let mut still_pending = Vec::new();
        for (id, tx) in pending.drain(..) {
            if stuck.contains(&id) {
                still_pending.push((id, tx));
                continue;
            }
            let _ = tx.send(nse_runtime::wake::WakeEvent {
                task_id: id,
                args: vec![],
            });
        }
        *pending = still_pending;
    }
    fn key_was_pressed(&self) -> bool {
        self.key_pressed.load(Ordering::SeqCst)
    }
    fn start_timeout_clock(&self, _host_id: u64) {}
    fn stop_timeout_clock(&self, _host_id: u64) {}
    fn timed_out(&self, host_id: u64) -> bool {
        self.timed_out_hosts.lock().unwrap().contains(&host_id)
    }
    fn host_set_output(&self, host_id: u64, script_id: &str, text: &str) {
        let seq = self.next_seq();
        self.host_outputs
            .lock()
            .unwrap()
            .push((host_id, script_id.to_string(), text.to_string(), seq));
    }
    fn port_set_output(&self, host_id: u64, port: u16, script_id: &str, text: &str) {
        let seq = self.next_seq();
        self.port_outputs
            .lock()
            .unwrap()
            .push((host_id, port, script_id.to_string(), text.to_string(), seq));
    }
    fn dump_dir(&self, _path: &Path) -> std::io::Result<Vec<PathBuf>> {
        Ok(vec![])
    }
    fn begin_wait(&self, task_id: TaskId, wake_tx: WakeSender) {
        self.pending_wakes.lock().unwrap().push((task_id, wake_tx));
    }
}

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(format!("{name}.nse"));
    std::fs::write(&path, body).unwrap();
    path
}

fn empty_index(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("scripts.db");
    std::fs::write(&path, "entries = []\n").unwrap();
    path
}

#[tokio::test]
async fn host_rule_hit_delivers_exactly_one_output() {
    let dir = tempfile::tempdir().unwrap();
    let dbpath = empty_index(&dir);
    let script_path = write_script(
        &dir,
        "ok-script",
        r#"
        description = "always matches, always ok"
        categories = ["safe"]
        hostrule = true
        action = "ok"
        "#,
    );

    let api = StubApi::new(dbpath);
    api.register_script("ok-script", script_path);

    let host = HostSnapshot {
        id: 1,
        address: "10.0.0.1".into(),
        os_family: None,
        ports: vec![],
    };

    run_scan(&["ok-script".to_string()], &[host], &api)
        .await
        .unwrap();

    let outputs = api.host_outputs.lock().unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].0, 1);
    assert_eq!(outputs[0].1, "ok-script");
    assert_eq!(outputs[0].2, "ok");
}

#[tokio::test]
async fn port_rule_two_runlevels_orders_output_by_runlevel() {
    let dir = tempfile::tempdir().unwrap();
    let dbpath = empty_index(&dir);
    let script_a = write_script(
        &dir,
        "script-a",
        r#"
        description = "runlevel 1"
        categories = ["safe"]
        runlevel = 1
        portrule = port.number == 80
        action = "A"
        "#,
    );
    let script_b = write_script(
        &dir,
        "script-b",
        r#"
        description = "runlevel 2"
        categories = ["safe"]
        runlevel = 2
        portrule = port.number == 80
        action = "B"
        "#,
    );

    let api = StubApi::new(dbpath);
    api.register_script("script-a", script_a);
    api.register_script("script-b", script_b);

    let host = HostSnapshot {
        id: 1,
        address: "10.0.0.1".into(),
        os_family: None,
        ports: vec![PortSnapshot {
            number: 80,
            protocol: Protocol::Tcp,
            state: PortState::Open,
            service: None,
        }],
    };

    run_scan(
        &["script-a".to_string(), "script-b".to_string()],
        &[host],
        &api,
    )
    .await
    .unwrap();

    let outputs = api.port_outputs.lock().unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].2, "script-a");
    assert_eq!(outputs[1].2, "script-b");
    assert!(outputs[0].4 < outputs[1].4, "A's output must be delivered strictly before B's");
}

#[tokio::test]
async fn sanitizes_non_printable_bytes_in_delivered_output() {
    let dir = tempfile::tempdir().unwrap();
    let dbpath = empty_index(&dir);
    let script_path = write_script(
        &dir,
        "dirty",
        "description = \"emits a raw high byte\"\ncategories = [\"safe\"]\nhostrule = true\naction = \"A\u{0}\t\u{FF}B\"\n",
    );

    let api = StubApi::new(dbpath);
    api.register_script("dirty", script_path);

    let host = HostSnapshot {
        id: 1,
        address: "10.0.0.1".into(),
        os_family: None,
        ports: vec![],
    };

    run_scan(&["dirty".to_string()], &[host], &api).await.unwrap();

    let outputs = api.host_outputs.lock().unwrap();
    assert_eq!(outputs.len(), 1);
    let text = &outputs[0].2;
    assert!(text.starts_with("A\\x00\t"));
    assert!(!text.bytes().any(|b| b >= 0x80));
}

#[tokio::test]
async fn timed_out_host_drops_the_waiting_task_and_delivers_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let dbpath = empty_index(&dir);
    let script_path = write_script(
        &dir,
        "hangs",
        r#"
        description = "never completes"
        categories = ["safe"]
        hostrule = true
        action = "never seen"
        "#,
    );

    let api = StubApi::new(dbpath);
    api.register_script("hangs", script_path);
    // Only one task will ever be created (one host, hostrule script); it
    // never wakes, forcing the scheduler to rely on the timeout sweep.
    api.stuck_tasks.lock().unwrap().insert(TaskId(1));

    let host = HostSnapshot {
        id: 1,
        address: "10.0.0.1".into(),
        os_family: None,
        ports: vec![],
    };

    // Flip the host to timed-out shortly after the scan starts so the
    // scheduler's outer loop observes it on an early timeout sweep.
    let api = Arc::new(api);
    let api_clone = Arc::clone(&api);
    let timeout_flip = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        api_clone.timed_out_hosts.lock().unwrap().insert(1);
    });

    run_scan(&["hangs".to_string()], &[host], api.as_ref())
        .await
        .unwrap();
    timeout_flip.await.unwrap();

    assert!(api.host_outputs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_rule_list_with_default_mode_off_selects_zero_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let dbpath = empty_index(&dir);
    let api = StubApi::new(dbpath);

    let host = HostSnapshot {
        id: 1,
        address: "10.0.0.1".into(),
        os_family: None,
        ports: vec![],
    };

    run_scan(&[], &[host], &api).await.unwrap();
    assert!(api.host_outputs.lock().unwrap().is_empty());
}
