//! Task data model (`spec.md` §3 "Task") and the Task Factory (C4,
//! `spec.md` §4.3).

use std::panic::AssertUnwindSafe;

use nse_core::{HostSnapshot, PortSnapshot, Runlevel, TaskState, Value};
use nse_lang::{eval, EvalContext, ScriptRef};

use crate::host_api::HostApi;
use crate::wake::WakeSender;

/// Opaque per-task identifier (`spec.md` §3 "Opaque identifier for
/// logs"). Unique for the lifetime of one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Whether a [`Task`] was built against a `hostrule` or a `portrule`
/// (`spec.md` §3 "Kind: host or port").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Host,
    Port,
}

/// The per-task environment a script's body would populate
/// (`spec.md` §3, §9 "Script globals without leakage"). Our expression
/// language has no imperative initializer step (`SPEC_FULL.md` §4.1a), so
/// this struct carries only the two bindings `spec.md` §4.3 step 1 names
/// explicitly; there is nothing for a script to mutate into it.
#[derive(Debug, Clone)]
pub struct TaskEnv {
    pub runlevel: Runlevel,
    pub filename: std::path::PathBuf,
}

/// One execution unit: a `Script` evaluated against a specific host or
/// (host, port) (`spec.md` §3 "Task").
#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    pub script: ScriptRef,
    pub kind: TaskKind,
    pub env: TaskEnv,
    /// Deep copy — owned exclusively by this task (`spec.md` §3, §5).
    pub host: HostSnapshot,
    /// Deep copy, present only for `TaskKind::Port` tasks.
    pub port: Option<PortSnapshot>,
    pub state: TaskState,
    pub resume_args: Vec<Value>,
    pub output: Option<String>,
    /// Whether this task has already suspended once on its simulated
    /// network wait. `false` on construction: the first resume registers
    /// the wait and suspends; the second resume (after the wake hook fires)
    /// evaluates `action` and completes. The typed-systems substitute for
    /// a coroutine's "control re-enters at the point just after the yield"
    /// (`spec.md` §4.3 step 4).
    pub awaiting_action: bool,
}

/// What happened when the Scheduler drove a [`Task`] one step forward
/// (`spec.md` §4.5 "Run sweep").
pub enum ResumeOutcome {
    /// The task registered a network wait and should move to `waiting`.
    Suspended,
    /// The task's `action` finished; `None` means no output (spec.md §3:
    /// "returning an optional string or nothing").
    Completed(Option<String>),
    /// `action` panicked evaluating (§7 "Task error", non-fatal).
    Errored,
}

impl Task {
    pub fn runlevel(&self) -> Runlevel {
        self.env.runlevel
    }

    /// A human-readable label for logs (`spec.md` §8 scenario 5:
    /// `"<task> target timed out"`).
    pub fn label(&self) -> String {
        match (&self.kind, &self.port) {
            (TaskKind::Port, Some(p)) => {
                format!("{}/{}:{}", self.script.id, self.host.address, p.number)
            }
            _ => format!("{}/{}", self.script.id, self.host.address),
        }
    }

    /// Drive this task one step forward (`spec.md` §4.5 "Resume the task
    /// with its `resume_args`"). The applicability predicate already ran
    /// in the Task Factory (§4.3); this only covers the two-phase lifetime
    /// of `action` — one suspend on the simulated network wait, then one
    /// completion once woken.
    pub fn resume(&mut self, id: TaskId, api: &dyn HostApi, wake_tx: &WakeSender) -> ResumeOutcome {
        if !self.awaiting_action {
            self.awaiting_action = true;
            api.begin_wait(id, wake_tx.clone());
            return ResumeOutcome::Suspended;
        }

        let ctx = match &self.port {
            Some(p) => EvalContext::host_and_port(&self.host, p),
            None => EvalContext::host_only(&self.host),
        };
        let script = self.script.clone();
        match std::panic::catch_unwind(AssertUnwindSafe(|| eval(&script.action, &ctx))) {
            Ok(value) => {
                let text = value.to_string();
                if text.is_empty() {
                    ResumeOutcome::Completed(None)
                } else {
                    ResumeOutcome::Completed(Some(text))
                }
            }
            Err(_) => ResumeOutcome::Errored,
        }
    }
}

/// Task Factory (C4, `spec.md` §4.3): evaluate `script`'s `hostrule`
/// against `host`. Returns `None` if the predicate is absent, false, or
/// panics (treated as a raised predicate error, logged by the caller and
/// swallowed — `spec.md` §4.3 "Failure").
pub fn build_host_task(id: TaskId, script: &ScriptRef, host: &HostSnapshot) -> Option<Task> {
    let predicate = script.hostrule.as_ref()?;
    let ctx = EvalContext::host_only(host);
    let truthy = std::panic::catch_unwind(AssertUnwindSafe(|| eval(predicate, &ctx).is_truthy()))
        .unwrap_or_else(|_| {
            tracing::warn!(domain = "task", task = %id, script = %script.id, "hostrule predicate panicked");
            false
        });
    if !truthy {
        return None;
    }
    Some(Task {
        id,
        script: script.clone(),
        kind: TaskKind::Host,
        env: TaskEnv {
            runlevel: script.runlevel,
            filename: script.filename.clone(),
        },
        host: host.clone(),
        port: None,
        state: TaskState::Ready,
        resume_args: Vec::new(),
        output: None,
        awaiting_action: false,
    })
}

/// Task Factory (C4) for a `portrule`, evaluated against `(host, port)`.
pub fn build_port_task(
    id: TaskId,
    script: &ScriptRef,
    host: &HostSnapshot,
    port: &PortSnapshot,
) -> Option<Task> {
    let predicate = script.portrule.as_ref()?;
    let ctx = EvalContext::host_and_port(host, port);
    let truthy = std::panic::catch_unwind(AssertUnwindSafe(|| eval(predicate, &ctx).is_truthy()))
        .unwrap_or_else(|_| {
            tracing::warn!(domain = "task", task = %id, script = %script.id, "portrule predicate panicked");
            false
        });
    if !truthy {
        return None;
    }
    Some(Task {
        id,
        script: script.clone(),
        kind: TaskKind::Port,
        env: TaskEnv {
            runlevel: script.runlevel,
            filename: script.filename.clone(),
        },
        host: host.clone(),
        port: Some(port.clone()),
        state: TaskState::Ready,
        resume_args: Vec::new(),
        output: None,
        awaiting_action: false,
    })
}

/// Build every task a `script` produces for one `host`: a host-kind task
/// if `hostrule` matches, then one port-kind task per open port whose
/// `portrule` matches, in the host's port order (`spec.md` §4.4 "task
/// order is construction order: hostrule tasks ... then portrule tasks
/// per host").
pub fn build_tasks_for_host(
    next_id: &mut impl FnMut() -> TaskId,
    script: &ScriptRef,
    host: &HostSnapshot,
) -> Vec<Task> {
    let mut tasks = Vec::new();
    if script.has_hostrule() {
        if let Some(t) = build_host_task(next_id(), script, host) {
            tasks.push(t);
        }
    }
    if script.has_portrule() {
        for port in host.open_ports() {
            if let Some(t) = build_port_task(next_id(), script, host, port) {
                tasks.push(t);
            }
        }
    }
    tasks
}
