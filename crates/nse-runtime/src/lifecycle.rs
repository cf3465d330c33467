//! Scan lifecycle wiring (`SPEC_FULL.md` §2 "data flow: Selector →
//! (Scripts) → Task Factory (per host, per port) → Partitioner →
//! Scheduler → Sanitizer → host output channels").
//!
//! This is the one function the embedded entry point calls once per scan
//! (`spec.md` §6: "It returns a callable invoked once per scan with
//! `(hosts)`").

use nse_config::parse_script_args;
use nse_core::HostSnapshot;
use orion_error::prelude::*;

use crate::host_api::HostApi;
use crate::partitioner::partition_by_runlevel;
use crate::selector::select;
use crate::task::{build_tasks_for_host, TaskId};
use crate::error::{RuntimeReason, RuntimeResult};
use crate::scheduler::run_runlevel;

/// Run one full scan: select scripts, build tasks for every host, drain
/// runlevels strictly in ascending order.
///
/// `spec.md` §8 scenario 1 ("Empty scan"): with zero hosts (or zero
/// matching tasks), this logs `"Loaded N scripts for scanning."` and
/// `"Script Scanning completed."` without constructing any task.
pub async fn run_scan(
    user_rules: &[String],
    hosts: &[HostSnapshot],
    api: &dyn HostApi,
) -> RuntimeResult<()> {
    // C8 (`spec.md` §4.8): malformed `--script-args` is configuration-fatal
    // (`spec.md` §7 "Failure to parse is fatal with the offending text
    // included"). Parsed here, ahead of selection, so the scan never starts
    // with an args string no script could actually read.
    parse_script_args(api.scriptargs()).owe(RuntimeReason::ScriptArgs)?;

    let scripts = select(user_rules, api).owe(RuntimeReason::Select)?;
    nse_info!(sys, scripts = scripts.len(), "Loaded {} scripts for scanning.", scripts.len());

    let mut next_id = {
        let mut counter: u64 = 0;
        move || {
            counter += 1;
            TaskId(counter)
        }
    };

    let mut all_tasks = Vec::new();
    for host in hosts {
        for script in &scripts {
            all_tasks.extend(build_tasks_for_host(&mut next_id, script, host));
        }
    }

    let buckets = partition_by_runlevel(all_tasks);
    for (runlevel, tasks) in buckets {
        let meter = api.scan_progress_meter(&format!("NSE: Runlevel {runlevel}"));
        nse_debug!(sched, runlevel = %runlevel, tasks = tasks.len(), "entering runlevel");
        run_runlevel(tasks, api, meter.as_ref()).await;
    }

    nse_info!(sys, "Script Scanning completed.");
    Ok(())
}
