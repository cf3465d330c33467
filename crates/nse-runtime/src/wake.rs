//! The wake hook (`spec.md` §4.5 "Wake-up contract", §9 "Cooperative
//! tasks"): the external asynchronous I/O layer's entry point for
//! marking a suspended task for resumption. Modeled as a channel send
//! into the Scheduler's `pending` queue, per the Design Note's
//! typed-systems equivalence for the source's `wake(task_id, args...)`.

use nse_core::Value;
use tokio::sync::mpsc;

use crate::task::TaskId;

/// One wake-up delivered by the I/O layer: the task to resume and the
/// arguments its next resumption should observe (`spec.md` §3
/// `resume_args`).
#[derive(Debug, Clone)]
pub struct WakeEvent {
    pub task_id: TaskId,
    pub args: Vec<Value>,
}

pub type WakeSender = mpsc::UnboundedSender<WakeEvent>;
pub type WakeReceiver = mpsc::UnboundedReceiver<WakeEvent>;

pub fn wake_channel() -> (WakeSender, WakeReceiver) {
    mpsc::unbounded_channel()
}
