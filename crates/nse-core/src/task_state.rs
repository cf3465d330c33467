/// Suspension state of a [`Task`](crate) (`spec.md` §3 "Task"):
/// `{ ready, running, waiting, pending, done }`.
///
/// The Scheduler (`nse-runtime`) is the only thing that transitions a
/// task between these states; this crate only defines the vocabulary so
/// it can be shared between the runtime and its tests without a cyclic
/// dependency on `nse-lang`'s `Script`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Constructed, never resumed.
    Ready,
    /// Scheduled for an immediate resume this tick.
    Running,
    /// Suspended, parked awaiting an external wake-up.
    Waiting,
    /// Woken by an external callback, awaiting promotion into `running`.
    Pending,
    /// Finished (normally or with an error); no further resumption.
    Done,
}

impl TaskState {
    pub fn is_live(&self) -> bool {
        !matches!(self, TaskState::Done)
    }
}
