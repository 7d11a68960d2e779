//! What each scheduler pass did, plus counters for the run summary.

/// Operating mode of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Tracking,
}

/// Outcome of a single scheduler pass. At most one task runs per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Not tracking; nothing dispatched.
    Idle,
    /// Tracking but no deadline has elapsed.
    Waiting,
    Retarget,
    Fire,
    Control,
    /// Entered tracking on a start edge.
    Started,
    /// Returned to idle on a stop edge.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub starts: u32,
    pub stops: u32,
    pub retargets: u32,
    pub capture_timeouts: u32,
    pub shots: u32,
    /// Fire requests that found the launcher disarmed.
    pub misfires: u32,
    pub disarms: u32,
    pub control_ticks: u64,
    /// Control ticks that started more than one period late outside of a
    /// blocking task.
    pub deadline_overruns: u64,
    /// Longest single dispatched pass, in microseconds.
    pub max_pass_us: u64,
}
