//! Millisecond tick arithmetic.
//!
//! Deadlines live on a free-running `u32` millisecond counter that wraps
//! after ~49.7 days. Comparisons go through `ticks_diff`, which stays
//! correct across the wrap as long as the two instants are less than
//! `i32::MAX` ms apart.

/// `t + ms` on the wrapping tick counter.
#[inline]
pub fn ticks_add(t: u32, ms: u32) -> u32 {
    t.wrapping_add(ms)
}

/// Signed distance `a - b` on the wrapping tick counter.
#[inline]
pub fn ticks_diff(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}

/// True once `now` has reached or passed `deadline`.
#[inline]
pub fn is_due(now: u32, deadline: u32) -> bool {
    ticks_diff(now, deadline) >= 0
}

/// Milliseconds remaining until `deadline`, zero when already due.
#[inline]
pub fn ms_until(now: u32, deadline: u32) -> u32 {
    ticks_diff(deadline, now).max(0) as u32
}
