//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall).
//!
//! Every step is best effort: a failure is logged and the run continues on
//! the normal scheduler.

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match linux::lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(error = %e, "rt: mlockall failed"),
        }
        match linux::fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt: SCHED_FIFO applied"),
            Err(e) => tracing::warn!(error = %e, "rt: sched_setscheduler failed"),
        }
        let cpu = rt_cpu.unwrap_or(0);
        match linux::pin_to_cpu(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: affinity applied"),
            Err(e) => tracing::warn!(error = %e, cpu, "rt: affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(_prio: Option<i32>, _lock: RtLock, _rt_cpu: Option<usize>) {
    tracing::warn!("real-time mode is only supported on Linux; --rt ignored");
}

#[cfg(target_os = "linux")]
mod linux {
    use super::RtLock;
    use libc::{MCL_CURRENT, MCL_FUTURE, SCHED_FIFO};

    /// Capacity of cpu_set_t in CPU indices (bits).
    const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

    fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
        let rc = unsafe { libc::mlockall(flags) };
        if rc != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn is_retryable(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn memlock_limit_hint() -> Option<String> {
        let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        let cur = unsafe { rlim.assume_init() }.rlim_cur;
        if cur == libc::RLIM_INFINITY {
            Some("memlock limit: unlimited".to_string())
        } else {
            Some(format!("memlock limit: {} KiB", cur / 1024))
        }
    }

    /// `All` falls back to `Current` when the limit or privileges are short.
    pub(super) fn lock_memory(lock: RtLock) -> eyre::Result<()> {
        let err = match lock {
            RtLock::None => return Ok(()),
            RtLock::Current => match mlockall(MCL_CURRENT) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            },
            RtLock::All => match mlockall(MCL_CURRENT | MCL_FUTURE) {
                Ok(()) => return Ok(()),
                Err(e) if is_retryable(&e) && mlockall(MCL_CURRENT).is_ok() => {
                    tracing::warn!(error = %e, "rt: locked current pages only");
                    return Ok(());
                }
                Err(e) => e,
            },
        };
        let mut msg = format!("mlockall: {err}");
        if is_retryable(&err) {
            if let Some(h) = memlock_limit_hint() {
                msg.push_str(&format!("; {h}"));
            }
            msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
        }
        Err(eyre::eyre!(msg))
    }

    /// Apply SCHED_FIFO, clamped to the system range; returns the priority used.
    pub(super) fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
        let (min, max) = unsafe {
            let min = libc::sched_get_priority_min(SCHED_FIFO);
            let max = libc::sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let value = prio.unwrap_or(max).clamp(min, max);
        let param = libc::sched_param {
            sched_priority: value,
        };
        let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EPERM) {
                eyre::bail!("{err}; hint: run as root or grant CAP_SYS_NICE");
            }
            return Err(eyre::eyre!(err));
        }
        Ok(value)
    }

    /// Pin the process to `cpu` if the current affinity mask allows it.
    pub(super) fn pin_to_cpu(cpu: usize) -> eyre::Result<()> {
        if cpu >= MAX_CPUSET_BITS {
            eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
        }
        let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed)
        };
        if rc != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        if !unsafe { libc::CPU_ISSET(cpu, &allowed) } {
            eyre::bail!("CPU {cpu} not permitted by current affinity mask");
        }
        let mut desired: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe {
            libc::CPU_ZERO(&mut desired);
            libc::CPU_SET(cpu, &mut desired);
        }
        let rc =
            unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &desired) };
        if rc != 0 {
            Err(eyre::eyre!(std::io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }
}
