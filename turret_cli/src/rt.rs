//! Real-time scheduling for the tick loop (Linux SCHED_FIFO / affinity / mlockall; macOS mlockall).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
/// Capacity of cpu_set_t in CPU indices (bits).
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

/// Apply `lock` to the process; `All` falls back to `Current` on EPERM/ENOMEM.
#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    fn mlock(flags: libc::c_int) -> std::io::Result<()> {
        if unsafe { mlockall(flags) } != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn retryable(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn memlock_limit() -> Option<String> {
        let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        if unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) } != 0 {
            return None;
        }
        let cur = unsafe { rlim.assume_init() }.rlim_cur;
        Some(if cur == libc::RLIM_INFINITY {
            "memlock limit: unlimited".to_string()
        } else {
            format!("memlock limit: {} KiB", cur / 1024)
        })
    }

    let err = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => match mlock(MCL_CURRENT) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        },
        RtLock::All => match mlock(MCL_CURRENT | MCL_FUTURE) {
            Ok(()) => return Ok(()),
            Err(e) if retryable(&e) => match mlock(MCL_CURRENT) {
                Ok(()) => {
                    tracing::warn!(error = %e, "mlockall(current|future) refused; locked current pages only");
                    return Ok(());
                }
                Err(e2) => e2,
            },
            Err(e) => e,
        },
    };
    let mut msg = format!("mlockall failed: {err}");
    if retryable(&err) {
        if let Some(limit) = memlock_limit() {
            msg.push_str(&format!("; {limit}"));
        }
        msg.push_str("; needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

/// SCHED_FIFO at `prio` (default: the maximum), clamped to the system range.
#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<()> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
        let has_cap = status.lines().any(|line| {
            if line.starts_with("CapEff:") {
                if let Some(hex) = line.split_whitespace().nth(1)
                    && let Ok(caps) = u64::from_str_radix(hex, 16)
                {
                    return caps & 0x80_0000 != 0;
                }
            }
            false
        });
        let euid = unsafe { libc::geteuid() };
        if !has_cap && euid != 0 {
            eyre::bail!(
                "SCHED_FIFO needs CAP_SYS_NICE or root (euid {euid}); try 'sudo setcap cap_sys_nice=ep $(which turret)'"
            );
        }
    }

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let param = sched_param {
        sched_priority: prio.unwrap_or(max).clamp(min, max),
    };
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Pin the process to `cpu` (default 0) if the current mask allows it.
#[cfg(target_os = "linux")]
fn apply_affinity(cpu: Option<usize>) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if online < 1 {
        eyre::bail!("_SC_NPROCESSORS_ONLN < 1");
    }
    let target = cpu.unwrap_or(0);
    if target as libc::c_long >= online {
        eyre::bail!("requested CPU {target} >= online {online}");
    }
    if target >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {target} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }

    let mut allowed: cpu_set_t = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    if !unsafe { CPU_ISSET(target, &allowed) } {
        eyre::bail!("CPU {target} not permitted by current affinity mask");
    }

    let mut desired: cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(target, &mut desired);
    }
    if unsafe { libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired) } != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(lock = ?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: memory lock not applied"),
        }
        match apply_fifo_priority(prio) {
            Ok(()) => tracing::info!(prio = ?prio, "rt: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(error = %err, prio = ?prio, "rt: SCHED_FIFO not applied"),
        }
        match apply_affinity(rt_cpu) {
            Ok(()) => tracing::info!(cpu = rt_cpu.unwrap_or(0), "rt: pinned"),
            Err(err) => tracing::warn!(error = %err, "rt: affinity not applied"),
        }
    });
}

#[cfg(target_os = "macos")]
pub fn setup_rt_once(rt: bool, lock: RtLock) {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        let flags = match lock {
            RtLock::None => None,
            RtLock::Current => Some(MCL_CURRENT),
            RtLock::All => Some(MCL_CURRENT | MCL_FUTURE),
        };
        if let Some(flags) = flags {
            if unsafe { mlockall(flags) } != 0 {
                let err = std::io::Error::last_os_error();
                tracing::warn!(error = %err, lock = ?lock, "rt: mlockall failed");
            } else {
                tracing::info!(lock = ?lock, "rt: memory lock applied");
            }
        }
        tracing::warn!("rt: macOS has no SCHED_FIFO or affinity; only mlockall applied");
    });
}
