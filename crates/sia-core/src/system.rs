use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

static HOSTNAME: OnceLock<String> = OnceLock::new();
static STARTED: OnceLock<Instant> = OnceLock::new();

/// Pin the instant uptime is measured from. Only the first call (or uptime query) counts.
pub fn init_uptime() -> Instant {
    *STARTED.get_or_init(Instant::now)
}

pub fn uptime() -> Duration {
    init_uptime().elapsed()
}

pub fn uptime_seconds() -> u64 {
    uptime().as_secs()
}

/// Host name of this node, resolved once.
///
/// Falls back to `localhost` when the OS refuses to tell or the name is not UTF-8.
pub fn hostname() -> &'static str {
    HOSTNAME.get_or_init(|| {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}

/// Check whether a process with `pid` exists.
///
/// Probes with signal 0; only `ESRCH` counts as "gone" (a process owned by another user is alive).
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    true
}
