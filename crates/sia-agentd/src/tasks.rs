use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info, warn};

use sia_client::{KeystoneAuth, TokenFetcher};
use sia_config::CommonOptions;
use sia_core::{LockSweep, LoopError, LoopingCall, Step, WorkResult};
use tokio::task::JoinSet;
use sia_db::{DbError, DbPool, ServiceId, ServiceRepo};

/// Keystone credentials from the common options; an empty tenant means none.
pub fn keystone_auth(opts: &CommonOptions) -> KeystoneAuth {
    KeystoneAuth {
        endpoint: opts.keystone_admin_endpoint.clone(),
        username: opts.username.clone(),
        password: opts.password.clone(),
        tenant: Some(opts.tenant.clone()).filter(|t| !t.is_empty()),
    }
}

/// Token polling period, `None` when there is no endpoint or the interval is 0.
pub fn token_interval(opts: &CommonOptions) -> Option<Duration> {
    if opts.keystone_admin_endpoint.is_empty() || opts.token_refresh_interval == 0 {
        return None;
    }
    Some(Duration::from_secs(opts.token_refresh_interval))
}

/// Periodically remove stale lock files. Sweep errors are logged and retried next round.
pub fn lock_sweep(sweeper: LockSweep, interval: Duration) -> Result<LoopingCall<()>, LoopError> {
    let mut call = LoopingCall::from_fn("lock-sweep", move || {
        sweep_once(&sweeper);
        Ok(Step::Continue)
    });
    call.start(interval, false)?;
    Ok(call)
}

pub fn sweep_once(sweeper: &LockSweep) {
    match sweeper.sweep() {
        Ok(report) if !report.is_empty() => info!(
            path = %sweeper.lock_path().display(),
            sentinels = report.sentinels.len(),
            lockfiles = report.lockfiles.len(),
            "removed stale locks"
        ),
        Ok(_) => debug!(path = %sweeper.lock_path().display(), "no stale locks"),
        Err(e) => warn!(error = %e, "lock sweep failed"),
    }
}

/// Keep a keystone token cached; failures are logged and retried next round.
pub fn token_refresh(fetcher: Arc<TokenFetcher>, interval: Duration) -> Result<LoopingCall<()>, LoopError> {
    let mut call = LoopingCall::new("token-refresh", move || fetch_token(Arc::clone(&fetcher)));
    call.start(interval, true)?;
    Ok(call)
}

async fn fetch_token(fetcher: Arc<TokenFetcher>) -> WorkResult<()> {
    // get_token logs its own failures.
    if fetcher.get_token().await.is_ok() {
        debug!(endpoint = %fetcher.auth().endpoint, "keystone token available");
    }
    Ok(Step::Continue)
}

/// Bump the service's report count every `interval` until it gets disabled or removed.
pub fn report_state(pool: DbPool, id: ServiceId, interval: Duration) -> Result<LoopingCall<()>, LoopError> {
    let mut call = LoopingCall::new("report-state", move || report_once(pool.clone(), id));
    call.start(interval, false)?;
    Ok(call)
}

async fn report_once(pool: DbPool, id: ServiceId) -> WorkResult<()> {
    match ServiceRepo::increment_report_count(&pool, id).await {
        Ok(service) if service.disabled => {
            info!(id, "service disabled, stopping state reports");
            Ok(Step::Done(()))
        }
        Ok(service) => {
            debug!(id, report_count = service.report_count, "reported service state");
            Ok(Step::Continue)
        }
        Err(DbError::NotFound(_)) => {
            warn!(id, "service record removed, stopping state reports");
            Ok(Step::Done(()))
        }
        Err(e) => {
            warn!(id, error = %e, "failed to report service state, will retry");
            Ok(Step::Continue)
        }
    }
}

/// Stop every runner and wait for all of them under one `grace` deadline.
///
/// Returns how many were still sleeping when the deadline passed.
pub async fn shutdown(runners: &[LoopingCall<()>], grace: Duration) -> usize {
    let mut waits = JoinSet::new();
    for call in runners {
        call.stop();
        if let Some(handle) = call.handle().cloned() {
            let name = call.name().to_string();
            waits.spawn(async move { (name, handle.wait().await) });
        }
    }

    let drained = tokio::time::timeout(grace, async {
        while let Some(joined) = waits.join_next().await {
            match joined {
                Ok((task, Ok(exit))) => info!(task, stopped = exit.is_stopped(), "runner finished"),
                Ok((task, Err(e))) => error!(task, error = %e, "runner failed"),
                Err(e) => error!(error = %e, "runner wait aborted"),
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(pending = waits.len(), "runners still sleeping, abandoning them");
    }
    waits.len()
}
