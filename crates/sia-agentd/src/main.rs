mod tasks;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use sia_client::{HttpClient, MemoryCache, TokenFetcher};
use sia_config::{CommonOptions, ConfigError, get_options};
use sia_core::{LockSweep, LoopingCall, hostname, init_uptime, uptime_seconds};
use sia_db::ServiceRepo;
use sia_observe::{LoggerConfig, LoggerFormat, init_logger};

const BINARY: &str = "sia-agentd";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_uptime();

    // 1) Options
    let options = match get_options(&[], std::env::args_os()) {
        Ok(options) => options.install()?,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e).context("loading options"),
    };
    let opts: CommonOptions = options.typed()?;

    // 2) Logger
    let format: LoggerFormat = opts.log_format.parse()?;
    init_logger(&LoggerConfig::from_flags(opts.debug, opts.verbose).with_format(format))?;
    info!(config = %opts.config, host = hostname(), "options loaded");

    let mut runners: Vec<LoopingCall<()>> = Vec::new();

    // 3) Stale locks
    let sweeper = LockSweep::new(&opts.lock_path);
    tasks::sweep_once(&sweeper);
    if opts.lock_sweep_interval > 0 {
        runners.push(tasks::lock_sweep(sweeper, Duration::from_secs(opts.lock_sweep_interval))?);
    }

    // 4) Keystone token
    match tasks::token_interval(&opts) {
        Some(interval) => {
            let cache = Arc::new(MemoryCache::with_ttl(interval));
            let fetcher = TokenFetcher::new(HttpClient::new()?, cache, tasks::keystone_auth(&opts));
            runners.push(tasks::token_refresh(Arc::new(fetcher), interval)?);
        }
        None => info!("keystone_admin_endpoint or token_refresh_interval not set, token refresh disabled"),
    }

    // 5) Service state reports
    if opts.report_interval > 0 {
        let pool = sia_db::connect(&opts.sql_connection)
            .await
            .context("connecting to service database")?;
        sia_db::migrate(&pool).await.context("migrating service database")?;

        let service = ServiceRepo::find_or_create(&pool, hostname(), BINARY).await?;
        info!(id = service.id, report_count = service.report_count, "service registered");
        runners.push(tasks::report_state(pool, service.id, Duration::from_secs(opts.report_interval))?);
    }

    // 6) Keep running
    info!(runners = runners.len(), "agent is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down...");

    tasks::shutdown(&runners, SHUTDOWN_GRACE).await;
    info!(uptime_secs = uptime_seconds(), "agent stopped");
    Ok(())
}
