//! Workflow job supervisor entry point (`spec.md` §4.G, §6). Wires the
//! Config & Secrets Adapter, Database Adapter, Catalog, Cluster Translator,
//! and Job Inspector together and drives `Supervisor::tick` forever.

use std::ffi::OsStr;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::Instrument;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use supervisor_catalog::Catalog;
use supervisor_cluster::{ClusterTranslatorImpl, JobInspectorImpl};
use supervisor_config::Config;
use supervisor_db::PgDbAdapter;
use supervisor_engine::{DbAdapter, Supervisor, SupervisorConfig};

const CONFIG_PATH_ENV: &str = "SUPERVISOR_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "/etc/supervisor/config.json";

/// Builds the subscriber from `LOG_LEVEL`/`LOG_PATH`/TTY detection. When
/// `LOG_PATH` is set, logs are appended to that file via a non-blocking
/// writer instead of stdout; the returned guard must stay alive for the
/// process lifetime or buffered lines are dropped on exit.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = !std::io::stdout().is_terminal();

    match std::env::var("LOG_PATH") {
        Ok(log_path) => {
            let path = Path::new(&log_path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| OsStr::new("supervisor.log"));
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer);
            if use_json { subscriber.json().init() } else { subscriber.compact().init() }
            Some(guard)
        }
        Err(_) => {
            let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
            if use_json { subscriber.json().init() } else { subscriber.compact().init() }
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = init_tracing();

    let app_version = std::env::var("APP_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    let system = std::env::var("SYSTEM").unwrap_or_else(|_| "apsviz".to_string());
    let span = tracing::info_span!("supervisor", app_version = %app_version, system = %system);

    run().instrument(span).await
}

/// The fatal-startup-error path (`spec.md` §6 Exit codes): any `Err` here
/// propagates out of `main` and the process exits non-zero with the
/// descriptive context `anyhow::Context` attached.
async fn run() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load(&config_path).with_context(|| format!("loading config from {config_path}"))?;

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = supervisor_db::connect_with_retry(&database_url, cfg.poll_long_sleep()).await;
    let db = PgDbAdapter::new(pool);

    let client = kube::Client::try_default().await.context("building the in-cluster or local kube client")?;
    let cluster = ClusterTranslatorImpl::new(client.clone(), cfg.clone());
    let inspector = JobInspectorImpl::new(client, cfg.clone());

    let supervisor_cfg = SupervisorConfig {
        poll_short_sleep: cfg.poll_short_sleep(),
        poll_long_sleep: cfg.poll_long_sleep(),
        max_no_activity_count: cfg.max_no_activity_count,
        inactivity_alert_after: cfg.sv_inactivity(),
    };
    let mut supervisor = Supervisor::new(supervisor_cfg);

    tracing::info!(namespace = %cfg.namespace, "supervisor starting");

    loop {
        let paused = cfg.pause_sentinel_present();

        let job_def_rows = match db.get_job_defs().await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!(error = %err, "failed to refresh catalog, skipping this tick");
                tokio::time::sleep(cfg.poll_short_sleep()).await;
                continue;
            }
        };
        let catalog = Catalog::refresh(job_def_rows);

        let sleep_for = match supervisor.tick(paused, &catalog, &db, &cluster, &inspector).await {
            Ok(duration) => duration,
            Err(err) => {
                tracing::error!(error = %err, "tick failed, backing off");
                Duration::from_secs(5)
            }
        };

        tracing::debug!(active_runs = supervisor.active_run_count(), paused = supervisor.is_paused(), "tick complete");
        tokio::time::sleep(sleep_for).await;
    }
}
