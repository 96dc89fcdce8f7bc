//! The supervisor loop (`spec.md` §4.G). Owns the active-run list and the
//! no-activity watchdog; catalog refresh and the pause-sentinel check are
//! steps 1-2 and are driven by the caller each tick so this crate stays free
//! of filesystem and database-pool specifics beyond the trait ports.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use supervisor_catalog::Catalog;
use supervisor_types::{Run, RunStatus};

use crate::intake;
use crate::ports::{Activity, ClusterTranslator, DbAdapter, EngineError, JobInspector};
use crate::state_machine;

/// Tunables for step 5/6 of `spec.md` §4.G (poll cadence, inactivity alert).
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub poll_short_sleep: Duration,
    pub poll_long_sleep: Duration,
    pub max_no_activity_count: u32,
    pub inactivity_alert_after: ChronoDuration,
}

pub struct Supervisor {
    active: Vec<Run>,
    paused: bool,
    no_activity_count: u32,
    last_activity_at: DateTime<Utc>,
    cfg: SupervisorConfig,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            active: Vec::new(),
            paused: false,
            no_activity_count: 0,
            last_activity_at: Utc::now(),
            cfg,
        }
    }

    pub fn active_run_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Runs steps 3-5 of `spec.md` §4.G for one tick and returns the sleep
    /// duration for step 6. `paused` is the caller's own read of the pause
    /// sentinel for this tick (step 2).
    pub async fn tick(
        &mut self,
        paused: bool,
        catalog: &Catalog,
        db: &dyn DbAdapter,
        cluster: &dyn ClusterTranslator,
        inspector: &dyn JobInspector,
    ) -> Result<Duration, EngineError> {
        if paused != self.paused {
            tracing::info!(paused, "pause state changed");
            self.paused = paused;
        }

        if !self.paused {
            let rows = db.get_new_runs().await?;
            intake::admit(&mut self.active, rows, db).await?;
        }

        let mut any_activity = false;
        let runs = std::mem::take(&mut self.active);
        for mut run in runs {
            if self.drive(&mut run, catalog, db, cluster, inspector, &mut any_activity).await {
                self.active.push(run);
            }
        }

        if any_activity {
            self.no_activity_count = 0;
            self.last_activity_at = Utc::now();
        } else {
            self.no_activity_count = self.no_activity_count.saturating_add(1);
            if Utc::now() - self.last_activity_at >= self.cfg.inactivity_alert_after {
                tracing::warn!(since = %self.last_activity_at, "no run activity for the configured inactivity window");
                self.last_activity_at = Utc::now();
            }
        }

        Ok(if self.no_activity_count >= self.cfg.max_no_activity_count {
            self.cfg.poll_long_sleep
        } else {
            self.cfg.poll_short_sleep
        })
    }

    /// Drives one run one step forward. Returns whether it stays on the
    /// active list.
    async fn drive(
        &self,
        run: &mut Run,
        catalog: &Catalog,
        db: &dyn DbAdapter,
        cluster: &dyn ClusterTranslator,
        inspector: &dyn JobInspector,
        any_activity: &mut bool,
    ) -> bool {
        match run.status {
            RunStatus::Complete => {
                if let Err(err) = state_machine::handle_complete(run, db, cluster).await {
                    tracing::error!(run_id = %run.id, error = %err, "cleanup on complete failed");
                }
                *any_activity = true;
                false
            }
            RunStatus::Error => {
                let keep = match state_machine::handle_error(run, catalog, db).await {
                    Ok(keep) => keep,
                    Err(err) => {
                        tracing::error!(run_id = %run.id, error = %err, "error handling failed");
                        true
                    }
                };
                *any_activity = true;
                keep
            }
            _ => match state_machine::handle_run(run, catalog, db, cluster, inspector).await {
                Ok(Activity::Active) => {
                    *any_activity = true;
                    true
                }
                Ok(Activity::Idle) => true,
                Err(err) => {
                    tracing::error!(run_id = %run.id, error = %err, "run handler error detected");
                    run.status_prov.append("Run handler error detected");
                    let _ = db.update_job_status(&run.id, run.status_prov.as_str()).await;
                    let job_type = run.job_type.clone();
                    if let Some(step) = run.step(&job_type).cloned() {
                        let _ = cluster.delete(run, &job_type, &step, false).await;
                    }
                    run.status = RunStatus::Error;
                    *any_activity = true;
                    true
                }
            },
        }
    }
}
