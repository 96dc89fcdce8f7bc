//! Database Adapter (`spec.md` §4.B). Wraps four stored-procedure-shaped
//! calls over a `sqlx::PgPool`, implementing `supervisor_engine::DbAdapter`.
//! Row types (`JobDefRow`, `NewRunRow`) live upstream of this crate — in
//! `supervisor-catalog` and `supervisor-engine` respectively — so they stay
//! free of `sqlx`; this crate builds them by hand from the raw columns
//! instead of deriving `FromRow`.

mod reconnect;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use supervisor_catalog::JobDefRow;
use supervisor_engine::{DbAdapter, EngineError, NewRunRow};

pub use reconnect::connect_with_retry;

fn job_def_row(row: &sqlx::postgres::PgRow) -> Result<JobDefRow, sqlx::Error> {
    Ok(JobDefRow {
        workflow_type: row.try_get("workflow_type")?,
        job_type: row.try_get("job_type")?,
        job_name: row.try_get("job_name")?,
        image: row.try_get("image")?,
        command_line: row.try_get("command_line")?,
        command_matrix: row.try_get("command_matrix")?,
        next_job_type: row.try_get("next_job_type")?,
        parallel: row.try_get("parallel")?,
        cpus: row.try_get("cpus")?,
        memory: row.try_get("memory")?,
        ephemeral: row.try_get("ephemeral")?,
        restart_policy: row.try_get("restart_policy")?,
        node_type_key: row.try_get("node_type_key")?,
        node_type_value: row.try_get("node_type_value")?,
        backoff_limit: row.try_get("backoff_limit")?,
        ttl_seconds_after_finished: row.try_get("ttl_seconds_after_finished")?,
        data_volume_name: row.try_get("data_volume_name")?,
        data_mount_path: row.try_get("data_mount_path")?,
        sub_path: row.try_get("sub_path")?,
        additional_path: row.try_get("additional_path")?,
        filesvr_volume_name: row.try_get("filesvr_volume_name")?,
        filesvr_mount_path: row.try_get("filesvr_mount_path")?,
        filesvr_volume_size: row.try_get("filesvr_volume_size")?,
        port_range: row.try_get("port_range")?,
    })
}

fn to_engine_err(err: sqlx::Error) -> EngineError {
    EngineError::Db(err.to_string())
}

/// Postgres-backed `DbAdapter`, calling the supervisor's stored procedures
/// by name.
pub struct PgDbAdapter {
    pool: PgPool,
}

impl PgDbAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DbAdapter for PgDbAdapter {
    async fn get_job_defs(&self) -> Result<Vec<JobDefRow>, EngineError> {
        let rows = sqlx::query("SELECT * FROM get_job_defs()").fetch_all(&self.pool).await.map_err(to_engine_err)?;

        rows.iter().map(job_def_row).collect::<Result<Vec<_>, _>>().map_err(to_engine_err)
    }

    async fn get_new_runs(&self) -> Result<Vec<NewRunRow>, EngineError> {
        let rows = sqlx::query("SELECT * FROM get_new_runs()").fetch_all(&self.pool).await.map_err(to_engine_err)?;

        let runs = rows
            .iter()
            .map(|row| {
                Ok(NewRunRow {
                    run_id: row.try_get("run_id")?,
                    run_data: row.try_get("run_data")?,
                })
            })
            .collect::<Result<Vec<NewRunRow>, sqlx::Error>>()
            .map_err(to_engine_err)?;

        // A single row with a numeric run_id of "-1" is the stored
        // procedure's "no work" sentinel; callers never see it.
        if runs.len() == 1 && runs[0].run_id == "-1" {
            return Ok(Vec::new());
        }
        Ok(runs)
    }

    async fn get_first_job(&self, workflow_type: &str) -> Result<Option<String>, EngineError> {
        let row: Option<(Option<String>,)> = sqlx::query_as("SELECT get_first_job($1)")
            .bind(workflow_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_engine_err)?;

        Ok(row.and_then(|(job_type,)| job_type))
    }

    async fn update_job_status(&self, run_id: &str, status_prov: &str) -> Result<(), EngineError> {
        // The external run_id is "<numeric>-<discriminator>"; the stored
        // procedure wants the two halves separately (`spec.md` §6).
        let (numeric_id, discriminator) = run_id.split_once('-').unwrap_or((run_id, ""));

        sqlx::query("SELECT set_config_item($1, $2, 'supervisor_job_status', $3)")
            .bind(numeric_id)
            .bind(discriminator)
            .bind(status_prov)
            .execute(&self.pool)
            .await
            .map_err(to_engine_err)?;
        Ok(())
    }
}
