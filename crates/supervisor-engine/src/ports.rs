//! The interfaces the run state machine and supervisor loop consult. Defined
//! here (the consumer) rather than in `supervisor-db`/`supervisor-cluster`
//! (the adapters) so this crate never depends on `sqlx` or `kube` —
//! `supervisor-engine`'s own test suite exercises `handle_run` against
//! in-memory fakes of these traits (`SPEC_FULL.md` §4.4).

use async_trait::async_trait;
use serde_json::Value;
use supervisor_catalog::JobDefRow;
use supervisor_types::{InspectResult, JobType, Run, StepRuntime, StepTemplate};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Db(String),
    #[error("cluster error: {0}")]
    Cluster(String),
    #[error("job-type '{job_type}' is not defined in workflow '{workflow_type}'")]
    UnknownJobType { workflow_type: String, job_type: String },
}

/// Whether a `handle_run` call did something observable this tick, feeding
/// the supervisor loop's no-activity counter (`spec.md` §4.G step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Idle,
}

/// One queued run request, as `get_new_runs` returns it (`spec.md` §4.B).
#[derive(Debug, Clone)]
pub struct NewRunRow {
    pub run_id: String,
    pub run_data: Value,
}

/// The four stored-procedure-shaped operations of `spec.md` §4.B.
#[async_trait]
pub trait DbAdapter: Send + Sync {
    async fn get_job_defs(&self) -> Result<Vec<JobDefRow>, EngineError>;
    async fn get_new_runs(&self) -> Result<Vec<NewRunRow>, EngineError>;
    async fn get_first_job(&self, workflow_type: &str) -> Result<Option<String>, EngineError>;
    async fn update_job_status(&self, run_id: &str, status_prov: &str) -> Result<(), EngineError>;
}

/// The nine responsibilities of `spec.md` §4.D, minus the parts that are
/// pure data transforms (those live in `supervisor-cluster::resources` and
/// are exercised directly by that crate's own tests).
#[async_trait]
pub trait ClusterTranslator: Send + Sync {
    /// Builds the manifest from `template`, submits it, and recovers its
    /// controller UID (`spec.md` §4.D points 1-7).
    async fn create(&self, run: &Run, job_type: &JobType, template: &StepTemplate) -> Result<StepRuntime, EngineError>;

    /// Deletes a step's job. `forced` also deletes its Service, if any
    /// (`spec.md` §4.D point 8). Implementations must themselves skip
    /// debug/error runs, per the same point.
    async fn delete(&self, run: &Run, job_type: &JobType, step: &StepRuntime, forced: bool) -> Result<(), EngineError>;

    /// Force-removes every lingering server-process job/service on the run
    /// (`spec.md` §4.D point 9).
    async fn cleanup_sweep(&self, run: &Run) -> Result<(), EngineError>;
}

/// `spec.md` §4.E.
#[async_trait]
pub trait JobInspector: Send + Sync {
    async fn inspect(&self, run: &Run, job_type: &JobType, step: &StepRuntime) -> Result<InspectResult, EngineError>;
}
