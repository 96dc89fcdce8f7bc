use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::job_type::{JobType, WorkflowType};
use crate::provenance::Provenance;
use crate::status::{InspectResult, RunStatus};
use crate::step::StepTemplate;

/// The per-run materialization of a step: the populated template plus
/// whatever the cluster translator learned about its created job/service.
#[derive(Debug, Clone)]
pub struct StepRuntime {
    pub template: StepTemplate,
    pub job_name: String,
    pub controller_uid: Option<String>,
    pub service_created: bool,
    pub container_count: usize,
    pub last_result: Option<InspectResult>,
    /// Set once this step has terminated and its job has been deleted.
    /// Non-server siblings created by `PARALLEL` resolve independently of
    /// the run's primary `job_type` chain; the run cannot reach
    /// `RunStatus::Complete` until every recorded step is resolved
    /// (`spec.md` §3 invariant 3, scenario B).
    pub resolved: bool,
}

impl StepRuntime {
    pub fn new(template: StepTemplate, job_name: String) -> Self {
        let container_count = template.command_matrix.len().max(1);
        Self {
            template,
            job_name,
            controller_uid: None,
            service_created: false,
            container_count,
            last_result: None,
            resolved: false,
        }
    }

    pub fn is_server_process(&self) -> bool {
        self.template.is_server_process()
    }
}

/// One instance of a workflow execution (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct Run {
    pub id: String,
    pub workflow_type: WorkflowType,
    pub job_type: JobType,
    pub status: RunStatus,
    pub status_prov: Provenance,
    pub run_start: DateTime<Utc>,
    pub debug: bool,
    pub fake_jobs: bool,
    pub has_warning: bool,
    /// Arbitrary workflow-specific request fields (`downloadurl`,
    /// `adcirc.gridname`, `instancename`, `stormnumber`,
    /// `physical_location`, ...), looked up by the cluster translator when
    /// assembling per-job-type command-line additions.
    pub request_params: HashMap<String, Value>,
    /// Step records created so far this run, in creation order.
    pub steps: HashMap<JobType, StepRuntime>,
    pub step_order: Vec<JobType>,
}

impl Run {
    pub fn new(
        id: String,
        workflow_type: WorkflowType,
        first_job_type: JobType,
        debug: bool,
        fake_jobs: bool,
        request_params: HashMap<String, Value>,
        run_start: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            workflow_type,
            job_type: first_job_type,
            status: RunStatus::New,
            status_prov: Provenance::new("New run accepted"),
            run_start,
            debug,
            fake_jobs,
            has_warning: false,
            request_params,
            steps: HashMap::new(),
            step_order: Vec::new(),
        }
    }

    pub fn record_step(&mut self, job_type: JobType, runtime: StepRuntime) {
        if !self.steps.contains_key(&job_type) {
            self.step_order.push(job_type.clone());
        }
        self.steps.insert(job_type, runtime);
    }

    pub fn step(&self, job_type: &JobType) -> Option<&StepRuntime> {
        self.steps.get(job_type)
    }

    pub fn step_mut(&mut self, job_type: &JobType) -> Option<&mut StepRuntime> {
        self.steps.get_mut(job_type)
    }

    /// All server-process steps recorded on this run, in creation order —
    /// used by the cleanup sweep and by `find_failed` (`spec.md` §3
    /// invariant 3, §4.E).
    pub fn server_steps(&self) -> impl Iterator<Item = (&JobType, &StepRuntime)> {
        self.step_order
            .iter()
            .filter_map(move |jt| self.steps.get(jt).map(|r| (jt, r)).filter(|(_, r)| r.is_server_process()))
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.request_params.get(key).and_then(Value::as_str)
    }

    /// True once every step recorded on this run (primary chain and
    /// `PARALLEL` siblings alike) has been deleted, the precondition for
    /// the `RUNNING` → `COMPLETE` transition when `job_type` reaches the
    /// `complete` sentinel (`spec.md` §3 invariant 3).
    pub fn all_steps_resolved(&self) -> bool {
        self.steps.values().all(|s| s.resolved)
    }
}
