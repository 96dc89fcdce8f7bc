use crate::job_type::JobType;
use serde::{Deserialize, Serialize};

/// An inclusive port range a server-process step exposes, e.g. `[5432, 5432]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub lo: u16,
    pub hi: u16,
}

impl PortRange {
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.lo..=self.hi
    }
}

/// One entry of the parallel `FILESVR_VOLUME_NAME` / `FILESVR_MOUNT_PATH` /
/// `FILESVR_VOLUME_SIZE` comma-lists, collapsed into a single typed field at
/// catalog-load time (`SPEC_FULL.md` §5.D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileServerVolume {
    pub name: String,
    pub mount_path: String,
    /// `0` means bind an existing PVC named `name`; non-zero provisions an
    /// ephemeral claim of this size (e.g. `"10Gi"` parsed from the DB column,
    /// stored here as the raw quantity string).
    pub size: VolumeSize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSize {
    ExistingClaim,
    Ephemeral(String),
}

impl VolumeSize {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "0" {
            Self::ExistingClaim
        } else {
            Self::Ephemeral(raw.trim().to_string())
        }
    }
}

/// An immutable, per-workflow step definition as loaded from the database.
/// Building a job for a run clones this template and mutates the clone —
/// the catalog's copy is never touched (`SPEC_FULL.md` §3).
#[derive(Debug, Clone, PartialEq)]
pub struct StepTemplate {
    pub job_type: JobType,
    pub job_name: String,
    pub image: String,
    pub command_line: Vec<String>,
    pub command_matrix: Vec<Vec<String>>,
    pub next_job_type: JobType,
    pub parallel: Vec<JobType>,

    pub cpus: Option<String>,
    pub memory: String,
    pub ephemeral: Option<String>,
    pub restart_policy: String,
    pub node_type: Option<(String, String)>,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,

    pub data_volume_name: String,
    pub data_mount_path: String,
    pub sub_path: String,
    pub additional_path: String,
    pub filesvr_volumes: Vec<FileServerVolume>,

    pub port_range: Vec<PortRange>,
}

impl StepTemplate {
    /// A server process requires a cluster `Service` and is never polled to
    /// completion — it's considered done once the `Service` exists
    /// (`spec.md` §9 resolution).
    pub fn is_server_process(&self) -> bool {
        !self.port_range.is_empty()
    }

    pub fn default_cpus(&self) -> &str {
        self.cpus.as_deref().unwrap_or("250m")
    }

    pub fn default_ephemeral_limit(&self) -> &str {
        self.ephemeral.as_deref().unwrap_or("128Mi")
    }
}

/// An ordered mapping of job-type to step template, representing one
/// workflow's DAG (`spec.md` §3).
#[derive(Debug, Clone, Default)]
pub struct WorkflowDefinition {
    /// Preserves DB row order; the first entry is *not* necessarily the
    /// first step to run (that comes from `get_first_job`), but iteration
    /// order is kept stable for deterministic catalog diagnostics.
    steps: Vec<(JobType, StepTemplate)>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job_type: JobType, template: StepTemplate) {
        if let Some(slot) = self.steps.iter_mut().find(|(jt, _)| *jt == job_type) {
            slot.1 = template;
        } else {
            self.steps.push((job_type, template));
        }
    }

    pub fn get(&self, job_type: &JobType) -> Option<&StepTemplate> {
        self.steps.iter().find(|(jt, _)| jt == job_type).map(|(_, t)| t)
    }

    pub fn contains(&self, job_type: &JobType) -> bool {
        self.get(job_type).is_some()
    }

    pub fn job_types(&self) -> impl Iterator<Item = &JobType> {
        self.steps.iter().map(|(jt, _)| jt)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Does this workflow have a designated cleanup step?
    pub fn has_final_staging(&self) -> bool {
        self.contains(&JobType::new("final-staging"))
    }
}
