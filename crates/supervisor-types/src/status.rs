/// The abstract job status the inspector maps raw cluster status into
/// (`spec.md` §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Timeout,
}

/// The abstract pod status accompanying a `JobStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// The result of inspecting one step's job on the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectResult {
    pub found: bool,
    pub job_status: JobStatus,
    pub pod_status: PodStatus,
}

impl InspectResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            job_status: JobStatus::Pending,
            pod_status: PodStatus::Pending,
        }
    }

    /// The short-circuit result used in `fake_jobs` mode (`spec.md` §4.E).
    pub fn fake_complete() -> Self {
        Self {
            found: true,
            job_status: JobStatus::Complete,
            pod_status: PodStatus::Succeeded,
        }
    }
}

/// The run's overall lifecycle state (`spec.md` §4.F). `Warning` is carried
/// as a flag on `Run` rather than a fifth state — see `SPEC_FULL.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    New,
    Running,
    Complete,
    Error,
}
