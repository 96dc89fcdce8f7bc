//! `JobInspector` implementation (`spec.md` §4.E). Maps raw `batch/v1.Job`
//! status and the job's pod phase onto the abstract `JobStatus`/`PodStatus`
//! pair the state machine reasons about.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job as K8sJob;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use supervisor_config::Config;
use supervisor_engine::{EngineError, JobInspector};
use supervisor_types::{InspectResult, JobStatus, JobType, PodStatus, Run, StepRuntime};

fn to_cluster_err(err: kube::Error) -> EngineError {
    EngineError::Cluster(err.to_string())
}

pub struct JobInspectorImpl {
    client: Client,
    cfg: Config,
}

impl JobInspectorImpl {
    pub fn new(client: Client, cfg: Config) -> Self {
        Self { client, cfg }
    }

    fn jobs(&self) -> Api<K8sJob> {
        Api::namespaced(self.client.clone(), &self.cfg.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.cfg.namespace)
    }
}

fn job_status(job: &K8sJob) -> JobStatus {
    let Some(status) = job.status.as_ref() else {
        return JobStatus::Pending;
    };

    if status.succeeded.unwrap_or(0) > 0 {
        return JobStatus::Complete;
    }

    if status.failed.unwrap_or(0) > 0 {
        let timed_out = status
            .conditions
            .as_ref()
            .map(|conditions| conditions.iter().any(|c| c.type_ == "Failed" && c.reason.as_deref() == Some("DeadlineExceeded")))
            .unwrap_or(false);
        return if timed_out { JobStatus::Timeout } else { JobStatus::Failed };
    }

    if status.active.unwrap_or(0) > 0 {
        return JobStatus::Running;
    }

    JobStatus::Pending
}

fn pod_status(pods: &[Pod]) -> PodStatus {
    pods.iter()
        .find_map(|p| p.status.as_ref().and_then(|s| s.phase.as_deref()))
        .map(|phase| match phase {
            "Succeeded" => PodStatus::Succeeded,
            "Failed" => PodStatus::Failed,
            "Running" => PodStatus::Running,
            _ => PodStatus::Pending,
        })
        .unwrap_or(PodStatus::Pending)
}

#[async_trait]
impl JobInspector for JobInspectorImpl {
    async fn inspect(&self, run: &Run, _job_type: &JobType, step: &StepRuntime) -> Result<InspectResult, EngineError> {
        if run.fake_jobs {
            return Ok(InspectResult::fake_complete());
        }

        // Server processes are never polled to completion — they're
        // considered done once their Service exists, which `create`
        // guarantees before the step is even recorded (`spec.md` §9
        // resolution).
        if step.is_server_process() {
            return Ok(InspectResult { found: true, job_status: JobStatus::Complete, pod_status: PodStatus::Succeeded });
        }

        let job = match self.jobs().get_opt(&step.job_name).await.map_err(to_cluster_err)? {
            Some(job) => job,
            None => return Ok(InspectResult::not_found()),
        };

        let lp = ListParams::default().labels(&format!("job-name={}", step.job_name));
        let pods = self.pods().list(&lp).await.map_err(to_cluster_err)?;

        Ok(InspectResult { found: true, job_status: job_status(&job), pod_status: pod_status(&pods.items) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::{JobCondition, JobStatus as K8sJobStatus};

    fn job_with(succeeded: i32, failed: i32, active: i32, conditions: Vec<JobCondition>) -> K8sJob {
        K8sJob {
            status: Some(K8sJobStatus {
                succeeded: Some(succeeded),
                failed: Some(failed),
                active: Some(active),
                conditions: Some(conditions),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn succeeded_wins_over_everything_else() {
        assert_eq!(job_status(&job_with(1, 0, 0, Vec::new())), JobStatus::Complete);
    }

    #[test]
    fn failed_with_deadline_condition_is_timeout() {
        let cond = JobCondition { type_: "Failed".into(), reason: Some("DeadlineExceeded".into()), ..Default::default() };
        assert_eq!(job_status(&job_with(0, 1, 0, vec![cond])), JobStatus::Timeout);
    }

    #[test]
    fn failed_without_deadline_condition_is_plain_failed() {
        assert_eq!(job_status(&job_with(0, 1, 0, Vec::new())), JobStatus::Failed);
    }

    #[test]
    fn active_with_no_terminal_count_is_running() {
        assert_eq!(job_status(&job_with(0, 0, 1, Vec::new())), JobStatus::Running);
    }
}
