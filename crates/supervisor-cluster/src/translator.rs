//! `ClusterTranslator` implementation (`spec.md` §4.D). Manifests are
//! applied with server-side apply, following the same
//! `Api::patch(name, &PatchParams::apply(field_manager), &Patch::Apply(...))`
//! idiom the teacher's own controller uses for every resource it manages.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job as K8sJob;
use k8s_openapi::api::core::v1::Service as K8sService;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PropagationPolicy};
use kube::Client;
use supervisor_config::Config;
use supervisor_engine::{ClusterTranslator, EngineError};
use supervisor_types::{InspectResult, JobType, Run, RunStatus, StepRuntime, StepTemplate};

use crate::manifest;

const FIELD_MANAGER: &str = "supervisor";

fn to_cluster_err(err: kube::Error) -> EngineError {
    EngineError::Cluster(err.to_string())
}

pub struct ClusterTranslatorImpl {
    client: Client,
    cfg: Config,
}

impl ClusterTranslatorImpl {
    pub fn new(client: Client, cfg: Config) -> Self {
        Self { client, cfg }
    }

    fn jobs(&self) -> Api<K8sJob> {
        Api::namespaced(self.client.clone(), &self.cfg.namespace)
    }

    fn services(&self) -> Api<K8sService> {
        Api::namespaced(self.client.clone(), &self.cfg.namespace)
    }

    /// `spec.md` §4.D point 7: after creating a job, list jobs by the `app`
    /// label the job itself carries and recover the `controller-uid` label
    /// the apiserver assigned, rather than reading it off the create
    /// response (server-side apply doesn't round-trip it reliably).
    async fn find_controller_uid(&self, job_name: &str) -> Result<Option<String>, EngineError> {
        let lp = ListParams::default().labels(&format!("app={job_name}"));
        let list = self.jobs().list(&lp).await.map_err(to_cluster_err)?;
        Ok(list.items.into_iter().next().and_then(|j| j.metadata.labels.and_then(|l| l.get("controller-uid").cloned())))
    }
}

#[async_trait]
impl ClusterTranslator for ClusterTranslatorImpl {
    async fn create(&self, run: &Run, job_type: &JobType, template: &StepTemplate) -> Result<StepRuntime, EngineError> {
        let job_name = format!("{}-{}", template.job_name, run.id);

        if run.fake_jobs {
            let mut runtime = StepRuntime::new(template.clone(), format!("fake-job-{job_type}"));
            runtime.last_result = Some(InspectResult::fake_complete());
            return Ok(runtime);
        }

        let manifest = manifest::build_job(run, job_type, template, &self.cfg, &job_name);

        if run.debug {
            let command = manifest["spec"]["template"]["spec"]["containers"][0]["command"].clone();
            tracing::debug!(%job_type, %command, "assembled command line for debug run");
        }

        self.jobs().patch(&job_name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(manifest)).await.map_err(to_cluster_err)?;

        let mut service_created = false;
        if template.is_server_process() {
            let service = manifest::build_service(template, &job_name);
            self.services().patch(&job_name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(service)).await.map_err(to_cluster_err)?;
            service_created = true;
        }

        tokio::time::sleep(self.cfg.create_sleep()).await;

        let controller_uid = self.find_controller_uid(&job_name).await?;

        let mut runtime = StepRuntime::new(template.clone(), job_name);
        runtime.controller_uid = controller_uid;
        runtime.service_created = service_created;
        Ok(runtime)
    }

    async fn delete(&self, run: &Run, _job_type: &JobType, step: &StepRuntime, forced: bool) -> Result<(), EngineError> {
        // Debug and error runs skip deletion so an operator can inspect the
        // live job (`spec.md` §4.D point 8).
        if run.debug || run.status == RunStatus::Error {
            return Ok(());
        }
        if run.fake_jobs {
            return Ok(());
        }
        // Server-process steps linger on the cluster until the final
        // cleanup sweep force-deletes them (`spec.md` §3 invariant 3).
        if step.is_server_process() && !forced {
            return Ok(());
        }

        let dp = DeleteParams { propagation_policy: Some(PropagationPolicy::Foreground), grace_period_seconds: Some(5), ..Default::default() };
        // Deleting an already-deleted job is not an error for our purposes.
        self.jobs().delete(&step.job_name, &dp).await.ok();

        if forced && step.service_created {
            self.services().delete(&step.job_name, &Default::default()).await.ok();
        }

        Ok(())
    }

    async fn cleanup_sweep(&self, run: &Run) -> Result<(), EngineError> {
        for (job_type, step) in run.server_steps() {
            self.delete(run, job_type, step, true).await?;
        }
        Ok(())
    }
}
