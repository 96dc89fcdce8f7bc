//! Run state machine (`spec.md` §4.F). Each transition appends exactly one
//! provenance entry and persists it immediately, mirroring the stored
//! procedure being called right after the in-memory string is updated.

use chrono::Utc;
use supervisor_catalog::Catalog;
use supervisor_types::{JobStatus, JobType, PodStatus, Run, RunStatus, StepTemplate, WorkflowDefinition};

use crate::ports::{Activity, ClusterTranslator, DbAdapter, EngineError, JobInspector};

async fn append_and_persist(run: &mut Run, db: &dyn DbAdapter, entry: &str) -> Result<(), EngineError> {
    run.status_prov.append(entry);
    tracing::info!(run_id = %run.id, job_type = %run.job_type, entry, "provenance appended");
    db.update_job_status(&run.id, run.status_prov.as_str()).await
}

fn workflow_def<'a>(run: &Run, catalog: &'a Catalog) -> Result<&'a WorkflowDefinition, EngineError> {
    catalog.get(&run.workflow_type).ok_or_else(|| EngineError::UnknownJobType {
        workflow_type: run.workflow_type.to_string(),
        job_type: run.job_type.to_string(),
    })
}

fn step_template<'a>(def: &'a WorkflowDefinition, run: &Run, job_type: &JobType) -> Result<&'a StepTemplate, EngineError> {
    def.get(job_type).ok_or_else(|| EngineError::UnknownJobType {
        workflow_type: run.workflow_type.to_string(),
        job_type: job_type.to_string(),
    })
}

/// Dispatches `NEW`/`RUNNING` handling (`spec.md` §4.F transitions 1-2).
/// `ERROR` and `COMPLETE` are terminal states the supervisor loop drives
/// directly via [`handle_error`] and [`handle_complete`], since both decide
/// whether the run stays on the active list.
pub async fn handle_run(
    run: &mut Run,
    catalog: &Catalog,
    db: &dyn DbAdapter,
    cluster: &dyn ClusterTranslator,
    inspector: &dyn JobInspector,
) -> Result<Activity, EngineError> {
    match run.status {
        RunStatus::New => handle_new(run, catalog, db, cluster).await,
        RunStatus::Running => handle_running(run, catalog, db, cluster, inspector).await,
        RunStatus::Complete | RunStatus::Error => Ok(Activity::Idle),
    }
}

/// `spec.md` §4.F transition 1: create the current step and every job-type
/// named in its `PARALLEL` list. Siblings are created together in the same
/// tick regardless of their own `NEXT_JOB_TYPE` — they are independent
/// leaves, not a further link in the primary chain (`spec.md` §8 scenario B).
async fn handle_new(run: &mut Run, catalog: &Catalog, db: &dyn DbAdapter, cluster: &dyn ClusterTranslator) -> Result<Activity, EngineError> {
    let current = run.job_type.clone();
    let mut job_type_list = vec![current.clone()];
    {
        let def = workflow_def(run, catalog)?;
        let template = step_template(&def, run, &current)?;
        job_type_list.extend(template.parallel.iter().cloned());
    }

    // `current` plus everything in its `PARALLEL` list are created together,
    // in the same tick, regardless of any of their own `NEXT_JOB_TYPE`
    // (`spec.md` §8 scenario B) — siblings are independent leaves, not a
    // further link in the primary chain.
    for job_type in &job_type_list {
        let template = {
            let def = workflow_def(run, catalog)?;
            step_template(&def, run, job_type)?.clone()
        };

        match cluster.create(run, job_type, &template).await {
            Ok(runtime) => {
                run.record_step(job_type.clone(), runtime);
                append_and_persist(run, db, &format!("{job_type} running")).await?;
            }
            Err(err) => {
                tracing::error!(run_id = %run.id, job_type = %job_type, error = %err, "step create failed");
                return Err(err);
            }
        }
    }

    run.status = RunStatus::Running;
    Ok(Activity::Active)
}

/// `spec.md` §4.F transition 2: inspect every unresolved recorded step.
async fn handle_running(
    run: &mut Run,
    catalog: &Catalog,
    db: &dyn DbAdapter,
    cluster: &dyn ClusterTranslator,
    inspector: &dyn JobInspector,
) -> Result<Activity, EngineError> {
    let mut activity = Activity::Idle;

    let pending: Vec<JobType> = run
        .step_order
        .iter()
        .filter(|jt| run.step(jt).map(|s| !s.resolved).unwrap_or(false))
        .cloned()
        .collect();

    for job_type in pending {
        let step = run.step(&job_type).expect("pending implies present").clone();
        let result = inspector.inspect(run, &job_type, &step).await?;
        activity = Activity::Active;

        if !result.found {
            tracing::error!(run_id = %run.id, job_type = %job_type, "job not found on cluster");
            run.status = RunStatus::Error;
            return Ok(activity);
        }

        let is_done = result.job_status == JobStatus::Complete && result.pod_status != PodStatus::Failed;

        if matches!(result.job_status, JobStatus::Timeout | JobStatus::Failed) {
            cluster.delete(run, &job_type, &step, false).await?;
            append_and_persist(run, db, &format!("{job_type} failed")).await?;
            run.status = RunStatus::Error;
            return Ok(activity);
        }

        if result.pod_status == PodStatus::Failed && !is_done {
            cluster.delete(run, &job_type, &step, false).await?;
            run.status = RunStatus::Error;
            return Ok(activity);
        }

        if !is_done {
            continue;
        }

        cluster.delete(run, &job_type, &step, false).await?;
        if let Some(s) = run.step_mut(&job_type) {
            s.resolved = true;
        }

        let entry = if step.is_server_process() {
            format!("{job_type} configuring")
        } else {
            format!("{job_type} complete")
        };
        append_and_persist(run, db, &entry).await?;

        if job_type == run.job_type {
            let next = {
                let def = workflow_def(run, catalog)?;
                step_template(&def, run, &job_type)?.next_job_type.clone()
            };
            run.job_type = next.clone();
            if !next.is_complete() && !run.steps.contains_key(&next) {
                run.status = RunStatus::New;
            }
        }
    }

    if run.status == RunStatus::Running && run.job_type.is_complete() && run.all_steps_resolved() {
        run.status = RunStatus::Complete;
    }

    Ok(activity)
}

/// `spec.md` §4.F transition 3, deferred to the tick after a run entered
/// `ERROR`. Returns whether the run should stay on the active list: it moves
/// on (to `NEW` for cleanup, or `COMPLETE` to be finalized) or it drops out
/// here, still terminally `ERROR`, when there is no cleanup step to run.
pub async fn handle_error(run: &mut Run, catalog: &Catalog, db: &dyn DbAdapter) -> Result<bool, EngineError> {
    let has_final_staging = catalog.get(&run.workflow_type).map(|d| d.has_final_staging()).unwrap_or(false);

    if !has_final_staging {
        append_and_persist(run, db, "No cleanup occurred.").await?;
        return Ok(false);
    }

    if run.job_type.as_str() == "final-staging" {
        append_and_persist(run, db, "incomplete cleanup").await?;
        run.status = RunStatus::Complete;
        return Ok(true);
    }

    append_and_persist(run, db, "error detected").await?;
    run.job_type = JobType::new("final-staging");
    run.status = RunStatus::New;
    Ok(true)
}

/// `spec.md` §4.F transition 4: force-remove any lingering server-process
/// jobs/services, append the final "run complete" provenance, and drop the
/// run from the active list.
pub async fn handle_complete(run: &mut Run, db: &dyn DbAdapter, cluster: &dyn ClusterTranslator) -> Result<(), EngineError> {
    cluster.cleanup_sweep(run).await?;

    let elapsed = Utc::now() - run.run_start;
    let minutes = elapsed.num_minutes();
    let seconds = elapsed.num_seconds() - minutes * 60;
    append_and_persist(run, db, &format!("run complete in {minutes} minutes {seconds} seconds")).await?;
    tracing::info!(run_id = %run.id, "run complete");
    Ok(())
}
