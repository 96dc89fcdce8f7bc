//! Run admission (`spec.md` §4.G step 3, §4.F "Required request parameters"
//! and "Duplicate suppression").

use std::collections::HashMap;

use chrono::Utc;
use supervisor_types::{JobType, Run, WorkflowType};

use crate::ports::{DbAdapter, EngineError, NewRunRow};

const BASE_REQUIRED: &[&str] = &["workflow-type"];

/// Per-workflow-family required request parameters (`spec.md` §4.F). Keyed
/// by workflow-type; workflow-types absent from this table carry no
/// additional requirement beyond `workflow-type` itself.
fn family_required_params(workflow_type: &str) -> &'static [&'static str] {
    match workflow_type {
        "apsviz" | "adcirc" => &["downloadurl", "adcirc.gridname", "instancename", "stormnumber", "physical_location"],
        _ => &[],
    }
}

fn missing_params(run_data: &HashMap<String, serde_json::Value>, workflow_type: &str) -> Vec<&'static str> {
    family_required_params(workflow_type)
        .iter()
        .copied()
        .filter(|key| !run_data.contains_key(*key))
        .collect()
}

/// Admits every queued row into `active`, performing duplicate suppression,
/// parameter validation, workflow-type binding, and first-job resolution in
/// that order (`spec.md` §4.G step 3). Rejections are reported to the
/// database and otherwise silent to the caller — admission never fails the
/// whole tick for one bad row.
pub async fn admit(active: &mut Vec<Run>, rows: Vec<NewRunRow>, db: &dyn DbAdapter) -> Result<(), EngineError> {
    for row in rows {
        if active.iter().any(|r| r.id == row.run_id) {
            tracing::warn!(run_id = %row.run_id, "duplicate run rejected");
            db.update_job_status(&row.run_id, "Duplicate run rejected.").await?;
            continue;
        }

        let run_data = match row.run_data.as_object() {
            Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<HashMap<_, _>>(),
            None => {
                db.update_job_status(&row.run_id, "Error - Run lacks the required run properties (workflow-type).").await?;
                continue;
            }
        };

        let missing_base: Vec<&str> = BASE_REQUIRED.iter().copied().filter(|k| !run_data.contains_key(*k)).collect();
        if !missing_base.is_empty() {
            let msg = format!("Error - Run lacks the required run properties ({}).", missing_base.join(", "));
            tracing::warn!(run_id = %row.run_id, missing = ?missing_base, "rejecting run");
            db.update_job_status(&row.run_id, &msg).await?;
            continue;
        }

        let workflow_type = run_data.get("workflow-type").and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let missing = missing_params(&run_data, &workflow_type);
        if !missing.is_empty() {
            let msg = format!("Error - Run lacks the required run properties ({}).", missing.join(", "));
            tracing::warn!(run_id = %row.run_id, missing = ?missing, "rejecting run");
            db.update_job_status(&row.run_id, &msg).await?;
            continue;
        }

        let first_job = match db.get_first_job(&workflow_type).await? {
            Some(job_type) => job_type,
            None => {
                let msg = format!("Error - Unknown workflow type '{workflow_type}'.");
                tracing::warn!(run_id = %row.run_id, workflow_type, "rejecting run");
                db.update_job_status(&row.run_id, &msg).await?;
                continue;
            }
        };

        let status = run_data.get("supervisor_job_status").and_then(|v| v.as_str()).unwrap_or("new");
        let debug = status == "debug";
        let fake_jobs = run_data.get("fake_jobs").and_then(|v| v.as_bool()).unwrap_or(false);

        let run = Run::new(
            row.run_id.clone(),
            WorkflowType::new(&workflow_type),
            JobType::new(&first_job),
            debug,
            fake_jobs,
            run_data,
            Utc::now(),
        );

        db.update_job_status(&run.id, run.status_prov.as_str()).await?;
        tracing::info!(run_id = %run.id, workflow_type, "run accepted");
        active.push(run);
    }

    Ok(())
}
