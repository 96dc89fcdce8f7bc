//! Job-Definition Catalog (`spec.md` §4.C). Normalizes the raw rows
//! `supervisor-db` returns into the in-memory `workflow_type →
//! WorkflowDefinition` map the engine consults on every tick, decoding
//! JSON-packed array columns exactly once per refresh.

mod parse;
mod row;

use std::collections::HashMap;

use supervisor_types::{JobType, WorkflowDefinition, WorkflowType};
use thiserror::Error;

pub use row::JobDefRow;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("job row {workflow_type}/{job_type} has malformed JSON in column {column}: {source}")]
    MalformedColumn {
        workflow_type: String,
        job_type: String,
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The in-memory map described in `spec.md` §3, refreshed at the top of
/// every supervisor-loop iteration (`spec.md` §4.C).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    workflows: HashMap<WorkflowType, WorkflowDefinition>,
}

impl Catalog {
    pub fn get(&self, workflow_type: &WorkflowType) -> Option<&WorkflowDefinition> {
        self.workflows.get(workflow_type)
    }

    pub fn workflow_types(&self) -> impl Iterator<Item = &WorkflowType> {
        self.workflows.keys()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Rebuilds the catalog from a fresh set of rows. A workflow whose rows
    /// contain an unparseable column, or whose `PARALLEL` list names a
    /// job-type absent from the same workflow, is dropped from the
    /// refreshed catalog and logged — other workflows are unaffected
    /// (`SPEC_FULL.md` §5.C).
    pub fn refresh(rows: Vec<JobDefRow>) -> Self {
        let mut by_workflow: HashMap<String, Vec<JobDefRow>> = HashMap::new();
        for row in rows {
            by_workflow.entry(row.workflow_type.clone()).or_default().push(row);
        }

        let mut workflows = HashMap::new();
        for (workflow_type, workflow_rows) in by_workflow {
            match build_workflow(&workflow_type, workflow_rows) {
                Ok(def) => {
                    workflows.insert(WorkflowType::new(&workflow_type), def);
                }
                Err(err) => {
                    tracing::error!(workflow_type = %workflow_type, error = %err, "dropping workflow from catalog refresh");
                }
            }
        }

        Self { workflows }
    }
}

fn build_workflow(workflow_type: &str, rows: Vec<JobDefRow>) -> Result<WorkflowDefinition, CatalogError> {
    let mut def = WorkflowDefinition::new();
    for row in &rows {
        let template = parse::row_to_template(row)?;
        def.insert(JobType::new(&row.job_type), template);
    }

    for job_type in def.job_types().cloned().collect::<Vec<_>>() {
        let template = def.get(&job_type).expect("just inserted");
        for sibling in &template.parallel {
            if !def.contains(sibling) && !sibling.is_complete() {
                tracing::error!(
                    workflow_type,
                    job_type = %job_type,
                    parallel_job_type = %sibling,
                    "PARALLEL names a job-type not defined in this workflow"
                );
                return Err(CatalogError::MalformedColumn {
                    workflow_type: workflow_type.to_string(),
                    job_type: job_type.to_string(),
                    column: "parallel",
                    source: serde_json::Error::io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("unknown job-type '{sibling}' in PARALLEL"),
                    )),
                });
            }
        }
    }

    Ok(def)
}

/// Decodes the comma-separated `FILESVR_*` columns into the index-paired
/// tuples the template-builder needs, tolerating a shorter size list by
/// defaulting missing entries to an existing-claim bind.
pub(crate) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use supervisor_types::VolumeSize;

    fn row(workflow_type: &str, job_type: &str, next: &str, parallel: &str) -> JobDefRow {
        JobDefRow {
            workflow_type: workflow_type.to_string(),
            job_type: job_type.to_string(),
            job_name: format!("{job_type}-job"),
            image: "registry/image:latest".to_string(),
            command_line: "[\"--run_id\"]".to_string(),
            command_matrix: "[[\"\"]]".to_string(),
            next_job_type: next.to_string(),
            parallel: parallel.to_string(),
            cpus: None,
            memory: "1Gi".to_string(),
            ephemeral: None,
            restart_policy: "Never".to_string(),
            node_type_key: None,
            node_type_value: None,
            backoff_limit: 0,
            ttl_seconds_after_finished: 300,
            data_volume_name: "data".to_string(),
            data_mount_path: "/data".to_string(),
            sub_path: String::new(),
            additional_path: String::new(),
            filesvr_volume_name: None,
            filesvr_mount_path: None,
            filesvr_volume_size: None,
            port_range: None,
        }
    }

    #[test]
    fn refresh_builds_single_step_workflow() {
        let catalog = Catalog::refresh(vec![row("simple", "staging", "complete", "[]")]);
        let def = catalog.get(&WorkflowType::new("simple")).expect("workflow present");
        assert!(def.contains(&JobType::new("staging")));
        assert_eq!(def.get(&JobType::new("staging")).unwrap().next_job_type, JobType::new("complete"));
    }

    #[test]
    fn unknown_parallel_job_type_drops_only_that_workflow() {
        let rows = vec![
            row("broken", "a", "complete", "[\"missing\"]"),
            row("healthy", "staging", "complete", "[]"),
        ];
        let catalog = Catalog::refresh(rows);
        assert!(catalog.get(&WorkflowType::new("broken")).is_none());
        assert!(catalog.get(&WorkflowType::new("healthy")).is_some());
    }

    #[test]
    fn filesvr_csv_columns_collapse_into_volumes() {
        let mut r = row("wf", "db-server", "complete", "[]");
        r.filesvr_volume_name = Some("scratch,shared".to_string());
        r.filesvr_mount_path = Some("/scratch".to_string());
        r.filesvr_volume_size = Some("10Gi,0".to_string());

        let catalog = Catalog::refresh(vec![r]);
        let template = catalog.get(&WorkflowType::new("wf")).unwrap().get(&JobType::new("db-server")).unwrap();
        assert_eq!(template.filesvr_volumes.len(), 2);
        assert_eq!(template.filesvr_volumes[0].mount_path, "/scratch");
        assert_eq!(template.filesvr_volumes[1].mount_path, "shared");
        assert_eq!(template.filesvr_volumes[1].size, VolumeSize::ExistingClaim);
    }
}
