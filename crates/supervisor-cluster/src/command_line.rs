//! Per-job-family command-line additions (`spec.md` §4.D's command-line
//! assembly table). These are appended after `COMMAND_LINE` and the
//! `COMMAND_MATRIX` entry for a given container, then empty strings are
//! stripped from the final command.

use supervisor_types::{JobFamily, JobType, Run, StepTemplate};

fn run_dir(data_mount_path: &str, run: &Run, sub_path: &str) -> String {
    format!("{data_mount_path}/{}{sub_path}", run.id)
}

/// `spec.md` §4.D point 1 last clause: `DATA_MOUNT_PATH + SUB_PATH +
/// ADDITIONAL_PATH`, with `SUB_PATH` itself extended by the run-id, appended
/// to the command line as a single trailing bare argument. Only the initial
/// staging step extends its output path this way (ground:
/// `job_supervisor.py`'s `extend_output_path` flag is set only for the
/// staging job type).
fn output_path_arg(run: &Run, template: &StepTemplate) -> String {
    format!("{}{}", run_dir(&template.data_mount_path, run, &template.sub_path), template.additional_path)
}

/// `spec.md` §4.D: builds the extra arguments a step's job family appends to
/// `COMMAND_LINE` before it is handed to the container.
pub fn additions(run: &Run, job_type: &JobType, template: &StepTemplate) -> Vec<String> {
    let data_mount_path = &template.data_mount_path;

    match JobFamily::classify(job_type) {
        JobFamily::InitialStaging => vec![
            "--run_id".into(),
            run.id.clone(),
            "--run_dir".into(),
            run_dir(data_mount_path, run, ""),
            "--step_type".into(),
            "initial".into(),
            "--workflow_type".into(),
            run.workflow_type.to_string(),
            output_path_arg(run, template),
        ],
        JobFamily::FinalStaging => vec![
            "--run_id".into(),
            run.id.clone(),
            "--run_dir".into(),
            run_dir(data_mount_path, run, ""),
            "--step_type".into(),
            "final".into(),
            "--workflow_type".into(),
            run.workflow_type.to_string(),
        ],
        JobFamily::Forensics => {
            vec!["--run_id".into(), run.id.clone(), "--run_dir".into(), run_dir(data_mount_path, run, "")]
        }
        JobFamily::Adcirc2CogTiff | JobFamily::Geotiff2Cog | JobFamily::AdcircTimeToCog => {
            let dir = run_dir(data_mount_path, run, &template.sub_path);
            vec![
                "--inputDir".into(),
                dir.clone(),
                "--outputDir".into(),
                dir.clone(),
                "--finalDir".into(),
                dir,
                "--inputFile".into(),
            ]
        }
        JobFamily::ObsModAst | JobFamily::AstRunHarvester => {
            let download_url = run.param_str("downloadurl").unwrap_or_default();
            let thredds_url = format!("{}/fort.63.nc", download_url.replacen("fileServer", "dodsC", 1));
            let grid_name = run.param_str("adcirc.gridname").unwrap_or_default().to_string();
            vec!["--threddsUrl".into(), thredds_url, "--gridName".into(), grid_name, "--finalDir".into(), run_dir(data_mount_path, run, &template.sub_path)]
        }
        JobFamily::LoadGeoServer => vec!["--instanceId".into(), run.id.clone()],
        JobFamily::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use supervisor_types::{JobType, WorkflowType};

    fn template(job_type: &str, sub_path: &str) -> StepTemplate {
        StepTemplate {
            job_type: JobType::new(job_type),
            job_name: job_type.to_string(),
            image: "img".into(),
            command_line: Vec::new(),
            command_matrix: vec![vec![String::new()]],
            next_job_type: JobType::complete(),
            parallel: Vec::new(),
            cpus: None,
            memory: "1Gi".into(),
            ephemeral: None,
            restart_policy: "Never".into(),
            node_type: None,
            backoff_limit: 0,
            ttl_seconds_after_finished: 300,
            data_volume_name: "data".into(),
            data_mount_path: "/data".into(),
            sub_path: sub_path.to_string(),
            additional_path: String::new(),
            filesvr_volumes: Vec::new(),
            port_range: Vec::new(),
        }
    }

    fn run() -> Run {
        Run::new("7-a-b".into(), WorkflowType::new("apsviz"), JobType::new("initial-staging"), false, false, Default::default(), Utc::now())
    }

    #[test]
    fn initial_staging_adds_run_and_workflow_args() {
        let run = run();
        let tmpl = template("initial-staging", "");
        let args = additions(&run, &JobType::new("initial-staging"), &tmpl);
        assert_eq!(args, vec!["--run_id", "7-a-b", "--run_dir", "/data/7-a-b", "--step_type", "initial", "--workflow_type", "apsviz", "/data/7-a-b"]);
    }

    #[test]
    fn initial_staging_output_path_includes_additional_path() {
        let run = run();
        let mut tmpl = template("initial-staging", "/in");
        tmpl.additional_path = "/extra".into();
        let args = additions(&run, &JobType::new("initial-staging"), &tmpl);
        assert_eq!(args.last().unwrap(), "/data/7-a-b/in/extra");
    }

    #[test]
    fn load_geo_server_adds_instance_id_only() {
        let run = run();
        let tmpl = template("load-geo-server", "");
        let args = additions(&run, &JobType::new("load-geo-server"), &tmpl);
        assert_eq!(args, vec!["--instanceId", "7-a-b"]);
    }

    #[test]
    fn other_family_adds_nothing() {
        let run = run();
        let tmpl = template("db-server", "");
        assert!(additions(&run, &JobType::new("db-server"), &tmpl).is_empty());
    }
}
