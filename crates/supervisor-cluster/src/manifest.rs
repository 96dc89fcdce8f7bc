//! Builds the `Job`/`Service` manifests a run's step submits (`spec.md`
//! §4.D points 1-6). Manifests are assembled as `serde_json::Value` rather
//! than typed `k8s-openapi` structs, matching the teacher's own
//! server-side-apply idiom of patching with a literal JSON document.

use serde_json::{json, Value};
use supervisor_config::Config;
use supervisor_types::{JobFamily, JobType, Run, StepTemplate, VolumeSize};

use crate::{command_line, configmaps, env, resources};

fn labels(job_name: &str) -> Value {
    json!({"app": job_name, "job-name": job_name})
}

fn data_volume(run: &Run, template: &StepTemplate, cfg: &Config) -> (Value, Value) {
    let volume_name = format!("{}-{}", template.data_volume_name, run.id);
    let volume = json!({"name": volume_name, "persistentVolumeClaim": {"claimName": cfg.data_pvc_claim}});
    let mut mount = json!({"name": volume_name, "mountPath": template.data_mount_path});
    if !template.sub_path.is_empty() {
        mount["subPath"] = json!(format!("{}{}", run.id, template.sub_path));
    }
    (volume, mount)
}

fn filesvr_volumes(run: &Run, template: &StepTemplate) -> (Vec<Value>, Vec<Value>) {
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    for fv in &template.filesvr_volumes {
        match &fv.size {
            VolumeSize::ExistingClaim => {
                volumes.push(json!({"name": fv.name, "persistentVolumeClaim": {"claimName": fv.name}}));
            }
            VolumeSize::Ephemeral(size) => {
                let claim_name = format!("{}-{}", fv.name, run.id);
                volumes.push(json!({
                    "name": fv.name,
                    "ephemeral": {
                        "volumeClaimTemplate": {
                            "metadata": {"name": claim_name},
                            "spec": {"accessModes": ["ReadWriteOnce"], "resources": {"requests": {"storage": size}}},
                        }
                    }
                }));
            }
        }
        mounts.push(json!({"name": fv.name, "mountPath": fv.mount_path}));
    }
    (volumes, mounts)
}

/// Server-process steps whose job family isn't one of the named data
/// pipelines (`db-server`, `geoserver`-adjacent processes, ...) are treated
/// as database-like and get a `/dev/shm` tmpfs (`spec.md` §4.D point 3).
fn wants_shm(job_type: &JobType, template: &StepTemplate) -> bool {
    template.is_server_process() && JobFamily::classify(job_type) == JobFamily::Other
}

fn container(idx: usize, job_name: &str, template: &StepTemplate, matrix_entry: &[String], additions: &[String], mounts: &[Value], cfg: &Config, job_type: &JobType) -> Value {
    let mut command = template.command_line.clone();
    command.extend(additions.iter().cloned());
    command.extend(matrix_entry.iter().cloned());
    command.retain(|arg| !arg.is_empty());

    let cpus = template.default_cpus();
    let memory_limit = resources::scaled_quantity(&template.memory, cfg.job_limit_multiplier);

    let mut limits = json!({"memory": memory_limit, "ephemeral-storage": template.default_ephemeral_limit()});
    if cfg.cpu_limits {
        limits["cpu"] = json!(resources::scaled_quantity(cpus, cfg.job_limit_multiplier));
    }

    let mut c = json!({
        "name": format!("{job_name}-{idx}"),
        "image": template.image,
        "command": command,
        "volumeMounts": mounts,
        "env": env::container_env(cfg, job_type),
        "resources": {
            "limits": limits,
            "requests": {"cpu": cpus, "memory": template.memory, "ephemeral-storage": "64Mi"},
        },
    });

    if template.is_server_process() {
        c["ports"] = json!(template
            .port_range
            .iter()
            .flat_map(|r| r.ports())
            .map(|p| json!({"containerPort": p}))
            .collect::<Vec<_>>());
    }

    c
}

/// `spec.md` §4.D points 1-6.
pub fn build_job(run: &Run, job_type: &JobType, template: &StepTemplate, cfg: &Config, job_name: &str) -> Value {
    let (data_vol, data_mount) = data_volume(run, template, cfg);
    let (mut volumes, mut mounts) = (vec![data_vol], vec![data_mount]);

    let (fv_volumes, fv_mounts) = filesvr_volumes(run, template);
    volumes.extend(fv_volumes);
    mounts.extend(fv_mounts);

    if wants_shm(job_type, template) {
        volumes.push(json!({"name": "dshm", "emptyDir": {"medium": "Memory", "sizeLimit": "128Mi"}}));
        mounts.push(json!({"name": "dshm", "mountPath": "/dev/shm"}));
    }

    if template.is_server_process() {
        volumes.push(json!({"name": "nfs-share", "nfs": {"server": cfg.nfs.server, "path": cfg.nfs.path}}));
        mounts.push(json!({"name": "nfs-share", "mountPath": cfg.nfs.mount_path}));

        let (cm_volumes, cm_mounts) = configmaps::volumes_and_mounts(job_type);
        volumes.extend(cm_volumes);
        mounts.extend(cm_mounts);
    }

    let additions = command_line::additions(run, job_type, template);

    let containers: Vec<Value> = template
        .command_matrix
        .iter()
        .enumerate()
        .map(|(idx, matrix_entry)| container(idx, job_name, template, matrix_entry, &additions, &mounts, cfg, job_type))
        .collect();

    let mut pod_spec = json!({
        "restartPolicy": template.restart_policy,
        "containers": containers,
        "volumes": volumes,
    });

    if let Some((key, value)) = &template.node_type {
        pod_spec["nodeSelector"] = json!({ (key.clone()): value });
    }

    if template.is_server_process() {
        pod_spec["securityContext"] = json!({
            "runAsUser": cfg.security_context.run_as_user,
            "runAsGroup": cfg.security_context.run_as_group,
            "fsGroup": cfg.security_context.fs_group,
        });
    }

    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {"name": job_name, "labels": labels(job_name)},
        "spec": {
            "backoffLimit": cfg.job_backoff_limit,
            "ttlSecondsAfterFinished": cfg.job_timeout_secs,
            "template": {
                "metadata": {"labels": labels(job_name)},
                "spec": pod_spec,
            },
        },
    })
}

/// `spec.md` §4.D point 5: a `ClusterIP` service exposing every port in
/// every `PORT_RANGE`, selecting the job's own pods by label.
pub fn build_service(template: &StepTemplate, job_name: &str) -> Value {
    let ports: Vec<Value> = template
        .port_range
        .iter()
        .flat_map(|r| r.ports())
        .enumerate()
        .map(|(i, port)| json!({"name": format!("port-{i}"), "port": port, "targetPort": port, "protocol": "TCP"}))
        .collect();

    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": job_name, "labels": {"app": job_name}},
        "spec": {
            "type": "ClusterIP",
            "selector": {"app": job_name},
            "ports": ports,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use supervisor_types::{PortRange, WorkflowType};

    fn cfg() -> Config {
        serde_json::from_value(json!({
            "namespace": "apsviz",
            "cluster_context": "prod",
            "data_pvc_claim": "apsviz-data",
            "nfs": {"server": "nfs.example.org", "path": "/export", "mount_path": "/nfs"},
            "security_context": {"run_as_user": 1000, "run_as_group": 1000, "fs_group": 1000},
            "poll_short_sleep_secs": 10, "poll_long_sleep_secs": 60, "max_no_activity_count": 5,
            "create_sleep_secs": 1, "sv_inactivity_hours": 6,
            "job_backoff_limit": 1, "job_timeout_secs": 3600, "job_limit_multiplier": 0.5, "cpu_limits": false,
            "pause_sentinel_path": "/tmp/does-not-exist",
            "secret_env_params": []
        }))
        .unwrap()
    }

    fn run() -> Run {
        Run::new("7-a-b".into(), WorkflowType::new("apsviz"), JobType::new("staging"), false, false, Default::default(), Utc::now())
    }

    #[test]
    fn non_server_job_has_no_ports_or_security_context() {
        let template = StepTemplate {
            job_type: JobType::new("staging"),
            job_name: "staging".into(),
            image: "img".into(),
            command_line: vec!["run".into()],
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
            sub_path: String::new(),
            additional_path: String::new(),
            filesvr_volumes: Vec::new(),
            port_range: Vec::new(),
        };
        let job = build_job(&run(), &JobType::new("staging"), &template, &cfg(), "staging-7-a-b");
        assert_eq!(job["spec"]["template"]["spec"]["containers"][0]["command"], json!(["run"]));
        assert!(job["spec"]["template"]["spec"].get("securityContext").is_none());
    }

    #[test]
    fn server_process_builds_service_with_every_port() {
        let template = StepTemplate {
            job_type: JobType::new("db-server"),
            job_name: "db-server".into(),
            image: "postgres".into(),
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
            sub_path: String::new(),
            additional_path: String::new(),
            filesvr_volumes: Vec::new(),
            port_range: vec![PortRange { lo: 5432, hi: 5432 }],
        };
        let svc = build_service(&template, "db-server-7-a-b");
        assert_eq!(svc["spec"]["ports"].as_array().unwrap().len(), 1);

        let job = build_job(&run(), &JobType::new("db-server"), &template, &cfg(), "db-server-7-a-b");
        assert!(job["spec"]["template"]["spec"]["securityContext"].is_object());
        let volume_names: Vec<_> = job["spec"]["template"]["spec"]["volumes"].as_array().unwrap().iter().map(|v| v["name"].as_str().unwrap().to_string()).collect();
        assert!(volume_names.contains(&"dshm".to_string()));
        assert!(volume_names.contains(&"nfs-share".to_string()));
    }
}
