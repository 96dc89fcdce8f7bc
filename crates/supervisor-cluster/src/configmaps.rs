//! Init-script config-map table for server-process steps (`spec.md` §4.D
//! point 6, §9 design note: "the config-map table is data, not code"). Not
//! grounded in a prior implementation — no original init-script wiring
//! exists to translate — so it is kept as the fixed, literal lookup the
//! design note calls for rather than invented per-job-type logic.

use serde_json::{json, Value};
use supervisor_types::{JobFamily, JobType};

/// One config-map volume mounted read-only into a server-process step's pod.
pub struct InitScriptVolume {
    pub config_map_name: &'static str,
    pub mount_path: &'static str,
}

/// The fixed table, keyed by job family. Families absent from this table get
/// no init-script volume.
fn table(family: JobFamily) -> &'static [InitScriptVolume] {
    match family {
        JobFamily::Other => &[InitScriptVolume { config_map_name: "supervisor-db-init-scripts", mount_path: "/docker-entrypoint-initdb.d" }],
        JobFamily::LoadGeoServer => &[InitScriptVolume { config_map_name: "supervisor-geoserver-init-scripts", mount_path: "/opt/geoserver_data/init.d" }],
        _ => &[],
    }
}

pub fn volumes_and_mounts(job_type: &JobType) -> (Vec<Value>, Vec<Value>) {
    let entries = table(JobFamily::classify(job_type));
    let volumes = entries
        .iter()
        .enumerate()
        .map(|(i, e)| json!({"name": format!("init-scripts-{i}"), "configMap": {"name": e.config_map_name}}))
        .collect();
    let mounts = entries
        .iter()
        .enumerate()
        .map(|(i, e)| json!({"name": format!("init-scripts-{i}"), "mountPath": e.mount_path, "readOnly": true}))
        .collect();
    (volumes, mounts)
}
