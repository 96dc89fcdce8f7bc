/// One `(workflow_type, job_type)` step row, as the database adapter
/// returns it. List-valued columns arrive JSON-encoded — this crate is the
/// only place that decodes them (`spec.md` §4.C). Defined here rather than
/// in `supervisor-db` so that crates downstream of the catalog (the engine)
/// never need to depend on `sqlx` to see a row shape.
#[derive(Debug, Clone)]
pub struct JobDefRow {
    pub workflow_type: String,
    pub job_type: String,
    pub job_name: String,
    pub image: String,
    /// JSON array of strings, e.g. `["--run_id"]`.
    pub command_line: String,
    /// JSON array of arrays of strings.
    pub command_matrix: String,
    pub next_job_type: String,
    /// JSON array of job-type strings.
    pub parallel: String,

    pub cpus: Option<String>,
    pub memory: String,
    pub ephemeral: Option<String>,
    pub restart_policy: String,
    pub node_type_key: Option<String>,
    pub node_type_value: Option<String>,
    pub backoff_limit: i32,
    pub ttl_seconds_after_finished: i32,

    pub data_volume_name: String,
    pub data_mount_path: String,
    pub sub_path: String,
    pub additional_path: String,
    /// Comma-separated parallel lists, collapsed by this crate into
    /// `FileServerVolume` entries.
    pub filesvr_volume_name: Option<String>,
    pub filesvr_mount_path: Option<String>,
    pub filesvr_volume_size: Option<String>,

    /// JSON array of `[lo, hi]` pairs, e.g. `[[5432, 5432]]`.
    pub port_range: Option<String>,
}
