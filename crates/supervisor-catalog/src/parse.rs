use supervisor_types::{FileServerVolume, JobType, PortRange, StepTemplate, VolumeSize};

use crate::{split_csv, CatalogError, JobDefRow};

pub(crate) fn row_to_template(row: &JobDefRow) -> Result<StepTemplate, CatalogError> {
    let command_line = parse_column(row, "command_line", Some(row.command_line.as_str()))?;
    let command_matrix: Vec<Vec<String>> = parse_column(row, "command_matrix", Some(row.command_matrix.as_str()))?;
    let parallel: Vec<String> = parse_column(row, "parallel", Some(row.parallel.as_str()))?;
    let port_range: Vec<(u16, u16)> = parse_column(row, "port_range", row.port_range.as_deref())?;

    Ok(StepTemplate {
        job_type: JobType::new(&row.job_type),
        job_name: row.job_name.clone(),
        image: row.image.clone(),
        command_line,
        command_matrix: if command_matrix.is_empty() {
            vec![vec![String::new()]]
        } else {
            command_matrix
        },
        next_job_type: JobType::new(&row.next_job_type),
        parallel: parallel.into_iter().map(JobType::new).collect(),

        cpus: row.cpus.clone(),
        memory: row.memory.clone(),
        ephemeral: row.ephemeral.clone(),
        restart_policy: row.restart_policy.clone(),
        node_type: match (&row.node_type_key, &row.node_type_value) {
            (Some(k), Some(v)) => Some((k.clone(), v.clone())),
            _ => None,
        },
        backoff_limit: row.backoff_limit,
        ttl_seconds_after_finished: row.ttl_seconds_after_finished,

        data_volume_name: row.data_volume_name.clone(),
        data_mount_path: row.data_mount_path.clone(),
        sub_path: row.sub_path.clone(),
        additional_path: row.additional_path.clone(),
        filesvr_volumes: build_filesvr_volumes(row),

        port_range: port_range
            .into_iter()
            .map(|(lo, hi)| PortRange { lo, hi })
            .collect(),
    })
}

fn parse_column<T>(row: &JobDefRow, column: &'static str, raw: Option<&str>) -> Result<T, CatalogError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match raw {
        None => Ok(T::default()),
        Some(raw) if raw.trim().is_empty() => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw).map_err(|source| CatalogError::MalformedColumn {
            workflow_type: row.workflow_type.clone(),
            job_type: row.job_type.clone(),
            column,
            source,
        }),
    }
}

/// Collapses the three parallel `FILESVR_VOLUME_NAME` / `FILESVR_MOUNT_PATH`
/// / `FILESVR_VOLUME_SIZE` comma-lists into one `Vec<FileServerVolume>`
/// (`SPEC_FULL.md` §5.D). Lists shorter than the name list default the
/// missing mount path to the volume name and the missing size to an
/// existing-claim bind.
fn build_filesvr_volumes(row: &JobDefRow) -> Vec<FileServerVolume> {
    let names = row.filesvr_volume_name.as_deref().map(split_csv).unwrap_or_default();
    let mounts = row.filesvr_mount_path.as_deref().map(split_csv).unwrap_or_default();
    let sizes = row.filesvr_volume_size.as_deref().map(split_csv).unwrap_or_default();

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let mount_path = mounts.get(i).cloned().unwrap_or_else(|| name.clone());
            let size = sizes.get(i).map(|s| VolumeSize::parse(s)).unwrap_or(VolumeSize::ExistingClaim);
            FileServerVolume { name, mount_path, size }
        })
        .collect()
}
