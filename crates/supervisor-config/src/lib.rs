//! Config & Secrets Adapter (`spec.md` §4.A).
//!
//! Loads a static JSON document describing cluster context, poll cadence,
//! and resource multipliers, and exposes a fixed table of secret references
//! to the cluster translator. Fails fast (`Config::load` returns `Err`) if a
//! required key is missing from the document — callers are expected to
//! treat that as a fatal startup error (`spec.md` §6 Exit codes).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON or is missing a required key: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One `(env-var-name, secret-key-name)` pair exposed to the cluster
/// translator as an opaque reference (`spec.md` §4.A). The core itself never
/// reads these values; it only tells the translator which Kubernetes secret
/// key to mount under which env var name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretRef {
    pub env_name: String,
    pub secret_key: String,
}

/// A fixed run-as-user/group/fs-group triple applied to server-process pods
/// that mount the NFS share (`spec.md` §4.D point 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SecurityContext {
    pub run_as_user: i64,
    pub run_as_group: i64,
    pub fs_group: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NfsConfig {
    pub server: String,
    pub path: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub namespace: String,
    pub cluster_context: String,
    pub data_pvc_claim: String,
    pub nfs: NfsConfig,
    pub security_context: SecurityContext,

    pub poll_short_sleep_secs: u64,
    pub poll_long_sleep_secs: u64,
    pub max_no_activity_count: u32,
    pub create_sleep_secs: u64,
    pub sv_inactivity_hours: i64,

    pub job_backoff_limit: i32,
    pub job_timeout_secs: i32,
    pub job_limit_multiplier: f64,
    pub cpu_limits: bool,

    pub pause_sentinel_path: String,

    pub secret_env_params: Vec<SecretRef>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let raw = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }

    pub fn poll_short_sleep(&self) -> Duration {
        Duration::from_secs(self.poll_short_sleep_secs)
    }

    pub fn poll_long_sleep(&self) -> Duration {
        Duration::from_secs(self.poll_long_sleep_secs)
    }

    pub fn create_sleep(&self) -> Duration {
        Duration::from_secs(self.create_sleep_secs)
    }

    pub fn sv_inactivity(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sv_inactivity_hours)
    }

    pub fn pause_sentinel_present(&self) -> bool {
        Path::new(&self.pause_sentinel_path).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> &'static str {
        r#"{
            "namespace": "apsviz",
            "cluster_context": "prod",
            "data_pvc_claim": "apsviz-data",
            "nfs": {"server": "nfs.example.org", "path": "/export/apsviz", "mount_path": "/nfs"},
            "security_context": {"run_as_user": 1000, "run_as_group": 1000, "fs_group": 1000},
            "poll_short_sleep_secs": 10,
            "poll_long_sleep_secs": 60,
            "max_no_activity_count": 5,
            "create_sleep_secs": 3,
            "sv_inactivity_hours": 6,
            "job_backoff_limit": 1,
            "job_timeout_secs": 3600,
            "job_limit_multiplier": 0.5,
            "cpu_limits": false,
            "pause_sentinel_path": "/tmp/does-not-exist-pause",
            "secret_env_params": [{"env_name": "ASGS_DB_HOST", "secret_key": "apsviz-host"}]
        }"#
    }

    #[test]
    fn loads_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, sample()).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.namespace, "apsviz");
        assert_eq!(cfg.secret_env_params.len(), 1);
        assert!(!cfg.pause_sentinel_present());
        assert_eq!(cfg.poll_short_sleep(), Duration::from_secs(10));
    }

    #[test]
    fn fails_fast_on_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"namespace": "apsviz"}}"#).unwrap();
        drop(file);

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn fails_fast_on_missing_file() {
        let err = Config::load("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
