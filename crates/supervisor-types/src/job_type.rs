use std::fmt;
use std::sync::Arc;

/// The sentinel `NEXT_JOB_TYPE` value meaning "no successor, the run is done".
pub const COMPLETE_SENTINEL: &str = "complete";

/// A job-type identifier. Job-types are data — they come from the database,
/// one row per step of a workflow — so this is a newtype around an interned
/// string rather than a closed Rust enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobType(Arc<str>);

impl JobType {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this is the `complete` sentinel, i.e. not a real step.
    pub fn is_complete(&self) -> bool {
        self.0.as_ref() == COMPLETE_SENTINEL
    }

    pub fn complete() -> Self {
        Self::new(COMPLETE_SENTINEL)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for JobType {
    fn from(s: String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

/// Identifies a workflow definition (the DAG a run follows).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowType(Arc<str>);

impl WorkflowType {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkflowType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkflowType {
    fn from(s: String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

/// Job-type families recognized by the cluster translator's command-line and
/// config-map lookup tables (`SPEC_FULL.md` §5.D). Everything not matched
/// here is a "no additions" step (DB/server/consumer steps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFamily {
    InitialStaging,
    FinalStaging,
    Forensics,
    Adcirc2CogTiff,
    Geotiff2Cog,
    AdcircTimeToCog,
    ObsModAst,
    AstRunHarvester,
    LoadGeoServer,
    Other,
}

impl JobFamily {
    pub fn classify(job_type: &JobType) -> Self {
        match job_type.as_str() {
            "initial-staging" => Self::InitialStaging,
            "final-staging" => Self::FinalStaging,
            "forensics" => Self::Forensics,
            "adcirc2cog-tiff" => Self::Adcirc2CogTiff,
            "geotiff2cog" => Self::Geotiff2Cog,
            "adcirctime-to-cog" => Self::AdcircTimeToCog,
            "obs-mod-ast" => Self::ObsModAst,
            "ast-run-harvester" => Self::AstRunHarvester,
            "load-geo-server" => Self::LoadGeoServer,
            _ => Self::Other,
        }
    }

    /// `load-geo-server` steps cannot use the proxy env vars (they talk to an
    /// in-cluster GeoServer, not the public internet).
    pub fn wants_proxy_env(self) -> bool {
        !matches!(self, Self::LoadGeoServer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_sentinel_recognized() {
        assert!(JobType::new("complete").is_complete());
        assert!(!JobType::new("staging").is_complete());
    }

    #[test]
    fn family_classification() {
        assert_eq!(JobFamily::classify(&JobType::new("final-staging")), JobFamily::FinalStaging);
        assert_eq!(JobFamily::classify(&JobType::new("load-geo-server")), JobFamily::LoadGeoServer);
        assert_eq!(JobFamily::classify(&JobType::new("db-server")), JobFamily::Other);
        assert!(!JobFamily::LoadGeoServer.wants_proxy_env());
        assert!(JobFamily::Other.wants_proxy_env());
    }
}
