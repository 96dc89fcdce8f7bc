//! Cluster Translator and Job Inspector (`spec.md` §4.D-§4.E). Builds
//! Kubernetes `Job`/`Service` manifests from step templates, submits and
//! deletes them through `kube`, and maps their live status back onto the
//! abstract `JobStatus`/`PodStatus` pair the run state machine consumes.

mod command_line;
mod configmaps;
mod env;
mod inspector;
mod manifest;
mod resources;
mod translator;

pub use inspector::JobInspectorImpl;
pub use translator::ClusterTranslatorImpl;
