//! Container environment assembly (`spec.md` §4.A, §4.D point 3). The
//! supervisor core never reads secret values itself — it only carries the
//! `(env var name, secret key)` table from config and mounts it as
//! `secretKeyRef`s, plus the outbound-proxy variables every job family wants
//! except `LOAD_GEO_SERVER` (`spec.md` §4.D point 3 note).

use serde_json::{json, Value};
use supervisor_config::Config;
use supervisor_types::{JobFamily, JobType};

const PROXY_SECRET_KEY: &str = "no-proxy-hosts";
const PROXY_ENV_NAMES: [&str; 4] = ["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY"];

pub fn container_env(cfg: &Config, job_type: &JobType) -> Vec<Value> {
    let mut env: Vec<Value> = cfg
        .secret_env_params
        .iter()
        .map(|s| json!({"name": s.env_name, "valueFrom": {"secretKeyRef": {"name": "supervisor-secrets", "key": s.secret_key}}}))
        .collect();

    if JobFamily::classify(job_type).wants_proxy_env() {
        for name in PROXY_ENV_NAMES {
            env.push(json!({"name": name, "valueFrom": {"secretKeyRef": {"name": "supervisor-secrets", "key": PROXY_SECRET_KEY}}}));
        }
    }

    env
}
