//! Run state machine and supervisor loop (`spec.md` §4.F-§4.G). This crate
//! only knows about trait ports ([`ports::DbAdapter`],
//! [`ports::ClusterTranslator`], [`ports::JobInspector`]) — the adapter
//! crates (`supervisor-db`, `supervisor-cluster`) depend on this crate to
//! implement them, not the other way around, so the engine stays free of
//! `sqlx`/`kube` (`SPEC_FULL.md` §4.4).

mod intake;
pub mod ports;
mod state_machine;
mod supervisor_loop;

pub use ports::{Activity, ClusterTranslator, DbAdapter, EngineError, JobInspector, NewRunRow};
pub use state_machine::{handle_complete, handle_error, handle_run};
pub use supervisor_loop::{Supervisor, SupervisorConfig};
