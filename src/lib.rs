//! `ossim`: a single-CPU round-robin scheduler coupled with a demand-paging
//! virtual memory simulator, driven over a local IPC channel.
//!
//! Organized module-per-concern, with `thiserror` + a crate-wide
//! `Result<T>` and `tracing` for structured logging, and modeling the
//! scheduling/paging semantics of the educational C simulator this crate
//! replaces — see `DESIGN.md` for the grounding of each module.

pub mod config;
pub mod error;
pub mod ipc;
pub mod pcb;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod tick;
pub mod vm;

pub use config::Config;
pub use error::{OssimError, Result};
pub use tick::Simulation;
