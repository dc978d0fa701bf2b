//! Error taxonomy for the simulator core.
//!
//! Mirrors spec.md §7: only startup failures (`InvalidArg`, `IoSetup`) ever
//! abort the process. Every other variant is an operational condition the
//! caller logs and recovers from — the VM engine and IPC front-end never
//! panic on a modeled error path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OssimError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("io setup failure: {0}")]
    IoSetup(#[from] std::io::Error),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("vpn {vpn} out of range for page table of capacity {capacity}")]
    LookupOutOfRange { vpn: i32, capacity: usize },

    #[error("no victim frame available for eviction")]
    NoVictim,

    #[error("no free frame available for allocation")]
    NoFrame,

    #[error("page (pid={pid}, vpn={vpn}) not found in swap store")]
    NotSwapped { pid: i32, vpn: i32 },
}

pub type Result<T> = std::result::Result<T, OssimError>;
