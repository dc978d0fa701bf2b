//! Runtime configuration.
//!
//! Plain struct + `Default`, the same shallow shape as a `DatabaseConfig`-
//! style config. CLI flags (parsed in `main`) override individual
//! fields of `Config::default()`; there is no config-file layer, matching
//! spec.md's Non-goals for the CLI/stats surface.

use crate::vm::eviction::EvictionPolicyKind;

/// Simulated quantum of one tick, in milliseconds.
pub const TICKS_MS: u32 = 100;

/// Preemptive round-robin time slice, in milliseconds (spec.md §4.8).
pub const TIME_SLICE_MS: u32 = 500;

/// Capacity of the fixed-size `pages` array carried in every wire message.
/// Distinct from `Config::pages`, which sizes each process's page table.
pub const MAX_REQUESTED_PAGES: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-process page table capacity. VPNs `[1, pages - 1]` are valid.
    pub pages: usize,
    /// Number of physical frames in the frame table.
    pub frames: usize,
    /// Minimum free-frame count the VM engine maintains before a burst's
    /// page accesses are resolved.
    pub threshold: usize,
    /// Active page replacement policy.
    pub policy: EvictionPolicyKind,
    /// Filesystem path of the Unix domain socket clients connect to.
    pub socket_path: String,
    /// Listen backlog for the socket.
    pub max_clients: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pages: 20,
            frames: 30,
            threshold: 4,
            policy: EvictionPolicyKind::Nru,
            socket_path: "/tmp/ossim.sock".to_string(),
            max_clients: 16,
        }
    }
}
