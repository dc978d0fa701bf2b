//! Swap store (spec.md §4.3, C3).
//!
//! Grounded on `original_source/virtmem.c`'s `swap_out`/`swap_in`, which key
//! a `uthash` table by `(pid << 32) | vfn` packed into a `uint64_t`; here
//! the natural Rust key is the `(i32, i32)` tuple directly; no packing
//! needed.

use crate::error::{OssimError, Result};
use crate::stats::Stats;
use crate::vm::page_table::PageTableEntry;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct SwappedPage {
    dirty: bool,
    last_accessed: u32,
}

#[derive(Debug, Default)]
pub struct SwapStore {
    pages: HashMap<(i32, i32), SwappedPage>,
}

impl SwapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Records the evicted page's dirty/last-accessed state, keyed by
    /// `(pid, vpn)`.
    pub fn swap_out(&mut self, stats: &mut Stats, pid: i32, vpn: i32, pte: &PageTableEntry) {
        self.pages.insert(
            (pid, vpn),
            SwappedPage {
                dirty: pte.dirty,
                last_accessed: pte.last_accessed,
            },
        );
        stats.total_swaps_out += 1;
    }

    /// Restores `dirty`/`last_accessed` into `pte` and removes the record.
    /// Fails with `NotSwapped` if the page was never recorded.
    pub fn swap_in(&mut self, stats: &mut Stats, pid: i32, vpn: i32, pte: &mut PageTableEntry) -> Result<()> {
        let swapped = self
            .pages
            .remove(&(pid, vpn))
            .ok_or(OssimError::NotSwapped { pid, vpn })?;
        pte.dirty = swapped.dirty;
        pte.last_accessed = swapped.last_accessed;
        stats.total_swaps_in += 1;
        Ok(())
    }

    pub fn contains(&self, pid: i32, vpn: i32) -> bool {
        self.pages.contains_key(&(pid, vpn))
    }
}
