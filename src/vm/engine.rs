//! Demand paging engine (spec.md §4.5, C5).
//!
//! Ties the page table, frame table, swap store and the active eviction
//! policy together into the two operations `original_source/virtmem.c`
//! exposes to the scheduler: `request_page` and the threshold-driven
//! `page_eviction` pass. `total_page_accesses` is deliberately not touched
//! here — it is bumped once per access in `tick.rs`, the single call site,
//! so a retried or internally-looped request never double counts it.

use crate::error::{OssimError, Result};
use crate::pcb::ProcessTable;
use crate::stats::Stats;
use crate::vm::eviction::{EvictionPolicy, EvictionPolicyKind};
use crate::vm::frame_table::{FrameId, FrameTable};
use crate::vm::swap::SwapStore;

pub struct VmEngine {
    policy: Box<dyn EvictionPolicy>,
}

impl VmEngine {
    pub fn new(kind: EvictionPolicyKind) -> Self {
        Self { policy: kind.build() }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Services one page reference. A present page is a hit: refresh its
    /// access bits and return. An absent page faults: if no frame is free
    /// this fails with `NoFrame` — the caller is responsible for running
    /// an eviction pass ahead of the request, not this function recovering
    /// inline — otherwise the faulting page is mapped into the free frame,
    /// restoring its dirty/last-accessed state from swap if it was evicted
    /// before.
    pub fn page_request(
        &mut self,
        frame_table: &mut FrameTable,
        swap: &mut SwapStore,
        processes: &mut ProcessTable,
        stats: &mut Stats,
        now_ms: u32,
        pid: i32,
        vpn: i32,
    ) -> Result<()> {
        let capacity = processes
            .get(pid)
            .map(|pcb| pcb.page_table.capacity())
            .ok_or(OssimError::LookupOutOfRange { vpn, capacity: 0 })?;

        if processes.pte(pid, vpn).is_none() {
            return Err(OssimError::LookupOutOfRange { vpn, capacity });
        }

        if processes.pte(pid, vpn).map(|pte| pte.present).unwrap_or(false) {
            let pte = processes.pte_mut(pid, vpn).unwrap();
            pte.referenced = true;
            pte.last_accessed = now_ms;
            return Ok(());
        }

        stats.total_page_faults += 1;

        let frame_id = frame_table.pop_free().ok_or(OssimError::NoFrame)?;
        frame_table.descriptor_mut(frame_id).owner = Some((pid, vpn));

        let pte = processes.pte_mut(pid, vpn).expect("validated above");
        if swap.contains(pid, vpn) {
            swap.swap_in(stats, pid, vpn, pte)?;
        } else {
            pte.dirty = false;
        }
        pte.frame_id = Some(frame_id);
        pte.present = true;
        pte.referenced = true;
        pte.last_accessed = now_ms;

        frame_table.push_eviction(frame_id);
        Ok(())
    }

    /// Reclaims frames with the active policy until `free_count` reaches
    /// `threshold`. Runs before each tick's page requests, per spec.md §4.5.
    pub fn run_eviction_pass(
        &mut self,
        frame_table: &mut FrameTable,
        swap: &mut SwapStore,
        processes: &mut ProcessTable,
        stats: &mut Stats,
        threshold: usize,
    ) -> Result<()> {
        while frame_table.free_count() < threshold {
            match self.evict_one(frame_table, swap, processes, stats) {
                Ok(_) => continue,
                Err(OssimError::NoVictim) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn evict_one(
        &mut self,
        frame_table: &mut FrameTable,
        swap: &mut SwapStore,
        processes: &mut ProcessTable,
        stats: &mut Stats,
    ) -> Result<FrameId> {
        let victim = self
            .policy
            .select_victim(frame_table, processes)
            .ok_or(OssimError::NoVictim)?;

        let (pid, vpn) = frame_table
            .descriptor_mut(victim)
            .owner
            .take()
            .expect("select_victim only returns occupied frames");

        let pte = processes.pte_mut(pid, vpn).ok_or(OssimError::NotSwapped { pid, vpn })?;
        swap.swap_out(stats, pid, vpn, pte);
        pte.present = false;
        pte.referenced = false;
        pte.frame_id = None;

        frame_table.push_free(victim);
        Ok(victim)
    }
}
