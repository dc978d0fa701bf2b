//! The main simulation loop (spec.md §4.9, C9).
//!
//! Grounded on `original_source/ossim.c`'s `main`: each tick polls for new
//! connections and queue transitions twice (once before the scheduler
//! runs, once after — the original's comment is literally "check again"),
//! then lets the scheduler pick a task and drives that task's page
//! requests one at a time, running an eviction pass ahead of every single
//! request rather than once per tick. Signal handling mirrors
//! `handle_signal`/`keep_running`, translated to a static `AtomicBool`
//! since Rust has no direct equivalent of `volatile sig_atomic_t` statics
//! initialized from a signal handler registered this way.

use crate::config::{Config, TICKS_MS};
use crate::error::Result;
use crate::ipc::IpcServer;
use crate::pcb::ProcessTable;
use crate::queue::PcbQueue;
use crate::scheduler::{Scheduler, SchedulerOutcome};
use crate::stats::Stats;
use crate::vm::{FrameTable, SwapStore, VmEngine};
use std::sync::atomic::{AtomicBool, Ordering};

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_signal(sig: libc::c_int) {
    tracing::info!(signal = sig, "caught signal, stopping scheduler");
    KEEP_RUNNING.store(false, Ordering::SeqCst);
}

/// Installs `SIGINT`/`SIGTERM` handlers that flip `KEEP_RUNNING` to false.
/// Safe to call once at startup; `libc::signal` itself is the only unsafe
/// part, matching `original_source/ossim.c`'s registration.
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, handle_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as libc::sighandler_t);
    }
}

pub fn keep_running() -> bool {
    KEEP_RUNNING.load(Ordering::SeqCst)
}

pub struct Simulation {
    config: Config,
    server: IpcServer,
    processes: ProcessTable,
    command_queue: PcbQueue,
    ready_queue: PcbQueue,
    blocked_queue: PcbQueue,
    frame_table: FrameTable,
    swap: SwapStore,
    engine: VmEngine,
    scheduler: Scheduler,
    stats: Stats,
    current_time_ms: u32,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self> {
        let server = IpcServer::bind(&config)?;
        let frame_table = FrameTable::create(config.frames);
        let engine = VmEngine::new(config.policy);
        let scheduler = Scheduler::new(TICKS_MS);

        Ok(Self {
            server,
            processes: ProcessTable::new(),
            command_queue: PcbQueue::new(),
            ready_queue: PcbQueue::new(),
            blocked_queue: PcbQueue::new(),
            frame_table,
            swap: SwapStore::new(),
            engine,
            scheduler,
            stats: Stats::new(),
            current_time_ms: 0,
            config,
        })
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn current_time_ms(&self) -> u32 {
        self.current_time_ms
    }

    pub fn policy_name(&self) -> &'static str {
        self.engine.policy_name()
    }

    /// Runs one 100ms tick: two IPC polls, a scheduler step, then that
    /// task's page requests for this tick (if a task is running).
    pub fn step(&mut self) -> Result<()> {
        self.poll_ipc()?;
        self.poll_ipc()?;

        let outcome = self.scheduler.tick(
            self.current_time_ms,
            &mut self.ready_queue,
            &mut self.command_queue,
            &mut self.processes,
        )?;

        if outcome == SchedulerOutcome::Scheduled {
            if let Some(pid) = self.scheduler.cpu() {
                self.service_requested_pages(pid);
            }
        }

        self.current_time_ms += TICKS_MS;
        Ok(())
    }

    fn poll_ipc(&mut self) -> Result<()> {
        self.server
            .accept_new(&mut self.processes, &mut self.command_queue, self.config.pages)?;
        self.server.poll_command_queue(
            &mut self.processes,
            &mut self.command_queue,
            &mut self.ready_queue,
            &mut self.blocked_queue,
            self.current_time_ms,
        )?;
        self.server.poll_blocked_queue(
            &mut self.processes,
            &mut self.blocked_queue,
            &mut self.command_queue,
            self.current_time_ms,
            TICKS_MS,
        )?;
        Ok(())
    }

    /// Negative VPNs mean "this access is a write"; normalized to the
    /// absolute VPN before reaching the page table, per
    /// `original_source/ossim.c`'s `if (vfn < 0) is_dirty = 1`.
    fn service_requested_pages(&mut self, pid: i32) {
        let requested = match self.processes.get(pid) {
            Some(pcb) => pcb.requested_pages.clone(),
            None => return,
        };

        for raw_vpn in requested {
            self.stats.total_page_accesses += 1;
            let dirty_write = raw_vpn < 0;
            let vpn = raw_vpn.unsigned_abs() as i32;

            if let Err(e) = self.engine.run_eviction_pass(
                &mut self.frame_table,
                &mut self.swap,
                &mut self.processes,
                &mut self.stats,
                self.config.threshold,
            ) {
                tracing::warn!(pid, error = %e, "eviction pass failed");
            }

            match self.engine.page_request(
                &mut self.frame_table,
                &mut self.swap,
                &mut self.processes,
                &mut self.stats,
                self.current_time_ms,
                pid,
                vpn,
            ) {
                Ok(()) => {
                    if dirty_write {
                        if let Some(pte) = self.processes.pte_mut(pid, vpn) {
                            pte.dirty = true;
                        }
                    }
                }
                Err(e) => tracing::warn!(pid, vpn, error = %e, "cannot service page request"),
            }
        }
    }

    /// Runs ticks until `keep_running()` returns false, sleeping between
    /// ticks as the original does with `usleep(TICKS_MS * 1000)`.
    pub fn run(&mut self) -> Result<()> {
        while keep_running() {
            self.step()?;
            if self.current_time_ms % 1000 == 0 {
                tracing::info!(seconds = self.current_time_ms / 1000, "tick");
            }
            std::thread::sleep(std::time::Duration::from_millis(TICKS_MS as u64));
        }
        self.server.shutdown();
        Ok(())
    }
}
