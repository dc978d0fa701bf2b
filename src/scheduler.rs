//! Round-robin CPU scheduler (spec.md §4.8, C8).
//!
//! A line-for-line port of `original_source/scheduler.c`'s `scheduler`:
//! age the running task by one tick, send `DONE` and retire it to the
//! command queue if its burst is over, otherwise preempt it back onto the
//! ready queue once its time slice has elapsed, then pull the next task
//! off the ready queue if the CPU is idle.

use crate::config::TIME_SLICE_MS;
use crate::error::Result;
use crate::ipc::protocol::Message;
use crate::pcb::{ProcessTable, TaskStatus};
use crate::queue::PcbQueue;
use std::io::Write;

/// Whether the CPU slot changed this tick — the scheduler's caller uses
/// this to decide whether to run the newly-scheduled task's page
/// requests, matching `scheduler()`'s `return 1` vs falling off the end.
#[derive(Debug, PartialEq, Eq)]
pub enum SchedulerOutcome {
    Unchanged,
    Scheduled,
}

pub struct Scheduler {
    cpu: Option<i32>,
    ticks_ms: u32,
}

impl Scheduler {
    pub fn new(ticks_ms: u32) -> Self {
        Self { cpu: None, ticks_ms }
    }

    pub fn cpu(&self) -> Option<i32> {
        self.cpu
    }

    pub fn tick(
        &mut self,
        now_ms: u32,
        ready_queue: &mut PcbQueue,
        command_queue: &mut PcbQueue,
        processes: &mut ProcessTable,
    ) -> Result<SchedulerOutcome> {
        if let Some(pid) = self.cpu {
            let retire = {
                let pcb = processes.get_mut(pid).expect("CPU pid must have a live PCB");
                pcb.elapsed_ms += self.ticks_ms;
                pcb.elapsed_ms >= pcb.time_ms
            };

            if retire {
                let pcb = processes.get_mut(pid).unwrap();
                pcb.status = TaskStatus::Command;
                let msg = Message::done(pid, now_ms);
                let _ = pcb.channel.write_all(&msg.encode());
                command_queue.enqueue(pid);
                self.cpu = None;
            } else {
                let pcb = processes.get(pid).unwrap();
                if now_ms.wrapping_sub(pcb.slice_start_ms) >= TIME_SLICE_MS {
                    let pcb = processes.get_mut(pid).unwrap();
                    pcb.slice_start_ms = 0;
                    ready_queue.enqueue(pid);
                    self.cpu = None;
                }
            }
        }

        if self.cpu.is_none() {
            if let Some(pid) = ready_queue.dequeue() {
                if let Some(pcb) = processes.get_mut(pid) {
                    pcb.slice_start_ms = now_ms;
                    pcb.status = TaskStatus::Running;
                }
                self.cpu = Some(pid);
                return Ok(SchedulerOutcome::Scheduled);
            }
        }

        Ok(SchedulerOutcome::Unchanged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Pcb;
    use std::os::unix::net::UnixStream;

    fn process(processes: &mut ProcessTable, pid: i32, time_ms: u32) {
        let (a, _b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        let mut pcb = Pcb::new(pid, a, 8);
        pcb.time_ms = time_ms;
        processes.insert(pcb);
    }

    #[test]
    fn idle_cpu_picks_up_the_next_ready_task() {
        let mut scheduler = Scheduler::new(100);
        let mut ready = PcbQueue::new();
        let mut command = PcbQueue::new();
        let mut processes = ProcessTable::new();
        process(&mut processes, 1, 1000);
        ready.enqueue(1);

        let outcome = scheduler.tick(0, &mut ready, &mut command, &mut processes).unwrap();
        assert_eq!(outcome, SchedulerOutcome::Scheduled);
        assert_eq!(scheduler.cpu(), Some(1));
    }

    #[test]
    fn preempts_after_the_time_slice_expires() {
        let mut scheduler = Scheduler::new(100);
        let mut ready = PcbQueue::new();
        let mut command = PcbQueue::new();
        let mut processes = ProcessTable::new();
        process(&mut processes, 1, 10_000);
        ready.enqueue(1);
        scheduler.tick(0, &mut ready, &mut command, &mut processes).unwrap();

        let outcome = scheduler.tick(600, &mut ready, &mut command, &mut processes).unwrap();
        assert_eq!(scheduler.cpu(), None);
        assert_eq!(ready.len(), 1);
        assert_eq!(outcome, SchedulerOutcome::Unchanged);
    }

    #[test]
    fn retires_a_finished_task_to_the_command_queue() {
        let mut scheduler = Scheduler::new(100);
        let mut ready = PcbQueue::new();
        let mut command = PcbQueue::new();
        let mut processes = ProcessTable::new();
        process(&mut processes, 1, 100);
        ready.enqueue(1);
        scheduler.tick(0, &mut ready, &mut command, &mut processes).unwrap();

        scheduler.tick(100, &mut ready, &mut command, &mut processes).unwrap();
        assert_eq!(scheduler.cpu(), None);
        assert_eq!(command.len(), 1);
        assert_eq!(processes.get(1).unwrap().status, TaskStatus::Command);
    }
}
