//! The three scheduling queues (spec.md §4.6, C6): COMMAND, READY, BLOCKED.
//!
//! Grounded on `original_source/queue.c`'s `enqueue_pcb`/`dequeue_pcb`/
//! `remove_queue_elem`, translated from an intrusive linked list to a plain
//! `VecDeque` of pid handles, per spec.md §9 ("Replace intrusive linked
//! lists with a ring/deque of PCB handles"). Enqueue/dequeue are O(1);
//! `remove` is an O(n) scan, which spec.md accepts as fine at this scale.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct PcbQueue {
    pids: VecDeque<i32>,
}

impl PcbQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, pid: i32) {
        self.pids.push_back(pid);
    }

    pub fn dequeue(&mut self) -> Option<i32> {
        self.pids.pop_front()
    }

    /// Removes the first occurrence of `pid`, returning whether it was
    /// present. Used by the command/blocked polls when a PCB transitions
    /// elsewhere mid-scan.
    pub fn remove(&mut self, pid: i32) -> bool {
        if let Some(pos) = self.pids.iter().position(|&p| p == pid) {
            self.pids.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.pids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }
}
