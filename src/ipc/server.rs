//! Non-blocking UNIX-socket front end (spec.md §4.7, C7).
//!
//! Grounded on `original_source/queue.c`'s `setup_server_socket`,
//! `check_new_commands` and `check_blocked_queue`. The accept loop and the
//! two queue polls are kept as three separate steps, called from
//! `tick.rs` in the same order the original main loop calls them — twice
//! per tick, once before and once after the simulated work, per spec.md §5.

use crate::config::Config;
use crate::error::{OssimError, Result};
use crate::ipc::protocol::{Message, RequestKind};
use crate::pcb::{Pcb, ProcessTable, TaskStatus};
use crate::queue::PcbQueue;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};

pub struct IpcServer {
    listener: UnixListener,
    next_pid: i32,
    socket_path: String,
}

impl IpcServer {
    pub fn bind(config: &Config) -> Result<Self> {
        let _ = std::fs::remove_file(&config.socket_path);
        let listener = UnixListener::bind(&config.socket_path)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            next_pid: 0,
            socket_path: config.socket_path.clone(),
        })
    }

    /// Accepts every client currently waiting and enqueues a fresh PCB
    /// onto `command_queue` for each, per `check_new_commands`'s accept
    /// loop. The pid assigned at this point is provisional; it is
    /// overwritten by the client's own pid on its first `RUN` message,
    /// matching `queue.c`'s `current_pcb->pid = msg.pid`.
    pub fn accept_new(
        &mut self,
        process_table: &mut ProcessTable,
        command_queue: &mut PcbQueue,
        page_table_capacity: usize,
    ) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(true)?;
                    self.next_pid += 1;
                    let pid = self.next_pid;
                    tracing::debug!(pid, "accepted new client");
                    process_table.insert(Pcb::new(pid, stream, page_table_capacity));
                    command_queue.enqueue(pid);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(OssimError::IoSetup(e)),
            }
        }
        Ok(())
    }

    /// Walks every PCB currently in `command_queue`, reading at most one
    /// message from each. `RUN` moves the PCB to `ready_queue`, `BLOCK`
    /// moves it to `blocked_queue`; both are ACKed under the pid the PCB
    /// ends up keyed under (overwritten by the client's own declared pid,
    /// per spec.md §4.7(b)). A closed channel or malformed message closes
    /// that PCB and continues on to the rest of the queue rather than
    /// failing the whole poll. Mirrors `check_new_commands`'s message scan.
    pub fn poll_command_queue(
        &mut self,
        process_table: &mut ProcessTable,
        command_queue: &mut PcbQueue,
        ready_queue: &mut PcbQueue,
        blocked_queue: &mut PcbQueue,
        now_ms: u32,
    ) -> Result<()> {
        let pids: Vec<i32> = command_queue.iter().collect();

        for connection_pid in pids {
            let Some(pcb) = process_table.get_mut(connection_pid) else { continue };

            let msg = match recv_message(&mut pcb.channel) {
                Ok(Some(msg)) => msg,
                Ok(None) => continue,
                Err(e) => {
                    pcb.status = TaskStatus::Terminated;
                    tracing::info!(pid = connection_pid, error = %e, "client channel closed, releasing pcb");
                    command_queue.remove(connection_pid);
                    process_table.remove(connection_pid);
                    continue;
                }
            };

            let pid = if msg.pid != connection_pid {
                tracing::debug!(connection_pid, declared_pid = msg.pid, "overwriting pcb pid with client-declared pid");
                process_table.rekey(connection_pid, msg.pid);
                msg.pid
            } else {
                connection_pid
            };

            let Some(pcb) = process_table.get_mut(pid) else { continue };

            match msg.request {
                RequestKind::Run => {
                    pcb.time_ms = msg.time_ms;
                    pcb.elapsed_ms = 0;
                    pcb.status = TaskStatus::Running;
                    pcb.requested_pages = msg.requested_pages().to_vec();
                    command_queue.remove(connection_pid);
                    ready_queue.enqueue(pid);
                    tracing::debug!(pid, time_ms = msg.time_ms, "process requested RUN");
                    send_ack(pcb, now_ms)?;
                }
                RequestKind::Block => {
                    pcb.time_ms = msg.time_ms;
                    pcb.status = TaskStatus::Blocked;
                    command_queue.remove(connection_pid);
                    blocked_queue.enqueue(pid);
                    tracing::debug!(pid, time_ms = msg.time_ms, "process requested BLOCK");
                    send_ack(pcb, now_ms)?;
                }
                RequestKind::Done | RequestKind::Ack => {
                    tracing::warn!(pid, "unexpected message in COMMAND state");
                }
            }
        }
        Ok(())
    }

    /// Decrements every blocked PCB's remaining time by one tick; once it
    /// hits zero, sends `DONE` and moves the PCB back to `command_queue`.
    /// Mirrors `check_blocked_queue`.
    pub fn poll_blocked_queue(
        &mut self,
        process_table: &mut ProcessTable,
        blocked_queue: &mut PcbQueue,
        command_queue: &mut PcbQueue,
        now_ms: u32,
        ticks_ms: u32,
    ) -> Result<()> {
        let pids: Vec<i32> = blocked_queue.iter().collect();

        for pid in pids {
            let Some(pcb) = process_table.get_mut(pid) else { continue };

            if pcb.last_update_ms < now_ms {
                pcb.time_ms = pcb.time_ms.saturating_sub(ticks_ms);
                pcb.last_update_ms = now_ms;
            }

            if pcb.time_ms == 0 {
                pcb.status = TaskStatus::Command;
                blocked_queue.remove(pid);
                command_queue.enqueue(pid);
                tracing::debug!(pid, "process finished BLOCK, sending DONE");
                let msg = Message::done(pid, now_ms);
                write_message(&mut pcb.channel, &msg)?;
            }
        }
        Ok(())
    }

    pub fn shutdown(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

fn send_ack(pcb: &mut Pcb, now_ms: u32) -> Result<()> {
    let ack = Message::ack(pcb.pid, now_ms);
    write_message(&mut pcb.channel, &ack)
}

fn write_message(stream: &mut UnixStream, msg: &Message) -> Result<()> {
    let buf = msg.encode();
    match stream.write_all(&buf) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(error = %e, "short or failed write to client");
            Ok(())
        }
    }
}

/// Reads one full `Message` from `stream`, busy-looping across partial
/// reads exactly as `original_source/queue.c`'s `receive_msg` does.
/// Returns `Ok(None)` if no bytes are available yet, and `Err(PeerClosed)`
/// if the peer has hung up.
fn recv_message(stream: &mut UnixStream) -> Result<Option<Message>> {
    let mut buf = [0u8; Message::WIRE_SIZE];
    let mut off = 0;

    loop {
        match stream.read(&mut buf[off..]) {
            Ok(0) => return Err(OssimError::PeerClosed),
            Ok(n) => {
                off += n;
                if off == buf.len() {
                    return Ok(Some(Message::decode(&buf)?));
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if off == 0 {
                    return Ok(None);
                }
                continue;
            }
            Err(e) => return Err(OssimError::IoSetup(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn accept_enqueues_a_pcb_per_client() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("ossim.sock");
        let config = Config {
            socket_path: socket_path.to_str().unwrap().to_string(),
            ..Config::default()
        };
        let mut server = IpcServer::bind(&config).unwrap();

        let _client = UnixStream::connect(&socket_path).unwrap();
        // give the kernel a moment to complete the handshake
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut processes = ProcessTable::new();
        let mut command_queue = PcbQueue::new();
        server.accept_new(&mut processes, &mut command_queue, 8).unwrap();

        assert_eq!(command_queue.len(), 1);
        assert_eq!(processes.len(), 1);
    }

    #[test]
    fn run_message_moves_pcb_from_command_to_ready_and_acks() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("ossim.sock");
        let config = Config {
            socket_path: socket_path.to_str().unwrap().to_string(),
            ..Config::default()
        };
        let mut server = IpcServer::bind(&config).unwrap();

        let mut client = UnixStream::connect(&socket_path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut processes = ProcessTable::new();
        let mut command_queue = PcbQueue::new();
        let mut ready_queue = PcbQueue::new();
        let mut blocked_queue = PcbQueue::new();
        server.accept_new(&mut processes, &mut command_queue, 8).unwrap();
        let pid = command_queue.iter().next().unwrap();

        let run_msg = Message {
            pid,
            request: RequestKind::Run,
            time_ms: 2000,
            page_count: 0,
            pages: [0; crate::config::MAX_REQUESTED_PAGES],
        };
        client.write_all(&run_msg.encode()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        server
            .poll_command_queue(&mut processes, &mut command_queue, &mut ready_queue, &mut blocked_queue, 0)
            .unwrap();

        assert!(command_queue.is_empty());
        assert_eq!(ready_queue.len(), 1);
        assert_eq!(processes.get(pid).unwrap().status, TaskStatus::Running);

        let mut ack_buf = [0u8; Message::WIRE_SIZE];
        client.read_exact(&mut ack_buf).unwrap();
        let ack = Message::decode(&ack_buf).unwrap();
        assert_eq!(ack.request, RequestKind::Ack);
    }

    #[test]
    fn run_message_with_declared_pid_rekeys_the_pcb() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("ossim.sock");
        let config = Config {
            socket_path: socket_path.to_str().unwrap().to_string(),
            ..Config::default()
        };
        let mut server = IpcServer::bind(&config).unwrap();

        let mut client = UnixStream::connect(&socket_path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut processes = ProcessTable::new();
        let mut command_queue = PcbQueue::new();
        let mut ready_queue = PcbQueue::new();
        let mut blocked_queue = PcbQueue::new();
        server.accept_new(&mut processes, &mut command_queue, 8).unwrap();
        let connection_pid = command_queue.iter().next().unwrap();
        let declared_pid = connection_pid + 1000;

        let run_msg = Message {
            pid: declared_pid,
            request: RequestKind::Run,
            time_ms: 2000,
            page_count: 0,
            pages: [0; crate::config::MAX_REQUESTED_PAGES],
        };
        client.write_all(&run_msg.encode()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        server
            .poll_command_queue(&mut processes, &mut command_queue, &mut ready_queue, &mut blocked_queue, 0)
            .unwrap();

        assert!(processes.get(connection_pid).is_none());
        assert_eq!(processes.get(declared_pid).unwrap().status, TaskStatus::Running);
        assert!(ready_queue.iter().any(|p| p == declared_pid));

        let mut ack_buf = [0u8; Message::WIRE_SIZE];
        client.read_exact(&mut ack_buf).unwrap();
        let ack = Message::decode(&ack_buf).unwrap();
        assert_eq!(ack.pid, declared_pid);
    }

    #[test]
    fn disconnected_client_is_released_without_failing_the_poll() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("ossim.sock");
        let config = Config {
            socket_path: socket_path.to_str().unwrap().to_string(),
            ..Config::default()
        };
        let mut server = IpcServer::bind(&config).unwrap();

        let client_a = UnixStream::connect(&socket_path).unwrap();
        let mut client_b = UnixStream::connect(&socket_path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let mut processes = ProcessTable::new();
        let mut command_queue = PcbQueue::new();
        let mut ready_queue = PcbQueue::new();
        let mut blocked_queue = PcbQueue::new();
        server.accept_new(&mut processes, &mut command_queue, 8).unwrap();
        assert_eq!(command_queue.len(), 2);
        let pids: Vec<i32> = command_queue.iter().collect();

        drop(client_a);

        let run_msg = Message {
            pid: pids[1],
            request: RequestKind::Run,
            time_ms: 2000,
            page_count: 0,
            pages: [0; crate::config::MAX_REQUESTED_PAGES],
        };
        client_b.write_all(&run_msg.encode()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        server
            .poll_command_queue(&mut processes, &mut command_queue, &mut ready_queue, &mut blocked_queue, 0)
            .unwrap();

        assert_eq!(processes.len(), 1);
        assert_eq!(ready_queue.len(), 1);
        assert!(command_queue.is_empty());
    }
}
