//! Wire message format (spec.md §6, SPEC_FULL.md §6).
//!
//! No `msg.h` survived the original source's filtering, so the exact field
//! layout is reconstructed from how `original_source/queue.c` and
//! `ossim.c` use it: a fixed-size `msg_t` sent whole with `write`/
//! `receive_msg`, `pid`, `request`, `time_ms`, and a `page_info_t` of a
//! count plus an array of signed VPNs (negative means "this access is a
//! write", per `ossim.c`'s `if (vfn < 0) is_dirty = 1`). This is encoded by
//! hand into native-endian bytes rather than a `bincode`-over-`serde`
//! format — see SPEC_FULL.md §6 for why.

use crate::config::MAX_REQUESTED_PAGES;
use crate::error::{OssimError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RequestKind {
    Run = 0,
    Block = 1,
    Done = 2,
    Ack = 3,
}

impl RequestKind {
    fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(RequestKind::Run),
            1 => Ok(RequestKind::Block),
            2 => Ok(RequestKind::Done),
            3 => Ok(RequestKind::Ack),
            other => Err(OssimError::InvalidArg(format!("unknown request kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Message {
    pub pid: i32,
    pub request: RequestKind,
    pub time_ms: u32,
    pub page_count: u32,
    pub pages: [i32; MAX_REQUESTED_PAGES],
}

impl Message {
    pub const WIRE_SIZE: usize = 4 + 4 + 4 + 4 + MAX_REQUESTED_PAGES * 4;

    pub fn ack(pid: i32, time_ms: u32) -> Self {
        Self {
            pid,
            request: RequestKind::Ack,
            time_ms,
            page_count: 0,
            pages: [0; MAX_REQUESTED_PAGES],
        }
    }

    pub fn done(pid: i32, time_ms: u32) -> Self {
        Self {
            pid,
            request: RequestKind::Done,
            time_ms,
            page_count: 0,
            pages: [0; MAX_REQUESTED_PAGES],
        }
    }

    /// The VPNs this message actually carries, honoring `page_count` even
    /// though `pages` is a fixed-size array padded with zeroes.
    pub fn requested_pages(&self) -> &[i32] {
        let n = (self.page_count as usize).min(self.pages.len());
        &self.pages[..n]
    }

    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        let mut off = 0;

        buf[off..off + 4].copy_from_slice(&self.pid.to_ne_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&(self.request as u32).to_ne_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.time_ms.to_ne_bytes());
        off += 4;
        buf[off..off + 4].copy_from_slice(&self.page_count.to_ne_bytes());
        off += 4;
        for vpn in self.pages.iter() {
            buf[off..off + 4].copy_from_slice(&vpn.to_ne_bytes());
            off += 4;
        }
        debug_assert_eq!(off, Self::WIRE_SIZE);
        buf
    }

    pub fn decode(buf: &[u8; Self::WIRE_SIZE]) -> Result<Self> {
        let mut off = 0;
        let mut next = || {
            let bytes: [u8; 4] = buf[off..off + 4].try_into().unwrap();
            off += 4;
            bytes
        };

        let pid = i32::from_ne_bytes(next());
        let request = RequestKind::from_u32(u32::from_ne_bytes(next()))?;
        let time_ms = u32::from_ne_bytes(next());
        let page_count = u32::from_ne_bytes(next());

        let mut pages = [0i32; MAX_REQUESTED_PAGES];
        for slot in pages.iter_mut() {
            *slot = i32::from_ne_bytes(next());
        }

        if page_count as usize > MAX_REQUESTED_PAGES {
            return Err(OssimError::InvalidArg(format!(
                "page_count {page_count} exceeds MAX_REQUESTED_PAGES {MAX_REQUESTED_PAGES}"
            )));
        }

        Ok(Self {
            pid,
            request,
            time_ms,
            page_count,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire_buffer() {
        let mut pages = [0i32; MAX_REQUESTED_PAGES];
        pages[0] = 3;
        pages[1] = -7;
        let msg = Message {
            pid: 42,
            request: RequestKind::Run,
            time_ms: 1500,
            page_count: 2,
            pages,
        };

        let encoded = msg.encode();
        assert_eq!(encoded.len(), Message::WIRE_SIZE);
        let decoded = Message::decode(&encoded).unwrap();

        assert_eq!(decoded.pid, 42);
        assert_eq!(decoded.request, RequestKind::Run);
        assert_eq!(decoded.time_ms, 1500);
        assert_eq!(decoded.requested_pages(), &[3, -7]);
    }

    #[test]
    fn rejects_an_oversized_page_count() {
        let msg = Message {
            pid: 1,
            request: RequestKind::Run,
            time_ms: 0,
            page_count: (MAX_REQUESTED_PAGES + 1) as u32,
            pages: [0; MAX_REQUESTED_PAGES],
        };
        let err = Message::decode(&msg.encode()).unwrap_err();
        assert!(matches!(err, OssimError::InvalidArg(_)));
    }

    #[test]
    fn rejects_an_unknown_request_kind() {
        let mut buf = [0u8; Message::WIRE_SIZE];
        buf[4..8].copy_from_slice(&99u32.to_ne_bytes());
        assert!(Message::decode(&buf).is_err());
    }
}
