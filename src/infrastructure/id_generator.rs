// Document ID Generator - Snowflake-like IDs rendered as fixed-width hex strings
// Layout mirrors the hosted backend's 20-character unique ids

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// 80-bit ID layout: [timestamp_ms:48][node:16][sequence:16]
/// Encoded as 20 lowercase hex characters, so lexical order follows creation order.
#[derive(Debug)]
pub struct DocumentIdGenerator {
    node_id: u16,
    state: Mutex<(u64, u64)>,
    issued: AtomicU64,
}

impl DocumentIdGenerator {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            state: Mutex::new((0, 0)),
            issued: AtomicU64::new(0),
        }
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Generate the next unique id
    pub fn next_id(&self) -> String {
        let (timestamp, sequence) = {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let now = Self::now_millis();
            let (last_ts, last_seq) = *state;

            // Clock going backwards or sequence overflow borrows from the next millisecond
            let next = if now > last_ts {
                (now, 0)
            } else if last_seq < 0xFFFF {
                (last_ts, last_seq + 1)
            } else {
                (last_ts + 1, 0)
            };
            *state = next;
            next
        };
        self.issued.fetch_add(1, Ordering::Relaxed);

        format!(
            "{:012x}{:04x}{:04x}",
            timestamp & 0xFFFF_FFFF_FFFF,
            self.node_id,
            sequence & 0xFFFF
        )
    }

    /// Extract the millisecond timestamp from an id produced by this generator
    pub fn extract_timestamp(id: &str) -> Option<u64> {
        id.get(0..12).and_then(|ts| u64::from_str_radix(ts, 16).ok())
    }

    pub fn extract_node_id(id: &str) -> Option<u16> {
        id.get(12..16).and_then(|node| u16::from_str_radix(node, 16).ok())
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

impl Default for DocumentIdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
