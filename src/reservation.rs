//! The LR/SC reservation table and per-hart reservation context.
//!
//! A small associative structure keyed by address; a linear scan
//! would also be faithful given typical working sets, but a hash map
//! reads more directly as "one record per address" and costs nothing
//! here.

use std::collections::HashMap;

/// Per-address LR reservation records. The marker recorded is the PC
/// of the LR that created the reservation.
#[derive(Debug, Default)]
pub struct ReservationTable {
    records: HashMap<u64, u64>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the reservation record for `address`.
    pub fn reserve(&mut self, address: u64, marker: u64) {
        self.records.insert(address, marker);
    }

    /// Remove any record for `address`, returning its prior marker.
    pub fn invalidate(&mut self, address: u64) -> Option<u64> {
        self.records.remove(&address)
    }
}

/// Per-hart context. Present to make a future multi-hart extension
/// straightforward; this core only ever instantiates `cur_hart = 0`.
#[derive(Debug, Default)]
pub struct HartContext {
    pub last_lr: Option<u64>,
}
