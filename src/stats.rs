//! Per-port traffic counters.
//!
//! Monotonic `u32` counters guarded only by atomic ops — no mutex is
//! needed since each counter is independently incremented and the
//! control plane only ever wants a consistent-enough snapshot, not a
//! transactional view across all four at once.

use core::sync::atomic::{AtomicU32, Ordering};

/// A point-in-time copy of a port's counters, safe to hand out to
/// callers outside the core (the control-plane `get_stats` API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
	pub tx_count: u32,
	pub rx_count: u32,
	pub error_count: u32,
	pub timeout_count: u32,
}

/// Live, atomically-updated counters for one [`crate::bus::BusPort`].
#[derive(Debug, Default)]
pub struct Stats {
	tx_count: AtomicU32,
	rx_count: AtomicU32,
	error_count: AtomicU32,
	timeout_count: AtomicU32,
}

impl Stats {
	pub const fn new() -> Stats {
		Stats {
			tx_count: AtomicU32::new(0),
			rx_count: AtomicU32::new(0),
			error_count: AtomicU32::new(0),
			timeout_count: AtomicU32::new(0),
		}
	}

	pub fn record_tx(&self) {
		self.tx_count.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_rx(&self) {
		self.rx_count.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_error(&self) {
		self.error_count.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_timeout(&self) {
		self.timeout_count.fetch_add(1, Ordering::Relaxed);
	}

	pub fn snapshot(&self) -> StatsSnapshot {
		StatsSnapshot {
			tx_count: self.tx_count.load(Ordering::Relaxed),
			rx_count: self.rx_count.load(Ordering::Relaxed),
			error_count: self.error_count.load(Ordering::Relaxed),
			timeout_count: self.timeout_count.load(Ordering::Relaxed),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counters_are_monotonic_and_independent() {
		let stats = Stats::new();
		stats.record_tx();
		stats.record_tx();
		stats.record_rx();
		stats.record_timeout();
		stats.record_timeout();
		stats.record_timeout();

		let snap = stats.snapshot();
		assert_eq!(snap.tx_count, 2);
		assert_eq!(snap.rx_count, 1);
		assert_eq!(snap.error_count, 0);
		assert_eq!(snap.timeout_count, 3);
	}
}
