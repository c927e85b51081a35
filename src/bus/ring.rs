//! The interrupt-to-task handoff ring.
//!
//! The re-architecture guidance is explicit: the reference
//! implementation calls back into a C++ object from interrupt context
//! through a raw-pointer callback (`handleInterruptHelper`). That is
//! dynamic dispatch and (in the C++ original) arbitrary work running
//! with interrupts masked. Here, the ISR-context code is reduced to a
//! free function that timestamps one GPIO edge and pushes it into a
//! lock-free SPSC ring; all decoding happens later, on the port's own
//! task, which drains the ring.

use crate::manchester::{Level, Pulse};

/// One GPIO edge as captured from interrupt context: the wire
/// transitioned to `level` at `timestamp_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSample {
	pub level: Level,
	pub timestamp_us: u32,
}

/// A fixed-capacity SPSC ring of edge samples.
///
/// Must be placed in `'static` storage (a `static mut`, behind
/// `critical-section` or a board-support crate's preferred primitive)
/// before calling [`SampleRing::split`], since the producer half is
/// handed to interrupt context, which cannot be scoped to a stack
/// frame.
pub struct SampleRing<const N: usize> {
	queue: heapless::spsc::Queue<EdgeSample, N>,
}

impl<const N: usize> SampleRing<N> {
	pub const fn new() -> SampleRing<N> {
		SampleRing {
			queue: heapless::spsc::Queue::new(),
		}
	}

	/// Splits the ring into an interrupt-side producer and a task-side
	/// consumer. Call once, during platform wiring.
	pub fn split(&'static mut self) -> (SampleProducer<N>, SampleConsumer<N>) {
		let (producer, consumer) = self.queue.split();
		(SampleProducer(producer), SampleConsumer(consumer))
	}
}

impl<const N: usize> Default for SampleRing<N> {
	fn default() -> Self {
		SampleRing::new()
	}
}

/// The interrupt-context half. `push_edge` never allocates and never
/// blocks: it is a single lock-free enqueue, and a full ring simply
/// drops the sample (counted by the caller via the port's error
/// statistic, since a dropped edge manifests as a malformed or
/// truncated capture on the consumer side).
pub struct SampleProducer<const N: usize>(heapless::spsc::Producer<'static, EdgeSample, N>);

impl<const N: usize> SampleProducer<N> {
	/// Records one GPIO edge. Returns `false` if the ring was full.
	pub fn push_edge(&mut self, level: Level, timestamp_us: u32) -> bool {
		self.0.enqueue(EdgeSample { level, timestamp_us }).is_ok()
	}
}

/// The task-context half, owned by a [`crate::bus::BusPort`]
/// implementation.
pub struct SampleConsumer<const N: usize>(heapless::spsc::Consumer<'static, EdgeSample, N>);

impl<const N: usize> SampleConsumer<N> {
	/// Drains every queued edge and appends the run-length pulses they
	/// imply to `pulses` (the format [`crate::manchester::decode`]
	/// consumes). The very first drained edge only anchors the next
	/// duration and does not itself produce a pulse, since a run's
	/// duration is the gap between two edges.
	pub fn drain_into_pulses<const M: usize>(&mut self, pulses: &mut heapless::Vec<Pulse, M>) {
		let mut last: Option<EdgeSample> = None;
		while let Some(sample) = self.0.dequeue() {
			if let Some(prev) = last {
				let duration_us = sample.timestamp_us.wrapping_sub(prev.timestamp_us);
				if pulses
					.push(Pulse {
						level: prev.level,
						duration_us,
					})
					.is_err()
				{
					break;
				}
			}
			last = Some(sample);
		}
	}

	/// True if at least one edge is queued (used to detect "a start bit
	/// may be arriving" without draining).
	pub fn is_empty(&self) -> bool {
		self.0.ready() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	static mut RING: SampleRing<64> = SampleRing::new();

	#[test]
	fn drains_edges_into_run_length_pulses() {
		// SAFETY: the test has exclusive access to this static; no
		// interrupt context exists on the host test target.
		let (mut producer, mut consumer) = unsafe { RING.split() };

		producer.push_edge(Level::Low, 0);
		producer.push_edge(Level::High, 500);
		producer.push_edge(Level::Low, 1500);

		let mut pulses: heapless::Vec<Pulse, 8> = heapless::Vec::new();
		consumer.drain_into_pulses(&mut pulses);

		assert_eq!(pulses.len(), 2);
		assert_eq!(pulses[0].level, Level::Low);
		assert_eq!(pulses[0].duration_us, 500);
		assert_eq!(pulses[1].level, Level::High);
		assert_eq!(pulses[1].duration_us, 1000);
	}
}
