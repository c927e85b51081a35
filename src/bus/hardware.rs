//! Hardware-timed bus port: driven by a pulse-generating/capturing
//! peripheral (e.g. the ESP32 RMT block, or a capture/compare timer
//! channel) instead of busy-waited GPIO polling.
//!
//! The peripheral itself is abstracted behind [`PulseChannel`] so this
//! module stays free of any specific MCU's register layout, the same
//! boundary the software-timed port draws around `embedded-hal`.

use crate::bus::ring::SampleConsumer;
use crate::bus::state::{Event, PortState};
use crate::bus::{BusPort, PortRole, ReceiveOutcome};
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::error::BusError;
use crate::frame::Frame;
use crate::manchester::{self, Pulse, FRAME_HALF_BITS};
use crate::stats::Stats;

/// A peripheral capable of emitting a pre-built run-length pulse train
/// and of notifying the caller (via whatever interrupt wiring the
/// board-support crate provides) when transmission completes.
///
/// Reception does not go through this trait directly: edges arrive via
/// the [`crate::bus::ring::SampleRing`] ISR handoff, and this port
/// drains a [`SampleConsumer`] instead. `PulseChannel` only covers the
/// TX direction, where the peripheral itself paces the output.
pub trait PulseChannel {
	/// Queues `pulses` for transmission and blocks until the peripheral
	/// reports completion.
	fn transmit(&mut self, pulses: &[Pulse]);
}

/// A hardware-timed port: TX goes through a [`PulseChannel`], RX comes
/// from edges an interrupt handler pushed into a
/// [`crate::bus::ring::SampleRing`].
pub struct HardwareTimedPort<'a, P, C, const N: usize> {
	role: PortRole,
	channel: P,
	consumer: SampleConsumer<N>,
	clock: &'a C,
	state: PortState,
	stats: Stats,
	post_tx_delay_ms: u32,
}

impl<'a, P, C, const N: usize> HardwareTimedPort<'a, P, C, N>
where
	P: PulseChannel,
	C: Clock,
{
	pub fn new(role: PortRole, channel: P, consumer: SampleConsumer<N>, clock: &'a C) -> Self {
		let post_tx_delay_ms = match role {
			PortRole::Master => crate::config::POST_TX_DELAY_MASTER_MS,
			PortRole::Slave => crate::config::POST_TX_DELAY_SLAVE_MS,
		};
		HardwareTimedPort {
			role,
			channel,
			consumer,
			clock,
			state: PortState::Idle,
			stats: Stats::new(),
			post_tx_delay_ms,
		}
	}

	pub fn with_config(mut self, config: &GatewayConfig) -> Self {
		self.post_tx_delay_ms = match self.role {
			PortRole::Master => config.post_tx_delay_master_ms,
			PortRole::Slave => config.post_tx_delay_slave_ms,
		};
		self
	}
}

impl<'a, P, C, const N: usize> BusPort for HardwareTimedPort<'a, P, C, N>
where
	P: PulseChannel,
	C: Clock,
{
	fn role(&self) -> PortRole {
		self.role
	}

	fn send_frame(&mut self, frame: Frame) -> Result<(), BusError> {
		if !self.state.is_idle() {
			self.stats.record_error();
			return Err(BusError::BusBusy);
		}
		self.state = self.state.apply(Event::SendRequested);
		debug!("hardware port: sending frame {:#010x}", frame.raw());

		let pulses = manchester::encode(frame);
		self.channel.transmit(&pulses);
		self.stats.record_tx();

		self.state = self.state.apply(Event::TxComplete);
		let deadline = self.clock.now_ms() + self.post_tx_delay_ms as u64;
		while self.clock.now_ms() < deadline {
			// The caller's clock is expected to be driven by the same
			// mechanism advancing wall-clock time (an RTOS tick, or the
			// host scheduler in tests); there is nothing productive to
			// do here beyond waiting out the gap.
		}
		self.state = self.state.apply(Event::PostTxDelayElapsed);
		Ok(())
	}

	fn receive_frame(&mut self, deadline_ms: u32) -> ReceiveOutcome {
		// First RxEdge: Idle -> RxWaitStart (listening for a start bit).
		self.state = self.state.apply(Event::RxEdge);
		let start_ms = self.clock.now_ms();
		let mut pulses: heapless::Vec<Pulse, { FRAME_HALF_BITS + 8 }> = heapless::Vec::new();
		let mut start_bit_seen = false;

		loop {
			self.consumer.drain_into_pulses(&mut pulses);
			if !start_bit_seen && !pulses.is_empty() {
				// Second RxEdge: RxWaitStart -> RxReceiving, now that the
				// start bit has actually been seen.
				self.state = self.state.apply(Event::RxEdge);
				start_bit_seen = true;
			}
			if pulses.len() >= FRAME_HALF_BITS {
				break;
			}
			if self.clock.now_ms().saturating_sub(start_ms) > deadline_ms as u64 {
				self.stats.record_timeout();
				self.state = PortState::Idle;
				return ReceiveOutcome::Timeout;
			}
		}

		match manchester::decode(&pulses) {
			Ok(frame) => {
				self.state = self.state.apply(Event::FrameComplete).apply(Event::Decoded);
				self.stats.record_rx();
				ReceiveOutcome::Frame(frame)
			}
			Err(err) => {
				self.state = self
					.state
					.apply(Event::MalformedTransition)
					.apply(Event::Decoded);
				self.stats.record_error();
				warn!("hardware port: decode failed: {err}");
				ReceiveOutcome::Invalid(err)
			}
		}
	}

	fn stats(&self) -> &Stats {
		&self.stats
	}
}
