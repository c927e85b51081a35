//! Bit-banged bus port: the fallback timing strategy for platforms with
//! no dedicated pulse peripheral.
//!
//! Transmission busy-waits on an [`embedded_hal::delay::DelayNs`]
//! implementation between GPIO writes; reception busy-polls an
//! [`embedded_hal::digital::InputPin`] and timestamps edges itself
//! using a caller-supplied [`crate::clock::Clock`] for the
//! millisecond-granularity deadlines and a microsecond counter for
//! half-bit timing. This mirrors the same "HAL trait, not a concrete
//! MCU register" boundary the platform's `NetworkInterface` abstraction
//! draws around its own hardware.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::bus::state::{Event, PortState};
use crate::bus::{BusPort, PortRole, ReceiveOutcome};
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::error::BusError;
use crate::frame::Frame;
use crate::manchester::{self, Level, Pulse, FRAME_HALF_BITS};
use crate::stats::Stats;

/// A microsecond tick source, kept separate from [`Clock`] because
/// half-bit timing needs microsecond resolution while the rest of the
/// gateway only ever reasons in milliseconds.
pub trait MicrosClock {
	fn now_us(&self) -> u32;
}

/// A bit-banged port built from raw `embedded-hal` 1.0 pins.
pub struct SoftwareTimedPort<'a, Rx, Tx, D, C, U> {
	role: PortRole,
	rx: Rx,
	tx: Tx,
	delay: D,
	clock: &'a C,
	micros: &'a U,
	state: PortState,
	stats: Stats,
	post_tx_delay_ms: u32,
}

impl<'a, Rx, Tx, D, C, U> SoftwareTimedPort<'a, Rx, Tx, D, C, U>
where
	Rx: InputPin,
	Tx: OutputPin,
	D: DelayNs,
	C: Clock,
	U: MicrosClock,
{
	pub fn new(role: PortRole, rx: Rx, tx: Tx, delay: D, clock: &'a C, micros: &'a U) -> Self {
		let post_tx_delay_ms = match role {
			PortRole::Master => crate::config::POST_TX_DELAY_MASTER_MS,
			PortRole::Slave => crate::config::POST_TX_DELAY_SLAVE_MS,
		};
		SoftwareTimedPort {
			role,
			rx,
			tx,
			delay,
			clock,
			micros,
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

	fn drive_idle(&mut self) {
		// The wire idles high; driving the TX pin high releases the bus.
		let _ = self.tx.set_high();
	}

	fn drive_level(&mut self, level: Level) {
		match level {
			Level::High => {
				let _ = self.tx.set_high();
			}
			Level::Low => {
				let _ = self.tx.set_low();
			}
		}
	}

	fn read_level(&mut self) -> Level {
		if self.rx.is_high().unwrap_or(true) {
			Level::High
		} else {
			Level::Low
		}
	}

	/// Busy-waits, polling the RX pin, for up to `deadline_ms` worth of
	/// edges to accumulate a full frame's worth of half-bit pulses.
	fn capture(&mut self, deadline_ms: u32) -> Result<heapless::Vec<Pulse, { FRAME_HALF_BITS + 8 }>, BusError> {
		// First RxEdge: Idle -> RxWaitStart (listening for a start bit).
		self.state = self.state.apply(Event::RxEdge);
		let start_ms = self.clock.now_ms();
		let mut last_level = self.read_level();
		let mut last_us = self.micros.now_us();
		let mut pulses: heapless::Vec<Pulse, { FRAME_HALF_BITS + 8 }> = heapless::Vec::new();

		loop {
			if self.clock.now_ms().saturating_sub(start_ms) > deadline_ms as u64 {
				self.stats.record_timeout();
				self.state = PortState::Idle;
				return Err(BusError::ReceiveStartTimeout);
			}
			let level = self.read_level();
			if level != last_level {
				let now_us = self.micros.now_us();
				let duration_us = now_us.wrapping_sub(last_us);
				if pulses
					.push(Pulse {
						level: last_level,
						duration_us,
					})
					.is_err()
				{
					break;
				}
				if pulses.len() == 1 {
					// Second RxEdge: RxWaitStart -> RxReceiving, now that
					// the start bit has actually been seen.
					self.state = self.state.apply(Event::RxEdge);
				}
				last_level = level;
				last_us = now_us;
			}
			if pulses.len() >= FRAME_HALF_BITS {
				break;
			}
		}
		Ok(pulses)
	}
}

impl<'a, Rx, Tx, D, C, U> BusPort for SoftwareTimedPort<'a, Rx, Tx, D, C, U>
where
	Rx: InputPin,
	Tx: OutputPin,
	D: DelayNs,
	C: Clock,
	U: MicrosClock,
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
		debug!("software port: sending frame {:#010x}", frame.raw());

		for pulse in manchester::encode(frame) {
			self.drive_level(pulse.level);
			self.delay.delay_us(pulse.duration_us);
		}
		self.drive_idle();
		self.stats.record_tx();

		self.state = self.state.apply(Event::TxComplete);
		self.delay.delay_us(self.post_tx_delay_ms.saturating_mul(1000));
		self.state = self.state.apply(Event::PostTxDelayElapsed);
		Ok(())
	}

	fn receive_frame(&mut self, deadline_ms: u32) -> ReceiveOutcome {
		let pulses = match self.capture(deadline_ms) {
			Ok(pulses) => pulses,
			Err(_) => return ReceiveOutcome::Timeout,
		};

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
				warn!("software port: decode failed: {err}");
				ReceiveOutcome::Invalid(err)
			}
		}
	}

	fn stats(&self) -> &Stats {
		&self.stats
	}
}
