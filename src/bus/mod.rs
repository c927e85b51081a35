//! Bus port abstractions: the state machine, the ISR handoff ring, and
//! the two concrete timing strategies (bit-banged vs. peripheral-timed).

pub mod ring;
pub mod state;

#[cfg(feature = "software-timed")]
pub mod software;

#[cfg(feature = "hardware-timed")]
pub mod hardware;

use crate::error::BusError;
use crate::frame::Frame;
use crate::manchester::DecodeError;
use crate::stats::Stats;

/// Which side of the OpenTherm link a port plays. A thermostat-facing
/// port is the slave (it answers the thermostat's requests); a
/// boiler-facing port is the master (it issues requests to the
/// boiler). A single gateway has exactly one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
	Master,
	Slave,
}

/// The result of a bounded-deadline receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
	/// A frame was captured and passed parity.
	Frame(Frame),
	/// No start bit arrived before the deadline.
	Timeout,
	/// A start bit arrived but decoding failed partway through.
	Invalid(DecodeError),
}

/// The hardware-facing half of one OpenTherm wire pair.
///
/// A `BusPort` is driven exclusively by the task that owns it
/// ([`crate::tasks::thermostat_task`] or [`crate::tasks::boiler_task`]);
/// it is not `Sync` and is not meant to be shared. Both timing
/// strategies ([`software::SoftwareTimedPort`],
/// [`hardware::HardwareTimedPort`]) implement this trait identically
/// from the caller's point of view — only how an edge is detected
/// differs.
pub trait BusPort {
	fn role(&self) -> PortRole;

	/// Transmits one frame. Blocks for the frame's on-wire time plus the
	/// role-appropriate post-TX delay. Fails with [`BusError::BusBusy`]
	/// if the port was mid-receive.
	fn send_frame(&mut self, frame: Frame) -> Result<(), BusError>;

	/// Waits up to `deadline_ms` for a complete, decodable frame.
	fn receive_frame(&mut self, deadline_ms: u32) -> ReceiveOutcome;

	fn stats(&self) -> &Stats;
}
