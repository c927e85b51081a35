//! The error taxonomy.
//!
//! Per the error-handling design: bus and mailbox conditions are
//! non-fatal and never propagate past the task that observed them —
//! they are recorded in [`crate::stats::Stats`] and/or surfaced as an
//! [`crate::observer::Event`]. [`ConfigError`] is the one exception:
//! it is returned to the caller at construction time.

/// Transient, non-fatal bus conditions. A `BusPort` method returning
/// this is not a crash; the caller (a task in [`crate::tasks`]) records
/// a counter and loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
	/// `send_frame` was called while the port was not `Idle`.
	#[error("bus port busy, not idle")]
	BusBusy,
	/// The captured pulse sequence failed Manchester decoding.
	#[error("manchester decode failed: {0}")]
	Manchester(#[from] crate::manchester::DecodeError),
	/// A frame decoded structurally but failed the parity check.
	#[error("parity check failed")]
	Parity,
	/// No start bit was observed before the receive-start deadline.
	#[error("no start bit before deadline")]
	ReceiveStartTimeout,
	/// A start bit was seen but the frame did not complete within the
	/// hard total-frame timeout.
	#[error("frame did not complete within the total-frame timeout")]
	FrameTimeout,
}

/// Fatal, construction-time-only configuration problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	/// A timing value was zero or otherwise nonsensical (e.g. a deadline
	/// shorter than the minimum time a frame physically takes).
	#[error("invalid timing configuration: {0}")]
	InvalidTiming(&'static str),
	/// The intercept policy's override-ID set exceeded its fixed
	/// capacity.
	#[error("too many override data IDs configured (max {max})")]
	TooManyOverrideIds { max: usize },
}
