//! The message-observer hook: lets an external collaborator watch
//! every frame the gateway moves, without sitting on the hot path.

use crate::frame::Frame;
use crate::intercept::Outcome as InterceptOutcome;

/// Which bus a frame was seen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
	Thermostat,
	Boiler,
}

/// The direction a frame travelled relative to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Thermostat → gateway → boiler.
	Outbound,
	/// Boiler → gateway → thermostat.
	Inbound,
}

/// One notable thing the coordinator observed.
#[derive(Debug, Clone, Copy)]
pub enum Event {
	/// A frame was moved between buses, possibly rewritten.
	Message {
		source: Source,
		direction: Direction,
		frame: Frame,
		intercept: InterceptOutcome,
	},
	/// A mailbox read timed out (a request or response never arrived in
	/// time).
	MailboxMiss { source: Source },
	/// The intercept guard's fallback window elapsed with no fresh
	/// demand, so interception is currently suspended.
	FallbackActive,
}

/// A callback invoked for every [`Event`] the coordinator produces.
///
/// Contract: `on_message` must not panic. The coordinator calls it
/// inline on its own tick, with no isolation between observer and
/// core; an observer that panics brings down the coordinator with it,
/// same as any other inline call in a `no_std` context with no
/// portable unwind-catching available.
pub trait Observer {
	fn on_message(&mut self, event: Event);
}

/// An observer that does nothing, for callers with nothing to watch.
pub struct NullObserver;

impl Observer for NullObserver {
	fn on_message(&mut self, _event: Event) {}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::frame::MessageType;

	struct CountingObserver {
		count: u32,
	}

	impl Observer for CountingObserver {
		fn on_message(&mut self, _event: Event) {
			self.count += 1;
		}
	}

	#[test]
	fn null_observer_accepts_every_event_kind() {
		let mut observer = NullObserver;
		let frame = Frame::build_request(MessageType::ReadData, 0, 0);
		observer.on_message(Event::Message {
			source: Source::Thermostat,
			direction: Direction::Outbound,
			frame,
			intercept: InterceptOutcome::Passthrough,
		});
		observer.on_message(Event::MailboxMiss {
			source: Source::Boiler,
		});
		observer.on_message(Event::FallbackActive);
	}

	#[test]
	fn custom_observer_counts_events() {
		let mut observer = CountingObserver { count: 0 };
		observer.on_message(Event::FallbackActive);
		observer.on_message(Event::MailboxMiss {
			source: Source::Thermostat,
		});
		assert_eq!(observer.count, 2);
	}
}
