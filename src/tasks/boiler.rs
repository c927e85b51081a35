//! The boiler-facing task: plays the bus **master** role, issuing the
//! request the coordinator hands it and relaying back whatever the
//! boiler replies with.

use crate::bus::{BusPort, ReceiveOutcome};
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::frame::Frame;
use crate::mailbox::Mailbox;
use crate::tasks::ShutdownFlag;

/// Runs the boiler task loop until `shutdown` is requested.
///
/// Each iteration: block on `request_in` for the coordinator's next
/// request to forward; on success, send it on `port` and block for the
/// slave's reply (up to `config.boiler_receive_timeout_ms`), publishing
/// whatever comes back (or nothing, on timeout/invalid capture) to
/// `response_out`.
pub fn run<P, C>(
	port: &mut P,
	clock: &C,
	config: &GatewayConfig,
	request_in: &Mailbox<Frame>,
	response_out: &Mailbox<Frame>,
	shutdown: &ShutdownFlag,
) where
	P: BusPort,
	C: Clock,
{
	while !shutdown.is_requested() {
		step(port, clock, config, request_in, response_out);
	}
}

/// Runs one iteration of the boiler task body: wait for a request (up
/// to the configured deadline), forward it, and relay whatever reply
/// comes back. Split out from [`run`] so it can be driven directly in
/// tests without looping on a mailbox that will never again receive a
/// value.
fn step<P, C>(
	port: &mut P,
	clock: &C,
	config: &GatewayConfig,
	request_in: &Mailbox<Frame>,
	response_out: &Mailbox<Frame>,
) where
	P: BusPort,
	C: Clock,
{
	let Some(request) = request_in.take_timeout(
		clock,
		config.boiler_receive_timeout_ms,
		config.coordinator_poll_interval_ms,
	) else {
		return;
	};

	debug!("boiler task: forwarding request {:#010x}", request.raw());
	if let Err(err) = port.send_frame(request) {
		warn!("boiler task: send failed: {err}");
		return;
	}

	match port.receive_frame(config.boiler_receive_timeout_ms) {
		ReceiveOutcome::Frame(frame) if frame.is_response() => {
			response_out.put(frame);
		}
		ReceiveOutcome::Frame(_) => {
			warn!("boiler task: received non-response frame, ignoring");
		}
		ReceiveOutcome::Timeout => {
			warn!("boiler task: no reply from boiler within deadline");
		}
		ReceiveOutcome::Invalid(err) => {
			warn!("boiler task: malformed capture: {err}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::PortRole;
	use crate::clock::FakeClock;
	use crate::frame::MessageType;
	use crate::stats::Stats;

	struct ScriptedPort<'a> {
		reply_script: &'a [ReceiveOutcome],
		cursor: usize,
		sent: heapless::Vec<Frame, 4>,
		stats: Stats,
	}

	impl<'a> BusPort for ScriptedPort<'a> {
		fn role(&self) -> PortRole {
			PortRole::Master
		}

		fn send_frame(&mut self, frame: Frame) -> Result<(), crate::error::BusError> {
			let _ = self.sent.push(frame);
			Ok(())
		}

		fn receive_frame(&mut self, _deadline_ms: u32) -> ReceiveOutcome {
			let outcome = self
				.reply_script
				.get(self.cursor)
				.copied()
				.unwrap_or(ReceiveOutcome::Timeout);
			self.cursor += 1;
			outcome
		}

		fn stats(&self) -> &Stats {
			&self.stats
		}
	}

	#[test]
	fn forwards_request_and_publishes_reply() {
		let request = Frame::build_request(MessageType::ReadData, 0, 0);
		let reply = Frame::build_response(MessageType::ReadAck, 0, 0x4200);

		let clock = FakeClock::new();
		let config = GatewayConfig::default();
		let request_in: Mailbox<Frame> = Mailbox::new();
		let response_out: Mailbox<Frame> = Mailbox::new();

		request_in.put(request);
		let script = [ReceiveOutcome::Frame(reply)];
		let mut port = ScriptedPort {
			reply_script: &script,
			cursor: 0,
			sent: heapless::Vec::new(),
			stats: Stats::new(),
		};

		step(&mut port, &clock, &config, &request_in, &response_out);

		assert_eq!(port.sent.as_slice(), [request]);
		assert_eq!(response_out.take(), Some(reply));
	}

	#[test]
	fn step_is_a_noop_when_no_request_is_pending() {
		let clock = FakeClock::new();
		let mut config = GatewayConfig::default();
		config.boiler_receive_timeout_ms = 0;
		let request_in: Mailbox<Frame> = Mailbox::new();
		let response_out: Mailbox<Frame> = Mailbox::new();
		let mut port = ScriptedPort {
			reply_script: &[],
			cursor: 0,
			sent: heapless::Vec::new(),
			stats: Stats::new(),
		};

		step(&mut port, &clock, &config, &request_in, &response_out);

		assert!(port.sent.is_empty());
		assert!(response_out.take().is_none());
	}
}
