//! The thermostat-facing task: plays the bus **slave** role, answering
//! the room unit's master-initiated requests.

use crate::bus::{BusPort, ReceiveOutcome};
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::frame::Frame;
use crate::mailbox::Mailbox;
use crate::tasks::ShutdownFlag;

/// Runs the thermostat task loop until `shutdown` is requested.
///
/// Each iteration: block on `port` for the thermostat's next
/// request (up to `config.thermostat_receive_timeout_ms`); on success,
/// publish it to `request_out` for the coordinator and block on
/// `response_in` (up to `config.thermostat_response_timeout_ms`) for
/// the reply to relay back. A missed deadline on either side is
/// recorded on the port's statistics and the loop simply continues —
/// the thermostat will retry on its own ~1 s cadence.
pub fn run<P, C>(
	port: &mut P,
	clock: &C,
	config: &GatewayConfig,
	request_out: &Mailbox<Frame>,
	response_in: &Mailbox<Frame>,
	shutdown: &ShutdownFlag,
) where
	P: BusPort,
	C: Clock,
{
	while !shutdown.is_requested() {
		match port.receive_frame(config.thermostat_receive_timeout_ms) {
			ReceiveOutcome::Frame(frame) if frame.is_request() => {
				debug!("thermostat task: received request {:#010x}", frame.raw());
				request_out.put(frame);

				match response_in.take_timeout(
					clock,
					config.thermostat_response_timeout_ms,
					config.coordinator_poll_interval_ms,
				) {
					Some(response) => {
						if let Err(err) = port.send_frame(response) {
							warn!("thermostat task: send failed: {err}");
						}
					}
					None => {
						warn!("thermostat task: no response from coordinator in time");
					}
				}
			}
			ReceiveOutcome::Frame(_) => {
				warn!("thermostat task: received non-request frame, ignoring");
			}
			ReceiveOutcome::Timeout => {
				trace!("thermostat task: no request within deadline");
			}
			ReceiveOutcome::Invalid(err) => {
				warn!("thermostat task: malformed capture: {err}");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bus::PortRole;
	use crate::clock::FakeClock;
	use crate::frame::MessageType;
	use crate::manchester::DecodeError;
	use crate::stats::Stats;

	/// A scripted port: replays a fixed sequence of receive outcomes,
	/// requesting shutdown once the script is exhausted so the task
	/// loop under test runs exactly `script.len()` real iterations.
	struct ScriptedPort<'a> {
		script: &'a [ReceiveOutcome],
		cursor: usize,
		sent: heapless::Vec<Frame, 4>,
		stats: Stats,
		shutdown: &'a ShutdownFlag,
	}

	impl<'a> BusPort for ScriptedPort<'a> {
		fn role(&self) -> PortRole {
			PortRole::Slave
		}

		fn send_frame(&mut self, frame: Frame) -> Result<(), crate::error::BusError> {
			let _ = self.sent.push(frame);
			Ok(())
		}

		fn receive_frame(&mut self, _deadline_ms: u32) -> ReceiveOutcome {
			match self.script.get(self.cursor) {
				Some(outcome) => {
					self.cursor += 1;
					*outcome
				}
				None => {
					self.shutdown.request();
					ReceiveOutcome::Timeout
				}
			}
		}

		fn stats(&self) -> &Stats {
			&self.stats
		}
	}

	#[test]
	fn relays_coordinator_response_back_to_thermostat() {
		let request = Frame::build_request(MessageType::ReadData, 0, 0);
		let response = Frame::build_response(MessageType::ReadAck, 0, 0x1234);

		let clock = FakeClock::new();
		let config = GatewayConfig::default();
		let request_out: Mailbox<Frame> = Mailbox::new();
		let response_in: Mailbox<Frame> = Mailbox::new();
		response_in.put(response);
		let shutdown = ShutdownFlag::new();

		let script = [ReceiveOutcome::Frame(request)];
		let mut port = ScriptedPort {
			script: &script,
			cursor: 0,
			sent: heapless::Vec::new(),
			stats: Stats::new(),
			shutdown: &shutdown,
		};

		run(
			&mut port,
			&clock,
			&config,
			&request_out,
			&response_in,
			&shutdown,
		);

		assert_eq!(request_out.take(), Some(request));
		assert_eq!(port.sent.as_slice(), [response]);
	}

	#[test]
	fn invalid_capture_does_not_publish_a_request() {
		let clock = FakeClock::new();
		let config = GatewayConfig::default();
		let request_out: Mailbox<Frame> = Mailbox::new();
		let response_in: Mailbox<Frame> = Mailbox::new();
		let shutdown = ShutdownFlag::new();

		let script = [ReceiveOutcome::Invalid(DecodeError::Invalid)];
		let mut port = ScriptedPort {
			script: &script,
			cursor: 0,
			sent: heapless::Vec::new(),
			stats: Stats::new(),
			shutdown: &shutdown,
		};

		run(
			&mut port,
			&clock,
			&config,
			&request_out,
			&response_in,
			&shutdown,
		);

		assert!(request_out.take().is_none());
	}
}
