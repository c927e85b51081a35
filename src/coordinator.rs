//! The gateway coordinator: the non-blocking main loop that couples
//! the thermostat and boiler tasks, owns the intercept policy and the
//! diagnostics cache, and drives the observer hook.

use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::diagnostics::{DiagEntry, DiagnosticsCache};
use crate::frame::{Frame, MessageType};
use crate::intercept::{InterceptPolicy, Outcome as InterceptOutcome};
use crate::mailbox::Mailbox;
use crate::observer::{Direction, Event as ObserverEvent, Observer, Source};
use crate::stats::{Stats, StatsSnapshot};

/// The mailboxes the coordinator shuttles frames through. Owned by
/// whoever wires up the gateway; shared by reference with
/// [`crate::tasks::thermostat::run`] and [`crate::tasks::boiler::run`].
pub struct GatewayChannels<'a> {
	pub thermostat_request: &'a Mailbox<Frame>,
	pub thermostat_response: &'a Mailbox<Frame>,
	pub boiler_request: &'a Mailbox<Frame>,
	pub boiler_response: &'a Mailbox<Frame>,
}

/// Current status of the control plane, as returned by
/// [`GatewayCoordinator::control_status`].
#[derive(Debug, Clone, Copy)]
pub struct ControlStatus {
	pub intercept_enabled: bool,
	pub demand_ch: bool,
	pub demand_dhw: bool,
	pub demand_tset: Option<f32>,
}

/// Forwarding-level counters for each direction the coordinator moves
/// frames through, as returned by [`GatewayCoordinator::stats`]. These
/// are distinct from a [`crate::bus::BusPort`]'s own hardware-level
/// [`StatsSnapshot`] (TX/RX/error/timeout on the wire): here `rx_count`
/// is "requests/responses taken out of a mailbox" and `tx_count` is
/// "frames handed to the other side's mailbox", so a steady gap between
/// the two flags mailbox misses even if the underlying bus is healthy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayStats {
	pub thermostat_side: StatsSnapshot,
	pub boiler_side: StatsSnapshot,
}

/// Owns the policy, the diagnostics cache, and drives one non-blocking
/// tick per poll interval. `tick` never blocks on I/O: it only takes
/// whatever the mailboxes already hold.
pub struct GatewayCoordinator<'a, C, O> {
	clock: &'a C,
	config: GatewayConfig,
	policy: InterceptPolicy,
	diagnostics: DiagnosticsCache,
	observer: O,
	idle_ticks: u32,
	probe_cursor: u8,
	thermostat_side: Stats,
	boiler_side: Stats,
}

impl<'a, C, O> GatewayCoordinator<'a, C, O>
where
	C: Clock,
	O: Observer,
{
	pub fn new(clock: &'a C, config: GatewayConfig, observer: O) -> GatewayCoordinator<'a, C, O> {
		let policy = InterceptPolicy::new(config.intercept.clone());
		GatewayCoordinator {
			clock,
			config,
			policy,
			diagnostics: DiagnosticsCache::new(),
			observer,
			idle_ticks: 0,
			probe_cursor: 0,
			thermostat_side: Stats::new(),
			boiler_side: Stats::new(),
		}
	}

	pub fn control_status(&self) -> ControlStatus {
		let intercept = self.policy.config();
		ControlStatus {
			intercept_enabled: intercept.enabled,
			demand_ch: intercept.demand_ch,
			demand_dhw: intercept.demand_dhw,
			demand_tset: intercept.demand_tset,
		}
	}

	/// Sets the heating demand the intercept policy should enforce, and
	/// resets the intercept guard's fallback timer.
	pub fn set_demand(&mut self, ch: bool, dhw: bool, tset: Option<f32>) {
		let intercept = self.policy.config_mut();
		intercept.demand_ch = ch;
		intercept.demand_dhw = dhw;
		intercept.demand_tset = tset;
		self.policy.note_demand_set(self.clock);
	}

	/// Enables or disables interception outright (independent of the
	/// fallback guard).
	pub fn set_mode(&mut self, enabled: bool) {
		self.policy.config_mut().enabled = enabled;
	}

	pub fn diagnostics(&self) -> &DiagnosticsCache {
		&self.diagnostics
	}

	/// Runs one non-blocking tick: drains a pending thermostat request
	/// (applying the intercept policy and forwarding it to the boiler
	/// task) and a pending boiler response (forwarding it back to the
	/// thermostat task), recording every frame seen into the
	/// diagnostics cache and the observer. Also injects a round-robin
	/// diagnostics probe request when configured and the bus has been
	/// idle for long enough.
	pub fn tick(&mut self, channels: &GatewayChannels<'_>) {
		let mut did_work = false;

		if let Some(request) = channels.thermostat_request.take() {
			did_work = true;
			self.thermostat_side.record_rx();
			self.diagnostics.observe(self.clock, request);
			let (forwarded, outcome) = self.policy.apply(self.clock, request);
			if matches!(outcome, InterceptOutcome::FallbackActive) {
				self.observer.on_message(ObserverEvent::FallbackActive);
			}
			self.observer.on_message(ObserverEvent::Message {
				source: Source::Thermostat,
				direction: Direction::Outbound,
				frame: request,
				intercept: outcome,
			});
			channels.boiler_request.put(forwarded);
			self.boiler_side.record_tx();
		} else if channels.boiler_request.has_value() {
			// A previous request is still awaiting the boiler task; do
			// not inject a probe on top of it.
			did_work = true;
		}

		if let Some(response) = channels.boiler_response.take() {
			did_work = true;
			self.boiler_side.record_rx();
			self.diagnostics.observe(self.clock, response);
			self.observer.on_message(ObserverEvent::Message {
				source: Source::Boiler,
				direction: Direction::Inbound,
				frame: response,
				intercept: InterceptOutcome::Passthrough,
			});
			channels.thermostat_response.put(response);
			self.thermostat_side.record_tx();
		}

		if did_work {
			self.idle_ticks = 0;
		} else {
			self.idle_ticks += 1;
			self.maybe_inject_probe(channels);
		}
	}

	fn maybe_inject_probe(&mut self, channels: &GatewayChannels<'_>) {
		let Some(every_n_ticks) = self.config.diagnostics_probe_every_n_ticks else {
			return;
		};
		if self.idle_ticks < every_n_ticks {
			return;
		}
		self.idle_ticks = 0;
		let id = self.probe_cursor;
		self.probe_cursor = self.probe_cursor.wrapping_add(1);
		trace!("coordinator: injecting diagnostics probe for data ID {id}");
		channels
			.boiler_request
			.put(Frame::build_request(MessageType::ReadData, id, 0));
		self.boiler_side.record_tx();
	}

	/// Forwarding-level counters for the control-plane `get_stats` call.
	/// Hardware-level TX/RX/error/timeout counters for the wire itself
	/// live on each [`crate::bus::BusPort`] and are read separately via
	/// `BusPort::stats()`.
	pub fn stats(&self) -> GatewayStats {
		GatewayStats {
			thermostat_side: self.thermostat_side.snapshot(),
			boiler_side: self.boiler_side.snapshot(),
		}
	}

	/// Copies up to `N` cached diagnostics entries out for the
	/// control-plane `snapshot` call. Entries beyond `N` are silently
	/// dropped from the copy (the cache itself still holds all 256); a
	/// caller that needs every entry should size `N` at 256.
	pub fn snapshot<const N: usize>(&self) -> heapless::Vec<DiagEntry, N> {
		self.diagnostics.iter().copied().take(N).collect()
	}
}

/// A thin façade over [`GatewayCoordinator`] for external collaborators
/// (an HTTP handler, an MQTT callback) that should be able to read
/// status and push a new demand without holding the coordinator
/// itself, which also has to be handed to `tick`'s caller.
///
/// `no_std` has no `Arc`; embedding firmware is expected to place the
/// coordinator in `'static` storage (the same pattern
/// [`crate::bus::ring::SampleRing`] requires) and hand out
/// `GatewayHandle`s borrowing from it.
pub struct GatewayHandle<'a, C, O> {
	coordinator: &'a critical_section::Mutex<core::cell::RefCell<GatewayCoordinator<'a, C, O>>>,
}

impl<'a, C, O> GatewayHandle<'a, C, O>
where
	C: Clock,
	O: Observer,
{
	pub fn new(
		coordinator: &'a critical_section::Mutex<core::cell::RefCell<GatewayCoordinator<'a, C, O>>>,
	) -> GatewayHandle<'a, C, O> {
		GatewayHandle { coordinator }
	}

	pub fn set_demand(&self, ch: bool, dhw: bool, tset: Option<f32>) {
		critical_section::with(|cs| {
			self.coordinator
				.borrow(cs)
				.borrow_mut()
				.set_demand(ch, dhw, tset);
		});
	}

	pub fn set_mode(&self, enabled: bool) {
		critical_section::with(|cs| {
			self.coordinator.borrow(cs).borrow_mut().set_mode(enabled);
		});
	}

	pub fn control_status(&self) -> ControlStatus {
		critical_section::with(|cs| self.coordinator.borrow(cs).borrow().control_status())
	}

	pub fn get_stats(&self) -> GatewayStats {
		critical_section::with(|cs| self.coordinator.borrow(cs).borrow().stats())
	}

	/// Copies up to `N` cached diagnostics entries out through the
	/// critical section (see [`GatewayCoordinator::snapshot`]).
	pub fn snapshot<const N: usize>(&self) -> heapless::Vec<DiagEntry, N> {
		critical_section::with(|cs| self.coordinator.borrow(cs).borrow().snapshot())
	}
}

impl<'a, C, O> Clone for GatewayHandle<'a, C, O> {
	fn clone(&self) -> Self {
		GatewayHandle {
			coordinator: self.coordinator,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::FakeClock;
	use crate::frame::{data_id, MessageType};
	use crate::observer::NullObserver;

	#[test]
	fn forwards_thermostat_request_to_boiler_task() {
		let clock = FakeClock::new();
		let mut coordinator = GatewayCoordinator::new(&clock, GatewayConfig::default(), NullObserver);
		let thermostat_request = Mailbox::new();
		let thermostat_response = Mailbox::new();
		let boiler_request = Mailbox::new();
		let boiler_response = Mailbox::new();
		let channels = GatewayChannels {
			thermostat_request: &thermostat_request,
			thermostat_response: &thermostat_response,
			boiler_request: &boiler_request,
			boiler_response: &boiler_response,
		};

		let request = Frame::build_request(MessageType::ReadData, data_id::TBOILER, 0);
		thermostat_request.put(request);
		coordinator.tick(&channels);
		let stats = coordinator.stats();
		assert_eq!(stats.thermostat_side.rx_count, 1);
		assert_eq!(stats.boiler_side.tx_count, 1);

		assert_eq!(boiler_request.take(), Some(request));
		assert!(coordinator.diagnostics().get(data_id::TBOILER).is_some());
	}

	#[test]
	fn forwards_boiler_response_to_thermostat_task() {
		let clock = FakeClock::new();
		let mut coordinator = GatewayCoordinator::new(&clock, GatewayConfig::default(), NullObserver);
		let thermostat_request = Mailbox::new();
		let thermostat_response = Mailbox::new();
		let boiler_request = Mailbox::new();
		let boiler_response = Mailbox::new();
		let channels = GatewayChannels {
			thermostat_request: &thermostat_request,
			thermostat_response: &thermostat_response,
			boiler_request: &boiler_request,
			boiler_response: &boiler_response,
		};

		let response = Frame::build_response(MessageType::ReadAck, data_id::TBOILER, 0x3200);
		boiler_response.put(response);
		coordinator.tick(&channels);

		assert_eq!(thermostat_response.take(), Some(response));
	}

	#[test]
	fn snapshot_copies_diagnostics_entries_out() {
		let clock = FakeClock::new();
		let mut coordinator = GatewayCoordinator::new(&clock, GatewayConfig::default(), NullObserver);
		let thermostat_request = Mailbox::new();
		let thermostat_response = Mailbox::new();
		let boiler_request = Mailbox::new();
		let boiler_response = Mailbox::new();
		let channels = GatewayChannels {
			thermostat_request: &thermostat_request,
			thermostat_response: &thermostat_response,
			boiler_request: &boiler_request,
			boiler_response: &boiler_response,
		};

		thermostat_request.put(Frame::build_request(MessageType::ReadData, data_id::TBOILER, 0));
		coordinator.tick(&channels);
		boiler_response.put(Frame::build_response(
			MessageType::ReadAck,
			data_id::TBOILER,
			0x3200,
		));
		coordinator.tick(&channels);

		let entries: heapless::Vec<_, 256> = coordinator.snapshot();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].data_id, data_id::TBOILER);
	}

	#[test]
	fn status_rewrite_applies_demand_before_forwarding() {
		let clock = FakeClock::new();
		let mut coordinator = GatewayCoordinator::new(&clock, GatewayConfig::default(), NullObserver);
		coordinator.set_mode(true);
		coordinator.set_demand(true, false, Some(45.0));

		let thermostat_request = Mailbox::new();
		let thermostat_response = Mailbox::new();
		let boiler_request = Mailbox::new();
		let boiler_response = Mailbox::new();
		let channels = GatewayChannels {
			thermostat_request: &thermostat_request,
			thermostat_response: &thermostat_response,
			boiler_request: &boiler_request,
			boiler_response: &boiler_response,
		};

		let request = Frame::build_request(MessageType::ReadData, data_id::STATUS, 0);
		thermostat_request.put(request);
		coordinator.tick(&channels);

		let forwarded = boiler_request.take().unwrap();
		let (hi, _lo) = forwarded.data_value_bytes();
		assert_eq!(hi & 0b1, 1); // CH enable demand bit set
	}

	#[test]
	fn diagnostics_probe_injected_after_idle_ticks() {
		let clock = FakeClock::new();
		let mut config = GatewayConfig::default();
		config.diagnostics_probe_every_n_ticks = Some(2);
		let mut coordinator = GatewayCoordinator::new(&clock, config, NullObserver);
		let thermostat_request = Mailbox::new();
		let thermostat_response = Mailbox::new();
		let boiler_request = Mailbox::new();
		let boiler_response = Mailbox::new();
		let channels = GatewayChannels {
			thermostat_request: &thermostat_request,
			thermostat_response: &thermostat_response,
			boiler_request: &boiler_request,
			boiler_response: &boiler_response,
		};

		coordinator.tick(&channels);
		assert!(boiler_request.take().is_none());
		coordinator.tick(&channels);
		assert!(boiler_request.take().is_some());
	}
}
