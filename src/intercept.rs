//! The intercept/override policy: rewrites selected master→slave frames
//! in flight to enforce an externally supplied heating demand, with a
//! guard that limits how often rewriting happens and a fallback that
//! disables it if the guard isn't fed.

use crate::clock::Clock;
use crate::config::InterceptConfig;
use crate::frame::{data_id, Frame, MasterStatusFlags, MessageType};

/// What happened to a frame as it passed through the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// The frame was not a target of interception; passed through as-is.
	Passthrough,
	/// The frame was rewritten to reflect the configured demand.
	Rewritten,
	/// The frame was a target, but the guard skipped this tick (only
	/// every Nth targeted frame is rewritten).
	GuardSkipped,
	/// The fallback window elapsed with no fresh demand set, so
	/// interception is currently disabled regardless of `enabled`.
	FallbackActive,
}

/// Live intercept state layered on top of the static [`InterceptConfig`]:
/// the guard's tick counter and the last-demand-update timestamp the
/// fallback timer measures against.
pub struct InterceptPolicy {
	config: InterceptConfig,
	tick: u16,
	last_demand_update_ms: Option<u64>,
}

impl InterceptPolicy {
	pub fn new(config: InterceptConfig) -> InterceptPolicy {
		InterceptPolicy {
			config,
			tick: 0,
			last_demand_update_ms: None,
		}
	}

	pub fn config(&self) -> &InterceptConfig {
		&self.config
	}

	pub fn config_mut(&mut self) -> &mut InterceptConfig {
		&mut self.config
	}

	/// Records that the control plane just supplied a fresh demand,
	/// resetting the fallback timer.
	pub fn note_demand_set<C: Clock>(&mut self, clock: &C) {
		self.last_demand_update_ms = Some(clock.now_ms());
	}

	fn fallback_active<C: Clock>(&self, clock: &C) -> bool {
		match self.last_demand_update_ms {
			None => true,
			Some(last) => {
				clock.now_ms().saturating_sub(last) >= self.config.fallback_after_ms as u64
			}
		}
	}

	/// Applies the policy to one master-to-slave frame, returning the
	/// (possibly rewritten) frame and what happened.
	pub fn apply<C: Clock>(&mut self, clock: &C, frame: Frame) -> (Frame, Outcome) {
		if !self.config.enabled || !self.config.targets(frame.data_id()) {
			return (frame, Outcome::Passthrough);
		}
		if self.fallback_active(clock) {
			warn!(
				"intercept: fallback active, passing data ID {} through unmodified",
				frame.data_id()
			);
			return (frame, Outcome::FallbackActive);
		}

		self.tick = self.tick.wrapping_add(1);
		let every_n = self.config.intercept_every_n.max(1);
		if self.tick % every_n != 0 {
			return (frame, Outcome::GuardSkipped);
		}

		match frame.data_id() {
			id if id == data_id::STATUS => {
				let rewritten = self.rewrite_status(frame);
				debug!("intercept: rewrote STATUS frame");
				(rewritten, Outcome::Rewritten)
			}
			id if id == data_id::TSET => match self.config.demand_tset {
				Some(tset) => {
					let value = (tset.clamp(0.0, 100.0) * 256.0) as i16 as u16;
					debug!("intercept: rewrote TSET to {tset}");
					(frame.with_data_value(value), Outcome::Rewritten)
				}
				None => (frame, Outcome::Passthrough),
			},
			_ => (frame, Outcome::Passthrough),
		}
	}

	fn rewrite_status(&self, frame: Frame) -> Frame {
		if frame.message_type() != MessageType::ReadData {
			return frame;
		}
		let mut flags = frame.master_status_flags();
		flags.set(MasterStatusFlags::CH_ENABLE, self.config.demand_ch);
		flags.set(MasterStatusFlags::DHW_ENABLE, self.config.demand_dhw);
		let (_old_hi, lo) = frame.data_value_bytes();
		frame.with_data_value(u16::from_be_bytes([flags.bits(), lo]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::FakeClock;
	use crate::config::InterceptConfig;

	fn enabled_policy() -> InterceptPolicy {
		let mut config = InterceptConfig::default_targeting_status_and_tset();
		config.enabled = true;
		config.demand_ch = true;
		config.demand_dhw = false;
		config.demand_tset = Some(55.0);
		InterceptPolicy::new(config)
	}

	#[test]
	fn untargeted_id_passes_through() {
		let mut policy = enabled_policy();
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		let frame = Frame::build_request(MessageType::ReadData, data_id::TBOILER, 0);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Passthrough);
		assert_eq!(out, frame);
	}

	#[test]
	fn status_read_is_rewritten_with_demand_bits() {
		let mut policy = enabled_policy();
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		let frame = Frame::build_request(MessageType::ReadData, data_id::STATUS, 0);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Rewritten);
		let (hi, _lo) = out.data_value_bytes();
		assert_eq!(hi & 0b11, 0b01); // CH bit set, DHW bit clear
	}

	#[test]
	fn tset_write_is_rewritten_to_demand_value() {
		let mut policy = enabled_policy();
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		let frame = Frame::build_request(MessageType::WriteData, data_id::TSET, 0x1000);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Rewritten);
		assert!(float_cmp::approx_eq!(f32, out.data_value_s8_8(), 55.0, epsilon = 0.01));
	}

	#[test]
	fn tset_override_clamps_to_0_100() {
		let mut policy = enabled_policy();
		policy.config_mut().demand_tset = Some(150.0);
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		let frame = Frame::build_request(MessageType::WriteData, data_id::TSET, 0);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Rewritten);
		assert!(float_cmp::approx_eq!(f32, out.data_value_s8_8(), 100.0, epsilon = 0.01));

		let mut policy = enabled_policy();
		policy.config_mut().demand_tset = Some(-20.0);
		policy.note_demand_set(&clock);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Rewritten);
		assert!(float_cmp::approx_eq!(f32, out.data_value_s8_8(), 0.0, epsilon = 0.01));
	}

	#[test]
	fn guard_only_rewrites_every_nth_targeted_frame() {
		let mut policy = enabled_policy();
		policy.config_mut().intercept_every_n = 2;
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		let frame = Frame::build_request(MessageType::WriteData, data_id::TSET, 0);

		let (_, first) = policy.apply(&clock, frame);
		let (_, second) = policy.apply(&clock, frame);
		assert_eq!(first, Outcome::GuardSkipped);
		assert_eq!(second, Outcome::Rewritten);
	}

	#[test]
	fn fallback_activates_after_timeout_with_no_fresh_demand() {
		let mut policy = enabled_policy();
		let clock = FakeClock::new();
		policy.note_demand_set(&clock);
		clock.advance(policy.config().fallback_after_ms as u64);
		let frame = Frame::build_request(MessageType::WriteData, data_id::TSET, 0);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::FallbackActive);
		assert_eq!(out, frame);
	}

	#[test]
	fn disabled_policy_always_passes_through() {
		let mut policy = enabled_policy();
		policy.config_mut().enabled = false;
		let clock = FakeClock::new();
		let frame = Frame::build_request(MessageType::WriteData, data_id::TSET, 0x1000);
		let (out, outcome) = policy.apply(&clock, frame);
		assert_eq!(outcome, Outcome::Passthrough);
		assert_eq!(out, frame);
	}
}
