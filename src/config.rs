//! Tunable timing and policy constants.
//!
//! Every literal named in the distilled specification's prose gets a
//! constant here, and [`GatewayConfig::default`] reproduces exactly the
//! documented behavior. Callers who need different timing (a slower
//! bus, a more aggressive fallback) construct their own `GatewayConfig`
//! and validate it once at startup.

use heapless::Vec;

use crate::error::ConfigError;
use crate::frame::data_id;

/// Maximum number of data IDs the intercept policy can target
/// simultaneously. Four is generous headroom over the documented
/// default of two (`STATUS`, `TSET`).
pub const MAX_OVERRIDE_IDS: usize = 8;

/// Post-TX inter-frame gap when the port just finished transmitting in
/// the slave role (replying to a master).
pub const POST_TX_DELAY_SLAVE_MS: u32 = 20;
/// Post-TX inter-frame gap when the port just finished transmitting in
/// the master role (issuing a request).
pub const POST_TX_DELAY_MASTER_MS: u32 = 100;

/// How long a port waits for a start bit before declaring
/// `RxTimeout`.
pub const RECEIVE_START_TIMEOUT_MS: u32 = 1000;
/// Hard stop on an in-progress receive, regardless of how much
/// progress has been made.
pub const TOTAL_FRAME_TIMEOUT_MS: u32 = 50;

/// Thermostat task's deadline for `port.receive_frame`.
pub const THERMOSTAT_RECEIVE_TIMEOUT_MS: u32 = 1100;
/// Thermostat task's deadline waiting for the coordinator's response
/// mailbox.
pub const THERMOSTAT_RESPONSE_TIMEOUT_MS: u32 = 750;
/// Boiler task's deadline for the slave's reply.
pub const BOILER_RECEIVE_TIMEOUT_MS: u32 = 800;

/// Coordinator poll interval.
pub const COORDINATOR_POLL_INTERVAL_MS: u32 = 5;

/// Approximate on-wire time of one 34-bit frame at the nominal 1000 µs
/// bit period (34 bits x 1 ms/bit).
pub const FRAME_ON_WIRE_MS: u32 = 34;

/// Live, mutable intercept policy configuration.
///
/// This is the `{enabled, demand_tset, demand_ch, demand_dhw,
/// intercept_every_n, fallback_after_ms}` record from the data model,
/// plus the injectable override-ID set the open questions in §9 call
/// for. It is wrapped by [`crate::intercept::InterceptPolicy`], which
/// adds the guard and the live tick/fallback state; this struct is the
/// part external callers actually set via the control-plane API.
#[derive(Debug, Clone)]
pub struct InterceptConfig {
	pub enabled: bool,
	pub demand_tset: Option<f32>,
	pub demand_ch: bool,
	pub demand_dhw: bool,
	pub intercept_every_n: u16,
	pub fallback_after_ms: u32,
	pub override_ids: Vec<u8, MAX_OVERRIDE_IDS>,
}

impl InterceptConfig {
	/// The documented default: interception disabled, targeting
	/// `{STATUS, TSET}`, with a 30 s fallback window and no demand set
	/// yet.
	pub fn default_targeting_status_and_tset() -> InterceptConfig {
		let mut override_ids = Vec::new();
		// Capacity is MAX_OVERRIDE_IDS >= 2; this cannot fail.
		let _ = override_ids.push(data_id::STATUS);
		let _ = override_ids.push(data_id::TSET);
		InterceptConfig {
			enabled: false,
			demand_tset: None,
			demand_ch: false,
			demand_dhw: false,
			intercept_every_n: 1,
			fallback_after_ms: 30_000,
			override_ids,
		}
	}

	pub fn targets(&self, id: u8) -> bool {
		self.override_ids.contains(&id)
	}

	/// Adds a data ID to the override set. The default set the open
	/// questions in §9 settle on is `{STATUS, TSET}`, but the set is
	/// injectable — a caller who wants to additionally clamp, say,
	/// `REL_MOD_LEVEL` can add it here.
	pub fn add_override_id(&mut self, id: u8) -> Result<(), ConfigError> {
		self.override_ids.push(id).map_err(|_| {
			let err = ConfigError::TooManyOverrideIds {
				max: MAX_OVERRIDE_IDS,
			};
			error!("config: {err}");
			err
		})
	}
}

impl Default for InterceptConfig {
	fn default() -> Self {
		InterceptConfig::default_targeting_status_and_tset()
	}
}

/// Top-level, validated configuration for the whole gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
	pub post_tx_delay_slave_ms: u32,
	pub post_tx_delay_master_ms: u32,
	pub receive_start_timeout_ms: u32,
	pub total_frame_timeout_ms: u32,
	pub thermostat_receive_timeout_ms: u32,
	pub thermostat_response_timeout_ms: u32,
	pub boiler_receive_timeout_ms: u32,
	pub coordinator_poll_interval_ms: u32,
	/// Every N coordinator ticks with no active thermostat request, a
	/// round-robin diagnostics probe is injected. `None` disables the
	/// probe.
	pub diagnostics_probe_every_n_ticks: Option<u32>,
	pub intercept: InterceptConfig,
}

impl Default for GatewayConfig {
	fn default() -> Self {
		GatewayConfig {
			post_tx_delay_slave_ms: POST_TX_DELAY_SLAVE_MS,
			post_tx_delay_master_ms: POST_TX_DELAY_MASTER_MS,
			receive_start_timeout_ms: RECEIVE_START_TIMEOUT_MS,
			total_frame_timeout_ms: TOTAL_FRAME_TIMEOUT_MS,
			thermostat_receive_timeout_ms: THERMOSTAT_RECEIVE_TIMEOUT_MS,
			thermostat_response_timeout_ms: THERMOSTAT_RESPONSE_TIMEOUT_MS,
			boiler_receive_timeout_ms: BOILER_RECEIVE_TIMEOUT_MS,
			coordinator_poll_interval_ms: COORDINATOR_POLL_INTERVAL_MS,
			diagnostics_probe_every_n_ticks: None,
			intercept: InterceptConfig::default(),
		}
	}
}

impl GatewayConfig {
	/// Checks the invariants the core relies on: no zero-length
	/// timeout, and the total-frame timeout must be able to physically
	/// fit a frame on the wire.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.total_frame_timeout_ms < FRAME_ON_WIRE_MS {
			let err = ConfigError::InvalidTiming(
				"total_frame_timeout_ms shorter than one frame's on-wire time",
			);
			error!("config: {err}");
			return Err(err);
		}
		if self.receive_start_timeout_ms == 0
			|| self.thermostat_receive_timeout_ms == 0
			|| self.thermostat_response_timeout_ms == 0
			|| self.boiler_receive_timeout_ms == 0
			|| self.coordinator_poll_interval_ms == 0
		{
			let err = ConfigError::InvalidTiming("a configured timeout or poll interval was zero");
			error!("config: {err}");
			return Err(err);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_valid() {
		GatewayConfig::default().validate().unwrap();
	}

	#[test]
	fn default_targets_status_and_tset() {
		let cfg = InterceptConfig::default();
		assert!(cfg.targets(data_id::STATUS));
		assert!(cfg.targets(data_id::TSET));
		assert!(!cfg.targets(25));
	}

	#[test]
	fn zero_timeout_is_rejected() {
		let mut cfg = GatewayConfig::default();
		cfg.boiler_receive_timeout_ms = 0;
		assert!(cfg.validate().is_err());
	}

	#[test]
	fn total_frame_timeout_below_wire_time_is_rejected() {
		let mut cfg = GatewayConfig::default();
		cfg.total_frame_timeout_ms = 10;
		assert!(cfg.validate().is_err());
	}
}
