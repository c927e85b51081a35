//! The two bus-facing tasks.
//!
//! Both are plain blocking functions, generic over a [`crate::bus::BusPort`]
//! and a [`crate::clock::Clock`], meant to be handed to whatever task
//! spawner the embedding firmware uses (see the crate-level concurrency
//! notes). Neither task talks to the other directly; they couple
//! through the single-slot [`crate::mailbox::Mailbox`]es the caller
//! wires up alongside [`crate::coordinator::GatewayCoordinator`].

pub mod boiler;
pub mod thermostat;

use core::sync::atomic::{AtomicBool, Ordering};

/// Polled between loop iterations by every task; set by whoever owns
/// the gateway's lifecycle to request a clean stop.
pub struct ShutdownFlag(AtomicBool);

impl ShutdownFlag {
	pub const fn new() -> ShutdownFlag {
		ShutdownFlag(AtomicBool::new(false))
	}

	pub fn request(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_requested(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

impl Default for ShutdownFlag {
	fn default() -> Self {
		ShutdownFlag::new()
	}
}
