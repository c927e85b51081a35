//! A bidirectional OpenTherm bus gateway between a room thermostat and
//! a heating boiler.
//!
//! The crate is the protocol engine only: a Manchester codec
//! ([`manchester`]), a per-port half-duplex state machine
//! ([`bus::state`]), two bus-facing tasks ([`tasks`]), a non-blocking
//! coordinator that couples them with bounded latency
//! ([`coordinator`]), an intercept/override policy ([`intercept`]), and
//! a diagnostics cache ([`diagnostics`]). Wi-Fi, HTTP/MQTT surfaces,
//! firmware update, and persistent configuration storage are all a
//! caller's concern, not this crate's.
//!
//! `no_std`, no allocator required: every buffer in the hot path is a
//! fixed-capacity [`heapless`] container.

#![no_std]
#![warn(rust_2018_idioms)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;

pub mod bus;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod intercept;
pub mod mailbox;
pub mod manchester;
pub mod observer;
pub mod stats;
pub mod tasks;

pub use bus::{BusPort, PortRole, ReceiveOutcome};
pub use clock::Clock;
pub use config::GatewayConfig;
pub use coordinator::{
	ControlStatus, GatewayChannels, GatewayCoordinator, GatewayHandle, GatewayStats,
};
pub use diagnostics::{DiagEntry, Decoded};
pub use error::{BusError, ConfigError};
pub use frame::{Frame, MasterStatusFlags, SlaveStatusFlags};
pub use observer::{Event as ObserverEvent, Observer};
pub use stats::StatsSnapshot;
