//! The diagnostics cache: a flat, data-ID-indexed snapshot of every
//! frame the gateway has observed, for out-of-band consumers (an HTTP
//! handler, an MQTT publisher — both out of scope here) to read
//! without touching the hot path.
//!
//! The re-architecture guidance calls for a flat array instead of a
//! hash map: OpenTherm data IDs are a single byte, so `[Option<DiagEntry>;
//! 256]` is both the simplest and the most cache-friendly
//! representation, with none of a hash map's allocation or collision
//! handling.

use crate::clock::Clock;
use crate::frame::{data_id, Frame, MessageType};

/// A decoded data value, interpreted according to the data ID's known
/// wire encoding. Unrecognised IDs are stored as
/// [`Decoded::RawValue`] only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
	/// s8.8 fixed-point, the encoding used by most temperature/pressure
	/// IDs.
	Temperature(f32),
	/// A flag byte pair, as used by `STATUS`.
	Flags(u8, u8),
	/// A plain `u16` counter (burner starts/hours).
	Counter(u16),
	/// No decoding is known for this ID; only the raw 16-bit value is
	/// recorded.
	RawValue(u16),
}

fn decode_value(id: u8, raw: u16) -> Decoded {
	match id {
		data_id::STATUS => {
			let hi = (raw >> 8) as u8;
			let lo = raw as u8;
			Decoded::Flags(hi, lo)
		}
		data_id::TSET | data_id::TBOILER | data_id::TRET | data_id::REL_MOD_LEVEL
		| data_id::CH_PRESSURE | data_id::DHW_FLOW_RATE => {
			Decoded::Temperature((raw as i16) as f32 / 256.0)
		}
		data_id::BURNER_STARTS | data_id::BURNER_HOURS => Decoded::Counter(raw),
		_ => Decoded::RawValue(raw),
	}
}

/// One cached observation: the last frame seen for a data ID, how it
/// was decoded, when it was observed, and whether the slave considered
/// the value valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagEntry {
	pub data_id: u8,
	pub raw_value: u16,
	pub decoded: Decoded,
	pub observed_at_ms: u64,
	pub valid: bool,
}

/// A 256-slot, data-ID-indexed cache of the most recent observation
/// for each ID.
pub struct DiagnosticsCache {
	entries: [Option<DiagEntry>; 256],
}

impl DiagnosticsCache {
	pub const fn new() -> DiagnosticsCache {
		DiagnosticsCache {
			entries: [None; 256],
		}
	}

	/// Folds one observed frame into the cache. `valid` should be
	/// `false` for a slave's `DATA_INVALID`/`UNKNOWN_DATA_ID` reply —
	/// the raw value is still recorded, but callers reading
	/// [`DiagEntry::valid`] know not to trust it.
	pub fn record<C: Clock>(&mut self, clock: &C, frame: Frame, valid: bool) {
		let id = frame.data_id();
		let raw = frame.data_value();
		self.entries[id as usize] = Some(DiagEntry {
			data_id: id,
			raw_value: raw,
			decoded: decode_value(id, raw),
			observed_at_ms: clock.now_ms(),
			valid,
		});
		trace!("diagnostics: recorded data ID {id} = {raw:#06x} (valid={valid})");
	}

	/// Records a frame observed on the wire, inferring validity from
	/// its message type (a slave reply of `DATA_INVALID` or
	/// `UNKNOWN_DATA_ID` marks the entry invalid; everything else is
	/// valid).
	pub fn observe<C: Clock>(&mut self, clock: &C, frame: Frame) {
		let valid = !matches!(
			frame.message_type(),
			MessageType::DataInvalid | MessageType::UnknownDataId
		);
		self.record(clock, frame, valid);
	}

	pub fn get(&self, id: u8) -> Option<&DiagEntry> {
		self.entries[id as usize].as_ref()
	}

	/// Iterates every populated slot, in data-ID order, for a full
	/// snapshot export.
	pub fn iter(&self) -> impl Iterator<Item = &DiagEntry> {
		self.entries.iter().filter_map(|slot| slot.as_ref())
	}
}

impl Default for DiagnosticsCache {
	fn default() -> Self {
		DiagnosticsCache::new()
	}
}
