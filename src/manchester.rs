//! Manchester encoding and decoding of a 34-bit OpenTherm frame.
//!
//! These are pure functions over an abstract pulse sequence; they never
//! touch a GPIO pin. [`crate::bus::software`] and [`crate::bus::hardware`]
//! call into this module from the two codec paths the teacher's RMT vs.
//! GPIO-interrupt split inspired (see the crate-level re-architecture
//! notes), but the decode algorithm itself is shared.

use crate::frame::Frame;

/// The level driven on the wire during a half-bit period. The line idles
/// high; OpenTherm's "active" (logic) state is driven low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
	Low,
	High,
}

/// One run-length-encoded pulse as captured by the RX path: the line held
/// `level` for `duration_us` microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
	pub level: Level,
	pub duration_us: u32,
}

/// Half-bit period, nominal.
pub const HALF_BIT_US: u32 = 500;
/// Full-bit period, nominal.
pub const BIT_US: u32 = 1000;

/// Inclusive lower/upper bounds accepted for a single half-bit run.
pub const HALF_BIT_MIN_US: u32 = 400;
pub const HALF_BIT_MAX_US: u32 = 600;
/// Inclusive lower/upper bounds accepted for a double-length (one full
/// bit) run.
pub const FULL_RUN_MIN_US: u32 = 800;
pub const FULL_RUN_MAX_US: u32 = 1200;

/// Number of Manchester-encoded bits in one frame: start (1) + 32 data
/// bits + stop (1).
pub const FRAME_BITS: usize = 34;
/// Number of half-bit symbols in one fully encoded frame.
pub const FRAME_HALF_BITS: usize = FRAME_BITS * 2;

/// Reasons [`decode`] rejected a pulse sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
	/// Fewer half-bits were captured than the minimum needed for a full
	/// frame under either phase alignment.
	#[error("captured {got} half-bits, need at least {FRAME_HALF_BITS}")]
	InvalidSize { got: usize },
	/// Neither phase alignment produced a frame with a valid start bit,
	/// stop bit, and parity.
	#[error("no phase alignment validated (start/stop/parity)")]
	Invalid,
}

/// Encodes `frame` into its 34-symbol on-wire Manchester sequence: start
/// bit, 32 data bits MSB-first, stop bit. Each bit becomes two
/// half-symbols of opposite polarity; "1" is low→high (active-to-idle),
/// "0" is high→low.
pub fn encode(frame: Frame) -> [Pulse; FRAME_HALF_BITS] {
	let mut bits = [false; FRAME_BITS];
	bits[0] = true; // start bit
	for i in 0..32 {
		bits[1 + i] = (frame.raw() >> (31 - i)) & 1 == 1;
	}
	bits[33] = true; // stop bit

	let mut pulses = [Pulse {
		level: Level::High,
		duration_us: HALF_BIT_US,
	}; FRAME_HALF_BITS];
	for (i, &bit) in bits.iter().enumerate() {
		// "1" = low->high transition at mid-bit; "0" = high->low.
		let (first, second) = if bit {
			(Level::Low, Level::High)
		} else {
			(Level::High, Level::Low)
		};
		pulses[2 * i] = Pulse {
			level: first,
			duration_us: HALF_BIT_US,
		};
		pulses[2 * i + 1] = Pulse {
			level: second,
			duration_us: HALF_BIT_US,
		};
	}
	pulses
}

/// Classifies one captured run into 1 or 2 half-bits of its level.
/// Returns `None` for an out-of-range duration.
fn classify_run(duration_us: u32) -> Option<u8> {
	if (HALF_BIT_MIN_US..=HALF_BIT_MAX_US).contains(&duration_us) {
		Some(1)
	} else if (FULL_RUN_MIN_US..=FULL_RUN_MAX_US).contains(&duration_us) {
		Some(2)
	} else {
		None
	}
}

/// Expands a captured run-length pulse sequence into a flat half-bit
/// level vector, counting (but not aborting on) out-of-range runs.
///
/// Returns the half-bit vector and the number of runs whose duration
/// fell outside both the short and long acceptance windows.
fn expand_half_bits(pulses: &[Pulse]) -> (heapless::Vec<Level, { FRAME_HALF_BITS + 8 }>, u32) {
	let mut half_bits = heapless::Vec::new();
	let mut errors = 0u32;
	for pulse in pulses {
		match classify_run(pulse.duration_us) {
			Some(count) => {
				for _ in 0..count {
					// Capacity is sized generously above FRAME_HALF_BITS;
					// a legitimate frame never overflows it. A pathological
					// capture that does simply stops contributing further
					// half-bits rather than panicking.
					let _ = half_bits.push(pulse.level);
				}
			}
			None => {
				errors += 1;
				trace!(
					"manchester: out-of-range run {} us (level {:?})",
					pulse.duration_us,
					pulse.level
				);
			}
		}
	}
	(half_bits, errors)
}

/// Tries to parse 34 bits out of `half_bits` starting at `phase` (0 or 1),
/// pairing `(half_bits[phase + 2k], half_bits[phase + 2k + 1])` as bit
/// `k`. Returns `None` if the half-bit count is insufficient or any pair
/// is not a legal Manchester transition.
fn try_phase(half_bits: &[Level], phase: usize) -> Option<[bool; FRAME_BITS]> {
	if half_bits.len() < phase + FRAME_HALF_BITS {
		return None;
	}
	let mut bits = [false; FRAME_BITS];
	for k in 0..FRAME_BITS {
		let a = half_bits[phase + 2 * k];
		let b = half_bits[phase + 2 * k + 1];
		bits[k] = match (a, b) {
			(Level::Low, Level::High) => true,
			(Level::High, Level::Low) => false,
			// Illegal pair: both halves at the same level. Not a
			// Manchester transition.
			_ => return None,
		};
	}
	Some(bits)
}

/// Checks whether a parsed 34-bit sequence is structurally a valid
/// frame: start bit set, stop bit set, and odd parity over the 32 data
/// bits (parity bit is data bit 31, the MSB).
fn validate_bits(bits: &[bool; FRAME_BITS]) -> Option<Frame> {
	if !bits[0] || !bits[33] {
		return None;
	}
	let mut raw: u32 = 0;
	for i in 0..32 {
		if bits[1 + i] {
			raw |= 1 << (31 - i);
		}
	}
	let frame = Frame::from_raw(raw);
	if frame.parity_ok() {
		Some(frame)
	} else {
		None
	}
}

/// Decodes a captured run-length pulse sequence into a [`Frame`],
/// trying both possible phase alignments (see module docs and the
/// "Manchester dual-phase" test scenario) and accepting whichever one
/// yields a structurally valid frame.
pub fn decode(pulses: &[Pulse]) -> Result<Frame, DecodeError> {
	let (half_bits, out_of_range) = expand_half_bits(pulses);
	if out_of_range > 0 {
		debug!("manchester: {out_of_range} out-of-range run(s) in capture");
	}
	if half_bits.len() < FRAME_HALF_BITS {
		return Err(DecodeError::InvalidSize {
			got: half_bits.len(),
		});
	}

	for phase in [0usize, 1usize] {
		if let Some(bits) = try_phase(&half_bits, phase) {
			if let Some(frame) = validate_bits(&bits) {
				trace!("manchester: decoded at phase {phase}");
				return Ok(frame);
			}
		}
	}
	Err(DecodeError::Invalid)
}
