//! The 32-bit OpenTherm payload and its bit layout.
//!
//! A [`Frame`] is an immutable wrapper around the `u32` payload carried by
//! one on-wire Manchester frame (the 32 data bits between the start and
//! stop bit). It never touches the wire itself — [`crate::manchester`]
//! and [`crate::bus`] do that — so it can be built, inspected, and
//! round-tripped with no hardware in play.

use bit_field::BitField;

/// Master → slave and slave → master message kinds, bits 28–30.
///
/// The numeric values are the wire encoding, MSB-first within the 3-bit
/// field, exactly as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
	/// Master requests a read of `data_id`.
	ReadData = 0b000,
	/// Master requests a write of `data_value` to `data_id`.
	WriteData = 0b001,
	/// Master reserved/invalid-data indication.
	InvalidData = 0b010,
	/// Reserved for future use.
	Reserved = 0b011,
	/// Slave acknowledges a read with `data_value`.
	ReadAck = 0b100,
	/// Slave acknowledges a write.
	WriteAck = 0b101,
	/// Slave reports the data as invalid/unsupported right now.
	DataInvalid = 0b110,
	/// Slave does not recognise `data_id`.
	UnknownDataId = 0b111,
}

impl MessageType {
	/// Decodes the 3-bit wire value. All 8 values are valid message
	/// types, so this never fails.
	pub const fn from_bits(bits: u8) -> MessageType {
		match bits & 0b111 {
			0b000 => MessageType::ReadData,
			0b001 => MessageType::WriteData,
			0b010 => MessageType::InvalidData,
			0b011 => MessageType::Reserved,
			0b100 => MessageType::ReadAck,
			0b101 => MessageType::WriteAck,
			0b110 => MessageType::DataInvalid,
			_ => MessageType::UnknownDataId,
		}
	}

	/// True for the two message types a thermostat (bus master) may send.
	pub const fn is_request_kind(self) -> bool {
		matches!(self, MessageType::ReadData | MessageType::WriteData)
	}

	/// True for the four message types a boiler (bus slave) may send.
	pub const fn is_response_kind(self) -> bool {
		matches!(
			self,
			MessageType::ReadAck
				| MessageType::WriteAck
				| MessageType::DataInvalid
				| MessageType::UnknownDataId
		)
	}
}

/// Well-known data IDs used by the intercept policy.
///
/// OpenTherm defines many more IDs; the core is content-agnostic beyond
/// these two, which the default override set targets (see
/// [`crate::intercept`]).
pub mod data_id {
	/// Master and slave status flags.
	pub const STATUS: u8 = 0;
	/// Control setpoint (room unit desired CH water temperature), s8.8.
	pub const TSET: u8 = 1;
	/// Boiler water temperature, s8.8.
	pub const TBOILER: u8 = 25;
	/// Return water temperature, s8.8.
	pub const TRET: u8 = 28;
	/// Relative modulation level, s8.8 percentage.
	pub const REL_MOD_LEVEL: u8 = 17;
	/// CH water pressure, s8.8 bar.
	pub const CH_PRESSURE: u8 = 18;
	/// DHW flow rate, s8.8 l/min.
	pub const DHW_FLOW_RATE: u8 = 19;
	/// Burner starts, u16 counter.
	pub const BURNER_STARTS: u8 = 116;
	/// Burner operation hours, u16 counter.
	pub const BURNER_HOURS: u8 = 120;
}

/// Bit 8 of the master status byte (`data_value` bits 8–15): central
/// heating enable demand.
pub const STATUS_CH_ENABLE_BIT: usize = 8;
/// Bit 9 of the master status byte: domestic hot water enable demand.
pub const STATUS_DHW_ENABLE_BIT: usize = 9;

bitflags! {
	/// The master's low byte of `data_id::STATUS` (bits 8–15 of
	/// `data_value`): the demand flags a thermostat asserts.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct MasterStatusFlags: u8 {
		const CH_ENABLE = 1 << 0;
		const DHW_ENABLE = 1 << 1;
		const COOLING_ENABLE = 1 << 2;
		const OTC_ACTIVE = 1 << 3;
		const CH2_ENABLE = 1 << 4;
	}

	/// The slave's low byte of `data_id::STATUS` (bits 0–7 of
	/// `data_value`): the boiler's reported condition.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct SlaveStatusFlags: u8 {
		const FAULT = 1 << 0;
		const CH_MODE = 1 << 1;
		const DHW_MODE = 1 << 2;
		const FLAME = 1 << 3;
		const COOLING = 1 << 4;
		const CH2_MODE = 1 << 5;
		const DIAGNOSTIC_EVENT = 1 << 6;
	}
}

/// An immutable 32-bit OpenTherm frame payload.
///
/// Bit layout (bit 31 is the MSB transmitted first on the wire, after the
/// start bit):
///
/// ```text
/// 31    30..28      27..24    23..16    15..0
/// parity msg_type   reserved  data_id   data_value
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(u32);

impl Frame {
	/// Wraps a raw 32-bit payload with no validation. Use
	/// [`Frame::build_request`]/[`Frame::build_response`] to construct a
	/// frame with a correctly computed parity bit.
	pub const fn from_raw(raw: u32) -> Frame {
		Frame(raw)
	}

	/// Returns the raw 32-bit payload.
	pub const fn raw(self) -> u32 {
		self.0
	}

	/// Bit 31: odd-parity bit over bits 0–30.
	pub fn parity_bit(self) -> bool {
		self.0.get_bit(31)
	}

	/// Bits 28–30: the message type.
	pub fn message_type(self) -> MessageType {
		MessageType::from_bits(self.0.get_bits(28..31) as u8)
	}

	/// Bits 16–23: the data ID.
	pub fn data_id(self) -> u8 {
		self.0.get_bits(16..24) as u8
	}

	/// Bits 0–15: the data value, as a raw `u16`.
	pub fn data_value(self) -> u16 {
		self.0.get_bits(0..16) as u16
	}

	/// Interprets [`Frame::data_value`] as an s8.8 fixed-point number
	/// (signed integer part in the high byte, fractional eighths in the
	/// low byte), the encoding OpenTherm uses for most temperatures.
	pub fn data_value_s8_8(self) -> f32 {
		(self.data_value() as i16) as f32 / 256.0
	}

	/// Splits [`Frame::data_value`] into its high and low bytes, the
	/// encoding OpenTherm uses for flag/byte-pair IDs such as `STATUS`.
	pub fn data_value_bytes(self) -> (u8, u8) {
		let v = self.data_value();
		((v >> 8) as u8, v as u8)
	}

	/// `parity_ok = popcount(frame) is odd` (the whole 32-bit word,
	/// including the parity bit itself, carries odd parity).
	pub fn parity_ok(self) -> bool {
		self.0.count_ones() % 2 == 1
	}

	/// Valid-as-request iff parity is correct and the message type is one
	/// a thermostat may send.
	pub fn is_request(self) -> bool {
		self.parity_ok() && self.message_type().is_request_kind()
	}

	/// Valid-as-response iff parity is correct and the message type is
	/// one a boiler may send.
	pub fn is_response(self) -> bool {
		self.parity_ok() && self.message_type().is_response_kind()
	}

	/// Assembles `value | (id << 16) | (type << 28)` and sets bit 31 so
	/// the result carries odd parity. `message_type` is typically
	/// [`MessageType::ReadData`] or [`MessageType::WriteData`], but any
	/// value is accepted — callers constructing a malformed frame on
	/// purpose (e.g. fuzzing the decoder) are not second-guessed here.
	pub fn build(message_type: MessageType, data_id: u8, data_value: u16) -> Frame {
		let mut raw = 0u32;
		raw.set_bits(28..31, message_type as u32);
		raw.set_bits(16..24, data_id as u32);
		raw.set_bits(0..16, data_value as u32);
		if raw.count_ones() % 2 == 0 {
			raw.set_bit(31, true);
		}
		Frame(raw)
	}

	/// Convenience alias for [`Frame::build`] when the caller is building
	/// a master-to-slave request.
	pub fn build_request(message_type: MessageType, data_id: u8, data_value: u16) -> Frame {
		Frame::build(message_type, data_id, data_value)
	}

	/// Convenience alias for [`Frame::build`] when the caller is building
	/// a slave-to-master response.
	pub fn build_response(message_type: MessageType, data_id: u8, data_value: u16) -> Frame {
		Frame::build(message_type, data_id, data_value)
	}

	/// Returns a copy of this frame with `data_value` replaced and
	/// parity recomputed. Used by [`crate::intercept`] to rewrite a
	/// frame in flight without touching its type or ID.
	pub fn with_data_value(self, data_value: u16) -> Frame {
		let mut raw = self.0;
		raw.set_bits(0..16, data_value as u32);
		raw.set_bit(31, false);
		if raw.count_ones() % 2 == 0 {
			raw.set_bit(31, true);
		}
		Frame(raw)
	}

	/// Decodes the high byte of `data_value` as [`MasterStatusFlags`].
	/// Only meaningful when [`Frame::data_id`] is [`data_id::STATUS`].
	pub fn master_status_flags(self) -> MasterStatusFlags {
		let (hi, _lo) = self.data_value_bytes();
		MasterStatusFlags::from_bits_truncate(hi)
	}

	/// Decodes the low byte of `data_value` as [`SlaveStatusFlags`].
	/// Only meaningful when [`Frame::data_id`] is [`data_id::STATUS`].
	pub fn slave_status_flags(self) -> SlaveStatusFlags {
		let (_hi, lo) = self.data_value_bytes();
		SlaveStatusFlags::from_bits_truncate(lo)
	}
}
