//! Single-field pack/unpack: one [`Padder`], one interpreter and one [`Prefixer`] composed
//! into a [`FieldCodec`].
//!
//! Pack writes `prefix(units) ++ interpret(pad(value))`; unpack reads the prefix (or uses
//! `max_length` for fixed fields), uninterprets that many units and strips the padding.
//! A failed pack leaves the output buffer exactly as it was before the call.

use crate::interpreter::{BinaryInterpreter, Interpreter};
use crate::padder::Padder;
use crate::prefixer::Prefixer;
use crate::tagged::TagSpec;
use crate::value::FieldValue;
use std::borrow::Cow;
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Configuration: {0}")]
    Configuration(String),
    #[error("Length {length} exceeds maximum {max}")]
    LengthExceeded { length: usize, max: usize },
    #[error("Fixed-length field: got {length} units, expected {expected}")]
    FixedLengthMismatch { length: usize, expected: usize },
    #[error("Truncated input: need {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },
    #[error("Invalid digit {byte:#04x} at offset {position}")]
    InvalidDigit { byte: u8, position: usize },
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("Length {length} does not fit the prefix (max {max})")]
    InvalidPrefix { length: usize, max: usize },
    #[error("Schema: {0}")]
    Schema(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Borrow `needed` bytes at `offset`, or fail with [`CodecError::TruncatedInput`].
pub(crate) fn take(buf: &[u8], offset: usize, needed: usize) -> Result<&[u8], CodecError> {
    offset
        .checked_add(needed)
        .and_then(|end| buf.get(offset..end))
        .ok_or(CodecError::TruncatedInput {
            needed,
            available: buf.len().saturating_sub(offset),
        })
}

/// Value encoding of a field: text through an [`Interpreter`], bytes through a
/// [`BinaryInterpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Text(Interpreter),
    Binary(BinaryInterpreter),
}

impl Encoding {
    pub fn packed_length(&self, units: usize) -> usize {
        match self {
            Encoding::Text(i) => i.packed_length(units),
            Encoding::Binary(i) => i.packed_length(units),
        }
    }

    pub fn checked_packed_length(&self, units: usize) -> Option<usize> {
        match self {
            Encoding::Text(i) => i.checked_packed_length(units),
            Encoding::Binary(i) => i.checked_packed_length(units),
        }
    }
}

/// Field definition: everything a codec needs, validated by [`FieldCodec::new`] or
/// [`crate::tagged::TaggedFieldCodec::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Maximum logical units (chars for text, bytes for binary). Exact width when the
    /// prefixer is [`Prefixer::None`].
    pub max_length: usize,
    pub description: String,
    pub padder: Padder,
    pub encoding: Encoding,
    pub prefixer: Prefixer,
    pub tag: Option<TagSpec>,
}

impl FieldSpec {
    pub fn text(
        max_length: usize,
        description: impl Into<String>,
        padder: Padder,
        interpreter: Interpreter,
        prefixer: Prefixer,
    ) -> Self {
        FieldSpec {
            max_length,
            description: description.into(),
            padder,
            encoding: Encoding::Text(interpreter),
            prefixer,
            tag: None,
        }
    }

    pub fn binary(
        max_length: usize,
        description: impl Into<String>,
        interpreter: BinaryInterpreter,
        prefixer: Prefixer,
    ) -> Self {
        FieldSpec {
            max_length,
            description: description.into(),
            padder: Padder::None,
            encoding: Encoding::Binary(interpreter),
            prefixer,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: TagSpec) -> Self {
        self.tag = Some(tag);
        self
    }
}

pub(crate) enum Payload<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

impl<'a> Payload<'a> {
    pub(crate) fn from_value(value: &'a FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Text(s) => Ok(Payload::Text(s)),
            FieldValue::Binary(b) => Ok(Payload::Binary(b)),
            other => Err(CodecError::InvalidEncoding(format!(
                "{} value cannot be packed by a field codec",
                other.kind()
            ))),
        }
    }
}

/// Validated, immutable single-field codec.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCodec {
    spec: FieldSpec,
}

impl FieldCodec {
    pub fn new(spec: FieldSpec) -> Result<Self, CodecError> {
        if spec.tag.is_some() {
            return Err(CodecError::Configuration(format!(
                "{}: tagged definition needs a TaggedFieldCodec",
                spec.description
            )));
        }
        Self::validated(spec, 0)
    }

    /// `extra_units` are header units the prefix also counts (a tag inside the length).
    pub(crate) fn validated(spec: FieldSpec, extra_units: usize) -> Result<Self, CodecError> {
        spec.prefixer.validate()?;
        if spec.max_length == 0 {
            return Err(CodecError::Configuration(format!(
                "{}: max length must be positive",
                spec.description
            )));
        }
        let capacity = spec.prefixer.max_length();
        if spec.max_length.saturating_add(extra_units) > capacity {
            return Err(CodecError::Configuration(format!(
                "{}: max length {} exceeds prefix capacity {}",
                spec.description,
                spec.max_length.saturating_add(extra_units),
                capacity
            )));
        }
        // every packed size below is bounded by this one
        let packed = spec
            .encoding
            .checked_packed_length(spec.max_length)
            .and_then(|n| n.checked_add(spec.prefixer.packed_length()));
        if packed.is_none() {
            return Err(CodecError::Configuration(format!(
                "{}: max length {} overflows the packed size",
                spec.description, spec.max_length
            )));
        }
        if matches!(spec.encoding, Encoding::Binary(_)) && spec.padder != Padder::None {
            return Err(CodecError::Configuration(format!(
                "{}: binary fields take no padder",
                spec.description
            )));
        }
        Ok(FieldCodec { spec })
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    pub fn max_length(&self) -> usize {
        self.spec.max_length
    }

    pub fn is_fixed(&self) -> bool {
        self.spec.prefixer == Prefixer::None
    }

    pub fn max_packed_length(&self) -> usize {
        self.spec.prefixer.packed_length() + self.spec.encoding.packed_length(self.spec.max_length)
    }

    /// New codec with a different padder; `self` is untouched.
    pub fn with_padder(&self, padder: Padder) -> Result<Self, CodecError> {
        FieldCodec::new(FieldSpec { padder, ..self.spec.clone() })
    }

    pub fn with_encoding(&self, encoding: Encoding) -> Result<Self, CodecError> {
        FieldCodec::new(FieldSpec { encoding, ..self.spec.clone() })
    }

    pub fn with_prefixer(&self, prefixer: Prefixer) -> Result<Self, CodecError> {
        FieldCodec::new(FieldSpec { prefixer, ..self.spec.clone() })
    }

    /// Pack a text value; returns bytes appended to `out`.
    pub fn pack_str(&self, value: &str, out: &mut Vec<u8>) -> Result<usize, CodecError> {
        self.pack_framed(Payload::Text(value), &[], 0, out)
    }

    pub fn pack_bytes(&self, value: &[u8], out: &mut Vec<u8>) -> Result<usize, CodecError> {
        self.pack_framed(Payload::Binary(value), &[], 0, out)
    }

    pub fn pack(&self, value: &FieldValue, out: &mut Vec<u8>) -> Result<usize, CodecError> {
        self.pack_framed(Payload::from_value(value)?, &[], 0, out)
    }

    /// Decode the text value at `offset`; returns the value and bytes consumed.
    pub fn unpack_str(&self, buf: &[u8], offset: usize) -> Result<(String, usize), CodecError> {
        match self.unpack_framed(buf, offset, 0, 0)? {
            (FieldValue::Text(s), n) => Ok((s, n)),
            (other, _) => Err(self.kind_mismatch("text", &other)),
        }
    }

    pub fn unpack_bytes(&self, buf: &[u8], offset: usize) -> Result<(Vec<u8>, usize), CodecError> {
        match self.unpack_framed(buf, offset, 0, 0)? {
            (FieldValue::Binary(b), n) => Ok((b, n)),
            (other, _) => Err(self.kind_mismatch("binary", &other)),
        }
    }

    pub fn unpack(&self, buf: &[u8], offset: usize) -> Result<(FieldValue, usize), CodecError> {
        self.unpack_framed(buf, offset, 0, 0)
    }

    /// Bytes the field at `offset` occupies, read from the prefix alone (the value is not
    /// decoded). Fails like `unpack` when the buffer is too short.
    pub fn extent(&self, buf: &[u8], offset: usize) -> Result<usize, CodecError> {
        let units = self.decode_units(buf, offset, 0)?;
        let total = self.spec.prefixer.packed_length() + self.spec.encoding.packed_length(units);
        take(buf, offset, total)?;
        Ok(total)
    }

    /// Pack with `lead` bytes between the prefix and the value; the prefix counts
    /// `lead_units` on top of the value's units.
    pub(crate) fn pack_framed(
        &self,
        payload: Payload<'_>,
        lead: &[u8],
        lead_units: usize,
        out: &mut Vec<u8>,
    ) -> Result<usize, CodecError> {
        let start = out.len();
        match self.write_framed(payload, lead, lead_units, out) {
            Ok(units) => {
                let written = out.len() - start;
                trace!(field = %self.spec.description, units, bytes = written, "packed field");
                Ok(written)
            }
            Err(e) => {
                out.truncate(start);
                Err(e)
            }
        }
    }

    fn write_framed(
        &self,
        payload: Payload<'_>,
        lead: &[u8],
        lead_units: usize,
        out: &mut Vec<u8>,
    ) -> Result<usize, CodecError> {
        match (payload, self.spec.encoding) {
            (Payload::Text(value), Encoding::Text(interpreter)) => {
                let (negative, digits) = interpreter.split_sign(value);
                let padded = match self.spec.padder.pad(digits, self.spec.max_length)? {
                    padded if negative => Cow::Owned(format!("-{}", padded)),
                    padded => padded,
                };
                let units = interpreter.unit_length(&padded);
                self.check_units(units)?;
                self.spec.prefixer.encode_length(units + lead_units, out)?;
                out.extend_from_slice(lead);
                interpreter.interpret(&padded, out)?;
                Ok(units)
            }
            (Payload::Binary(value), Encoding::Binary(interpreter)) => {
                let units = value.len();
                self.check_units(units)?;
                self.spec.prefixer.encode_length(units + lead_units, out)?;
                out.extend_from_slice(lead);
                interpreter.interpret(value, out);
                Ok(units)
            }
            (Payload::Text(_), Encoding::Binary(_)) => Err(CodecError::InvalidEncoding(format!(
                "{}: binary field given a text value",
                self.spec.description
            ))),
            (Payload::Binary(_), Encoding::Text(_)) => Err(CodecError::InvalidEncoding(format!(
                "{}: text field given a binary value",
                self.spec.description
            ))),
        }
    }

    fn check_units(&self, units: usize) -> Result<(), CodecError> {
        let max = self.spec.max_length;
        if units > max {
            return Err(CodecError::LengthExceeded { length: units, max });
        }
        if self.is_fixed() && units != max {
            return Err(CodecError::FixedLengthMismatch { length: units, expected: max });
        }
        Ok(())
    }

    fn decode_units(&self, buf: &[u8], offset: usize, lead_units: usize) -> Result<usize, CodecError> {
        let units = match self.spec.prefixer.decode_length(buf, offset)? {
            None => return Ok(self.spec.max_length),
            Some(declared) => declared.checked_sub(lead_units).ok_or_else(|| {
                CodecError::InvalidEncoding(format!(
                    "{}: declared length {} is shorter than its {}-unit header",
                    self.spec.description, declared, lead_units
                ))
            })?,
        };
        if units > self.spec.max_length {
            return Err(CodecError::LengthExceeded { length: units, max: self.spec.max_length });
        }
        Ok(units)
    }

    /// Unpack where `lead_len` bytes (counted as `lead_units` by the prefix) sit between the
    /// prefix and the value. The lead bytes are skipped, not decoded.
    pub(crate) fn unpack_framed(
        &self,
        buf: &[u8],
        offset: usize,
        lead_len: usize,
        lead_units: usize,
    ) -> Result<(FieldValue, usize), CodecError> {
        let units = self.decode_units(buf, offset, lead_units)?;
        let value_offset = offset + self.spec.prefixer.packed_length() + lead_len;
        let value = match self.spec.encoding {
            Encoding::Text(interpreter) => {
                let raw = interpreter.uninterpret(buf, value_offset, units)?;
                FieldValue::Text(self.spec.padder.unpad(&raw).to_string())
            }
            Encoding::Binary(interpreter) => {
                FieldValue::Binary(interpreter.uninterpret(buf, value_offset, units)?)
            }
        };
        let consumed = value_offset - offset + self.spec.encoding.packed_length(units);
        trace!(field = %self.spec.description, units, bytes = consumed, "unpacked field");
        Ok((value, consumed))
    }

    fn kind_mismatch(&self, wanted: &str, got: &FieldValue) -> CodecError {
        CodecError::InvalidEncoding(format!(
            "{}: expected a {} value, field decodes to {}",
            self.spec.description,
            wanted,
            got.kind()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llvar_ascii(max: usize) -> FieldCodec {
        FieldCodec::new(FieldSpec::text(max, "LLVAR", Padder::None, Interpreter::Ascii, Prefixer::LL))
            .expect("codec")
    }

    #[test]
    fn pack_then_unpack_llvar() {
        let codec = llvar_ascii(19);
        let mut out = Vec::new();
        assert_eq!(codec.pack_str("4111111111111111", &mut out).unwrap(), 18);
        assert_eq!(out, b"164111111111111111".to_vec());
        assert_eq!(codec.unpack_str(&out, 0).unwrap(), ("4111111111111111".to_string(), 18));
        assert_eq!(codec.extent(&out, 0).unwrap(), 18);
    }

    #[test]
    fn failed_pack_leaves_buffer_untouched() {
        let codec = llvar_ascii(5);
        let mut out = b"HEAD".to_vec();
        assert!(matches!(
            codec.pack_str("TOOLONG", &mut out),
            Err(CodecError::LengthExceeded { length: 7, max: 5 })
        ));
        assert_eq!(out, b"HEAD".to_vec());
        // interpreter failure after the prefix was written is rolled back too
        assert!(codec.pack_str("\u{e9}", &mut out).is_err());
        assert_eq!(out, b"HEAD".to_vec());
    }

    #[test]
    fn capacity_checked_at_construction() {
        let err = FieldCodec::new(FieldSpec::text(100, "X", Padder::None, Interpreter::Ascii, Prefixer::LL));
        assert!(matches!(err, Err(CodecError::Configuration(_))));
        let err = FieldCodec::new(FieldSpec::binary(256, "B", BinaryInterpreter::Literal, Prefixer::BinaryBigEndian(1)));
        assert!(matches!(err, Err(CodecError::Configuration(_))));
    }

    #[test]
    fn fixed_field_requires_full_width() {
        let codec = FieldCodec::new(FieldSpec::text(4, "MTI", Padder::None, Interpreter::Ascii, Prefixer::None))
            .unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            codec.pack_str("02", &mut out),
            Err(CodecError::FixedLengthMismatch { length: 2, expected: 4 })
        ));
        codec.pack_str("0200", &mut out).unwrap();
        assert_eq!(out, b"0200".to_vec());
    }

    #[test]
    fn decoded_length_above_max_is_rejected() {
        let codec = llvar_ascii(5);
        assert!(matches!(
            codec.unpack_str(b"06ABCDEF", 0),
            Err(CodecError::LengthExceeded { length: 6, max: 5 })
        ));
    }

    #[test]
    fn with_methods_build_new_codecs() {
        let left = FieldCodec::new(FieldSpec::text(3, "AMT", Padder::None, Interpreter::BCD_LEFT, Prefixer::BcdDigits(2)))
            .unwrap();
        let right = left.with_encoding(Encoding::Text(Interpreter::BCD_RIGHT)).unwrap();
        let (mut a, mut b) = (Vec::new(), Vec::new());
        left.pack_str("123", &mut a).unwrap();
        right.pack_str("123", &mut b).unwrap();
        assert_eq!(a, vec![0x03, 0x01, 0x23]);
        assert_eq!(b, vec![0x03, 0x12, 0x30]);
        assert!(left.with_prefixer(Prefixer::AsciiDigits(0)).is_err());
    }

    #[test]
    fn packed_size_overflow_rejected_at_construction() {
        for interpreter in [Interpreter::BCD_RIGHT, Interpreter::HexAscii] {
            let err = FieldCodec::new(FieldSpec::text(usize::MAX, "HUGE", Padder::None, interpreter, Prefixer::None));
            assert!(matches!(err, Err(CodecError::Configuration(_))), "{:?}", interpreter);
        }
        let err = FieldCodec::new(FieldSpec::binary(usize::MAX, "HUGE", BinaryInterpreter::AsciiHex, Prefixer::None));
        assert!(matches!(err, Err(CodecError::Configuration(_))));
        // a literal field of the same width still fits
        let literal = FieldCodec::new(FieldSpec::binary(usize::MAX, "RAW", BinaryInterpreter::Literal, Prefixer::None))
            .unwrap();
        assert_eq!(literal.max_packed_length(), usize::MAX);
        assert!(matches!(literal.unpack_bytes(b"12", 0), Err(CodecError::TruncatedInput { .. })));
    }

    #[test]
    fn signed_field_pads_digits_only() {
        let fixed = FieldCodec::new(FieldSpec::text(5, "AMT", Padder::LEFT_ZERO, Interpreter::SignedEbcdic, Prefixer::None))
            .unwrap();
        let mut out = Vec::new();
        assert_eq!(fixed.pack_str("-123", &mut out).unwrap(), 5);
        assert_eq!(out, vec![0xF0, 0xF0, 0xF1, 0xF2, 0xD3]);
        assert_eq!(fixed.unpack_str(&out, 0).unwrap(), ("-00123".to_string(), 5));

        let var = FieldCodec::new(FieldSpec::text(3, "AMT", Padder::RIGHT_SPACE, Interpreter::SignedEbcdic, Prefixer::LL))
            .unwrap();
        out.clear();
        var.pack_str("-123", &mut out).unwrap();
        assert_eq!(out, vec![b'0', b'3', 0xF1, 0xF2, 0xD3]);
        assert_eq!(var.unpack_str(&out, 0).unwrap(), ("-123".to_string(), 5));
        assert!(matches!(
            var.pack_str("-1234", &mut out),
            Err(CodecError::LengthExceeded { length: 4, max: 3 })
        ));
    }

    #[test]
    fn value_kind_mismatch() {
        let codec = llvar_ascii(5);
        let mut out = Vec::new();
        assert!(matches!(codec.pack_bytes(&[1, 2], &mut out), Err(CodecError::InvalidEncoding(_))));
        assert!(out.is_empty());
    }
}
