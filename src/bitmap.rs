//! Presence bitmaps.
//!
//! Bit `n` (1-based field number) is bit `7 - (n - 1) % 8` of byte `(n - 1) / 8`: the
//! most-significant bit of the first byte is field 1. An extended [`BitmapCodec`] follows
//! the ISO 8583 convention where field 1 flags a secondary 64-bit block and field 65 a
//! tertiary one.

use crate::codec::CodecError;
use crate::interpreter::BinaryInterpreter;
use tracing::{debug, trace};

const BLOCK_BYTES: usize = 8;
const SECONDARY_FLAG: usize = 1;
const TERTIARY_FLAG: usize = 65;

/// Fixed-size set of field-number flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    bytes: Vec<u8>,
}

impl Bitmap {
    /// Empty bitmap holding at least `bits` flags (rounded up to whole bytes).
    pub fn new(bits: usize) -> Self {
        Bitmap { bytes: vec![0; bits.div_ceil(8)] }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Bitmap { bytes }
    }

    /// `flags[i]` is field `i + 1`.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut bitmap = Bitmap::new(flags.len());
        for (i, &on) in flags.iter().enumerate() {
            if on {
                bitmap.bytes[i / 8] |= 0x80 >> (i % 8);
            }
        }
        bitmap
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn set(&mut self, field: usize, on: bool) -> Result<(), CodecError> {
        if field == 0 || field > self.capacity() {
            return Err(CodecError::InvalidEncoding(format!(
                "field {} outside a {}-bit bitmap",
                field,
                self.capacity()
            )));
        }
        let (byte, mask) = ((field - 1) / 8, 0x80u8 >> ((field - 1) % 8));
        if on {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
        Ok(())
    }

    /// False for field 0 and anything past the capacity.
    pub fn get(&self, field: usize) -> bool {
        flag_set(&self.bytes, field)
    }

    /// Set field numbers, ascending.
    pub fn fields(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.capacity()).filter(move |&f| self.get(f))
    }

    pub fn highest(&self) -> Option<usize> {
        (1..=self.capacity()).rev().find(|&f| self.get(f))
    }

    pub fn to_flags(&self) -> Vec<bool> {
        (1..=self.capacity()).map(|f| self.get(f)).collect()
    }
}

fn flag_set(bytes: &[u8], field: usize) -> bool {
    field
        .checked_sub(1)
        .and_then(|i| bytes.get(i / 8).map(|b| b & (0x80 >> (i % 8)) != 0))
        .unwrap_or(false)
}

/// Wire rendering of the bitmap bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapEncoding {
    Binary,
    /// Uppercase ASCII hex, two characters per byte.
    AsciiHex,
    EbcdicHex,
}

impl BitmapEncoding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "binary" => Some(BitmapEncoding::Binary),
            "ascii_hex" => Some(BitmapEncoding::AsciiHex),
            "ebcdic_hex" => Some(BitmapEncoding::EbcdicHex),
            _ => None,
        }
    }

    fn interpreter(self) -> BinaryInterpreter {
        match self {
            BitmapEncoding::Binary => BinaryInterpreter::Literal,
            BitmapEncoding::AsciiHex => BinaryInterpreter::AsciiHex,
            BitmapEncoding::EbcdicHex => BinaryInterpreter::EbcdicHex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapCodec {
    byte_length: usize,
    encoding: BitmapEncoding,
    extended: bool,
    description: String,
}

impl BitmapCodec {
    /// Fixed-width bitmap of `byte_length` bytes.
    pub fn new(
        byte_length: usize,
        encoding: BitmapEncoding,
        description: impl Into<String>,
    ) -> Result<Self, CodecError> {
        if byte_length == 0 {
            return Err(CodecError::Configuration("bitmap length must be positive".into()));
        }
        if byte_length.checked_mul(8).is_none() {
            return Err(CodecError::Configuration(format!(
                "bitmap of {} bytes has more bits than a field number can address",
                byte_length
            )));
        }
        Ok(BitmapCodec {
            byte_length,
            encoding,
            extended: false,
            description: description.into(),
        })
    }

    /// Fixed-width bitmap holding `bits` flags.
    pub fn for_bits(
        bits: usize,
        encoding: BitmapEncoding,
        description: impl Into<String>,
    ) -> Result<Self, CodecError> {
        Self::new(bits.div_ceil(8), encoding, description)
    }

    /// ISO 8583 bitmap of up to `byte_length` bytes (8, 16 or 24); only as many 8-byte
    /// blocks as the highest set field needs are written.
    pub fn extended(
        byte_length: usize,
        encoding: BitmapEncoding,
        description: impl Into<String>,
    ) -> Result<Self, CodecError> {
        if !matches!(byte_length, 8 | 16 | 24) {
            return Err(CodecError::Configuration(format!(
                "extended bitmap length must be 8, 16 or 24 bytes, got {}",
                byte_length
            )));
        }
        Ok(BitmapCodec { extended: true, ..Self::new(byte_length, encoding, description)? })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn encoding(&self) -> BitmapEncoding {
        self.encoding
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn bit_count(&self) -> usize {
        self.byte_length * 8
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Length in hex nibbles, the unit schema tables declare hex bitmaps in.
    pub fn nibble_length(&self) -> usize {
        self.byte_length * 2
    }

    pub fn max_packed_length(&self) -> usize {
        self.encoding.interpreter().packed_length(self.byte_length)
    }

    /// Returns bytes appended. Set fields past [`BitmapCodec::bit_count`] fail with
    /// [`CodecError::LengthExceeded`]; `out` is untouched on failure.
    pub fn pack(&self, bitmap: &Bitmap, out: &mut Vec<u8>) -> Result<usize, CodecError> {
        let mut bytes = bitmap.as_bytes().to_vec();
        bytes.resize(bytes.len().max(self.byte_length), 0);
        let mut wire = Bitmap::from_bytes(bytes);
        let blocks_bytes = if self.extended {
            wire.set(SECONDARY_FLAG, false)?;
            if wire.capacity() >= TERTIARY_FLAG {
                wire.set(TERTIARY_FLAG, false)?;
            }
            let blocks = wire.highest().map_or(1, |h| (h + 63) / 64).max(1);
            let len = (blocks * BLOCK_BYTES).min(self.byte_length);
            if blocks > 1 && len > BLOCK_BYTES {
                wire.set(SECONDARY_FLAG, true)?;
                if len > 2 * BLOCK_BYTES {
                    wire.set(TERTIARY_FLAG, true)?;
                }
                debug!(field = %self.description, blocks, "extended bitmap");
            }
            len
        } else {
            self.byte_length
        };
        if let Some(highest) = wire.highest().filter(|&h| h > self.bit_count()) {
            return Err(CodecError::LengthExceeded { length: highest, max: self.bit_count() });
        }
        let start = out.len();
        self.encoding.interpreter().interpret(&wire.as_bytes()[..blocks_bytes], out);
        let written = out.len() - start;
        trace!(field = %self.description, bytes = written, "packed bitmap");
        Ok(written)
    }

    /// Unpacked bitmaps always have the codec's full capacity. For an extended codec the
    /// extension flags (fields 1 and 65) stay set as read.
    pub fn unpack(&self, buf: &[u8], offset: usize) -> Result<(Bitmap, usize), CodecError> {
        let interpreter = self.encoding.interpreter();
        if !self.extended {
            let bytes = interpreter.uninterpret(buf, offset, self.byte_length)?;
            let consumed = interpreter.packed_length(self.byte_length);
            trace!(field = %self.description, bytes = consumed, "unpacked bitmap");
            return Ok((Bitmap::from_bytes(bytes), consumed));
        }
        let block_len = interpreter.packed_length(BLOCK_BYTES);
        let mut bytes = Vec::with_capacity(self.byte_length);
        let mut cursor = offset;
        loop {
            bytes.extend(interpreter.uninterpret(buf, cursor, BLOCK_BYTES)?);
            cursor += block_len;
            let flag = match bytes.len() {
                8 => SECONDARY_FLAG,
                16 => TERTIARY_FLAG,
                _ => break,
            };
            if bytes.len() >= self.byte_length || !flag_set(&bytes, flag) {
                break;
            }
            debug!(
                field = %self.description,
                block = bytes.len() / BLOCK_BYTES + 1,
                "following bitmap extension"
            );
        }
        let consumed = cursor - offset;
        bytes.resize(self.byte_length, 0);
        trace!(field = %self.description, bytes = consumed, "unpacked bitmap");
        Ok((Bitmap::from_bytes(bytes), consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_field_numbering() {
        let mut bitmap = Bitmap::new(16);
        bitmap.set(1, true).unwrap();
        bitmap.set(12, true).unwrap();
        assert_eq!(bitmap.as_bytes(), &[0x80, 0x10]);
        assert_eq!(bitmap.fields().collect::<Vec<_>>(), vec![1, 12]);
        assert!(!bitmap.get(0));
        assert!(!bitmap.get(17));
        assert!(bitmap.set(17, true).is_err());
    }

    #[test]
    fn from_flags_round_trip() {
        let flags = [true, false, true, false, false, false, false, false, false, true];
        let bitmap = Bitmap::from_flags(&flags);
        assert_eq!(bitmap.capacity(), 16);
        assert_eq!(&bitmap.to_flags()[..10], &flags);
        assert_eq!(bitmap.highest(), Some(10));
    }

    #[test]
    fn ascii_hex_lengths() {
        let codec = BitmapCodec::new(8, BitmapEncoding::AsciiHex, "BITMAP").unwrap();
        assert_eq!(codec.bit_count(), 64);
        assert_eq!(codec.nibble_length(), 16);
        assert_eq!(codec.max_packed_length(), 16);
        let mut out = Vec::new();
        let bitmap = Bitmap::from_bytes(vec![0x72, 0x3A, 0, 0, 0, 0, 0, 0x01]);
        assert_eq!(codec.pack(&bitmap, &mut out).unwrap(), 16);
        assert_eq!(out, b"723A000000000001".to_vec());
        let (decoded, consumed) = codec.unpack(b"723a000000000001", 0).unwrap();
        assert_eq!((decoded, consumed), (bitmap, 16));
    }

    #[test]
    fn fixed_rejects_fields_past_capacity() {
        let codec = BitmapCodec::new(1, BitmapEncoding::Binary, "SMALL").unwrap();
        let mut bitmap = Bitmap::new(16);
        bitmap.set(9, true).unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            codec.pack(&bitmap, &mut out),
            Err(CodecError::LengthExceeded { length: 9, max: 8 })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn extended_writes_only_needed_blocks() {
        let codec = BitmapCodec::extended(24, BitmapEncoding::Binary, "BITMAP").unwrap();
        let mut bitmap = Bitmap::new(192);
        bitmap.set(3, true).unwrap();
        let mut out = Vec::new();
        assert_eq!(codec.pack(&bitmap, &mut out).unwrap(), 8);
        assert_eq!(out[0], 0x20);

        bitmap.set(70, true).unwrap();
        out.clear();
        assert_eq!(codec.pack(&bitmap, &mut out).unwrap(), 16);
        assert_eq!(out[0], 0xA0);
        let (decoded, consumed) = codec.unpack(&out, 0).unwrap();
        assert_eq!(consumed, 16);
        assert_eq!(decoded.capacity(), 192);
        assert_eq!(decoded.fields().collect::<Vec<_>>(), vec![1, 3, 70]);

        bitmap.set(130, true).unwrap();
        out.clear();
        assert_eq!(codec.pack(&bitmap, &mut out).unwrap(), 24);
        let (decoded, consumed) = codec.unpack(&out, 0).unwrap();
        assert_eq!(consumed, 24);
        assert_eq!(decoded.fields().collect::<Vec<_>>(), vec![1, 3, 65, 70, 130]);
    }

    #[test]
    fn extended_stops_at_configured_size() {
        let codec = BitmapCodec::extended(16, BitmapEncoding::Binary, "BITMAP").unwrap();
        let mut bitmap = Bitmap::new(192);
        bitmap.set(130, true).unwrap();
        let mut out = Vec::new();
        assert!(matches!(codec.pack(&bitmap, &mut out), Err(CodecError::LengthExceeded { length: 130, max: 128 })));
        assert!(BitmapCodec::extended(12, BitmapEncoding::Binary, "X").is_err());
    }

    #[test]
    fn unaddressable_length_rejected() {
        assert!(matches!(
            BitmapCodec::new(usize::MAX / 4, BitmapEncoding::AsciiHex, "HUGE"),
            Err(CodecError::Configuration(_))
        ));
        assert_eq!(BitmapCodec::for_bits(usize::MAX, BitmapEncoding::Binary, "HUGE").map(|c| c.byte_length()).ok(), None);
    }

    #[test]
    fn extended_truncated_secondary() {
        let codec = BitmapCodec::extended(16, BitmapEncoding::Binary, "BITMAP").unwrap();
        let primary = [0x80, 0, 0, 0, 0, 0, 0, 0, 0x01];
        assert!(matches!(
            codec.unpack(&primary, 0),
            Err(CodecError::TruncatedInput { needed: 8, available: 1 })
        ));
    }
}
