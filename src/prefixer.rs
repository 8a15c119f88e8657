//! Length prefixes (and digit-encoded tags, which use the same encoders).

use crate::codec::{take, CodecError};
use crate::ebcdic;
use byteorder::{BigEndian, ByteOrder};

const MAX_DIGITS: u8 = 6;
const MAX_BINARY_WIDTH: u8 = 4;

/// Length header written before a variable-length value.
///
/// The packed size of a prefix is a structural constant ([`Prefixer::packed_length`]),
/// independent of the encoded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefixer {
    /// Fixed-length field: no header.
    None,
    /// `width` ASCII decimal digits, zero-filled.
    AsciiDigits(u8),
    /// `width` EBCDIC decimal digits (`0xF0`..=`0xF9`), zero-filled.
    EbcdicDigits(u8),
    /// Packed decimal over `(digits + 1) / 2` bytes.
    BcdDigits(u8),
    /// Packed decimal over `(digits + 1) / 2` bytes carrying `2 * length` (nibble count).
    BcdNibblePairs(u8),
    /// Unsigned big-endian integer over `width` bytes.
    BinaryBigEndian(u8),
}

impl Prefixer {
    pub const L: Prefixer = Prefixer::AsciiDigits(1);
    pub const LL: Prefixer = Prefixer::AsciiDigits(2);
    pub const LLL: Prefixer = Prefixer::AsciiDigits(3);
    pub const LLLL: Prefixer = Prefixer::AsciiDigits(4);

    /// Schema/CLI lookup: `none`, `ascii(n)`, `ebcdic(n)`, `bcd(n)`, `nibbles(n)`, `binary(n)`.
    pub fn from_name(name: &str, arg: Option<u64>) -> Option<Self> {
        let width = || arg.and_then(|n| u8::try_from(n).ok());
        match name {
            "none" if arg.is_none() => Some(Prefixer::None),
            "ascii" => width().map(Prefixer::AsciiDigits),
            "ebcdic" => width().map(Prefixer::EbcdicDigits),
            "bcd" => width().map(Prefixer::BcdDigits),
            "nibbles" => width().map(Prefixer::BcdNibblePairs),
            "binary" => width().map(Prefixer::BinaryBigEndian),
            _ => None,
        }
    }

    /// Reject widths outside the supported range.
    pub fn validate(&self) -> Result<(), CodecError> {
        let ok = match *self {
            Prefixer::None => true,
            Prefixer::AsciiDigits(w)
            | Prefixer::EbcdicDigits(w)
            | Prefixer::BcdDigits(w)
            | Prefixer::BcdNibblePairs(w) => (1..=MAX_DIGITS).contains(&w),
            Prefixer::BinaryBigEndian(w) => (1..=MAX_BINARY_WIDTH).contains(&w),
        };
        if ok {
            Ok(())
        } else {
            Err(CodecError::Configuration(format!("unsupported prefix width: {:?}", self)))
        }
    }

    pub fn packed_length(&self) -> usize {
        match *self {
            Prefixer::None => 0,
            Prefixer::AsciiDigits(w) | Prefixer::EbcdicDigits(w) | Prefixer::BinaryBigEndian(w) => w as usize,
            Prefixer::BcdDigits(d) | Prefixer::BcdNibblePairs(d) => (d as usize + 1) / 2,
        }
    }

    /// Largest length this prefix can carry. `usize::MAX` for [`Prefixer::None`].
    pub fn max_length(&self) -> usize {
        match *self {
            Prefixer::None => usize::MAX,
            Prefixer::AsciiDigits(w) | Prefixer::EbcdicDigits(w) | Prefixer::BcdDigits(w) => decimal_max(w),
            Prefixer::BcdNibblePairs(d) => decimal_max(d) / 2,
            Prefixer::BinaryBigEndian(w) => 1usize.checked_shl(8 * u32::from(w)).map_or(usize::MAX, |v| v - 1),
        }
    }

    /// Append the header for `length`. Lengths above [`Prefixer::max_length`] fail with
    /// [`CodecError::InvalidPrefix`]. The width is checked once, when a codec is built.
    pub fn encode_length(&self, length: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
        debug_assert!(self.validate().is_ok(), "unvalidated prefix {:?}", self);
        let max = self.max_length();
        if length > max {
            return Err(CodecError::InvalidPrefix { length, max });
        }
        match *self {
            Prefixer::None => {}
            Prefixer::AsciiDigits(w) => {
                out.extend_from_slice(format!("{:0width$}", length, width = w as usize).as_bytes());
            }
            Prefixer::EbcdicDigits(w) => {
                let digits = format!("{:0width$}", length, width = w as usize);
                out.extend(digits.bytes().map(|b| ebcdic::digit(b - b'0')));
            }
            Prefixer::BcdDigits(_) => encode_bcd_pairs(length, self.packed_length(), out),
            Prefixer::BcdNibblePairs(_) => encode_bcd_pairs(length << 1, self.packed_length(), out),
            Prefixer::BinaryBigEndian(w) => {
                let w = binary_width(w)?;
                let mut buf = [0u8; MAX_BINARY_WIDTH as usize];
                BigEndian::write_uint(&mut buf[..w], length as u64, w);
                out.extend_from_slice(&buf[..w]);
            }
        }
        Ok(())
    }

    /// Read the header at `offset`. `Ok(None)` means no prefix: the length is fixed by the
    /// field definition.
    pub fn decode_length(&self, buf: &[u8], offset: usize) -> Result<Option<usize>, CodecError> {
        if *self == Prefixer::None {
            return Ok(None);
        }
        debug_assert!(self.validate().is_ok(), "unvalidated prefix {:?}", self);
        let data = take(buf, offset, self.packed_length())?;
        let length = match *self {
            Prefixer::None => return Ok(None),
            Prefixer::AsciiDigits(_) => decode_digits(data, offset, |b| b)?,
            Prefixer::EbcdicDigits(_) => {
                decode_digits(data, offset, |b| ebcdic::digit_value(b).map_or(0, |d| b'0' + d))?
            }
            Prefixer::BcdDigits(_) => decode_bcd_pairs(data, offset)?,
            Prefixer::BcdNibblePairs(_) => decode_bcd_pairs(data, offset)? >> 1,
            Prefixer::BinaryBigEndian(w) => BigEndian::read_uint(data, binary_width(w)?) as usize,
        };
        Ok(Some(length))
    }
}

/// `BigEndian::{read,write}_uint` panic past 8 bytes; widths are capped well below that.
fn binary_width(w: u8) -> Result<usize, CodecError> {
    if (1..=MAX_BINARY_WIDTH).contains(&w) {
        Ok(w as usize)
    } else {
        Err(CodecError::Configuration(format!("unsupported binary prefix width: {}", w)))
    }
}

fn decimal_max(digits: u8) -> usize {
    10usize.checked_pow(u32::from(digits)).map_or(usize::MAX, |p| p - 1)
}

fn decode_digits(data: &[u8], offset: usize, map: impl Fn(u8) -> u8) -> Result<usize, CodecError> {
    let mut acc = 0usize;
    for (i, &raw) in data.iter().enumerate() {
        let b = map(raw);
        if !b.is_ascii_digit() {
            return Err(CodecError::InvalidDigit { byte: raw, position: offset + i });
        }
        acc = acc * 10 + usize::from(b - b'0');
    }
    Ok(acc)
}

fn encode_bcd_pairs(mut value: usize, bytes: usize, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + bytes, 0);
    for slot in out[start..].iter_mut().rev() {
        let pair = value % 100;
        value /= 100;
        *slot = ((pair / 10) << 4 | pair % 10) as u8;
    }
}

fn decode_bcd_pairs(data: &[u8], offset: usize) -> Result<usize, CodecError> {
    let mut acc = 0usize;
    for (i, &b) in data.iter().enumerate() {
        let (hi, lo) = (b >> 4, b & 0x0F);
        if hi > 9 || lo > 9 {
            return Err(CodecError::InvalidDigit { byte: b, position: offset + i });
        }
        acc = acc * 100 + usize::from(hi) * 10 + usize::from(lo);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(p: Prefixer, n: usize) -> Vec<u8> {
        let mut out = Vec::new();
        p.encode_length(n, &mut out).unwrap();
        out
    }

    #[test]
    fn ascii_digits() {
        assert_eq!(encode(Prefixer::LLL, 7), b"007".to_vec());
        assert_eq!(Prefixer::LLL.decode_length(b"x042", 1).unwrap(), Some(42));
        let mut out = Vec::new();
        assert!(matches!(
            Prefixer::LL.encode_length(100, &mut out),
            Err(CodecError::InvalidPrefix { length: 100, max: 99 })
        ));
        assert!(matches!(
            Prefixer::LL.decode_length(b"1A", 0),
            Err(CodecError::InvalidDigit { byte: b'A', position: 1 })
        ));
    }

    #[test]
    fn ebcdic_digits() {
        let p = Prefixer::EbcdicDigits(2);
        assert_eq!(encode(p, 15), vec![0xF1, 0xF5]);
        assert_eq!(p.decode_length(&[0xF1, 0xF5], 0).unwrap(), Some(15));
        assert!(p.decode_length(&[0xF1, 0xC1], 0).is_err());
    }

    #[test]
    fn bcd_digits() {
        let p = Prefixer::BcdDigits(3);
        assert_eq!(p.packed_length(), 2);
        assert_eq!(encode(p, 123), vec![0x01, 0x23]);
        assert_eq!(p.decode_length(&[0x01, 0x23], 0).unwrap(), Some(123));
        assert_eq!(encode(Prefixer::BcdDigits(2), 19), vec![0x19]);
    }

    #[test]
    fn bcd_nibble_pairs_double_and_halve() {
        let p = Prefixer::BcdNibblePairs(4);
        assert_eq!(p.packed_length(), 2);
        assert_eq!(encode(p, 7), vec![0x00, 0x14]);
        for n in [0usize, 1, 7, 50, 99] {
            let packed = encode(p, n);
            assert_eq!(p.decode_length(&packed, 0).unwrap(), Some(n), "length {}", n);
        }
        assert_eq!(Prefixer::BcdNibblePairs(2).max_length(), 49);
    }

    #[test]
    fn binary_big_endian() {
        assert_eq!(encode(Prefixer::BinaryBigEndian(1), 255), vec![0xFF]);
        assert_eq!(encode(Prefixer::BinaryBigEndian(2), 0x1234), vec![0x12, 0x34]);
        assert_eq!(Prefixer::BinaryBigEndian(2).decode_length(&[0x01, 0x00], 0).unwrap(), Some(256));
        assert_eq!(Prefixer::BinaryBigEndian(2).max_length(), 65535);
    }

    #[test]
    fn none_is_a_sentinel() {
        assert_eq!(Prefixer::None.packed_length(), 0);
        assert_eq!(Prefixer::None.decode_length(&[], 0).unwrap(), None);
    }

    #[test]
    fn widths_are_validated() {
        assert!(Prefixer::AsciiDigits(0).validate().is_err());
        assert!(Prefixer::AsciiDigits(7).validate().is_err());
        assert!(Prefixer::BinaryBigEndian(5).validate().is_err());
        assert!(Prefixer::BcdDigits(6).validate().is_ok());
    }

    #[test]
    fn truncated_prefix() {
        assert!(matches!(
            Prefixer::LLL.decode_length(b"01", 0),
            Err(CodecError::TruncatedInput { needed: 3, available: 2 })
        ));
    }
}
