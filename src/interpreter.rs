//! Value interpreters: text → bytes ([`Interpreter`]) and bytes → bytes ([`BinaryInterpreter`]).
//!
//! Every interpreter is a pure function of its input. `interpret` appends exactly
//! `packed_length(units)` bytes to the output; `uninterpret` reads exactly that many
//! bytes starting at `offset` and fails with [`CodecError::TruncatedInput`] when the
//! buffer is shorter.

use crate::codec::{take, CodecError};
use crate::ebcdic::{self, ZONE_NEGATIVE, ZONE_UNSIGNED};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Odd-length handling for packed decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcdLayout {
    /// Leading `0x0` nibble when the digit count is odd.
    LeftPadded,
    /// Trailing `0x0` nibble when the digit count is odd.
    RightPadded,
    /// Trailing `0xF` nibble when the digit count is odd.
    RightPaddedF,
    /// Leading `0xF` nibble when the digit count is odd.
    LeftPaddedF,
}

impl BcdLayout {
    fn pads_left(self) -> bool {
        matches!(self, BcdLayout::LeftPadded | BcdLayout::LeftPaddedF)
    }

    fn filler(self) -> u8 {
        match self {
            BcdLayout::LeftPadded | BcdLayout::RightPadded => 0x0,
            BcdLayout::RightPaddedF | BcdLayout::LeftPaddedF => 0xF,
        }
    }
}

/// Text interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    /// US-ASCII, one byte per char; anything above 0x7F is rejected.
    Ascii,
    /// IBM-1047 through [`ebcdic::ASCII_TO_EBCDIC`].
    Ebcdic,
    /// ISO-8859-1 passthrough.
    Literal,
    /// Packed decimal, two digits per byte.
    Bcd(BcdLayout),
    /// Each ISO-8859-1 byte as two uppercase hex digits.
    HexAscii,
    /// EBCDIC digits with the sign overpunched on the zone of the last byte.
    SignedEbcdic,
}

impl Interpreter {
    pub const BCD_LEFT: Interpreter = Interpreter::Bcd(BcdLayout::LeftPadded);
    pub const BCD_RIGHT: Interpreter = Interpreter::Bcd(BcdLayout::RightPadded);
    pub const BCD_RIGHT_F: Interpreter = Interpreter::Bcd(BcdLayout::RightPaddedF);
    pub const BCD_LEFT_F: Interpreter = Interpreter::Bcd(BcdLayout::LeftPaddedF);

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascii" => Some(Interpreter::Ascii),
            "ebcdic" => Some(Interpreter::Ebcdic),
            "literal" => Some(Interpreter::Literal),
            "bcd_left" => Some(Interpreter::BCD_LEFT),
            "bcd_right" => Some(Interpreter::BCD_RIGHT),
            "bcd_right_f" => Some(Interpreter::BCD_RIGHT_F),
            "bcd_left_f" => Some(Interpreter::BCD_LEFT_F),
            "hex" => Some(Interpreter::HexAscii),
            "signed_ebcdic" => Some(Interpreter::SignedEbcdic),
            _ => None,
        }
    }

    /// Logical units of `value`: characters, except that a leading `-` is not a unit for
    /// [`Interpreter::SignedEbcdic`].
    pub fn unit_length(&self, value: &str) -> usize {
        match self {
            Interpreter::SignedEbcdic => value.strip_prefix('-').unwrap_or(value).chars().count(),
            _ => value.chars().count(),
        }
    }

    /// Split a leading `-` off the digits. Only [`Interpreter::SignedEbcdic`] carries a sign;
    /// padding applies to the digits alone.
    pub fn split_sign<'a>(&self, value: &'a str) -> (bool, &'a str) {
        match (self, value.strip_prefix('-')) {
            (Interpreter::SignedEbcdic, Some(digits)) => (true, digits),
            _ => (false, value),
        }
    }

    /// [`Interpreter::packed_length`], or `None` when it does not fit in `usize`.
    pub fn checked_packed_length(&self, units: usize) -> Option<usize> {
        match self {
            Interpreter::Bcd(_) => units.checked_add(1).map(|n| n / 2),
            Interpreter::HexAscii => units.checked_mul(2),
            _ => Some(units),
        }
    }

    pub fn packed_length(&self, units: usize) -> usize {
        match self {
            Interpreter::Bcd(_) => (units + 1) / 2,
            Interpreter::HexAscii => units * 2,
            Interpreter::Ascii
            | Interpreter::Ebcdic
            | Interpreter::Literal
            | Interpreter::SignedEbcdic => units,
        }
    }

    pub fn interpret(&self, value: &str, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match *self {
            Interpreter::Ascii => {
                for c in value.chars() {
                    if !c.is_ascii() {
                        return Err(CodecError::InvalidEncoding(format!(
                            "character {:?} is not US-ASCII",
                            c
                        )));
                    }
                    out.push(c as u8);
                }
                Ok(())
            }
            Interpreter::Literal => {
                for c in value.chars() {
                    out.push(latin1(c)?);
                }
                Ok(())
            }
            Interpreter::Ebcdic => {
                for c in value.chars() {
                    out.push(ebcdic::to_ebcdic(latin1(c)?));
                }
                Ok(())
            }
            Interpreter::Bcd(layout) => pack_bcd(value.as_bytes(), layout, out),
            Interpreter::HexAscii => {
                for c in value.chars() {
                    push_hex(latin1(c)?, out);
                }
                Ok(())
            }
            Interpreter::SignedEbcdic => {
                let (negative, digits) = match value.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, value),
                };
                if negative && digits.is_empty() {
                    return Err(CodecError::InvalidEncoding("sign without digits".to_string()));
                }
                for (i, b) in digits.bytes().enumerate() {
                    if !b.is_ascii_digit() {
                        return Err(CodecError::InvalidDigit { byte: b, position: i });
                    }
                    out.push(ebcdic::digit(b - b'0'));
                }
                if negative {
                    if let Some(last) = out.last_mut() {
                        *last &= !0x20;
                    }
                }
                Ok(())
            }
        }
    }

    pub fn uninterpret(&self, buf: &[u8], offset: usize, units: usize) -> Result<String, CodecError> {
        let data = take(buf, offset, self.packed_length(units))?;
        match *self {
            Interpreter::Ascii => {
                if let Some(i) = data.iter().position(|b| !b.is_ascii()) {
                    return Err(CodecError::InvalidEncoding(format!(
                        "byte {:#04x} at offset {} is not US-ASCII",
                        data[i],
                        offset + i
                    )));
                }
                Ok(data.iter().map(|&b| char::from(b)).collect())
            }
            Interpreter::Literal => Ok(data.iter().map(|&b| char::from(b)).collect()),
            Interpreter::Ebcdic => Ok(data.iter().map(|&b| char::from(ebcdic::to_ascii(b))).collect()),
            Interpreter::Bcd(layout) => unpack_bcd(data, offset, units, layout),
            Interpreter::HexAscii => {
                let bytes = decode_hex_pairs(data, offset, |b| b)?;
                Ok(bytes.into_iter().map(char::from).collect())
            }
            Interpreter::SignedEbcdic => {
                let Some((&last, head)) = data.split_last() else {
                    return Ok(String::new());
                };
                let negative = last & 0xF0 == ZONE_NEGATIVE;
                let unsigned_last = if negative { last | ZONE_UNSIGNED } else { last };
                let mut out = String::with_capacity(data.len() + 1);
                if negative {
                    out.push('-');
                }
                for (i, b) in head.iter().copied().chain([unsigned_last]).enumerate() {
                    let d = ebcdic::digit_value(b)
                        .ok_or(CodecError::InvalidDigit { byte: data[i], position: offset + i })?;
                    out.push(char::from(b'0' + d));
                }
                Ok(out)
            }
        }
    }
}

/// Byte-run interpreter for fields whose logical value is already binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryInterpreter {
    Literal,
    /// Two uppercase ASCII hex digits per byte.
    AsciiHex,
    /// Two hex digits per byte, each written as EBCDIC.
    EbcdicHex,
    /// Each byte value mapped through the EBCDIC table.
    EbcdicBinary,
}

impl BinaryInterpreter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "literal" => Some(BinaryInterpreter::Literal),
            "ascii_hex" => Some(BinaryInterpreter::AsciiHex),
            "ebcdic_hex" => Some(BinaryInterpreter::EbcdicHex),
            "ebcdic_binary" => Some(BinaryInterpreter::EbcdicBinary),
            _ => None,
        }
    }

    pub fn checked_packed_length(&self, units: usize) -> Option<usize> {
        match self {
            BinaryInterpreter::Literal | BinaryInterpreter::EbcdicBinary => Some(units),
            BinaryInterpreter::AsciiHex | BinaryInterpreter::EbcdicHex => units.checked_mul(2),
        }
    }

    pub fn packed_length(&self, units: usize) -> usize {
        match self {
            BinaryInterpreter::Literal | BinaryInterpreter::EbcdicBinary => units,
            BinaryInterpreter::AsciiHex | BinaryInterpreter::EbcdicHex => units * 2,
        }
    }

    pub fn interpret(&self, data: &[u8], out: &mut Vec<u8>) {
        match self {
            BinaryInterpreter::Literal => out.extend_from_slice(data),
            BinaryInterpreter::AsciiHex => {
                for &b in data {
                    push_hex(b, out);
                }
            }
            BinaryInterpreter::EbcdicHex => {
                for &b in data {
                    out.push(ebcdic::to_ebcdic(HEX_UPPER[(b >> 4) as usize]));
                    out.push(ebcdic::to_ebcdic(HEX_UPPER[(b & 0x0F) as usize]));
                }
            }
            BinaryInterpreter::EbcdicBinary => out.extend(data.iter().map(|&b| ebcdic::to_ebcdic(b))),
        }
    }

    pub fn uninterpret(&self, buf: &[u8], offset: usize, units: usize) -> Result<Vec<u8>, CodecError> {
        let data = take(buf, offset, self.packed_length(units))?;
        match self {
            BinaryInterpreter::Literal => Ok(data.to_vec()),
            BinaryInterpreter::AsciiHex => decode_hex_pairs(data, offset, |b| b),
            BinaryInterpreter::EbcdicHex => decode_hex_pairs(data, offset, ebcdic::to_ascii),
            BinaryInterpreter::EbcdicBinary => Ok(data.iter().map(|&b| ebcdic::to_ascii(b)).collect()),
        }
    }
}

fn latin1(c: char) -> Result<u8, CodecError> {
    u8::try_from(u32::from(c)).map_err(|_| {
        CodecError::InvalidEncoding(format!("character {:?} is outside ISO-8859-1", c))
    })
}

pub(crate) fn push_hex(b: u8, out: &mut Vec<u8>) {
    out.push(HEX_UPPER[(b >> 4) as usize]);
    out.push(HEX_UPPER[(b & 0x0F) as usize]);
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parse hex digit pairs after mapping each byte through `map` (identity for ASCII,
/// [`ebcdic::to_ascii`] for EBCDIC). `offset` is only used for error positions.
pub(crate) fn decode_hex_pairs(
    data: &[u8],
    offset: usize,
    map: impl Fn(u8) -> u8,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    for (i, pair) in data.chunks_exact(2).enumerate() {
        let hi = hex_value(map(pair[0]))
            .ok_or(CodecError::InvalidDigit { byte: pair[0], position: offset + 2 * i })?;
        let lo = hex_value(map(pair[1]))
            .ok_or(CodecError::InvalidDigit { byte: pair[1], position: offset + 2 * i + 1 })?;
        out.push(hi << 4 | lo);
    }
    Ok(out)
}

fn pack_bcd(digits: &[u8], layout: BcdLayout, out: &mut Vec<u8>) -> Result<(), CodecError> {
    if let Some(i) = digits.iter().position(|b| !b.is_ascii_digit()) {
        return Err(CodecError::InvalidDigit { byte: digits[i], position: i });
    }
    let odd = digits.len() % 2 == 1;
    let fill = layout.filler();
    let mut nibbles = (odd && layout.pads_left())
        .then_some(fill)
        .into_iter()
        .chain(digits.iter().map(|d| d - b'0'))
        .chain((odd && !layout.pads_left()).then_some(fill));
    while let Some(hi) = nibbles.next() {
        let lo = nibbles.next().unwrap_or(fill);
        out.push(hi << 4 | lo);
    }
    Ok(())
}

fn unpack_bcd(data: &[u8], offset: usize, units: usize, layout: BcdLayout) -> Result<String, CodecError> {
    // Filler nibble is skipped unchecked; only digit positions are validated.
    let start = usize::from(units % 2 == 1 && layout.pads_left());
    let mut out = String::with_capacity(units);
    for i in start..start + units {
        let byte = data[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        if nibble > 9 {
            return Err(CodecError::InvalidDigit { byte, position: offset + i / 2 });
        }
        out.push(char::from(b'0' + nibble));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(i: Interpreter, v: &str) -> Vec<u8> {
        let mut out = Vec::new();
        i.interpret(v, &mut out).unwrap();
        out
    }

    #[test]
    fn bcd_odd_length_layouts() {
        assert_eq!(pack(Interpreter::BCD_LEFT, "123"), vec![0x01, 0x23]);
        assert_eq!(pack(Interpreter::BCD_RIGHT, "123"), vec![0x12, 0x30]);
        assert_eq!(pack(Interpreter::BCD_RIGHT_F, "123"), vec![0x12, 0x3F]);
        assert_eq!(pack(Interpreter::BCD_LEFT_F, "123"), vec![0xF1, 0x23]);
        assert_eq!(pack(Interpreter::BCD_LEFT, "1234"), vec![0x12, 0x34]);
        for i in [Interpreter::BCD_LEFT, Interpreter::BCD_RIGHT, Interpreter::BCD_RIGHT_F, Interpreter::BCD_LEFT_F] {
            let packed = pack(i, "123");
            assert_eq!(i.packed_length(3), 2);
            assert_eq!(i.uninterpret(&packed, 0, 3).unwrap(), "123");
        }
    }

    #[test]
    fn bcd_rejects_non_digits() {
        let mut out = Vec::new();
        assert!(matches!(
            Interpreter::BCD_LEFT.interpret("12A", &mut out),
            Err(CodecError::InvalidDigit { byte: b'A', position: 2 })
        ));
        // 0xF in a digit position (not the filler) is not a digit.
        assert!(matches!(
            Interpreter::BCD_RIGHT_F.uninterpret(&[0x1F, 0x3F], 0, 3),
            Err(CodecError::InvalidDigit { byte: 0x1F, position: 0 })
        ));
    }

    #[test]
    fn signed_ebcdic_overpunch() {
        let negative = pack(Interpreter::SignedEbcdic, "-123");
        assert_eq!(negative, vec![0xF1, 0xF2, 0xD3]);
        assert_eq!(Interpreter::SignedEbcdic.unit_length("-123"), 3);
        assert_eq!(Interpreter::SignedEbcdic.uninterpret(&negative, 0, 3).unwrap(), "-123");
        let positive = pack(Interpreter::SignedEbcdic, "123");
        assert_eq!(positive, vec![0xF1, 0xF2, 0xF3]);
        assert_eq!(Interpreter::SignedEbcdic.uninterpret(&positive, 0, 3).unwrap(), "123");
        // decode leaves the caller's buffer untouched
        assert_eq!(negative[2], 0xD3);
    }

    #[test]
    fn signed_ebcdic_rejects_non_digits() {
        assert!(matches!(
            Interpreter::SignedEbcdic.uninterpret(&[0xC1, 0x40, 0xD3], 0, 3),
            Err(CodecError::InvalidDigit { byte: 0xC1, position: 0 })
        ));
        assert!(matches!(
            Interpreter::SignedEbcdic.uninterpret(&[0xF1, 0x40, 0xF3], 5, 3),
            Err(CodecError::InvalidDigit { byte: 0x40, position: 6 })
        ));
        // a letter zone on the last byte is neither unsigned nor negative
        assert!(matches!(
            Interpreter::SignedEbcdic.uninterpret(&[0xF1, 0xC2], 0, 2),
            Err(CodecError::InvalidDigit { byte: 0xC2, position: 1 })
        ));
    }

    #[test]
    fn sign_is_split_only_for_signed_ebcdic() {
        assert_eq!(Interpreter::SignedEbcdic.split_sign("-123"), (true, "123"));
        assert_eq!(Interpreter::SignedEbcdic.split_sign("123"), (false, "123"));
        assert_eq!(Interpreter::Ascii.split_sign("-123"), (false, "-123"));
    }

    #[test]
    fn checked_packed_length_overflow() {
        assert_eq!(Interpreter::BCD_LEFT.checked_packed_length(3), Some(2));
        assert_eq!(Interpreter::BCD_LEFT.checked_packed_length(usize::MAX), None);
        assert_eq!(Interpreter::HexAscii.checked_packed_length(usize::MAX / 2 + 1), None);
        assert_eq!(BinaryInterpreter::AsciiHex.checked_packed_length(usize::MAX), None);
        assert_eq!(BinaryInterpreter::Literal.checked_packed_length(usize::MAX), Some(usize::MAX));
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut out = Vec::new();
        assert!(Interpreter::Ascii.interpret("caf\u{e9}", &mut out).is_err());
        assert!(Interpreter::Ascii.uninterpret(&[0x41, 0xC3], 0, 2).is_err());
        assert_eq!(pack(Interpreter::Literal, "caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn ebcdic_text() {
        let packed = pack(Interpreter::Ebcdic, "HELLO 1");
        assert_eq!(packed, vec![0xC8, 0xC5, 0xD3, 0xD3, 0xD6, 0x40, 0xF1]);
        assert_eq!(Interpreter::Ebcdic.uninterpret(&packed, 0, 7).unwrap(), "HELLO 1");
    }

    #[test]
    fn ascii_hex_binary() {
        let mut out = Vec::new();
        BinaryInterpreter::AsciiHex.interpret(&[0xAB], &mut out);
        assert_eq!(out, b"AB".to_vec());
        assert_eq!(BinaryInterpreter::AsciiHex.packed_length(1), 2);
        assert_eq!(BinaryInterpreter::AsciiHex.uninterpret(b"ab0F", 0, 2).unwrap(), vec![0xAB, 0x0F]);
        assert!(matches!(
            BinaryInterpreter::AsciiHex.uninterpret(b"AZ", 0, 1),
            Err(CodecError::InvalidDigit { byte: b'Z', position: 1 })
        ));
    }

    #[test]
    fn ebcdic_hex_and_binary() {
        let mut out = Vec::new();
        BinaryInterpreter::EbcdicHex.interpret(&[0x1F], &mut out);
        assert_eq!(out, vec![0xF1, 0xC6]);
        assert_eq!(BinaryInterpreter::EbcdicHex.uninterpret(&out, 0, 1).unwrap(), vec![0x1F]);

        out.clear();
        BinaryInterpreter::EbcdicBinary.interpret(b"A1", &mut out);
        assert_eq!(out, vec![0xC1, 0xF1]);
        assert_eq!(BinaryInterpreter::EbcdicBinary.uninterpret(&out, 0, 2).unwrap(), b"A1".to_vec());
    }

    #[test]
    fn uninterpret_short_buffer() {
        assert!(matches!(
            Interpreter::Ascii.uninterpret(b"ABC", 1, 5),
            Err(CodecError::TruncatedInput { needed: 5, available: 2 })
        ));
    }
}
