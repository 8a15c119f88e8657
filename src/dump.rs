//! Format bytes and field values for display (hex dumps, value summaries, hex input).

use crate::codec::CodecError;
use crate::interpreter::{decode_hex_pairs, push_hex};
use crate::value::FieldValue;
use std::fmt::Write;

const LINE_BYTES: usize = 16;

/// Offset, hex and printable-ASCII columns, 16 bytes per line.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(LINE_BYTES).enumerate() {
        let _ = write!(out, "{:08x}  ", line * LINE_BYTES);
        for i in 0..LINE_BYTES {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02X} ", b);
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }));
        out.push_str("|\n");
    }
    out
}

/// One-line rendering of a value: text quoted, binary as hex, bitmaps as field lists.
pub fn describe(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => format!("{:?}", s),
        FieldValue::Binary(b) => format!("0x{}", encode_hex(b)),
        FieldValue::Tagged { tag, value } => format!("[{}] {}", tag, describe(value)),
        FieldValue::Bitmap(bitmap) => {
            let fields: Vec<String> = bitmap.fields().map(|f| f.to_string()).collect();
            format!("bitmap {{{}}}", fields.join(", "))
        }
    }
}

/// Uppercase hex, no separators.
pub fn encode_hex(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &b in data {
        push_hex(b, &mut out);
    }
    out.into_iter().map(char::from).collect()
}

/// Parse hex text (either case). Whitespace is ignored.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, CodecError> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(CodecError::InvalidEncoding("hex input must have an even number of digits".into()));
    }
    decode_hex_pairs(&digits, 0, |b| b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;

    #[test]
    fn dump_layout() {
        let dump = hex_dump(b"0200ABC\x01");
        assert_eq!(
            dump,
            "00000000  30 32 30 30 41 42 43 01                           |0200ABC.|\n"
        );
        assert_eq!(hex_dump(&[0u8; 17]).lines().count(), 2);
        assert!(hex_dump(&[]).is_empty());
    }

    #[test]
    fn describe_values() {
        assert_eq!(describe(&FieldValue::text("AB")), "\"AB\"");
        assert_eq!(describe(&FieldValue::Binary(vec![0xCA, 0xFE])), "0xCAFE");
        assert_eq!(describe(&FieldValue::tagged(5, FieldValue::text("X"))), "[5] \"X\"");
        let bitmap = Bitmap::from_flags(&[false, true, true]);
        assert_eq!(describe(&FieldValue::Bitmap(bitmap)), "bitmap {2, 3}");
    }

    #[test]
    fn hex_text() {
        assert_eq!(encode_hex(&[0x0A, 0xBC]), "0ABC");
        assert_eq!(decode_hex("0a bc").unwrap(), vec![0x0A, 0xBC]);
        assert!(decode_hex("ABC").is_err());
        assert!(matches!(decode_hex("ZZ"), Err(CodecError::InvalidDigit { byte: b'Z', position: 0 })));
    }
}
