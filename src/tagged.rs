//! Tagged (TLV-style) subfields: a digit-encoded tag plus an ordinary [`FieldCodec`].

use crate::codec::{take, CodecError, FieldCodec, FieldSpec, Payload};
use crate::prefixer::Prefixer;
use crate::value::FieldValue;
use tracing::trace;

/// Where the tag sits relative to the length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLayout {
    /// `TAG LEN VALUE`; the length counts value units only.
    TagFirst,
    /// `LEN TAG VALUE`; the length counts the tag digits plus the value units.
    LengthFirst,
}

impl TagLayout {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tag_first" => Some(TagLayout::TagFirst),
            "length_first" => Some(TagLayout::LengthFirst),
            _ => None,
        }
    }
}

/// Tag header: the encoder (any digit or binary [`Prefixer`]) and its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    pub encoder: Prefixer,
    pub layout: TagLayout,
}

impl TagSpec {
    pub fn new(encoder: Prefixer, layout: TagLayout) -> Self {
        TagSpec { encoder, layout }
    }

    /// Tag width in bytes.
    pub fn packed_length(&self) -> usize {
        self.encoder.packed_length()
    }

    fn validate(&self) -> Result<(), CodecError> {
        self.encoder.validate()?;
        match (self.encoder, self.layout) {
            (Prefixer::None, _) => Err(CodecError::Configuration("tag encoder cannot be none".into())),
            (Prefixer::AsciiDigits(_) | Prefixer::EbcdicDigits(_), _) | (_, TagLayout::TagFirst) => Ok(()),
            (encoder, TagLayout::LengthFirst) => Err(CodecError::Configuration(format!(
                "length-first tags must be ASCII or EBCDIC digits, got {:?}",
                encoder
            ))),
        }
    }

    /// Units the length prefix counts for the tag.
    fn counted_units(&self) -> usize {
        match self.layout {
            TagLayout::TagFirst => 0,
            TagLayout::LengthFirst => self.packed_length(),
        }
    }
}

/// [`FieldCodec`] with a fixed-width tag header.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedFieldCodec {
    tag: TagSpec,
    field: FieldCodec,
}

impl TaggedFieldCodec {
    /// `spec.tag` must be set. A length-first layout also needs a length prefix.
    pub fn new(mut spec: FieldSpec) -> Result<Self, CodecError> {
        let tag = spec.tag.take().ok_or_else(|| {
            CodecError::Configuration(format!("{}: tagged field needs a tag spec", spec.description))
        })?;
        tag.validate()?;
        if tag.layout == TagLayout::LengthFirst && spec.prefixer == Prefixer::None {
            return Err(CodecError::Configuration(format!(
                "{}: length-first tag needs a length prefix",
                spec.description
            )));
        }
        let field = FieldCodec::validated(spec, tag.counted_units())?;
        if field.max_packed_length().checked_add(tag.packed_length()).is_none() {
            return Err(CodecError::Configuration(format!(
                "{}: max length {} overflows the packed size",
                field.description(),
                field.max_length()
            )));
        }
        Ok(TaggedFieldCodec { tag, field })
    }

    pub fn tag_spec(&self) -> TagSpec {
        self.tag
    }

    /// The codec for the value part.
    pub fn field(&self) -> &FieldCodec {
        &self.field
    }

    pub fn description(&self) -> &str {
        self.field.description()
    }

    pub fn max_packed_length(&self) -> usize {
        self.tag.packed_length() + self.field.max_packed_length()
    }

    /// Pack `tag` and `value`; returns bytes appended. `out` is untouched on failure.
    pub fn pack(&self, tag: u32, value: &FieldValue, out: &mut Vec<u8>) -> Result<usize, CodecError> {
        let payload = Payload::from_value(value)?;
        let mut header = Vec::with_capacity(self.tag.packed_length());
        self.tag.encoder.encode_length(tag as usize, &mut header)?;
        let written = match self.tag.layout {
            TagLayout::TagFirst => {
                let start = out.len();
                out.extend_from_slice(&header);
                match self.field.pack_framed(payload, &[], 0, out) {
                    Ok(n) => n + header.len(),
                    Err(e) => {
                        out.truncate(start);
                        return Err(e);
                    }
                }
            }
            TagLayout::LengthFirst => {
                self.field.pack_framed(payload, &header, self.tag.counted_units(), out)?
            }
        };
        trace!(field = %self.description(), tag, bytes = written, "packed tagged field");
        Ok(written)
    }

    /// Unpack at `offset`; returns the tag, the value and bytes consumed.
    pub fn unpack(&self, buf: &[u8], offset: usize) -> Result<(u32, FieldValue, usize), CodecError> {
        let tag_width = self.tag.packed_length();
        let (tag_offset, value, consumed) = match self.tag.layout {
            TagLayout::TagFirst => {
                take(buf, offset, tag_width)?;
                let (value, n) = self.field.unpack_framed(buf, offset + tag_width, 0, 0)?;
                (offset, value, n + tag_width)
            }
            TagLayout::LengthFirst => {
                let tag_offset = offset + self.field.spec().prefixer.packed_length();
                take(buf, tag_offset, tag_width)?;
                let (value, n) =
                    self.field.unpack_framed(buf, offset, tag_width, self.tag.counted_units())?;
                (tag_offset, value, n)
            }
        };
        let tag = self.tag.encoder.decode_length(buf, tag_offset)?.unwrap_or_default();
        let tag = u32::try_from(tag).map_err(|_| {
            CodecError::InvalidEncoding(format!("{}: tag {} out of range", self.description(), tag))
        })?;
        trace!(field = %self.description(), tag, bytes = consumed, "unpacked tagged field");
        Ok((tag, value, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::padder::Padder;

    fn spec(prefixer: Prefixer, interpreter: Interpreter, tag: TagSpec) -> FieldSpec {
        FieldSpec::text(20, "TLV", Padder::None, interpreter, prefixer).with_tag(tag)
    }

    #[test]
    fn tag_first_ascii() {
        let codec = TaggedFieldCodec::new(spec(
            Prefixer::LL,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LL, TagLayout::TagFirst),
        ))
        .unwrap();
        let mut out = Vec::new();
        assert_eq!(codec.pack(5, &FieldValue::text("AB"), &mut out).unwrap(), 6);
        assert_eq!(out, b"0502AB".to_vec());
        let (tag, value, consumed) = codec.unpack(&out, 0).unwrap();
        assert_eq!((tag, value.as_text(), consumed), (5, Some("AB"), 6));
    }

    #[test]
    fn length_first_counts_tag() {
        let codec = TaggedFieldCodec::new(spec(
            Prefixer::LLL,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LL, TagLayout::LengthFirst),
        ))
        .unwrap();
        let mut out = Vec::new();
        codec.pack(12, &FieldValue::text("XYZ"), &mut out).unwrap();
        assert_eq!(out, b"00512XYZ".to_vec());
        let (tag, value, consumed) = codec.unpack(&out, 0).unwrap();
        assert_eq!((tag, value.as_text(), consumed), (12, Some("XYZ"), 8));
    }

    #[test]
    fn mixed_ebcdic_tag_ascii_length_ebcdic_value() {
        let codec = TaggedFieldCodec::new(spec(
            Prefixer::LL,
            Interpreter::Ebcdic,
            TagSpec::new(Prefixer::EbcdicDigits(2), TagLayout::TagFirst),
        ))
        .unwrap();
        let mut out = Vec::new();
        codec.pack(7, &FieldValue::text("A1"), &mut out).unwrap();
        assert_eq!(out, vec![0xF0, 0xF7, b'0', b'2', 0xC1, 0xF1]);
        let (tag, value, _) = codec.unpack(&out, 0).unwrap();
        assert_eq!((tag, value.as_text()), (7, Some("A1")));
    }

    #[test]
    fn configuration_errors() {
        let no_tag = FieldSpec::text(5, "X", Padder::None, Interpreter::Ascii, Prefixer::LL);
        assert!(matches!(TaggedFieldCodec::new(no_tag), Err(CodecError::Configuration(_))));
        let fixed_length_first = spec(
            Prefixer::None,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LL, TagLayout::LengthFirst),
        );
        assert!(TaggedFieldCodec::new(fixed_length_first).is_err());
        // 98 value units + 2 tag units overflow a two-digit length
        let mut crowded = spec(
            Prefixer::LL,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LL, TagLayout::LengthFirst),
        );
        crowded.max_length = 98;
        assert!(TaggedFieldCodec::new(crowded).is_err());
    }

    #[test]
    fn oversized_tag_leaves_buffer_untouched() {
        let codec = TaggedFieldCodec::new(spec(
            Prefixer::LL,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LL, TagLayout::TagFirst),
        ))
        .unwrap();
        let mut out = b"XX".to_vec();
        assert!(matches!(
            codec.pack(100, &FieldValue::text("A"), &mut out),
            Err(CodecError::InvalidPrefix { length: 100, max: 99 })
        ));
        assert!(codec.pack(1, &FieldValue::text("\u{20ac}"), &mut out).is_err());
        assert_eq!(out, b"XX".to_vec());
    }

    #[test]
    fn truncated_tag() {
        let codec = TaggedFieldCodec::new(spec(
            Prefixer::LL,
            Interpreter::Ascii,
            TagSpec::new(Prefixer::LLL, TagLayout::TagFirst),
        ))
        .unwrap();
        assert!(matches!(codec.unpack(b"01", 0), Err(CodecError::TruncatedInput { .. })));
    }
}
