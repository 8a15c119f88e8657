//! Named field presets.
//!
//! A preset name is `FAMILY_[L..]KIND`:
//!
//! | family | length prefix | text            | numbers   | binary    | bitmap     |
//! |--------|---------------|-----------------|-----------|-----------|------------|
//! | `IF`   | none          | ISO-8859-1      | ISO-8859-1| literal   | binary     |
//! | `IFA`  | ASCII digits  | ASCII           | ASCII     | ASCII hex | ASCII hex  |
//! | `IFB`  | BCD digits    | ASCII           | BCD left  | literal   | binary     |
//! | `IFE`  | EBCDIC digits | EBCDIC          | EBCDIC    | literal   | EBCDIC hex |
//! | `IFEB` | EBCDIC digits | EBCDIC          | BCD left  | literal   | binary     |
//!
//! `IFAP` and `IFEP` encode like `IFA` and `IFE` and add a 2-digit tag (in the same
//! charset) between the length and the value.
//!
//! The number of `L`s is the prefix digit count (none means fixed length). Kinds are
//! `CHAR`, `NUM`, `NUMERIC` (always fixed), `BINARY` and `BITMAP` (byte length; ISO
//! extended when it is 8, 16 or 24).

use crate::bitmap::{BitmapCodec, BitmapEncoding};
use crate::codec::{CodecError, FieldCodec, FieldSpec};
use crate::interpreter::{BinaryInterpreter, Interpreter};
use crate::packager::FieldPackager;
use crate::padder::Padder;
use crate::prefixer::Prefixer;
use crate::tagged::{TagLayout, TagSpec, TaggedFieldCodec};

const TAG_DIGITS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Fixed,
    Ascii,
    Bcd,
    Ebcdic,
    EbcdicBcd,
    AsciiTagged,
    EbcdicTagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Char,
    Num,
    Numeric,
    Binary,
    Bitmap,
}

impl Family {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "IF" => Some(Family::Fixed),
            "IFA" => Some(Family::Ascii),
            "IFB" => Some(Family::Bcd),
            "IFE" => Some(Family::Ebcdic),
            "IFEB" => Some(Family::EbcdicBcd),
            "IFAP" => Some(Family::AsciiTagged),
            "IFEP" => Some(Family::EbcdicTagged),
            _ => None,
        }
    }

    fn prefixer(self, digits: u8) -> Prefixer {
        match (self, digits) {
            (_, 0) | (Family::Fixed, _) => Prefixer::None,
            (Family::Ascii | Family::AsciiTagged, n) => Prefixer::AsciiDigits(n),
            (Family::Bcd, n) => Prefixer::BcdDigits(n),
            (Family::Ebcdic | Family::EbcdicBcd | Family::EbcdicTagged, n) => Prefixer::EbcdicDigits(n),
        }
    }

    fn text(self, kind: Kind) -> Interpreter {
        let numeric = matches!(kind, Kind::Num | Kind::Numeric);
        match self {
            Family::Fixed => Interpreter::Literal,
            Family::Ascii | Family::AsciiTagged => Interpreter::Ascii,
            Family::Bcd if numeric => Interpreter::BCD_LEFT,
            Family::Bcd => Interpreter::Ascii,
            Family::EbcdicBcd if numeric => Interpreter::BCD_LEFT,
            Family::Ebcdic | Family::EbcdicBcd | Family::EbcdicTagged => Interpreter::Ebcdic,
        }
    }

    fn binary(self) -> BinaryInterpreter {
        match self {
            Family::Ascii | Family::AsciiTagged => BinaryInterpreter::AsciiHex,
            _ => BinaryInterpreter::Literal,
        }
    }

    fn bitmap(self) -> BitmapEncoding {
        match self {
            Family::Ascii | Family::AsciiTagged => BitmapEncoding::AsciiHex,
            Family::Ebcdic | Family::EbcdicTagged => BitmapEncoding::EbcdicHex,
            _ => BitmapEncoding::Binary,
        }
    }

    fn tag(self) -> Option<TagSpec> {
        let encoder = match self {
            Family::AsciiTagged => Prefixer::AsciiDigits(TAG_DIGITS),
            Family::EbcdicTagged => Prefixer::EbcdicDigits(TAG_DIGITS),
            _ => return None,
        };
        Some(TagSpec::new(encoder, TagLayout::LengthFirst))
    }
}

impl Kind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "CHAR" => Some(Kind::Char),
            "NUM" => Some(Kind::Num),
            "NUMERIC" => Some(Kind::Numeric),
            "BINARY" => Some(Kind::Binary),
            "BITMAP" => Some(Kind::Bitmap),
            _ => None,
        }
    }
}

/// Build the codec a preset name describes. Unknown names and impossible combinations fail
/// with [`CodecError::Configuration`].
pub fn preset(name: &str, max_length: usize, description: &str) -> Result<FieldPackager, CodecError> {
    let unknown = || CodecError::Configuration(format!("unknown field preset: {}", name));
    let (family, rest) = name.split_once('_').ok_or_else(unknown)?;
    let family = Family::from_name(family).ok_or_else(unknown)?;
    let kind_name = rest.trim_start_matches('L');
    let digits = u8::try_from(rest.len() - kind_name.len()).map_err(|_| unknown())?;
    let kind = Kind::from_name(kind_name).ok_or_else(unknown)?;
    let invalid = |why: &str| CodecError::Configuration(format!("{}: {}", name, why));

    if digits > 0 && (family == Family::Fixed || matches!(kind, Kind::Numeric | Kind::Bitmap)) {
        return Err(invalid("fixed-length kind cannot take a length prefix"));
    }
    if kind == Kind::Bitmap {
        if family.tag().is_some() {
            return Err(invalid("bitmaps cannot be tagged"));
        }
        let codec = if max_length % 8 == 0 && max_length <= 24 {
            BitmapCodec::extended(max_length, family.bitmap(), description)?
        } else {
            BitmapCodec::new(max_length, family.bitmap(), description)?
        };
        return Ok(codec.into());
    }

    let prefixer = family.prefixer(digits);
    let spec = match kind {
        Kind::Binary => FieldSpec::binary(max_length, description, family.binary(), prefixer),
        _ => {
            let padder = match (prefixer, kind) {
                (Prefixer::None, Kind::Char) => Padder::RIGHT_SPACE,
                (Prefixer::None, _) => Padder::LEFT_ZERO,
                _ => Padder::None,
            };
            FieldSpec::text(max_length, description, padder, family.text(kind), prefixer)
        }
    };
    match family.tag() {
        Some(tag) => {
            if prefixer == Prefixer::None {
                return Err(invalid("tagged presets need a length prefix"));
            }
            Ok(TaggedFieldCodec::new(spec.with_tag(tag))?.into())
        }
        None => Ok(FieldCodec::new(spec)?.into()),
    }
}
