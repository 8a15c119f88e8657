//! Fixed-width padding for text fields.

use crate::codec::CodecError;
use std::borrow::Cow;

/// Padding policy applied before interpretation (pack) and after it (unpack).
///
/// The two right padders differ only for overlong input: [`Padder::Right`] rejects it with
/// [`CodecError::LengthExceeded`], [`Padder::RightTruncating`] cuts it to `max_length`.
/// Dialects pick one or the other per field, so both are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padder {
    /// Identity both ways.
    None,
    /// Prepend the pad char up to `max_length`. Unpad is the identity: numeric fields keep
    /// their zero fill.
    Left(char),
    /// Append the pad char up to `max_length`; overlong values fail.
    Right(char),
    /// Truncate overlong values, then append the pad char up to `max_length`.
    RightTruncating(char),
}

impl Padder {
    pub const LEFT_ZERO: Padder = Padder::Left('0');
    pub const RIGHT_SPACE: Padder = Padder::Right(' ');
    pub const RIGHT_SPACE_TRUNCATING: Padder = Padder::RightTruncating(' ');

    /// Schema/CLI name lookup (`none`, `left_zero`, `right_space`, `right_space_truncating`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Padder::None),
            "left_zero" => Some(Padder::LEFT_ZERO),
            "right_space" => Some(Padder::RIGHT_SPACE),
            "right_space_truncating" => Some(Padder::RIGHT_SPACE_TRUNCATING),
            _ => None,
        }
    }

    pub fn pad<'a>(&self, value: &'a str, max_length: usize) -> Result<Cow<'a, str>, CodecError> {
        let len = value.chars().count();
        match *self {
            Padder::None => Ok(Cow::Borrowed(value)),
            Padder::Left(pad) => {
                if len > max_length {
                    return Err(CodecError::LengthExceeded { length: len, max: max_length });
                }
                if len == max_length {
                    return Ok(Cow::Borrowed(value));
                }
                let mut out = String::with_capacity(max_length);
                out.extend(std::iter::repeat(pad).take(max_length - len));
                out.push_str(value);
                Ok(Cow::Owned(out))
            }
            Padder::Right(pad) => {
                if len > max_length {
                    return Err(CodecError::LengthExceeded { length: len, max: max_length });
                }
                Ok(right_fill(value, len, max_length, pad))
            }
            Padder::RightTruncating(pad) => {
                if len > max_length {
                    return Ok(Cow::Owned(value.chars().take(max_length).collect()));
                }
                Ok(right_fill(value, len, max_length, pad))
            }
        }
    }

    pub fn unpad<'a>(&self, value: &'a str) -> &'a str {
        match *self {
            Padder::None | Padder::Left(_) => value,
            Padder::Right(pad) | Padder::RightTruncating(pad) => value.trim_end_matches(pad),
        }
    }
}

fn right_fill(value: &str, len: usize, max_length: usize, pad: char) -> Cow<'_, str> {
    if len == max_length {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(max_length);
    out.push_str(value);
    out.extend(std::iter::repeat(pad).take(max_length - len));
    Cow::Owned(out)
}
