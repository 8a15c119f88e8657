//! One entry of a field table: whichever codec a field number uses, behind one interface.

use crate::bitmap::BitmapCodec;
use crate::codec::{CodecError, FieldCodec};
use crate::tagged::TaggedFieldCodec;
use crate::value::FieldValue;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldPackager {
    Field(FieldCodec),
    Tagged(TaggedFieldCodec),
    Bitmap(BitmapCodec),
}

impl FieldPackager {
    pub fn description(&self) -> &str {
        match self {
            FieldPackager::Field(c) => c.description(),
            FieldPackager::Tagged(c) => c.description(),
            FieldPackager::Bitmap(c) => c.description(),
        }
    }

    pub fn max_packed_length(&self) -> usize {
        match self {
            FieldPackager::Field(c) => c.max_packed_length(),
            FieldPackager::Tagged(c) => c.max_packed_length(),
            FieldPackager::Bitmap(c) => c.max_packed_length(),
        }
    }

    /// Tagged codecs take [`FieldValue::Tagged`], bitmap codecs [`FieldValue::Bitmap`].
    pub fn pack(&self, value: &FieldValue, out: &mut Vec<u8>) -> Result<usize, CodecError> {
        match (self, value) {
            (FieldPackager::Field(c), v) => c.pack(v, out),
            (FieldPackager::Tagged(c), FieldValue::Tagged { tag, value }) => c.pack(*tag, value, out),
            (FieldPackager::Bitmap(c), FieldValue::Bitmap(b)) => c.pack(b, out),
            (p, v) => Err(CodecError::InvalidEncoding(format!(
                "{}: cannot pack a {} value",
                p.description(),
                v.kind()
            ))),
        }
    }

    pub fn unpack(&self, buf: &[u8], offset: usize) -> Result<(FieldValue, usize), CodecError> {
        match self {
            FieldPackager::Field(c) => c.unpack(buf, offset),
            FieldPackager::Tagged(c) => {
                let (tag, value, n) = c.unpack(buf, offset)?;
                Ok((FieldValue::tagged(tag, value), n))
            }
            FieldPackager::Bitmap(c) => {
                let (bitmap, n) = c.unpack(buf, offset)?;
                Ok((FieldValue::Bitmap(bitmap), n))
            }
        }
    }
}

impl From<FieldCodec> for FieldPackager {
    fn from(c: FieldCodec) -> Self {
        FieldPackager::Field(c)
    }
}

impl From<TaggedFieldCodec> for FieldPackager {
    fn from(c: TaggedFieldCodec) -> Self {
        FieldPackager::Tagged(c)
    }
}

impl From<BitmapCodec> for FieldPackager {
    fn from(c: BitmapCodec) -> Self {
        FieldPackager::Bitmap(c)
    }
}
