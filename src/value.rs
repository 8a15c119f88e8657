//! Field values exchanged with the codecs.

use crate::bitmap::Bitmap;

/// A single field value, as packed or as decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Binary(Vec<u8>),
    /// Tag (field number) plus the inner value of a tagged subfield.
    Tagged { tag: u32, value: Box<FieldValue> },
    Bitmap(Bitmap),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn tagged(tag: u32, value: FieldValue) -> Self {
        FieldValue::Tagged { tag, value: Box::new(value) }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Binary(_) => "binary",
            FieldValue::Tagged { .. } => "tagged",
            FieldValue::Bitmap(_) => "bitmap",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bitmap(&self) -> Option<&Bitmap> {
        match self {
            FieldValue::Bitmap(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tagged(&self) -> Option<(u32, &FieldValue)> {
        match self {
            FieldValue::Tagged { tag, value } => Some((*tag, value)),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Binary(b)
    }
}

impl From<Bitmap> for FieldValue {
    fn from(b: Bitmap) -> Self {
        FieldValue::Bitmap(b)
    }
}
