//! # isofield: ISO 8583 field codecs
//!
//! Composable encoders/decoders for the individual fields of ISO 8583-style financial
//! messages. Every field codec is built from four orthogonal, immutable policies:
//!
//! - [`Padder`]: fixed-width padding (left zero, right space, right space truncating)
//! - [`Interpreter`] / [`BinaryInterpreter`]: value bytes (ASCII, EBCDIC, ISO-8859-1,
//!   packed decimal, hex, signed EBCDIC overpunch)
//! - [`Prefixer`]: length header (ASCII/EBCDIC digits, BCD, binary) or none for fixed fields
//! - an optional [`TagSpec`] for TLV-style subfields ([`TaggedFieldCodec`])
//!
//! [`BitmapCodec`] packs presence bitmaps, including ISO secondary/tertiary extension.
//!
//! ## Building codecs
//!
//! In code, from a [`FieldSpec`]; by preset name via [`catalog::preset`]; or from a schema
//! file:
//!
//! ```text
//! fields base1 {
//!     0: IFA_NUMERIC(4) "MESSAGE TYPE INDICATOR";
//!     2: IFA_LLNUM(19) "PRIMARY ACCOUNT NUMBER";
//!     48: field(999) { encoding: ebcdic; prefix: ascii(3); } "ADDITIONAL DATA";
//! }
//! ```
//!
//! ## Usage
//!
//! ```
//! use isofield::{FieldCodec, FieldSpec, Interpreter, Padder, Prefixer};
//!
//! let pan = FieldCodec::new(FieldSpec::text(19, "PAN", Padder::None, Interpreter::Ascii, Prefixer::LL))?;
//! let mut out = Vec::new();
//! pan.pack_str("4111111111111111", &mut out)?;
//! assert_eq!(out, b"164111111111111111");
//! assert_eq!(pan.unpack_str(&out, 0)?, ("4111111111111111".to_string(), 18));
//! # Ok::<(), isofield::CodecError>(())
//! ```

pub mod ast;
pub mod bitmap;
pub mod catalog;
pub mod codec;
pub mod dump;
pub mod ebcdic;
pub mod interpreter;
pub mod packager;
pub mod padder;
pub mod parser;
pub mod prefixer;
pub mod tagged;
pub mod value;

pub use ast::{load_file, FieldTable, ResolvedSchema, Schema};
pub use bitmap::{Bitmap, BitmapCodec, BitmapEncoding};
pub use codec::{CodecError, Encoding, FieldCodec, FieldSpec};
pub use interpreter::{BcdLayout, BinaryInterpreter, Interpreter};
pub use packager::FieldPackager;
pub use padder::Padder;
pub use parser::parse;
pub use prefixer::Prefixer;
pub use tagged::{TagLayout, TagSpec, TaggedFieldCodec};
pub use value::FieldValue;
