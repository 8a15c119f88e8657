//! Field table schema: the parsed form and its resolution into codecs.

use crate::bitmap::{BitmapCodec, BitmapEncoding};
use crate::catalog;
use crate::codec::{CodecError, FieldCodec, FieldSpec};
use crate::interpreter::{BinaryInterpreter, Interpreter};
use crate::packager::FieldPackager;
use crate::padder::Padder;
use crate::prefixer::Prefixer;
use crate::tagged::{TagLayout, TagSpec, TaggedFieldCodec};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// Root schema: one or more named field tables.
#[derive(Debug, Clone)]
pub struct Schema {
    pub tables: Vec<TableSection>,
}

#[derive(Debug, Clone)]
pub struct TableSection {
    pub name: String,
    pub fields: Vec<FieldEntry>,
}

#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub number: u32,
    pub type_spec: FieldTypeSpec,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldTypeSpec {
    /// `IFA_LLNUM(19)`
    Preset { name: String, length: u64 },
    /// `field(999) { encoding: ebcdic; prefix: ascii(3); }`
    Composed {
        kind: ComposedKind,
        length: u64,
        options: Vec<FieldOption>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposedKind {
    Field,
    Binary,
    Tagged,
    Bitmap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldOption {
    pub key: String,
    pub value: OptionValue,
}

/// `name` or `name(arg)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionValue {
    pub name: String,
    pub arg: Option<u64>,
}

/// Codecs of one table, keyed by field number.
#[derive(Debug, Clone)]
pub struct FieldTable {
    pub name: String,
    pub fields: BTreeMap<u32, FieldPackager>,
}

impl FieldTable {
    pub fn get(&self, number: u32) -> Option<&FieldPackager> {
        self.fields.get(&number)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldPackager)> {
        self.fields.iter().map(|(&n, p)| (n, p))
    }
}

/// Resolved schema: every field built into its codec, tables by name.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub tables: Vec<FieldTable>,
    pub tables_by_name: HashMap<String, usize>,
}

impl ResolvedSchema {
    pub fn resolve(schema: Schema) -> Result<Self, CodecError> {
        let mut tables = Vec::with_capacity(schema.tables.len());
        let mut tables_by_name = HashMap::new();
        for (i, section) in schema.tables.into_iter().enumerate() {
            if tables_by_name.insert(section.name.clone(), i).is_some() {
                return Err(CodecError::Schema(format!("Duplicate table name: {}", section.name)));
            }
            let mut fields = BTreeMap::new();
            for entry in &section.fields {
                let packager = build_packager(entry)?;
                if fields.insert(entry.number, packager).is_some() {
                    return Err(CodecError::Schema(format!(
                        "Duplicate field {} in table {}",
                        entry.number, section.name
                    )));
                }
            }
            debug!(table = %section.name, fields = fields.len(), "resolved field table");
            tables.push(FieldTable { name: section.name, fields });
        }
        Ok(ResolvedSchema { tables, tables_by_name })
    }

    pub fn get_table(&self, name: &str) -> Option<&FieldTable> {
        self.tables_by_name.get(name).map(|&i| &self.tables[i])
    }
}

/// Read, parse and resolve a schema file.
pub fn load_file(path: impl AsRef<Path>) -> Result<ResolvedSchema, CodecError> {
    let source = std::fs::read_to_string(path.as_ref())?;
    let schema = crate::parser::parse(&source).map_err(CodecError::Schema)?;
    ResolvedSchema::resolve(schema)
}

fn build_packager(entry: &FieldEntry) -> Result<FieldPackager, CodecError> {
    let description = entry
        .description
        .clone()
        .unwrap_or_else(|| format!("field {}", entry.number));
    match &entry.type_spec {
        FieldTypeSpec::Preset { name, length } => {
            catalog::preset(name, to_usize(*length)?, &description)
        }
        FieldTypeSpec::Composed { kind, length, options } => {
            let opts = Options::collect(entry.number, options)?;
            let length = to_usize(*length)?;
            build_composed(*kind, length, description, &opts)
        }
    }
}

fn build_composed(
    kind: ComposedKind,
    length: usize,
    description: String,
    opts: &Options<'_>,
) -> Result<FieldPackager, CodecError> {
    let allowed: &[&str] = match kind {
        ComposedKind::Field => &["pad", "encoding", "prefix"],
        ComposedKind::Binary => &["encoding", "prefix"],
        ComposedKind::Tagged => &["pad", "encoding", "prefix", "tag", "layout"],
        ComposedKind::Bitmap => &["encoding", "extended"],
    };
    opts.only(allowed)?;
    match kind {
        ComposedKind::Field => Ok(FieldCodec::new(text_spec(length, description, opts)?)?.into()),
        ComposedKind::Binary => {
            let encoding = opts.lookup("encoding", BinaryInterpreter::Literal, |v| {
                plain(v).and_then(BinaryInterpreter::from_name)
            })?;
            let prefixer = opts.lookup("prefix", Prefixer::None, prefix_option)?;
            Ok(FieldCodec::new(FieldSpec::binary(length, description, encoding, prefixer))?.into())
        }
        ComposedKind::Tagged => {
            let encoder = opts.lookup("tag", Prefixer::None, prefix_option)?;
            if encoder == Prefixer::None {
                return Err(opts.error("tagged field needs a tag encoder"));
            }
            let layout = opts.lookup("layout", TagLayout::TagFirst, |v| {
                plain(v).and_then(TagLayout::from_name)
            })?;
            let spec = text_spec(length, description, opts)?.with_tag(TagSpec::new(encoder, layout));
            Ok(TaggedFieldCodec::new(spec)?.into())
        }
        ComposedKind::Bitmap => {
            let encoding = opts.lookup("encoding", BitmapEncoding::Binary, |v| {
                plain(v).and_then(BitmapEncoding::from_name)
            })?;
            let extended = opts.lookup("extended", false, |v| match plain(v)? {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            })?;
            let codec = if extended {
                BitmapCodec::extended(length, encoding, description)?
            } else {
                BitmapCodec::new(length, encoding, description)?
            };
            Ok(codec.into())
        }
    }
}

fn text_spec(length: usize, description: String, opts: &Options<'_>) -> Result<FieldSpec, CodecError> {
    let padder = opts.lookup("pad", Padder::None, |v| plain(v).and_then(Padder::from_name))?;
    let interpreter = opts.lookup("encoding", Interpreter::Ascii, |v| {
        plain(v).and_then(Interpreter::from_name)
    })?;
    let prefixer = opts.lookup("prefix", Prefixer::None, prefix_option)?;
    Ok(FieldSpec::text(length, description, padder, interpreter, prefixer))
}

fn plain(value: &OptionValue) -> Option<&str> {
    value.arg.is_none().then_some(value.name.as_str())
}

fn prefix_option(value: &OptionValue) -> Option<Prefixer> {
    Prefixer::from_name(&value.name, value.arg)
}

fn to_usize(n: u64) -> Result<usize, CodecError> {
    usize::try_from(n).map_err(|_| CodecError::Schema(format!("length {} out of range", n)))
}

/// Options of one field entry, keyed by name.
struct Options<'a> {
    field: u32,
    by_key: HashMap<&'a str, &'a OptionValue>,
}

impl<'a> Options<'a> {
    fn collect(field: u32, options: &'a [FieldOption]) -> Result<Self, CodecError> {
        let mut by_key = HashMap::new();
        for opt in options {
            if by_key.insert(opt.key.as_str(), &opt.value).is_some() {
                return Err(CodecError::Schema(format!("field {}: duplicate option {}", field, opt.key)));
            }
        }
        Ok(Options { field, by_key })
    }

    fn only(&self, allowed: &[&str]) -> Result<(), CodecError> {
        match self.by_key.keys().copied().find(|k| !allowed.contains(k)) {
            Some(key) => Err(self.error(&format!("option {} not valid here", key))),
            None => Ok(()),
        }
    }

    fn lookup<T>(
        &self,
        key: &str,
        default: T,
        convert: impl Fn(&OptionValue) -> Option<T>,
    ) -> Result<T, CodecError> {
        match self.by_key.get(key).copied() {
            None => Ok(default),
            Some(value) => convert(value).ok_or_else(|| {
                let shown = match value.arg {
                    Some(arg) => format!("{}({})", value.name, arg),
                    None => value.name.clone(),
                };
                self.error(&format!("invalid {}: {}", key, shown))
            }),
        }
    }

    fn error(&self, message: &str) -> CodecError {
        CodecError::Schema(format!("field {}: {}", self.field, message))
    }
}
