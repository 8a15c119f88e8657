//! Pack and unpack single fields from the command line, or list a schema file.
//!
//! Usage:
//!   isofield pack --preset IFA_LLNUM --length 19 4111111111111111
//!   isofield pack --preset IFA_LLBINARY --length 8 --binary CAFE
//!   isofield pack --preset IFAP_LLLCHAR --length 99 --tag 5 HELLO
//!   isofield unpack --preset IFA_LLNUM --length 19 3136343131...
//!   isofield schema tables.fields
//!
//! Set RUST_LOG (e.g. `RUST_LOG=isofield=trace`) to see codec events.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use isofield::dump::{decode_hex, describe, encode_hex, hex_dump};
use isofield::{catalog, load_file, Bitmap, FieldPackager, FieldValue};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack VALUE and print the wire bytes as hex
    Pack {
        #[command(flatten)]
        field: FieldArgs,
        /// VALUE is hex (binary and bitmap fields)
        #[arg(long)]
        binary: bool,
        /// Tag for tagged presets
        #[arg(long)]
        tag: Option<u32>,
        value: String,
    },
    /// Unpack HEX and print the value and consumed length
    Unpack {
        #[command(flatten)]
        field: FieldArgs,
        /// Print a hex dump of the input as well
        #[arg(long)]
        dump: bool,
        hex: String,
    },
    /// Resolve a schema file and list its tables
    Schema { path: PathBuf },
}

#[derive(Args, Debug)]
struct FieldArgs {
    /// Preset name, e.g. IFA_LLNUM
    #[arg(short, long)]
    preset: String,
    /// Maximum length (units; bytes for bitmaps)
    #[arg(short, long)]
    length: usize,
    #[arg(short, long, default_value = "field")]
    description: String,
}

impl FieldArgs {
    fn packager(&self) -> Result<FieldPackager> {
        catalog::preset(&self.preset, self.length, &self.description)
            .with_context(|| format!("building preset {}", self.preset))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Pack { field, binary, tag, value } => pack(&field, binary, tag, &value),
        Command::Unpack { field, dump, hex } => unpack(&field, dump, &hex),
        Command::Schema { path } => schema(&path),
    }
}

fn pack(field: &FieldArgs, binary: bool, tag: Option<u32>, value: &str) -> Result<()> {
    let packager = field.packager()?;
    let inner = if binary {
        let bytes = decode_hex(value).context("VALUE is not hex")?;
        match &packager {
            FieldPackager::Bitmap(_) => FieldValue::Bitmap(Bitmap::from_bytes(bytes)),
            _ => FieldValue::Binary(bytes),
        }
    } else {
        FieldValue::text(value)
    };
    let value = match (&packager, tag) {
        (FieldPackager::Tagged(_), Some(tag)) => FieldValue::tagged(tag, inner),
        (FieldPackager::Tagged(_), None) => bail!("{} is tagged: pass --tag", field.preset),
        (_, Some(_)) => bail!("{} is not tagged", field.preset),
        (_, None) => inner,
    };
    let mut out = Vec::with_capacity(packager.max_packed_length());
    packager.pack(&value, &mut out).context("pack failed")?;
    println!("{}", encode_hex(&out));
    Ok(())
}

fn unpack(field: &FieldArgs, dump: bool, hex: &str) -> Result<()> {
    let packager = field.packager()?;
    let buf = decode_hex(hex).context("input is not hex")?;
    if dump {
        print!("{}", hex_dump(&buf));
    }
    let (value, consumed) = packager.unpack(&buf, 0).context("unpack failed")?;
    println!("{} ({} of {} bytes)", describe(&value), consumed, buf.len());
    Ok(())
}

fn schema(path: &Path) -> Result<()> {
    let resolved = load_file(path).with_context(|| format!("loading {}", path.display()))?;
    for table in &resolved.tables {
        println!("fields {} ({} fields)", table.name, table.len());
        for (number, packager) in table.iter() {
            println!(
                "  {:>3}  {:<40} max {} bytes",
                number,
                packager.description(),
                packager.max_packed_length()
            );
        }
    }
    Ok(())
}
