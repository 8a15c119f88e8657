//! Unpack fuzz target: feed arbitrary bytes to every preset's unpack.
//! Unpack must not panic; it returns a value or a CodecError.
//! Build with: cargo fuzz run unpack_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const PRESETS: &[(&str, usize)] = &[
    ("IF_CHAR", 8),
    ("IFA_NUMERIC", 6),
    ("IFA_LLNUM", 19),
    ("IFA_LLLCHAR", 999),
    ("IFA_LLBINARY", 99),
    ("IFA_BITMAP", 16),
    ("IFB_LLNUM", 19),
    ("IFB_NUMERIC", 12),
    ("IFB_LLLBINARY", 255),
    ("IFB_BITMAP", 24),
    ("IFE_LLCHAR", 99),
    ("IFE_BITMAP", 8),
    ("IFEB_LLNUM", 19),
    ("IFAP_LLLCHAR", 200),
    ("IFEP_LLLCHAR", 200),
];

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    for &(name, length) in PRESETS {
        if let Ok(packager) = isofield::catalog::preset(name, length, name) {
            let _ = packager.unpack(data, 0);
            if !data.is_empty() {
                let _ = packager.unpack(data, 1);
            }
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run unpack_fuzz");
}
