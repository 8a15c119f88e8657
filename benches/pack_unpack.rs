//! Benchmark: pack and unpack a representative set of field presets (ASCII, BCD, EBCDIC,
//! hex binary, extended bitmap) and a tagged subfield, one field per iteration.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use isofield::{catalog, Bitmap, FieldPackager, FieldValue};

fn cases() -> Vec<(&'static str, FieldPackager, FieldValue)> {
    let mut bitmap = Bitmap::new(128);
    for field in [2, 3, 4, 7, 11, 12, 37, 41, 49, 70, 100] {
        bitmap.set(field, true).expect("field in range");
    }
    let build = |name: &str, length: usize| catalog::preset(name, length, name).expect("preset");
    vec![
        ("IFA_LLNUM", build("IFA_LLNUM", 19), FieldValue::text("4111111111111111")),
        ("IFB_LLNUM", build("IFB_LLNUM", 19), FieldValue::text("4111111111111111")),
        ("IFB_NUMERIC", build("IFB_NUMERIC", 12), FieldValue::text("000000010000")),
        ("IFE_LLLCHAR", build("IFE_LLLCHAR", 999), FieldValue::text("MERCHANT NAME AND LOCATION 123")),
        ("IFA_LLLBINARY", build("IFA_LLLBINARY", 255), FieldValue::Binary((0u8..=127).collect())),
        ("IFA_BITMAP", build("IFA_BITMAP", 16), FieldValue::Bitmap(bitmap)),
        (
            "IFAP_LLLCHAR",
            build("IFAP_LLLCHAR", 200),
            FieldValue::tagged(42, FieldValue::text("SUBFIELD VALUE")),
        ),
    ]
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");
    for (name, packager, value) in cases() {
        let mut out = Vec::with_capacity(packager.max_packed_length());
        group.bench_function(name, |b| {
            b.iter(|| {
                out.clear();
                packager.pack(black_box(&value), &mut out).expect("pack")
            })
        });
    }
    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");
    for (name, packager, value) in cases() {
        let mut packed = Vec::new();
        packager.pack(&value, &mut packed).expect("pack");
        group.bench_function(name, |b| {
            b.iter(|| packager.unpack(black_box(&packed), 0).expect("unpack"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pack, bench_unpack);
criterion_main!(benches);
