//! Benchmarks instruction decoder performance.

#[macro_use]
extern crate criterion;

use criterion::{Benchmark, Criterion, Throughput};
use hexane::cpu::decode::Decoder;

/// A hand-assembled mix of addressing modes, immediates, segment prefixes
/// and branches.
///
/// One instruction per line.
static DATA: &str = r#"
01 D8
8B 56 00
B9 0C 00
83 C1 14
8A 00
88 6E 00
C6 03 07
C7 85 85 03 5B 01
2D E8 03
F7 D8
3D E8 03
75 FC
E2 FA
8D 81 8C 05
B1 05
D2 E0
50
5B
86 C3
F3
A4
26 8B 17
E8 10 00
C3
CD 21
EB EE
"#;

fn decode_addressing_mix(c: &mut Criterion) {
    // expected instr count
    let icount = DATA.lines().filter(|line| !line.trim().is_empty()).count();
    let data: Vec<_> = DATA
        .split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).unwrap())
        .collect();
    let bytes = data.len() as u64;

    c.bench(
        "decode",
        Benchmark::new("addressing mix", move |b| {
            b.iter(|| {
                let mut decoder = Decoder::new(&data, 0);
                for _ in 0..icount {
                    criterion::black_box(&decoder.decode_next().unwrap());
                }
            })
        })
        .throughput(Throughput::Bytes(bytes)),
    );
}

criterion_group!(decode, decode_addressing_mix);
criterion_main!(decode);
