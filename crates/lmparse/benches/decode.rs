use criterion::{Criterion, criterion_group, criterion_main};
use lmparse::{
    ocp::{OCP2_LOG_LEN, ocp2},
    schema::{to_report, to_structure},
};

fn gen_page() -> Vec<u8> {
    // Deterministic but non-trivial pattern
    (0..OCP2_LOG_LEN).map(|i| (i * 31 % 256) as u8).collect()
}

fn bench_decode(c: &mut Criterion) {
    let page = gen_page();
    let layout = ocp2();

    c.bench_function("ocp2_structure", |b| {
        b.iter(|| {
            let _ = to_structure(layout, &page).unwrap();
        })
    });

    for verbose in [false, true] {
        c.bench_function(&format!("ocp2_report_verbose_{}", verbose), |b| {
            b.iter(|| {
                let _ = to_report(layout, &page, verbose).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
