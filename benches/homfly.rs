//! HOMFLY-PT engine benchmarks.
//!
//! Compares the backtracking and treewidth engines on small fixture
//! diagrams. Results are cached per link, so every iteration builds a
//! fresh diagram.
//!
//! Run with:
//! ```bash
//! cargo bench --bench homfly
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use homfly_rs::homfly::Algorithm;
use homfly_rs::link::Link;

type Fixture = (&'static str, &'static [i32], &'static [&'static [i32]]);

const FIXTURES: &[Fixture] = &[
    ("trefoil", &[1, 1, 1], &[&[1, -2, 3, -1, 2, -3]]),
    (
        "figure_eight",
        &[1, 1, -1, -1],
        &[&[-1, 2, -3, 4, -2, 1, -4, 3]],
    ),
    (
        "split_trefoils",
        &[1, 1, 1, -1, -1, -1],
        &[&[1, -2, 3, -1, 2, -3], &[4, -5, 6, -4, 5, -6]],
    ),
];

fn build(fixture: &Fixture) -> Link {
    let components: Vec<Vec<i32>> = fixture.2.iter().map(|c| c.to_vec()).collect();
    Link::from_data(fixture.1, &components)
}

fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("homfly");

    for fixture in FIXTURES {
        for (label, alg) in [
            ("backtrack", Algorithm::Backtrack),
            ("treewidth", Algorithm::Treewidth),
        ] {
            group.bench_with_input(
                BenchmarkId::new(label, fixture.0),
                fixture,
                |b, fixture| {
                    b.iter(|| {
                        let link = build(black_box(fixture));
                        link.homfly_az(alg).clone()
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_engines);
criterion_main!(benches);
