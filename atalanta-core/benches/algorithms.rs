//! Compares the evaluation algorithms on a synthetic frequency index.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use atalanta_core::query::algorithm::{evaluate, Algorithm};
use atalanta_core::query::Query;
use atalanta_core::scorer::ScorerKind;
use atalanta_core::wand::WandData;
use atalanta_core::InvertedIndex;

fn synthetic_index(num_docs: u32, num_terms: usize) -> InvertedIndex {
    let mut rng = StdRng::seed_from_u64(0xa7a1);
    let mut postings = Vec::with_capacity(num_terms);
    for term in 0..num_terms {
        // Earlier terms are denser, like frequency-ordered lexicons.
        let density = 0.5 / (term as f64 + 1.0);
        let mut list = Vec::new();
        for doc in 0..num_docs {
            if rng.gen_bool(density) {
                list.push((doc, rng.gen_range(1..20)));
            }
        }
        postings.push(list);
    }
    InvertedIndex::from_postings(u64::from(num_docs), postings).unwrap()
}

fn bench_algorithms(c: &mut Criterion) {
    let index = synthetic_index(50_000, 8);
    let scorer = ScorerKind::from_name("bm25").unwrap();
    let wdata = WandData::build(&index, &scorer, 64);
    let query = Query {
        id: None,
        terms: vec![0, 2, 5, 7],
        weights: Vec::new(),
    };

    let mut group = c.benchmark_group("top10");
    for algorithm in [
        Algorithm::RankedOr,
        Algorithm::RankedOrTaat,
        Algorithm::Maxscore,
        Algorithm::Wand,
        Algorithm::BlockMaxWand,
        Algorithm::BlockMaxMaxscore,
    ] {
        group.bench_function(algorithm.name(), |b| {
            b.iter(|| {
                black_box(evaluate(
                    algorithm,
                    &index,
                    &wdata,
                    &scorer,
                    black_box(&query),
                    10,
                    algorithm == Algorithm::RankedOrTaat,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_algorithms);
criterion_main!(benches);
