//! Wall-clock timing harness for retrieval benchmarks
//!
//! Runs a query workload `runs + 1` times, discards the cold first pass, and
//! reports mean and quantile latencies in microseconds. The timed span per
//! multi-query covers the parallel variant evaluation and the fusion merge.

use std::io::{self, Write};
use std::time::Instant;

use tracing::info;

use crate::query::MultiQuery;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStats {
    pub mean: f64,
    pub q50: f64,
    pub q90: f64,
    pub q95: f64,
    pub samples: usize,
}

/// Mean and order-statistic quantiles of a sample set, in place.
pub fn quantiles(times: &mut [f64]) -> Option<TimingStats> {
    if times.is_empty() {
        return None;
    }
    times.sort_by(|a, b| a.total_cmp(b));
    let mean = times.iter().sum::<f64>() / times.len() as f64;
    Some(TimingStats {
        mean,
        q50: times[times.len() / 2],
        q90: times[90 * times.len() / 100],
        q95: times[95 * times.len() / 100],
        samples: times.len(),
    })
}

/// Time the full query set `runs + 1` times, discarding the first pass, and
/// log the latency distribution.
pub fn op_perftest<F>(
    mut run: F,
    queries: &[MultiQuery],
    index_type: &str,
    query_type: &str,
    runs: usize,
) -> Option<TimingStats>
where
    F: FnMut(usize, &MultiQuery),
{
    let mut times = Vec::with_capacity(runs * queries.len());
    for round in 0..=runs {
        for (idx, multi_query) in queries.iter().enumerate() {
            let start = Instant::now();
            run(idx, multi_query);
            let usecs = start.elapsed().as_secs_f64() * 1e6;
            if round != 0 {
                times.push(usecs);
            }
        }
    }

    let stats = quantiles(&mut times)?;
    info!("---- {index_type} {query_type}");
    info!("Mean: {}", stats.mean);
    info!("50% quantile: {}", stats.q50);
    info!("90% quantile: {}", stats.q90);
    info!("95% quantile: {}", stats.q95);
    Some(stats)
}

/// Per-query mean latency over `runs` repetitions, one `qid\tusec` row each.
pub fn extract_times<F, W>(
    mut run: F,
    queries: &[MultiQuery],
    runs: usize,
    out: &mut W,
) -> io::Result<()>
where
    F: FnMut(usize, &MultiQuery),
    W: Write,
{
    for (idx, multi_query) in queries.iter().enumerate() {
        let mut total = 0.0f64;
        for _ in 0..runs {
            let start = Instant::now();
            run(idx, multi_query);
            total += start.elapsed().as_secs_f64() * 1e6;
        }
        let mean = total / runs.max(1) as f64;
        let qid = multi_query
            .first()
            .and_then(|q| q.id.clone())
            .unwrap_or_else(|| idx.to_string());
        writeln!(out, "{qid}\t{}", mean.round() as u64)?;
    }
    Ok(())
}
