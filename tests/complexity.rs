//! Comparison-count scaling regression.
//!
//! Inserting and finding must stay at O(log n) comparisons as the map grows.
//! A key type counts every comparison through a process-wide counter, and a
//! ratio-consistency score (1 minus the coefficient of variation of y/x)
//! picks the best-fitting growth curve out of log n, sqrt n and n. The fit
//! must be log n, confidently and with clear separation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use squaremap::SquareMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

static COMPARISONS: AtomicU64 = AtomicU64::new(0);

const CONFIDENCE_THRESHOLD: f64 = 0.80;
const SEPARATION_THRESHOLD: f64 = 0.20;

// Small sizes have different constants; start where the curve shape counts.
const TEST_SIZES: [usize; 4] = [8_000, 16_000, 32_000, 64_000];

#[derive(Clone, Copy, Debug)]
struct Probe(u32);

impl PartialEq for Probe {
    fn eq(&self, other: &Self) -> bool {
        COMPARISONS.fetch_add(1, Relaxed);
        self.0 == other.0
    }
}

impl Eq for Probe {}

impl PartialOrd for Probe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Probe {
    fn cmp(&self, other: &Self) -> Ordering {
        COMPARISONS.fetch_add(1, Relaxed);
        self.0.cmp(&other.0)
    }
}

fn drain_counter() -> u64 {
    COMPARISONS.swap(0, Relaxed)
}

/// How close y/x is to a constant: 1.0 for perfect proportionality, falling
/// toward 0.0 as the ratios spread out.
fn ratio_consistency(x: &[f64], y: &[f64]) -> f64 {
    let ratios: Vec<f64> = x
        .iter()
        .zip(y)
        .filter(|(x, _)| **x != 0.0)
        .map(|(x, y)| y / x)
        .collect();
    if ratios.len() < 2 {
        return 0.0;
    }
    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    let variance = ratios.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / ratios.len() as f64;
    let cv = if mean == 0.0 { 1.0 } else { variance.sqrt() / mean.abs() };
    (1.0 - cv).max(0.0)
}

fn assert_logarithmic(operation: &str, sizes: &[f64], per_op: &[f64]) {
    let log_n: Vec<f64> = sizes.iter().map(|n| n.log2()).collect();
    let sqrt_n: Vec<f64> = sizes.iter().map(|n| n.sqrt()).collect();
    let linear_n: Vec<f64> = sizes.to_vec();

    let mut scores = [
        (ratio_consistency(&log_n, per_op), "O(log n)"),
        (ratio_consistency(&sqrt_n, per_op), "O(sqrt n)"),
        (ratio_consistency(&linear_n, per_op), "O(n)"),
    ];
    scores.sort_by(|a, b| b.0.total_cmp(&a.0));

    let (best_score, best_fit) = scores[0];
    let margin = best_score - scores[1].0;
    assert_eq!(
        best_fit, "O(log n)",
        "{operation}: best fit was {best_fit} (score {best_score:.3}), data {per_op:?}"
    );
    assert!(
        best_score >= CONFIDENCE_THRESHOLD,
        "{operation}: weak confidence {best_score:.3}, data {per_op:?}"
    );
    assert!(
        margin >= SEPARATION_THRESHOLD,
        "{operation}: margin {margin:.3} over {} too small, data {per_op:?}",
        scores[1].1
    );
}

#[test]
fn comparisons_per_operation_grow_logarithmically() {
    let mut insert_comps = Vec::new();
    let mut lookup_comps = Vec::new();

    for &n in &TEST_SIZES {
        let mut rng = StdRng::seed_from_u64(0);
        let mut order: Vec<u32> = (0..n as u32).collect();
        order.shuffle(&mut rng);

        drain_counter();
        let mut map = SquareMap::new();
        for &i in &order {
            map.insert(Probe(i), i);
        }
        insert_comps.push(drain_counter() as f64 / n as f64);

        order.shuffle(&mut rng);
        drain_counter();
        for &i in &order {
            assert!(map.get(&Probe(i)).is_some());
        }
        lookup_comps.push(drain_counter() as f64 / n as f64);

        map.validate();
    }

    let sizes: Vec<f64> = TEST_SIZES.iter().map(|&n| n as f64).collect();
    assert_logarithmic("insert comparisons", &sizes, &insert_comps);
    assert_logarithmic("find comparisons", &sizes, &lookup_comps);
}
