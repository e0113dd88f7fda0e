use anyhow::{Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

// ──────────────────────────────────────────────────────────────────────────────
// Data Structures
// ──────────────────────────────────────────────────────────────────────────────

/// Risk and return of one sampled portfolio, both in percent.
///
/// `index` is the generation order (0..count), preserved through the parallel
/// batch so downstream output is reproducible for a given seed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskReturnPoint {
    pub index: usize,
    pub risk: f64,
    pub ret: f64,
}

// ──────────────────────────────────────────────────────────────────────────────
// Weight Sampling
// ──────────────────────────────────────────────────────────────────────────────

/// Generates one long-only random weight vector that sums to 1.0.
///
/// Each component is drawn uniformly from [0, 1) and divided by the vector's
/// own sum, preserving the relative proportions of the raw draw. If every raw
/// draw is exactly zero the normalization would divide by zero, so the sampler
/// falls back to the equal-weight vector instead.
pub fn sample_weights(k: usize, rng: &mut impl Rng) -> Vec<f64> {
    let raw: Vec<f64> = (0..k).map(|_| rng.gen_range(0.0..1.0)).collect();
    let sum: f64 = raw.iter().sum();
    if sum == 0.0 {
        return vec![1.0 / k as f64; k];
    }
    raw.iter().map(|v| v / sum).collect()
}

// ──────────────────────────────────────────────────────────────────────────────
// Risk / Return Evaluation
// ──────────────────────────────────────────────────────────────────────────────

/// Portfolio return: dot product of the weights with the per-asset
/// cumulative returns, fractional.
pub fn portfolio_return(weights: &[f64], cumulative_returns: &[f64]) -> f64 {
    weights
        .iter()
        .zip(cumulative_returns.iter())
        .map(|(w, r)| w * r)
        .sum()
}

/// Portfolio variance: the full quadratic form w' * C * w over the
/// annualized covariance matrix.
pub fn portfolio_variance(weights: &[f64], cov: &[Vec<f64>]) -> f64 {
    let n = weights.len();
    let mut var = 0.0;
    for i in 0..n {
        for j in 0..n {
            var += weights[i] * weights[j] * cov[i][j];
        }
    }
    var
}

// ──────────────────────────────────────────────────────────────────────────────
// Batch Engine
// ──────────────────────────────────────────────────────────────────────────────

/// One SplitMix64 step: derives an independent RNG stream per portfolio
/// index from a single run seed, so the parallel batch is reproducible
/// under any thread schedule.
fn portfolio_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed.wrapping_add(index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Simulates `count` random long-only portfolios over the given asset
/// universe and returns their risk/return points in generation order.
///
/// Risk is sqrt(w'Cw) and return is w . cum, both scaled to percent.
pub fn simulate_portfolios(
    count: usize,
    assets: &[String],
    covariance: &[Vec<f64>],
    cumulative_returns: &[f64],
    seed: u64,
) -> Result<Vec<RiskReturnPoint>> {
    if count == 0 {
        bail!("invalid sample count: at least one portfolio is required");
    }
    let k = assets.len();
    if k == 0 {
        bail!("empty asset universe: nothing to allocate");
    }
    if covariance.len() != k || covariance.iter().any(|row| row.len() != k) {
        bail!(
            "covariance matrix is {}x{}, expected {}x{} for universe {}",
            covariance.len(),
            covariance.first().map_or(0, |row| row.len()),
            k,
            k,
            assets.join(", ")
        );
    }
    if cumulative_returns.len() != k {
        bail!(
            "cumulative-return vector has {} entries, expected {} for universe {}",
            cumulative_returns.len(),
            k,
            assets.join(", ")
        );
    }

    info!(
        "Simulating {} random portfolios over {} assets ({})...",
        count,
        k,
        assets.join(", ")
    );

    let points = (0..count)
        .into_par_iter()
        .map(|index| {
            let mut rng = StdRng::seed_from_u64(portfolio_seed(seed, index as u64));
            let weights = sample_weights(k, &mut rng);
            let variance = portfolio_variance(&weights, covariance);
            let ret = portfolio_return(&weights, cumulative_returns);
            RiskReturnPoint {
                index,
                risk: variance.sqrt() * 100.0,
                ret: ret * 100.0,
            }
        })
        .collect();

    Ok(points)
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    /// RNG whose every draw is zero, forcing the degenerate raw vector.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    fn two_asset_inputs() -> (Vec<String>, Vec<Vec<f64>>, Vec<f64>) {
        (
            vec!["X".into(), "Y".into()],
            vec![vec![0.04, 0.0], vec![0.0, 0.09]],
            vec![0.10, 0.20],
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for k in 1..=8 {
            for _ in 0..100 {
                let w = sample_weights(k, &mut rng);
                let sum: f64 = w.iter().sum();
                assert!(
                    (sum - 1.0).abs() < 1e-9,
                    "weights should sum to 1.0, got {}",
                    sum
                );
                assert!(w.iter().all(|&v| v >= 0.0), "weights should be non-negative");
            }
        }
    }

    #[test]
    fn test_zero_draws_fall_back_to_equal_weights() {
        let w = sample_weights(4, &mut ZeroRng);
        assert_eq!(w.len(), 4);
        for v in &w {
            assert!((v - 0.25).abs() < 1e-12, "expected 1/k, got {}", v);
        }
    }

    #[test]
    fn test_two_asset_evaluation() {
        // 50/50 split of a 20%-vol and a 30%-vol uncorrelated pair:
        // return 0.15, variance 0.0325, volatility ~18.03%.
        let (_, cov, cum) = two_asset_inputs();
        let weights = vec![0.5, 0.5];

        let ret = portfolio_return(&weights, &cum);
        assert!((ret - 0.15).abs() < 1e-12, "return was {}", ret);

        let var = portfolio_variance(&weights, &cov);
        assert!((var - 0.0325).abs() < 1e-12, "variance was {}", var);
        assert!((var.sqrt() * 100.0 - 18.027756377319946).abs() < 1e-9);
    }

    #[test]
    fn test_variance_non_negative_for_random_weights() {
        let (_, cov, _) = two_asset_inputs();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let w = sample_weights(2, &mut rng);
            assert!(portfolio_variance(&w, &cov) >= 0.0);
        }
    }

    #[test]
    fn test_simulate_preserves_order_and_scales_to_percent() {
        let (assets, cov, cum) = two_asset_inputs();
        let points = simulate_portfolios(500, &assets, &cov, &cum, 42).unwrap();

        assert_eq!(points.len(), 500);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.index, i, "gather must preserve generation order");
            assert!(point.risk >= 0.0);
            // Any convex mix of 10% and 20% cumulative returns lands between.
            assert!(point.ret >= 10.0 - 1e-9 && point.ret <= 20.0 + 1e-9);
        }
    }

    #[test]
    fn test_simulate_is_deterministic_per_seed() {
        let (assets, cov, cum) = two_asset_inputs();
        let a = simulate_portfolios(200, &assets, &cov, &cum, 9).unwrap();
        let b = simulate_portfolios(200, &assets, &cov, &cum, 9).unwrap();
        let c = simulate_portfolios(200, &assets, &cov, &cum, 10).unwrap();

        assert_eq!(a, b, "same seed must reproduce the batch exactly");
        assert_ne!(a, c, "different seeds should diverge");
    }

    #[test]
    fn test_zero_count_rejected() {
        let (assets, cov, cum) = two_asset_inputs();
        assert!(simulate_portfolios(0, &assets, &cov, &cum, 1).is_err());
    }

    #[test]
    fn test_empty_universe_rejected() {
        assert!(simulate_portfolios(10, &[], &[], &[], 1).is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let (assets, cov, cum) = two_asset_inputs();

        let narrow_cov = vec![vec![0.04]];
        assert!(simulate_portfolios(10, &assets, &narrow_cov, &cum, 1).is_err());

        let ragged_cov = vec![vec![0.04, 0.0], vec![0.0]];
        assert!(simulate_portfolios(10, &assets, &ragged_cov, &cum, 1).is_err());

        let short_cum = vec![0.10];
        assert!(simulate_portfolios(10, &assets, &cov, &short_cum, 1).is_err());
    }
}
