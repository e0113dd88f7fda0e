use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{DEFAULT_BOUNDARY_MARGIN, DEFAULT_RISK_BUCKET_DECIMALS};
use crate::portfolio::RiskReturnPoint;

// ──────────────────────────────────────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────────────────────────────────────

/// Tunables for frontier extraction.
#[derive(Clone, Copy, Debug)]
pub struct FrontierConfig {
    /// Decimal places risk values are rounded to before grouping. Without
    /// rounding, risks from independent random samples almost never collide,
    /// so no bucket would ever hold more than one point.
    pub bucket_decimals: u32,
    /// Relative margin added past the riskiest sampled portfolio when
    /// placing the right endpoint of the boundary segment.
    pub boundary_margin: f64,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            bucket_decimals: DEFAULT_RISK_BUCKET_DECIMALS,
            boundary_margin: DEFAULT_BOUNDARY_MARGIN,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Data Structures
// ──────────────────────────────────────────────────────────────────────────────

/// A point on the efficient-frontier curve (risk and return in percent).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub risk: f64,
    pub ret: f64,
}

/// Everything the frontier extraction derives from one risk/return dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrontierAnalysis {
    /// The single lowest-risk portfolio (ties broken by higher return): the
    /// tip of the bullet-shaped cloud where the frontier starts.
    pub most_efficient: RiskReturnPoint,
    /// A horizontal segment from the most efficient portfolio to the right
    /// edge of the risk axis, splitting the cloud into its efficient upper
    /// half and inefficient lower half. Purely a rendering aid; the second
    /// point is not a portfolio.
    pub boundary: [FrontierPoint; 2],
    /// The frontier curve: per rounded risk level, the best attainable
    /// return, ordered by strictly increasing risk.
    pub curve: Vec<FrontierPoint>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Extraction
// ──────────────────────────────────────────────────────────────────────────────

/// Selects the portfolio with the lowest risk, ties broken by the highest
/// return. An empty dataset yields the (0, 0) sentinel instead of panicking;
/// callers treat that as "nothing to show".
pub fn most_efficient_portfolio(points: &[RiskReturnPoint]) -> RiskReturnPoint {
    points
        .iter()
        .copied()
        .min_by(|a, b| a.risk.total_cmp(&b.risk).then(b.ret.total_cmp(&a.ret)))
        .unwrap_or(RiskReturnPoint {
            index: 0,
            risk: 0.0,
            ret: 0.0,
        })
}

/// Extracts the efficient frontier from a risk/return dataset.
///
/// Pipeline: find the most efficient portfolio, keep the upper half of the
/// cloud (return >= its return), group those points by risk rounded to
/// `bucket_decimals` places, keep the best return per group, and read the
/// groups out in ascending risk order.
pub fn extract(points: &[RiskReturnPoint], config: &FrontierConfig) -> FrontierAnalysis {
    let most_efficient = most_efficient_portfolio(points);

    let max_risk = points.iter().map(|p| p.risk).fold(0.0, f64::max);
    let boundary = [
        FrontierPoint {
            risk: most_efficient.risk,
            ret: most_efficient.ret,
        },
        FrontierPoint {
            risk: max_risk * (1.0 + config.boundary_margin),
            ret: most_efficient.ret,
        },
    ];

    let factor = 10f64.powi(config.bucket_decimals as i32);
    let mut best_by_bucket: BTreeMap<i64, f64> = BTreeMap::new();
    for point in points.iter().filter(|p| p.ret >= most_efficient.ret) {
        let bucket = (point.risk * factor).round() as i64;
        best_by_bucket
            .entry(bucket)
            .and_modify(|best| {
                if point.ret > *best {
                    *best = point.ret;
                }
            })
            .or_insert(point.ret);
    }

    // The filter always keeps the most efficient point itself, but guard
    // against comparator edge cases by falling back to a singleton curve.
    let curve: Vec<FrontierPoint> = if best_by_bucket.is_empty() {
        vec![FrontierPoint {
            risk: most_efficient.risk,
            ret: most_efficient.ret,
        }]
    } else {
        best_by_bucket
            .into_iter()
            .map(|(bucket, ret)| FrontierPoint {
                risk: bucket as f64 / factor,
                ret,
            })
            .collect()
    };

    FrontierAnalysis {
        most_efficient,
        boundary,
        curve,
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(index: usize, risk: f64, ret: f64) -> RiskReturnPoint {
        RiskReturnPoint { index, risk, ret }
    }

    fn config(bucket_decimals: u32) -> FrontierConfig {
        FrontierConfig {
            bucket_decimals,
            boundary_margin: 0.02,
        }
    }

    #[test]
    fn test_most_efficient_breaks_risk_ties_by_return() {
        let points = vec![pt(0, 5.0, 10.0), pt(1, 5.0, 12.0), pt(2, 8.0, 9.0)];
        let best = most_efficient_portfolio(&points);
        assert_eq!(best.index, 1);
        assert_eq!(best.risk, 5.0);
        assert_eq!(best.ret, 12.0);
    }

    #[test]
    fn test_tied_cloud_collapses_to_single_frontier_point() {
        // The upper-half filter against return 12 discards everything else.
        let points = vec![pt(0, 5.0, 10.0), pt(1, 5.0, 12.0), pt(2, 8.0, 9.0)];
        let analysis = extract(&points, &config(2));

        assert_eq!(analysis.most_efficient.risk, 5.0);
        assert_eq!(analysis.most_efficient.ret, 12.0);
        assert_eq!(analysis.curve, vec![FrontierPoint { risk: 5.0, ret: 12.0 }]);
    }

    #[test]
    fn test_bucketing_keeps_best_return_per_rounded_risk() {
        let points = vec![
            pt(0, 5.01, 10.0),
            pt(1, 5.04, 11.0),
            pt(2, 7.0, 15.0),
            pt(3, 7.02, 14.0),
        ];
        let analysis = extract(&points, &config(1));

        assert_eq!(analysis.most_efficient.risk, 5.01);
        assert_eq!(analysis.most_efficient.ret, 10.0);
        assert_eq!(
            analysis.curve,
            vec![
                FrontierPoint { risk: 5.0, ret: 11.0 },
                FrontierPoint { risk: 7.0, ret: 15.0 },
            ]
        );
    }

    #[test]
    fn test_empty_dataset_yields_sentinel() {
        let analysis = extract(&[], &FrontierConfig::default());

        assert_eq!(analysis.most_efficient.risk, 0.0);
        assert_eq!(analysis.most_efficient.ret, 0.0);
        assert_eq!(analysis.curve, vec![FrontierPoint { risk: 0.0, ret: 0.0 }]);
        assert_eq!(analysis.boundary[1].risk, 0.0);
    }

    #[test]
    fn test_boundary_extends_past_riskiest_point() {
        let points = vec![pt(0, 4.0, 8.0), pt(1, 10.0, 6.0)];
        let analysis = extract(&points, &config(2));

        assert_eq!(analysis.boundary[0].risk, 4.0);
        assert_eq!(analysis.boundary[0].ret, 8.0);
        assert!((analysis.boundary[1].risk - 10.2).abs() < 1e-12);
        assert_eq!(analysis.boundary[1].ret, 8.0);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let points = vec![
            pt(0, 5.11, 9.0),
            pt(1, 5.14, 9.5),
            pt(2, 6.0, 12.0),
            pt(3, 6.49, 11.0),
            pt(4, 8.0, 13.0),
        ];
        let cfg = config(1);
        let first = extract(&points, &cfg);
        let second = extract(&points, &cfg);

        assert_eq!(first.most_efficient, second.most_efficient);
        assert_eq!(first.curve, second.curve);
        assert_eq!(first.boundary, second.boundary);
    }

    #[test]
    fn test_curve_risks_strictly_increase() {
        let points: Vec<RiskReturnPoint> = (0..500)
            .map(|i| {
                let risk = 3.0 + (i as f64 * 0.017) % 9.0;
                let ret = 5.0 + (i as f64 * 0.031) % 7.0;
                pt(i, risk, ret)
            })
            .collect();

        let analysis = extract(&points, &FrontierConfig::default());
        assert!(!analysis.curve.is_empty());
        for pair in analysis.curve.windows(2) {
            assert!(
                pair[1].risk > pair[0].risk,
                "each bucket contributes exactly one strictly-greater risk"
            );
        }
        for point in &analysis.curve {
            assert!(point.ret >= analysis.most_efficient.ret);
        }
    }
}
