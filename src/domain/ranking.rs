//! Ranking engine: scores to ranks, ranks to signed weights.

use crate::domain::asset_values::{RankVector, ScoreVector, WeightVector};
use crate::domain::error::PortfolioError;
use std::cmp::Ordering;

/// Scores closer than this are treated as tied when checking for a
/// degenerate (all-equal) score vector.
const TIE_TOLERANCE: f64 = 1e-12;

/// Rank scores 1..=N.
///
/// `ascending = false` gives rank 1 to the largest score. Equal scores keep
/// their input order (stable sort), so the first-seen asset gets the better
/// rank. Fails when there is nothing to rank, when a score is not finite, or
/// when two or more assets are all tied.
pub fn rank(scores: &ScoreVector, ascending: bool) -> Result<RankVector, PortfolioError> {
    if scores.is_empty() {
        return Err(PortfolioError::degenerate("no scores to rank"));
    }
    if let Some((asset, _)) = scores.iter().find(|(_, s)| !s.is_finite()) {
        return Err(PortfolioError::degenerate(format!(
            "score for {asset} is not finite"
        )));
    }

    let values: Vec<f64> = scores.values().copied().collect();
    let first = values[0];
    if values.len() > 1 && values.iter().all(|v| (v - first).abs() <= TIE_TOLERANCE) {
        return Err(PortfolioError::degenerate(format!(
            "all {} scores are tied",
            values.len()
        )));
    }

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal);
        if ascending { cmp } else { cmp.reverse() }
    });

    let mut ranks = vec![0usize; values.len()];
    for (position, &idx) in order.iter().enumerate() {
        ranks[idx] = position + 1;
    }

    Ok(scores
        .assets()
        .zip(ranks)
        .map(|(asset, r)| (asset.to_string(), r))
        .collect())
}

/// `alpha * (rank - mean(rank))`. Sums to zero up to rounding.
pub fn demeaned_weight(ranks: &RankVector, alpha: f64) -> WeightVector {
    if ranks.is_empty() {
        return WeightVector::new(Vec::new());
    }
    let mean = ranks.values().map(|&r| r as f64).sum::<f64>() / ranks.len() as f64;
    ranks.map(|&r| alpha * (r as f64 - mean))
}

/// Scale weights so that gross exposure is 1.
pub fn normalized_weight(weights: &WeightVector) -> Result<WeightVector, PortfolioError> {
    let gross = weights.gross();
    if gross == 0.0 || !gross.is_finite() {
        return Err(PortfolioError::degenerate(
            "sum of absolute weights is zero",
        ));
    }
    Ok(weights.map(|w| w / gross))
}

/// Equal-weight long/short book from ranks.
///
/// The best `floor(N * top_fraction)` ranks go long at `0.5 / long_count`
/// each; everything else goes short at `-0.5 / short_count`. With an odd
/// count and `top_fraction = 0.5` the short side takes the extra asset.
pub fn long_short_split(
    ranks: &RankVector,
    top_fraction: f64,
) -> Result<WeightVector, PortfolioError> {
    if !(top_fraction > 0.0 && top_fraction < 1.0) {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "top_fraction",
            format!("{top_fraction} is outside (0, 1)"),
        ));
    }

    let n = ranks.len();
    let long_count = (n as f64 * top_fraction).floor() as usize;
    let short_count = n - long_count;
    if long_count == 0 || short_count == 0 {
        return Err(PortfolioError::degenerate(format!(
            "cannot split {n} assets into long and short legs"
        )));
    }

    let long_weight = 0.5 / long_count as f64;
    let short_weight = -0.5 / short_count as f64;
    Ok(ranks.map(|&r| if r <= long_count { long_weight } else { short_weight }))
}
