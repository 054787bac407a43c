//! Asset-keyed vectors: scores, ranks and weights.
//!
//! Entries keep insertion order, which is the asset order of the source
//! [`PriceTable`](crate::domain::price_table::PriceTable). Ranking ties are
//! broken on this order, so it must never be re-sorted implicitly.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetValues<T> {
    entries: Vec<(String, T)>,
}

/// Per-asset ranking criterion for one evaluation period.
pub type ScoreVector = AssetValues<f64>;
/// 1-based ranks, 1 = best under the strategy's ordering.
pub type RankVector = AssetValues<usize>;
/// Signed portfolio weights.
pub type WeightVector = AssetValues<f64>;

impl<T> AssetValues<T> {
    pub fn new(entries: Vec<(String, T)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, asset: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(name, _)| name == asset)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> AssetValues<U> {
        AssetValues {
            entries: self
                .entries
                .iter()
                .map(|(name, v)| (name.clone(), f(v)))
                .collect(),
        }
    }
}

impl<T> FromIterator<(String, T)> for AssetValues<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl AssetValues<f64> {
    /// Net exposure.
    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    /// Gross exposure: sum of absolute values.
    pub fn gross(&self) -> f64 {
        self.values().map(|v| v.abs()).sum()
    }
}

impl fmt::Display for AssetValues<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, v)| format!("{}={:.4}", name, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
