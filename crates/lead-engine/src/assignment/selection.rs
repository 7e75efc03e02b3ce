//! Weighted random choice over candidate operators

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::types::WeightedOperator;

/// Source of uniform draws for weighted selection
///
/// Production code uses [`RandomDraw`]; tests substitute scripted draws to
/// assert exact outcomes.
pub trait WeightDraw: Send {
    /// Uniform integer in `1..=total`; `total` is never zero
    ///
    /// `total` sums `i64` weights, so it can exceed `u64::MAX`.
    fn draw(&mut self, total: u128) -> u128;
}

/// [`WeightDraw`] backed by a `rand` generator
#[derive(Debug, Clone)]
pub struct RandomDraw<R = SmallRng>(R);

impl RandomDraw<SmallRng> {
    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }
}

impl<R> RandomDraw<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: Rng + Send> WeightDraw for RandomDraw<R> {
    fn draw(&mut self, total: u128) -> u128 {
        self.0.gen_range(1..=total)
    }
}

/// Cumulative-distribution sample over `candidates`
///
/// Candidates are walked in slice order; only positive weights take part.
/// Returns `None` when no candidate has a positive weight.
pub fn select_weighted<'a, D>(candidates: &'a [WeightedOperator], draw: &mut D) -> Option<&'a WeightedOperator>
where
    D: WeightDraw + ?Sized,
{
    let total: u128 = candidates.iter().filter_map(positive_weight).sum();
    if total == 0 {
        return None;
    }

    let target = draw.draw(total).clamp(1, total);
    let mut running = 0u128;
    for candidate in candidates {
        let Some(weight) = positive_weight(candidate) else {
            continue;
        };
        running += weight;
        if running >= target {
            return Some(candidate);
        }
    }
    None
}

fn positive_weight(candidate: &WeightedOperator) -> Option<u128> {
    u128::try_from(candidate.weight).ok().filter(|w| *w > 0)
}
