//! # Random Sampling Primitives
//!
//! The three draws every generator is built from:
//!
//! - [`weighted_pick`]: one weighted draw over a finite table
//! - [`biased_range`]: an averaged, shifted integer draw that favors one end
//!   of a range
//! - [`ExhaustablePool`]: draw-without-replacement over a snapshot
//!
//! All functions take the caller's RNG so a seeded [`rand::rngs::StdRng`]
//! reproduces a whole generation pass.

use crate::{QuartermasterError, QuartermasterResult};
use log::warn;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};

/// Weighted candidate table keyed by template id (or any other ordered key).
///
/// Ordered maps keep draws reproducible for a given seed.
pub type WeightedTable<K = String> = BTreeMap<K, u32>;

/// Upper bound on resampling attempts inside [`biased_range`].
pub const MAX_BIASED_ATTEMPTS: u32 = 10_000;

/// Picks one key from a weighted table.
///
/// Returns `None` when the table is empty or every weight is zero.
///
/// # Examples
///
/// ```
/// use quartermaster::utils::{weighted_pick, WeightedTable};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut table = WeightedTable::new();
/// table.insert("only".to_string(), 5);
/// let mut rng = StdRng::seed_from_u64(1);
/// assert_eq!(weighted_pick(&table, &mut rng).map(String::as_str), Some("only"));
/// ```
pub fn weighted_pick<'a, K, R>(table: &'a BTreeMap<K, u32>, rng: &mut R) -> Option<&'a K>
where
    R: Rng + ?Sized,
{
    let index = WeightedIndex::new(table.values().copied()).ok()?;
    table.keys().nth(index.sample(rng))
}

/// Rolls a percentage chance. `0` never succeeds, `100` or more always does.
pub fn chance_100<R: Rng + ?Sized>(percent: u32, rng: &mut R) -> bool {
    percent >= 100 || rng.gen_range(0..100) < percent
}

/// Uniform integer in `[min, max]`. Returns `min` when the range is empty.
pub fn random_int<R: Rng + ?Sized>(min: i64, max: i64, rng: &mut R) -> i64 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Mean of `n` uniform draws in `[0, 1)`.
fn averaged_uniform<R: Rng + ?Sized>(n: u32, rng: &mut R) -> f64 {
    let total: f64 = (0..n).map(|_| rng.gen::<f64>()).sum();
    total / n as f64
}

/// Draws an integer in `[min, max]` biased toward one end of the range.
///
/// `n` uniform draws are averaged (a bell-shaped approximation; `n = 1` is
/// uniform). A positive `shift` widens the sampled interval below `min` and
/// reflects anything that lands there back across `min`, piling mass onto the
/// low end; a negative `shift` does the same toward `max`.
///
/// With `n >= 2` the folded bell falls off away from `min`. With `n = 1` the
/// fold is flat: the `shift` lowest values get twice the weight of the rest,
/// so `(1, 4, 3, 1)` yields 1, 2 and 3 with probability 2/7 each and 4 with
/// 1/7. Results that still
/// fall outside `[min, max]` are resampled. A shift larger than the range makes
/// that increasingly likely, which is reported as a warning but never as an
/// error.
///
/// # Errors
///
/// [`QuartermasterError::InvalidRange`] when `max < min` or `n == 0`.
///
/// # Examples
///
/// ```
/// use quartermaster::utils::biased_range;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let value = biased_range(1, 4, 3, 2, &mut rng).unwrap();
/// assert!((1..=4).contains(&value));
/// ```
pub fn biased_range<R: Rng + ?Sized>(
    min: i64,
    max: i64,
    shift: i64,
    n: u32,
    rng: &mut R,
) -> QuartermasterResult<i64> {
    if max < min {
        return Err(QuartermasterError::InvalidRange(format!(
            "max {} is below min {}",
            max, min
        )));
    }
    if n < 1 {
        return Err(QuartermasterError::InvalidRange(
            "averaging count must be at least 1".to_string(),
        ));
    }

    if shift.abs() > max - min {
        warn!(
            "Bias shift {} exceeds the range [{}, {}]; most draws will be resampled",
            shift, min, max
        );
    }

    let (low, high) = if shift >= 0 {
        (min - shift, max)
    } else {
        (min, max - shift)
    };
    let width = (high - low + 1) as f64;

    for _ in 0..MAX_BIASED_ATTEMPTS {
        let mut value = low + (averaged_uniform(n, rng) * width).floor() as i64;
        if shift >= 0 && value < min {
            value = 2 * min - 1 - value;
        } else if shift < 0 && value > max {
            value = 2 * max + 1 - value;
        }

        if (min..=max).contains(&value) {
            return Ok(value);
        }
    }

    warn!(
        "Biased draw over [{}, {}] with shift {} never landed in range, using the biased bound",
        min, max, shift
    );
    Ok(if shift >= 0 { min } else { max })
}

/// Draw-without-replacement pool over a snapshot of candidates.
///
/// Used wherever a generator has to "try the next candidate" after a
/// rejection: every value is offered at most once, and the loop ends when the
/// pool is exhausted.
#[derive(Debug, Clone)]
pub struct ExhaustablePool<T> {
    values: VecDeque<T>,
}

impl<T> ExhaustablePool<T> {
    /// Snapshots the given candidates.
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Removes and returns a uniformly random remaining value.
    pub fn draw_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        if self.values.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.values.len());
        self.values.swap_remove_back(index)
    }

    /// Removes and returns the first remaining value.
    pub fn draw_first(&mut self) -> Option<T> {
        self.values.pop_front()
    }

    /// Whether any value is left.
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    /// Number of values left.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the pool is exhausted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn histogram(min: i64, max: i64, shift: i64, n: u32, draws: usize) -> BTreeMap<i64, usize> {
        let mut rng = StdRng::seed_from_u64(20_240_601);
        let mut counts = BTreeMap::new();
        for _ in 0..draws {
            let value = biased_range(min, max, shift, n, &mut rng).unwrap();
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_biased_range_without_shift_is_uniform() {
        let counts = histogram(1, 4, 0, 1, 20_000);
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        for (value, count) in counts {
            assert!(
                (4_500..=5_500).contains(&count),
                "value {} drawn {} times",
                value,
                count
            );
        }
    }

    #[test]
    fn test_biased_range_shift_skews_low() {
        // 20_000 draws: 2/7 is about 5_714, 1/7 about 2_857.
        let counts = histogram(1, 4, 3, 1, 20_000);
        for value in 1..=3 {
            let count = counts.get(&value).copied().unwrap_or(0);
            assert!((5_300..=6_150).contains(&count), "value {} drawn {} times", value, count);
        }
        let fours = counts.get(&4).copied().unwrap_or(0);
        assert!((2_500..=3_250).contains(&fours), "4 drawn {} times", fours);
        let total: i64 = counts.iter().map(|(value, count)| value * *count as i64).sum();
        assert!((total as f64 / 20_000.0) < 2.4);
    }

    #[test]
    fn test_biased_range_negative_shift_skews_high() {
        let counts = histogram(1, 4, -3, 1, 20_000);
        let ones = counts.get(&1).copied().unwrap_or(0);
        assert!((2_500..=3_250).contains(&ones), "1 drawn {} times", ones);
        for value in 2..=4 {
            let count = counts.get(&value).copied().unwrap_or(0);
            assert!((5_300..=6_150).contains(&count), "value {} drawn {} times", value, count);
        }
    }

    #[test]
    fn test_biased_range_averaged_draws_peak_at_min() {
        let counts = histogram(1, 6, 5, 3, 20_000);
        let frequencies: Vec<usize> = (1..=6).map(|value| counts.get(&value).copied().unwrap_or(0)).collect();
        assert!(
            frequencies.windows(2).all(|pair| pair[0] > pair[1]),
            "frequencies {:?}",
            frequencies
        );
    }

    #[test]
    fn test_biased_range_stays_in_bounds_with_large_shift() {
        let counts = histogram(2, 5, 40, 4, 2_000);
        assert!(counts.keys().all(|value| (2..=5).contains(value)));
    }

    #[test]
    fn test_biased_range_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(biased_range(6, 6, 0, 3, &mut rng).unwrap(), 6);
        assert_eq!(biased_range(6, 6, 5, 3, &mut rng).unwrap(), 6);
    }

    #[test]
    fn test_biased_range_rejects_bad_input() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(biased_range(5, 1, 0, 1, &mut rng).is_err());
        assert!(biased_range(1, 5, 0, 0, &mut rng).is_err());
    }

    #[test]
    fn test_weighted_pick_respects_weights() {
        let mut table = WeightedTable::new();
        table.insert("common".to_string(), 90);
        table.insert("rare".to_string(), 10);
        table.insert("never".to_string(), 0);

        let mut rng = StdRng::seed_from_u64(11);
        let mut common = 0;
        for _ in 0..5_000 {
            let pick = weighted_pick(&table, &mut rng).unwrap();
            assert_ne!(pick, "never");
            if pick == "common" {
                common += 1;
            }
        }
        assert!(common > 4_200, "common drawn {} times", common);
    }

    #[test]
    fn test_weighted_pick_empty_or_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let empty: WeightedTable = WeightedTable::new();
        assert!(weighted_pick(&empty, &mut rng).is_none());

        let mut zero = WeightedTable::new();
        zero.insert("a".to_string(), 0);
        assert!(weighted_pick(&zero, &mut rng).is_none());
    }

    #[test]
    fn test_chance_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            assert!(chance_100(100, &mut rng));
            assert!(!chance_100(0, &mut rng));
        }
    }

    #[test]
    fn test_exhaustable_pool_draws_each_value_once() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pool = ExhaustablePool::new(1..=10);
        let mut seen = HashSet::new();
        while let Some(value) = pool.draw_random(&mut rng) {
            assert!(seen.insert(value));
        }
        assert_eq!(seen.len(), 10);
        assert!(!pool.has_values());
        assert!(pool.draw_random(&mut rng).is_none());
    }

    #[test]
    fn test_exhaustable_pool_draw_first_in_order() {
        let mut pool = ExhaustablePool::new(vec!["a", "b", "c"]);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.draw_first(), Some("a"));
        assert_eq!(pool.draw_first(), Some("b"));
        assert_eq!(pool.draw_first(), Some("c"));
        assert!(pool.is_empty());
    }
}
