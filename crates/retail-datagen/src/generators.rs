//! Composable value generators.

use rand::distributions::{Distribution, Uniform as UniformDist, WeightedIndex};
use rand::{Rng, RngCore};
use rand_distr::Normal;
use rust_decimal::Decimal;
use std::ops::RangeInclusive;

/// A generator that produces values of type `T` from a random source.
///
/// Generators are composable using `map`.
pub trait Gen<T> {
    /// Generate a value using the provided random source.
    fn generate(&self, rng: &mut dyn RngCore) -> T;

    /// Transform the generated value using a function.
    fn map<U, F>(self, f: F) -> Mapped<Self, F, T>
    where
        Self: Sized,
        F: Fn(T) -> U,
    {
        Mapped {
            gen: self,
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A generator that applies a function to transform generated values.
pub struct Mapped<G, F, T> {
    gen: G,
    f: F,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, U, G, F> Gen<U> for Mapped<G, F, T>
where
    G: Gen<T>,
    F: Fn(T) -> U,
{
    fn generate(&self, rng: &mut dyn RngCore) -> U {
        (self.f)(self.gen.generate(rng))
    }
}

/// Integers uniformly distributed over an inclusive range.
pub struct IntRange {
    dist: UniformDist<i64>,
}

impl Gen<i64> for IntRange {
    fn generate(&self, rng: &mut dyn RngCore) -> i64 {
        self.dist.sample(rng)
    }
}

pub fn int_range(range: RangeInclusive<i64>) -> IntRange {
    IntRange {
        dist: UniformDist::new_inclusive(*range.start(), *range.end()),
    }
}

/// Currency amounts with two decimal places, uniform over a cent range.
pub fn money(cents: RangeInclusive<i64>) -> impl Gen<Decimal> {
    int_range(cents).map(|c| Decimal::new(c, 2))
}

/// Pick one of several values with the given relative weights.
pub struct WeightedChoice<T> {
    items: Vec<T>,
    weights: WeightedIndex<f64>,
}

impl<T: Clone> Gen<T> for WeightedChoice<T> {
    fn generate(&self, rng: &mut dyn RngCore) -> T {
        self.items[self.weights.sample(rng)].clone()
    }
}

/// Panics if `items` is empty or any weight is negative.
pub fn weighted_choice<T: Clone>(items: Vec<(T, f64)>) -> WeightedChoice<T> {
    let (items, weights): (Vec<_>, Vec<_>) = items.into_iter().unzip();
    let weights = WeightedIndex::new(&weights).expect("weights must be positive");
    WeightedChoice { items, weights }
}

/// Pick one of several values with equal probability.
pub fn one_of<T: Clone>(items: Vec<T>) -> WeightedChoice<T> {
    weighted_choice(items.into_iter().map(|item| (item, 1.0)).collect())
}

/// Wrap a generator so it yields `None` with the given probability.
pub struct Sometimes<G> {
    gen: G,
    missing_prob: f64,
}

impl<T, G: Gen<T>> Gen<Option<T>> for Sometimes<G> {
    fn generate(&self, rng: &mut dyn RngCore) -> Option<T> {
        if rng.gen_bool(self.missing_prob) {
            None
        } else {
            Some(self.gen.generate(rng))
        }
    }
}

/// `missing_prob` is clamped to [0, 1].
pub fn sometimes_missing<G>(gen: G, missing_prob: f64) -> Sometimes<G> {
    Sometimes {
        gen,
        missing_prob: missing_prob.clamp(0.0, 1.0),
    }
}

/// Normally distributed score on a one-decimal scale, clamped to a range.
pub struct Score {
    dist: Normal<f64>,
    min_tenths: i64,
    max_tenths: i64,
}

impl Gen<Decimal> for Score {
    fn generate(&self, rng: &mut dyn RngCore) -> Decimal {
        let tenths = (self.dist.sample(rng) * 10.0).round() as i64;
        Decimal::new(tenths.clamp(self.min_tenths, self.max_tenths), 1)
    }
}

/// Panics if `std_dev` is negative or not finite.
pub fn score(mean: f64, std_dev: f64, min: f64, max: f64) -> Score {
    Score {
        dist: Normal::new(mean, std_dev).expect("standard deviation must be finite"),
        min_tenths: (min * 10.0).round() as i64,
        max_tenths: (max * 10.0).round() as i64,
    }
}
