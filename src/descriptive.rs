//! Descriptive statistics over rating and component samples
//!
//! The mean is accumulated in `f64`. Spread and median go through trueno's SIMD
//! `variance()` and aprender's `DescriptiveStats` on values centred at that mean,
//! so the `f32` reduction only ever sees deviations. Large-magnitude components
//! (vote counts, box office) would otherwise cancel in `E[X²] - μ²`.
//!
//! Variance convention: trueno's `variance()` divides by n (population variance).
//! `Moments::sample_variance` rescales by n / (n - 1) where a test needs the
//! unbiased estimate.

use aprender::stats::DescriptiveStats;
use trueno::Vector;

/// First two moments of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub n: usize,
    pub mean: f64,
    /// Divide-by-n variance
    pub population_variance: f64,
}

impl Moments {
    pub fn population_std(&self) -> f64 {
        self.population_variance.sqrt()
    }

    /// Divide-by-(n - 1) variance; `None` below two observations
    pub fn sample_variance(&self) -> Option<f64> {
        if self.n < 2 {
            return None;
        }
        Some(self.population_variance * self.n as f64 / (self.n - 1) as f64)
    }

    pub fn sample_std(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }
}

fn f64_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Deviations from `center`, narrowed to `f32`
fn centred_vector(values: &[f64], center: f64) -> Vector<f32> {
    let deviations: Vec<f32> = values.iter().map(|&v| (v - center) as f32).collect();
    Vector::from_slice(&deviations)
}

/// Mean and population variance; `None` for an empty sample
///
/// A constant sample reports exactly zero variance, regardless of f32 rounding
/// inside the SIMD reduction.
pub fn moments(values: &[f64]) -> Option<Moments> {
    if values.is_empty() {
        return None;
    }

    if is_constant(values) {
        return Some(Moments {
            n: values.len(),
            mean: values[0],
            population_variance: 0.0,
        });
    }

    let mean = f64_mean(values);
    let variance = centred_vector(values, mean).variance().ok()?;

    Some(Moments {
        n: values.len(),
        mean,
        population_variance: f64::from(variance).max(0.0),
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    moments(values).map(|m| m.mean)
}

/// True when every value is identical (or the sample is empty)
pub fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Median via aprender's R-7 quantile; robust to outliers, used as the Levene center
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if is_constant(values) {
        return Some(values[0]);
    }

    let center = f64_mean(values);
    let v = centred_vector(values, center);
    let stats = DescriptiveStats::new(&v);
    match stats.quantile(0.5) {
        Ok(value) => Some(center + f64::from(value)),
        Err(e) => {
            tracing::debug!("median of {} values failed: {}", values.len(), e);
            None
        }
    }
}
