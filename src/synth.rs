//! Synthetic signals and noise, for building test light curves.

use std::f64::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{error::ParameterError, series::TimeSeries};

/// Where the random numbers for [`add_noise`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseSeed {
    /// The thread-local generator; different every run.
    #[default]
    Entropy,

    /// A [`StdRng`] seeded with this value, so the noise is reproducible.
    Seeded(u64),
}

impl NoiseSeed {
    pub fn from_option(seed: Option<u64>) -> Self {
        seed.map_or(NoiseSeed::Entropy, NoiseSeed::Seeded)
    }

    /// Run `f` with the random number generator this seed describes.
    pub fn with_rng<T>(self, f: impl FnOnce(&mut dyn rand::RngCore) -> T) -> T {
        match self {
            NoiseSeed::Entropy => f(&mut rand::rng()),
            NoiseSeed::Seeded(seed) => f(&mut StdRng::seed_from_u64(seed)),
        }
    }
}

/// Add `amplitude * sin(2π t / period)` to every flux value.
pub fn inject_signal(
    series: &TimeSeries,
    amplitude: f64,
    period: f64,
) -> Result<TimeSeries, ParameterError> {
    if !amplitude.is_finite() {
        return Err(ParameterError::Amplitude(amplitude));
    }
    if !period.is_finite() || period == 0.0 {
        return Err(ParameterError::Period(period));
    }

    let omega = TAU / period;
    let flux = series
        .time()
        .iter()
        .zip(series.flux())
        .map(|(&t, &f)| f + amplitude * (omega * t).sin())
        .collect();
    Ok(series.with_flux(flux))
}

/// Add uniform noise in `[-amplitude/2, amplitude/2)` to every flux value.
pub fn add_noise<R: Rng + ?Sized>(
    series: &TimeSeries,
    amplitude: f64,
    rng: &mut R,
) -> Result<TimeSeries, ParameterError> {
    if !(amplitude.is_finite() && amplitude >= 0.0) {
        return Err(ParameterError::Amplitude(amplitude));
    }

    let flux = series
        .flux()
        .iter()
        .map(|&f| f + amplitude * rng.random::<f64>() - 0.5 * amplitude)
        .collect();
    Ok(series.with_flux(flux))
}

/// The flux level around which [`window_noise`] draws its values.
pub const WINDOW_NOISE_LEVEL: f64 = 100.0;

/// Replace every flux value with uniform noise in `[99, 101)`. Exporting the
/// result keeps only the sampling pattern (the window function) of the
/// original light curve.
pub fn window_noise<R: Rng + ?Sized>(series: &TimeSeries, rng: &mut R) -> TimeSeries {
    let flux = (0..series.len())
        .map(|_| rng.random_range(WINDOW_NOISE_LEVEL - 1.0..WINDOW_NOISE_LEVEL + 1.0))
        .collect();
    series.with_flux(flux)
}
