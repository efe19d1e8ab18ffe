//! Small statistics used across the pipeline.

/// The median of `values`, averaging the two middle values for an even count.
/// NaNs sort after everything else. Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    let mid = v.len() / 2;
    let (lower, &mut upper, _) = v.select_nth_unstable_by(mid, f64::total_cmp);
    if values.len() % 2 == 1 {
        Some(upper)
    } else {
        // The lower half is unordered; its maximum is the other middle value.
        let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((below + upper) / 2.0)
    }
}

/// How far `flux` is from a straight line, scaled by the uncertainties.
///
/// A first-order polynomial is least-squares fitted against sample index and
/// the reduced chi-squared of the residuals is returned. Values near 1 mean
/// the light curve is consistent with noise around a trend; large values
/// indicate variability. Returns `None` with fewer than two samples or when
/// any uncertainty is zero.
pub fn reduced_chi_squared(flux: &[f64], flux_error: &[f64]) -> Option<f64> {
    assert_eq!(flux.len(), flux_error.len());
    let n = flux.len();
    if n < 2 || flux_error.iter().any(|&e| e == 0.0) {
        return None;
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = flux.iter().sum::<f64>() / nf;
    let (sxy, sxx) = flux
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let chi2 = flux
        .iter()
        .zip(flux_error)
        .enumerate()
        .map(|(i, (&y, &e))| {
            let model = intercept + slope * i as f64;
            ((y - model) / e).powi(2)
        })
        .sum::<f64>();
    Some(chi2 / (nf - 1.0))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[7.0, 7.0, 1.0, 9.0, 7.0, 2.0]), Some(7.0));
    }

    #[test]
    fn chi_squared_of_a_line_is_zero() {
        let flux = (0..10).map(|i| 2.0 * i as f64 + 1.0).collect::<Vec<_>>();
        let err = vec![0.5; 10];
        assert_abs_diff_eq!(reduced_chi_squared(&flux, &err).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn chi_squared_of_alternating_values() {
        // Residuals about the best-fit (flat, mean 0) line are all ±1.
        let flux = [1.0, -1.0, 1.0, -1.0];
        let err = [1.0; 4];
        let chi2 = reduced_chi_squared(&flux, &err).unwrap();
        // The fitted slope isn't exactly zero for an even-length alternation,
        // so the value is a bit under 4/3.
        assert!(chi2 > 0.9 && chi2 < 4.0 / 3.0 + 1e-12);
    }

    #[test]
    fn chi_squared_needs_usable_errors() {
        assert_eq!(reduced_chi_squared(&[1.0], &[1.0]), None);
        assert_eq!(reduced_chi_squared(&[1.0, 2.0], &[1.0, 0.0]), None);
    }
}
