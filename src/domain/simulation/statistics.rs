//! Sample statistics used to summarise Monte Carlo trials.

/// t_{0.975, df} for df = 1..=30.
const STUDENT_T_975: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160, 2.145, 2.131, 2.120, 2.110, 2.101, 2.093, 2.086,
    2.080, 2.074, 2.069, 2.064, 2.060, 2.056, 2.052, 2.048, 2.045, 2.042,
];

const Z_975: f64 = 1.959_963_984_540_054;

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Bessel-corrected standard deviation; 0 for fewer than two samples.
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    let variance = samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    variance.sqrt()
}

/// `p`-th percentile (0..=100) with linear interpolation between closest ranks.
pub fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Tail value of a distribution: the percentile, but never below the mean.
pub fn tail(samples: &[f64], p: f64) -> f64 {
    percentile(samples, p).max(mean(samples))
}

/// Two-sided 95% Student-t critical value. Tabulated up to 30 degrees of
/// freedom, Cornish-Fisher expansion of the normal quantile above.
pub fn student_t_critical_95(degrees_of_freedom: usize) -> f64 {
    match degrees_of_freedom {
        0 => f64::INFINITY,
        df if df <= STUDENT_T_975.len() => STUDENT_T_975[df - 1],
        df => {
            let n = df as f64;
            let z = Z_975;
            z + (z.powi(3) + z) / (4.0 * n)
                + (5.0 * z.powi(5) + 16.0 * z.powi(3) + 3.0 * z) / (96.0 * n.powi(2))
                + (3.0 * z.powi(7) + 19.0 * z.powi(5) + 17.0 * z.powi(3) - 15.0 * z) / (384.0 * n.powi(3))
        }
    }
}

/// Width of the 95% confidence interval of the mean divided by the mean.
///
/// Infinite for fewer than two samples or a zero mean with spread; zero for a
/// constant sample.
pub fn relative_confidence_width(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return f64::INFINITY;
    }
    let s = std_dev(samples);
    if s == 0.0 {
        return 0.0;
    }
    let m = mean(samples).abs();
    if m < f64::EPSILON {
        return f64::INFINITY;
    }
    let n = samples.len() as f64;
    2.0 * student_t_critical_95(samples.len() - 1) * s / n.sqrt() / m
}
