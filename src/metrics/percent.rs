use crate::metrics::{scored_employees, RiskBucket};
use crate::types::DashboardMetrics;

/// Share of scored employees in `bucket`, in `[0, 100]`.
///
/// Returns exactly `0.0` when no employee has been scored.
pub fn risk_bucket_percentage(metrics: &DashboardMetrics, bucket: RiskBucket) -> f64 {
    let total = scored_employees(metrics);
    if total == 0 {
        return 0.0;
    }
    bucket.count(metrics) as f64 / total as f64 * 100.0
}

/// `value * 10^shift`, rounded half away from zero at `decimals` digits.
///
/// Works on the shortest decimal form of `value`, so `0.145` scaled by 100
/// is the half `14.5` and not the binary product `14.499999999999998`.
fn round_scaled(value: f64, shift: i32, decimals: u32) -> f64 {
    let decimals = decimals.min(15);
    let sci = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return 0.0;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return 0.0;
    };
    let digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();

    // digits kept left of the rounding position
    let keep = exponent + 1 + shift + decimals as i32;
    if keep > 36 {
        return value * 10f64.powi(shift);
    }
    if keep < 0 {
        return 0.0;
    }
    let keep = keep as usize;
    let mut units = (0..keep).fold(0u128, |acc, i| {
        acc * 10 + u128::from(digits.get(i).copied().unwrap_or(0))
    });
    if digits.get(keep).is_some_and(|d| *d >= 5) {
        units += 1;
    }
    // -0.0 would print with a sign
    if units == 0 {
        return 0.0;
    }
    let magnitude = units as f64 / 10f64.powi(decimals as i32);
    if value < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// `0.1234, 1` -> `"12.3%"`. Non-finite input renders as zero.
pub fn format_percentage(ratio: f64, decimals: u32) -> String {
    let ratio = if ratio.is_finite() { ratio } else { 0.0 };
    let value = round_scaled(ratio, 2, decimals);
    format!("{value:.prec$}%", prec = decimals.min(15) as usize)
}

/// Each importance divided by the largest one; all zeros when nothing is positive.
pub fn relative_shares(values: &[f64]) -> Vec<f64> {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    values
        .iter()
        .map(|v| {
            if max > 0.0 && v.is_finite() {
                (v / max).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}
