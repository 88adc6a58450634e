//! Pure derivation of the average-FCF and FCF-yield metrics.
//!
//! Both functions are total and side-effect-free; the store invokes them on
//! every mutation so the derived pair is always a function of the inputs
//! currently on disk.

/// Average of the present FCF values.
///
/// Absent values are ignored. Returns `None` when no values are present, or
/// when any present value is negative.
pub fn compute_average(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().copied().flatten().collect();

    if present.is_empty() {
        return None;
    }
    if present.iter().any(|v| *v < 0.0) {
        return None;
    }

    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// FCF yield: `average / enterprise_value`, rounded to 3 decimals.
///
/// Returns `None` when either input is absent or the enterprise value is
/// zero or negative.
pub fn compute_yield(average: Option<f64>, enterprise_value: Option<f64>) -> Option<f64> {
    let average = average?;
    let ev = enterprise_value?;
    if ev <= 0.0 {
        return None;
    }
    Some(round3(average / ev))
}

// Round half to even, matching IEEE default rounding rather than half-up.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}
