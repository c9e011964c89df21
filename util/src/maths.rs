//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Get the unsigned angular distance between two angles.
///
/// The raw difference is first reduced into `[0, 2pi)`, after which the shorter way round the
/// circle is returned, so the result lies in `[0, pi]`.
pub fn get_abs_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap_or_else(T::nan);

    let angle = rem_euclid((a - b).abs(), tau_t);

    angle.min(tau_t - angle)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap a signed difference between two positions on a loop of length `period` into
/// `[-period/2, period/2)`.
pub fn wrap_signed<T>(value: T, period: T) -> T
where
    T: Float
{
    let half = period / (T::one() + T::one());

    rem_euclid(value + half, period) - half
}
