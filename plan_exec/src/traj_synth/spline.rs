//! Natural cubic spline through a set of knots

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A natural cubic spline `y(x)`.
///
/// Segment `i` is `a[i] + b[i] dx + c[i] dx^2 + d[i] dx^3` with `dx = x - x[i]`. Outside of the
/// knots the spline is extended linearly along its end tangents.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SplineError {
    #[error("Expected the same number of x and y values, got {0} and {1}")]
    LengthMismatch(usize, usize),

    #[error("A spline needs at least 2 knots, got {0}")]
    TooFewKnots(usize),

    #[error("Knot x values must be finite and strictly increasing (knot {0})")]
    NotIncreasing(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CubicSpline {
    /// Fit a natural spline through the given knots.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, SplineError> {
        let n = x.len();

        if n != y.len() {
            return Err(SplineError::LengthMismatch(n, y.len()));
        }
        if n < 2 {
            return Err(SplineError::TooFewKnots(n));
        }
        let increasing = |i: usize| x[i] > x[i - 1] && x[i].is_finite() && x[i - 1].is_finite();
        if let Some(i) = (1..n).find(|&i| !increasing(i)) {
            return Err(SplineError::NotIncreasing(i));
        }

        let a = y.to_vec();
        let mut b = vec![0.0; n];
        let mut c = vec![0.0; n];
        let mut d = vec![0.0; n];

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Tridiagonal system for the second order coefficients, with zero curvature at both ends
        let mut alpha = vec![0.0; n];
        for i in 1..n - 1 {
            alpha[i] = 3.0 / h[i] * (a[i + 1] - a[i]) - 3.0 / h[i - 1] * (a[i] - a[i - 1]);
        }

        let mut l = vec![1.0; n];
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];

        for i in 1..n - 1 {
            l[i] = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (a[j + 1] - a[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        // Slope at the last knot, used to extend the spline past it
        let last = n - 2;
        b[n - 1] = b[last] + 2.0 * c[last] * h[last] + 3.0 * d[last] * h[last].powi(2);

        Ok(Self {
            x: x.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    /// The straight line `y = 0`.
    pub fn flat() -> Self {
        Self {
            x: vec![0.0, 1.0],
            a: vec![0.0; 2],
            b: vec![0.0; 2],
            c: vec![0.0; 2],
            d: vec![0.0; 2],
        }
    }

    /// Evaluate the spline at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();

        if t < self.x[0] {
            return self.a[0] + self.b[0] * (t - self.x[0]);
        }
        if t > self.x[n - 1] {
            return self.a[n - 1] + self.b[n - 1] * (t - self.x[n - 1]);
        }

        let i = self.search_index(t);
        let dx = t - self.x[i];

        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    /// Evaluate the first derivative of the spline at `t`.
    #[cfg(test)]
    pub fn eval_d(&self, t: f64) -> f64 {
        let n = self.x.len();

        if t < self.x[0] {
            return self.b[0];
        }
        if t > self.x[n - 1] {
            return self.b[n - 1];
        }

        let i = self.search_index(t);
        let dx = t - self.x[i];

        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    /// Index of the segment containing `t`, which must be within the knots.
    fn search_index(&self, t: f64) -> usize {
        self.x
            .partition_point(|&x| x <= t)
            .saturating_sub(1)
            .min(self.x.len() - 2)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_passes_through_knots() {
        let x = [-1.0, 0.0, 30.0, 60.0, 90.0];
        let y = [0.2, 0.0, 3.5, 4.0, 4.1];

        let s = CubicSpline::new(&x, &y).unwrap();

        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((s.eval(*xi) - yi).abs() < 1e-9);
        }
    }

    #[test]
    fn test_straight_line_is_exact() {
        let x = [0.0, 1.0, 5.0, 12.0];
        let y: Vec<f64> = x.iter().map(|x| 2.0 * x - 1.0).collect();

        let s = CubicSpline::new(&x, &y).unwrap();

        for &t in &[-3.0, 0.5, 4.0, 11.0, 20.0] {
            assert!((s.eval(t) - (2.0 * t - 1.0)).abs() < 1e-9);
            assert!((s.eval_d(t) - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_linear_extrapolation() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 0.0];

        let s = CubicSpline::new(&x, &y).unwrap();

        let slope = s.eval_d(2.0);
        assert!((s.eval(3.0) - slope).abs() < 1e-9);
        assert!((s.eval(4.0) - 2.0 * slope).abs() < 1e-9);

        // Natural ends have no curvature so the slope carries on continuously
        assert!((s.eval_d(2.0 + 1e-9) - s.eval_d(2.0 - 1e-9)).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_knots() {
        assert_eq!(
            CubicSpline::new(&[0.0, 1.0], &[0.0]).unwrap_err(),
            SplineError::LengthMismatch(2, 1)
        );
        assert_eq!(
            CubicSpline::new(&[0.0], &[0.0]).unwrap_err(),
            SplineError::TooFewKnots(1)
        );
        assert_eq!(
            CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).unwrap_err(),
            SplineError::NotIncreasing(2)
        );
        assert_eq!(
            CubicSpline::new(&[0.0, std::f64::NAN], &[0.0, 1.0]).unwrap_err(),
            SplineError::NotIncreasing(1)
        );
    }

    #[test]
    fn test_flat() {
        let s = CubicSpline::flat();

        assert_eq!(s.eval(-10.0), 0.0);
        assert_eq!(s.eval(0.5), 0.0);
        assert_eq!(s.eval(30.0), 0.0);
    }
}
