use crate::error::{Error, Result};

/// Natural cubic spline through a set of knots.
///
/// Segment `i` covers `[x_i, x_{i+1})` and evaluates
/// `a_i + b_i·t + c_i·t² + d_i·t³` with `t = x - x_i`. Second derivatives
/// vanish at both ends.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    knots: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl CubicSpline {
    /// Fit through `(x[i], y[i])`. `x` must be strictly increasing and hold at
    /// least two knots.
    pub fn natural(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n < 2 || y.len() != n {
            return Err(Error::config(format!(
                "spline needs at least two knots with matching values, got {} x and {} y",
                n,
                y.len()
            )));
        }
        if x.windows(2).any(|p| p[1] <= p[0]) {
            return Err(Error::config("spline knots must be strictly increasing"));
        }

        let h: Vec<f64> = x.windows(2).map(|p| p[1] - p[0]).collect();
        let a = y.to_vec();

        // Tridiagonal solve for the quadratic coefficients
        let mut mu = vec![0.0; n];
        let mut z = vec![0.0; n];
        for i in 1..n - 1 {
            let alpha = 3.0 * (a[i + 1] - a[i]) / h[i] - 3.0 * (a[i] - a[i - 1]) / h[i - 1];
            let l = 2.0 * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l;
            z[i] = (alpha - h[i - 1] * z[i - 1]) / l;
        }

        let mut c = vec![0.0; n];
        let mut b = vec![0.0; n - 1];
        let mut d = vec![0.0; n - 1];
        for i in (0..n - 1).rev() {
            c[i] = z[i] - mu[i] * c[i + 1];
            b[i] = (a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0;
            d[i] = (c[i + 1] - c[i]) / (3.0 * h[i]);
        }

        let mut a = a;
        a.pop();
        c.pop();
        Ok(Self {
            knots: x.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    /// Number of polynomial segments.
    pub fn segments(&self) -> usize {
        self.a.len()
    }

    pub fn knot(&self, i: usize) -> f64 {
        self.knots[i]
    }

    /// Evaluate segment `seg` at offset `t` from its left knot.
    #[inline]
    pub fn eval_segment(&self, seg: usize, t: f64) -> f64 {
        self.a[seg] + t * (self.b[seg] + t * (self.c[seg] + t * self.d[seg]))
    }

    /// Evaluate at `x`, extrapolating the outer segments beyond the knots.
    pub fn eval(&self, x: f64) -> f64 {
        let seg = self
            .knots
            .partition_point(|&k| k <= x)
            .saturating_sub(1)
            .min(self.segments() - 1);
        self.eval_segment(seg, x - self.knots[seg])
    }
}
