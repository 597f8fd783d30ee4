//! Thomas algorithm for tridiagonal systems.

use nalgebra::DVector;

/// Solve `lower[i]·x[i-1] + diag[i]·x[i] + upper[i]·x[i+1] = rhs[i]`.
///
/// `lower[0]` and `upper[n-1]` are ignored. Returns `None` when a pivot
/// vanishes; the systems assembled by the solver are diagonally dominant,
/// so that only happens for corrupted input.
pub fn solve(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Option<DVector<f64>> {
    let n = diag.len();
    if n == 0 || lower.len() != n || upper.len() != n || rhs.len() != n {
        return None;
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    let mut pivot = diag[0];
    if pivot.abs() < f64::MIN_POSITIVE {
        return None;
    }
    c_prime[0] = upper[0] / pivot;
    d_prime[0] = rhs[0] / pivot;
    for i in 1..n {
        pivot = diag[i] - lower[i] * c_prime[i - 1];
        if pivot.abs() < f64::MIN_POSITIVE {
            return None;
        }
        c_prime[i] = upper[i] / pivot;
        d_prime[i] = (rhs[i] - lower[i] * d_prime[i - 1]) / pivot;
    }

    let mut x = DVector::zeros(n);
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_system() {
        // [ 2 -1  0] [x0]   [1]
        // [-1  2 -1] [x1] = [0]
        // [ 0 -1  2] [x2]   [1]
        let x = solve(
            &[0.0, -1.0, -1.0],
            &[2.0, 2.0, 2.0],
            &[-1.0, -1.0, 0.0],
            &[1.0, 0.0, 1.0],
        )
        .unwrap();
        for xi in x.iter() {
            assert!((xi - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_mismatched_lengths_and_zero_pivot() {
        assert!(solve(&[0.0], &[1.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]).is_none());
        assert!(solve(&[0.0, 0.0], &[0.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]).is_none());
    }
}
