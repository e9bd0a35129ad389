//! Small dense least-squares kernel shared by the demand models.
//!
//! The systems solved here are tiny (a handful of coefficients), so plain
//! normal equations with Gaussian elimination are sufficient.

/// Solve `min ||X b - y||^2 + sum_j ridge[j] * b_j^2` via the normal
/// equations. `rows` are the rows of `X`; `ridge` holds one penalty per
/// column (0.0 for unpenalized columns).
///
/// Returns `None` when the system is singular (or the shapes are
/// inconsistent), which callers treat as a failed fit.
pub(crate) fn solve_least_squares(rows: &[Vec<f64>], y: &[f64], ridge: &[f64]) -> Option<Vec<f64>> {
    let n = rows.len();
    if n == 0 || n != y.len() {
        return None;
    }
    let k = rows[0].len();
    if k == 0 || ridge.len() != k || rows.iter().any(|r| r.len() != k) {
        return None;
    }

    // A = X'X + diag(ridge), b = X'y
    let mut a = vec![vec![0.0f64; k]; k];
    let mut b = vec![0.0f64; k];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            b[i] += row[i] * target;
            for j in i..k {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
        a[i][i] += ridge[i];
    }

    solve(a, b)
}

/// Gaussian elimination with partial pivoting for a symmetric positive
/// (semi-)definite system. Near-zero pivots signal a singular system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let k = b.len();
    for col in 0..k {
        let pivot_row = (col..k).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..k {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..k {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; k];
    for row in (0..k).rev() {
        let mut acc = b[row];
        for col in (row + 1)..k {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    if x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(x)
}
