// Dense least-squares solving for the direct rating method.
// Rating systems are rank deficient (ratings only exist up to a shared constant, and
// disconnected schedule components add more freedom), so nothing here needs a unique solution.

/// Pivots at or below this fraction of the largest normal-matrix entry count as zero
const PIVOT_EPS: f64 = 1e-10;

/// A least-squares solution of `a · x = b`.
///
/// Forms the normal equations `aᵀa · x = aᵀb` (always consistent) and reduces them with
/// Gauss-Jordan elimination and partial pivoting. Columns without a usable pivot are free
/// variables and are fixed at zero, which still satisfies the normal equations.
pub fn least_squares(a: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let cols = a.first().map_or(0, |row| row.len());
    if cols == 0 {
        return Vec::new();
    }

    // augmented normal system [aᵀa | aᵀb]
    let mut m = vec![vec![0.0; cols + 1]; cols];
    for (row, rhs) in a.iter().zip(b) {
        for i in 0..cols {
            if row[i] == 0.0 {
                continue;
            }
            for j in 0..cols {
                m[i][j] += row[i] * row[j];
            }
            m[i][cols] += row[i] * rhs;
        }
    }

    let scale = m
        .iter()
        .flat_map(|row| row[..cols].iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let tol = PIVOT_EPS * scale.max(1.0);

    let mut pivot_of = vec![None; cols];
    let mut next_row = 0;
    for col in 0..cols {
        if next_row == cols {
            break;
        }
        let best = (next_row..cols)
            .max_by(|&x, &y| m[x][col].abs().total_cmp(&m[y][col].abs()))
            .unwrap_or(next_row);
        if m[best][col].abs() <= tol {
            continue;
        }
        m.swap(best, next_row);

        let pivot = m[next_row][col];
        for v in m[next_row].iter_mut() {
            *v /= pivot;
        }
        let pivot_row = m[next_row].clone();
        for (r, row) in m.iter_mut().enumerate() {
            if r == next_row || row[col] == 0.0 {
                continue;
            }
            let factor = row[col];
            for (v, p) in row.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
        }
        pivot_of[col] = Some(next_row);
        next_row += 1;
    }

    pivot_of
        .iter()
        .map(|p| p.map_or(0.0, |row| m[row][cols]))
        .collect()
}

/// Shift values so they average to zero
pub fn recenter(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    for v in values.iter_mut() {
        *v -= mean;
    }
}
