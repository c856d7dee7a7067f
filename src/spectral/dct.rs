use ndarray::Array2;

/// Orthonormal DCT-II basis, `[n_filters × n_input]`.
///
/// Row `k` is `sqrt(2 / n) cos(πk(2m + 1) / 2n)`, with row 0 scaled to
/// `1 / sqrt(n)`. Because the full basis is orthonormal, a truncated basis'
/// transpose is the least-squares inverse.
pub fn dct_basis(n_filters: usize, n_input: usize) -> Array2<f32> {
    let n = n_input.max(1) as f64;
    let mut basis = Array2::<f32>::zeros((n_filters, n_input));
    for k in 0..n_filters {
        let scale = if k == 0 {
            (1.0 / n).sqrt()
        } else {
            (2.0 / n).sqrt()
        };
        for m in 0..n_input {
            let angle = std::f64::consts::PI * k as f64 * (2.0 * m as f64 + 1.0) / (2.0 * n);
            basis[[k, m]] = (scale * angle.cos()) as f32;
        }
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_basis_is_orthonormal() {
        let basis = dct_basis(16, 16);
        let gram = basis.dot(&basis.t());
        for i in 0..16 {
            for j in 0..16 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn constant_input_only_excites_first_coefficient() {
        let basis = dct_basis(8, 32);
        let input = Array2::<f32>::from_elem((32, 1), 2.0);
        let coeffs = basis.dot(&input);
        assert!((coeffs[[0, 0]] - 2.0 * 32f32.sqrt()).abs() < 1e-4);
        for k in 1..8 {
            assert!(coeffs[[k, 0]].abs() < 1e-4);
        }
    }
}
