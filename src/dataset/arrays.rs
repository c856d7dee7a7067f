use std::path::Path;

use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{ReadNpyError, WriteNpyError, read_npy, write_npy};

/// Errors raised while reading or writing `.npy` arrays.
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    #[error("Failed to read npy array: {0}")]
    Read(#[from] ReadNpyError),
    #[error("Failed to write npy array: {0}")]
    Write(#[from] WriteNpyError),
    #[error("Expected a 1-D or 2-D array, got {0} dimensions")]
    Rank(usize),
}

/// Load a 1-D or 2-D `.npy` array (f64 or f32) as `Array2<f32>`.
///
/// 1-D arrays become a single column, scalars a `[1 × 1]` array.
pub fn load_array(path: &Path) -> Result<Array2<f32>, ArrayError> {
    let dynamic: ArrayD<f32> = match read_npy::<_, ArrayD<f64>>(path) {
        Ok(values) => values.mapv(|v| v as f32),
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, ArrayD<f32>>(path)?,
        Err(err) => return Err(err.into()),
    };
    into_2d(dynamic)
}

/// Write an `Array2<f32>` as `.npy`.
pub fn save_array(path: &Path, values: &Array2<f32>) -> Result<(), ArrayError> {
    write_npy(path, values)?;
    Ok(())
}

fn into_2d(values: ArrayD<f32>) -> Result<Array2<f32>, ArrayError> {
    let rank = values.ndim();
    match rank {
        0 | 1 => {
            let flat: Vec<f32> = values.iter().copied().collect();
            let rows = flat.len();
            Array2::from_shape_vec((rows, 1), flat).map_err(|_| ArrayError::Rank(rank))
        }
        2 => values
            .into_dimensionality::<Ix2>()
            .map_err(|_| ArrayError::Rank(rank)),
        other => Err(ArrayError::Rank(other)),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn f64_arrays_load_as_f32() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.npy");
        write_npy(&path, &array![[1.0_f64, 2.0], [3.0, 4.0]]).unwrap();
        let loaded = load_array(&path).unwrap();
        assert_eq!(loaded, array![[1.0_f32, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn one_dimensional_arrays_become_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.npy");
        write_npy(&path, &Array1::from(vec![1.0_f32, 2.0, 3.0])).unwrap();
        let loaded = load_array(&path).unwrap();
        assert_eq!(loaded.dim(), (3, 1));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.npy");
        let values = array![[0.5_f32, -1.0, 2.0]];
        save_array(&path, &values).unwrap();
        assert_eq!(load_array(&path).unwrap(), values);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_array(&dir.path().join("missing.npy")),
            Err(ArrayError::Read(_))
        ));
    }
}
