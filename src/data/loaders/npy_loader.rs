//! Loader for NumPy `.npy` cubes.
//!
//! Cubes exported from the camera software are stored channels-last,
//! `(height, width, bands)`. Values are kept verbatim; the processing mode
//! decides whether they are later scaled to reflectance.

use std::io::Cursor;
use std::path::Path;

use ndarray::{Array3, ArrayD, Ix3};
use ndarray_npy::ReadNpyExt;

use crate::data::loader::{LoaderError, MeasurementLoader};
use crate::data::{Measurement, ProcessingMode};

/// Loader for NumPy `.npy` files.
///
/// Supported data types: `f64`, `f32`, `u16`, `i16`, `u8`, `i32`.
pub struct NpyLoader {
    mode: ProcessingMode,
}

impl NpyLoader {
    /// NumPy magic bytes: \x93NUMPY
    const MAGIC: &'static [u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }

    /// Check whether the bytes start with the NumPy magic.
    pub fn can_load(data: &[u8]) -> bool {
        data.len() >= Self::MAGIC.len() && data.starts_with(Self::MAGIC)
    }

    fn to_cube<T>(array: ArrayD<T>, path: &Path) -> Result<Array3<f64>, LoaderError>
    where
        T: Copy + Into<f64>,
    {
        log::debug!("NpyLoader: array shape = {:?}", array.shape());

        let array = array.into_dimensionality::<Ix3>().map_err(|_| {
            LoaderError::decode(
                "npy",
                path,
                "expected a 3D array shaped (height, width, bands)",
            )
        })?;

        Ok(array.mapv(Into::into))
    }

    fn decode(data: &[u8], path: &Path) -> Result<Array3<f64>, LoaderError> {
        let mut cursor = Cursor::new(data);

        if let Ok(array) = ArrayD::<f64>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        cursor.set_position(0);
        if let Ok(array) = ArrayD::<f32>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        // Reflectance exports are usually 16-bit integers
        cursor.set_position(0);
        if let Ok(array) = ArrayD::<u16>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        cursor.set_position(0);
        if let Ok(array) = ArrayD::<i16>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        cursor.set_position(0);
        if let Ok(array) = ArrayD::<u8>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        cursor.set_position(0);
        if let Ok(array) = ArrayD::<i32>::read_npy(&mut cursor) {
            return Self::to_cube(array, path);
        }

        Err(LoaderError::decode(
            "npy",
            path,
            "unsupported dtype or invalid format",
        ))
    }
}

impl MeasurementLoader for NpyLoader {
    fn id(&self) -> &'static str {
        "npy"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["npy"]
    }

    fn load(&self, path: &Path) -> Result<Measurement, LoaderError> {
        let data = std::fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if !Self::can_load(&data) {
            return Err(LoaderError::decode("npy", path, "missing NumPy header"));
        }

        let cube = Self::decode(&data, path)?;
        let (h, w, b) = cube.dim();
        log::info!("NpyLoader: loaded {:?} ({}x{} with {} bands)", path, w, h, b);

        Ok(Measurement::new(path, Some(cube), self.mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_metadata() {
        let loader = NpyLoader::new(ProcessingMode::Raw);
        assert_eq!(loader.id(), "npy");
        assert!(loader.extensions().contains(&"npy"));
    }

    #[test]
    fn test_magic_detection() {
        let valid_magic = [0x93, b'N', b'U', b'M', b'P', b'Y', 0x01, 0x00];
        assert!(NpyLoader::can_load(&valid_magic));

        let invalid = [0x89, 0x50, 0x4E, 0x47]; // PNG magic
        assert!(!NpyLoader::can_load(&invalid));
    }

    #[test]
    fn test_load_f64_cube() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.npy");
        let array = Array3::from_shape_fn((2, 3, 4), |(r, c, b)| (r * 100 + c * 10 + b) as f64);
        ndarray_npy::write_npy(&path, &array).unwrap();

        let m = NpyLoader::new(ProcessingMode::Raw).load(&path).unwrap();
        assert_eq!(m.processing_mode, ProcessingMode::Raw);
        assert_eq!(m.cube.unwrap(), array);
    }

    #[test]
    fn test_load_u16_reflectance_cube() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.npy");
        let array = Array3::<u16>::from_elem((2, 2, 3), 4200);
        ndarray_npy::write_npy(&path, &array).unwrap();

        let cube = NpyLoader::new(ProcessingMode::Reflectance)
            .load(&path)
            .unwrap()
            .into_cube()
            .unwrap();
        assert!(cube.data().iter().all(|&v| (v - 0.42).abs() < 1e-12));
    }

    #[test]
    fn test_two_dimensional_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.npy");
        let array = ndarray::Array2::<f64>::zeros((4, 4));
        ndarray_npy::write_npy(&path, &array).unwrap();

        let err = NpyLoader::new(ProcessingMode::Raw).load(&path).unwrap_err();
        assert!(matches!(err, LoaderError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = NpyLoader::new(ProcessingMode::Raw)
            .load(Path::new("/nonexistent/cube.npy"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }
}
