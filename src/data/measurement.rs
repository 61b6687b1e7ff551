//! Loaded measurements and the cube they carry.

use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::constants::REFLECTANCE_SCALE;
use crate::data::LoaderError;

/// How the camera software processed a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Raw sensor counts.
    Raw,
    /// Reflectance stored as an integer multiple of [`REFLECTANCE_SCALE`].
    #[default]
    Reflectance,
}

/// A measurement as returned by a loader.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub path: PathBuf,
    /// Spectral cube `(height, width, bands)`, if the file contained one.
    pub cube: Option<Array3<f64>>,
    pub processing_mode: ProcessingMode,
}

impl Measurement {
    pub fn new(path: &Path, cube: Option<Array3<f64>>, processing_mode: ProcessingMode) -> Self {
        Self {
            path: path.to_path_buf(),
            cube,
            processing_mode,
        }
    }

    pub fn is_reflectance(&self) -> bool {
        self.processing_mode == ProcessingMode::Reflectance
    }

    /// Take the cube out of the measurement.
    ///
    /// Reflectance-mode values are divided by [`REFLECTANCE_SCALE`] so the
    /// result lies in 0..1; raw cubes are returned unchanged.
    pub fn into_cube(self) -> Result<Cube, LoaderError> {
        let reflectance = self.is_reflectance();
        let mut data = self
            .cube
            .ok_or(LoaderError::CubeNotFound { path: self.path })?;

        if reflectance {
            data.mapv_inplace(|v| v / REFLECTANCE_SCALE);
        }

        Ok(Cube::new(data))
    }
}

/// A hyperspectral cube indexed `(row, column, band)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    data: Array3<f64>,
}

impl Cube {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array3<f64> {
        self.data
    }

    /// `(height, width, bands)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn band_count(&self) -> usize {
        self.data.dim().2
    }

    /// One spectral channel as a `(height, width)` image.
    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        (index < self.band_count()).then(|| self.data.index_axis(Axis(2), index))
    }

    /// Band vector of the pixel in column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<ArrayView1<'_, f64>> {
        (y < self.height() && x < self.width())
            .then(|| self.data.index_axis(Axis(0), y).index_axis_move(Axis(0), x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(h: usize, w: usize, b: usize) -> Array3<f64> {
        Array3::from_shape_fn((h, w, b), |(r, c, k)| (r * 100 + c * 10 + k) as f64)
    }

    #[test]
    fn test_reflectance_cube_is_scaled() {
        let m = Measurement::new(
            Path::new("a.npy"),
            Some(Array3::from_elem((1, 1, 2), 2500.0)),
            ProcessingMode::Reflectance,
        );
        let cube = m.into_cube().unwrap();
        assert_eq!(cube.data()[[0, 0, 1]], 0.25);
    }

    #[test]
    fn test_raw_cube_is_untouched() {
        let m = Measurement::new(Path::new("a.npy"), Some(ramp(2, 2, 2)), ProcessingMode::Raw);
        let cube = m.into_cube().unwrap();
        assert_eq!(cube.data(), &ramp(2, 2, 2));
    }

    #[test]
    fn test_missing_cube_is_an_error() {
        let m = Measurement::new(Path::new("a.npy"), None, ProcessingMode::Raw);
        assert!(matches!(m.into_cube(), Err(LoaderError::CubeNotFound { .. })));
    }

    #[test]
    fn test_pixel_uses_row_column_order() {
        let cube = Cube::new(ramp(3, 4, 2));
        let px = cube.pixel(3, 1).unwrap();
        assert_eq!(px.to_vec(), vec![130.0, 131.0]);
        assert!(cube.pixel(4, 0).is_none());
        assert!(cube.pixel(0, 3).is_none());
    }

    #[test]
    fn test_band_view() {
        let cube = Cube::new(ramp(2, 3, 4));
        let band = cube.band(2).unwrap();
        assert_eq!(band.dim(), (2, 3));
        assert_eq!(band[[1, 2]], 122.0);
        assert!(cube.band(4).is_none());
    }
}
