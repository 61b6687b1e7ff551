//! Neighbourhood-averaged spectra.
//!
//! A spectrum is read at a clicked coordinate by averaging a square window of
//! `kernel_size × kernel_size` pixels centred on it. Windows that cross the
//! image border are clamped to the image, so edge points average fewer pixels
//! instead of failing.

use std::ops::Range;

use ndarray::{ArrayView3, Axis, Slice};
use thiserror::Error;

use crate::model::{Coordinate, Spectrum};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Coordinate lies outside the image
    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    /// Cube has no spectral bands
    #[error("Cube has no spectral bands")]
    NoBands,
}

/// Rows and columns of a clamped averaging window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectralWindow {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl SpectralWindow {
    /// Window of `kernel_size` centred on `center`, clamped to `height × width`.
    ///
    /// `kernel_size <= 1` selects the single centre pixel. Larger sizes span
    /// `kernel_size / 2` pixels on each side, so even sizes behave like the
    /// next odd size.
    pub fn clamped(
        center: Coordinate,
        kernel_size: usize,
        height: usize,
        width: usize,
    ) -> Result<Self, ExtractError> {
        let out_of_bounds = || ExtractError::OutOfBounds {
            x: center.x,
            y: center.y,
            width,
            height,
        };

        let x = usize::try_from(center.x).map_err(|_| out_of_bounds())?;
        let y = usize::try_from(center.y).map_err(|_| out_of_bounds())?;
        if x >= width || y >= height {
            return Err(out_of_bounds());
        }

        let d = if kernel_size <= 1 { 0 } else { kernel_size / 2 };

        Ok(Self {
            rows: y.saturating_sub(d)..(y + d + 1).min(height),
            cols: x.saturating_sub(d)..(x + d + 1).min(width),
        })
    }

    /// Number of pixels inside the window.
    pub fn pixel_count(&self) -> usize {
        self.rows.len() * self.cols.len()
    }
}

/// Mean spectrum of the neighbourhood around `coordinate`.
///
/// The cube is indexed `(row, column, band)`; the coordinate's `y` selects the
/// row and `x` the column. With `kernel_size <= 1` the result is exactly the
/// pixel's band vector.
pub fn average_spectrum(
    cube: ArrayView3<'_, f64>,
    coordinate: Coordinate,
    kernel_size: usize,
) -> Result<Spectrum, ExtractError> {
    let (height, width, bands) = cube.dim();
    if bands == 0 {
        return Err(ExtractError::NoBands);
    }

    let window = SpectralWindow::clamped(coordinate, kernel_size, height, width)?;

    if window.pixel_count() == 1 {
        let pixel = cube
            .index_axis(Axis(0), window.rows.start)
            .index_axis(Axis(0), window.cols.start)
            .to_vec();
        return Ok(Spectrum::new(pixel));
    }

    let rows = cube.slice_axis(Axis(0), Slice::from(window.rows.clone()));
    let area = rows.slice_axis(Axis(1), Slice::from(window.cols.clone()));
    let n = window.pixel_count() as f64;
    let values = area
        .sum_axis(Axis(0))
        .sum_axis(Axis(0))
        .mapv(|total| total / n)
        .to_vec();

    Ok(Spectrum::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp(h: usize, w: usize, b: usize) -> Array3<f64> {
        Array3::from_shape_fn((h, w, b), |(r, c, k)| (r * 100 + c * 10 + k) as f64)
    }

    fn manual_mean(cube: &Array3<f64>, rows: Range<usize>, cols: Range<usize>) -> Vec<f64> {
        let bands = cube.dim().2;
        let mut out = vec![0.0; bands];
        let mut n = 0.0;
        for r in rows {
            for c in cols.clone() {
                for (k, v) in out.iter_mut().enumerate() {
                    *v += cube[[r, c, k]];
                }
                n += 1.0;
            }
        }
        out.iter().map(|v| v / n).collect()
    }

    #[test]
    fn test_kernel_one_is_exact_pixel() {
        let cube = ramp(5, 6, 51);
        for y in 0..5 {
            for x in 0..6 {
                let spectrum = average_spectrum(cube.view(), Coordinate::new(x, y), 1).unwrap();
                let expected: Vec<f64> =
                    (0..51).map(|k| cube[[y as usize, x as usize, k]]).collect();
                assert_eq!(spectrum.values(), expected.as_slice());
            }
        }
    }

    #[test]
    fn test_kernel_zero_behaves_like_one() {
        let cube = ramp(3, 3, 4);
        let a = average_spectrum(cube.view(), Coordinate::new(1, 2), 0).unwrap();
        let b = average_spectrum(cube.view(), Coordinate::new(1, 2), 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_axis_convention_x_is_column() {
        let cube = ramp(4, 8, 1);
        // x = 7 is a valid column but would be out of range as a row
        let spectrum = average_spectrum(cube.view(), Coordinate::new(7, 1), 1).unwrap();
        assert_eq!(spectrum.values(), &[170.0]);
    }

    #[test]
    fn test_interior_three_by_three_mean() {
        let cube = Array3::from_shape_fn((6, 6, 51), |(r, c, k)| {
            ((r * 7 + c * 13 + k * 3) % 17) as f64 * 0.1
        });
        let spectrum = average_spectrum(cube.view(), Coordinate::new(2, 3), 3).unwrap();
        let expected = manual_mean(&cube, 2..5, 1..4);

        assert_eq!(spectrum.len(), 51);
        for (got, want) in spectrum.values().iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_even_kernel_behaves_like_next_odd() {
        let window4 = SpectralWindow::clamped(Coordinate::new(4, 4), 4, 10, 10).unwrap();
        let window5 = SpectralWindow::clamped(Coordinate::new(4, 4), 5, 10, 10).unwrap();
        assert_eq!(window4, window5);
        assert_eq!(window4.rows, 2..7);
        assert_eq!(window4.pixel_count(), 25);

        let cube = ramp(10, 10, 3);
        let four = average_spectrum(cube.view(), Coordinate::new(4, 4), 4).unwrap();
        let five = average_spectrum(cube.view(), Coordinate::new(4, 4), 5).unwrap();
        assert_eq!(four, five);

        let two = SpectralWindow::clamped(Coordinate::new(4, 4), 2, 10, 10).unwrap();
        assert_eq!(two, SpectralWindow::clamped(Coordinate::new(4, 4), 3, 10, 10).unwrap());
    }

    #[test]
    fn test_left_edge_window_is_clipped() {
        let cube = ramp(10, 10, 5);
        // kernel 5 at x = 0 spills two columns past the left edge
        let window = SpectralWindow::clamped(Coordinate::new(0, 5), 5, 10, 10).unwrap();
        assert_eq!(window.cols, 0..3);
        assert_eq!(window.rows, 3..8);

        let spectrum = average_spectrum(cube.view(), Coordinate::new(0, 5), 5).unwrap();
        let expected = manual_mean(&cube, 3..8, 0..3);
        for (got, want) in spectrum.values().iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn test_corner_window_is_clipped_on_both_axes() {
        let cube = ramp(4, 4, 2);
        let window = SpectralWindow::clamped(Coordinate::new(3, 3), 3, 4, 4).unwrap();
        assert_eq!(window.rows, 2..4);
        assert_eq!(window.cols, 2..4);
        assert_eq!(window.pixel_count(), 4);

        let spectrum = average_spectrum(cube.view(), Coordinate::new(3, 3), 3).unwrap();
        assert_eq!(spectrum.values(), manual_mean(&cube, 2..4, 2..4).as_slice());
    }

    #[test]
    fn test_out_of_bounds_coordinates() {
        let cube = ramp(4, 4, 2);
        for (x, y) in [(-1, 0), (0, -1), (4, 0), (0, 4)] {
            let err = average_spectrum(cube.view(), Coordinate::new(x, y), 3).unwrap_err();
            assert!(matches!(err, ExtractError::OutOfBounds { .. }));
        }
    }

    #[test]
    fn test_empty_band_axis() {
        let cube = Array3::<f64>::zeros((2, 2, 0));
        let err = average_spectrum(cube.view(), Coordinate::new(0, 0), 1).unwrap_err();
        assert_eq!(err, ExtractError::NoBands);
    }
}
