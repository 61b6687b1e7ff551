//! Dark/white reference calibration of raw measurements.
//!
//! Reflectance is `(raw - dark) / (white - dark)`, stored scaled by
//! [`REFLECTANCE_SCALE`] so that the result is interchangeable with
//! reflectance-mode measurements produced by the camera software.

use ndarray::{Array3, Zip};
use thiserror::Error;

use crate::constants::REFLECTANCE_SCALE;
use crate::data::{LoaderError, Measurement, ProcessingMode};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Reference or input measurement could not be used: {0}")]
    Loader(#[from] LoaderError),

    #[error("Calibration expects a raw measurement, got {0:?}")]
    NotRaw(ProcessingMode),

    #[error("Shape mismatch: {what} is {found:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },
}

/// Dark and white reference cubes for one camera setup.
#[derive(Debug, Clone)]
pub struct Calibration {
    dark: Array3<f64>,
    white: Array3<f64>,
}

impl Calibration {
    /// Build a calibration from dark and white reference measurements.
    pub fn new(dark: Measurement, white: Measurement) -> Result<Self, CalibrationError> {
        let dark = raw_cube(dark)?;
        let white = raw_cube(white)?;

        if dark.dim() != white.dim() {
            return Err(CalibrationError::ShapeMismatch {
                what: "white reference",
                expected: dark.dim(),
                found: white.dim(),
            });
        }

        Ok(Self { dark, white })
    }

    /// Convert a raw measurement into a reflectance-mode measurement.
    ///
    /// Pixels where the white and dark references are equal get 0.
    pub fn apply(&self, raw: Measurement) -> Result<Measurement, CalibrationError> {
        let path = raw.path.clone();
        let raw = raw_cube(raw)?;

        if raw.dim() != self.dark.dim() {
            return Err(CalibrationError::ShapeMismatch {
                what: "measurement",
                expected: self.dark.dim(),
                found: raw.dim(),
            });
        }

        let mut reflectance = Array3::<f64>::zeros(raw.dim());
        Zip::from(&mut reflectance)
            .and(&raw)
            .and(&self.dark)
            .and(&self.white)
            .for_each(|out, &r, &d, &w| {
                let span = w - d;
                *out = if span == 0.0 {
                    0.0
                } else {
                    (r - d) / span * REFLECTANCE_SCALE
                };
            });

        log::debug!("Calibrated {:?} to reflectance", path);
        Ok(Measurement::new(
            &path,
            Some(reflectance),
            ProcessingMode::Reflectance,
        ))
    }
}

fn raw_cube(measurement: Measurement) -> Result<Array3<f64>, CalibrationError> {
    if measurement.processing_mode != ProcessingMode::Raw {
        return Err(CalibrationError::NotRaw(measurement.processing_mode));
    }
    Ok(measurement.into_cube()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn raw(value: f64) -> Measurement {
        Measurement::new(
            Path::new("m.npy"),
            Some(Array3::from_elem((2, 2, 3), value)),
            ProcessingMode::Raw,
        )
    }

    #[test]
    fn test_apply_scales_between_references() {
        let cal = Calibration::new(raw(100.0), raw(300.0)).unwrap();
        let out = cal.apply(raw(150.0)).unwrap();

        assert!(out.is_reflectance());
        let cube = out.into_cube().unwrap();
        assert!(cube.data().iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_flat_reference_yields_zero() {
        let cal = Calibration::new(raw(100.0), raw(100.0)).unwrap();
        let out = cal.apply(raw(150.0)).unwrap();
        assert!(out.cube.unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_reflectance_input() {
        let cal = Calibration::new(raw(0.0), raw(1.0)).unwrap();
        let mut m = raw(0.5);
        m.processing_mode = ProcessingMode::Reflectance;
        assert!(matches!(cal.apply(m), Err(CalibrationError::NotRaw(_))));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let cal = Calibration::new(raw(0.0), raw(1.0)).unwrap();
        let m = Measurement::new(
            Path::new("m.npy"),
            Some(Array3::zeros((3, 2, 3))),
            ProcessingMode::Raw,
        );
        assert!(matches!(
            cal.apply(m),
            Err(CalibrationError::ShapeMismatch { .. })
        ));
    }
}
