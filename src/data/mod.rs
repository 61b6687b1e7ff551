//! Measurement data and loaders.
//!
//! This module provides:
//! - `Measurement` and `Cube`: loaded spectral data, `(height, width, bands)`
//! - `LoaderRegistry`: extension-based dispatch to `MeasurementLoader`s
//! - `NpyLoader`: built-in loader for NumPy cubes
//! - `Calibration`: dark/white reference conversion of raw measurements
//!
//! ## Adding New Formats
//!
//! The vendor SDK is an external collaborator. To plug it in, implement
//! `MeasurementLoader` and register it:
//!
//! ```rust,ignore
//! use hsi_annotate::data::{LoaderError, Measurement, MeasurementLoader};
//!
//! pub struct VendorLoader;
//!
//! impl MeasurementLoader for VendorLoader {
//!     fn id(&self) -> &'static str { "cu3s" }
//!     fn extensions(&self) -> &'static [&'static str] { &["cu3s"] }
//!     fn load(&self, path: &Path) -> Result<Measurement, LoaderError> { /* ... */ }
//! }
//! ```

mod calibration;
mod loader;
pub mod loaders;
mod measurement;

pub use calibration::{Calibration, CalibrationError};
pub use loader::{LoaderError, LoaderRegistry, MeasurementLoader};
pub use measurement::{Cube, Measurement, ProcessingMode};
