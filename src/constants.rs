//! Global constants for hsi-annotate

/// First wavelength of the camera's spectral axis, in nanometres.
pub const WAVELENGTH_START_NM: u32 = 450;

/// Last wavelength of the spectral axis (inclusive), in nanometres.
pub const WAVELENGTH_END_NM: u32 = 950;

/// Spacing between adjacent bands, in nanometres.
pub const WAVELENGTH_STEP_NM: u32 = 10;

/// Number of spectral bands in a measurement cube.
pub const BAND_COUNT: usize =
    ((WAVELENGTH_END_NM - WAVELENGTH_START_NM) / WAVELENGTH_STEP_NM) as usize + 1;

/// Reflectance-mode cubes store reflectance multiplied by this factor.
pub const REFLECTANCE_SCALE: f64 = 10_000.0;

/// File extension of the vendor measurement files (without the dot).
pub const VENDOR_EXTENSION: &str = "cu3s";

/// Default edge length of the averaging neighbourhood.
pub const DEFAULT_KERNEL_SIZE: usize = 3;

/// Default directory for the interactive annotation text logs.
pub const DEFAULT_ANNOTATION_DIR: &str = "point_annotations";
