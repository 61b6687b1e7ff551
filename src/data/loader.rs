//! Trait-based measurement loading.
//!
//! Measurement files come from a vendor SDK that this crate does not link
//! against. Loading is therefore expressed as the `MeasurementLoader` trait,
//! and a `LoaderRegistry` picks the loader by file extension.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hsi_annotate::data::{LoaderRegistry, ProcessingMode};
//!
//! let registry = LoaderRegistry::new(ProcessingMode::Reflectance);
//! let cube = registry.load_cube(path)?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::{Cube, Measurement, ProcessingMode};

/// Errors raised while loading a measurement.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No registered loader handles this extension
    #[error("No loader registered for extension '{extension}' ({path:?})")]
    NoLoader { extension: String, path: PathBuf },

    /// Loader could not decode the file
    #[error("[{loader}] failed to decode {path:?}: {message}")]
    Decode {
        loader: &'static str,
        path: PathBuf,
        message: String,
    },

    /// Measurement carries no cube
    #[error("Cube not found in measurement {path:?}")]
    CubeNotFound { path: PathBuf },
}

impl LoaderError {
    /// Create a decode error for a loader.
    pub fn decode(loader: &'static str, path: &Path, message: impl Into<String>) -> Self {
        Self::Decode {
            loader,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Trait for measurement file loaders.
pub trait MeasurementLoader: Send + Sync {
    /// Unique identifier for this loader (e.g., "npy").
    fn id(&self) -> &'static str;

    /// File extensions this loader handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Open a measurement file.
    ///
    /// The returned measurement owns its data; no file handle outlives the call.
    fn load(&self, path: &Path) -> Result<Measurement, LoaderError>;
}

/// Registry of available measurement loaders.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn MeasurementLoader>>,
}

impl LoaderRegistry {
    /// Create a registry with the built-in loaders.
    ///
    /// `npy_mode` is the processing mode assigned to `.npy` cubes, which carry
    /// no mode of their own.
    pub fn new(npy_mode: ProcessingMode) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(super::loaders::NpyLoader::new(npy_mode)));
        registry
    }

    /// Create a registry with no loaders.
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Register a loader. Later registrations win for shared extensions.
    pub fn register(&mut self, loader: Box<dyn MeasurementLoader>) {
        self.loaders.insert(0, loader);
    }

    /// Get all supported file extensions.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .loaders
            .iter()
            .flat_map(|l| l.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    fn loader_for(&self, path: &Path) -> Result<&dyn MeasurementLoader, LoaderError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        self.loaders
            .iter()
            .find(|l| l.extensions().iter().any(|e| *e == extension))
            .map(|l| l.as_ref())
            .ok_or_else(|| LoaderError::NoLoader {
                extension,
                path: path.to_path_buf(),
            })
    }

    /// Load a measurement with the loader matching its extension.
    pub fn load(&self, path: &Path) -> Result<Measurement, LoaderError> {
        let loader = self.loader_for(path)?;
        log::debug!("Loading {:?} with {} loader", path, loader.id());
        loader.load(path)
    }

    /// Load a measurement and convert it to a reflectance-scaled cube.
    pub fn load_cube(&self, path: &Path) -> Result<Cube, LoaderError> {
        self.load(path)?.into_cube()
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new(ProcessingMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    struct FixedLoader;

    impl MeasurementLoader for FixedLoader {
        fn id(&self) -> &'static str {
            "fixed"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["cu3s"]
        }

        fn load(&self, path: &Path) -> Result<Measurement, LoaderError> {
            Ok(Measurement::new(
                path,
                Some(Array3::from_elem((2, 2, 3), 5000.0)),
                ProcessingMode::Reflectance,
            ))
        }
    }

    #[test]
    fn test_registry_has_npy() {
        let registry = LoaderRegistry::default();
        assert_eq!(registry.supported_extensions(), vec!["npy"]);
    }

    #[test]
    fn test_unknown_extension_is_an_error() {
        let registry = LoaderRegistry::default();
        let err = registry.load(Path::new("p1/arm/scan.cu3s")).unwrap_err();
        assert!(matches!(err, LoaderError::NoLoader { ref extension, .. } if extension == "cu3s"));
    }

    #[test]
    fn test_registered_loader_dispatch_and_scaling() {
        let mut registry = LoaderRegistry::default();
        registry.register(Box::new(FixedLoader));

        let cube = registry.load_cube(Path::new("scan.CU3S")).unwrap();
        assert_eq!(cube.shape(), (2, 2, 3));
        assert!(cube.data().iter().all(|&v| (v - 0.5).abs() < 1e-12));
    }
}
