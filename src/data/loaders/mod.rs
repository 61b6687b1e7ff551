//! Built-in measurement loaders.
//!
//! This module contains implementations of the `MeasurementLoader` trait.
//! The vendor `.cu3s` format has no built-in loader; register one through
//! `LoaderRegistry::register` when the SDK is available.

mod npy_loader;

pub use npy_loader::NpyLoader;
