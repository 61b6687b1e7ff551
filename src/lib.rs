//! hsi-annotate - point annotation and spectrum extraction for hyperspectral
//! skin measurements.
//!
//! Measurements live in `<root>/<patient>/<body_part>/<files>`. Points are
//! annotated by clicking a pixel, persisted with their patient and body part,
//! and later turned into neighbourhood-averaged reflectance spectra.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod data;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod spectral;
pub mod store;
pub mod viewer;
