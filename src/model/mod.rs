//! Data models for annotations, identifiers and spectra.

mod annotation;
mod ids;
mod spectrum;

pub use annotation::{AnnotationRecord, Coordinate, MappedAnnotation};
pub use ids::{AnnotationType, BodyPart, ExternalId, PatientId, SequenceNumber};
pub use spectrum::{Spectrum, SpectrumRecord, wavelength_of, wavelengths};
