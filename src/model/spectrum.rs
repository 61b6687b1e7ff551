//! Reflectance spectra and the wavelength axis they are indexed by.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::annotation::{Coordinate, MappedAnnotation};
use super::ids::{AnnotationType, BodyPart, ExternalId, PatientId, SequenceNumber};
use crate::constants::{BAND_COUNT, WAVELENGTH_START_NM, WAVELENGTH_STEP_NM};

/// Wavelengths of the camera's bands in nanometres: 450, 460, ..., 950.
pub fn wavelengths() -> Vec<u32> {
    (0..BAND_COUNT)
        .map(|i| WAVELENGTH_START_NM + i as u32 * WAVELENGTH_STEP_NM)
        .collect()
}

/// Wavelength of a band index, if the index lies on the axis.
pub fn wavelength_of(band: usize) -> Option<u32> {
    (band < BAND_COUNT).then(|| WAVELENGTH_START_NM + band as u32 * WAVELENGTH_STEP_NM)
}

/// Mean reflectance per band, ordered like [`wavelengths`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spectrum {
    values: Vec<f64>,
}

impl Spectrum {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An annotation merged with the spectrum extracted around it.
///
/// This is the unit persisted by a batch run and the row type of the
/// tabular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRecord {
    pub external_id: ExternalId,
    pub sequence: SequenceNumber,
    pub image_path: PathBuf,
    pub patient_id: PatientId,
    pub body_part: BodyPart,
    pub annotation_type: AnnotationType,
    pub coordinates: Coordinate,
    pub spectrum: Spectrum,
}

impl SpectrumRecord {
    /// Merge a resolved annotation with its spectrum.
    pub fn new(
        external_id: ExternalId,
        sequence: SequenceNumber,
        image_path: PathBuf,
        annotation: &MappedAnnotation,
        spectrum: Spectrum,
    ) -> Self {
        Self {
            external_id,
            sequence,
            image_path,
            patient_id: annotation.patient_id.clone(),
            body_part: annotation.body_part.clone(),
            annotation_type: annotation.annotation_type.clone(),
            coordinates: annotation.coordinates,
            spectrum,
        }
    }

    /// File name of the measurement, used as the `image_name` column.
    pub fn image_name(&self) -> String {
        self.image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.to_string_lossy().into_owned())
    }
}
