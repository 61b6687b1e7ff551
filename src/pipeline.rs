//! Batch runs: enumerate, map, extract, export.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{FileCatalog, enumerate};
use crate::data::{Calibration, CalibrationError, Cube, LoaderError, LoaderRegistry};
use crate::ingest::{AnnotationMap, IngestError, map_annotations};
use crate::model::{ExternalId, SequenceNumber, SpectrumRecord};
use crate::spectral::{ExtractError, average_spectrum};
use crate::store::{AnnotationLog, StoreError, read_annotation_csv, save_json, write_table};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Failed to extract spectrum from {path:?}: {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// A mapped annotation has no measurement file
    #[error("Annotation '{external_id}' #{sequence} matches no measurement file")]
    UnresolvedImage {
        external_id: ExternalId,
        sequence: SequenceNumber,
    },

    #[error("Failed to write {path:?}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Extract one spectrum per mapped annotation, in map order.
///
/// Consecutive annotations on the same file share one load. An annotation
/// without an image path fails the whole run.
pub fn extract_spectra(
    map: &AnnotationMap,
    registry: &LoaderRegistry,
    kernel_size: usize,
) -> Result<Vec<SpectrumRecord>, PipelineError> {
    let mut records = Vec::with_capacity(map.len());
    let mut loaded: Option<(PathBuf, Cube)> = None;

    for (id, sequence, annotation) in map.iter() {
        let path = annotation
            .image_path
            .as_ref()
            .ok_or_else(|| PipelineError::UnresolvedImage {
                external_id: id.clone(),
                sequence,
            })?;

        let cube = match loaded.take() {
            Some((cached, cube)) if cached == *path => cube,
            _ => registry.load_cube(path)?,
        };

        let spectrum = average_spectrum(cube.view(), annotation.coordinates, kernel_size)
            .map_err(|source| PipelineError::Extract {
                path: path.clone(),
                source,
            })?;
        log::debug!(
            "Extracted {} bands for '{}' #{} at ({}, {})",
            spectrum.len(),
            id,
            sequence,
            annotation.coordinates.x,
            annotation.coordinates.y
        );

        records.push(SpectrumRecord::new(
            id.clone(),
            sequence,
            path.clone(),
            annotation,
            spectrum,
        ));
        loaded = Some((path.clone(), cube));
    }

    log::info!("Extracted {} spectra", records.len());
    Ok(records)
}

/// Inputs of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub root: PathBuf,
    pub extension: String,
    /// Annotation CSV to read, if any
    pub annotations: Option<PathBuf>,
    /// Interactive annotation logs to read, if any
    pub log_dir: Option<PathBuf>,
    pub kernel_size: usize,
    /// Spectrum table, `.csv` or `.xlsx`
    pub table_out: PathBuf,
    /// Lossless JSON copy of the records
    pub json_out: Option<PathBuf>,
}

/// Counts reported after a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub annotations: usize,
    pub spectra: usize,
}

/// Annotations from a CSV file and/or a log directory, CSV first.
///
/// CSV records are resolved against `catalog`. Logged points already name
/// their measurement file and are added under their file stem unchanged.
pub fn collect_annotations(
    catalog: &FileCatalog,
    annotations: Option<&Path>,
    log_dir: Option<&Path>,
) -> Result<AnnotationMap, PipelineError> {
    let records = match annotations {
        Some(path) => read_annotation_csv(path)?,
        None => Vec::new(),
    };
    let mut map = map_annotations(catalog, &records)?;

    if let Some(dir) = log_dir {
        let logged = AnnotationLog::new(dir).read_all()?;
        for entry in &logged {
            let (id, annotation) = entry.to_mapped();
            map.push(id, annotation);
        }
    }

    Ok(map)
}

/// Enumerate, map and extract, then write the table (and JSON if requested).
pub fn run_batch(
    options: &BatchOptions,
    registry: &LoaderRegistry,
) -> Result<BatchSummary, PipelineError> {
    let catalog: FileCatalog = enumerate(&options.root, &options.extension);
    let map = collect_annotations(
        &catalog,
        options.annotations.as_deref(),
        options.log_dir.as_deref(),
    )?;
    let spectra = extract_spectra(&map, registry, options.kernel_size)?;

    write_table(&spectra, &options.table_out)?;
    log::info!("Wrote spectrum table to {:?}", options.table_out);

    if let Some(json_out) = &options.json_out {
        save_json(&spectra, json_out)?;
        log::info!("Wrote spectrum records to {:?}", json_out);
    }

    Ok(BatchSummary {
        files: catalog.total_files(),
        annotations: map.len(),
        spectra: spectra.len(),
    })
}

/// Calibrate a raw measurement against dark/white references and write the
/// reflectance-scaled cube as `.npy`.
pub fn calibrate_file(
    registry: &LoaderRegistry,
    raw: &Path,
    dark: &Path,
    white: &Path,
    out: &Path,
) -> Result<(), PipelineError> {
    let calibration = Calibration::new(registry.load(dark)?, registry.load(white)?)?;
    let calibrated = calibration.apply(registry.load(raw)?)?;

    let Some(cube) = calibrated.cube else {
        return Err(LoaderError::CubeNotFound {
            path: raw.to_path_buf(),
        }
        .into());
    };

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(StoreError::from)?;
    }
    ndarray_npy::write_npy(out, &cube).map_err(|e| PipelineError::Write {
        path: out.to_path_buf(),
        message: e.to_string(),
    })?;

    log::info!("Wrote calibrated cube {:?} to {:?}", cube.dim(), out);
    Ok(())
}
