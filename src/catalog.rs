//! Measurement file discovery.
//!
//! Measurements are stored as `root/<patient>/<body_part>/<file>`. The
//! catalog groups every matching file by patient and body part.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::model::{BodyPart, PatientId};

/// Measurement files grouped by patient, then body part.
///
/// Sparse: a (patient, body part) pair only appears if it holds at least one
/// matching file. Files of one body part keep enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileCatalog {
    entries: BTreeMap<PatientId, BTreeMap<BodyPart, Vec<PathBuf>>>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file under `(patient, body_part)`.
    pub fn insert(&mut self, patient: PatientId, body_part: BodyPart, path: PathBuf) {
        self.entries
            .entry(patient)
            .or_default()
            .entry(body_part)
            .or_default()
            .push(path);
    }

    /// Files recorded for a patient and body part.
    pub fn files(&self, patient: &str, body_part: &str) -> Option<&[PathBuf]> {
        self.entries
            .get(patient)?
            .get(body_part)
            .map(|files| files.as_slice())
    }

    pub fn patients(&self) -> impl Iterator<Item = &PatientId> {
        self.entries.keys()
    }

    /// Iterate `(patient, body_part, files)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, &BodyPart, &[PathBuf])> {
        self.entries.iter().flat_map(|(patient, parts)| {
            parts
                .iter()
                .map(move |(part, files)| (patient, part, files.as_slice()))
        })
    }

    /// Number of (patient, body part) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(|parts| parts.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of measurement files across all entries.
    pub fn total_files(&self) -> usize {
        self.iter().map(|(_, _, files)| files.len()).sum()
    }
}

/// Check whether a path has the given extension, ignoring case.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Enumerate measurement files below `root`.
///
/// Only files sitting directly in a directory at least two levels below the
/// root are collected; the directory's parent name is the patient and its own
/// name the body part. A missing root yields an empty catalog.
pub fn enumerate(root: &Path, extension: &str) -> FileCatalog {
    let mut catalog = FileCatalog::new();

    if !root.is_dir() {
        log::warn!("Measurement root {:?} is not a directory", root);
        return catalog;
    }

    // Files at depth 3 and deeper live in directories at depth >= 2
    let walker = WalkDir::new(root).min_depth(3).sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry below {:?}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
            continue;
        }

        let Some((patient, body_part)) = location_of(entry.path()) else {
            continue;
        };

        log::trace!("Found {:?} ({} / {})", entry.path(), patient, body_part);
        catalog.insert(patient, body_part, entry.into_path());
    }

    log::info!(
        "Enumerated {} measurement files in {} body-part folders below {:?}",
        catalog.total_files(),
        catalog.len(),
        root
    );

    catalog
}

/// Patient and body part of a measurement file, from its two parent directories.
pub fn location_of(path: &Path) -> Option<(PatientId, BodyPart)> {
    let body_dir = path.parent()?;
    let body_part = body_dir.file_name()?.to_str()?;
    let patient = body_dir.parent()?.file_name()?.to_str()?;
    Some((PatientId::new(patient), BodyPart::new(body_part)))
}
