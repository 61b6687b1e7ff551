//! Plain-text log of interactively annotated points.
//!
//! Every confirmed click appends one line to
//! `<annotation_dir>/<patient>/<body_part>/<annotation_type>.txt`:
//!
//! ```text
//! /data/p1/arm/scan_001.cu3s, (10, 20), lesion, arm, p1
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::model::{
    AnnotationType, BodyPart, Coordinate, ExternalId, MappedAnnotation, PatientId,
};
use crate::store::StoreError;

/// One saved point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub image_path: PathBuf,
    pub coordinates: Coordinate,
    pub annotation_type: AnnotationType,
    pub body_part: BodyPart,
    pub patient_id: PatientId,
}

impl LogEntry {
    /// Format the entry as a log line, including the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}, ({}, {}), {}, {}, {}\n",
            self.image_path.display(),
            self.coordinates.x,
            self.coordinates.y,
            self.annotation_type,
            self.body_part,
            self.patient_id
        )
    }

    /// The entry as a mapped annotation keyed by the measurement's file stem.
    ///
    /// The logged path is kept as the image path; it is never re-resolved
    /// against a catalog.
    pub fn to_mapped(&self) -> (ExternalId, MappedAnnotation) {
        let external_id = self
            .image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.to_string_lossy().into_owned());

        let mapped = MappedAnnotation {
            image_path: Some(self.image_path.clone()),
            patient_id: self.patient_id.clone(),
            body_part: self.body_part.clone(),
            annotation_type: self.annotation_type.clone(),
            coordinates: self.coordinates,
        };
        (external_id.into(), mapped)
    }
}

/// Parse a single log line (without or with trailing newline).
pub fn parse_log_line(line: &str) -> Option<LogEntry> {
    let line = line.trim_end_matches(['\r', '\n']);

    let close = line.rfind("), ")?;
    let open = line[..close].rfind(", (")?;

    let image_path = PathBuf::from(&line[..open]);
    let (x, y) = line[open + 3..close].split_once(',')?;
    let x: i64 = x.trim().parse().ok()?;
    let y: i64 = y.trim().parse().ok()?;

    let mut rest = line[close + 3..].rsplitn(3, ", ");
    let patient_id = rest.next()?;
    let body_part = rest.next()?;
    let annotation_type = rest.next()?;

    Some(LogEntry {
        image_path,
        coordinates: Coordinate::new(x, y),
        annotation_type: annotation_type.into(),
        body_part: body_part.into(),
        patient_id: patient_id.into(),
    })
}

/// Directory of per-patient, per-body-part annotation logs.
#[derive(Debug, Clone)]
pub struct AnnotationLog {
    root: PathBuf,
}

impl AnnotationLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log file an entry belongs to.
    pub fn path_for(&self, entry: &LogEntry) -> PathBuf {
        self.root
            .join(entry.patient_id.as_str())
            .join(entry.body_part.as_str())
            .join(format!("{}.txt", entry.annotation_type))
    }

    /// Append an entry, creating directories as needed. Returns the file written.
    pub fn append(&self, entry: &LogEntry) -> Result<PathBuf, StoreError> {
        let path = self.path_for(entry);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(entry.to_line().as_bytes())?;

        log::info!(
            "Saved {} point ({}, {}) of {:?} to {:?}",
            entry.annotation_type,
            entry.coordinates.x,
            entry.coordinates.y,
            entry.image_path,
            path
        );
        Ok(path)
    }

    /// Read every entry of one log file.
    pub fn read(path: &Path) -> Result<Vec<LogEntry>, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let source_name = path.display().to_string();

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                parse_log_line(line).ok_or_else(|| {
                    StoreError::malformed(source_name.as_str(), idx + 1, "unrecognised log line")
                })
            })
            .collect()
    }

    /// Read every `.txt` log below the root, in path order.
    ///
    /// A missing root yields no entries.
    pub fn read_all(&self) -> Result<Vec<LogEntry>, StoreError> {
        if !self.root.is_dir() {
            log::warn!("Annotation directory {:?} does not exist", self.root);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for item in WalkDir::new(&self.root).sort_by_file_name() {
            let item = item.map_err(|e| StoreError::Io(e.into()))?;
            let path = item.path();
            if item.file_type().is_file() && crate::catalog::has_extension(path, "txt") {
                entries.extend(Self::read(path)?);
            }
        }

        log::info!(
            "Read {} logged annotations from {:?}",
            entries.len(),
            self.root
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, x: i64, y: i64, kind: &str) -> LogEntry {
        LogEntry {
            image_path: PathBuf::from(path),
            coordinates: Coordinate::new(x, y),
            annotation_type: kind.into(),
            body_part: "arm".into(),
            patient_id: "p1".into(),
        }
    }

    #[test]
    fn test_line_format() {
        let e = entry("/data/p1/arm/scan_001.cu3s", 10, 20, "lesion");
        assert_eq!(
            e.to_line(),
            "/data/p1/arm/scan_001.cu3s, (10, 20), lesion, arm, p1\n"
        );
    }

    #[test]
    fn test_parse_line_inverts_format() {
        let e = entry("/data/p1/arm/scan, odd (1).cu3s", -3, 7, "scar");
        assert_eq!(parse_log_line(&e.to_line()), Some(e));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_log_line("not a log line"), None);
        assert_eq!(parse_log_line("a.cu3s, (x, 2), lesion, arm, p1"), None);
    }

    #[test]
    fn test_append_creates_per_type_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = AnnotationLog::new(dir.path().join("annotations"));

        let first = log.append(&entry("a.cu3s", 1, 2, "lesion")).unwrap();
        log.append(&entry("a.cu3s", 3, 4, "lesion")).unwrap();
        let other = log.append(&entry("a.cu3s", 5, 6, "skin")).unwrap();

        assert!(first.ends_with("p1/arm/lesion.txt"));
        assert!(other.ends_with("p1/arm/skin.txt"));

        let lesions = AnnotationLog::read(&first).unwrap();
        assert_eq!(lesions.len(), 2);
        assert_eq!(lesions[1].coordinates, Coordinate::new(3, 4));

        assert_eq!(log.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_read_all_missing_root() {
        let log = AnnotationLog::new("/definitely/not/here");
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_to_mapped_keeps_logged_path() {
        let (id, mapped) = entry("/data/p1/arm/scan_1.cu3s", 10, 20, "lesion").to_mapped();
        assert_eq!(id.as_str(), "scan_1");
        assert_eq!(
            mapped.image_path.as_deref(),
            Some(Path::new("/data/p1/arm/scan_1.cu3s"))
        );
        assert_eq!(mapped.coordinates, Coordinate::new(10, 20));
        assert_eq!(mapped.patient_id.as_str(), "p1");
    }
}
