//! Point annotation records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationType, BodyPart, ExternalId, PatientId};

/// A clicked pixel position in image coordinates.
///
/// `x` is the column and `y` the row, as reported by the viewer. Cubes are
/// indexed `(row, column, band)`, so lookups use `(y, x)`.
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Coordinate {
    /// Column index.
    pub x: i64,
    /// Row index.
    pub y: i64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Coordinate {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for (i64, i64) {
    fn from(c: Coordinate) -> Self {
        (c.x, c.y)
    }
}

/// One row of the flat annotation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Token that must occur in the measurement file path.
    pub external_id: ExternalId,
    /// Clicked column.
    pub x: i64,
    /// Clicked row.
    pub y: i64,
    /// Kind of annotated point.
    pub annotation_type: AnnotationType,
    /// Body location of the measurement.
    pub body_part: BodyPart,
    /// Patient the measurement belongs to.
    pub patient_id: PatientId,
}

impl AnnotationRecord {
    /// The clicked position of this record.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }
}

/// An annotation joined to the measurement file it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedAnnotation {
    /// Resolved measurement file, `None` when no enumerated path matched.
    pub image_path: Option<PathBuf>,
    pub patient_id: PatientId,
    pub body_part: BodyPart,
    pub annotation_type: AnnotationType,
    pub coordinates: Coordinate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_serializes_as_pair() {
        let json = serde_json::to_string(&Coordinate::new(10, 20)).unwrap();
        assert_eq!(json, "[10,20]");

        let back: Coordinate = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(back, Coordinate::new(3, 4));
    }

    #[test]
    fn test_mapped_annotation_null_path() {
        let mapped = MappedAnnotation {
            image_path: None,
            patient_id: "p1".into(),
            body_part: "arm".into(),
            annotation_type: "lesion".into(),
            coordinates: Coordinate::new(1, 2),
        };

        let value = serde_json::to_value(&mapped).unwrap();
        assert!(value["image_path"].is_null());
        assert_eq!(value["coordinates"], serde_json::json!([1, 2]));
    }
}
