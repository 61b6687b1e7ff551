//! Reader for the flat annotation list.
//!
//! Each line holds six unheaded, comma-separated columns:
//!
//! ```text
//! external_id, x, y, annotation_type, body_part, patient_id
//! ```
//!
//! Fields may be double-quoted (with `""` as an escaped quote). Only `x` and
//! `y` are validated, as integers; anything else is taken verbatim.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::model::{AnnotationRecord, AnnotationType, BodyPart, ExternalId, PatientId};
use crate::store::StoreError;

/// Number of columns in an annotation row.
pub const ANNOTATION_COLUMNS: usize = 6;

/// Read annotation records from a CSV file.
pub fn read_annotation_csv(path: &Path) -> Result<Vec<AnnotationRecord>, StoreError> {
    let file = std::fs::File::open(path)?;
    let records = parse_rows(file, &path.display().to_string())?;
    log::info!("Read {} annotation records from {:?}", records.len(), path);
    Ok(records)
}

/// Parse annotation records from CSV text.
///
/// Blank lines are skipped; any other row that is not exactly six columns
/// with integer coordinates fails the whole parse.
pub fn parse_annotation_csv(content: &str) -> Result<Vec<AnnotationRecord>, StoreError> {
    parse_rows(content.as_bytes(), "<input>")
}

fn parse_rows<R: Read>(input: R, source_name: &str) -> Result<Vec<AnnotationRecord>, StoreError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line_no = row.position().map_or(0, |pos| pos.line() as usize);
        records.push(parse_record(&row, source_name, line_no)?);
    }

    Ok(records)
}

fn parse_record(
    row: &StringRecord,
    source_name: &str,
    line_no: usize,
) -> Result<AnnotationRecord, StoreError> {
    if row.len() != ANNOTATION_COLUMNS {
        return Err(StoreError::malformed(
            source_name,
            line_no,
            format!(
                "expected {} columns, found {}",
                ANNOTATION_COLUMNS,
                row.len()
            ),
        ));
    }

    let coordinate = |name: &str, raw: &str| {
        raw.trim().parse::<i64>().map_err(|_| {
            StoreError::malformed(
                source_name,
                line_no,
                format!("column '{}' is not an integer: {:?}", name, raw),
            )
        })
    };

    Ok(AnnotationRecord {
        external_id: ExternalId::new(&row[0]),
        x: coordinate("x", &row[1])?,
        y: coordinate("y", &row[2])?,
        annotation_type: AnnotationType::new(&row[3]),
        body_part: BodyPart::new(&row[4]),
        patient_id: PatientId::new(&row[5]),
    })
}
