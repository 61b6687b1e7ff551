//! Tabular export of extracted spectra.
//!
//! One row per annotated point. Columns are `image_name, patient_id,
//! body_part, annotation_type` followed by one column per wavelength
//! (450, 460, ..., 950) holding reflectance values.
//!
//! Two writers are provided: plain CSV, and a minimal single-sheet XLSX
//! workbook written directly as Office Open XML.

use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::model::{SpectrumRecord, wavelengths};
use crate::store::StoreError;

/// Names of the leading metadata columns.
pub const METADATA_COLUMNS: [&str; 4] = ["image_name", "patient_id", "body_part", "annotation_type"];

/// Output format of the spectrum table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Xlsx,
}

impl TableFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Write the spectrum table in the format implied by the path's extension.
pub fn write_table(records: &[SpectrumRecord], path: &Path) -> Result<(), StoreError> {
    match TableFormat::from_path(path) {
        Some(TableFormat::Csv) => write_table_csv(records, path),
        Some(TableFormat::Xlsx) => write_table_xlsx(records, path),
        None => Err(StoreError::UnsupportedTableFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Check every spectrum against the wavelength axis.
fn validate(records: &[SpectrumRecord]) -> Result<Vec<u32>, StoreError> {
    let axis = wavelengths();
    for record in records {
        if record.spectrum.len() != axis.len() {
            return Err(StoreError::BandMismatch {
                image: record.image_name(),
                expected: axis.len(),
                found: record.spectrum.len(),
            });
        }
    }
    Ok(axis)
}

fn metadata_cells(record: &SpectrumRecord) -> [String; 4] {
    [
        record.image_name(),
        record.patient_id.to_string(),
        record.body_part.to_string(),
        record.annotation_type.to_string(),
    ]
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_csv_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    axis: &[u32],
    records: &[SpectrumRecord],
) -> Result<(), StoreError> {
    let header = METADATA_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(axis.iter().map(|nm| nm.to_string()));
    writer.write_record(header)?;

    for record in records {
        let row = metadata_cells(record)
            .into_iter()
            .chain(record.spectrum.values().iter().map(|v| v.to_string()));
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Render the spectrum table as CSV text with a header row.
pub fn table_to_csv(records: &[SpectrumRecord]) -> Result<String, StoreError> {
    let axis = validate(records)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    write_csv_rows(&mut writer, &axis, records)?;

    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Write the spectrum table as CSV.
pub fn write_table_csv(records: &[SpectrumRecord], path: &Path) -> Result<(), StoreError> {
    let axis = validate(records)?;
    create_parent(path)?;

    let mut writer = csv::Writer::from_path(path)?;
    write_csv_rows(&mut writer, &axis, records)?;

    log::info!("Exported {} spectra to {:?}", records.len(), path);
    Ok(())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="spectra" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Path of the worksheet part inside the workbook archive.
pub const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Spreadsheet column letters for a 0-based index (0 -> A, 26 -> AA).
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    reference: &str,
    cell: Cell<'_>,
) -> Result<(), StoreError> {
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference));

    match cell {
        Cell::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
        }
        // Non-finite values have no spreadsheet representation; leave the cell empty
        Cell::Number(value) if !value.is_finite() => {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        Cell::Number(value) => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&value.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Build the worksheet XML for the spectrum table.
pub fn build_sheet_xml(records: &[SpectrumRecord]) -> Result<Vec<u8>, StoreError> {
    let axis = validate(records)?;
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(BytesStart::new("worksheet").with_attributes([(
        "xmlns",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    )])))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    // Header row
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", "1"));
    writer.write_event(Event::Start(row))?;
    for (col, name) in METADATA_COLUMNS.iter().enumerate() {
        write_cell(&mut writer, &format!("{}1", column_name(col)), Cell::Text(name))?;
    }
    for (i, nm) in axis.iter().enumerate() {
        let reference = format!("{}1", column_name(METADATA_COLUMNS.len() + i));
        write_cell(&mut writer, &reference, Cell::Number(f64::from(*nm)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;

    for (idx, record) in records.iter().enumerate() {
        let row_no = (idx + 2).to_string();
        let mut row = BytesStart::new("row");
        row.push_attribute(("r", row_no.as_str()));
        writer.write_event(Event::Start(row))?;

        for (col, cell) in metadata_cells(record).iter().enumerate() {
            let reference = format!("{}{}", column_name(col), row_no);
            write_cell(&mut writer, &reference, Cell::Text(cell))?;
        }
        for (i, value) in record.spectrum.values().iter().enumerate() {
            let reference = format!("{}{}", column_name(METADATA_COLUMNS.len() + i), row_no);
            write_cell(&mut writer, &reference, Cell::Number(*value))?;
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner())
}

/// Write the spectrum table as a single-sheet XLSX workbook.
pub fn write_table_xlsx(records: &[SpectrumRecord], path: &Path) -> Result<(), StoreError> {
    let sheet = build_sheet_xml(records)?;
    create_parent(path)?;

    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("xl/workbook.xml", WORKBOOK_XML.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes()),
        (SHEET_PART, &sheet),
    ];

    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;

    log::info!("Exported {} spectra to {:?}", records.len(), path);
    Ok(())
}
