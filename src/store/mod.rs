//! Flat-file persistence for annotations and spectra.
//!
//! ## Supported Files
//!
//! - **JSON**: catalogs, annotation maps and spectrum records (lossless)
//! - **Annotation CSV**: six unheaded columns, one annotated point per row
//! - **Annotation log**: per patient/body part/type text files appended by
//!   the interactive annotator
//! - **Spectrum table**: one row per point with 51 wavelength columns, as CSV
//!   or XLSX

mod annotation_csv;
mod annotation_log;
mod error;
mod json;
mod table;

pub use annotation_csv::{ANNOTATION_COLUMNS, parse_annotation_csv, read_annotation_csv};
pub use annotation_log::{AnnotationLog, LogEntry, parse_log_line};
pub use error::StoreError;
pub use json::{load_json, save_json};
pub use table::{
    METADATA_COLUMNS, TableFormat, build_sheet_xml, column_name, table_to_csv, write_table,
    write_table_csv, write_table_xlsx,
};
