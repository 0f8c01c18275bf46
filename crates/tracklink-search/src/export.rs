//! CSV and XLSX export writers.
//!
//! Both formats share one layout: the original input columns followed by
//! [`RESULT_COLUMNS`], one line per input row in row order. Writers return
//! bytes; putting them on disk is up to the caller.

use crate::assembler::ExportRow;
use crate::error::{Result, SearchError};
use rust_xlsxwriter::{Format, Workbook};

/// Columns appended after the original ones.
pub const RESULT_COLUMNS: [&str; 5] = ["Platform", "URL", "Status", "Error", "Attempts"];

/// Column names used when the original header row is unknown.
const FALLBACK_SOURCE_HEADERS: [&str; 2] = ["Track Name", "Artist Name(s)"];

const SHEET_NAME: &str = "Results";

/// Full header row for an export.
#[must_use]
pub fn export_headers(source_headers: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = if source_headers.is_empty() {
        FALLBACK_SOURCE_HEADERS.iter().map(ToString::to_string).collect()
    } else {
        source_headers.to_vec()
    };
    headers.extend(RESULT_COLUMNS.iter().map(ToString::to_string));
    headers
}

/// Cells for one export line, source part padded to `source_width`.
fn row_cells(row: &ExportRow, source_width: usize) -> Vec<String> {
    let mut cells: Vec<String> = if row.source_fields.is_empty() {
        vec![row.track_name.clone(), row.artist_name.clone()]
    } else {
        row.source_fields.clone()
    };
    cells.resize(source_width, String::new());

    cells.push(
        row.link
            .as_ref()
            .map(|l| l.platform.display_name().to_string())
            .unwrap_or_default(),
    );
    cells.push(row.link.as_ref().map(|l| l.url.clone()).unwrap_or_default());
    cells.push(row.status.to_string());
    cells.push(row.error.map(|e| e.to_string()).unwrap_or_default());
    cells.push(row.attempts.to_string());
    cells
}

fn source_width(source_headers: &[String]) -> usize {
    if source_headers.is_empty() {
        FALLBACK_SOURCE_HEADERS.len()
    } else {
        source_headers.len()
    }
}

/// Render the export as UTF-8 CSV.
pub fn to_csv(source_headers: &[String], rows: &[ExportRow]) -> Result<Vec<u8>> {
    let width = source_width(source_headers);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(export_headers(source_headers))?;
    for row in rows {
        writer.write_record(row_cells(row, width))?;
    }

    writer
        .into_inner()
        .map_err(|e| SearchError::Export(format!("failed to flush CSV: {e}")))
}

/// Render the export as an XLSX workbook with a single sheet.
pub fn to_xlsx(source_headers: &[String], rows: &[ExportRow]) -> Result<Vec<u8>> {
    let width = source_width(source_headers);
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in export_headers(source_headers).iter().enumerate() {
        sheet.write_string_with_format(0, column(col)?, header, &header_format)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let line = u32::try_from(i + 1)
            .map_err(|_| SearchError::Export(format!("too many rows for XLSX: {}", rows.len())))?;
        for (col, cell) in row_cells(row, width).iter().enumerate() {
            sheet.write_string(line, column(col)?, cell)?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).map_err(|_| SearchError::Export(format!("too many columns for XLSX: {index}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklink_core::{ErrorKind, Link, Platform, TaskState};

    fn rows() -> Vec<ExportRow> {
        vec![
            ExportRow {
                row_index: 0,
                track_name: "Clocks".to_string(),
                artist_name: "Coldplay".to_string(),
                source_fields: vec!["Clocks".into(), "Coldplay".into(), "A Rush of Blood".into()],
                status: TaskState::Succeeded,
                link: Some(Link::new(
                    Platform::YouTube,
                    "https://www.youtube.com/watch?v=d020hcWA_Wg",
                )),
                error: None,
                attempts: 1,
            },
            ExportRow {
                row_index: 1,
                track_name: "Aquarela".to_string(),
                artist_name: "Toquinho".to_string(),
                source_fields: vec!["Aquarela".into(), "Toquinho".into()],
                status: TaskState::Failed,
                link: None,
                error: Some(ErrorKind::NotFound),
                attempts: 1,
            },
        ]
    }

    fn headers() -> Vec<String> {
        vec!["Track Name".into(), "Artist Name(s)".into(), "Album Name".into()]
    }

    #[test]
    fn test_export_headers() {
        assert_eq!(
            export_headers(&[]),
            vec!["Track Name", "Artist Name(s)", "Platform", "URL", "Status", "Error", "Attempts"]
        );
    }

    #[test]
    fn test_csv_layout() {
        let bytes = to_csv(&headers(), &rows()).expect("csv");
        let text = String::from_utf8(bytes).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "Track Name,Artist Name(s),Album Name,Platform,URL,Status,Error,Attempts"
        );
        assert_eq!(
            lines[1],
            "Clocks,Coldplay,A Rush of Blood,YouTube,https://www.youtube.com/watch?v=d020hcWA_Wg,Succeeded,,1"
        );
        // short record padded to the header width
        assert_eq!(lines[2], "Aquarela,Toquinho,,,,Failed,NotFound,1");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_skipped_row_keeps_its_cells() {
        let row = ExportRow::skipped(2, vec!["No Artist".into(), String::new()]);
        let text = String::from_utf8(to_csv(&headers(), &[row]).expect("csv")).expect("utf8");
        assert_eq!(text.lines().nth(1), Some("No Artist,,,,,Skipped,,0"));
    }

    #[test]
    fn test_csv_without_source_fields() {
        let mut rows = rows();
        rows[0].source_fields.clear();
        let text = String::from_utf8(to_csv(&[], &rows[..1]).expect("csv")).expect("utf8");
        assert!(text.lines().nth(1).is_some_and(|l| l.starts_with("Clocks,Coldplay,YouTube,")));
    }

    #[test]
    fn test_xlsx_is_a_zip_archive() {
        let bytes = to_xlsx(&headers(), &rows()).expect("xlsx");
        assert!(bytes.starts_with(b"PK"));
    }
}
