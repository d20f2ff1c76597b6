//! Turns an uploaded file into a `RawTable`. The ingestion core never sees file formats.

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::AppError;
use crate::parser::deserializers::parse_datetime_text;
use crate::parser::types::{RawCell, RawTable};

const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Read a ticket export, choosing the reader from the file extension.
pub fn read_table(path: impl AsRef<Path>) -> Result<RawTable, AppError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" | "txt" | "tsv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path)?,
        _ => return Err(AppError::UnsupportedFormat(ext)),
    };

    log::info!(
        "Read {}: {} columns, {} rows",
        path.display(),
        table.headers.len(),
        table.row_count()
    );
    Ok(table)
}

// ─── Delimited text ──────────────────────────────────────────────────────────

pub fn read_csv(path: &Path) -> Result<RawTable, AppError> {
    let file = std::fs::File::open(path)?;
    read_csv_reader(std::io::BufReader::new(file))
}

/// Core CSV logic, accepts any `Read` source.
///
/// Cells are decoded one at a time: UTF-8 when valid, Windows-1252 otherwise, so a
/// legacy export with the odd accented byte still reads in full.
pub fn read_csv_reader<R: Read>(mut reader: R) -> Result<RawTable, AppError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = sniff_delimiter(&decode_cell(first_line, &mut 0));

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .double_quote(true)
        .quoting(true)
        .from_reader(content);

    let mut legacy_cells = 0usize;
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| decode_cell(h, &mut legacy_cells))
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::EmptyFile);
    }

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|b| RawCell::from(decode_cell(b, &mut legacy_cells).as_str()))
                .collect(),
        );
    }

    if legacy_cells > 0 {
        log::warn!(
            "{} cells were not valid UTF-8 and were decoded as Windows-1252",
            legacy_cells
        );
    }

    Ok(finish_table(headers, rows))
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn decode_cell(bytes: &[u8], legacy_cells: &mut usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            *legacy_cells += 1;
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Most frequent candidate delimiter on the header line; `,` on ties or when none occur.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let count = |d: u8| header_line.bytes().filter(|b| *b == d).count();
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .fold((b',', 0usize), |(best, best_n), d| {
            let n = count(d);
            if n > best_n {
                (d, n)
            } else {
                (best, best_n)
            }
        })
        .0
}

// ─── Spreadsheets ────────────────────────────────────────────────────────────

/// First worksheet of an xlsx/xls/xlsb/ods workbook; the first row holds the headers.
pub fn read_spreadsheet(path: &Path) -> Result<RawTable, AppError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(AppError::EmptyFile);
    };
    let range = workbook.worksheet_range(sheet_name)?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Err(AppError::EmptyFile);
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| data_to_cell(c).to_string().trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(AppError::EmptyFile);
    }

    let rows = rows_iter
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    Ok(finish_table(headers, rows))
}

fn data_to_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::from(s.as_str()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => RawCell::DateTime(ndt),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_datetime_text(s) {
            Some(ndt) => RawCell::DateTime(ndt),
            None => RawCell::Text(s.clone()),
        },
        Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(e) => RawCell::Text(e.to_string()),
    }
}

/// Drop rows where every cell is blank and pad short rows to the header width.
fn finish_table(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> RawTable {
    let width = headers.len();
    let rows = rows
        .into_iter()
        .filter(|row| !row.iter().all(RawCell::is_blank))
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, RawCell::Empty);
            }
            row
        })
        .collect();
    RawTable::new(headers, rows)
}
