//! Delimited text to [`Table`] loader with encoding and delimiter auto-detection.
//!
//! Column types are inferred: a column is numeric when every non-missing
//! cell parses as a number, text otherwise.

use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Column, Table};

/// Cell spellings read as missing values.
const MISSING_MARKERS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "None"];

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-9" | "latin5" => "iso-8859-9".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "windows-1254" | "cp1254" => "windows-1254".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // encoding_rs maps ISO-8859-9 onto its windows-1254 superset
        "iso-8859-9" | "windows-1254" | "cp1254" => encoding_rs::WINDOWS_1254.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw)
}

/// Build a column from raw cells, inferring its type.
fn infer_column(name: &str, raw: Vec<String>) -> Column {
    let numeric: Option<Vec<Option<f64>>> = raw
        .iter()
        .map(|cell| {
            if is_missing(cell) {
                Some(None)
            } else {
                cell.parse::<f64>().ok().map(Some)
            }
        })
        .collect();

    match numeric {
        Some(values) => Column::numeric(name, values),
        None => Column::text(
            name,
            raw.into_iter()
                .map(|cell| if is_missing(&cell) { None } else { Some(cell) })
                .collect(),
        ),
    }
}

/// Parse delimited text into a table.
///
/// Short rows are padded with missing cells; extra cells are ignored.
///
/// # Example
/// ```ignore
/// use hotelseg::parse_table;
///
/// let table = parse_table("SaleCityName;Price\nAntalya;64.2\n", ';').unwrap();
/// assert_eq!(table.n_rows(), 1);
/// ```
pub fn parse_table(content: &str, delimiter: char) -> CsvResult<Table> {
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        for (i, cells) in raw.iter_mut().enumerate() {
            cells.push(record.get(i).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .iter()
        .zip(raw)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();

    Table::new(columns).map_err(|e| CsvError::ParseError {
        line: 1,
        message: e.to_string(),
    })
}

/// Parse a file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("/path/to/sales.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.table.n_rows());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_table(&content, delimiter)?;
    let headers = table.column_names().into_iter().map(String::from).collect();

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}
