// Delimited text import/export

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One parsed input file: header labels in file order, plus one
/// header-label → cell map per data row.
///
/// Header labels are raw (trimmed but not canonicalized); alias resolution
/// happens downstream, once, at ingestion.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }
}

/// Candidate delimiters in tie-break preference order. Comma sits last so it
/// only wins a sniff outright, and serves as the default for degenerate input.
const CANDIDATES: &[u8] = &[b'\t', b';', b'|', b','];

/// Detect the most likely field delimiter from the header line.
///
/// Each candidate is scored by how many fields it yields on the header line
/// (quote-aware). Most fields wins; ties go to the earlier candidate in
/// `CANDIDATES`; a single-column header falls back to comma.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut best = b',';
    let mut best_fields = 1usize;

    for &delim in CANDIDATES {
        let fields = split_record(header_line, delim).len();
        if fields > best_fields {
            best_fields = fields;
            best = delim;
        }
    }

    best
}

/// Parse raw text into a [`RawTable`].
///
/// With no `delimiter` hint the delimiter is sniffed from the header line.
/// Empty input yields an empty table, not an error; callers must check
/// emptiness before indexing.
pub fn parse(text: &str, delimiter: Option<u8>) -> RawTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let records = assemble_records(text);
    if records.is_empty() {
        return RawTable::default();
    }

    let delim = delimiter.unwrap_or_else(|| sniff_delimiter(&records[0]));

    let headers: Vec<String> = split_record(&records[0], delim)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::with_capacity(records.len().saturating_sub(1));
    for record in &records[1..] {
        let cells = split_record(record, delim);
        let mut row = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            // Missing trailing cells map to empty; cells beyond the header
            // count are dropped.
            let cell = cells.get(i).map(|c| c.trim()).unwrap_or("");
            row.insert(header.clone(), cell.to_string());
        }
        rows.push(row);
    }

    RawTable { headers, rows }
}

/// Join physical lines into logical records, carrying quote state across
/// lines by quote-count parity. A doubled quote contributes an even count so
/// it does not toggle state. A tolerance heuristic, not RFC 4180 lookahead.
fn assemble_records(text: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut pending: Option<String> = None;

    for raw_line in text.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        match pending.take() {
            None => {
                if line.trim().is_empty() {
                    continue;
                }
                if count_quotes(line) % 2 == 1 {
                    pending = Some(line.to_string());
                } else {
                    records.push(line.to_string());
                }
            }
            Some(mut rec) => {
                // Inside an open quote: the newline is literal field content.
                rec.push('\n');
                rec.push_str(line);
                if count_quotes(line) % 2 == 1 {
                    records.push(rec);
                } else {
                    pending = Some(rec);
                }
            }
        }
    }

    // Unterminated final record is still emitted if non-empty.
    if let Some(rec) = pending {
        if !rec.trim().is_empty() {
            records.push(rec);
        }
    }

    records
}

fn count_quotes(line: &str) -> usize {
    line.bytes().filter(|&b| b == b'"').count()
}

/// Split one logical record into fields, honoring double-quote quoting.
/// `""` inside a quoted field is one literal quote character.
fn split_record(record: &str, delim: u8) -> Vec<String> {
    let delim = delim as char;
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                field.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delim && !in_quotes {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(ch);
        }
    }
    fields.push(field);

    fields
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1).
fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Read and parse one delimited file, sniffing the delimiter when no hint is
/// given.
pub fn read_table(path: &Path, delimiter: Option<u8>) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    Ok(parse(&content, delimiter))
}

/// Write a table. Quoting is delegated to the csv writer, and the file is
/// only touched once the full output buffer has been assembled, so a failed
/// run never truncates a previous output.
pub fn write_table(
    path: &Path,
    headers: &[String],
    rows: &[HashMap<String, String>],
    delimiter: u8,
) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(headers).map_err(|e| e.to_string())?;
    for row in rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    let buf = writer.into_inner().map_err(|e| e.to_string())?;
    std::fs::write(path, buf).map_err(|e| format!("cannot write {}: {e}", path.display()))
}
