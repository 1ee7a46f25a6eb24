// Primitives for reading and writing CSV files.

use std::fs::File;

use crate::survey::io_common::{RawCell, RawTable};
use crate::survey::*;

// Fields stay text: ids made of digits keep their leading zeros.
fn parse_cell(s: &str) -> RawCell {
    if s.trim().is_empty() {
        RawCell::Empty
    } else {
        RawCell::Text(s.to_string())
    }
}

/// Reads a CSV file with a header row. Lines may have different lengths.
pub fn read_csv_table(path: &str) -> SurveyResult<RawTable> {
    let mut records = get_records(path)?;
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path, lineno: 1usize })?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => return Ok(RawTable::default()),
    };
    debug!("read_csv_table: {}: header: {:?}", path, header);

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        rows.push(line.iter().map(parse_cell).collect());
    }
    debug!("read_csv_table: {}: {} rows", path, rows.len());
    Ok(RawTable { header, rows })
}

fn get_records(path: &str) -> SurveyResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    Ok(rdr.into_records())
}

/// Writes the header and the rows, blank cells as empty fields.
pub fn write_csv_table(path: &str, table: &RawTable) -> SurveyResult<()> {
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    wtr.write_record(&table.header)
        .context(WritingCsvSnafu { path })?;
    for row in table.rows.iter() {
        let fields: Vec<String> = row.iter().map(|c| c.as_text().unwrap_or_default()).collect();
        wtr.write_record(&fields).context(WritingCsvSnafu { path })?;
    }
    wtr.flush()
        .map_err(csv::Error::from)
        .context(WritingCsvSnafu { path })?;
    Ok(())
}
