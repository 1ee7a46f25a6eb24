use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::survey::io_common::{RawCell, RawTable};
use crate::survey::*;

fn to_cell(dt: &DataType) -> RawCell {
    match dt {
        DataType::String(s) if s.trim().is_empty() => RawCell::Empty,
        DataType::String(s) => RawCell::Text(s.clone()),
        DataType::Float(f) => RawCell::Number(*f),
        DataType::Int(i) => RawCell::Number(*i as f64),
        DataType::Empty => RawCell::Empty,
        other => RawCell::Text(format!("{}", other)),
    }
}

fn range_to_table(wrange: &Range<DataType>) -> RawTable {
    let mut iter = wrange.rows();
    let header: Vec<String> = match iter.next() {
        Some(h) => h
            .iter()
            .map(|dt| match to_cell(dt).as_text() {
                Some(s) => s,
                None => "".to_string(),
            })
            .collect(),
        None => return RawTable::default(),
    };
    let rows = iter.map(|r| r.iter().map(to_cell).collect()).collect();
    RawTable { header, rows }
}

fn open(path: &str) -> SurveyResult<Xlsx<std::io::BufReader<std::fs::File>>> {
    let workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    Ok(workbook)
}

/// Reads one worksheet: the named one, or the first one of the workbook.
pub fn read_excel_table(path: &str, worksheet_name_o: Option<&str>) -> SurveyResult<RawTable> {
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook = open(path)?;
    let wrange = match worksheet_name_o {
        // A worksheet name was provided, use it.
        Some(worksheet_name) => workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                name: worksheet_name,
            })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    let table = range_to_table(&wrange);
    if table.header.is_empty() {
        return EmptyExcelSnafu { path }.fail();
    }
    debug!(
        "read_excel_table: {}: header: {:?}, {} rows",
        path,
        table.header,
        table.rows.len()
    );
    Ok(table)
}

/// Reads every worksheet of a workbook that stores one sheet per cohort and week.
/// The sheet names are returned as they are.
pub fn read_cohort_sheets(path: &str) -> SurveyResult<Vec<(String, RawTable)>> {
    let mut workbook = open(path)?;
    sheets_to_tables(path, workbook.worksheets())
}

/// Converts named worksheets to tables, skipping the empty ones.
fn sheets_to_tables(
    path: &str,
    sheets: Vec<(String, Range<DataType>)>,
) -> SurveyResult<Vec<(String, RawTable)>> {
    let mut res: Vec<(String, RawTable)> = Vec::new();
    for (name, wrange) in sheets {
        let table = range_to_table(&wrange);
        if table.header.is_empty() {
            warn!("read_cohort_sheets: {}: sheet {:?} is empty", path, name);
            continue;
        }
        debug!(
            "read_cohort_sheets: {}: sheet {:?}: {} rows",
            path,
            name,
            table.rows.len()
        );
        res.push((name, table));
    }
    if res.is_empty() {
        return EmptyExcelSnafu { path }.fail();
    }
    Ok(res)
}
