// Primitives shared by the spreadsheet readers.

use std::path::Path;

use crate::survey::config_reader::ColumnSettings;
use crate::survey::*;

/// A cell as read from a spreadsheet, before any interpretation.
#[derive(PartialEq, Debug, Clone)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Empty,
}

impl RawCell {
    /// The content as text, None for blank cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Text(s) if s.trim().is_empty() => None,
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
            RawCell::Number(f) => Some(f.to_string()),
            RawCell::Empty => None,
        }
    }
}

/// A sheet: a header row and the data rows below it.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    /// Header names are compared after whitespace normalization.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let target = normalize_whitespace(name);
        self.header
            .iter()
            .position(|h| normalize_whitespace(h) == target)
    }

    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&RawCell::Empty)
    }
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// The week encoded in names like `AGILE_7_anon.xlsx`.
pub fn week_from_file_name(path: &str) -> Option<Week> {
    let stem = Path::new(path).file_stem()?.to_str()?;
    stem.split('_').nth(1)?.trim().parse::<Week>().ok()
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

fn cell_response(cell: &RawCell) -> Response {
    match cell {
        RawCell::Text(s) if s.trim().is_empty() => Response::Missing,
        RawCell::Text(s) => match s.trim().parse::<u8>() {
            Ok(score) => Response::Score(score),
            Err(_) => Response::Label(s.clone()),
        },
        RawCell::Number(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u8::MAX as f64 => {
            Response::Score(*f as u8)
        }
        RawCell::Number(_) => Response::Missing,
        RawCell::Empty => Response::Missing,
    }
}

/// Turns a sheet into a weekly table.
///
/// The rows of respondents who did not give their consent are left out. The respondent id
/// falls back to the file name and line number when the id column is absent. Questions
/// without a column are left as missing answers.
pub fn to_weekly_table(
    raw: &RawTable,
    path: &str,
    columns: &ColumnSettings,
    questions: &[String],
) -> SurveyResult<WeeklyTable> {
    let default_id = make_default_id(path);
    let id_idx_o = raw.column_index(&columns.respondent_id);
    if id_idx_o.is_none() {
        warn!(
            "to_weekly_table: {}: no column {:?}, using line numbers as ids",
            path, columns.respondent_id
        );
    }
    let consent_idx_o = match columns.consent.as_ref() {
        Some(c) => Some(raw.column_index(c).context(MissingColumnSnafu {
            path,
            column: c.clone(),
        })?),
        None => None,
    };
    let current_idx_o = raw.column_index(&columns.current_programme);
    let prior_idx_o = raw.column_index(&columns.prior_programme);

    let mut question_idxs: Vec<(usize, &String)> = Vec::new();
    for q in questions.iter() {
        match raw.column_index(q) {
            Some(idx) => question_idxs.push((idx, q)),
            None => debug!("to_weekly_table: {}: no column for {:?}", path, q),
        }
    }
    debug!(
        "to_weekly_table: {}: {} of {} questions found",
        path,
        question_idxs.len(),
        questions.len()
    );

    let consent_value = normalize_whitespace(&columns.consent_value).to_lowercase();
    let mut res: Vec<RespondentRow> = Vec::new();
    let mut no_consent: usize = 0;
    for (idx, line) in raw.rows.iter().enumerate() {
        if line.iter().all(|c| c.as_text().is_none()) {
            continue;
        }
        // The header is line 1.
        let lineno = idx + 2;
        if let Some(consent_idx) = consent_idx_o {
            let agreed = raw
                .cell(idx, consent_idx)
                .as_text()
                .map(|s| normalize_whitespace(&s).to_lowercase() == consent_value)
                .unwrap_or(false);
            if !agreed {
                no_consent += 1;
                continue;
            }
        }
        let id = id_idx_o
            .and_then(|i| raw.cell(idx, i).as_text())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| default_id(lineno));
        let current = current_idx_o.and_then(|i| raw.cell(idx, i).as_text());
        let prior = prior_idx_o.and_then(|i| raw.cell(idx, i).as_text());

        let mut row =
            RespondentRow::new(&id).with_programmes(current.as_deref(), prior.as_deref());
        for (col, q) in question_idxs.iter() {
            row = row.with_response(q, cell_response(raw.cell(idx, *col)));
        }
        res.push(row);
    }
    if no_consent > 0 {
        info!(
            "to_weekly_table: {}: {} rows without consent left out",
            path, no_consent
        );
    }
    Ok(WeeklyTable::new(res))
}
