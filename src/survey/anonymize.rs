// Replacement of e-mail addresses by stable pseudonyms.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::survey::io_common::{RawCell, RawTable};
use crate::survey::*;

pub const ANON_ID_COLUMN: &str = "Anon_ID";
pub const DEFAULT_EMAIL_COLUMN: &str = "Mail";
pub const DEFAULT_NAME_COLUMN: &str = "Navn";

/// The pseudonym of an e-mail address: the first 10 hex characters of its SHA-256 digest.
pub fn anonymous_id(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..10].to_string()
}

/// The e-mail -> pseudonym mapping, kept in a CSV file across weeks.
///
/// New entries are written by `flush`, or when the store is dropped.
pub struct IdStore {
    path: String,
    email_column: String,
    ids: BTreeMap<String, String>,
    dirty: bool,
}

impl IdStore {
    /// Loads the mapping if the file exists, otherwise starts empty.
    pub fn open(path: &str, email_column: &str) -> SurveyResult<IdStore> {
        let mut ids: BTreeMap<String, String> = BTreeMap::new();
        if Path::new(path).exists() {
            let table = io_csv::read_csv_table(path)?;
            let mail_idx = table.column_index(email_column).context(MissingColumnSnafu {
                path,
                column: email_column,
            })?;
            let id_idx = table
                .column_index(ANON_ID_COLUMN)
                .context(MissingColumnSnafu {
                    path,
                    column: ANON_ID_COLUMN,
                })?;
            for row in 0..table.rows.len() {
                if let (Some(mail), Some(id)) = (
                    table.cell(row, mail_idx).as_text(),
                    table.cell(row, id_idx).as_text(),
                ) {
                    ids.insert(mail, id);
                }
            }
            info!("IdStore::open: {}: {} known ids", path, ids.len());
        } else {
            info!("IdStore::open: {} does not exist, starting empty", path);
        }
        Ok(IdStore {
            path: path.to_string(),
            email_column: email_column.to_string(),
            ids,
            dirty: false,
        })
    }

    pub fn get_or_create(&mut self, email: &str) -> String {
        if let Some(id) = self.ids.get(email) {
            return id.clone();
        }
        let id = anonymous_id(email);
        self.ids.insert(email.to_string(), id.clone());
        self.dirty = true;
        id
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn flush(&mut self) -> SurveyResult<()> {
        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(WritingFileSnafu {
                    path: parent.display().to_string(),
                })?;
            }
        }
        let table = RawTable {
            header: vec![self.email_column.clone(), ANON_ID_COLUMN.to_string()],
            rows: self
                .ids
                .iter()
                .map(|(m, id)| vec![RawCell::Text(m.clone()), RawCell::Text(id.clone())])
                .collect(),
        };
        io_csv::write_csv_table(&self.path, &table)?;
        self.dirty = false;
        info!("IdStore::flush: {}: {} ids", self.path, self.ids.len());
        Ok(())
    }
}

impl Drop for IdStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.flush() {
                warn!("IdStore: could not save {}: {}", self.path, e);
            }
        }
    }
}

/// Adds the pseudonym column, and removes the e-mail column and the other sensitive columns.
pub fn anonymize_table(
    table: &RawTable,
    path: &str,
    store: &mut IdStore,
    email_column: &str,
    drop_columns: &[String],
) -> SurveyResult<RawTable> {
    let mail_idx = table.column_index(email_column).context(MissingColumnSnafu {
        path,
        column: email_column,
    })?;
    let mut dropped: Vec<usize> = vec![mail_idx];
    for c in drop_columns.iter() {
        match table.column_index(c) {
            Some(idx) => dropped.push(idx),
            None => warn!("anonymize_table: {}: no column {:?} to drop", path, c),
        }
    }
    let keep: Vec<usize> = (0..table.header.len())
        .filter(|idx| !dropped.contains(idx))
        .collect();

    let mut header: Vec<String> = keep.iter().map(|idx| table.header[*idx].clone()).collect();
    header.push(ANON_ID_COLUMN.to_string());
    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for row in 0..table.rows.len() {
        let id = match table.cell(row, mail_idx).as_text() {
            Some(mail) => RawCell::Text(store.get_or_create(&mail)),
            None => RawCell::Empty,
        };
        let mut cells: Vec<RawCell> = keep.iter().map(|idx| table.cell(row, *idx).clone()).collect();
        cells.push(id);
        rows.push(cells);
    }
    Ok(RawTable { header, rows })
}

/// Anonymizes one week file and writes `<stem>_anon.csv` in the output directory.
/// Returns the path of the written file.
pub fn anonymize_file(
    input: &str,
    out_dir: &str,
    store: &mut IdStore,
    email_column: &str,
    drop_columns: &[String],
) -> SurveyResult<String> {
    let p = Path::new(input);
    let raw = match p.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => io_csv::read_csv_table(input)?,
        _ => io_excel::read_excel_table(input, None)?,
    };
    let anon = anonymize_table(&raw, input, store, email_column, drop_columns)?;
    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| io_common::simplify_file_name(input));
    fs::create_dir_all(out_dir).context(WritingFileSnafu { path: out_dir })?;
    let out_path: PathBuf = Path::new(out_dir).join(format!("{}_anon.csv", stem));
    let out = out_path.display().to_string();
    io_csv::write_csv_table(&out, &anon)?;
    info!("Anonymised {} -> {}", input, out);
    Ok(out)
}

/// Anonymizes every input file with a shared mapping, and saves the mapping.
/// Missing input files are skipped.
pub fn run_anonymize(
    inputs: &[String],
    id_map: &str,
    out_dir: &str,
    email_column: &str,
    drop_columns: &[String],
) -> SurveyResult<Vec<String>> {
    let mut store = IdStore::open(id_map, email_column)?;
    let mut written: Vec<String> = Vec::new();
    for input in inputs.iter() {
        if !Path::new(input).exists() {
            warn!("run_anonymize: file not found: {}", input);
            continue;
        }
        written.push(anonymize_file(
            input,
            out_dir,
            &mut store,
            email_column,
            drop_columns,
        )?);
    }
    info!(
        "run_anonymize: {} files written, {} known ids",
        written.len(),
        store.len()
    );
    store.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let d = std::env::temp_dir().join(format!("likertsurvey-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&d);
        fs::create_dir_all(&d).unwrap();
        d
    }

    #[test]
    fn pseudonym_is_a_digest_prefix() {
        // sha256("abc")
        assert_eq!(anonymous_id("abc"), "ba7816bf8f");
        assert_eq!(anonymous_id("abc").len(), 10);
        assert_ne!(anonymous_id("a@x.dk"), anonymous_id("b@x.dk"));
    }

    #[test]
    fn store_persists_ids() {
        let _ = env_logger::builder().is_test(true).try_init();
        let d = tmp_dir("store");
        let map = d.join("id_map.csv").display().to_string();
        let id = {
            let mut store = IdStore::open(&map, DEFAULT_EMAIL_COLUMN).unwrap();
            assert_eq!(store.len(), 0);
            let id = store.get_or_create("student@uni.dk");
            assert_eq!(store.get_or_create("student@uni.dk"), id);
            id
            // Saved on drop.
        };
        let store = IdStore::open(&map, DEFAULT_EMAIL_COLUMN).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.ids.get("student@uni.dk"), Some(&id));
    }

    #[test]
    fn existing_ids_are_reused() {
        let d = tmp_dir("reuse");
        let map = d.join("id_map.csv").display().to_string();
        fs::write(&map, "Mail,Anon_ID\nold@uni.dk,0000000001\n").unwrap();
        let mut store = IdStore::open(&map, DEFAULT_EMAIL_COLUMN).unwrap();
        assert_eq!(store.get_or_create("old@uni.dk"), "0000000001");
    }

    #[test]
    fn anonymizes_a_week_file() {
        let d = tmp_dir("file");
        let input = d.join("AGILE_5.csv").display().to_string();
        fs::write(
            &input,
            "Navn,Mail,I want to gain practical knowledge\nAda,ada@uni.dk,Mostly agree\nBo,,Slightly agree\n",
        )
        .unwrap();
        let map = d.join("id_map.csv").display().to_string();
        let out_dir = d.join("out").display().to_string();
        let written = run_anonymize(
            &[input, d.join("AGILE_6.csv").display().to_string()],
            &map,
            &out_dir,
            DEFAULT_EMAIL_COLUMN,
            &[DEFAULT_NAME_COLUMN.to_string()],
        )
        .unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("AGILE_5_anon.csv"));

        let t = io_csv::read_csv_table(&written[0]).unwrap();
        assert_eq!(
            t.header,
            vec!["I want to gain practical knowledge", ANON_ID_COLUMN]
        );
        assert_eq!(t.cell(0, 1), &RawCell::Text(anonymous_id("ada@uni.dk")));
        assert_eq!(t.cell(1, 1), &RawCell::Empty);

        let store = IdStore::open(&map, DEFAULT_EMAIL_COLUMN).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_email_column() {
        let table = RawTable {
            header: vec!["Name".to_string()],
            rows: vec![],
        };
        let d = tmp_dir("missing");
        let mut store =
            IdStore::open(&d.join("m.csv").display().to_string(), DEFAULT_EMAIL_COLUMN).unwrap();
        let res = anonymize_table(&table, "x.csv", &mut store, DEFAULT_EMAIL_COLUMN, &[]);
        assert!(matches!(res, Err(SurveyError::MissingColumn { .. })));
    }
}
