pub mod anonymize;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
pub mod report;

use log::{debug, info, warn};

use likert_trends::builder::SurveyBuilder;
use likert_trends::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::survey::config_reader::*;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("{path}: could not read line {lineno}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{path}: missing column {column:?}"))]
    MissingColumn { path: String, column: String },
    #[snafu(display("Cannot find the week number of {path}: set it in the configuration"))]
    MissingWeek { path: String },
    #[snafu(display("Provider not implemented {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown scale {scale:?} for question {question:?}"))]
    UnknownScale { question: String, scale: String },
    #[snafu(display("Unknown statistic {name:?} (expected median or mean)"))]
    UnknownStatistic { name: String },
    #[snafu(display("No configuration file provided (use --config)"))]
    #[snafu(visibility(pub(crate)))]
    MissingConfig {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("{view}: {source}"))]
    Aggregation {
        source: AggregationError,
        view: String,
    },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},
}

pub type SurveyResult<T> = Result<T, SurveyError>;

fn source_path(root_path: &Path, ws: &WeekSource) -> String {
    let p: PathBuf = root_path.join(&ws.file_path);
    p.as_path().display().to_string()
}

fn read_week_source(
    root_path: &Path,
    ws: &WeekSource,
    columns: &ColumnSettings,
    catalog: &QuestionCatalog,
    builder: &mut SurveyBuilder,
) -> SurveyResult<()> {
    let path = source_path(root_path, ws);
    info!("Attempting to read week file {:?}", path);
    let questions: Vec<String> = catalog.questions().iter().map(|q| q.text.clone()).collect();
    match ws.provider.as_str() {
        "xlsx" => {
            let week = ws.week_number()?;
            let raw = io_excel::read_excel_table(&path, ws.excel_worksheet_name.as_deref())?;
            let table = io_common::to_weekly_table(&raw, &path, columns, &questions)?;
            builder.add_week(week, table);
        }
        "csv" => {
            let week = ws.week_number()?;
            let raw = io_csv::read_csv_table(&path)?;
            let table = io_common::to_weekly_table(&raw, &path, columns, &questions)?;
            builder.add_week(week, table);
        }
        "xlsx_cohort_sheets" => {
            let sheets = io_excel::read_cohort_sheets(&path)?;
            add_cohort_sheets(sheets, &path, columns, &questions, builder)?;
        }
        x => {
            return UnknownProviderSnafu { provider: x }.fail();
        }
    }
    Ok(())
}

/// Adds each sheet under its name, which carries the cohort and the week.
fn add_cohort_sheets(
    sheets: Vec<(String, io_common::RawTable)>,
    path: &str,
    columns: &ColumnSettings,
    questions: &[String],
    builder: &mut SurveyBuilder,
) -> SurveyResult<()> {
    for (key, raw) in sheets {
        let table = io_common::to_weekly_table(&raw, path, columns, questions)?;
        builder.add_flat(&key, table);
    }
    Ok(())
}

/// Loads, encodes and partitions all the weeks of a configuration.
pub fn load_survey(config: &SurveyConfig, root_path: &Path) -> SurveyResult<Survey> {
    let catalog = config.catalog()?;
    let rule = config.programme_rule();
    let mut builder = SurveyBuilder::new(&catalog, &rule);
    for ws in config.week_sources.iter() {
        read_week_source(root_path, ws, &config.columns, &catalog, &mut builder)?;
    }
    builder.build().context(AggregationSnafu { view: "dataset" })
}

fn write_output(path: &str, contents: &str) -> SurveyResult<()> {
    if path == "stdout" {
        println!("{}", contents);
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingFileSnafu {
                path: parent.display().to_string(),
            })?;
        }
    }
    fs::write(path, contents).context(WritingFileSnafu { path })?;
    info!("Wrote {}", path);
    Ok(())
}

/// Runs the whole analysis described by a configuration file.
///
/// The summary is written to `out` if given, otherwise to `summary.json` in the output
/// directory of the configuration, otherwise to the standard output. If a reference summary
/// is given, any difference is reported as an error.
pub fn run_analysis(
    config_path: &str,
    check_summary_path: Option<String>,
    out: Option<String>,
) -> SurveyResult<JSValue> {
    let config_p = Path::new(config_path);
    let config = read_config(config_path)?;
    info!("config: {:?}", config.output_settings);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let survey = load_survey(&config, root_p)?;

    let summary_js = report::build_summary_js(&config, &survey)?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {
        path: "summary",
    })?;

    let output_dir: Option<PathBuf> = config
        .output_settings
        .output_directory
        .as_ref()
        .map(|d| root_p.join(d));

    let summary_path: String = match (out, output_dir.as_ref()) {
        (Some(p), _) => p,
        (None, Some(d)) => d.join("summary.json").display().to_string(),
        (None, None) => "stdout".to_string(),
    };
    write_output(&summary_path, &pretty_js_stats)?;

    if let Some(d) = output_dir.as_ref() {
        let rates_path = d.join("response_rates.csv").display().to_string();
        fs::create_dir_all(d).context(WritingFileSnafu {
            path: d.display().to_string(),
        })?;
        report::write_response_rates_csv(&rates_path, &survey.response_rates())?;
        info!("Wrote {}", rates_path);
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref = serde_json::to_string_pretty(&summary_ref)
            .context(ParsingJsonSnafu { path: summary_p })?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
        info!("The summary matches the reference");
    }

    Ok(summary_js)
}

pub fn read_summary(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_summary: {} top-level entries", js.as_object().map(|o| o.len()).unwrap_or(0));
    Ok(js)
}
