mod args;
mod survey;

use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

use crate::survey::anonymize::{run_anonymize, DEFAULT_EMAIL_COLUMN, DEFAULT_NAME_COLUMN};
use crate::survey::{run_analysis, MissingConfigSnafu, SurveyResult};

fn run(args: &args::Args) -> SurveyResult<()> {
    if args.anonymize {
        let drop_columns: Vec<String> = if args.drop_column.is_empty() {
            vec![DEFAULT_NAME_COLUMN.to_string()]
        } else {
            args.drop_column.clone()
        };
        let written = run_anonymize(
            &args.input,
            args.id_map.as_deref().unwrap_or("data/id_map.csv"),
            args.out.as_deref().unwrap_or("data/output_data"),
            args.email_column.as_deref().unwrap_or(DEFAULT_EMAIL_COLUMN),
            &drop_columns,
        )?;
        info!("Anonymised {} files", written.len());
        return Ok(());
    }

    let config_path = match args.config.as_ref() {
        Some(p) => p.clone(),
        None => return MissingConfigSnafu {}.fail(),
    };
    run_analysis(&config_path, args.reference.clone(), args.out.clone())?;
    Ok(())
}

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder
            .filter_module("likertsurvey", log::LevelFilter::Debug)
            .filter_module("likert_trends", log::LevelFilter::Debug);
    }
    builder.init();

    info!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
