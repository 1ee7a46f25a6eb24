use clap::Parser;

/// This program aggregates weekly Likert questionnaires by education cohort.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the analysis: the week files, the columns and the questions.
    /// For more information about the file format, read the documentation of the likert_trends crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, likertsurvey will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory of the configuration.
    /// With --anonymize, the directory where the anonymised files are written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Anonymization
    /// Replaces the e-mail addresses of the --input files by pseudonyms instead of running an analysis.
    #[clap(long, takes_value = false)]
    pub anonymize: bool,

    /// (file path, repeated) The week files to anonymise (xlsx or csv).
    #[clap(short, long, value_parser)]
    pub input: Vec<String>,

    /// (default data/id_map.csv) The file holding the mapping between e-mail addresses and pseudonyms.
    /// It is created if it does not exist, and updated with the new addresses.
    #[clap(long, value_parser)]
    pub id_map: Option<String>,

    /// (default Mail) The column containing the e-mail addresses.
    #[clap(long, value_parser)]
    pub email_column: Option<String>,

    /// (repeated, default Navn) Other columns to remove from the anonymised files.
    #[clap(long, value_parser)]
    pub drop_column: Vec<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
