// ********* Input data structures ***********

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// The number of a survey wave (for example 5 to 13 for a course running from week 5).
pub type Week = u32;

/// A single cell of a questionnaire, before or after encoding.
///
/// Readers produce labels (or scores, if the export is already numeric). After encoding,
/// only scores and missing values remain in the encoded columns.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Response {
    /// A raw categorical label as typed in the spreadsheet.
    Label(String),
    /// An ordinal rank, starting at 1.
    Score(u8),
    /// No answer, or an answer that could not be understood.
    Missing,
}

/// One questionnaire submission.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RespondentRow {
    /// Pseudonymous identifier, stable across weeks for the same person.
    pub respondent: String,
    /// Question text -> response. A question absent from the map is a missing response.
    pub responses: HashMap<String, Response>,
    /// The programme the respondent currently follows, as declared.
    pub current_programme: Option<String>,
    /// The programme of the earlier phase, used when the respondent is still in that phase.
    pub prior_programme: Option<String>,
}

impl RespondentRow {
    pub fn new(respondent: &str) -> RespondentRow {
        RespondentRow {
            respondent: respondent.to_string(),
            responses: HashMap::new(),
            current_programme: None,
            prior_programme: None,
        }
    }

    pub fn with_response(mut self, question: &str, response: Response) -> RespondentRow {
        self.responses.insert(question.to_string(), response);
        self
    }

    pub fn with_programmes(mut self, current: Option<&str>, prior: Option<&str>) -> RespondentRow {
        self.current_programme = current.map(|s| s.to_string());
        self.prior_programme = prior.map(|s| s.to_string());
        self
    }

    pub fn response(&self, question: &str) -> Option<&Response> {
        self.responses.get(question)
    }
}

/// The rows collected in one survey wave, possibly restricted to a single cohort.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct WeeklyTable {
    pub rows: Vec<RespondentRow>,
}

impl WeeklyTable {
    pub fn new(rows: Vec<RespondentRow>) -> WeeklyTable {
        WeeklyTable { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trims the label and collapses internal runs of whitespace to a single space.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// A group of respondents sharing a resolved education programme.
///
/// Two cohorts are the same if their names only differ by case or spacing. The display name
/// is the spelling used when the cohort was created.
#[derive(Debug, Clone)]
pub struct Cohort {
    name: String,
    key: String,
}

impl Cohort {
    /// Returns None for blank labels.
    pub fn new(label: &str) -> Option<Cohort> {
        let name = normalize_whitespace(label);
        if name.is_empty() {
            return None;
        }
        let key = name.to_lowercase();
        Some(Cohort { name, key })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Cohort {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Cohort {}

impl Hash for Cohort {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Cohort {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cohort {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ********* Scales and questions **********

/// The Likert scales used by the questionnaire.
///
/// Each variant is an ordered list of labels mapped to the ranks 1..=n.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ScaleVariant {
    /// 6-point agreement scale.
    Agreement6,
    /// 7-point magnitude scale (how much uncertainty).
    Magnitude7,
    /// 7-point difficulty scale (how easy or difficult).
    Difficulty7,
}

const AGREEMENT_6: [&str; 6] = [
    "Completely disagree",
    "Mostly disagree",
    "Slightly disagree",
    "Slightly agree",
    "Mostly agree",
    "Completely agree",
];

const MAGNITUDE_7: [&str; 7] = [
    "None at all",
    "Very little",
    "Little",
    "A moderate amount",
    "Quite a lot",
    "A lot",
    "A great deal",
];

const DIFFICULTY_7: [&str; 7] = [
    "Extremely easy",
    "Very easy",
    "Somewhat easy",
    "Neither easy nor difficult",
    "Somewhat difficult",
    "Very difficult",
    "Extremely difficult",
];

impl ScaleVariant {
    pub const ALL: [ScaleVariant; 3] = [
        ScaleVariant::Agreement6,
        ScaleVariant::Magnitude7,
        ScaleVariant::Difficulty7,
    ];

    /// The labels, in rank order. The label at index i has rank i + 1.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            ScaleVariant::Agreement6 => &AGREEMENT_6,
            ScaleVariant::Magnitude7 => &MAGNITUDE_7,
            ScaleVariant::Difficulty7 => &DIFFICULTY_7,
        }
    }

    pub fn num_ranks(&self) -> u8 {
        self.labels().len() as u8
    }

    pub fn ranks(&self) -> std::ops::RangeInclusive<u8> {
        1..=self.num_ranks()
    }

    pub fn contains(&self, rank: u8) -> bool {
        self.ranks().contains(&rank)
    }

    /// The name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ScaleVariant::Agreement6 => "agreement6",
            ScaleVariant::Magnitude7 => "magnitude7",
            ScaleVariant::Difficulty7 => "difficulty7",
        }
    }

    pub fn from_name(name: &str) -> Option<ScaleVariant> {
        ScaleVariant::ALL
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub text: String,
    pub scale: ScaleVariant,
    /// Optional thematic group (motivation, capacity, ...), used for snapshots.
    pub group: Option<String>,
}

/// The scale assignment of every question included in the analysis.
///
/// A question keeps the same scale for the lifetime of the catalog.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new() -> QuestionCatalog {
        QuestionCatalog::default()
    }

    /// Registers a question. Registering the same question twice is accepted only if
    /// the scale is the same.
    pub fn add(
        &mut self,
        text: &str,
        scale: ScaleVariant,
        group: Option<&str>,
    ) -> Result<(), AggregationError> {
        if let Some(q) = self.questions.iter().find(|q| q.text == text) {
            if q.scale != scale {
                return Err(AggregationError::ConflictingScale {
                    question: text.to_string(),
                    registered: q.scale,
                    requested: scale,
                });
            }
            return Ok(());
        }
        self.questions.push(Question {
            text: text.to_string(),
            scale,
            group: group.map(|g| g.to_string()),
        });
        Ok(())
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn scale_of(&self, question: &str) -> Result<ScaleVariant, AggregationError> {
        self.questions
            .iter()
            .find(|q| q.text == question)
            .map(|q| q.scale)
            .ok_or_else(|| AggregationError::UnknownQuestion {
                question: question.to_string(),
            })
    }

    /// The question texts, grouped by scale.
    pub fn columns_by_scale(&self) -> BTreeMap<ScaleVariant, Vec<String>> {
        let mut res: BTreeMap<ScaleVariant, Vec<String>> = BTreeMap::new();
        for q in self.questions.iter() {
            res.entry(q.scale).or_default().push(q.text.clone());
        }
        res
    }

    /// The groups, in order of first appearance, with their questions.
    pub fn groups(&self) -> Vec<(String, Vec<String>)> {
        let mut res: Vec<(String, Vec<String>)> = Vec::new();
        for q in self.questions.iter() {
            if let Some(g) = q.group.as_ref() {
                match res.iter_mut().find(|(name, _)| name == g) {
                    Some((_, qs)) => qs.push(q.text.clone()),
                    None => res.push((g.clone(), vec![q.text.clone()])),
                }
            }
        }
        res
    }
}

/// Which weeks a view covers.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum WeekSelection {
    /// Every week of the dataset.
    All,
    /// Exactly these weeks. Every week must be present in the dataset.
    Only(Vec<Week>),
}

/// The central tendency reported by the trend and snapshot views.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TrendStatistic {
    /// Median with the 25th and 75th percentiles.
    Median,
    /// Arithmetic mean with a 95% confidence half-width.
    Mean,
}

impl TrendStatistic {
    pub fn name(&self) -> &'static str {
        match self {
            TrendStatistic::Median => "median",
            TrendStatistic::Mean => "mean",
        }
    }
}

// ******** Output data structures *********

/// Descriptive statistics of one (week, cohort, question) slice.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Summary {
    Quartiles {
        median: f64,
        q1: f64,
        q3: f64,
    },
    MeanInterval {
        mean: f64,
        /// Sample standard deviation. Missing with fewer than 2 observations.
        std: Option<f64>,
        /// 1.96 * std / sqrt(n). Missing with fewer than 2 observations.
        half_width: Option<f64>,
    },
}

impl Summary {
    pub fn center(&self) -> f64 {
        match self {
            Summary::Quartiles { median, .. } => *median,
            Summary::MeanInterval { mean, .. } => *mean,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct TrendPoint {
    pub week: Week,
    /// Number of non-missing observations.
    pub n: usize,
    /// None when the slice has no observation.
    pub summary: Option<Summary>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TrendSeries {
    pub cohort: Cohort,
    /// One point per week of the view, in the same order.
    pub points: Vec<TrendPoint>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TrendView {
    pub question: String,
    pub statistic: TrendStatistic,
    /// Ascending.
    pub weeks: Vec<Week>,
    /// Sorted by cohort.
    pub series: Vec<TrendSeries>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankShare {
    pub rank: u8,
    pub label: &'static str,
    /// Percentage of the non-missing responses of the slice, 0 if there are none.
    pub percent: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CohortDistribution {
    pub cohort: Cohort,
    pub n: usize,
    /// Every rank of the scale, in rank order.
    pub shares: Vec<RankShare>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WeekDistribution {
    pub week: Week,
    pub cohorts: Vec<CohortDistribution>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DistributionView {
    pub question: String,
    pub scale: ScaleVariant,
    pub weeks: Vec<WeekDistribution>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SnapshotMatrix {
    pub week: Week,
    /// cells[question][cohort], None for no data.
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SnapshotView {
    pub questions: Vec<String>,
    pub cohorts: Vec<Cohort>,
    pub statistic: TrendStatistic,
    /// The valid (min, max) rank range of each question, for color normalization.
    pub ranges: Vec<(f64, f64)>,
    pub matrices: Vec<SnapshotMatrix>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SummaryReport {
    pub views: Vec<TrendView>,
    /// The smallest and largest mean over all the views, if any.
    pub value_range: Option<(f64, f64)>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TimeSeriesRecord {
    pub respondent: String,
    /// One entry per week of the time series.
    pub scores: Vec<Option<u8>>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TimeSeries {
    pub question: String,
    pub scale: ScaleVariant,
    pub weeks: Vec<Week>,
    /// Sorted by respondent.
    pub records: Vec<TimeSeriesRecord>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseRateRow {
    pub cohort: Cohort,
    /// Distinct respondents per week, in the order of the table weeks.
    pub counts: Vec<usize>,
    pub total: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseRateTable {
    pub weeks: Vec<Week>,
    pub rows: Vec<ResponseRateRow>,
    pub week_totals: Vec<usize>,
    pub grand_total: usize,
}

/// Structural problems that prevent a view from being computed.
///
/// Missing data is never an error.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationError {
    UnknownQuestion {
        question: String,
    },
    ConflictingScale {
        question: String,
        registered: ScaleVariant,
        requested: ScaleVariant,
    },
    WeekNotAvailable {
        week: Week,
    },
    UnencodedResponse {
        question: String,
        week: Week,
        cohort: String,
        respondent: String,
    },
    ScoreOutOfRange {
        question: String,
        week: Week,
        cohort: String,
        score: u8,
    },
    EmptySelection {
        what: String,
    },
    EmptyDataset,
}

impl Error for AggregationError {}

impl Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::UnknownQuestion { question } => {
                write!(f, "question {:?} has no scale assignment", question)
            }
            AggregationError::ConflictingScale {
                question,
                registered,
                requested,
            } => write!(
                f,
                "question {:?} is registered with scale {} and cannot be reused with scale {}",
                question,
                registered.name(),
                requested.name()
            ),
            AggregationError::WeekNotAvailable { week } => {
                write!(f, "week {} is not present in the dataset", week)
            }
            AggregationError::UnencodedResponse {
                question,
                week,
                cohort,
                respondent,
            } => write!(
                f,
                "week {} cohort {:?}: respondent {} still has a raw label for question {:?}",
                week, cohort, respondent, question
            ),
            AggregationError::ScoreOutOfRange {
                question,
                week,
                cohort,
                score,
            } => write!(
                f,
                "week {} cohort {:?}: score {} is outside the scale of question {:?}",
                week, cohort, score, question
            ),
            AggregationError::EmptySelection { what } => write!(f, "no {} selected", what),
            AggregationError::EmptyDataset => write!(f, "the dataset contains no week"),
        }
    }
}
