use crate::survey::*;

use serde::{Deserialize, Serialize};

/// The consent statement of the questionnaire.
pub const PARTICIPANT_INFO_AGREEMENT: &str = "I have read the participant information and consent to my data being collected and used in anonymised form for this study.";

pub const MOTIVATION: [&str; 7] = [
    "I felt confident in working with the methodology today",
    "I am interested in the methodology of this course",
    "This course is relevant for me in my future",
    "I want to gain practical knowledge",
    "I want to gain theoretical knowledge",
    "I feel like I know more than I did last week",
    "I feel that I have influence and responsibility in my group, and that my inclusion and opinions are valued",
];

pub const CAPACITY: [&str; 5] = [
    "I feel like I can use my (priorly learned) skills in the course",
    "I feel like I am acquiring new skills every week with the Agile methodology",
    "The teacher",
    "The TA's",
    "Other students",
];

pub const UNCERTAINTY: [&str; 3] = [
    "How much uncertainty do you encounter in this course regarding the end goal at this point?",
    "How much uncertainty did you encounter in the Agile methodology from today?",
    "How easy or difficult would it be to make changes to your design at this stage?",
];

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "analysisName")]
    pub analysis_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "distributionWeeks")]
    pub distribution_weeks: Option<Vec<Week>>,
    #[serde(rename = "trendStatistic")]
    pub trend_statistic: Option<String>,
    #[serde(rename = "snapshotStatistic")]
    pub snapshot_statistic: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WeekSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub week: Option<Week>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl WeekSource {
    /// The configured week, or the one found in the file name.
    pub fn week_number(&self) -> SurveyResult<Week> {
        match self.week {
            Some(w) => Ok(w),
            None => io_common::week_from_file_name(&self.file_path).context(MissingWeekSnafu {
                path: self.file_path.clone(),
            }),
        }
    }
}

fn default_respondent_id() -> String {
    "Anon_ID".to_string()
}

fn default_consent() -> Option<String> {
    Some(PARTICIPANT_INFO_AGREEMENT.to_string())
}

fn default_consent_value() -> String {
    "Yes".to_string()
}

fn default_current_programme() -> String {
    "What master's programme do you follow?".to_string()
}

fn default_prior_programme() -> String {
    "What bachelor's programme did you follow?".to_string()
}

fn default_sentinel() -> String {
    likert_trends::cohort::DEFAULT_EARLIER_PHASE_SENTINEL.to_string()
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSettings {
    #[serde(rename = "respondentId", default = "default_respondent_id")]
    pub respondent_id: String,
    /// No filtering on consent when null.
    #[serde(default = "default_consent")]
    pub consent: Option<String>,
    #[serde(rename = "consentValue", default = "default_consent_value")]
    pub consent_value: String,
    #[serde(rename = "currentProgramme", default = "default_current_programme")]
    pub current_programme: String,
    #[serde(rename = "priorProgramme", default = "default_prior_programme")]
    pub prior_programme: String,
    #[serde(rename = "earlierPhaseSentinel", default = "default_sentinel")]
    pub earlier_phase_sentinel: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        ColumnSettings {
            respondent_id: default_respondent_id(),
            consent: default_consent(),
            consent_value: default_consent_value(),
            current_programme: default_current_programme(),
            prior_programme: default_prior_programme(),
            earlier_phase_sentinel: default_sentinel(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub text: String,
    pub scale: String,
    pub group: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "weekSources")]
    pub week_sources: Vec<WeekSource>,
    #[serde(default)]
    pub columns: ColumnSettings,
    pub questions: Option<Vec<QuestionConfig>>,
}

impl SurveyConfig {
    pub fn catalog(&self) -> SurveyResult<QuestionCatalog> {
        let qs = match self.questions.as_ref() {
            Some(qs) => qs,
            None => return Ok(default_catalog()),
        };
        let mut catalog = QuestionCatalog::new();
        for q in qs.iter() {
            let scale = ScaleVariant::from_name(&q.scale).context(UnknownScaleSnafu {
                question: q.text.clone(),
                scale: q.scale.clone(),
            })?;
            catalog
                .add(&q.text, scale, q.group.as_deref())
                .context(AggregationSnafu {
                    view: "question catalog",
                })?;
        }
        Ok(catalog)
    }

    pub fn programme_rule(&self) -> ProgrammeRule {
        ProgrammeRule {
            earlier_phase_sentinel: self.columns.earlier_phase_sentinel.clone(),
        }
    }

    pub fn trend_statistic(&self) -> SurveyResult<TrendStatistic> {
        parse_statistic(self.output_settings.trend_statistic.as_deref())
    }

    pub fn snapshot_statistic(&self) -> SurveyResult<TrendStatistic> {
        parse_statistic(self.output_settings.snapshot_statistic.as_deref())
    }

    pub fn distribution_weeks(&self) -> WeekSelection {
        match self.output_settings.distribution_weeks.as_ref() {
            Some(ws) if !ws.is_empty() => WeekSelection::Only(ws.clone()),
            _ => WeekSelection::All,
        }
    }
}

fn parse_statistic(name: Option<&str>) -> SurveyResult<TrendStatistic> {
    match name.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("median") => Ok(TrendStatistic::Median),
        Some("mean") => Ok(TrendStatistic::Mean),
        Some(x) => UnknownStatisticSnafu { name: x }.fail(),
    }
}

/// The questions of the course questionnaire.
///
/// Motivation and capacity use the 6-point agreement scale. The two uncertainty questions
/// use the 7-point magnitude scale, and the question on changing the design uses the
/// 7-point difficulty scale.
pub fn default_catalog() -> QuestionCatalog {
    let mut catalog = QuestionCatalog::new();
    let entries = MOTIVATION
        .iter()
        .map(|q| (*q, ScaleVariant::Agreement6, "motivation"))
        .chain(
            CAPACITY
                .iter()
                .map(|q| (*q, ScaleVariant::Agreement6, "capacity")),
        )
        .chain([
            (UNCERTAINTY[0], ScaleVariant::Magnitude7, "uncertainty"),
            (UNCERTAINTY[1], ScaleVariant::Magnitude7, "uncertainty"),
            (UNCERTAINTY[2], ScaleVariant::Difficulty7, "uncertainty"),
        ]);
    for (text, scale, group) in entries {
        // The texts are distinct, registration cannot conflict.
        let _ = catalog.add(text, scale, Some(group));
    }
    catalog
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let js = r#"{
            "outputSettings": { "analysisName": "test" },
            "weekSources": [ { "provider": "csv", "filePath": "AGILE_5_anon.csv" } ]
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.columns, ColumnSettings::default());
        assert_eq!(config.week_sources[0].week_number().unwrap(), 5);
        assert_eq!(config.trend_statistic().unwrap(), TrendStatistic::Median);
        assert_eq!(config.distribution_weeks(), WeekSelection::All);

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.questions().len(), 15);
        assert_eq!(
            catalog.scale_of(UNCERTAINTY[2]).unwrap(),
            ScaleVariant::Difficulty7
        );
        assert_eq!(catalog.scale_of(UNCERTAINTY[0]).unwrap(), ScaleVariant::Magnitude7);
        assert_eq!(catalog.scale_of("The TA's").unwrap(), ScaleVariant::Agreement6);
        let groups: Vec<String> = catalog.groups().into_iter().map(|(g, _)| g).collect();
        assert_eq!(groups, vec!["motivation", "capacity", "uncertainty"]);
    }

    #[test]
    fn explicit_questions_and_columns() {
        let js = r#"{
            "outputSettings": {
                "analysisName": "test",
                "distributionWeeks": [7, 5],
                "trendStatistic": "Mean"
            },
            "weekSources": [],
            "columns": { "respondentId": "ID", "consent": null },
            "questions": [
                { "text": "Q1", "scale": "agreement6", "group": "g" },
                { "text": "Q2", "scale": "difficulty7" }
            ]
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.columns.respondent_id, "ID");
        assert_eq!(config.columns.consent, None);
        assert_eq!(config.columns.consent_value, "Yes");
        assert_eq!(config.trend_statistic().unwrap(), TrendStatistic::Mean);
        assert_eq!(config.distribution_weeks(), WeekSelection::Only(vec![7, 5]));
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.questions().len(), 2);
        assert_eq!(catalog.scale_of("Q2").unwrap(), ScaleVariant::Difficulty7);
    }

    #[test]
    fn rejects_unknown_scale_and_statistic() {
        let js = r#"{
            "outputSettings": { "analysisName": "test", "snapshotStatistic": "mode" },
            "weekSources": [],
            "questions": [ { "text": "Q1", "scale": "agreement5" } ]
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert!(matches!(config.catalog(), Err(SurveyError::UnknownScale { .. })));
        assert!(matches!(
            config.snapshot_statistic(),
            Err(SurveyError::UnknownStatistic { .. })
        ));
    }

    #[test]
    fn week_source_without_week() {
        let ws = WeekSource {
            provider: "xlsx".to_string(),
            file_path: "responses.xlsx".to_string(),
            week: None,
            excel_worksheet_name: None,
        };
        assert!(matches!(ws.week_number(), Err(SurveyError::MissingWeek { .. })));
    }
}
