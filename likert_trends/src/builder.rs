use log::{debug, info, warn};
use std::collections::BTreeMap;

pub use crate::cohort::ProgrammeRule;
use crate::cohort::group;
pub use crate::config::*;
use crate::codec::encode;
pub use crate::dataset::AggregatedDataset;
use crate::restructure::{flatten_to_nested, merge_slice, NestedTables};

/// A builder for assembling a survey from weekly tables.
///
/// ```
/// use likert_trends::builder::SurveyBuilder;
/// use likert_trends::{ProgrammeRule, QuestionCatalog, RespondentRow, Response, ScaleVariant, WeeklyTable};
/// # use likert_trends::AggregationError;
///
/// let mut catalog = QuestionCatalog::new();
/// catalog.add("I want to gain practical knowledge", ScaleVariant::Agreement6, None)?;
///
/// let mut builder = SurveyBuilder::new(&catalog, &ProgrammeRule::default());
/// builder.add_week(5, WeeklyTable::new(vec![RespondentRow::new("3f2a9c01de")
///     .with_programmes(Some("Architecture"), None)
///     .with_response("I want to gain practical knowledge", Response::Label("Mostly agree".to_string()))]));
///
/// let survey = builder.build()?;
/// assert_eq!(survey.dataset.weeks(), vec![5]);
///
/// # Ok::<(), AggregationError>(())
/// ```
pub struct SurveyBuilder {
    pub(crate) _catalog: QuestionCatalog,
    pub(crate) _rule: ProgrammeRule,
    pub(crate) _weeks: BTreeMap<Week, WeeklyTable>,
    pub(crate) _legacy: BTreeMap<String, WeeklyTable>,
}

/// What was dropped or degraded while building the survey.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct QualityReport {
    /// Rows without a resolvable cohort, per week.
    pub unresolved: BTreeMap<Week, usize>,
    /// Non-blank labels that could not be mapped to a rank, per week.
    pub unmapped: BTreeMap<Week, usize>,
    /// Legacy keys without a week marker.
    pub dropped_keys: usize,
    /// Legacy tables appended to a slice of the same week and cohort.
    pub merged_slices: usize,
}

/// An encoded survey.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Survey {
    pub catalog: QuestionCatalog,
    /// All the encoded rows of each week, before the split by cohort.
    pub weekly: BTreeMap<Week, WeeklyTable>,
    pub dataset: AggregatedDataset,
    pub quality: QualityReport,
}

impl SurveyBuilder {
    pub fn new(catalog: &QuestionCatalog, rule: &ProgrammeRule) -> SurveyBuilder {
        SurveyBuilder {
            _catalog: catalog.clone(),
            _rule: rule.clone(),
            _weeks: BTreeMap::new(),
            _legacy: BTreeMap::new(),
        }
    }

    /// Adds the rows of one week. Adding the same week again appends the rows.
    pub fn add_week(&mut self, week: Week, table: WeeklyTable) {
        debug!("add_week: week {}: {} rows", week, table.len());
        self._weeks.entry(week).or_default().rows.extend(table.rows);
    }

    /// Adds a table that is already restricted to one cohort, under a legacy
    /// `"{cohort}_Week{n}"` key.
    pub fn add_flat(&mut self, key: &str, table: WeeklyTable) {
        debug!("add_flat: key {:?}: {} rows", key, table.len());
        self._legacy.insert(key.to_string(), table);
    }

    fn encode_all(&self, table: &WeeklyTable) -> (WeeklyTable, usize) {
        let mut cur = table.clone();
        let mut unmapped: usize = 0;
        for (scale, columns) in self._catalog.columns_by_scale() {
            let (t, u) = encode(&cur, &columns, scale);
            cur = t;
            unmapped += u;
        }
        (cur, unmapped)
    }

    pub fn build(self) -> Result<Survey, AggregationError> {
        let mut quality = QualityReport::default();
        let mut weekly: BTreeMap<Week, WeeklyTable> = BTreeMap::new();
        let mut nested: NestedTables = BTreeMap::new();

        for (week, table) in self._weeks.iter() {
            let (encoded, unmapped) = self.encode_all(table);
            let partition = group(&encoded, &self._rule);
            info!(
                "build: week {}: {} rows, {} cohorts, {} unresolved, {} unmapped labels",
                week,
                encoded.len(),
                partition.cohorts.len(),
                partition.unresolved,
                unmapped
            );
            quality.unresolved.insert(*week, partition.unresolved);
            quality.unmapped.insert(*week, unmapped);
            nested.insert(*week, partition.cohorts);
            weekly.insert(*week, encoded);
        }

        if !self._legacy.is_empty() {
            let flat = flatten_to_nested(&self._legacy);
            quality.dropped_keys = flat.dropped;
            quality.merged_slices = flat.merged;
            for (week, cohorts) in flat.tables {
                for (cohort, table) in cohorts {
                    let (encoded, unmapped) = self.encode_all(&table);
                    *quality.unmapped.entry(week).or_default() += unmapped;
                    quality.unresolved.entry(week).or_default();
                    weekly
                        .entry(week)
                        .or_default()
                        .rows
                        .extend(encoded.rows.iter().cloned());
                    if merge_slice(&mut nested, week, cohort, encoded) {
                        quality.merged_slices += 1;
                    }
                }
            }
            if quality.merged_slices > 0 {
                warn!(
                    "build: {} legacy tables were merged into an existing cohort slice",
                    quality.merged_slices
                );
            }
        }

        if nested.is_empty() {
            warn!("build: no week was added");
        }

        Ok(Survey {
            catalog: self._catalog,
            weekly,
            dataset: AggregatedDataset::new(nested),
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: &str = "I want to gain practical knowledge";

    fn catalog() -> QuestionCatalog {
        let mut c = QuestionCatalog::new();
        c.add(Q, ScaleVariant::Agreement6, Some("motivation")).unwrap();
        c
    }

    fn row(id: &str, programme: Option<&str>, label: &str) -> RespondentRow {
        RespondentRow::new(id)
            .with_programmes(programme, None)
            .with_response(Q, Response::Label(label.to_string()))
    }

    #[test]
    fn builds_encoded_partitioned_survey() {
        let _ = env_logger::try_init();
        let mut b = SurveyBuilder::new(&catalog(), &ProgrammeRule::default());
        b.add_week(
            6,
            WeeklyTable::new(vec![
                row("a", Some("Architecture"), "Mostly agree"),
                row("b", None, "Completely agree"),
                row("c", Some("Design"), "whatever"),
            ]),
        );
        b.add_week(5, WeeklyTable::new(vec![row("a", Some("Architecture"), "Slightly agree")]));
        let s = b.build().unwrap();

        assert_eq!(s.dataset.weeks(), vec![5, 6]);
        assert_eq!(s.quality.unresolved[&6], 1);
        assert_eq!(s.quality.unmapped[&6], 1);
        // The unresolved row is kept for the time series.
        assert_eq!(s.weekly[&6].len(), 3);
        let arch = Cohort::new("architecture").unwrap();
        let t = s.dataset.slice(6, &arch).unwrap();
        assert_eq!(t.rows[0].response(Q), Some(&Response::Score(5)));
    }

    #[test]
    fn legacy_keys_are_nested() {
        let mut b = SurveyBuilder::new(&catalog(), &ProgrammeRule::default());
        b.add_flat(
            "cs_students_Week7",
            WeeklyTable::new(vec![row("a", None, "Completely agree")]),
        );
        b.add_flat("malformed_key", WeeklyTable::new(vec![row("b", None, "Mostly agree")]));
        let s = b.build().unwrap();
        assert_eq!(s.quality.dropped_keys, 1);
        assert_eq!(s.dataset.weeks(), vec![7]);
        let cs = Cohort::new("cs_students").unwrap();
        assert_eq!(
            s.dataset.slice(7, &cs).unwrap().rows[0].response(Q),
            Some(&Response::Score(6))
        );
        assert_eq!(s.weekly[&7].len(), 1);
    }

    #[test]
    fn legacy_keys_merge_into_week_slices() {
        let mut b = SurveyBuilder::new(&catalog(), &ProgrammeRule::default());
        b.add_week(
            5,
            WeeklyTable::new(vec![
                row("a", Some("CS"), "Mostly agree"),
                row("b", Some("Design"), "Mostly agree"),
            ]),
        );
        b.add_flat("cs_Week5", WeeklyTable::new(vec![row("c", None, "Completely agree")]));
        b.add_flat("CS_Week5", WeeklyTable::new(vec![row("d", None, "Slightly agree")]));
        b.add_flat("Design_Week6", WeeklyTable::new(vec![row("e", None, "Mostly agree")]));
        let s = b.build().unwrap();

        // "CS_Week5" and "cs_Week5" share a slice, which is then appended to the week table's.
        assert_eq!(s.quality.merged_slices, 2);
        let cs = Cohort::new("cs").unwrap();
        let slice = s.dataset.slice(5, &cs).unwrap();
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.rows[0].respondent, "a");
        assert_eq!(slice.rows[1].response(Q), Some(&Response::Score(4)));
        assert_eq!(slice.rows[2].response(Q), Some(&Response::Score(6)));
        let design = Cohort::new("design").unwrap();
        assert_eq!(s.dataset.slice(5, &design).unwrap().len(), 1);
        assert_eq!(s.dataset.slice(6, &design).unwrap().len(), 1);
        assert_eq!(s.weekly[&5].len(), 4);
        assert_eq!(s.dataset.weeks(), vec![5, 6]);
    }
}
