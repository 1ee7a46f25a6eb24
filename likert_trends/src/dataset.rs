use std::collections::BTreeSet;

use crate::config::*;
use crate::restructure::NestedTables;

/// The encoded survey, split by week then cohort.
///
/// Built once and only read afterwards.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AggregatedDataset {
    tables: NestedTables,
}

impl AggregatedDataset {
    pub fn new(tables: NestedTables) -> AggregatedDataset {
        AggregatedDataset { tables }
    }

    /// All the weeks, ascending.
    pub fn weeks(&self) -> Vec<Week> {
        self.tables.keys().cloned().collect()
    }

    pub fn slice(&self, week: Week, cohort: &Cohort) -> Option<&WeeklyTable> {
        self.tables.get(&week).and_then(|c| c.get(cohort))
    }

    /// The cohorts present in at least one of the given weeks, sorted.
    pub fn cohorts_in(&self, weeks: &[Week]) -> Vec<Cohort> {
        let cohorts: BTreeSet<&Cohort> = weeks
            .iter()
            .filter_map(|w| self.tables.get(w))
            .flat_map(|c| c.keys())
            .collect();
        cohorts.into_iter().cloned().collect()
    }

    pub fn cohorts(&self) -> Vec<Cohort> {
        self.cohorts_in(&self.weeks())
    }

    /// The weeks a view covers, ascending and without duplicates.
    pub fn resolve_weeks(&self, selection: &WeekSelection) -> Result<Vec<Week>, AggregationError> {
        if self.tables.is_empty() {
            return Err(AggregationError::EmptyDataset);
        }
        match selection {
            WeekSelection::All => Ok(self.weeks()),
            WeekSelection::Only(ws) if ws.is_empty() => Err(AggregationError::EmptySelection {
                what: "weeks".to_string(),
            }),
            WeekSelection::Only(ws) => {
                let requested: BTreeSet<Week> = ws.iter().cloned().collect();
                for w in requested.iter() {
                    if !self.tables.contains_key(w) {
                        return Err(AggregationError::WeekNotAvailable { week: *w });
                    }
                }
                Ok(requested.into_iter().collect())
            }
        }
    }

    /// The scores of a question in one slice.
    ///
    /// An absent slice or an absent answer contributes nothing. A raw label or a score outside
    /// of the scale means the slice was not encoded with this scale.
    pub fn scores(
        &self,
        week: Week,
        cohort: &Cohort,
        question: &str,
        scale: ScaleVariant,
    ) -> Result<Vec<u8>, AggregationError> {
        let table = match self.slice(week, cohort) {
            Some(t) => t,
            None => return Ok(Vec::new()),
        };
        let mut res: Vec<u8> = Vec::new();
        for row in table.rows.iter() {
            match row.response(question) {
                Some(Response::Score(s)) if scale.contains(*s) => res.push(*s),
                Some(Response::Score(s)) => {
                    return Err(AggregationError::ScoreOutOfRange {
                        question: question.to_string(),
                        week,
                        cohort: cohort.name().to_string(),
                        score: *s,
                    })
                }
                Some(Response::Label(_)) => {
                    return Err(AggregationError::UnencodedResponse {
                        question: question.to_string(),
                        week,
                        cohort: cohort.name().to_string(),
                        respondent: row.respondent.clone(),
                    })
                }
                Some(Response::Missing) | None => {}
            }
        }
        Ok(res)
    }
}
