//! Assignment of respondents to education cohorts.

use log::{debug, info};
use std::collections::BTreeMap;

use crate::config::*;

/// The value of the current programme field for respondents who have not yet moved on
/// to the next phase.
pub const DEFAULT_EARLIER_PHASE_SENTINEL: &str = "I am still on my bachelor's";

/// How the programme fields of a row resolve to a cohort.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProgrammeRule {
    /// When the current programme equals this value (ignoring case and spacing),
    /// the prior programme is used instead.
    pub earlier_phase_sentinel: String,
}

impl Default for ProgrammeRule {
    fn default() -> Self {
        ProgrammeRule {
            earlier_phase_sentinel: DEFAULT_EARLIER_PHASE_SENTINEL.to_string(),
        }
    }
}

impl ProgrammeRule {
    fn is_sentinel(&self, label: &str) -> bool {
        normalize_whitespace(label).to_lowercase()
            == normalize_whitespace(&self.earlier_phase_sentinel).to_lowercase()
    }
}

/// Resolves the cohort of a row, or None if the programme fields do not allow it.
pub fn classify(row: &RespondentRow, rule: &ProgrammeRule) -> Option<Cohort> {
    let current = row.current_programme.as_deref().unwrap_or("");
    if rule.is_sentinel(current) {
        Cohort::new(row.prior_programme.as_deref().unwrap_or(""))
    } else {
        Cohort::new(current)
    }
}

/// The result of splitting a table by cohort.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CohortPartition {
    pub cohorts: BTreeMap<Cohort, WeeklyTable>,
    /// Rows that could not be assigned to any cohort. They are left out of every cohort.
    pub unresolved: usize,
}

/// Splits a table by cohort. The rows keep their relative order inside each cohort.
pub fn group(table: &WeeklyTable, rule: &ProgrammeRule) -> CohortPartition {
    let mut res = CohortPartition::default();
    for row in table.rows.iter() {
        match classify(row, rule) {
            Some(cohort) => {
                res.cohorts.entry(cohort).or_default().rows.push(row.clone());
            }
            None => {
                debug!(
                    "group: respondent {}: no cohort for current {:?} prior {:?}",
                    row.respondent, row.current_programme, row.prior_programme
                );
                res.unresolved += 1;
            }
        }
    }
    if res.unresolved > 0 {
        info!(
            "group: {} of {} rows excluded without a resolvable programme",
            res.unresolved,
            table.len()
        );
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, current: Option<&str>, prior: Option<&str>) -> RespondentRow {
        RespondentRow::new(id).with_programmes(current, prior)
    }

    #[test]
    fn current_programme_is_used_verbatim() {
        let r = row("a", Some("Architecture"), Some("Civil engineering"));
        let c = classify(&r, &ProgrammeRule::default()).unwrap();
        assert_eq!(c.name(), "Architecture");
    }

    #[test]
    fn earlier_phase_falls_back_to_prior_programme() {
        let r = row("a", Some("  i am still on my BACHELOR'S "), Some("Civil engineering"));
        let c = classify(&r, &ProgrammeRule::default()).unwrap();
        assert_eq!(c.name(), "Civil engineering");
    }

    #[test]
    fn unresolved_rows() {
        let rule = ProgrammeRule::default();
        assert_eq!(classify(&row("a", None, None), &rule), None);
        assert_eq!(classify(&row("b", Some("  "), Some("Architecture")), &rule), None);
        assert_eq!(
            classify(&row("c", Some(DEFAULT_EARLIER_PHASE_SENTINEL), None), &rule),
            None
        );
    }

    #[test]
    fn partition_is_total_and_disjoint() {
        let table = WeeklyTable::new(vec![
            row("a", Some("Architecture"), None),
            row("b", Some("architecture "), None),
            row("c", Some(DEFAULT_EARLIER_PHASE_SENTINEL), Some("Design")),
            row("d", None, None),
            row("e", Some("Design"), None),
        ]);
        let p = group(&table, &ProgrammeRule::default());
        assert_eq!(p.unresolved, 1);
        assert_eq!(p.cohorts.len(), 2);
        let total: usize = p.cohorts.values().map(|t| t.len()).sum();
        assert_eq!(total + p.unresolved, table.len());

        let names: Vec<&str> = p.cohorts.keys().map(|c| c.name()).collect();
        // First spelling wins.
        assert_eq!(names, vec!["Architecture", "Design"]);
        let design = &p.cohorts[&Cohort::new("DESIGN").unwrap()];
        let ids: Vec<&str> = design.rows.iter().map(|r| r.respondent.as_str()).collect();
        assert_eq!(ids, vec!["c", "e"]);
    }

    #[test]
    fn custom_sentinel() {
        let rule = ProgrammeRule {
            earlier_phase_sentinel: "Not yet".to_string(),
        };
        let r = row("a", Some("not yet"), Some("Physics"));
        assert_eq!(classify(&r, &rule).map(|c| c.name().to_string()), Some("Physics".to_string()));
    }
}
