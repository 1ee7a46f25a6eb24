mod config;
mod dataset;
mod stats;

pub mod builder;
pub mod codec;
pub mod cohort;
pub mod manual;
pub mod restructure;

use log::{debug, info, warn};

use std::collections::{BTreeMap, HashSet};

pub use crate::builder::{QualityReport, Survey, SurveyBuilder};
pub use crate::cohort::ProgrammeRule;
pub use crate::config::*;
pub use crate::dataset::AggregatedDataset;

fn summarize(scores: &[u8], statistic: TrendStatistic) -> Option<Summary> {
    match statistic {
        TrendStatistic::Median => stats::quartiles(scores),
        TrendStatistic::Mean => stats::mean_interval(scores),
    }
}

fn central_value(scores: &[u8], statistic: TrendStatistic) -> Option<f64> {
    match statistic {
        TrendStatistic::Median => stats::median(scores),
        TrendStatistic::Mean => stats::mean(scores),
    }
}

/// The evolution of one question over the weeks, for every cohort.
///
/// Arguments:
/// * `question` the question, which must be part of the catalog
/// * `weeks` the weeks to cover. The weeks are always returned in ascending order.
/// * `statistic` median with quartiles, or mean with a 95% confidence half-width
///
/// A week in which a cohort has no answer gets a point without summary.
pub fn trend_view(
    dataset: &AggregatedDataset,
    catalog: &QuestionCatalog,
    question: &str,
    weeks: &WeekSelection,
    statistic: TrendStatistic,
) -> Result<TrendView, AggregationError> {
    let scale = catalog.scale_of(question)?;
    let weeks = dataset.resolve_weeks(weeks)?;
    let cohorts = dataset.cohorts_in(&weeks);
    debug!(
        "trend_view: {:?}: {} weeks, {} cohorts, statistic {}",
        question,
        weeks.len(),
        cohorts.len(),
        statistic.name()
    );

    let mut series: Vec<TrendSeries> = Vec::new();
    for cohort in cohorts {
        let mut points: Vec<TrendPoint> = Vec::new();
        for week in weeks.iter() {
            let scores = dataset.scores(*week, &cohort, question, scale)?;
            points.push(TrendPoint {
                week: *week,
                n: scores.len(),
                summary: summarize(&scores, statistic),
            });
        }
        series.push(TrendSeries { cohort, points });
    }

    Ok(TrendView {
        question: question.to_string(),
        statistic,
        weeks,
        series,
    })
}

fn rank_shares(scores: &[u8], scale: ScaleVariant) -> Vec<RankShare> {
    let n = scores.len();
    scale
        .ranks()
        .map(|rank| {
            let count = scores.iter().filter(|s| **s == rank).count();
            RankShare {
                rank,
                label: scale.labels()[(rank - 1) as usize],
                percent: if n == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / n as f64
                },
            }
        })
        .collect()
}

/// The share of each rank of the scale, per week and per cohort.
///
/// Every rank of the scale is listed, even if nobody chose it. The cohorts are the same for
/// every week: a cohort absent in a given week is listed with only zeros.
pub fn distribution_view(
    dataset: &AggregatedDataset,
    catalog: &QuestionCatalog,
    question: &str,
    weeks: &WeekSelection,
) -> Result<DistributionView, AggregationError> {
    let scale = catalog.scale_of(question)?;
    let weeks = dataset.resolve_weeks(weeks)?;
    let cohorts = dataset.cohorts_in(&weeks);
    debug!(
        "distribution_view: {:?}: weeks {:?}, {} cohorts",
        question,
        weeks,
        cohorts.len()
    );

    let mut res: Vec<WeekDistribution> = Vec::new();
    for week in weeks {
        let mut dists: Vec<CohortDistribution> = Vec::new();
        for cohort in cohorts.iter() {
            let scores = dataset.scores(week, cohort, question, scale)?;
            dists.push(CohortDistribution {
                cohort: cohort.clone(),
                n: scores.len(),
                shares: rank_shares(&scores, scale),
            });
        }
        res.push(WeekDistribution {
            week,
            cohorts: dists,
        });
    }
    Ok(DistributionView {
        question: question.to_string(),
        scale,
        weeks: res,
    })
}

impl CohortDistribution {
    /// Where the bar starts in a diverging layout centered on the middle of the scale:
    /// minus the share of the lower half (and half of the middle rank for odd scales).
    pub fn diverging_offset(&self) -> f64 {
        let k = self.shares.len();
        let lower: f64 = self.shares.iter().take(k / 2).map(|s| s.percent).sum();
        let middle = if k % 2 == 1 {
            self.shares[k / 2].percent / 2.0
        } else {
            0.0
        };
        -(lower + middle)
    }
}

/// A [question x cohort] matrix of a central value, per week.
///
/// The values are clipped to the rank range of each question. The columns include all the
/// cohorts of the dataset so that the matrices of different weeks line up.
pub fn snapshot_view(
    dataset: &AggregatedDataset,
    catalog: &QuestionCatalog,
    questions: &[String],
    weeks: &WeekSelection,
    statistic: TrendStatistic,
) -> Result<SnapshotView, AggregationError> {
    if questions.is_empty() {
        return Err(AggregationError::EmptySelection {
            what: "questions".to_string(),
        });
    }
    let scales: Vec<ScaleVariant> = questions
        .iter()
        .map(|q| catalog.scale_of(q))
        .collect::<Result<Vec<ScaleVariant>, AggregationError>>()?;
    let weeks = dataset.resolve_weeks(weeks)?;
    let cohorts = dataset.cohorts();

    let mut matrices: Vec<SnapshotMatrix> = Vec::new();
    for week in weeks {
        let mut cells: Vec<Vec<Option<f64>>> = Vec::new();
        for (question, scale) in questions.iter().zip(scales.iter()) {
            let mut row: Vec<Option<f64>> = Vec::new();
            for cohort in cohorts.iter() {
                let scores = dataset.scores(week, cohort, question, *scale)?;
                let value = central_value(&scores, statistic)
                    .map(|v| v.clamp(1.0, scale.num_ranks() as f64));
                row.push(value);
            }
            cells.push(row);
        }
        matrices.push(SnapshotMatrix { week, cells });
    }

    Ok(SnapshotView {
        questions: questions.to_vec(),
        cohorts,
        statistic,
        ranges: scales
            .iter()
            .map(|s| (1.0, s.num_ranks() as f64))
            .collect(),
        matrices,
    })
}

/// The mean trend of several questions, with the overall range of the means
/// to share one axis between them.
///
/// `value_range` spans the cohort means, not the raw scores: it is narrower than the
/// lowest and highest answers whenever a slice has more than one distinct score.
pub fn summary_report(
    dataset: &AggregatedDataset,
    catalog: &QuestionCatalog,
    questions: &[String],
    weeks: &WeekSelection,
) -> Result<SummaryReport, AggregationError> {
    if questions.is_empty() {
        return Err(AggregationError::EmptySelection {
            what: "questions".to_string(),
        });
    }
    let mut views: Vec<TrendView> = Vec::new();
    for q in questions.iter() {
        views.push(trend_view(dataset, catalog, q, weeks, TrendStatistic::Mean)?);
    }
    let means: Vec<f64> = views
        .iter()
        .flat_map(|v| v.series.iter())
        .flat_map(|s| s.points.iter())
        .filter_map(|p| p.summary.map(|s| s.center()))
        .collect();
    let value_range = means.iter().cloned().fold(None, |acc: Option<(f64, f64)>, m| {
        Some(match acc {
            None => (m, m),
            Some((lo, hi)) => (lo.min(m), hi.max(m)),
        })
    });
    Ok(SummaryReport { views, value_range })
}

/// The answers of every respondent to one question, week by week, regardless of cohort.
///
/// Only one submission per respondent and week is expected. If there are more, the first one
/// is kept.
pub fn time_series(
    weekly: &BTreeMap<Week, WeeklyTable>,
    catalog: &QuestionCatalog,
    question: &str,
) -> Result<TimeSeries, AggregationError> {
    let scale = catalog.scale_of(question)?;
    let weeks: Vec<Week> = weekly.keys().cloned().collect();
    let mut records: BTreeMap<String, Vec<Option<u8>>> = BTreeMap::new();

    for (idx, (week, table)) in weekly.iter().enumerate() {
        let mut seen: HashSet<&str> = HashSet::new();
        for row in table.rows.iter() {
            if !seen.insert(row.respondent.as_str()) {
                warn!(
                    "time_series: week {}: respondent {} answered more than once, keeping the first answer",
                    week, row.respondent
                );
                continue;
            }
            let score: Option<u8> = match row.response(question) {
                Some(Response::Score(s)) if scale.contains(*s) => Some(*s),
                Some(Response::Score(s)) => {
                    return Err(AggregationError::ScoreOutOfRange {
                        question: question.to_string(),
                        week: *week,
                        cohort: "".to_string(),
                        score: *s,
                    })
                }
                Some(Response::Label(_)) => {
                    return Err(AggregationError::UnencodedResponse {
                        question: question.to_string(),
                        week: *week,
                        cohort: "".to_string(),
                        respondent: row.respondent.clone(),
                    })
                }
                Some(Response::Missing) | None => None,
            };
            records
                .entry(row.respondent.clone())
                .or_insert_with(|| vec![None; weeks.len()])[idx] = score;
        }
    }

    Ok(TimeSeries {
        question: question.to_string(),
        scale,
        weeks,
        records: records
            .into_iter()
            .map(|(respondent, scores)| TimeSeriesRecord { respondent, scores })
            .collect(),
    })
}

impl TimeSeries {
    /// For each week, how many respondents chose each rank. Missing answers are not counted.
    pub fn rank_counts(&self) -> Vec<(Week, Vec<(u8, usize)>)> {
        self.weeks
            .iter()
            .enumerate()
            .map(|(idx, week)| {
                let counts = self
                    .scale
                    .ranks()
                    .map(|rank| {
                        let c = self
                            .records
                            .iter()
                            .filter(|r| r.scores[idx] == Some(rank))
                            .count();
                        (rank, c)
                    })
                    .collect();
                (*week, counts)
            })
            .collect()
    }
}

/// The number of distinct respondents per cohort and week, with totals.
pub fn response_rates(dataset: &AggregatedDataset) -> ResponseRateTable {
    let weeks = dataset.weeks();
    let cohorts = dataset.cohorts();
    let mut rows: Vec<ResponseRateRow> = Vec::new();
    for cohort in cohorts {
        let counts: Vec<usize> = weeks
            .iter()
            .map(|w| {
                dataset
                    .slice(*w, &cohort)
                    .map(|t| {
                        t.rows
                            .iter()
                            .map(|r| r.respondent.as_str())
                            .collect::<HashSet<&str>>()
                            .len()
                    })
                    .unwrap_or(0)
            })
            .collect();
        let total = counts.iter().sum();
        rows.push(ResponseRateRow {
            cohort,
            counts,
            total,
        });
    }
    let week_totals: Vec<usize> = (0..weeks.len())
        .map(|idx| rows.iter().map(|r| r.counts[idx]).sum())
        .collect();
    let grand_total = week_totals.iter().sum();
    info!(
        "response_rates: {} respondents over {} weeks and {} cohorts",
        grand_total,
        weeks.len(),
        rows.len()
    );
    ResponseRateTable {
        weeks,
        rows,
        week_totals,
        grand_total,
    }
}

impl Survey {
    pub fn trend(
        &self,
        question: &str,
        weeks: &WeekSelection,
        statistic: TrendStatistic,
    ) -> Result<TrendView, AggregationError> {
        trend_view(&self.dataset, &self.catalog, question, weeks, statistic)
    }

    pub fn distribution(
        &self,
        question: &str,
        weeks: &WeekSelection,
    ) -> Result<DistributionView, AggregationError> {
        distribution_view(&self.dataset, &self.catalog, question, weeks)
    }

    pub fn snapshot(
        &self,
        questions: &[String],
        weeks: &WeekSelection,
        statistic: TrendStatistic,
    ) -> Result<SnapshotView, AggregationError> {
        snapshot_view(&self.dataset, &self.catalog, questions, weeks, statistic)
    }

    pub fn summary(
        &self,
        questions: &[String],
        weeks: &WeekSelection,
    ) -> Result<SummaryReport, AggregationError> {
        summary_report(&self.dataset, &self.catalog, questions, weeks)
    }

    pub fn time_series(&self, question: &str) -> Result<TimeSeries, AggregationError> {
        time_series(&self.weekly, &self.catalog, question)
    }

    pub fn response_rates(&self) -> ResponseRateTable {
        response_rates(&self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIDENT: &str = "I felt confident in working with the methodology today";
    const UNCERTAIN: &str = "How much uncertainty did you encounter in the Agile methodology from today?";

    fn catalog() -> QuestionCatalog {
        let mut c = QuestionCatalog::new();
        c.add(CONFIDENT, ScaleVariant::Agreement6, Some("motivation"))
            .unwrap();
        c.add(UNCERTAIN, ScaleVariant::Magnitude7, Some("uncertainty"))
            .unwrap();
        c
    }

    fn slice(cohort: &str, scores: &[Option<u8>]) -> (Cohort, WeeklyTable) {
        let rows = scores
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                let r = RespondentRow::new(&format!("{}-{}", cohort, idx));
                match s {
                    Some(v) => r.with_response(CONFIDENT, Response::Score(*v)),
                    None => r.with_response(CONFIDENT, Response::Missing),
                }
            })
            .collect();
        (Cohort::new(cohort).unwrap(), WeeklyTable::new(rows))
    }

    fn dataset(slices: Vec<(Week, (Cohort, WeeklyTable))>) -> AggregatedDataset {
        let mut nested: BTreeMap<Week, BTreeMap<Cohort, WeeklyTable>> = BTreeMap::new();
        for (week, (cohort, table)) in slices {
            nested.entry(week).or_default().insert(cohort, table);
        }
        AggregatedDataset::new(nested)
    }

    fn week5() -> AggregatedDataset {
        dataset(vec![
            (5, slice("Architecture", &[Some(4), Some(4), Some(5)])),
            (5, slice("Other", &[None, None])),
        ])
    }

    #[test]
    fn trend_median_with_missing_cohort() {
        let _ = env_logger::try_init();
        let v = trend_view(
            &week5(),
            &catalog(),
            CONFIDENT,
            &WeekSelection::All,
            TrendStatistic::Median,
        )
        .unwrap();
        assert_eq!(v.weeks, vec![5]);
        assert_eq!(v.series.len(), 2);
        assert_eq!(v.series[0].cohort.name(), "Architecture");
        assert_eq!(
            v.series[0].points[0].summary,
            Some(Summary::Quartiles {
                median: 4.0,
                q1: 4.0,
                q3: 5.0
            })
        );
        assert_eq!(v.series[1].cohort.name(), "Other");
        assert_eq!(v.series[1].points[0].n, 0);
        assert_eq!(v.series[1].points[0].summary, None);
    }

    #[test]
    fn trend_orders_weeks_and_cohorts() {
        let ds = dataset(vec![
            (9, slice("design", &[Some(2)])),
            (5, slice("Architecture", &[Some(3)])),
            (7, slice("Civil", &[Some(6), Some(1)])),
        ]);
        let v = trend_view(
            &ds,
            &catalog(),
            CONFIDENT,
            &WeekSelection::Only(vec![9, 5, 7, 5]),
            TrendStatistic::Mean,
        )
        .unwrap();
        assert_eq!(v.weeks, vec![5, 7, 9]);
        let names: Vec<&str> = v.series.iter().map(|s| s.cohort.name()).collect();
        assert_eq!(names, vec!["Architecture", "Civil", "design"]);
        // Civil only answered in week 7.
        let civil = &v.series[1];
        assert_eq!(civil.points[0].summary, None);
        assert_eq!(civil.points[2].summary, None);
        match civil.points[1].summary {
            Some(Summary::MeanInterval {
                mean,
                half_width: Some(hw),
                ..
            }) => {
                assert_eq!(mean, 3.5);
                let std = (12.5f64).sqrt();
                assert!((hw - 1.96 * std / 2f64.sqrt()).abs() < 1e-9);
            }
            ref x => panic!("unexpected summary {:?}", x),
        }
    }

    #[test]
    fn structural_errors() {
        let ds = week5();
        assert_eq!(
            trend_view(&ds, &catalog(), "Unknown", &WeekSelection::All, TrendStatistic::Median),
            Err(AggregationError::UnknownQuestion {
                question: "Unknown".to_string()
            })
        );
        assert_eq!(
            distribution_view(&ds, &catalog(), CONFIDENT, &WeekSelection::Only(vec![5, 6])),
            Err(AggregationError::WeekNotAvailable { week: 6 })
        );
        assert_eq!(
            distribution_view(
                &AggregatedDataset::default(),
                &catalog(),
                CONFIDENT,
                &WeekSelection::All
            ),
            Err(AggregationError::EmptyDataset)
        );
        assert_eq!(
            snapshot_view(&ds, &catalog(), &[], &WeekSelection::All, TrendStatistic::Median),
            Err(AggregationError::EmptySelection {
                what: "questions".to_string()
            })
        );
    }

    #[test]
    fn raw_labels_are_structural_errors() {
        let mut nested = BTreeMap::new();
        let mut cohorts = BTreeMap::new();
        cohorts.insert(
            Cohort::new("Architecture").unwrap(),
            WeeklyTable::new(vec![RespondentRow::new("x")
                .with_response(CONFIDENT, Response::Label("Mostly agree".to_string()))]),
        );
        nested.insert(5, cohorts);
        let ds = AggregatedDataset::new(nested);
        match trend_view(&ds, &catalog(), CONFIDENT, &WeekSelection::All, TrendStatistic::Median) {
            Err(AggregationError::UnencodedResponse {
                week, respondent, ..
            }) => {
                assert_eq!(week, 5);
                assert_eq!(respondent, "x");
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn distribution_covers_every_rank() {
        let d = distribution_view(&week5(), &catalog(), CONFIDENT, &WeekSelection::All).unwrap();
        assert_eq!(d.scale, ScaleVariant::Agreement6);
        let w = &d.weeks[0];
        let arch = &w.cohorts[0];
        assert_eq!(arch.n, 3);
        assert_eq!(arch.shares.len(), 6);
        let total: f64 = arch.shares.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert!((arch.shares[3].percent - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(arch.shares[0].percent, 0.0);
        assert_eq!(arch.shares[5].label, "Completely agree");

        let other = &w.cohorts[1];
        assert_eq!(other.n, 0);
        assert!(other.shares.iter().all(|s| s.percent == 0.0));
    }

    #[test]
    fn distribution_lists_cohorts_absent_from_a_week() {
        let ds = dataset(vec![
            (5, slice("Architecture", &[Some(1)])),
            (6, slice("Design", &[Some(2)])),
        ]);
        let d = distribution_view(&ds, &catalog(), CONFIDENT, &WeekSelection::All).unwrap();
        for w in d.weeks.iter() {
            assert_eq!(w.cohorts.len(), 2);
        }
        assert_eq!(d.weeks[0].cohorts[1].n, 0);
    }

    #[test]
    fn diverging_offsets() {
        let d = distribution_view(&week5(), &catalog(), CONFIDENT, &WeekSelection::All).unwrap();
        let arch = &d.weeks[0].cohorts[0];
        // 6 ranks: only the 3 lower ones count, and all answers are 4 or 5.
        assert_eq!(arch.diverging_offset(), 0.0);

        let seven = CohortDistribution {
            cohort: Cohort::new("A").unwrap(),
            n: 2,
            shares: rank_shares(&[1, 4], ScaleVariant::Magnitude7),
        };
        assert_eq!(seven.diverging_offset(), -75.0);
    }

    #[test]
    fn snapshot_matrix() {
        let ds = dataset(vec![
            (5, slice("Architecture", &[Some(4), Some(4), Some(5)])),
            (6, slice("Design", &[Some(2), Some(3)])),
        ]);
        let questions = vec![CONFIDENT.to_string(), UNCERTAIN.to_string()];
        let s = snapshot_view(
            &ds,
            &catalog(),
            &questions,
            &WeekSelection::All,
            TrendStatistic::Median,
        )
        .unwrap();
        assert_eq!(s.cohorts.len(), 2);
        assert_eq!(s.ranges, vec![(1.0, 6.0), (1.0, 7.0)]);
        assert_eq!(s.matrices.len(), 2);
        assert_eq!(s.matrices[0].cells[0], vec![Some(4.0), None]);
        assert_eq!(s.matrices[1].cells[0], vec![None, Some(2.5)]);
        // Nobody answered the uncertainty question.
        assert_eq!(s.matrices[0].cells[1], vec![None, None]);
    }

    #[test]
    fn summary_range() {
        let ds = dataset(vec![
            (5, slice("Architecture", &[Some(4), Some(4), Some(5)])),
            (6, slice("Architecture", &[Some(2), Some(3)])),
        ]);
        let r = summary_report(
            &ds,
            &catalog(),
            &[CONFIDENT.to_string(), UNCERTAIN.to_string()],
            &WeekSelection::All,
        )
        .unwrap();
        assert_eq!(r.views.len(), 2);
        // Means of the cohorts, so neither 2 nor 5.
        assert_eq!(r.value_range, Some((2.5, 13.0 / 3.0)));
    }

    #[test]
    fn time_series_across_weeks() {
        let mut weekly = BTreeMap::new();
        weekly.insert(
            5,
            WeeklyTable::new(vec![
                RespondentRow::new("b").with_response(CONFIDENT, Response::Score(3)),
                RespondentRow::new("a").with_response(CONFIDENT, Response::Score(5)),
            ]),
        );
        weekly.insert(
            6,
            WeeklyTable::new(vec![
                RespondentRow::new("a").with_response(CONFIDENT, Response::Missing),
                RespondentRow::new("c").with_response(CONFIDENT, Response::Score(5)),
                RespondentRow::new("c").with_response(CONFIDENT, Response::Score(1)),
            ]),
        );
        let ts = time_series(&weekly, &catalog(), CONFIDENT).unwrap();
        assert_eq!(ts.weeks, vec![5, 6]);
        assert_eq!(
            ts.records,
            vec![
                TimeSeriesRecord {
                    respondent: "a".to_string(),
                    scores: vec![Some(5), None]
                },
                TimeSeriesRecord {
                    respondent: "b".to_string(),
                    scores: vec![Some(3), None]
                },
                TimeSeriesRecord {
                    respondent: "c".to_string(),
                    scores: vec![None, Some(5)]
                },
            ]
        );
        let counts = ts.rank_counts();
        assert_eq!(counts[0].0, 5);
        assert_eq!(counts[0].1[2], (3, 1));
        assert_eq!(counts[0].1[4], (5, 1));
        assert_eq!(counts[1].1.iter().map(|(_, c)| c).sum::<usize>(), 1);
    }

    #[test]
    fn response_rate_totals() {
        let ds = dataset(vec![
            (5, slice("Architecture", &[Some(4), Some(4), None])),
            (6, slice("Architecture", &[Some(2)])),
            (6, slice("Design", &[Some(2), Some(3)])),
        ]);
        let t = response_rates(&ds);
        assert_eq!(t.weeks, vec![5, 6]);
        assert_eq!(t.rows[0].counts, vec![3, 1]);
        assert_eq!(t.rows[0].total, 4);
        assert_eq!(t.rows[1].counts, vec![0, 2]);
        assert_eq!(t.week_totals, vec![3, 3]);
        assert_eq!(t.grand_total, 6);
    }
}
