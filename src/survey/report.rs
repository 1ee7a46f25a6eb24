// JSON and CSV renderings of the views.

use std::collections::BTreeMap;

use serde_json::json;
use serde_json::Map as JSMap;

use crate::survey::config_reader::SurveyConfig;
use crate::survey::io_common::{RawCell, RawTable};
use crate::survey::*;

fn point_to_json(p: &TrendPoint) -> JSValue {
    match p.summary {
        Some(Summary::Quartiles { median, q1, q3 }) => {
            json!({"week": p.week, "n": p.n, "median": median, "q1": q1, "q3": q3})
        }
        Some(Summary::MeanInterval {
            mean,
            std,
            half_width,
        }) => {
            json!({"week": p.week, "n": p.n, "mean": mean, "std": std, "halfWidth": half_width})
        }
        None => json!({"week": p.week, "n": p.n}),
    }
}

fn empty_point_keys(statistic: TrendStatistic) -> &'static [&'static str] {
    match statistic {
        TrendStatistic::Median => &["median", "q1", "q3"],
        TrendStatistic::Mean => &["mean", "std", "halfWidth"],
    }
}

pub fn trend_to_json(v: &TrendView) -> JSValue {
    let series: Vec<JSValue> = v
        .series
        .iter()
        .map(|s| {
            let points: Vec<JSValue> = s
                .points
                .iter()
                .map(|p| {
                    let mut js = point_to_json(p);
                    // Weeks without answers keep the same keys, with null values.
                    if p.summary.is_none() {
                        if let Some(obj) = js.as_object_mut() {
                            for k in empty_point_keys(v.statistic) {
                                obj.insert(k.to_string(), JSValue::Null);
                            }
                        }
                    }
                    js
                })
                .collect();
            json!({"cohort": s.cohort.name(), "points": points})
        })
        .collect();
    json!({
        "statistic": v.statistic.name(),
        "weeks": v.weeks,
        "series": series,
    })
}

pub fn distribution_to_json(v: &DistributionView) -> JSValue {
    let weeks: Vec<JSValue> = v
        .weeks
        .iter()
        .map(|w| {
            let cohorts: Vec<JSValue> = w
                .cohorts
                .iter()
                .map(|c| {
                    let shares: Vec<JSValue> = c
                        .shares
                        .iter()
                        .map(|s| json!({"rank": s.rank, "label": s.label, "percent": s.percent}))
                        .collect();
                    json!({
                        "cohort": c.cohort.name(),
                        "n": c.n,
                        "offset": c.diverging_offset(),
                        "shares": shares,
                    })
                })
                .collect();
            json!({"week": w.week, "cohorts": cohorts})
        })
        .collect();
    json!({"scale": v.scale.name(), "weeks": weeks})
}

pub fn time_series_to_json(ts: &TimeSeries) -> JSValue {
    let rank_counts: Vec<JSValue> = ts
        .rank_counts()
        .iter()
        .map(|(week, counts)| {
            let mut c: JSMap<String, JSValue> = JSMap::new();
            for (rank, count) in counts.iter() {
                c.insert(rank.to_string(), json!(count));
            }
            json!({"week": week, "counts": c})
        })
        .collect();
    json!({
        "weeks": ts.weeks,
        "respondents": ts.records.len(),
        "rankCounts": rank_counts,
    })
}

pub fn snapshot_to_json(group: &str, v: &SnapshotView) -> JSValue {
    let cohorts: Vec<&str> = v.cohorts.iter().map(|c| c.name()).collect();
    let ranges: Vec<JSValue> = v.ranges.iter().map(|(lo, hi)| json!([lo, hi])).collect();
    let matrices: Vec<JSValue> = v
        .matrices
        .iter()
        .map(|m| json!({"week": m.week, "cells": m.cells}))
        .collect();
    json!({
        "group": group,
        "statistic": v.statistic.name(),
        "questions": v.questions,
        "cohorts": cohorts,
        "ranges": ranges,
        "matrices": matrices,
    })
}

pub fn summary_report_to_json(group: &str, r: &SummaryReport) -> JSValue {
    let questions: Vec<JSValue> = r
        .views
        .iter()
        .map(|v| {
            let series: Vec<JSValue> = v
                .series
                .iter()
                .map(|s| {
                    let means: Vec<Option<f64>> =
                        s.points.iter().map(|p| p.summary.map(|x| x.center())).collect();
                    json!({"cohort": s.cohort.name(), "means": means})
                })
                .collect();
            json!({"question": v.question, "weeks": v.weeks, "series": series})
        })
        .collect();
    json!({
        "group": group,
        "valueRange": r.value_range.map(|(lo, hi)| json!([lo, hi])),
        "questions": questions,
    })
}

pub fn response_rates_to_json(t: &ResponseRateTable) -> JSValue {
    let rows: Vec<JSValue> = t
        .rows
        .iter()
        .map(|r| json!({"cohort": r.cohort.name(), "counts": r.counts, "total": r.total}))
        .collect();
    json!({
        "weeks": t.weeks,
        "rows": rows,
        "weekTotals": t.week_totals,
        "total": t.grand_total,
    })
}

fn counts_to_json(m: &BTreeMap<Week, usize>) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    for (week, count) in m.iter() {
        js.insert(week.to_string(), json!(count));
    }
    JSValue::Object(js)
}

pub fn quality_to_json(q: &QualityReport) -> JSValue {
    json!({
        "unresolvedRows": counts_to_json(&q.unresolved),
        "unmappedLabels": counts_to_json(&q.unmapped),
        "droppedKeys": q.dropped_keys,
        "mergedSlices": q.merged_slices,
    })
}

/// Collects the failures of single views, so that the other views are still produced.
struct ViewErrors {
    errors: Vec<JSValue>,
}

impl ViewErrors {
    fn check<T>(&mut self, view: &str, subject: &str, res: Result<T, AggregationError>) -> Option<T> {
        match res {
            Ok(x) => Some(x),
            Err(e) => {
                warn!("build_summary_js: {} view for {:?} failed: {}", view, subject, e);
                self.errors.push(json!({
                    "view": view,
                    "subject": subject,
                    "message": e.to_string(),
                }));
                None
            }
        }
    }
}

/// Assembles the JSON summary of a survey.
pub fn build_summary_js(config: &SurveyConfig, survey: &Survey) -> SurveyResult<JSValue> {
    let trend_statistic = config.trend_statistic()?;
    let snapshot_statistic = config.snapshot_statistic()?;
    let distribution_weeks = config.distribution_weeks();
    let mut errs = ViewErrors { errors: Vec::new() };

    let mut questions: Vec<JSValue> = Vec::new();
    for q in survey.catalog.questions().iter() {
        let trend = errs
            .check(
                "trend",
                &q.text,
                survey.trend(&q.text, &WeekSelection::All, trend_statistic),
            )
            .map(|v| trend_to_json(&v));
        let distribution = errs
            .check(
                "distribution",
                &q.text,
                survey.distribution(&q.text, &distribution_weeks),
            )
            .map(|v| distribution_to_json(&v));
        let time_series = errs
            .check("time series", &q.text, survey.time_series(&q.text))
            .map(|v| time_series_to_json(&v));
        questions.push(json!({
            "question": q.text,
            "scale": q.scale.name(),
            "group": q.group,
            "trend": trend,
            "distribution": distribution,
            "timeSeries": time_series,
        }));
    }

    let mut snapshots: Vec<JSValue> = Vec::new();
    let mut summaries: Vec<JSValue> = Vec::new();
    for (group, qs) in survey.catalog.groups() {
        if let Some(v) = errs.check(
            "snapshot",
            &group,
            survey.snapshot(&qs, &WeekSelection::All, snapshot_statistic),
        ) {
            snapshots.push(snapshot_to_json(&group, &v));
        }
        if let Some(r) = errs.check("summary", &group, survey.summary(&qs, &WeekSelection::All)) {
            summaries.push(summary_report_to_json(&group, &r));
        }
    }

    info!(
        "build_summary_js: {} questions, {} snapshots, {} failed views",
        questions.len(),
        snapshots.len(),
        errs.errors.len()
    );

    Ok(json!({
        "analysis": config.output_settings.analysis_name,
        "weeks": survey.dataset.weeks(),
        "questions": questions,
        "snapshots": snapshots,
        "summaries": summaries,
        "responseRates": response_rates_to_json(&survey.response_rates()),
        "quality": quality_to_json(&survey.quality),
        "errors": errs.errors,
    }))
}

/// The response rates as a sheet: one row per cohort, then a `Total` row.
pub fn response_rates_table(t: &ResponseRateTable) -> RawTable {
    let mut header: Vec<String> = vec!["Cohort".to_string()];
    header.extend(t.weeks.iter().map(|w| format!("Week {}", w)));
    header.push("Total".to_string());

    let number = |n: usize| RawCell::Text(n.to_string());
    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for r in t.rows.iter() {
        let mut line = vec![RawCell::Text(r.cohort.name().to_string())];
        line.extend(r.counts.iter().map(|c| number(*c)));
        line.push(number(r.total));
        rows.push(line);
    }
    let mut total = vec![RawCell::Text("Total".to_string())];
    total.extend(t.week_totals.iter().map(|c| number(*c)));
    total.push(number(t.grand_total));
    rows.push(total);
    RawTable { header, rows }
}

pub fn write_response_rates_csv(path: &str, t: &ResponseRateTable) -> SurveyResult<()> {
    io_csv::write_csv_table(path, &response_rates_table(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(summary: Option<Summary>) -> TrendPoint {
        TrendPoint {
            week: 5,
            n: 3,
            summary,
        }
    }

    #[test]
    fn missing_points_are_null() {
        let v = TrendView {
            question: "Q".to_string(),
            statistic: TrendStatistic::Mean,
            weeks: vec![5, 6],
            series: vec![TrendSeries {
                cohort: Cohort::new("Design").unwrap(),
                points: vec![
                    point(Some(Summary::MeanInterval {
                        mean: 4.0,
                        std: None,
                        half_width: None,
                    })),
                    TrendPoint {
                        week: 6,
                        n: 0,
                        summary: None,
                    },
                ],
            }],
        };
        let js = trend_to_json(&v);
        assert_eq!(js["statistic"], "mean");
        let p0 = &js["series"][0]["points"][0];
        assert_eq!(p0["mean"], 4.0);
        assert!(p0["halfWidth"].is_null());
        let p1 = &js["series"][0]["points"][1];
        assert_eq!(p1["n"], 0);
        assert!(p1.as_object().unwrap().contains_key("mean"));
        assert!(p1["mean"].is_null());
    }

    #[test]
    fn response_rates_sheet() {
        let t = ResponseRateTable {
            weeks: vec![5, 6],
            rows: vec![
                ResponseRateRow {
                    cohort: Cohort::new("Architecture").unwrap(),
                    counts: vec![3, 1],
                    total: 4,
                },
                ResponseRateRow {
                    cohort: Cohort::new("Design").unwrap(),
                    counts: vec![0, 2],
                    total: 2,
                },
            ],
            week_totals: vec![3, 3],
            grand_total: 6,
        };
        let sheet = response_rates_table(&t);
        assert_eq!(sheet.header, vec!["Cohort", "Week 5", "Week 6", "Total"]);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.cell(2, 0), &RawCell::Text("Total".to_string()));
        assert_eq!(sheet.cell(2, 3), &RawCell::Text("6".to_string()));
        assert_eq!(sheet.cell(1, 1), &RawCell::Text("0".to_string()));

        let js = response_rates_to_json(&t);
        assert_eq!(js["total"], 6);
        assert_eq!(js["rows"][1]["cohort"], "Design");
    }
}
