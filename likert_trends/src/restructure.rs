//! Conversion between legacy composite keys (`"{cohort}_Week{n}"`) and the nested
//! week -> cohort layout.

use log::{debug, info, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::config::*;

/// The marker separating the cohort from the week number in a composite key.
pub const WEEK_MARKER: &str = "Week";

pub type NestedTables = BTreeMap<Week, BTreeMap<Cohort, WeeklyTable>>;

/// Splits a composite key on the first occurrence of the week marker.
///
/// The separator before the marker is optional: `"archeng_students_Week7"` and
/// `"archeng_studentsWeek7"` both give `("archeng_students", 7)`.
pub fn parse_composite_key(key: &str) -> Option<(Cohort, Week)> {
    let idx = key.find(WEEK_MARKER)?;
    let (head, tail) = key.split_at(idx);
    let week: Week = tail[WEEK_MARKER.len()..].trim().parse().ok()?;
    let cohort_label = head.strip_suffix('_').unwrap_or(head);
    let cohort = Cohort::new(cohort_label)?;
    Some((cohort, week))
}

pub fn composite_key(cohort: &Cohort, week: Week) -> String {
    format!("{}_{}{}", cohort.name(), WEEK_MARKER, week)
}

/// The nested tables, with the number of keys that could not be understood.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Nested {
    pub tables: NestedTables,
    pub dropped: usize,
    /// Keys whose rows were appended to a slice already filled by another key.
    pub merged: usize,
}

/// Appends the rows of `table` to the (week, cohort) slice, creating it if needed.
///
/// An existing slice keeps the spelling of its cohort. Returns true if the rows were merged
/// into an existing slice.
pub fn merge_slice(
    tables: &mut NestedTables,
    week: Week,
    cohort: Cohort,
    table: WeeklyTable,
) -> bool {
    match tables.entry(week).or_default().entry(cohort) {
        Entry::Occupied(mut e) => {
            info!(
                "merge_slice: week {} cohort {:?}: appending {} rows to {}",
                week,
                e.key().name(),
                table.len(),
                e.get().len()
            );
            e.get_mut().rows.extend(table.rows);
            true
        }
        Entry::Vacant(e) => {
            e.insert(table);
            false
        }
    }
}

/// Nests composite-keyed tables by week then cohort.
///
/// Keys without a usable marker are dropped and counted. Keys that resolve to the same
/// (week, cohort) pair, such as `"CS_Week5"` and `"cs_Week5"`, share one slice.
pub fn flatten_to_nested(flat: &BTreeMap<String, WeeklyTable>) -> Nested {
    let mut res = Nested::default();
    for (key, table) in flat.iter() {
        let (cohort, week) = match parse_composite_key(key) {
            Some(x) => x,
            None => {
                debug!("flatten_to_nested: dropping key {:?}", key);
                res.dropped += 1;
                continue;
            }
        };
        if merge_slice(&mut res.tables, week, cohort, table.clone()) {
            res.merged += 1;
        }
    }
    if res.dropped > 0 {
        warn!(
            "flatten_to_nested: dropped {} of {} keys without a week marker",
            res.dropped,
            flat.len()
        );
    }
    res
}

/// The inverse of `flatten_to_nested`, for legacy exports.
pub fn nested_to_flat(nested: &NestedTables) -> BTreeMap<String, WeeklyTable> {
    nested
        .iter()
        .flat_map(|(week, cohorts)| {
            cohorts
                .iter()
                .map(move |(cohort, table)| (composite_key(cohort, *week), table.clone()))
        })
        .collect()
}
