//! Conversion between Likert labels and ranks.

use log::debug;

use crate::config::*;

/// Folds a label for comparison: spacing and case do not matter.
fn fold_label(raw: &str) -> String {
    normalize_whitespace(raw).to_lowercase()
}

/// The rank of a label in the scale, if the label belongs to the scale.
pub fn rank_of(label: &str, scale: ScaleVariant) -> Option<u8> {
    let folded = fold_label(label);
    scale
        .labels()
        .iter()
        .position(|l| fold_label(l) == folded)
        .map(|idx| (idx + 1) as u8)
}

/// The label of a rank. Only meant for legends and diagnostics.
pub fn decode(rank: u8, scale: ScaleVariant) -> Option<&'static str> {
    if !scale.contains(rank) {
        return None;
    }
    scale.labels().get((rank - 1) as usize).cloned()
}

/// Encodes a single response.
///
/// Unknown labels and scores outside of the scale become missing. Scores within the
/// scale are left untouched, so encoding is idempotent.
pub fn encode_response(response: &Response, scale: ScaleVariant) -> Response {
    match response {
        Response::Label(s) => match rank_of(s, scale) {
            Some(r) => Response::Score(r),
            None => Response::Missing,
        },
        Response::Score(r) if scale.contains(*r) => Response::Score(*r),
        Response::Score(_) => Response::Missing,
        Response::Missing => Response::Missing,
    }
}

/// Encodes the given columns of a table with a scale.
///
/// Returns a new table and the number of non-blank cells that could not be mapped.
/// The input table is not modified.
pub fn encode(table: &WeeklyTable, columns: &[String], scale: ScaleVariant) -> (WeeklyTable, usize) {
    let mut unmapped: usize = 0;
    let mut res = table.clone();
    for row in res.rows.iter_mut() {
        for col in columns.iter() {
            if let Some(cell) = row.responses.get_mut(col) {
                let encoded = encode_response(cell, scale);
                let is_blank = match cell {
                    Response::Label(s) => s.trim().is_empty(),
                    Response::Missing => true,
                    Response::Score(_) => false,
                };
                if encoded == Response::Missing && !is_blank {
                    debug!(
                        "encode: respondent {}: could not map {:?} for {:?} with scale {}",
                        row.respondent,
                        cell,
                        col,
                        scale.name()
                    );
                    unmapped += 1;
                }
                *cell = encoded;
            }
        }
    }
    (res, unmapped)
}
