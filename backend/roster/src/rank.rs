//! # Ranking
//!
//! Orders a roster by one of the three score counters.
//!
//! - Highest score first
//! - Missing scores go below every real score, negatives included
//! - Ties keep their input order, no secondary key
//! - Ranks run 1..=N with no gaps, ties still get distinct ranks
use crate::{records::UserScoreRecord, view::ViewMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedEntry<'a> {
    pub rank: usize,
    pub record: &'a UserScoreRecord,
}

impl RankedEntry<'_> {
    pub fn score(&self, key: ViewMode) -> Option<i64> {
        key.score(&self.record.scores)
    }
}

pub fn rank(records: &[UserScoreRecord], key: ViewMode) -> Vec<RankedEntry<'_>> {
    let mut sorted: Vec<&UserScoreRecord> = records.iter().collect();

    // `None < Some(_)` so comparing b to a sends absent scores to the bottom.
    // `sort_by` is stable, which keeps equal scores in input order.
    sorted.sort_by(|a, b| key.score(&b.scores).cmp(&key.score(&a.scores)));

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, record)| RankedEntry {
            rank: index + 1,
            record,
        })
        .collect()
}
