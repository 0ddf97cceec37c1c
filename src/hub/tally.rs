//! Tally registry for single-vote-per-voter mode.
//!
//! Each voter may vote once. Accepted votes increment a per-score counter;
//! repeat voters are rejected and counters stay untouched.

use std::collections::{BTreeMap, HashSet};

use super::types::TallySnapshot;
use crate::error::VoteError;

/// Per-score counters plus the set of voters who have already voted.
#[derive(Debug, Default)]
pub struct Tally {
    counts: BTreeMap<String, u64>,
    voted: HashSet<String>,
}

impl Tally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a vote if this voter has not voted yet.
    ///
    /// Both fields must already be validated as non-empty.
    pub fn cast(&mut self, voter: &str, score: &str) -> Result<TallySnapshot, VoteError> {
        if self.voted.contains(voter) {
            return Err(VoteError::DuplicateVoter(voter.to_string()));
        }

        self.voted.insert(voter.to_string());
        *self.counts.entry(score.to_string()).or_insert(0) += 1;

        Ok(TallySnapshot {
            voter: voter.to_string(),
            score: score.to_string(),
            counts: self.counts.clone(),
        })
    }

    /// Current score -> count map.
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    /// Number of distinct voters so far.
    pub fn voter_count(&self) -> usize {
        self.voted.len()
    }
}
