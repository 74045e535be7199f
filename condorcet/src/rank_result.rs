// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The outcome of a ranking method: an ordered list of groups of tied candidates.

use serde::{Deserialize,Serialize};
use std::fmt;
use crate::ballot_metadata::{CandidateIndex, Candidates};

#[derive(Clone,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct RankResult {
    /// ranks[0] are the winners. Candidates within a rank are in increasing index order.
    pub ranks : Vec<Vec<CandidateIndex>>,
    /// If the method produces one, a score for each rank.
    #[serde(skip_serializing_if = "Option::is_none",default)]
    pub scores : Option<Vec<i64>>,
}

impl RankResult {
    pub fn new(mut ranks:Vec<Vec<CandidateIndex>>) -> Self {
        for group in ranks.iter_mut() { group.sort(); }
        RankResult{ ranks, scores: None }
    }
    pub fn with_scores(ranks:Vec<Vec<CandidateIndex>>,scores:Vec<i64>) -> Self {
        RankResult{ scores: Some(scores), ..RankResult::new(ranks) }
    }

    /// The first rank. Empty if there are no candidates.
    pub fn winners(&self) -> &[CandidateIndex] { self.ranks.first().map(|v|v.as_slice()).unwrap_or(&[]) }
    /// The winner, if it is not a tie.
    pub fn winner(&self) -> Option<CandidateIndex> {
        match self.winners() { [w] => Some(*w), _ => None }
    }
    /// The loser, if it is not a tie.
    pub fn loser(&self) -> Option<CandidateIndex> {
        match self.ranks.last().map(|v|v.as_slice()) { Some([l]) if self.ranks.len()>1 => Some(*l), _ => None }
    }
    /// 1 based rank of a candidate.
    pub fn rank_of(&self,candidate:CandidateIndex) -> Option<usize> {
        self.ranks.iter().position(|g|g.contains(&candidate)).map(|p|p+1)
    }
    pub fn num_candidates(&self) -> usize { self.ranks.iter().map(|g|g.len()).sum() }

    /// Like "A > B = C", using candidate names.
    pub fn to_string_with(&self,candidates:&Candidates) -> String { format_rank_groups(&self.ranks,candidates) }
}

/// Uses candidate indices, like "0 > 1 = 2".
impl fmt::Display for RankResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i,group) in self.ranks.iter().enumerate() {
            if i>0 { write!(f," > ")?; }
            for (j,c) in group.iter().enumerate() {
                if j>0 { write!(f," = ")?; }
                write!(f,"{}",c)?;
            }
        }
        Ok(())
    }
}

/// Format rank groups as "A > B = C".
pub fn format_rank_groups(groups:&[Vec<CandidateIndex>],candidates:&Candidates) -> String {
    groups.iter().map(|g|g.iter().map(|c|candidates.name(*c)).collect::<Vec<_>>().join(" = ")).collect::<Vec<_>>().join(" > ")
}
