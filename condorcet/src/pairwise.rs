// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Pairwise majority tallies.

use std::collections::BTreeMap;
use serde::{Deserialize,Serialize};
use crate::ballot_metadata::{CandidateIndex, Candidates};
use crate::ballot_paper::{Vote, Weight};

/// The tally for an ordered pair (i,j) of candidates.
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,Serialize,Deserialize)]
pub struct PairwiseCell {
    /// weight of votes preferring i to j
    pub win : u64,
    /// weight of votes ranking i and j equally. Symmetric.
    pub null : u64,
}

/// An n by n matrix of pairwise tallies. The diagonal is unused.
#[derive(Clone,Debug,PartialEq,Eq,Serialize,Deserialize)]
pub struct PairwiseMatrix {
    num_candidates : usize,
    /// row major.
    cells : Vec<PairwiseCell>,
}

impl PairwiseMatrix {
    pub fn new(num_candidates:usize) -> Self {
        PairwiseMatrix{ num_candidates, cells: vec![PairwiseCell::default();num_candidates*num_candidates] }
    }

    /// Tally a sequence of votes with their effective weights. Pure, no caching.
    pub fn build<'a,I:IntoIterator<Item=(&'a Vote,Weight)>>(votes:I,num_candidates:usize,implicit_ranking:bool) -> Self {
        let mut res = PairwiseMatrix::new(num_candidates);
        for (vote,weight) in votes { res.add_vote(vote,weight,implicit_ranking); }
        res
    }

    /// Add one vote's contribution.
    /// With explicit ranking, a pair is only counted if the vote ranks both candidates.
    pub fn add_vote(&mut self,vote:&Vote,weight:Weight,implicit_ranking:bool) {
        let n = self.num_candidates;
        let weight = weight as u64;
        let ranks = vote.ranks(n,implicit_ranking);
        for i in 0..n {
            let Some(rank_i) = ranks[i] else { continue };
            for j in i+1..n {
                let Some(rank_j) = ranks[j] else { continue };
                if rank_i<rank_j { self.cells[i*n+j].win+=weight; }
                else if rank_j<rank_i { self.cells[j*n+i].win+=weight; }
                else {
                    self.cells[i*n+j].null+=weight;
                    self.cells[j*n+i].null+=weight;
                }
            }
        }
    }

    pub fn num_candidates(&self) -> usize { self.num_candidates }
    pub fn cell(&self,i:CandidateIndex,j:CandidateIndex) -> PairwiseCell { self.cells[i.0*self.num_candidates+j.0] }
    /// weight of votes preferring i to j
    pub fn win(&self,i:CandidateIndex,j:CandidateIndex) -> u64 { self.cell(i,j).win }
    /// weight of votes preferring j to i
    pub fn lose(&self,i:CandidateIndex,j:CandidateIndex) -> u64 { self.cell(j,i).win }
    pub fn null(&self,i:CandidateIndex,j:CandidateIndex) -> u64 { self.cell(i,j).null }
    pub fn candidates(&self) -> impl Iterator<Item=CandidateIndex> + use<> { (0..self.num_candidates).map(CandidateIndex) }

    /// true iff a strict majority of those expressing a preference prefer i to j.
    pub fn beats(&self,i:CandidateIndex,j:CandidateIndex) -> bool { self.win(i,j)>self.lose(i,j) }

    /// The candidate who beats every other candidate, if any.
    pub fn condorcet_winner(&self) -> Option<CandidateIndex> {
        if self.num_candidates<2 { return None; }
        self.candidates().find(|&i|self.candidates().all(|j|i==j || self.beats(i,j)))
    }

    /// The candidate who loses to every other candidate, if any.
    pub fn condorcet_loser(&self) -> Option<CandidateIndex> {
        if self.num_candidates<2 { return None; }
        self.candidates().find(|&i|self.candidates().all(|j|i==j || self.beats(j,i)))
    }

    /// The matrix keyed by candidate names, suitable for export.
    pub fn explicit(&self,candidates:&Candidates) -> BTreeMap<String,ExplicitPairwise> {
        let mut res = BTreeMap::new();
        for i in self.candidates() {
            let mut entry = ExplicitPairwise::default();
            for j in self.candidates() {
                if i==j { continue; }
                let name = candidates.name(j).to_string();
                entry.win.insert(name.clone(),self.win(i,j));
                entry.null.insert(name.clone(),self.null(i,j));
                entry.lose.insert(name,self.lose(i,j));
            }
            res.insert(candidates.name(i).to_string(),entry);
        }
        res
    }
}

/// One candidate's row of a pairwise matrix, by opponent name.
#[derive(Clone,Debug,Default,PartialEq,Eq,Serialize,Deserialize)]
pub struct ExplicitPairwise {
    pub win : BTreeMap<String,u64>,
    pub null : BTreeMap<String,u64>,
    pub lose : BTreeMap<String,u64>,
}
