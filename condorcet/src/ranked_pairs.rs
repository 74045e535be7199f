// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Ranked Pairs (Tideman). Defeats are locked in strongest first, skipping any that would make a cycle.

use std::cmp::Ordering;
use tracing::trace;
use crate::ballot_metadata::CandidateIndex;
use crate::edge_weight::{EdgeWeightVariant, Strength};
use crate::errors::CondorcetError;
use crate::pairwise::PairwiseMatrix;
use crate::rank_result::RankResult;

/// Above this many candidates, ranked pairs refuses to run unless configured otherwise.
pub const DEFAULT_MAX_CANDIDATES : usize = 40;

/// A pairwise defeat of `to` by `from`.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct RankedPair {
    pub from : CandidateIndex,
    pub to : CandidateIndex,
    pub strength : Strength,
    /// votes for `to` over `from`.
    pub opposition : u64,
}

impl RankedPair {
    /// Processing order. Stronger first; for equal strength, weaker opposition first; then by candidate index.
    pub fn priority(&self,other:&Self) -> Ordering {
        other.strength.cmp(&self.strength)
            .then(self.opposition.cmp(&other.opposition))
            .then(self.from.cmp(&other.from))
            .then(self.to.cmp(&other.to))
    }
}

/// Every strict majority with positive strength, in the order they are considered for locking.
pub fn sorted_pairs(matrix:&PairwiseMatrix,variant:EdgeWeightVariant) -> Vec<RankedPair> {
    let mut res = vec![];
    for from in matrix.candidates() {
        for to in matrix.candidates() {
            if from==to { continue; }
            let strength = variant.majority_strength(matrix,from,to);
            if strength.is_link() {
                res.push(RankedPair{ from, to, strength, opposition: matrix.lose(from,to) });
            }
        }
    }
    res.sort_by(|a,b|a.priority(b));
    res
}

/// The directed graph of locked in defeats. Always acyclic.
#[derive(Clone,Debug)]
pub struct LockInGraph {
    /// edges[i][j] iff i->j is locked in.
    edges : Vec<Vec<bool>>,
    locked : Vec<RankedPair>,
    skipped : Vec<RankedPair>,
}

impl LockInGraph {
    pub fn new(num_candidates:usize) -> Self {
        LockInGraph{ edges: vec![vec![false;num_candidates];num_candidates], locked: vec![], skipped: vec![] }
    }
    pub fn num_candidates(&self) -> usize { self.edges.len() }
    pub fn is_locked(&self,from:CandidateIndex,to:CandidateIndex) -> bool { self.edges[from.0][to.0] }
    pub fn locked(&self) -> &[RankedPair] { &self.locked }
    pub fn skipped(&self) -> &[RankedPair] { &self.skipped }

    /// true iff there is a (possibly empty) path of locked edges from `from` to `to`.
    pub fn has_path(&self,from:CandidateIndex,to:CandidateIndex) -> bool {
        let mut visited = vec![false;self.edges.len()];
        let mut stack = vec![from.0];
        while let Some(node) = stack.pop() {
            if node==to.0 { return true; }
            if visited[node] { continue; }
            visited[node]=true;
            stack.extend(self.edges[node].iter().enumerate().filter(|(next,locked)|**locked && !visited[*next]).map(|(next,_)|next));
        }
        false
    }

    /// Lock in the pair unless that would close a cycle. Returns whether it was locked.
    pub fn try_lock(&mut self,pair:RankedPair) -> bool {
        if self.has_path(pair.to,pair.from) {
            trace!(from=pair.from.0,to=pair.to.0,strength=%pair.strength,"Skipped pair as it would create a cycle");
            self.skipped.push(pair);
            false
        } else {
            trace!(from=pair.from.0,to=pair.to.0,strength=%pair.strength,"Locked pair");
            self.edges[pair.from.0][pair.to.0]=true;
            self.locked.push(pair);
            true
        }
    }

    /// Check by repeatedly removing nodes with no incoming edges.
    pub fn is_acyclic(&self) -> bool {
        let n = self.edges.len();
        let mut in_degree : Vec<usize> = (0..n).map(|j|(0..n).filter(|&i|self.edges[i][j]).count()).collect();
        let mut ready : Vec<usize> = (0..n).filter(|&j|in_degree[j]==0).collect();
        let mut removed = 0;
        while let Some(i) = ready.pop() {
            removed+=1;
            for j in 0..n {
                if self.edges[i][j] {
                    in_degree[j]-=1;
                    if in_degree[j]==0 { ready.push(j); }
                }
            }
        }
        removed==n
    }

    /// Topological layers: each rank is every remaining candidate with no locked defeat from a remaining candidate.
    pub fn ranking(&self) -> RankResult {
        let mut remaining : Vec<usize> = (0..self.edges.len()).collect();
        let mut ranks = vec![];
        while !remaining.is_empty() {
            let (mut group,rest) : (Vec<usize>,Vec<usize>) = remaining.iter().partition(|&&c|!remaining.iter().any(|&other|self.edges[other][c]));
            if group.is_empty() { // impossible for an acyclic graph.
                group=rest;
                remaining=vec![];
            } else {
                remaining=rest;
            }
            ranks.push(group.into_iter().map(CandidateIndex).collect());
        }
        RankResult::new(ranks)
    }
}

/// Lock in every pair from [sorted_pairs] that does not create a cycle.
pub fn lock_in(matrix:&PairwiseMatrix,variant:EdgeWeightVariant) -> LockInGraph {
    let mut graph = LockInGraph::new(matrix.num_candidates());
    for pair in sorted_pairs(matrix,variant) { graph.try_lock(pair); }
    graph
}

/// The ranked pairs ranking. Fails without doing any work if there are more than `max_candidates` candidates.
pub fn rank_ranked_pairs(matrix:&PairwiseMatrix,variant:EdgeWeightVariant,max_candidates:Option<usize>) -> Result<RankResult,CondorcetError> {
    if let Some(limit) = max_candidates {
        if matrix.num_candidates()>limit {
            return Err(CondorcetError::CapacityExceeded{ needed: matrix.num_candidates() as u64, limit: limit as u64 });
        }
    }
    Ok(lock_in(matrix,variant).ranking())
}
