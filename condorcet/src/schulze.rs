// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The Schulze method, using strongest (widest) paths through the pairwise defeats.

use crate::ballot_metadata::CandidateIndex;
use crate::edge_weight::{EdgeWeightVariant, Strength};
use crate::pairwise::PairwiseMatrix;
use crate::rank_result::RankResult;

/// paths[i][j] is the strength of the strongest path from i to j,
/// the strength of a path being that of its weakest link.
pub fn strongest_paths(matrix:&PairwiseMatrix,variant:EdgeWeightVariant) -> Vec<Vec<Strength>> {
    let n = matrix.num_candidates();
    let mut paths : Vec<Vec<Strength>> = (0..n).map(|i|(0..n).map(|j|{
        if i==j { Strength::None } else { variant.strength(matrix,CandidateIndex(i),CandidateIndex(j)) }
    }).collect()).collect();
    for k in 0..n {
        for i in 0..n {
            if i==k { continue; }
            let via_k = paths[i][k];
            if !via_k.is_link() { continue; }
            for j in 0..n {
                if j==i || j==k { continue; }
                let candidate = via_k.min(paths[k][j]);
                if candidate>paths[i][j] { paths[i][j]=candidate; }
            }
        }
    }
    paths
}

/// Repeatedly take the candidates that no remaining candidate beats (by strongest path) as the next rank.
pub fn rank_schulze(matrix:&PairwiseMatrix,variant:EdgeWeightVariant) -> RankResult {
    let paths = strongest_paths(matrix,variant);
    let beats = |i:usize,j:usize| paths[i][j]>paths[j][i];
    let mut remaining : Vec<usize> = (0..matrix.num_candidates()).collect();
    let mut ranks = vec![];
    while !remaining.is_empty() {
        let (mut group,rest) : (Vec<usize>,Vec<usize>) = remaining.iter().partition(|&&c|!remaining.iter().any(|&other|beats(other,c)));
        if group.is_empty() { // can't happen as beating is transitive, but never loop forever.
            group=rest;
            remaining=vec![];
        } else {
            remaining=rest;
        }
        ranks.push(group.into_iter().map(CandidateIndex).collect());
    }
    RankResult::new(ranks)
}
