// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Per candidate statistics derived from a pairwise matrix, and ranking methods
//! (Copeland, Minimax, Dodgson) that just order candidates by one of them.

use serde::{Deserialize,Serialize};
use crate::ballot_metadata::CandidateIndex;
use crate::pairwise::PairwiseMatrix;
use crate::rank_result::RankResult;

/// How a candidate did against all its opponents.
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,Serialize,Deserialize)]
pub struct PairwiseStats {
    /// number of opponents beaten
    pub wins : usize,
    pub ties : usize,
    /// number of opponents lost to
    pub losses : usize,
    /// wins - losses
    pub balance : i64,
    /// sum over opponents lost to of the margin of loss
    pub sum_defeat_margin : u64,
    /// sum over opponents lost to of half the margin of loss, rounded up
    pub dodgson_quick : u64,
    /// the largest number of votes for an opponent in a pairwise loss
    pub worst_pairwise_defeat_winning : u64,
    /// the largest margin in a pairwise loss
    pub worst_pairwise_defeat_margin : u64,
    /// the largest number of votes for any opponent, whether or not it was a loss
    pub worst_pairwise_opposition : u64,
}

pub fn pairwise_stats(matrix:&PairwiseMatrix) -> Vec<PairwiseStats> {
    matrix.candidates().map(|i|{
        let mut stats = PairwiseStats::default();
        for j in matrix.candidates() {
            if i==j { continue; }
            let (won,lost) = (matrix.win(i,j),matrix.lose(i,j));
            if won>lost {
                stats.wins+=1;
                stats.balance+=1;
            } else if won==lost {
                stats.ties+=1;
            } else {
                stats.losses+=1;
                stats.balance-=1;
                stats.sum_defeat_margin+=lost-won;
                stats.dodgson_quick+=(lost-won).div_ceil(2);
                stats.worst_pairwise_defeat_winning=stats.worst_pairwise_defeat_winning.max(lost);
                stats.worst_pairwise_defeat_margin=stats.worst_pairwise_defeat_margin.max(lost-won);
            }
            stats.worst_pairwise_opposition=stats.worst_pairwise_opposition.max(lost);
        }
        stats
    }).collect()
}

/// Which statistic a method ranks by.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum AggregateField {
    Balance,
    SumDefeatMargin,
    DodgsonQuick,
    WorstPairwiseDefeatWinning,
    WorstPairwiseDefeatMargin,
    WorstPairwiseOpposition,
}

impl AggregateField {
    pub fn of(self,stats:&PairwiseStats) -> i64 {
        match self {
            AggregateField::Balance => stats.balance,
            AggregateField::SumDefeatMargin => stats.sum_defeat_margin as i64,
            AggregateField::DodgsonQuick => stats.dodgson_quick as i64,
            AggregateField::WorstPairwiseDefeatWinning => stats.worst_pairwise_defeat_winning as i64,
            AggregateField::WorstPairwiseDefeatMargin => stats.worst_pairwise_defeat_margin as i64,
            AggregateField::WorstPairwiseOpposition => stats.worst_pairwise_opposition as i64,
        }
    }
}

/// Whether the best candidates are the ones with the smallest or largest score.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum ExtremumPolicy {
    MinFirst,
    MaxFirst,
}

/// Repeatedly take all remaining candidates with the extremal score as the next rank.
pub fn rank_by_extremum(matrix:&PairwiseMatrix,field:AggregateField,policy:ExtremumPolicy) -> RankResult {
    let stats = pairwise_stats(matrix);
    let mut remaining : Vec<(CandidateIndex,i64)> = stats.iter().enumerate().map(|(i,s)|(CandidateIndex(i),field.of(s))).collect();
    let mut ranks = vec![];
    let mut scores = vec![];
    while !remaining.is_empty() {
        let scores_left = remaining.iter().map(|(_,score)|*score);
        let looking = match policy {
            ExtremumPolicy::MinFirst => scores_left.min(),
            ExtremumPolicy::MaxFirst => scores_left.max(),
        };
        let Some(looking) = looking else { break };
        let (group,rest) : (Vec<_>,Vec<_>) = remaining.into_iter().partition(|(_,score)|*score==looking);
        ranks.push(group.into_iter().map(|(c,_)|c).collect());
        scores.push(looking);
        remaining=rest;
    }
    RankResult::with_scores(ranks,scores)
}
