// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! The Condorcet methods that can be used to rank candidates, and how to refer to them by name.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Serialize,Deserialize};
use crate::edge_weight::EdgeWeightVariant;
use crate::errors::CondorcetError;
use crate::pairwise::PairwiseMatrix;
use crate::pairwise_stats::{rank_by_extremum, AggregateField, ExtremumPolicy};
use crate::rank_result::RankResult;
use crate::ranked_pairs::rank_ranked_pairs;
use crate::schulze::rank_schulze;

/// The algorithm behind a method, with whatever parameters it needs.
/// Two methods with the same strategy always give the same result.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum Strategy {
    ExtremumAggregate{field:AggregateField,policy:ExtremumPolicy},
    Schulze(EdgeWeightVariant),
    RankedPairs(EdgeWeightVariant),
}

impl Strategy {
    /// `ranked_pairs_max_candidates` is only used by ranked pairs.
    pub fn rank(self,matrix:&PairwiseMatrix,ranked_pairs_max_candidates:Option<usize>) -> Result<RankResult,CondorcetError> {
        match self {
            Strategy::ExtremumAggregate { field, policy } => Ok(rank_by_extremum(matrix,field,policy)),
            Strategy::Schulze(variant) => Ok(rank_schulze(matrix,variant)),
            Strategy::RankedPairs(variant) => rank_ranked_pairs(matrix,variant,ranked_pairs_max_candidates),
        }
    }
}

#[derive(Copy,Clone,Debug,Default,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum Method {
    Copeland,
    MinimaxWinning,
    MinimaxMargin,
    MinimaxOpposition,
    DodgsonQuick,
    DodgsonTidemanApproximation,
    #[default]
    SchulzeWinning,
    SchulzeMargin,
    SchulzeRatio,
    RankedPairsWinning,
    RankedPairsMargin,
    RankedPairsRatio,
}

impl Method {
    pub const ALL : [Method;12] = [
        Method::Copeland,
        Method::MinimaxWinning,
        Method::MinimaxMargin,
        Method::MinimaxOpposition,
        Method::DodgsonQuick,
        Method::DodgsonTidemanApproximation,
        Method::SchulzeWinning,
        Method::SchulzeMargin,
        Method::SchulzeRatio,
        Method::RankedPairsWinning,
        Method::RankedPairsMargin,
        Method::RankedPairsRatio,
    ];

    pub fn strategy(self) -> Strategy {
        match self {
            Method::Copeland => Strategy::ExtremumAggregate { field: AggregateField::Balance, policy: ExtremumPolicy::MaxFirst },
            Method::MinimaxWinning => Strategy::ExtremumAggregate { field: AggregateField::WorstPairwiseDefeatWinning, policy: ExtremumPolicy::MinFirst },
            Method::MinimaxMargin => Strategy::ExtremumAggregate { field: AggregateField::WorstPairwiseDefeatMargin, policy: ExtremumPolicy::MinFirst },
            Method::MinimaxOpposition => Strategy::ExtremumAggregate { field: AggregateField::WorstPairwiseOpposition, policy: ExtremumPolicy::MinFirst },
            Method::DodgsonQuick => Strategy::ExtremumAggregate { field: AggregateField::DodgsonQuick, policy: ExtremumPolicy::MinFirst },
            Method::DodgsonTidemanApproximation => Strategy::ExtremumAggregate { field: AggregateField::SumDefeatMargin, policy: ExtremumPolicy::MinFirst },
            Method::SchulzeWinning => Strategy::Schulze(EdgeWeightVariant::Winning),
            Method::SchulzeMargin => Strategy::Schulze(EdgeWeightVariant::Margin),
            Method::SchulzeRatio => Strategy::Schulze(EdgeWeightVariant::Ratio),
            Method::RankedPairsWinning => Strategy::RankedPairs(EdgeWeightVariant::Winning),
            Method::RankedPairsMargin => Strategy::RankedPairs(EdgeWeightVariant::Margin),
            Method::RankedPairsRatio => Strategy::RankedPairs(EdgeWeightVariant::Ratio),
        }
    }

    /// Other names the method is known by. The first is the canonical name, as used by Display.
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Method::Copeland => &["Copeland"],
            Method::MinimaxWinning => &["Minimax Winning","Minimax","Simpson-Kramer","Simpson"],
            Method::MinimaxMargin => &["Minimax Margin"],
            Method::MinimaxOpposition => &["Minimax Opposition","Pairwise Opposition"],
            Method::DodgsonQuick => &["Dodgson Quick","Dodgson","DQ"],
            Method::DodgsonTidemanApproximation => &["Dodgson Tideman Approximation","Dodgson Tideman","Tideman Approximation"],
            Method::SchulzeWinning => &["Schulze Winning","Schulze","Beatpath","SSD","CSSD","Schwartz Sequential Dropping"],
            Method::SchulzeMargin => &["Schulze Margin"],
            Method::SchulzeRatio => &["Schulze Ratio"],
            Method::RankedPairsWinning => &["Ranked Pairs Winning","Tideman Winning","RP Winning"],
            Method::RankedPairsMargin => &["Ranked Pairs Margin","Tideman Margin","RP Margin","Ranked Pairs","Tideman"],
            Method::RankedPairsRatio => &["Ranked Pairs Ratio","Tideman Ratio","RP Ratio"],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Method::Copeland => "Most pairwise wins minus pairwise losses.",
            Method::MinimaxWinning => "Smallest number of votes for an opponent in the candidate's worst pairwise defeat.",
            Method::MinimaxMargin => "Smallest margin of the candidate's worst pairwise defeat.",
            Method::MinimaxOpposition => "Smallest number of votes for any opponent over the candidate, defeat or not.",
            Method::DodgsonQuick => "Smallest sum over the candidate's pairwise defeats of half the margin, rounded up.",
            Method::DodgsonTidemanApproximation => "Smallest sum of the margins of the candidate's pairwise defeats.",
            Method::SchulzeWinning => "Schulze beatpath method, with a defeat as strong as the number of votes for the winner.",
            Method::SchulzeMargin => "Schulze beatpath method, with a defeat as strong as its margin.",
            Method::SchulzeRatio => "Schulze beatpath method, with a defeat as strong as the ratio of votes for and against.",
            Method::RankedPairsWinning => "Tideman's ranked pairs, ordering defeats by the number of votes for the winner.",
            Method::RankedPairsMargin => "Tideman's ranked pairs, ordering defeats by margin.",
            Method::RankedPairsRatio => "Tideman's ranked pairs, ordering defeats by the ratio of votes for and against.",
        }
    }

    /// See [Strategy::rank]
    pub fn rank(self,matrix:&PairwiseMatrix,ranked_pairs_max_candidates:Option<usize>) -> Result<RankResult,CondorcetError> {
        self.strategy().rank(matrix,ranked_pairs_max_candidates)
    }
}

/// Ignore case, spaces, underscores and hyphens.
fn normalize_name(s:&str) -> String {
    s.chars().filter(|c|!matches!(c,' '|'_'|'-')).flat_map(|c|c.to_lowercase()).collect()
}

impl FromStr for Method {
    type Err = CondorcetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        Method::ALL.into_iter()
            .find(|m|m.names().iter().any(|name|normalize_name(name)==wanted))
            .ok_or_else(||CondorcetError::Domain(format!("No such method {}",s)))
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.names()[0])
    }
}
