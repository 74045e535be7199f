// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! How strong a pairwise defeat is, for methods that look at the defeats themselves (Schulze, Ranked Pairs).

use num::rational::Ratio;
use serde::{Deserialize,Serialize};
use std::fmt;
use crate::ballot_metadata::CandidateIndex;
use crate::pairwise::PairwiseMatrix;

/// The strength of a link between two candidates. Orders as None < Finite < Unbounded.
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub enum Strength {
    /// no link at all.
    None,
    /// always positive.
    Finite(Ratio<u64>),
    /// a ratio with nothing on the bottom.
    Unbounded,
}

impl Strength {
    pub fn of(value:u64) -> Self { if value==0 { Strength::None } else { Strength::Finite(Ratio::from_integer(value)) } }
    pub fn is_link(self) -> bool { self!=Strength::None }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::None => write!(f,"0"),
            Strength::Finite(r) => write!(f,"{}",r),
            Strength::Unbounded => write!(f,"inf"),
        }
    }
}

/// The ways of measuring how strongly i defeats j.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub enum EdgeWeightVariant {
    /// the votes for i over j, if that is more than those for j over i.
    Winning,
    /// votes for i over j minus votes for j over i, if positive.
    Margin,
    /// votes for i over j divided by votes for j over i.
    Ratio,
}

impl EdgeWeightVariant {
    pub fn strength(self,matrix:&PairwiseMatrix,i:CandidateIndex,j:CandidateIndex) -> Strength {
        let (won,lost) = (matrix.win(i,j),matrix.lose(i,j));
        match self {
            EdgeWeightVariant::Winning => if won>lost { Strength::of(won) } else { Strength::None },
            EdgeWeightVariant::Margin => if won>lost { Strength::of(won-lost) } else { Strength::None },
            EdgeWeightVariant::Ratio => {
                if won==0 { Strength::None }
                else if lost==0 { Strength::Unbounded }
                else { Strength::Finite(Ratio::new(won,lost)) }
            }
        }
    }

    /// Like strength, but zero unless i has a strict majority over j.
    /// Only differs from strength for Ratio, where a losing pair still has a positive ratio.
    pub fn majority_strength(self,matrix:&PairwiseMatrix,i:CandidateIndex,j:CandidateIndex) -> Strength {
        if matrix.beats(i,j) { self.strength(matrix,i,j) } else { Strength::None }
    }
}
