// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Information about the contest, such as candidates.

use serde::{Serialize,Deserialize};
use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use crate::errors::CondorcetError;

/// a candidate, referred to by order of registration, 0 being first
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateIndex(pub usize);
// type alias really, don't want long display
impl fmt::Display for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// information about a candidate in the contest.
#[derive(Debug,Serialize,Deserialize,Clone,PartialEq,Eq)]
pub struct Candidate {
    pub name : String,
}

/// The registered candidates. Names are unique, and a candidate's index is its position in the list.
/// Fixed once constructed.
#[derive(Debug,Clone,Default,PartialEq,Eq,Serialize,Deserialize)]
#[serde(into = "Vec<String>")]
#[serde(try_from = "Vec<String>")]
pub struct Candidates {
    candidates : Vec<Candidate>,
}

impl Candidates {
    pub fn new<S:Into<String>,I:IntoIterator<Item=S>>(names:I) -> Result<Self,CondorcetError> {
        let candidates : Vec<Candidate> = names.into_iter().map(|n|Candidate{name:n.into().trim().to_string()}).collect();
        let mut seen = HashSet::new();
        for c in &candidates {
            if c.name.is_empty() { return Err(CondorcetError::Domain("A candidate needs a non-empty name".to_string())); }
            if !seen.insert(c.name.as_str()) { return Err(CondorcetError::Domain(format!("Candidate {} is registered twice",c.name))); }
        }
        Ok(Candidates{candidates})
    }
    pub fn len(&self) -> usize { self.candidates.len() }
    pub fn is_empty(&self) -> bool { self.candidates.is_empty() }
    pub fn candidate(&self,index:CandidateIndex) -> &Candidate { &self.candidates[index.0] }
    pub fn name(&self,index:CandidateIndex) -> &str { &self.candidates[index.0].name }
    pub fn is_registered(&self,index:CandidateIndex) -> bool { index.0<self.candidates.len() }
    /// find a candidate by exact name.
    pub fn find(&self,name:&str) -> Option<CandidateIndex> {
        self.candidates.iter().position(|c|c.name==name).map(CandidateIndex)
    }
    pub fn indices(&self) -> impl Iterator<Item=CandidateIndex> + use<> { (0..self.candidates.len()).map(CandidateIndex) }
}

impl From<Candidates> for Vec<String> {
    fn from(c: Candidates) -> Self { c.candidates.into_iter().map(|c|c.name).collect() }
}

impl TryFrom<Vec<String>> for Candidates {
    type Error = CondorcetError;
    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> { Candidates::new(names) }
}
