// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Loading elections from files, for the command line programs.

use std::fs::File;
use std::path::Path;
use anyhow::{anyhow, Context};
use serde::{Deserialize,Serialize};
use condorcet::ballot_metadata::{CandidateIndex, Candidates};
use condorcet::ballot_paper::{Vote, Weight};
use condorcet::election_data::{Election, ElectionConfig};

/// An election as stored in a JSON file. Candidates in votes are referred to by name.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct ElectionFile {
    pub candidates : Vec<String>,
    #[serde(default)]
    pub config : ElectionConfig,
    pub votes : Vec<VoteRecord>,
}

/// Some identical votes.
#[derive(Debug,Serialize,Deserialize,Clone)]
pub struct VoteRecord {
    /// most preferred first. Candidates in the same inner list are tied.
    pub ranking : Vec<Vec<String>>,
    #[serde(default="default_one",skip_serializing_if="is_one")]
    pub weight : Weight,
    #[serde(default,skip_serializing_if="Vec::is_empty")]
    pub tags : Vec<String>,
    /// how many times this vote was cast.
    #[serde(default="default_one_usize",skip_serializing_if="is_one_usize")]
    pub count : usize,
}

fn default_one() -> Weight { 1 }
fn is_one(w:&Weight) -> bool { *w==1 }
fn default_one_usize() -> usize { 1 }
fn is_one_usize(n:&usize) -> bool { *n==1 }

impl ElectionFile {
    pub fn load(path:&Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(||format!("Could not open {}",path.display()))?;
        Ok(serde_json::from_reader(file).with_context(||format!("Could not parse {}",path.display()))?)
    }

    /// Make an election, using the configuration as modified by `adjust_config`.
    pub fn into_election(self,adjust_config:impl FnOnce(&mut ElectionConfig)) -> anyhow::Result<Election> {
        let candidates = Candidates::new(self.candidates)?;
        let mut config = self.config;
        adjust_config(&mut config);
        let mut election = Election::new(candidates,config);
        for (line,record) in self.votes.iter().enumerate() {
            let vote = record.to_vote(election.candidates()).with_context(||format!("Vote {}",line+1))?;
            for _ in 0..record.count { election.add_vote(&vote)?; }
        }
        Ok(election)
    }
}

impl VoteRecord {
    pub fn to_vote(&self,candidates:&Candidates) -> anyhow::Result<Vote> {
        let ranking = self.ranking.iter().map(|group|group.iter().map(|name|candidates.find(name).ok_or_else(||anyhow!("No candidate called {}",name))).collect::<anyhow::Result<Vec<CandidateIndex>>>()).collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Vote::new(ranking)?.with_weight(self.weight)?.with_tags(self.tags.iter().cloned()))
    }
}
