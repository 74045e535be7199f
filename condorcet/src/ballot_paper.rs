// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! A ranked vote, as held by a vote store.
//! Parsing ballots from text is done elsewhere; these are already interpreted preferences.

use crate::ballot_metadata::{CandidateIndex, Candidates};
use crate::errors::CondorcetError;
use crate::rank_result::format_rank_groups;
use serde::{Deserialize,Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The multiplicity of a vote. Always at least 1.
pub type Weight = u32;

/// The identifier a vote store gives a vote. Assigned in increasing order, never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteId(pub usize);
// type alias really, don't want long display
impl fmt::Display for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for VoteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "V{}", self.0) }
}

/// Identity of a particular vote store, used for "already registered here" checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct StoreId(u64);

static NEXT_STORE_ID : AtomicU64 = AtomicU64::new(0);

impl StoreId {
    pub(crate) fn fresh() -> Self { StoreId(NEXT_STORE_ID.fetch_add(1,Ordering::Relaxed)) }
}

fn default_weight() -> Weight { 1 }
fn is_default_weight(w:&Weight) -> bool { *w==1 }

/// A vote. `ranking[0]` is the set of most preferred candidates, all tied with each other.
///
/// The stores a vote is registered in are remembered purely as lookup relations; they are
/// never serialized and do not take part in equality.
#[derive(Clone,Debug,Serialize,Deserialize)]
pub struct Vote {
    ranking : Vec<Vec<CandidateIndex>>,
    #[serde(default="default_weight",skip_serializing_if="is_default_weight")]
    weight : Weight,
    #[serde(default,skip_serializing_if="BTreeSet::is_empty")]
    tags : BTreeSet<String>,
    #[serde(skip)]
    links : BTreeSet<StoreId>,
}

impl PartialEq for Vote {
    fn eq(&self, other: &Self) -> bool {
        self.ranking==other.ranking && self.weight==other.weight && self.tags==other.tags
    }
}
impl Eq for Vote {}

impl Vote {
    /// Make a vote with weight 1 and no tags.
    /// Fails if a rank group is empty or a candidate appears more than once.
    pub fn new(ranking:Vec<Vec<CandidateIndex>>) -> Result<Self,CondorcetError> {
        let ranking = Self::checked_ranking(ranking)?;
        Ok(Vote{ ranking, weight: 1, tags: BTreeSet::new(), links: BTreeSet::new() })
    }

    /// A vote with a strict order, one candidate per rank.
    pub fn from_order(order:&[CandidateIndex]) -> Result<Self,CondorcetError> {
        Self::new(order.iter().map(|c|vec![*c]).collect())
    }

    pub fn with_weight(mut self,weight:Weight) -> Result<Self,CondorcetError> {
        self.set_weight(weight)?;
        Ok(self)
    }

    pub fn with_tags<S:Into<String>,I:IntoIterator<Item=S>>(mut self,tags:I) -> Self {
        self.add_tags(tags);
        self
    }

    fn checked_ranking(mut ranking:Vec<Vec<CandidateIndex>>) -> Result<Vec<Vec<CandidateIndex>>,CondorcetError> {
        let mut seen = HashSet::new();
        for group in ranking.iter_mut() {
            if group.is_empty() { return Err(CondorcetError::Domain("A rank can not be empty".to_string())); }
            for c in group.iter() {
                if !seen.insert(*c) { return Err(CondorcetError::Domain(format!("Candidate {} appears more than once in the ranking",c))); }
            }
            group.sort();
        }
        Ok(ranking)
    }

    pub fn ranking(&self) -> &[Vec<CandidateIndex>] { &self.ranking }
    pub fn weight(&self) -> Weight { self.weight }
    /// The weight the vote counts for. Weights are ignored (treated as 1) unless allowed.
    pub fn effective_weight(&self,weight_allowed:bool) -> Weight { if weight_allowed { self.weight } else { 1 } }
    pub fn tags(&self) -> &BTreeSet<String> { &self.tags }

    pub fn set_ranking(&mut self,ranking:Vec<Vec<CandidateIndex>>) -> Result<(),CondorcetError> {
        self.ranking = Self::checked_ranking(ranking)?;
        Ok(())
    }
    pub fn set_weight(&mut self,weight:Weight) -> Result<(),CondorcetError> {
        if weight==0 { return Err(CondorcetError::Domain("A vote weight must be at least 1".to_string())); }
        self.weight=weight;
        Ok(())
    }
    pub fn add_tags<S:Into<String>,I:IntoIterator<Item=S>>(&mut self,tags:I) {
        for tag in tags {
            let tag : String = tag.into();
            let tag = tag.trim();
            if !tag.is_empty() { self.tags.insert(tag.to_string()); }
        }
    }
    /// returns true if anything was removed.
    pub fn remove_tags<S:AsRef<str>,I:IntoIterator<Item=S>>(&mut self,tags:I) -> bool {
        let mut removed = false;
        for tag in tags { removed |= self.tags.remove(tag.as_ref().trim()); }
        removed
    }
    pub fn has_any_tag(&self,tags:&BTreeSet<String>) -> bool { tags.iter().any(|t|self.tags.contains(t)) }

    /// Every candidate the voter explicitly ranked, in preference order.
    pub fn ranked_candidates(&self) -> impl Iterator<Item=CandidateIndex> + '_ { self.ranking.iter().flatten().copied() }

    /// The rank group index of each of the first `num_candidates` candidates.
    /// With implicit ranking, candidates omitted from the vote are tied in a final group.
    /// Without it they have no rank.
    pub fn ranks(&self,num_candidates:usize,implicit_ranking:bool) -> Vec<Option<usize>> {
        let mut res = vec![None;num_candidates];
        for (rank,group) in self.ranking.iter().enumerate() {
            for c in group {
                if c.0<num_candidates { res[c.0]=Some(rank); }
            }
        }
        if implicit_ranking {
            let last = self.ranking.len();
            for r in res.iter_mut() { if r.is_none() { *r=Some(last); } }
        }
        res
    }

    pub fn is_linked_to(&self,store:StoreId) -> bool { self.links.contains(&store) }
    pub fn count_links(&self) -> usize { self.links.len() }
    pub(crate) fn link(&mut self,store:StoreId) { self.links.insert(store); }
    pub(crate) fn unlink(&mut self,store:StoreId) { self.links.remove(&store); }
    pub(crate) fn unlink_all(&mut self) { self.links.clear(); }

    /// Like "A > B = C", using candidate names.
    pub fn ranking_string(&self,candidates:&Candidates) -> String {
        format_rank_groups(&self.ranking,candidates)
    }
}

/// Restrict a set of votes to those having (or not having) at least one of a set of tags.
#[derive(Clone,Debug,PartialEq,Eq,Hash,Serialize,Deserialize)]
pub struct VoteFilter {
    tags : BTreeSet<String>,
    /// if true, accept votes with at least one of the tags. If false, accept votes with none of them.
    with : bool,
}

impl VoteFilter {
    fn new<S:Into<String>,I:IntoIterator<Item=S>>(tags:I,with:bool) -> Result<Self,CondorcetError> {
        let tags : BTreeSet<String> = tags.into_iter().map(|t|t.into().trim().to_string()).filter(|t|!t.is_empty()).collect();
        if tags.is_empty() { return Err(CondorcetError::Domain("A vote filter needs at least one tag".to_string())); }
        Ok(VoteFilter{tags,with})
    }
    /// Accept votes that have at least one of these tags
    pub fn with_tags<S:Into<String>,I:IntoIterator<Item=S>>(tags:I) -> Result<Self,CondorcetError> { Self::new(tags,true) }
    /// Accept votes that have none of these tags
    pub fn without_tags<S:Into<String>,I:IntoIterator<Item=S>>(tags:I) -> Result<Self,CondorcetError> { Self::new(tags,false) }
    pub fn tags(&self) -> &BTreeSet<String> { &self.tags }
    pub fn accepts(&self,vote:&Vote) -> bool { vote.has_any_tag(&self.tags)==self.with }
}

/// Convenience for filters that may be absent.
pub(crate) fn passes(filter:Option<&VoteFilter>,vote:&Vote) -> bool {
    filter.is_none_or(|f|f.accepts(vote))
}
