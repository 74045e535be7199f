// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! An election: candidates, configuration and the votes cast, with cached tallies.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;
use serde::{Deserialize,Serialize};
use tracing::debug;
use crate::ballot_metadata::{CandidateIndex, Candidates};
use crate::ballot_paper::{Vote, VoteFilter, VoteId, Weight};
use crate::combinatorics::CombinatoricsGuard;
use crate::data_handler::ExternalDataHandler;
use crate::errors::CondorcetError;
use crate::methods::{Method, Strategy};
use crate::pairwise::{ExplicitPairwise, PairwiseMatrix};
use crate::rank_result::RankResult;
use crate::ranked_pairs;
use crate::vote_store::{VoteStore, DEFAULT_CACHE_SIZE, DEFAULT_MAX_CONTAINER_LENGTH};

/// Tuning and rules for an election. Missing fields take their defaults when deserializing.
#[derive(Clone,Debug,PartialEq,Eq,Serialize,Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// votes per container in the vote store.
    pub max_container_length : usize,
    /// votes read back from an external data handler kept in memory.
    pub cache_size : usize,
    /// Ranked pairs fails with more candidates than this. None means no limit.
    pub ranked_pairs_max_candidates : Option<usize>,
    /// use arbitrary precision arithmetic for combinatorics.
    pub use_big_integer : bool,
    /// candidates missing from a vote are tied last, rather than left out of comparisons.
    pub implicit_ranking : bool,
    /// if false, every vote counts as weight 1.
    pub vote_weight_allowed : bool,
    /// for committee (multiple winner) calculations.
    pub seats : usize,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        ElectionConfig {
            max_container_length: DEFAULT_MAX_CONTAINER_LENGTH,
            cache_size: DEFAULT_CACHE_SIZE,
            ranked_pairs_max_candidates: Some(ranked_pairs::DEFAULT_MAX_CANDIDATES),
            use_big_integer: true,
            implicit_ranking: true,
            vote_weight_allowed: false,
            seats: 100,
        }
    }
}

/// A pairwise matrix for some filter, and the rankings already computed from it.
#[derive(Clone,Debug)]
struct Tally {
    filter : Option<VoteFilter>,
    matrix : PairwiseMatrix,
    results : HashMap<Strategy,RankResult>,
}

#[derive(Debug)]
pub struct Election {
    candidates : Candidates,
    config : ElectionConfig,
    votes : VoteStore,
    guard : CombinatoricsGuard,
    /// invalidated by anything that could change it.
    tally : Option<Tally>,
}

impl Election {
    pub fn new(candidates:Candidates,config:ElectionConfig) -> Self {
        let votes = VoteStore::new(config.max_container_length,config.cache_size);
        let guard = CombinatoricsGuard::new(config.use_big_integer);
        Election{ candidates, config, votes, guard, tally: None }
    }

    pub fn candidates(&self) -> &Candidates { &self.candidates }
    pub fn config(&self) -> &ElectionConfig { &self.config }
    pub fn num_candidates(&self) -> usize { self.candidates.len() }
    pub fn vote_store(&self) -> &VoteStore { &self.votes }

    fn invalidate(&mut self) {
        if self.tally.take().is_some() { debug!("Invalidated cached pairwise matrix and rankings"); }
    }

    fn check_candidates(&self,vote:&Vote) -> Result<(),CondorcetError> {
        match vote.ranked_candidates().find(|c|!self.candidates.is_registered(*c)) {
            Some(c) => Err(CondorcetError::Domain(format!("Candidate {} is not registered",c))),
            None => Ok(()),
        }
    }

    /// Add a copy of a vote. The vote passed in is not itself registered.
    pub fn add_vote(&mut self,vote:&Vote) -> Result<VoteId,CondorcetError> {
        self.check_candidates(vote)?;
        self.invalidate();
        self.votes.insert(vote)
    }

    /// Add several votes, stopping at the first failure.
    pub fn add_votes<'a,I:IntoIterator<Item=&'a Vote>>(&mut self,votes:I) -> Result<Vec<VoteId>,CondorcetError> {
        votes.into_iter().map(|v|self.add_vote(v)).collect()
    }

    pub fn vote(&mut self,id:VoteId) -> Result<&Vote,CondorcetError> { self.votes.get(id) }

    pub fn remove_vote(&mut self,id:VoteId) -> Result<Vote,CondorcetError> {
        let vote = self.votes.remove(id)?;
        self.invalidate();
        Ok(vote)
    }

    /// Remove every vote accepted by the filter, returning them.
    pub fn remove_votes_by_tags(&mut self,filter:&VoteFilter) -> Result<Vec<Vote>,CondorcetError> {
        let ids = self.votes.ids(Some(filter))?;
        if !ids.is_empty() { self.invalidate(); }
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids { removed.push(self.votes.remove(id)?); }
        debug!(removed=removed.len(),"Removed votes by tag");
        Ok(removed)
    }

    pub fn remove_all_votes(&mut self) -> Result<(),CondorcetError> {
        self.invalidate();
        self.votes.remove_all()
    }

    fn modify_vote<F:FnOnce(&mut Vote)->Result<(),CondorcetError>>(&mut self,id:VoteId,f:F) -> Result<(),CondorcetError> {
        self.votes.modify(id,f)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_vote_ranking(&mut self,id:VoteId,ranking:Vec<Vec<CandidateIndex>>) -> Result<(),CondorcetError> {
        if let Some(c) = ranking.iter().flatten().find(|c|!self.candidates.is_registered(**c)) {
            return Err(CondorcetError::Domain(format!("Candidate {} is not registered",c)));
        }
        self.modify_vote(id,|v|v.set_ranking(ranking))
    }
    pub fn set_vote_weight(&mut self,id:VoteId,weight:Weight) -> Result<(),CondorcetError> {
        self.modify_vote(id,|v|v.set_weight(weight))
    }
    pub fn add_vote_tags<S:Into<String>,I:IntoIterator<Item=S>>(&mut self,id:VoteId,tags:I) -> Result<(),CondorcetError> {
        self.modify_vote(id,|v|{ v.add_tags(tags); Ok(()) })
    }
    /// Returns whether any of the tags were present.
    pub fn remove_vote_tags<S:AsRef<str>,I:IntoIterator<Item=S>>(&mut self,id:VoteId,tags:I) -> Result<bool,CondorcetError> {
        let mut removed = false;
        self.modify_vote(id,|v|{ removed=v.remove_tags(tags); Ok(()) })?;
        Ok(removed)
    }

    pub fn count_votes(&mut self,filter:Option<&VoteFilter>) -> Result<usize,CondorcetError> { self.votes.count(filter) }

    /// Total of the effective weights of votes accepted by the filter.
    pub fn sum_vote_weights(&mut self,filter:Option<&VoteFilter>) -> Result<u64,CondorcetError> {
        let weight_allowed = self.config.vote_weight_allowed;
        let mut total = 0;
        for v in self.votes.iter(filter) {
            let (_,vote) = v?;
            total+=vote.effective_weight(weight_allowed) as u64;
        }
        Ok(total)
    }

    /// Copies of the votes accepted by the filter, in id order.
    pub fn votes(&mut self,filter:Option<&VoteFilter>) -> Result<Vec<(VoteId,Vote)>,CondorcetError> {
        self.votes.iter(filter).collect()
    }

    /// One line per distinct ranking, like "A > B = C * 39", most common first.
    /// Weights are shown as "^3" when they are allowed and not 1.
    pub fn votes_list_as_string(&mut self,filter:Option<&VoteFilter>) -> Result<String,CondorcetError> {
        let mut counts : BTreeMap<String,usize> = BTreeMap::new();
        for v in self.votes.iter(filter) {
            let (_,vote) = v?;
            let mut key = vote.ranking_string(&self.candidates);
            if self.config.vote_weight_allowed && vote.weight()!=1 { key.push_str(&format!(" ^{}",vote.weight())); }
            *counts.entry(key).or_insert(0)+=1;
        }
        let mut lines : Vec<(String,usize)> = counts.into_iter().collect();
        lines.sort_by(|a,b|b.1.cmp(&a.1).then_with(||a.0.cmp(&b.0)));
        Ok(lines.into_iter().map(|(ranking,count)|format!("{} * {}",ranking,count)).collect::<Vec<_>>().join("\n"))
    }

    /// Start keeping sealed containers of votes in the given (empty) handler.
    pub fn set_external_handler(&mut self,handler:Box<dyn ExternalDataHandler>) -> Result<(),CondorcetError> {
        self.votes.attach_external_handler(handler)
    }
    /// Bring all votes back into memory, returning the handler.
    pub fn remove_external_handler(&mut self) -> Result<Box<dyn ExternalDataHandler>,CondorcetError> {
        self.votes.detach_external_handler()
    }

    /// Get the tally for this filter, building the pairwise matrix if it is not already cached.
    fn tally(&mut self,filter:Option<&VoteFilter>) -> Result<&mut Tally,CondorcetError> {
        match self.tally.take() {
            Some(tally) if tally.filter.as_ref()==filter => Ok(self.tally.insert(tally)),
            _ => {
                let mut matrix = PairwiseMatrix::new(self.candidates.len());
                for v in self.votes.iter(filter) {
                    let (_,vote) = v?;
                    matrix.add_vote(&vote,vote.effective_weight(self.config.vote_weight_allowed),self.config.implicit_ranking);
                }
                debug!(candidates=matrix.num_candidates(),filtered=filter.is_some(),"Built pairwise matrix");
                Ok(self.tally.insert(Tally{ filter: filter.cloned(), matrix, results: HashMap::new() }))
            }
        }
    }

    pub fn pairwise(&mut self) -> Result<&PairwiseMatrix,CondorcetError> { self.pairwise_filtered(None) }
    pub fn pairwise_filtered(&mut self,filter:Option<&VoteFilter>) -> Result<&PairwiseMatrix,CondorcetError> {
        Ok(&self.tally(filter)?.matrix)
    }
    /// The pairwise matrix keyed by candidate names.
    pub fn explicit_pairwise(&mut self,filter:Option<&VoteFilter>) -> Result<BTreeMap<String,ExplicitPairwise>,CondorcetError> {
        let matrix = self.pairwise_filtered(filter)?.clone();
        Ok(matrix.explicit(&self.candidates))
    }

    pub fn result(&mut self,method:Method) -> Result<&RankResult,CondorcetError> { self.result_filtered(method,None) }
    /// The ranking by a method, computed once per pairwise matrix.
    pub fn result_filtered(&mut self,method:Method,filter:Option<&VoteFilter>) -> Result<&RankResult,CondorcetError> {
        let strategy = method.strategy();
        let max_candidates = self.config.ranked_pairs_max_candidates;
        let tally = self.tally(filter)?;
        match tally.results.entry(strategy) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let result = strategy.rank(&tally.matrix,max_candidates)?;
                debug!(method=%method,result=%result,"Computed ranking");
                Ok(e.insert(result))
            }
        }
    }

    /// The unique winner by the method, if there is one.
    pub fn winner(&mut self,method:Method) -> Result<Option<CandidateIndex>,CondorcetError> { Ok(self.result(method)?.winner()) }
    /// The unique loser by the method, if there is one.
    pub fn loser(&mut self,method:Method) -> Result<Option<CandidateIndex>,CondorcetError> { Ok(self.result(method)?.loser()) }
    pub fn condorcet_winner(&mut self) -> Result<Option<CandidateIndex>,CondorcetError> { Ok(self.pairwise()?.condorcet_winner()) }
    pub fn condorcet_loser(&mut self) -> Result<Option<CandidateIndex>,CondorcetError> { Ok(self.pairwise()?.condorcet_loser()) }

    /// The number of committees of `seats` candidates.
    pub fn possible_committees(&self) -> Result<i64,CondorcetError> {
        self.guard.combinations(self.candidates.len() as i64,self.config.seats as i64)
    }

    /// Every committee of `seats` candidates, failing rather than producing more than `limit` of them.
    pub fn committees(&self,limit:Option<u64>) -> Result<impl Iterator<Item=Vec<CandidateIndex>> + use<>,CondorcetError> {
        let subsets = self.guard.k_subsets(self.candidates.len(),self.config.seats,limit)?;
        Ok(subsets.map(|s|s.into_iter().map(CandidateIndex).collect()))
    }

    /// A copy with every vote in memory, no external data handler, and votes not linked to this election's store.
    pub fn detached_copy(&mut self) -> Result<Election,CondorcetError> {
        Ok(Election{
            candidates: self.candidates.clone(),
            config: self.config.clone(),
            votes: self.votes.detached_copy()?,
            guard: CombinatoricsGuard::new(self.config.use_big_integer),
            tally: self.tally.clone(),
        })
    }

    pub fn set_implicit_ranking(&mut self,implicit_ranking:bool) {
        if self.config.implicit_ranking!=implicit_ranking { self.invalidate(); }
        self.config.implicit_ranking=implicit_ranking;
    }
    pub fn set_vote_weight_allowed(&mut self,vote_weight_allowed:bool) {
        if self.config.vote_weight_allowed!=vote_weight_allowed { self.invalidate(); }
        self.config.vote_weight_allowed=vote_weight_allowed;
    }
    /// Cached ranked pairs results depend on the cap, so are dropped if it changes.
    pub fn set_ranked_pairs_max_candidates(&mut self,max_candidates:Option<usize>) {
        if self.config.ranked_pairs_max_candidates==max_candidates { return; }
        self.config.ranked_pairs_max_candidates=max_candidates;
        if let Some(tally) = &mut self.tally {
            tally.results.retain(|strategy,_|!matches!(strategy,Strategy::RankedPairs(_)));
            debug!("Dropped cached ranked pairs results as the candidate cap changed");
        }
    }
    pub fn set_seats(&mut self,seats:usize) { self.config.seats=seats; }
    pub fn set_use_big_integer(&mut self,use_big_integer:bool) {
        self.config.use_big_integer=use_big_integer;
        self.guard=CombinatoricsGuard::new(use_big_integer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(i:usize) -> CandidateIndex { CandidateIndex(i) }

    fn abc() -> Election {
        Election::new(Candidates::new(["A","B","C"]).unwrap(),ElectionConfig::default())
    }

    #[test]
    fn test_config_defaults_when_deserializing() {
        let config : ElectionConfig = serde_json::from_str(r#"{"implicit_ranking":false,"ranked_pairs_max_candidates":null}"#).unwrap();
        assert!(!config.implicit_ranking);
        assert_eq!(None,config.ranked_pairs_max_candidates);
        assert_eq!(2000,config.max_container_length);
        assert_eq!(100,config.seats);
    }

    #[test]
    fn test_caches_invalidated() {
        let mut election = abc();
        let id = election.add_vote(&Vote::from_order(&[c(0),c(1),c(2)]).unwrap()).unwrap();
        assert_eq!(Some(c(0)),election.winner(Method::SchulzeWinning).unwrap());
        election.set_vote_ranking(id,vec![vec![c(2)],vec![c(1)]]).unwrap();
        assert_eq!(Some(c(2)),election.winner(Method::SchulzeWinning).unwrap());
        assert_eq!(1,election.pairwise().unwrap().win(c(1),c(0)));
        election.set_implicit_ranking(false);
        assert_eq!(0,election.pairwise().unwrap().win(c(1),c(0)));
        election.remove_vote(id).unwrap();
        assert_eq!(None,election.winner(Method::SchulzeWinning).unwrap());
    }

    #[test]
    fn test_unregistered_candidate() {
        let mut election = abc();
        assert!(matches!(election.add_vote(&Vote::from_order(&[c(3)]).unwrap()),Err(CondorcetError::Domain(_))));
        assert_eq!(0,election.count_votes(None).unwrap());
    }

    #[test]
    fn test_weights() {
        let mut election = abc();
        election.add_vote(&Vote::from_order(&[c(1)]).unwrap().with_weight(3).unwrap()).unwrap();
        election.add_vote(&Vote::from_order(&[c(0)]).unwrap()).unwrap();
        election.add_vote(&Vote::from_order(&[c(0)]).unwrap()).unwrap();
        assert_eq!(3,election.sum_vote_weights(None).unwrap());
        assert_eq!(Some(c(0)),election.winner(Method::Copeland).unwrap());
        election.set_vote_weight_allowed(true);
        assert_eq!(5,election.sum_vote_weights(None).unwrap());
        assert_eq!(Some(c(1)),election.winner(Method::Copeland).unwrap());
        assert_eq!("A * 2\nB ^3 * 1",election.votes_list_as_string(None).unwrap());
    }

    #[test]
    fn test_filters_and_tags() {
        let mut election = abc();
        let tagged = election.add_vote(&Vote::from_order(&[c(2)]).unwrap().with_tags(["postal"])).unwrap();
        election.add_vote(&Vote::from_order(&[c(1)]).unwrap()).unwrap();
        let postal = VoteFilter::with_tags(["postal"]).unwrap();
        assert_eq!(Some(c(2)),election.result_filtered(Method::RankedPairsMargin,Some(&postal)).unwrap().winner());
        assert_eq!(None,election.result(Method::RankedPairsMargin).unwrap().winner());
        election.add_vote_tags(tagged,["late"]).unwrap();
        assert!(election.remove_vote_tags(tagged,["postal"]).unwrap());
        assert!(!election.remove_vote_tags(tagged,["postal"]).unwrap());
        assert_eq!(0,election.count_votes(Some(&postal)).unwrap());
        let removed = election.remove_votes_by_tags(&VoteFilter::without_tags(["late"]).unwrap()).unwrap();
        assert_eq!(1,removed.len());
        assert_eq!(vec![vec![c(1)]],removed[0].ranking());
        assert_eq!(1,election.count_votes(None).unwrap());
    }

    #[test]
    fn test_committees() {
        let mut election = Election::new(Candidates::new(["A","B","C","D","E"]).unwrap(),ElectionConfig::default());
        assert!(matches!(election.possible_committees(),Err(CondorcetError::Domain(_))));
        election.set_seats(2);
        assert_eq!(10,election.possible_committees().unwrap());
        assert_eq!(10,election.committees(Some(10)).unwrap().count());
        assert!(matches!(election.committees(Some(9)),Err(CondorcetError::CapacityExceeded{..})));
        assert_eq!(Some(vec![c(0),c(1)]),election.committees(None).unwrap().next());
    }
}
