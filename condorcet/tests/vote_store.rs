// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.



//! Vote store behaviour, with and without an external data handler.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use condorcet::ballot_metadata::CandidateIndex;
use condorcet::ballot_paper::{Vote, VoteFilter, VoteId};
use condorcet::data_handler::{DataHandlerError, ExternalDataHandler, MemoryDataHandler};
use condorcet::errors::CondorcetError;
use condorcet::vote_store::VoteStore;

fn c(i:usize) -> CandidateIndex { CandidateIndex(i) }

/// A recognisable vote for each index, with tags on every third.
fn sample_vote(i:usize) -> Vote {
    let vote = Vote::from_order(&[c(i%4),c((i+1)%4)]).unwrap();
    if i%3==0 { vote.with_tags(["third"]) } else { vote }
}

fn fill(store:&mut VoteStore,num_votes:usize) -> anyhow::Result<Vec<VoteId>> {
    let mut ids = vec![];
    for i in 0..num_votes { ids.push(store.insert(&sample_vote(i))?); }
    Ok(ids)
}

fn entities(store:&VoteStore) -> usize {
    store.external_handler().map(|h|h.count_entities().unwrap()).unwrap_or(0)
}

fn all_votes(store:&mut VoteStore,filter:Option<&VoteFilter>) -> anyhow::Result<Vec<(VoteId,Vote)>> {
    Ok(store.iter(filter).collect::<Result<Vec<_>,_>>()?)
}

#[test]
fn test_counts_regardless_of_handler() -> anyhow::Result<()> {
    for (container_length,cache_size) in [(10,10),(1,3),(7,20),(2000,2000)] {
        for num_votes in [0,1,9,10,11,95] {
            let mut plain = VoteStore::new(container_length,cache_size);
            fill(&mut plain,num_votes)?;
            assert_eq!(num_votes,plain.count(None)?);
            assert_eq!(num_votes,plain.resident_len());

            let mut attached_first = VoteStore::new(container_length,cache_size);
            attached_first.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
            fill(&mut attached_first,num_votes)?;
            assert_eq!(num_votes,attached_first.count(None)?);
            assert_eq!(num_votes,entities(&attached_first)+attached_first.resident_len());
            assert!(attached_first.resident_len()<=container_length);

            let mut attached_later = VoteStore::new(container_length,cache_size);
            fill(&mut attached_later,num_votes)?;
            attached_later.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
            assert_eq!(num_votes,attached_later.count(None)?);
            assert_eq!(num_votes,entities(&attached_later)+attached_later.resident_len());

            let expected = all_votes(&mut plain,None)?;
            assert_eq!(expected,all_votes(&mut attached_first,None)?);
            assert_eq!(expected,all_votes(&mut attached_later,None)?);
        }
    }
    Ok(())
}

#[test]
fn test_filters_same_in_memory_and_external() -> anyhow::Result<()> {
    let mut plain = VoteStore::new(10,10);
    let mut external = VoteStore::new(10,10);
    external.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut plain,47)?;
    fill(&mut external,47)?;
    for filter in [VoteFilter::with_tags(["third"])?,VoteFilter::without_tags(["third"])?,VoteFilter::with_tags(["nothing","third"])?] {
        let expected = all_votes(&mut plain,Some(&filter))?;
        assert_eq!(expected,all_votes(&mut external,Some(&filter))?);
        assert_eq!(expected.len(),external.count(Some(&filter))?);
        assert_eq!(expected.iter().map(|(id,_)|*id).collect::<Vec<_>>(),external.ids(Some(&filter))?);
    }
    assert_eq!(16,plain.count(Some(&VoteFilter::with_tags(["third"])?))?);
    assert_eq!(31,plain.count(Some(&VoteFilter::without_tags(["third"])?))?);
    Ok(())
}

#[test]
fn test_iteration_is_ordered_and_restartable() -> anyhow::Result<()> {
    let mut store = VoteStore::new(4,4);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut store,30)?;
    store.remove(VoteId(5))?;
    store.remove(VoteId(17))?;
    let first : Vec<VoteId> = all_votes(&mut store,None)?.into_iter().map(|(id,_)|id).collect();
    let second : Vec<VoteId> = all_votes(&mut store,None)?.into_iter().map(|(id,_)|id).collect();
    assert_eq!(first,second);
    assert_eq!(28,first.len());
    assert!(first.windows(2).all(|w|w[0]<w[1]));
    assert!(!first.contains(&VoteId(5)));
    Ok(())
}

#[test]
fn test_remove_twice() -> anyhow::Result<()> {
    for with_handler in [false,true] {
        let mut store = VoteStore::new(10,10);
        if with_handler { store.attach_external_handler(Box::new(MemoryDataHandler::new()))?; }
        fill(&mut store,35)?;
        for id in [VoteId(3),VoteId(34)] { // one sealed, one in the open container
            let before = store.count(None)?;
            let removed = store.remove(id)?;
            assert_eq!(sample_vote(id.0),removed);
            assert_eq!(0,removed.count_links());
            assert!(matches!(store.remove(id),Err(CondorcetError::NotFound(_))));
            assert!(matches!(store.get(id),Err(CondorcetError::NotFound(_))));
            assert_eq!(before-1,store.count(None)?);
        }
        assert_eq!(33,entities(&store)+store.resident_len());
        // ids are never reused.
        assert_eq!(VoteId(35),store.insert(&sample_vote(0))?);
        assert!(matches!(store.remove(VoteId(1000)),Err(CondorcetError::NotFound(_))));
    }
    Ok(())
}

#[test]
fn test_evicted_containers_are_fetched() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut store,55)?;
    // only one sealed container fits in the cache.
    assert!(store.cached_len()<=10);
    assert!(!store.is_in_memory(VoteId(3)));
    assert_eq!(&sample_vote(3),store.get(VoteId(3))?);
    assert!(store.is_in_memory(VoteId(3)));
    let store_id = store.store_id();
    assert!(store.get(VoteId(3))?.is_linked_to(store_id));
    assert_eq!(&sample_vote(27),store.get(VoteId(27))?);
    assert!(!store.is_in_memory(VoteId(3)));
    assert!(store.is_in_memory(VoteId(52))); // open container always resident
    Ok(())
}

#[test]
fn test_modify_external_vote() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut store,40)?;
    store.modify(VoteId(2),|v|{ v.add_tags(["changed"]); v.set_weight(4) })?;
    store.get(VoteId(25))?; // evict container 0
    assert!(!store.is_in_memory(VoteId(2)));
    let vote = store.get(VoteId(2))?;
    assert!(vote.tags().contains("changed"));
    assert_eq!(4,vote.weight());
    // a failed modification changes nothing.
    assert!(store.modify(VoteId(2),|v|v.set_weight(0)).is_err());
    assert_eq!(4,store.get(VoteId(2))?.weight());
    assert!(matches!(store.modify(VoteId(99),|_|Ok(())),Err(CondorcetError::NotFound(_))));
    Ok(())
}

#[test]
fn test_handler_attach_detach_errors() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    let e = store.detach_external_handler().err().unwrap();
    assert!(matches!(e,CondorcetError::NoDataHandlerAttached));
    assert!(e.is_data_handler_error());
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    let e = store.attach_external_handler(Box::new(MemoryDataHandler::new())).err().unwrap();
    assert!(matches!(e,CondorcetError::DataHandlerAlreadyAttached));
    assert!(e.is_data_handler_error());
    assert!(store.has_external_handler());
    store.detach_external_handler()?;
    assert!(!store.has_external_handler());
    assert!(!CondorcetError::NotFound(VoteId(0)).is_data_handler_error());

    let mut used = MemoryDataHandler::new();
    used.store(VoteId(0),b"{}".to_vec())?;
    let e = store.attach_external_handler(Box::new(used)).err().unwrap();
    assert!(e.is_data_handler_error());
    assert!(!store.has_external_handler());
    Ok(())
}

/// A handler whose storage stays visible to the test after it is handed to a store,
/// and which refuses any store after the first `store_limit`.
struct FailingHandler {
    entities : Rc<RefCell<BTreeMap<VoteId,Vec<u8>>>>,
    store_limit : usize,
}

impl FailingHandler {
    fn new(store_limit:usize) -> (Self,Rc<RefCell<BTreeMap<VoteId,Vec<u8>>>>) {
        let entities = Rc::new(RefCell::new(BTreeMap::new()));
        (FailingHandler{ entities: entities.clone(), store_limit },entities)
    }
}

impl ExternalDataHandler for FailingHandler {
    fn store(&mut self, key: VoteId, blob: Vec<u8>) -> Result<(), DataHandlerError> {
        if self.store_limit==0 { return Err(DataHandlerError::Other("disk full".to_string())); }
        self.store_limit-=1;
        self.entities.borrow_mut().insert(key,blob);
        Ok(())
    }
    fn fetch(&self, key: VoteId) -> Result<Option<Vec<u8>>, DataHandlerError> { Ok(self.entities.borrow().get(&key).cloned()) }
    fn fetch_range(&self, start: VoteId, count: usize) -> Result<Vec<(VoteId, Vec<u8>)>, DataHandlerError> {
        Ok(self.entities.borrow().range(start..).take(count).map(|(k,v)|(*k,v.clone())).collect())
    }
    fn delete(&mut self, key: VoteId) -> Result<(), DataHandlerError> {
        self.entities.borrow_mut().remove(&key);
        Ok(())
    }
    fn count_entities(&self) -> Result<usize, DataHandlerError> { Ok(self.entities.borrow().len()) }
}

#[test]
fn test_failed_attach_leaves_store_unchanged() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    fill(&mut store,35)?;
    let expected = all_votes(&mut store,None)?;
    // containers 0 and 1 are written, container 2 fails half way.
    let (handler,blobs) = FailingHandler::new(25);
    let e = store.attach_external_handler(Box::new(handler)).err().unwrap();
    assert!(e.is_data_handler_error());
    assert!(!store.has_external_handler());
    assert_eq!(35,store.len());
    assert_eq!(35,store.resident_len());
    assert!(blobs.borrow().is_empty());
    assert_eq!(expected,all_votes(&mut store,None)?);
    // a working handler can still be attached afterwards.
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    assert_eq!(30,entities(&store));
    assert_eq!(expected,all_votes(&mut store,None)?);
    Ok(())
}

#[test]
fn test_failed_seal_leaves_no_partial_container() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    let (handler,blobs) = FailingHandler::new(13);
    store.attach_external_handler(Box::new(handler))?;
    fill(&mut store,20)?;
    assert_eq!(10,blobs.borrow().len());
    // sealing container 1 fails after three writes, so the insert fails.
    let e = store.insert(&sample_vote(20)).err().unwrap();
    assert!(e.is_data_handler_error());
    assert_eq!(20,store.len());
    assert_eq!(10,store.resident_len());
    assert_eq!(10,blobs.borrow().len());
    assert!(blobs.borrow().keys().all(|id|id.0<10));
    assert_eq!((0..20).map(sample_vote).collect::<Vec<_>>(),all_votes(&mut store,None)?.into_iter().map(|(_,v)|v).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_detach_brings_votes_back() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut store,42)?;
    store.remove(VoteId(11))?;
    let expected = all_votes(&mut store,None)?;
    let handler = store.detach_external_handler()?;
    assert_eq!(39,handler.count_entities()?); // handler contents untouched
    assert_eq!(41,store.resident_len());
    assert_eq!(expected,all_votes(&mut store,None)?);
    // and can be attached again.
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    assert_eq!(41,entities(&store)+store.resident_len());
    assert_eq!(expected,all_votes(&mut store,None)?);
    Ok(())
}

#[test]
fn test_remove_all_purges_handler() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    let ids = fill(&mut store,25)?;
    store.remove_all()?;
    assert_eq!(0,store.count(None)?);
    assert_eq!(0,entities(&store));
    assert!(store.is_empty());
    assert!(all_votes(&mut store,None)?.is_empty());
    assert!(store.insert(&sample_vote(0))?.0>ids[24].0);
    Ok(())
}

#[test]
fn test_duplicate_registration() -> anyhow::Result<()> {
    let mut store = VoteStore::new(10,10);
    let original = sample_vote(1);
    let id = store.insert(&original)?;
    assert_eq!(0,original.count_links()); // caller's copy is not registered
    store.insert(&original)?; // so it can be inserted again as a new vote
    let registered = store.get(id)?.clone();
    assert!(registered.is_linked_to(store.store_id()));
    assert!(matches!(store.insert(&registered),Err(CondorcetError::DuplicateRegistration)));

    let mut copy = store.detached_copy()?;
    assert_eq!(2,copy.len());
    let copied = copy.get(id)?.clone();
    assert_eq!(registered,copied);
    assert!(!copied.is_linked_to(store.store_id()));
    assert!(copied.is_linked_to(copy.store_id()));
    store.insert(&copied)?;
    assert!(matches!(copy.insert(&copied),Err(CondorcetError::DuplicateRegistration)));
    Ok(())
}

#[test]
fn test_detached_copy_of_external_store() -> anyhow::Result<()> {
    let mut store = VoteStore::new(5,5);
    store.attach_external_handler(Box::new(MemoryDataHandler::new()))?;
    fill(&mut store,23)?;
    let mut copy = store.detached_copy()?;
    assert!(!copy.has_external_handler());
    assert_eq!(23,copy.resident_len());
    assert_eq!(all_votes(&mut store,None)?,all_votes(&mut copy,None)?);
    copy.remove(VoteId(0))?;
    assert_eq!(23,store.count(None)?);
    Ok(())
}
