// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! An id addressable, tag filterable collection of votes.
//!
//! Votes are grouped by id into containers of `max_container_length` consecutive ids. Vote `id`
//! lives in container `id/max_container_length`. Without an external data handler every
//! container is resident in memory. With one, each container is written out to the handler
//! once it is full, and only read back (into a least recently used cache) when needed.
//! The newest, not yet full, container is always resident.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use tracing::{debug, trace, warn};
use crate::ballot_paper::{passes, StoreId, Vote, VoteFilter, VoteId};
use crate::data_handler::{DataHandlerError, ExternalDataHandler};
use crate::errors::CondorcetError;

pub const DEFAULT_MAX_CONTAINER_LENGTH : usize = 2000;
pub const DEFAULT_CACHE_SIZE : usize = 2000;

type Container = BTreeMap<VoteId,Vote>;

/// Sealed containers read back from the external data handler.
/// Bounded by the total number of votes held; whole containers are evicted, least recently used first.
/// The most recently inserted container is kept even if on its own it exceeds the capacity.
struct ContainerCache {
    capacity : usize,
    containers : BTreeMap<usize,Container>,
    /// front is least recently used.
    recency : VecDeque<usize>,
}

impl ContainerCache {
    fn new(capacity:usize) -> Self { ContainerCache{ capacity, containers: BTreeMap::new(), recency: VecDeque::new() } }
    fn contains(&self,index:usize) -> bool { self.containers.contains_key(&index) }
    fn num_votes(&self) -> usize { self.containers.values().map(|c|c.len()).sum() }
    fn peek(&self,index:usize) -> Option<&Container> { self.containers.get(&index) }
    fn remove(&mut self,index:usize) -> Option<Container> {
        if let Some(pos) = self.recency.iter().position(|i|*i==index) { self.recency.remove(pos); }
        self.containers.remove(&index)
    }
    fn insert(&mut self,index:usize,container:Container) -> &mut Container {
        self.remove(index);
        let incoming = container.len();
        while self.num_votes()+incoming>self.capacity {
            let Some(evicted) = self.recency.pop_front() else { break; };
            self.containers.remove(&evicted);
            debug!(container=evicted,"Evicted container from vote cache");
        }
        self.recency.push_back(index);
        let slot = self.containers.entry(index).or_default();
        *slot = container;
        slot
    }
    fn clear(&mut self) {
        self.containers.clear();
        self.recency.clear();
    }
}

fn encode(vote:&Vote) -> Result<Vec<u8>,CondorcetError> {
    Ok(serde_json::to_vec(vote).map_err(DataHandlerError::from)?)
}

fn decode(blob:&[u8]) -> Result<Vote,CondorcetError> {
    Ok(serde_json::from_slice(blob).map_err(DataHandlerError::from)?)
}

/// Failures are logged, not returned.
fn delete_all(handler:&mut dyn ExternalDataHandler,ids:&[VoteId]) {
    for &id in ids {
        if let Err(e) = handler.delete(id) { warn!(vote=?id,error=%e,"Could not delete vote from external data handler"); }
    }
}

pub struct VoteStore {
    id : StoreId,
    max_container_length : usize,
    next_id : usize,
    /// number of votes, wherever they are.
    len : usize,
    /// containers held in memory and nowhere else.
    resident : BTreeMap<usize,Container>,
    /// for each container held by the external data handler, the number of votes in it.
    external : BTreeMap<usize,usize>,
    cache : ContainerCache,
    handler : Option<Box<dyn ExternalDataHandler>>,
}

impl Default for VoteStore {
    fn default() -> Self { VoteStore::new(DEFAULT_MAX_CONTAINER_LENGTH,DEFAULT_CACHE_SIZE) }
}

impl fmt::Debug for VoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoteStore")
            .field("id",&self.id)
            .field("len",&self.len)
            .field("next_id",&self.next_id)
            .field("resident_votes",&self.resident_len())
            .field("external_containers",&self.external.len())
            .field("cached_votes",&self.cached_len())
            .field("has_external_handler",&self.handler.is_some())
            .finish()
    }
}

impl VoteStore {
    /// A container length of 0 is treated as 1.
    pub fn new(max_container_length:usize,cache_size:usize) -> Self {
        VoteStore{
            id: StoreId::fresh(),
            max_container_length: max_container_length.max(1),
            next_id: 0,
            len: 0,
            resident: BTreeMap::new(),
            external: BTreeMap::new(),
            cache: ContainerCache::new(cache_size),
            handler: None
        }
    }

    pub fn store_id(&self) -> StoreId { self.id }
    pub fn max_container_length(&self) -> usize { self.max_container_length }
    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len==0 }
    /// The number of votes only held in memory, i.e. not (yet) given to an external data handler.
    pub fn resident_len(&self) -> usize { self.resident.values().map(|c|c.len()).sum() }
    /// The number of votes in the cache of containers read back from the external data handler.
    pub fn cached_len(&self) -> usize { self.cache.num_votes() }
    /// true iff the vote is currently in memory, either resident or cached.
    pub fn is_in_memory(&self,id:VoteId) -> bool {
        let c = self.container_of(id);
        self.resident.get(&c).is_some_and(|container|container.contains_key(&id)) || self.cache.peek(c).is_some_and(|container|container.contains_key(&id))
    }
    pub fn has_external_handler(&self) -> bool { self.handler.is_some() }
    pub fn external_handler(&self) -> Option<&dyn ExternalDataHandler> { self.handler.as_deref() }

    fn container_of(&self,id:VoteId) -> usize { id.0/self.max_container_length }
    /// The container the next inserted vote will go into.
    fn open_container(&self) -> usize { self.next_id/self.max_container_length }
    fn container_indices(&self) -> Vec<usize> {
        self.resident.keys().chain(self.external.keys()).copied().collect::<BTreeSet<usize>>().into_iter().collect()
    }

    /// Store a copy of the vote, returning its new id.
    /// The caller's vote is not linked to this store; only the stored copy is.
    /// Fails if the vote given is itself one already linked to this store (e.g. a copy obtained from it).
    pub fn insert(&mut self,vote:&Vote) -> Result<VoteId,CondorcetError> {
        if vote.is_linked_to(self.id) { return Err(CondorcetError::DuplicateRegistration); }
        self.seal_full_containers()?;
        let mut record = vote.clone();
        record.unlink_all();
        record.link(self.id);
        let id = VoteId(self.next_id);
        self.next_id+=1;
        let container = self.container_of(id);
        self.resident.entry(container).or_default().insert(id,record);
        self.len+=1;
        Ok(id)
    }

    fn seal_full_containers(&mut self) -> Result<(),CondorcetError> {
        if self.handler.is_none() { return Ok(()); }
        let open = self.open_container();
        let full : Vec<usize> = self.resident.keys().copied().filter(|c|*c<open).collect();
        for c in full { self.seal(c)?; }
        Ok(())
    }

    /// Move a resident container into the external data handler. On failure it stays resident,
    /// and whatever part of it was already written is deleted from the handler.
    fn seal(&mut self,c:usize) -> Result<(),CondorcetError> {
        let Some(container) = self.resident.remove(&c) else { return Ok(()) };
        if container.is_empty() { return Ok(()); }
        let sealed = match self.handler.as_mut() {
            Some(handler) => {
                let mut written = vec![];
                let sealed = container.iter().try_for_each(|(id,vote)|->Result<(),CondorcetError>{
                    handler.store(*id,encode(vote)?)?;
                    written.push(*id);
                    Ok(())
                });
                if sealed.is_err() { delete_all(&mut **handler,&written); }
                sealed
            }
            None => Err(CondorcetError::NoDataHandlerAttached),
        };
        if let Err(e) = sealed {
            self.resident.insert(c,container);
            return Err(e);
        }
        debug!(container=c,votes=container.len(),"Sealed container into external data handler");
        self.external.insert(c,container.len());
        self.cache.insert(c,container);
        Ok(())
    }

    /// Read a sealed container from the external data handler, without caching it.
    fn fetch_container(&self,c:usize) -> Result<Container,CondorcetError> {
        let handler = self.handler.as_ref().ok_or(CondorcetError::NoDataHandlerAttached)?;
        let expected = self.external.get(&c).copied().unwrap_or(0);
        let mut container = Container::new();
        if expected==0 { return Ok(container); }
        let end = (c+1)*self.max_container_length;
        for (id,blob) in handler.fetch_range(VoteId(c*self.max_container_length),expected)? {
            if id.0>=end { break; }
            let mut vote = decode(&blob)?;
            vote.link(self.id);
            container.insert(id,vote);
        }
        if container.len()!=expected {
            return Err(DataHandlerError::Other(format!("Expected {} votes in container {} but the external data handler has {}",expected,c,container.len())).into());
        }
        debug!(container=c,votes=expected,"Fetched container from external data handler");
        Ok(container)
    }

    /// Get a sealed container into the cache (if not already there) and mark it as recently used.
    fn load_container(&mut self,c:usize) -> Result<&mut Container,CondorcetError> {
        let container = match self.cache.remove(c) {
            Some(container) => container,
            None => self.fetch_container(c)?,
        };
        Ok(self.cache.insert(c,container))
    }

    /// Apply f to a container, wherever it is. A container with no votes is presented as empty.
    fn with_container<R>(&mut self,c:usize,f:impl FnOnce(&Container)->R) -> Result<R,CondorcetError> {
        if let Some(container) = self.resident.get(&c) { return Ok(f(container)); }
        if !self.external.contains_key(&c) { return Ok(f(&Container::new())); }
        let container = self.load_container(c)?;
        Ok(f(&*container))
    }

    fn container_votes(&mut self,c:usize,filter:Option<&VoteFilter>) -> Result<Vec<(VoteId,Vote)>,CondorcetError> {
        self.with_container(c,|container|container.iter().filter(|(_,v)|passes(filter,v)).map(|(id,v)|(*id,v.clone())).collect())
    }

    /// Get a vote, reading it from the external data handler if necessary.
    pub fn get(&mut self,id:VoteId) -> Result<&Vote,CondorcetError> {
        let c = self.container_of(id);
        if self.resident.contains_key(&c) {
            return self.resident[&c].get(&id).ok_or(CondorcetError::NotFound(id));
        }
        if !self.external.contains_key(&c) { return Err(CondorcetError::NotFound(id)); }
        self.load_container(c)?.get(&id).ok_or(CondorcetError::NotFound(id))
    }

    pub fn contains(&mut self,id:VoteId) -> Result<bool,CondorcetError> {
        let c = self.container_of(id);
        self.with_container(c,|container|container.contains_key(&id))
    }

    /// Change a vote. If `f` fails, the vote is unchanged.
    /// Votes held by the external data handler are written back to it.
    pub fn modify<F>(&mut self,id:VoteId,f:F) -> Result<(),CondorcetError>
        where F:FnOnce(&mut Vote)->Result<(),CondorcetError>
    {
        let c = self.container_of(id);
        if let Some(container) = self.resident.get_mut(&c) {
            let vote = container.get_mut(&id).ok_or(CondorcetError::NotFound(id))?;
            let mut updated = vote.clone();
            f(&mut updated)?;
            *vote=updated;
            return Ok(());
        }
        if !self.external.contains_key(&c) { return Err(CondorcetError::NotFound(id)); }
        let mut updated = self.load_container(c)?.get(&id).cloned().ok_or(CondorcetError::NotFound(id))?;
        f(&mut updated)?;
        let blob = encode(&updated)?;
        self.handler.as_mut().ok_or(CondorcetError::NoDataHandlerAttached)?.store(id,blob)?;
        self.load_container(c)?.insert(id,updated);
        trace!(vote=id.0,"Updated vote held by external data handler");
        Ok(())
    }

    /// Remove a vote, returning it (no longer linked to this store). Other ids are unchanged.
    pub fn remove(&mut self,id:VoteId) -> Result<Vote,CondorcetError> {
        let c = self.container_of(id);
        if let Some(container) = self.resident.get_mut(&c) {
            let mut vote = container.remove(&id).ok_or(CondorcetError::NotFound(id))?;
            if container.is_empty() { self.resident.remove(&c); }
            self.len-=1;
            vote.unlink(self.id);
            return Ok(vote);
        }
        let Some(&count) = self.external.get(&c) else { return Err(CondorcetError::NotFound(id)) };
        if !self.load_container(c)?.contains_key(&id) { return Err(CondorcetError::NotFound(id)); }
        self.handler.as_mut().ok_or(CondorcetError::NoDataHandlerAttached)?.delete(id)?;
        let mut vote = self.load_container(c)?.remove(&id).ok_or(CondorcetError::NotFound(id))?;
        if count<=1 {
            self.external.remove(&c);
            self.cache.remove(c);
        } else {
            self.external.insert(c,count-1);
        }
        self.len-=1;
        vote.unlink(self.id);
        trace!(vote=id.0,"Removed vote held by external data handler");
        Ok(vote)
    }

    /// Remove every vote, including everything held by the external data handler. Ids are still not reused.
    pub fn remove_all(&mut self) -> Result<(),CondorcetError> {
        let external : Vec<(usize,usize)> = self.external.iter().map(|(c,n)|(*c,*n)).collect();
        if let Some(handler) = self.handler.as_mut() {
            for (c,count) in external {
                let start = c*self.max_container_length;
                for (id,_) in handler.fetch_range(VoteId(start),count)? {
                    if id.0>=start+self.max_container_length { break; }
                    handler.delete(id)?;
                }
                self.external.remove(&c);
                self.cache.remove(c);
                self.len-=count;
            }
        }
        self.resident.clear();
        self.external.clear();
        self.cache.clear();
        self.len=0;
        debug!(store=?self.id,"Removed all votes");
        Ok(())
    }

    /// Iterate over votes (in increasing id order) accepted by the filter, reading from the external
    /// data handler as needed. Votes produced are copies, still linked to this store.
    pub fn iter(&mut self,filter:Option<&VoteFilter>) -> VoteIter<'_> {
        let containers = self.container_indices();
        VoteIter{ store: self, filter: filter.cloned(), containers: containers.into_iter(), current: Vec::new().into_iter() }
    }

    /// Number of votes accepted by the filter.
    pub fn count(&mut self,filter:Option<&VoteFilter>) -> Result<usize,CondorcetError> {
        let Some(filter) = filter else { return Ok(self.len) };
        let mut total = 0;
        for c in self.container_indices() {
            total+=self.with_container(c,|container|container.values().filter(|v|filter.accepts(v)).count())?;
        }
        Ok(total)
    }

    /// Ids of votes accepted by the filter, in increasing order.
    pub fn ids(&mut self,filter:Option<&VoteFilter>) -> Result<Vec<VoteId>,CondorcetError> {
        let mut res = vec![];
        for c in self.container_indices() {
            let ids = self.with_container(c,|container|container.iter().filter(|(_,v)|passes(filter,v)).map(|(id,_)|*id).collect::<Vec<_>>())?;
            res.extend(ids);
        }
        Ok(res)
    }

    /// Start using an external data handler, which must be empty. Full containers are moved into it.
    pub fn attach_external_handler(&mut self,handler:Box<dyn ExternalDataHandler>) -> Result<(),CondorcetError> {
        if self.handler.is_some() { return Err(CondorcetError::DataHandlerAlreadyAttached); }
        let existing = handler.count_entities()?;
        if existing>0 {
            return Err(DataHandlerError::Other(format!("The external data handler already holds {} entities",existing)).into());
        }
        self.handler=Some(handler);
        debug!(store=?self.id,"Attached external data handler");
        if let Err(e) = self.seal_full_containers() {
            self.undo_attach();
            return Err(e);
        }
        Ok(())
    }

    /// After a failed attach, bring back whatever was sealed and leave the handler empty and detached.
    /// If the sealed votes cannot be read back the handler stays attached, as it holds the only copy.
    fn undo_attach(&mut self) {
        let sealed : Vec<usize> = self.external.keys().copied().collect();
        match self.detach_external_handler() {
            Ok(mut handler) => {
                let ids : Vec<VoteId> = sealed.iter().filter_map(|c|self.resident.get(c)).flat_map(|container|container.keys().copied()).collect();
                delete_all(&mut *handler,&ids);
            }
            Err(e) => warn!(store=?self.id,error=%e,"Could not undo a failed attach; the external data handler stays attached"),
        }
    }

    /// Stop using the external data handler, bringing everything it holds back into memory.
    /// The handler is returned to the caller with its contents untouched.
    /// If reading anything back fails, the handler stays attached and nothing changes.
    pub fn detach_external_handler(&mut self) -> Result<Box<dyn ExternalDataHandler>,CondorcetError> {
        if self.handler.is_none() { return Err(CondorcetError::NoDataHandlerAttached); }
        let mut migrated = BTreeMap::new();
        for &c in self.external.keys() {
            let container = match self.cache.peek(c) {
                Some(cached) => cached.clone(),
                None => self.fetch_container(c)?,
            };
            migrated.insert(c,container);
        }
        let handler = self.handler.take().ok_or(CondorcetError::NoDataHandlerAttached)?;
        debug!(store=?self.id,containers=migrated.len(),"Detached external data handler");
        self.resident.append(&mut migrated);
        self.external.clear();
        self.cache.clear();
        Ok(handler)
    }

    /// A copy with every vote in memory, no external data handler, and new (unlinked from this store) vote records.
    /// Ids are preserved.
    pub fn detached_copy(&mut self) -> Result<VoteStore,CondorcetError> {
        let mut copy = VoteStore::new(self.max_container_length,self.cache.capacity);
        copy.next_id=self.next_id;
        let copy_id = copy.id;
        for c in self.container_indices() {
            let container : Container = self.with_container(c,|container|container.iter().map(|(id,v)|{
                let mut v = v.clone();
                v.unlink_all();
                v.link(copy_id);
                (*id,v)
            }).collect())?;
            if !container.is_empty() {
                copy.len+=container.len();
                copy.resident.insert(c,container);
            }
        }
        Ok(copy)
    }
}

/// Lazy iteration over a vote store. See [VoteStore::iter].
pub struct VoteIter<'a> {
    store : &'a mut VoteStore,
    filter : Option<VoteFilter>,
    containers : std::vec::IntoIter<usize>,
    current : std::vec::IntoIter<(VoteId,Vote)>,
}

impl Iterator for VoteIter<'_> {
    type Item = Result<(VoteId,Vote),CondorcetError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(v) = self.current.next() { return Some(Ok(v)); }
            let c = self.containers.next()?;
            match self.store.container_votes(c,self.filter.as_ref()) {
                Ok(votes) => { self.current=votes.into_iter(); }
                Err(e) => {
                    self.containers=Vec::new().into_iter();
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot_metadata::CandidateIndex;

    fn container(ids:std::ops::Range<usize>) -> Container {
        ids.map(|i|(VoteId(i),Vote::from_order(&[CandidateIndex(0)]).unwrap())).collect()
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = ContainerCache::new(10);
        cache.insert(0,container(0..5));
        cache.insert(1,container(5..10));
        assert_eq!(10,cache.num_votes());
        // touch 0 so 1 is least recently used.
        let c0 = cache.remove(0).unwrap();
        cache.insert(0,c0);
        cache.insert(2,container(10..15));
        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert_eq!(10,cache.num_votes());
    }

    #[test]
    fn test_cache_keeps_newest_even_if_too_big() {
        let mut cache = ContainerCache::new(3);
        cache.insert(0,container(0..2));
        cache.insert(1,container(10..20));
        assert!(!cache.contains(0));
        assert!(cache.contains(1));
        assert_eq!(10,cache.num_votes());
    }
}
