// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The contract for external storage that a vote store can spill sealed containers of votes into.
//!
//! Entities are opaque byte blobs keyed by vote id. The physical backing is up to the implementation.

use std::collections::BTreeMap;
use thiserror::Error;
use crate::ballot_paper::VoteId;

#[derive(Error, Debug)]
pub enum DataHandlerError {
    #[error("I/O error {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize or deserialize a vote : {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// External storage for votes. All calls are blocking.
pub trait ExternalDataHandler {
    /// Store (or replace) the entity with the given key.
    fn store(&mut self,key:VoteId,blob:Vec<u8>) -> Result<(),DataHandlerError>;
    /// Get an entity. An absent key is `Ok(None)`, not an error.
    fn fetch(&self,key:VoteId) -> Result<Option<Vec<u8>>,DataHandlerError>;
    /// Get up to `count` present entities with key at least `start`, in increasing key order.
    fn fetch_range(&self,start:VoteId,count:usize) -> Result<Vec<(VoteId,Vec<u8>)>,DataHandlerError>;
    /// Remove an entity. Deleting an absent key is not an error.
    fn delete(&mut self,key:VoteId) -> Result<(),DataHandlerError>;
    fn count_entities(&self) -> Result<usize,DataHandlerError>;
}

/// An external data handler that just keeps everything in a map.
/// Useful for tests, and for checking that spilling does not change any results.
#[derive(Default,Debug,Clone)]
pub struct MemoryDataHandler {
    entities : BTreeMap<VoteId,Vec<u8>>,
}

impl MemoryDataHandler {
    pub fn new() -> Self { Self::default() }
}

impl ExternalDataHandler for MemoryDataHandler {
    fn store(&mut self, key: VoteId, blob: Vec<u8>) -> Result<(), DataHandlerError> {
        self.entities.insert(key,blob);
        Ok(())
    }

    fn fetch(&self, key: VoteId) -> Result<Option<Vec<u8>>, DataHandlerError> {
        Ok(self.entities.get(&key).cloned())
    }

    fn fetch_range(&self, start: VoteId, count: usize) -> Result<Vec<(VoteId, Vec<u8>)>, DataHandlerError> {
        Ok(self.entities.range(start..).take(count).map(|(k,v)|(*k,v.clone())).collect())
    }

    fn delete(&mut self, key: VoteId) -> Result<(), DataHandlerError> {
        self.entities.remove(&key);
        Ok(())
    }

    fn count_entities(&self) -> Result<usize, DataHandlerError> { Ok(self.entities.len()) }
}
