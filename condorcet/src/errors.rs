// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Failures that can come out of storing votes and tallying them.

use thiserror::Error;
use crate::ballot_paper::VoteId;
use crate::data_handler::DataHandlerError;

#[derive(Error, Debug)]
pub enum CondorcetError {
    #[error("No vote with id {0}")]
    NotFound(VoteId),
    #[error("This vote is already registered in this store")]
    DuplicateRegistration,
    #[error("Problem with data handler: external data handler cannot be imported, one is already attached")]
    DataHandlerAlreadyAttached,
    #[error("Problem with data handler: external data handler cannot be removed, none is attached")]
    NoDataHandlerAttached,
    #[error("Problem with data handler: {0}")]
    DataHandlerFailure(#[from] DataHandlerError),
    #[error("Needed {needed}, which is more than the limit of {limit}")]
    CapacityExceeded{needed:u64,limit:u64},
    #[error("Integer overflow: the result can not be represented as a native integer")]
    Overflow,
    #[error("Invalid argument: {0}")]
    Domain(String),
}

impl CondorcetError {
    /// true for anything to do with attaching, detaching or talking to an external data handler.
    pub fn is_data_handler_error(&self) -> bool {
        matches!(self,CondorcetError::DataHandlerAlreadyAttached|CondorcetError::NoDataHandlerAttached|CondorcetError::DataHandlerFailure(_))
    }
}
