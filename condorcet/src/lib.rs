// Copyright 2026 Andrew Conway.
// This file is part of ConcreteSTV.
// ConcreteSTV is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// ConcreteSTV is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Storage and Condorcet-family tallying of ranked ballots.

pub mod errors;
pub mod ballot_metadata;
pub mod ballot_paper;
pub mod data_handler;
pub mod vote_store;
pub mod pairwise;
pub mod pairwise_stats;
pub mod edge_weight;
pub mod schulze;
pub mod ranked_pairs;
pub mod rank_result;
pub mod methods;
pub mod combinatorics;
pub mod election_data;
