//! Starfreight Core -- the production-and-logistics simulation of a star
//! system.
//!
//! Planets host storage nodes and industry nodes (extractors and
//! factories). Companies own those nodes and a fleet of ships as
//! employees. When a factory runs short of an input, it posts a freight
//! contract on the system's job board; an idle ship accepts it, hauls the
//! cargo and completes the contract, which notifies the issuing company
//! and the factory.
//!
//! # Six-Phase Step
//!
//! Each call to [`star::Star::step`] advances the simulation by one tick:
//!
//! 1. **Production** -- Industry nodes run their cycle state machines.
//! 2. **Requisition** -- Starved factories post freight contracts.
//! 3. **Dispatch** -- Open contracts are matched with idle ships.
//! 4. **Freight** -- Hauls travel and deliver on arrival.
//! 5. **Post-tick** -- Buffered events are delivered to listeners.
//! 6. **Bookkeeping** -- Clock advances and the state hash is computed.
//!
//! # Key Types
//!
//! - [`star::Star`] -- Composition root owning every entity arena.
//! - [`storage::StorageNode`] -- Unbounded per-site resource buffer with
//!   all-or-nothing transactions.
//! - [`industry::Producer`] -- Production (recipe) and Extraction variants.
//! - [`contract::Contract`] -- Freight contracts and their lifecycle.
//! - [`job_board::JobBoard`] -- Open contracts in posting order.
//! - [`company::Company`] -- Rosters, contract lists and ledgers.
//! - [`event::EventBus`] -- Buffered production and contract events.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod company;
pub mod contract;
pub mod event;
pub mod fixed;
pub mod id;
pub mod industry;
pub mod job_board;
pub mod logistics;
pub mod planet;
pub mod query;
pub mod registry;
pub mod resource;
pub mod rng;
pub mod serialize;
pub mod sim;
pub mod star;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
