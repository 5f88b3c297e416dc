//! Binary save/load of a star system via `bitcode` with a versioned header.

use crate::company::{Company, Employee};
use crate::contract::Contract;
use crate::event::EventBus;
use crate::id::{CompanyId, ContractId, EmployeeId, NodeId, PlanetId, StorageId};
use crate::industry::IndustryNode;
use crate::job_board::JobBoard;
use crate::planet::Planet;
use crate::registry::ResourceRegistry;
use crate::sim::{SimState, SimulationStrategy, StepReport};
use crate::star::Star;
use crate::storage::StorageNode;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a star system snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x57A2_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode a snapshot and return only its header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    // bitcode has no partial decoding.
    let snapshot: StarSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable star state
// ---------------------------------------------------------------------------

/// Everything in a [`Star`] except the event bus, which holds closures.
#[derive(Debug, Serialize, Deserialize)]
struct StarSnapshot {
    header: SnapshotHeader,
    name: String,
    registry: ResourceRegistry,
    planets: SlotMap<PlanetId, Planet>,
    storages: SlotMap<StorageId, StorageNode>,
    nodes: SlotMap<NodeId, IndustryNode>,
    employees: SlotMap<EmployeeId, Employee>,
    companies: SlotMap<CompanyId, Company>,
    contracts: SlotMap<ContractId, Contract>,
    job_board: JobBoard,
    freight_rate: u64,
    strategy: SimulationStrategy,
    sim_state: SimState,
    paused: bool,
    last_state_hash: u64,
}

impl Star {
    /// Serialize the star to a binary blob via bitcode.
    ///
    /// The EventBus is excluded. On deserialize, a fresh EventBus is created.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = StarSnapshot {
            header: SnapshotHeader::new(self.sim_state.tick),
            name: self.name.clone(),
            registry: self.registry.clone(),
            planets: self.planets.clone(),
            storages: self.storages.clone(),
            nodes: self.nodes.clone(),
            employees: self.employees.clone(),
            companies: self.companies.clone(),
            contracts: self.contracts.clone(),
            job_board: self.job_board.clone(),
            freight_rate: self.freight_rate,
            strategy: self.strategy,
            sim_state: self.sim_state.clone(),
            paused: self.paused,
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a star from a binary blob.
    ///
    /// The header is validated before the state is used. Listeners must be
    /// re-registered afterwards.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: StarSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        Ok(Star {
            name: snapshot.name,
            registry: snapshot.registry,
            planets: snapshot.planets,
            storages: snapshot.storages,
            nodes: snapshot.nodes,
            employees: snapshot.employees,
            companies: snapshot.companies,
            contracts: snapshot.contracts,
            job_board: snapshot.job_board,
            freight_rate: snapshot.freight_rate,
            strategy: snapshot.strategy,
            sim_state: snapshot.sim_state,
            paused: snapshot.paused,
            last_state_hash: snapshot.last_state_hash,
            report: StepReport::default(),
            event_bus: EventBus::default(),
        })
    }
}
