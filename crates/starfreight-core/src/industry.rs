use crate::fixed::Seconds;
use crate::id::{ContractId, EmployeeId, ResourceType, StorageId};
use crate::resource::{Resource, ResourceFlow, flow_totals};
use crate::storage::StorageNode;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Producer definitions
// ---------------------------------------------------------------------------

/// Errors raised when defining a producer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    #[error("cycle time must be positive, got {0}")]
    NonPositiveCycleTime(Seconds),
    #[error("flows of {0:?} per cycle exceed u32::MAX")]
    FlowOverflow(ResourceType),
}

fn check_cycle_time(cycle_time: Seconds) -> Result<(), ProducerError> {
    if cycle_time <= Seconds::ZERO {
        return Err(ProducerError::NonPositiveCycleTime(cycle_time));
    }
    Ok(())
}

/// Per-cycle totals of each type must fit in one storage slot.
fn check_totals(flows: &[ResourceFlow]) -> Result<(), ProducerError> {
    match flow_totals(flows)
        .into_iter()
        .find(|&(_, total)| total > u32::MAX as u64)
    {
        Some((resource_type, _)) => Err(ProducerError::FlowOverflow(resource_type)),
        None => Ok(()),
    }
}

/// Consumes a fixed set of inputs and produces a fixed set of outputs after
/// `cycle_time` seconds (refineries, shipyards, fabricators).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    inputs: Vec<ResourceFlow>,
    outputs: Vec<ResourceFlow>,
    cycle_time: Seconds,
}

impl Recipe {
    pub fn new(
        inputs: Vec<ResourceFlow>,
        outputs: Vec<ResourceFlow>,
        cycle_time: Seconds,
    ) -> Result<Self, ProducerError> {
        check_cycle_time(cycle_time)?;
        check_totals(&inputs)?;
        check_totals(&outputs)?;
        Ok(Self {
            inputs,
            outputs,
            cycle_time,
        })
    }
}

/// Produces its outputs from nothing every cycle (mines, gas harvesters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extractor {
    outputs: Vec<ResourceFlow>,
    cycle_time: Seconds,
}

impl Extractor {
    pub fn new(outputs: Vec<ResourceFlow>, cycle_time: Seconds) -> Result<Self, ProducerError> {
        check_cycle_time(cycle_time)?;
        check_totals(&outputs)?;
        Ok(Self {
            outputs,
            cycle_time,
        })
    }
}

/// Top-level producer enum. Dispatches via enum match (no trait objects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Producer {
    /// Transformer gated on input availability.
    Production(Recipe),
    /// Pure producer; requirements are vacuously met.
    Extraction(Extractor),
}

impl Producer {
    pub fn inputs(&self) -> &[ResourceFlow] {
        match self {
            Producer::Production(r) => &r.inputs,
            Producer::Extraction(_) => &[],
        }
    }

    pub fn outputs(&self) -> &[ResourceFlow] {
        match self {
            Producer::Production(r) => &r.outputs,
            Producer::Extraction(e) => &e.outputs,
        }
    }

    pub fn cycle_time(&self) -> Seconds {
        match self {
            Producer::Production(r) => r.cycle_time,
            Producer::Extraction(e) => e.cycle_time,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Producer::Production(_))
    }

    /// True iff every declared input is currently available in `storage`.
    pub fn requirements_met(&self, storage: &StorageNode) -> bool {
        self.shortfall(storage).is_empty()
    }

    /// Per-type amounts still missing before a cycle can start. Repeated
    /// input types are summed. Empty when requirements are met.
    pub fn shortfall(&self, storage: &StorageNode) -> Vec<Resource> {
        flow_totals(self.inputs())
            .into_iter()
            .filter_map(|(t, needed)| {
                let missing = needed.checked_sub(storage.quantity(t) as u64)?;
                // A total that does not fit can never be stocked in full.
                let missing = u32::try_from(missing).unwrap_or(u32::MAX);
                (missing > 0).then(|| Resource::new(t, missing))
            })
            .collect()
    }

    /// Advance the producer's state machine by `dt` seconds.
    ///
    /// At most one transition happens per call: an idle producer may start a
    /// cycle, a producing one may finish its cycle, never both.
    pub fn tick(
        &self,
        state: &mut ProducerState,
        storage: Option<&mut StorageNode>,
        dt: Seconds,
    ) -> CycleResult {
        let mut result = CycleResult::default();

        match state {
            ProducerState::Producing { remaining } => {
                let left = *remaining - dt;
                if left > Seconds::ZERO {
                    *remaining = left;
                    return result;
                }
                if let Some(storage) = storage {
                    // Outputs that do not fit stay in the node until they do.
                    if storage.put_all(self.outputs()).is_err() {
                        *remaining = Seconds::ZERO;
                        result.stall = Some(StallReason::OutputFull);
                        return result;
                    }
                    result.produced = self.outputs().to_vec();
                }
                *state = ProducerState::Idle;
                result.completed = true;
            }
            ProducerState::Idle => {
                let Some(storage) = storage else {
                    result.stall = Some(StallReason::NoStorage);
                    return result;
                };
                if storage.take_all(self.inputs()).is_err() {
                    result.stall = Some(StallReason::MissingInputs);
                    return result;
                }
                result.consumed = self.inputs().to_vec();
                *state = ProducerState::Producing {
                    remaining: self.cycle_time(),
                };
                result.started = true;
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Producer state
// ---------------------------------------------------------------------------

/// Why a producer made no progress this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallReason {
    MissingInputs,
    NoStorage,
    /// A finished cycle's outputs would overflow the connected storage.
    OutputFull,
}

/// Runtime state of a producer. `Producing` is held for one cycle, and
/// past it while the outputs do not fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProducerState {
    #[default]
    Idle,
    Producing { remaining: Seconds },
}

impl ProducerState {
    pub fn is_producing(&self) -> bool {
        matches!(self, ProducerState::Producing { .. })
    }
}

/// The outcome of a single step for a producer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleResult {
    /// Inputs deducted this step (only when a cycle started).
    pub consumed: Vec<ResourceFlow>,
    /// Outputs credited this step (only when a cycle completed).
    pub produced: Vec<ResourceFlow>,
    pub started: bool,
    pub completed: bool,
    /// Set when the producer stayed idle or could not unload.
    pub stall: Option<StallReason>,
}

// ---------------------------------------------------------------------------
// Industry node
// ---------------------------------------------------------------------------

/// A producer placed at a site and connected to one storage node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryNode {
    pub name: String,
    pub producer: Producer,
    pub state: ProducerState,
    /// Connected storage. Referenced, not owned.
    pub storage: Option<StorageId>,
    /// Employee record tying this node to a company.
    pub employee: Option<EmployeeId>,
    /// Freight contracts this node created that have not completed yet.
    pub pending_freight: Vec<ContractId>,
    /// Why the node was idle after its last step, if it was.
    pub stall: Option<StallReason>,
    pub cycles_completed: u64,
}

impl IndustryNode {
    pub fn new(name: impl Into<String>, producer: Producer, storage: Option<StorageId>) -> Self {
        Self {
            name: name.into(),
            producer,
            state: ProducerState::Idle,
            storage,
            employee: None,
            pending_freight: Vec::new(),
            stall: None,
            cycles_completed: 0,
        }
    }

    pub fn producing(&self) -> bool {
        self.state.is_producing()
    }

    /// Called when a freight contract this node created is completed.
    /// Returns false if the contract was not tracked by this node.
    pub fn notify_of_contract_completion(&mut self, contract: ContractId) -> bool {
        let before = self.pending_freight.len();
        self.pending_freight.retain(|&c| c != contract);
        self.pending_freight.len() != before
    }
}

// ===========================================================================
// Tests
// ===========================================================================
