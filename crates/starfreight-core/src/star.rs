//! The star system: owns every planet, storage node, industry node,
//! company, employee and contract, and orchestrates the six-phase
//! simulation step.
//!
//! # Architecture
//!
//! The `Star` owns one [`SlotMap`] arena per entity kind. Entities refer to
//! each other through generational ids, so a node references its storage
//! without owning it and a contract references its issuer without
//! borrowing it.
//!
//! # Six-Phase Step
//!
//! Each `step()` runs:
//! 1. **Production** -- every industry node advances its cycle state machine
//! 2. **Requisition** -- starved production nodes post freight contracts
//! 3. **Dispatch** -- open contracts are offered to idle, capable employees
//! 4. **Freight** -- hauls count down their trip time and deliver on arrival
//! 5. **Post-tick** -- deliver buffered events to listeners
//! 6. **Bookkeeping** -- advance the clock, compute state hash

use crate::company::{CompanyError, Company, Employee, EmployeeRole, ShipAttributes};
use crate::contract::{Contract, ContractError, ContractStatus, FreightContract, ResourceReservation};
use crate::event::{Event, EventBus};
use crate::fixed::{Seconds, Ticks};
use crate::id::{CompanyId, ContractId, EmployeeId, NodeId, PlanetId, StorageId};
use crate::industry::{IndustryNode, Producer, StallReason};
use crate::job_board::JobBoard;
use crate::planet::{IndustryRef, Planet};
use crate::registry::ResourceRegistry;
use crate::resource::{FlowError, Resource};
use crate::sim::{AdvanceResult, SimState, SimulationStrategy, StateHash, StepReport};
use crate::storage::StorageNode;
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by star-level construction and orchestration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StarError {
    #[error("planet {0:?} not found")]
    PlanetNotFound(PlanetId),
    #[error("storage node {0:?} not found")]
    StorageNotFound(StorageId),
    #[error("industry node {0:?} not found")]
    NodeNotFound(NodeId),
    #[error("company {0:?} not found")]
    CompanyNotFound(CompanyId),
    #[error("employee {0:?} not found")]
    EmployeeNotFound(EmployeeId),
    #[error("{0:?} already has an employee record")]
    AlreadyStaffed(IndustryRef),
    #[error(transparent)]
    Company(#[from] CompanyError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

// ---------------------------------------------------------------------------
// Star
// ---------------------------------------------------------------------------

/// A star system. Composition root of the simulation.
#[derive(Debug)]
pub struct Star {
    pub name: String,

    /// Resource type names, used for status text.
    pub registry: ResourceRegistry,

    pub(crate) planets: SlotMap<PlanetId, Planet>,
    pub(crate) storages: SlotMap<StorageId, StorageNode>,
    pub(crate) nodes: SlotMap<NodeId, IndustryNode>,
    pub(crate) employees: SlotMap<EmployeeId, Employee>,
    pub(crate) companies: SlotMap<CompanyId, Company>,
    /// Every contract ever created. Finished contracts stay for history.
    pub(crate) contracts: SlotMap<ContractId, Contract>,

    pub(crate) job_board: JobBoard,

    /// Reward paid per unit of freight for requisitioned contracts.
    pub freight_rate: u64,

    pub(crate) strategy: SimulationStrategy,
    pub sim_state: SimState,
    pub(crate) paused: bool,
    pub(crate) last_state_hash: u64,

    /// Counters for the step in progress.
    pub(crate) report: StepReport,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,
}

impl Star {
    /// Create an empty star system.
    pub fn new(name: impl Into<String>, registry: ResourceRegistry, strategy: SimulationStrategy) -> Self {
        Self {
            name: name.into(),
            registry,
            planets: SlotMap::with_key(),
            storages: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            employees: SlotMap::with_key(),
            companies: SlotMap::with_key(),
            contracts: SlotMap::with_key(),
            job_board: JobBoard::new(),
            freight_rate: 1,
            strategy,
            sim_state: SimState::new(),
            paused: false,
            last_state_hash: 0,
            report: StepReport::default(),
            event_bus: EventBus::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    pub fn add_planet(&mut self, name: impl Into<String>) -> PlanetId {
        self.planets.insert(Planet::new(name))
    }

    /// Add a moon orbiting `parent`.
    pub fn add_moon(&mut self, name: impl Into<String>, parent: PlanetId) -> Result<PlanetId, StarError> {
        if !self.planets.contains_key(parent) {
            return Err(StarError::PlanetNotFound(parent));
        }
        Ok(self.planets.insert(Planet::moon_of(name, parent)))
    }

    /// Place a storage node on a planet.
    pub fn add_storage(&mut self, planet: PlanetId, storage: StorageNode) -> Result<StorageId, StarError> {
        let planet_ref = self
            .planets
            .get_mut(planet)
            .ok_or(StarError::PlanetNotFound(planet))?;
        let id = self.storages.insert(storage);
        planet_ref.industry.push(IndustryRef::Storage(id));
        Ok(id)
    }

    /// Place an industry node on a planet, connected to `storage`. A node
    /// without storage is allowed; it never runs a cycle.
    pub fn add_industry_node(
        &mut self,
        planet: PlanetId,
        name: impl Into<String>,
        producer: Producer,
        storage: Option<StorageId>,
    ) -> Result<NodeId, StarError> {
        if let Some(s) = storage
            && !self.storages.contains_key(s)
        {
            return Err(StarError::StorageNotFound(s));
        }
        let planet_ref = self
            .planets
            .get_mut(planet)
            .ok_or(StarError::PlanetNotFound(planet))?;
        let id = self.nodes.insert(IndustryNode::new(name, producer, storage));
        planet_ref.industry.push(IndustryRef::Producer(id));
        Ok(id)
    }

    pub fn add_company(&mut self, name: impl Into<String>) -> CompanyId {
        self.companies.insert(Company::new(name))
    }

    /// Add an unaffiliated employee.
    pub fn add_employee(&mut self, employee: Employee) -> EmployeeId {
        self.employees.insert(employee)
    }

    /// Add a ship that accepts freight contracts. Not yet hired.
    pub fn add_ship(&mut self, name: impl Into<String>, attributes: ShipAttributes) -> EmployeeId {
        let mut ship = Employee::new(name, EmployeeRole::Ship(attributes));
        ship.add_accepted_contract_type::<FreightContract>();
        self.employees.insert(ship)
    }

    /// Register `employee` with `company`. An employee works for at most one
    /// company; hiring it twice into the same roster fails without change.
    pub fn hire(&mut self, company: CompanyId, employee: EmployeeId) -> Result<(), StarError> {
        let emp = self
            .employees
            .get_mut(employee)
            .ok_or(StarError::EmployeeNotFound(employee))?;
        let comp = self
            .companies
            .get_mut(company)
            .ok_or(StarError::CompanyNotFound(company))?;
        if let Some(current) = emp.company
            && current != company
        {
            return Err(CompanyError::EmployedElsewhere {
                employee,
                company: current,
            }
            .into());
        }
        comp.add_employee(employee)?;
        emp.company = Some(company);
        log::debug!("{} hired {}", comp.name, emp.name);
        Ok(())
    }

    /// Create the employee record for an industry site and hire it. Industry
    /// nodes need a record to issue contracts.
    pub fn hire_industry(&mut self, company: CompanyId, site: IndustryRef) -> Result<EmployeeId, StarError> {
        if !self.companies.contains_key(company) {
            return Err(StarError::CompanyNotFound(company));
        }
        let employee = match site {
            IndustryRef::Producer(node_id) => {
                let node = self.nodes.get(node_id).ok_or(StarError::NodeNotFound(node_id))?;
                if node.employee.is_some() {
                    return Err(StarError::AlreadyStaffed(site));
                }
                let role = if node.producer.is_production() {
                    EmployeeRole::ProductionNode(node_id)
                } else {
                    EmployeeRole::ResourceNode(node_id)
                };
                let id = self.employees.insert(Employee::new(node.name.clone(), role));
                if let Some(node) = self.nodes.get_mut(node_id) {
                    node.employee = Some(id);
                }
                id
            }
            IndustryRef::Storage(storage_id) => {
                if !self.storages.contains_key(storage_id) {
                    return Err(StarError::StorageNotFound(storage_id));
                }
                let staffed = self
                    .employees
                    .values()
                    .any(|e| e.role == EmployeeRole::StorageNode(storage_id));
                if staffed {
                    return Err(StarError::AlreadyStaffed(site));
                }
                self.employees
                    .insert(Employee::new("Storage", EmployeeRole::StorageNode(storage_id)))
            }
        };
        self.hire(company, employee)?;
        Ok(employee)
    }

    /// Create a freight contract on behalf of `creator`'s company and post
    /// it to the job board.
    pub fn post_freight_contract(
        &mut self,
        creator: EmployeeId,
        resource: Resource,
        from: StorageId,
        to: StorageId,
        reward: u64,
    ) -> Result<ContractId, StarError> {
        if resource.amount == 0 {
            return Err(FlowError::ZeroAmount(resource.resource_type).into());
        }
        for storage in [from, to] {
            if !self.storages.contains_key(storage) {
                return Err(StarError::StorageNotFound(storage));
            }
        }
        let emp = self
            .employees
            .get(creator)
            .ok_or(StarError::EmployeeNotFound(creator))?;
        let issuer = emp.company.ok_or(ContractError::Unemployed(creator))?;
        let listener = emp.role.completion_listener();

        let reservation = ResourceReservation { resource, from, to };
        let id = self
            .contracts
            .insert(Contract::freight(creator, issuer, reservation, reward));
        self.contracts[id].post(id, &mut self.job_board)?;

        if let Some(company) = self.companies.get_mut(issuer) {
            company.outstanding_contracts.push(id);
        }
        if let Some(node) = listener.and_then(|n| self.nodes.get_mut(n)) {
            node.pending_freight.push(id);
        }

        self.report.contracts_posted += 1;
        self.event_bus.emit(Event::ContractPosted {
            contract: id,
            issuer,
            tick: self.sim_state.tick,
        });
        log::debug!(
            "{}: posted freight of {} x{}",
            self.name,
            self.registry.name(resource.resource_type),
            resource.amount
        );
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Strategy / pause
    // -----------------------------------------------------------------------

    pub fn strategy(&self) -> SimulationStrategy {
        self.strategy
    }

    /// Pause the simulation. While paused, `advance()` and `step()` are
    /// no-ops. Construction and lifecycle operations still work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The state hash computed at the end of the last step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds of wall time.
    ///
    /// In tick mode exactly one step runs regardless of `dt`. In delta mode
    /// `dt` is accumulated and as many fixed steps run as fit.
    pub fn advance(&mut self, dt: Seconds) -> AdvanceResult {
        if self.paused {
            return AdvanceResult::default();
        }
        let mut result = AdvanceResult::default();
        // An invalid strategy neither steps nor accumulates.
        if !self.strategy.is_valid() {
            log::warn!("{}: non-positive timestep, not stepping", self.name);
            return result;
        }

        match self.strategy {
            SimulationStrategy::Tick { timestep } => {
                self.step_internal(timestep, &mut result);
            }
            SimulationStrategy::Delta { fixed_timestep } => {
                self.sim_state.accumulator += dt;
                while self.sim_state.accumulator >= fixed_timestep {
                    self.sim_state.accumulator -= fixed_timestep;
                    self.step_internal(fixed_timestep, &mut result);
                }
            }
        }

        result
    }

    /// Run a single simulation step of the strategy's step duration.
    pub fn step(&mut self) -> AdvanceResult {
        if self.paused {
            return AdvanceResult::default();
        }
        let mut result = AdvanceResult::default();
        self.step_internal(self.strategy.step_duration(), &mut result);
        result
    }

    fn step_internal(&mut self, dt: Seconds, result: &mut AdvanceResult) {
        if dt <= Seconds::ZERO {
            log::warn!("{}: refusing to step by {dt}s", self.name);
            return;
        }
        self.report = StepReport {
            tick: self.sim_state.tick,
            ..StepReport::default()
        };

        // Phase 1: Production -- run node state machines.
        self.phase_production(dt);

        // Phase 2: Requisition -- starved nodes ask for inputs.
        self.phase_requisition();

        // Phase 3: Dispatch -- match open contracts with employees.
        self.phase_dispatch();

        // Phase 4: Freight -- move cargo and finish arrived hauls.
        self.phase_freight(dt);

        // Phase 5: Post-tick -- deliver events.
        self.event_bus.deliver();

        // Phase 6: Bookkeeping.
        self.phase_bookkeeping(dt);

        result.steps_run += 1;
        result.reports.push(std::mem::take(&mut self.report));
    }

    // -----------------------------------------------------------------------
    // Phase 1: Production
    // -----------------------------------------------------------------------

    fn phase_production(&mut self, dt: Seconds) {
        let tick = self.sim_state.tick;

        for (node_id, node) in self.nodes.iter_mut() {
            let storage = node.storage.and_then(|s| self.storages.get_mut(s));
            let result = node.producer.tick(&mut node.state, storage, dt);

            for flow in &result.consumed {
                self.event_bus.emit(Event::ResourceConsumed {
                    node: node_id,
                    resource_type: flow.resource_type(),
                    amount: flow.amount(),
                    tick,
                });
            }
            for flow in &result.produced {
                self.event_bus.emit(Event::ResourceProduced {
                    node: node_id,
                    resource_type: flow.resource_type(),
                    amount: flow.amount(),
                    tick,
                });
            }
            if result.started {
                self.report.cycles_started += 1;
                self.event_bus.emit(Event::CycleStarted { node: node_id, tick });
            }
            if result.completed {
                node.cycles_completed += 1;
                self.report.cycles_completed += 1;
                self.event_bus.emit(Event::CycleCompleted { node: node_id, tick });
            }

            // Only report a stall on entry, not every idle step.
            if let Some(reason) = result.stall
                && node.stall != Some(reason)
            {
                self.event_bus.emit(Event::NodeStalled {
                    node: node_id,
                    reason,
                    tick,
                });
            }
            node.stall = result.stall;
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Requisition
    // -----------------------------------------------------------------------

    fn phase_requisition(&mut self) {
        let starved: Vec<(NodeId, EmployeeId, StorageId)> = self
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.producer.is_production()
                    && !n.producing()
                    && n.stall == Some(StallReason::MissingInputs)
            })
            .filter_map(|(id, n)| {
                let employee = n.employee?;
                self.employees.get(employee)?.company?;
                Some((id, employee, n.storage?))
            })
            .collect();

        for (node_id, creator, destination) in starved {
            self.withdraw_unreachable_requisitions(node_id);

            let Some(node) = self.nodes.get(node_id) else {
                continue;
            };
            if !node.pending_freight.is_empty() {
                continue;
            }
            let Some(storage) = self.storages.get(destination) else {
                continue;
            };

            for missing in node.producer.shortfall(storage) {
                let Some(origin) = self.find_supplier(missing, destination) else {
                    log::debug!(
                        "{}: no supplier for {} x{}",
                        self.name,
                        self.registry.name(missing.resource_type),
                        missing.amount
                    );
                    continue;
                };
                let reward = self.freight_rate.saturating_mul(missing.amount as u64);
                if let Err(e) = self.post_freight_contract(creator, missing, origin, destination, reward) {
                    log::warn!("{}: requisition failed: {e}", self.name);
                }
            }
        }
    }

    /// Withdraw postings from `node` that nobody has accepted and whose
    /// origin can no longer supply the reserved amount.
    fn withdraw_unreachable_requisitions(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get(node_id) else {
            return;
        };
        let stale: Vec<ContractId> = node
            .pending_freight
            .iter()
            .copied()
            .filter(|&c| {
                self.contracts.get(c).is_some_and(|contract| {
                    contract.status == ContractStatus::Posted
                        && contract.as_freight().is_some_and(|f| !self.can_supply(&f.reservation))
                })
            })
            .collect();
        for contract in stale {
            if let Err(e) = self.withdraw_contract(contract) {
                log::warn!("{}: could not withdraw {contract:?}: {e}", self.name);
            }
        }
    }

    /// First storage other than `exclude`, in planet then placement order,
    /// that holds at least `resource`.
    pub(crate) fn find_supplier(&self, resource: Resource, exclude: StorageId) -> Option<StorageId> {
        self.planets
            .values()
            .flat_map(|p| p.storages())
            .filter(|&s| s != exclude)
            .find(|&s| {
                self.storages
                    .get(s)
                    .is_some_and(|st| st.has_resource(resource.resource_type, resource.amount))
            })
    }

    pub(crate) fn can_supply(&self, reservation: &ResourceReservation) -> bool {
        self.storages.get(reservation.from).is_some_and(|s| {
            s.has_resource(reservation.resource.resource_type, reservation.resource.amount)
        })
    }

    // -----------------------------------------------------------------------
    // Phase 3: Dispatch
    // -----------------------------------------------------------------------

    fn phase_dispatch(&mut self) {
        let open: Vec<ContractId> = self.job_board.open_contracts().to_vec();

        for contract_id in open {
            let Some(contract) = self.contracts.get(contract_id) else {
                continue;
            };
            let kind = contract.kind_tag();
            let reservation = contract.as_freight().map(|f| f.reservation);

            // Cargo that is not there yet would only fail at loading.
            if reservation.is_some_and(|r| !self.can_supply(&r)) {
                self.report.unmatched_contracts += 1;
                continue;
            }

            let candidate = self
                .employees
                .iter()
                .find(|(_, e)| {
                    e.is_idle()
                        && e.company.is_some()
                        && e.accepts(kind)
                        && reservation.is_none_or(|r| {
                            e.role
                                .ship()
                                .is_some_and(|s| s.cargo_capacity >= r.resource.amount)
                        })
                })
                .map(|(id, _)| id);

            let Some(employee) = candidate else {
                self.report.unmatched_contracts += 1;
                continue;
            };
            if let Err(e) = self.accept_contract(contract_id, employee) {
                log::warn!("{}: dispatch of {contract_id:?} failed: {e}", self.name);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Freight
    // -----------------------------------------------------------------------

    fn phase_freight(&mut self, dt: Seconds) {
        let mut arrived = Vec::new();
        for employee in self.employees.values_mut() {
            let Some(haul) = employee.haul.as_mut() else {
                continue;
            };
            haul.remaining -= dt;
            if haul.remaining <= Seconds::ZERO {
                arrived.push(haul.contract);
            }
        }

        for contract in arrived {
            if let Err(e) = self.complete_contract(contract) {
                log::warn!("{}: delivery of {contract:?} failed: {e}", self.name);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 6: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self, dt: Seconds) {
        self.sim_state.tick += 1;
        self.sim_state.elapsed += dt;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Compute a deterministic hash of the current simulation state.
    pub(crate) fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);
        hasher.write_fixed64(self.sim_state.elapsed);

        // SlotMap iteration order is deterministic (slot order).
        for storage in self.storages.values() {
            for r in storage.resources() {
                hasher.write_u32(r.resource_type.0);
                hasher.write_u32(r.amount);
            }
        }
        for node in self.nodes.values() {
            match node.state {
                crate::industry::ProducerState::Idle => hasher.write_u32(0),
                crate::industry::ProducerState::Producing { remaining } => {
                    hasher.write_u32(1);
                    hasher.write_fixed64(remaining);
                }
            }
        }
        for contract in self.contracts.values() {
            hasher.write_u32(contract.status as u32);
            hasher.write_u32(contract.attempts);
        }
        for company in self.companies.values() {
            hasher.write_u64(company.ledger.balance as u64);
        }
        hasher.finish()
    }

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }
}

// ===========================================================================
// Tests
// ===========================================================================
