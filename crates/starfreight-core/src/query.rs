//! Read-only query API for inspecting a star system.
//!
//! System-wide resource queries aggregate over every planet in insertion
//! order. Snapshot types are owned copies, suitable for a host layer that
//! renders status panels without holding references into the simulation.

use crate::company::{Company, Employee, Ledger};
use crate::contract::{Contract, ContractKindTag, ContractStatus};
use crate::fixed::Seconds;
use crate::id::{CompanyId, ContractId, EmployeeId, NodeId, PlanetId, ResourceType, StorageId};
use crate::industry::{IndustryNode, ProducerState, StallReason};
use crate::job_board::JobBoard;
use crate::planet::Planet;
use crate::resource::Resource;
use crate::star::Star;
use crate::storage::StorageNode;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

// ---------------------------------------------------------------------------
// Location types
// ---------------------------------------------------------------------------

/// Where a stock of some resource type sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLocation {
    pub planet: PlanetId,
    pub storage: StorageId,
    pub amount: u32,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// A read-only view of one industry node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub producing: bool,
    /// Seconds left in the current cycle. Zero when idle.
    pub remaining: Seconds,
    pub stall: Option<StallReason>,
    pub cycles_completed: u64,
    /// Contents of the connected storage, if any.
    pub storage_contents: Vec<Resource>,
    pub pending_freight: usize,
}

/// A read-only view of one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub kind: ContractKindTag,
    pub status: ContractStatus,
    pub issuer: CompanyId,
    pub owner: Option<CompanyId>,
    pub fulfiller: Option<EmployeeId>,
    pub cargo: Option<Resource>,
    pub reward: u64,
    pub attempts: u32,
}

/// A read-only view of one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySnapshot {
    pub id: CompanyId,
    pub name: String,
    pub employees: usize,
    pub accepted: usize,
    pub outstanding: usize,
    pub ledger: Ledger,
}

impl Star {
    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id)
    }

    /// Planets and moons in insertion order.
    pub fn planets(&self) -> impl Iterator<Item = (PlanetId, &Planet)> + '_ {
        self.planets.iter()
    }

    pub fn storage(&self, id: StorageId) -> Option<&StorageNode> {
        self.storages.get(id)
    }

    /// Mutable access for seeding or draining stock from the host layer.
    pub fn storage_mut(&mut self, id: StorageId) -> Option<&mut StorageNode> {
        self.storages.get_mut(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&IndustryNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &IndustryNode)> + '_ {
        self.nodes.iter()
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(id)
    }

    pub fn employees(&self) -> impl Iterator<Item = (EmployeeId, &Employee)> + '_ {
        self.employees.iter()
    }

    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(id)
    }

    pub fn companies(&self) -> impl Iterator<Item = (CompanyId, &Company)> + '_ {
        self.companies.iter()
    }

    pub fn contract(&self, id: ContractId) -> Option<&Contract> {
        self.contracts.get(id)
    }

    pub fn job_board(&self) -> &JobBoard {
        &self.job_board
    }

    pub fn planet_count(&self) -> usize {
        self.planets.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }

    // -----------------------------------------------------------------------
    // System-wide resource queries
    // -----------------------------------------------------------------------

    /// Resource types with positive stock anywhere in the system. Each type
    /// appears once.
    pub fn resource_types_available(&self) -> BTreeSet<ResourceType> {
        self.planets
            .values()
            .flat_map(|p| p.resource_types_available(&self.storages))
            .collect()
    }

    /// Union of the resource types every planet's producers output.
    pub fn resource_types_produced(&self) -> BTreeSet<ResourceType> {
        self.planets
            .values()
            .flat_map(|p| p.resource_types_produced(&self.nodes))
            .collect()
    }

    /// Every stocked quantity, one entry per storage node per type, in
    /// planet then storage order. Equal quantities on different planets
    /// are all kept.
    pub fn resources_available(&self) -> Vec<Resource> {
        self.planets
            .values()
            .flat_map(|p| p.stored_resources(&self.storages))
            .collect()
    }

    /// Stock summed per type across the whole system.
    pub fn total_resources(&self) -> BTreeMap<ResourceType, u64> {
        let mut totals = BTreeMap::new();
        for r in self.resources_available() {
            *totals.entry(r.resource_type).or_insert(0) += r.amount as u64;
        }
        totals
    }

    /// True iff some single storage node holds at least `resource`.
    pub fn has_resource_amount(&self, resource: Resource) -> bool {
        self.resources_available()
            .iter()
            .any(|r| r.resource_type == resource.resource_type && r.amount >= resource.amount)
    }

    /// Where each resource type is stocked. Entries are keyed by storage
    /// identity, so two planets holding equal quantities never collide.
    pub fn resource_locations(&self) -> BTreeMap<ResourceType, Vec<ResourceLocation>> {
        let mut locations: BTreeMap<ResourceType, Vec<ResourceLocation>> = BTreeMap::new();
        for (planet_id, planet) in self.planets.iter() {
            for (storage, r) in planet.resource_locations(&self.storages) {
                locations.entry(r.resource_type).or_default().push(ResourceLocation {
                    planet: planet_id,
                    storage,
                    amount: r.amount,
                });
            }
        }
        locations
    }

    // -----------------------------------------------------------------------
    // Status text
    // -----------------------------------------------------------------------

    /// System status: name plus accepted and outstanding contract counts
    /// summed over every company.
    pub fn object_info(&self) -> String {
        let accepted: usize = self.companies.values().map(|c| c.accepted_contracts.len()).sum();
        let outstanding: usize = self
            .companies
            .values()
            .map(|c| c.outstanding_contracts.len())
            .sum();
        format!(
            "Name: {}\nAccepted contracts in system: {accepted}\nOutstanding contracts in system: {outstanding}",
            self.name
        )
    }

    /// Status text for an industry node: inputs, then outputs with cycle
    /// time.
    pub fn node_info(&self, id: NodeId) -> Option<String> {
        let node = self.nodes.get(id)?;
        let producer = &node.producer;
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = write!(out, "{}\nInputs:\n", node.name);
        for input in producer.inputs() {
            let _ = writeln!(
                out,
                "\tType: {}\tAmount: {}",
                self.registry.name(input.resource_type()),
                input.amount()
            );
        }
        out.push_str("Outputs:\n");
        for output in producer.outputs() {
            let _ = write!(
                out,
                "\tType: {}\n\tProduced per cycle: {}\n\tCycle time: {}\n",
                self.registry.name(output.resource_type()),
                output.amount(),
                producer.cycle_time()
            );
        }
        Some(out)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn snapshot_node(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(id)?;
        let remaining = match node.state {
            ProducerState::Idle => Seconds::ZERO,
            ProducerState::Producing { remaining } => remaining,
        };
        Some(NodeSnapshot {
            id,
            name: node.name.clone(),
            producing: node.producing(),
            remaining,
            stall: node.stall,
            cycles_completed: node.cycles_completed,
            storage_contents: node
                .storage
                .and_then(|s| self.storages.get(s))
                .map(|s| s.resources())
                .unwrap_or_default(),
            pending_freight: node.pending_freight.len(),
        })
    }

    pub fn snapshot_all_nodes(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .keys()
            .filter_map(|id| self.snapshot_node(id))
            .collect()
    }

    pub fn snapshot_contract(&self, id: ContractId) -> Option<ContractSnapshot> {
        let c = self.contracts.get(id)?;
        Some(ContractSnapshot {
            id,
            kind: c.kind_tag(),
            status: c.status,
            issuer: c.issuer,
            owner: c.owner,
            fulfiller: c.fulfiller,
            cargo: c.as_freight().map(|f| f.reservation.resource),
            reward: c.reward(),
            attempts: c.attempts,
        })
    }

    /// Snapshots of the contracts currently on the job board, oldest first.
    pub fn snapshot_open_contracts(&self) -> Vec<ContractSnapshot> {
        self.job_board
            .open_contracts()
            .iter()
            .filter_map(|&id| self.snapshot_contract(id))
            .collect()
    }

    pub fn snapshot_company(&self, id: CompanyId) -> Option<CompanySnapshot> {
        let c = self.companies.get(id)?;
        Some(CompanySnapshot {
            id,
            name: c.name.clone(),
            employees: c.roster.len(),
            accepted: c.accepted_contracts.len(),
            outstanding: c.outstanding_contracts.len(),
            ledger: c.ledger.clone(),
        })
    }
}
