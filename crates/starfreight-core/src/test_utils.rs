//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::company::ShipAttributes;
use crate::fixed::{Seconds, seconds};
use crate::id::*;
use crate::industry::{Extractor, Producer, Recipe};
use crate::planet::IndustryRef;
use crate::registry::{ResourceRegistry, ResourceRegistryBuilder};
use crate::resource::{Resource, ResourceFlow};
use crate::sim::SimulationStrategy;
use crate::star::Star;
use crate::storage::StorageNode;

// ===========================================================================
// Resource types
// ===========================================================================

pub fn ore() -> ResourceType {
    ResourceType(0)
}
pub fn fuel() -> ResourceType {
    ResourceType(1)
}
pub fn parts() -> ResourceType {
    ResourceType(2)
}

/// Registry naming `ore`, `fuel` and `parts` with the ids above.
pub fn registry() -> ResourceRegistry {
    let mut b = ResourceRegistryBuilder::new();
    for name in ["ore", "fuel", "parts"] {
        // Names are distinct and non-empty.
        let _ = b.register(name);
    }
    b.build()
}

pub fn flow(resource_type: ResourceType, amount: u32) -> ResourceFlow {
    ResourceFlow::new(resource_type, amount).expect("test flows are positive")
}

// ===========================================================================
// Producers
// ===========================================================================

/// Extracts `amount` ore every `cycle` seconds.
pub fn ore_mine(amount: u32, cycle: u32) -> Producer {
    Producer::Extraction(Extractor::new(vec![flow(ore(), amount)], seconds(cycle)).expect("positive cycle"))
}

/// Refines `ore_in` ore into `fuel_out` fuel every `cycle` seconds.
pub fn ore_to_fuel(ore_in: u32, fuel_out: u32, cycle: u32) -> Producer {
    Producer::Production(
        Recipe::new(vec![flow(ore(), ore_in)], vec![flow(fuel(), fuel_out)], seconds(cycle))
            .expect("positive cycle"),
    )
}

/// Builds parts from ore and fuel.
pub fn parts_fab(ore_in: u32, fuel_in: u32, cycle: u32) -> Producer {
    Producer::Production(
        Recipe::new(
            vec![flow(ore(), ore_in), flow(fuel(), fuel_in)],
            vec![flow(parts(), 1)],
            seconds(cycle),
        )
        .expect("positive cycle"),
    )
}

pub fn ship_attrs(cargo_capacity: u32, trip_time: u32) -> ShipAttributes {
    ShipAttributes {
        cargo_capacity,
        trip_time: seconds(trip_time),
    }
}

// ===========================================================================
// Stars
// ===========================================================================

/// A star with one-second ticks and the test registry.
pub fn empty_star() -> Star {
    empty_star_with(SimulationStrategy::Tick {
        timestep: Seconds::ONE,
    })
}

pub fn empty_star_with(strategy: SimulationStrategy) -> Star {
    Star::new("Test", registry(), strategy)
}

/// A posted freight contract ready to be accepted.
pub struct FreightFixture {
    pub star: Star,
    pub planet: PlanetId,
    /// Holds the ore to be hauled.
    pub origin: StorageId,
    /// Storage of the refinery.
    pub destination: StorageId,
    /// The refinery (ore -> fuel, 2 -> 1, 3 s) that created the contract.
    pub node: NodeId,
    pub creator: EmployeeId,
    pub production: CompanyId,
    pub transport: CompanyId,
    /// Capacity 10, trip time 2 s.
    pub ship: EmployeeId,
    pub contract: ContractId,
}

/// `origin_ore` ore at the origin; the refinery asks for `amount` of it
/// with a reward of one per unit.
pub fn freight_fixture(origin_ore: u32, amount: u32) -> FreightFixture {
    let mut star = empty_star();
    let planet = star.add_planet("Test 1");
    let origin = star
        .add_storage(planet, StorageNode::with_stock([Resource::new(ore(), origin_ore)]))
        .expect("planet exists");
    let destination = star
        .add_storage(planet, StorageNode::new())
        .expect("planet exists");
    let node = star
        .add_industry_node(planet, "Refinery", ore_to_fuel(2, 1, 3), Some(destination))
        .expect("storage exists");

    let production = star.add_company("Production");
    let transport = star.add_company("Transport");
    let creator = star
        .hire_industry(production, IndustryRef::Producer(node))
        .expect("fresh node");
    let ship = star.add_ship("Hauler", ship_attrs(10, 2));
    star.hire(transport, ship).expect("fresh ship");

    let contract = star
        .post_freight_contract(creator, Resource::new(ore(), amount), origin, destination, amount as u64)
        .expect("valid contract");

    FreightFixture {
        star,
        planet,
        origin,
        destination,
        node,
        creator,
        production,
        transport,
        ship,
        contract,
    }
}

/// A small economy: a mine and a storage on one planet, a refinery with its
/// own storage on another, a production company and `ships` haulers.
pub struct Economy {
    pub star: Star,
    pub mine: NodeId,
    pub refinery: NodeId,
    pub mine_storage: StorageId,
    pub refinery_storage: StorageId,
    pub production: CompanyId,
    pub transport: CompanyId,
}

pub fn economy(ships: usize) -> Economy {
    economy_with(
        SimulationStrategy::Tick {
            timestep: Seconds::ONE,
        },
        ships,
    )
}

pub fn economy_with(strategy: SimulationStrategy, ships: usize) -> Economy {
    let mut star = empty_star_with(strategy);
    let p1 = star.add_planet("Test 1");
    let p2 = star.add_planet("Test 2");
    let mine_storage = star.add_storage(p1, StorageNode::new()).expect("planet exists");
    let refinery_storage = star.add_storage(p2, StorageNode::new()).expect("planet exists");
    let mine = star
        .add_industry_node(p1, "Mine", ore_mine(2, 1), Some(mine_storage))
        .expect("storage exists");
    let refinery = star
        .add_industry_node(p2, "Refinery", ore_to_fuel(2, 1, 2), Some(refinery_storage))
        .expect("storage exists");

    let production = star.add_company("Production");
    let transport = star.add_company("Transport");
    for site in [
        IndustryRef::Producer(mine),
        IndustryRef::Producer(refinery),
        IndustryRef::Storage(mine_storage),
        IndustryRef::Storage(refinery_storage),
    ] {
        star.hire_industry(production, site).expect("fresh site");
    }
    for i in 0..ships {
        let ship = star.add_ship(format!("Hauler {i}"), ship_attrs(10, 2));
        star.hire(transport, ship).expect("fresh ship");
    }

    Economy {
        star,
        mine,
        refinery,
        mine_storage,
        refinery_storage,
        production,
        transport,
    }
}
