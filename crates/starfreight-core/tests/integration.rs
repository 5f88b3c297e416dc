//! End-to-end tests: production chains, requisition, dispatch and freight
//! running together through the six-phase step.

use starfreight_core::contract::ContractStatus;
use starfreight_core::event::{Event, EventKind};
use starfreight_core::fixed::{Seconds, seconds};
use starfreight_core::industry::StallReason;
use starfreight_core::planet::IndustryRef;
use starfreight_core::resource::Resource;
use starfreight_core::sim::SimulationStrategy;
use starfreight_core::star::Star;
use starfreight_core::storage::StorageNode;
use starfreight_core::test_utils::*;
use std::cell::RefCell;
use std::rc::Rc;

fn run(star: &mut Star, steps: usize) {
    for _ in 0..steps {
        star.step();
    }
}

// ---------------------------------------------------------------------------
// Production cycle
// ---------------------------------------------------------------------------

#[test]
fn production_cycle_deducts_up_front_and_credits_at_end() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let s = star
        .add_storage(p, StorageNode::with_stock([Resource::new(ore(), 2)]))
        .unwrap();
    let n = star
        .add_industry_node(p, "Works", ore_to_fuel(2, 1, 3), Some(s))
        .unwrap();

    star.step();
    assert!(star.node(n).unwrap().producing());
    assert_eq!(star.storage(s).unwrap().quantity(ore()), 0);
    assert_eq!(star.storage(s).unwrap().quantity(fuel()), 0);

    run(&mut star, 2);
    assert!(star.node(n).unwrap().producing());
    assert_eq!(star.storage(s).unwrap().quantity(fuel()), 0);

    star.step();
    assert!(!star.node(n).unwrap().producing());
    assert_eq!(star.storage(s).unwrap().quantity(ore()), 0);
    assert_eq!(star.storage(s).unwrap().quantity(fuel()), 1);
    assert_eq!(star.node(n).unwrap().cycles_completed, 1);
}

#[test]
fn starved_node_never_starts() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let s = star
        .add_storage(p, StorageNode::with_stock([Resource::new(ore(), 1)]))
        .unwrap();
    let n = star
        .add_industry_node(p, "Works", ore_to_fuel(2, 1, 3), Some(s))
        .unwrap();
    let before = star.storage(s).unwrap().clone();

    run(&mut star, 20);
    let node = star.node(n).unwrap();
    assert!(!node.producing());
    assert_eq!(node.stall, Some(StallReason::MissingInputs));
    assert_eq!(star.storage(s).unwrap(), &before);
    // Unemployed nodes do not requisition.
    assert!(star.job_board().is_empty());
}

#[test]
fn node_without_storage_is_a_no_op() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let n = star.add_industry_node(p, "Idle mine", ore_mine(1, 1), None).unwrap();
    run(&mut star, 5);
    assert_eq!(star.node(n).unwrap().stall, Some(StallReason::NoStorage));
    assert!(star.resources_available().is_empty());
}

#[test]
fn shared_storage_serves_two_nodes() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let s = star.add_storage(p, StorageNode::new()).unwrap();
    star.add_industry_node(p, "Mine", ore_mine(2, 1), Some(s)).unwrap();
    let works = star
        .add_industry_node(p, "Works", ore_to_fuel(2, 1, 1), Some(s))
        .unwrap();
    run(&mut star, 12);
    assert!(star.node(works).unwrap().cycles_completed > 0);
    assert!(star.storage(s).unwrap().quantity(fuel()) > 0);
}

// ---------------------------------------------------------------------------
// Requisition, dispatch, freight
// ---------------------------------------------------------------------------

#[test]
fn starved_refinery_gets_ore_by_freight() {
    let mut e = economy(1);

    // Tick 0 mines, tick 1 requisitions and dispatches, tick 2 delivers,
    // tick 3 starts refining, tick 5 finishes.
    run(&mut e.star, 6);

    assert_eq!(e.star.storage(e.refinery_storage).unwrap().quantity(fuel()), 1);
    assert_eq!(e.star.node(e.refinery).unwrap().cycles_completed, 1);
    let transport = e.star.company(e.transport).unwrap();
    assert_eq!(transport.ledger.fulfilled, 1);
    assert_eq!(transport.ledger.revenue, 2);
    let production = e.star.company(e.production).unwrap();
    assert_eq!(production.ledger.completed, 1);
    assert_eq!(production.ledger.balance, -2);
    assert!(production.outstanding_contracts.is_empty());
}

#[test]
fn requisition_posts_once_while_pending() {
    let mut e = economy(0);
    run(&mut e.star, 10);

    // No ships: one contract waits; the node does not spam the board.
    assert_eq!(e.star.job_board().len(), 1);
    let open = e.star.snapshot_open_contracts();
    assert_eq!(open[0].cargo, Some(Resource::new(ore(), 2)));
    assert_eq!(e.star.node(e.refinery).unwrap().pending_freight.len(), 1);

    let report = e.star.step();
    assert_eq!(report.reports[0].unmatched_contracts, 1);
}

#[test]
fn idle_sites_never_take_freight() {
    let mut e = economy(0);
    run(&mut e.star, 10);

    // Four hired, idle site employees, none of which accepts freight.
    assert_eq!(e.star.employee_count(), 4);
    assert!(e.star.employees().all(|(_, emp)| emp.is_idle()));
    let open = e.star.job_board().open_contracts()[0];
    assert_eq!(e.star.contract(open).unwrap().status, ContractStatus::Posted);

    let ship = e.star.add_ship("Late hauler", ship_attrs(10, 2));
    e.star.hire(e.transport, ship).unwrap();
    e.star.step();
    assert_eq!(e.star.employee(ship).unwrap().contract, Some(open));
}

#[test]
fn oversized_freight_stays_unmatched() {
    let mut s = freight_fixture(50, 20);
    // The only ship carries 10.
    let report = s.star.step();
    assert_eq!(report.reports[0].unmatched_contracts, 1);
    assert!(s.star.job_board().contains(s.contract));
    assert!(s.star.employee(s.ship).unwrap().is_idle());
}

#[test]
fn dispatch_prefers_oldest_contract() {
    let mut s = freight_fixture(50, 4);
    let newer = s
        .star
        .post_freight_contract(s.creator, Resource::new(ore(), 1), s.origin, s.destination, 1)
        .unwrap();
    s.star.step();
    assert_eq!(s.star.employee(s.ship).unwrap().contract, Some(s.contract));
    assert!(s.star.job_board().contains(newer));
}

#[test]
fn haul_takes_trip_time() {
    let mut s = freight_fixture(10, 4);
    // Trip time 2 s: loaded and one second of travel in the first step.
    s.star.step();
    assert_eq!(s.star.contract(s.contract).unwrap().status, ContractStatus::Accepted);
    assert_eq!(s.star.storage(s.destination).unwrap().quantity(ore()), 0);
    s.star.step();
    assert_eq!(s.star.contract(s.contract).unwrap().status, ContractStatus::Completed);
    assert_eq!(s.star.storage(s.destination).unwrap().quantity(ore()), 4);
    assert_eq!(s.star.storage(s.origin).unwrap().quantity(ore()), 6);
}

#[test]
fn failed_haul_is_retried() {
    let mut e = economy(1);
    run(&mut e.star, 2);
    let (_, ship) = e
        .star
        .employees()
        .find(|(_, emp)| emp.haul.is_some())
        .expect("a ship is hauling");
    let contract = ship.contract.unwrap();

    e.star.fail_contract(contract).unwrap();
    assert_eq!(e.star.storage(e.mine_storage).unwrap().quantity(ore()), 2);
    assert!(e.star.job_board().contains(contract));

    run(&mut e.star, 2);
    let c = e.star.contract(contract).unwrap();
    assert_eq!(c.status, ContractStatus::Completed);
    assert_eq!(c.attempts, 1);
    assert_eq!(e.star.company(e.production).unwrap().ledger.failed, 1);
}

#[test]
fn unreachable_requisition_is_withdrawn() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let depot = star
        .add_storage(p, StorageNode::with_stock([Resource::new(ore(), 2)]))
        .unwrap();
    let works_storage = star.add_storage(p, StorageNode::new()).unwrap();
    let works = star
        .add_industry_node(p, "Works", ore_to_fuel(2, 1, 1), Some(works_storage))
        .unwrap();
    let company = star.add_company("Production");
    star.hire_industry(company, IndustryRef::Producer(works)).unwrap();

    // No ships: the contract is posted and waits.
    star.step();
    let posted = star.node(works).unwrap().pending_freight[0];

    // The depot is emptied by someone else.
    star.storage_mut(depot).unwrap().take(ore(), 2).unwrap();
    star.step();

    assert_eq!(star.contract(posted).unwrap().status, ContractStatus::Withdrawn);
    assert!(star.job_board().is_empty());
    assert!(star.company(company).unwrap().outstanding_contracts.is_empty());
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn lifecycle_events_are_delivered() {
    let mut e = economy(1);
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::ContractPosted,
        EventKind::ContractAccepted,
        EventKind::ContractCompleted,
    ] {
        let l = log.clone();
        e.star.event_bus.on(kind, Box::new(move |ev| l.borrow_mut().push(ev.kind())));
    }

    run(&mut e.star, 3);
    assert_eq!(
        *log.borrow(),
        vec![
            EventKind::ContractPosted,
            EventKind::ContractAccepted,
            EventKind::ContractCompleted,
        ]
    );
}

#[test]
fn stall_event_fires_on_entry_only() {
    let mut star = empty_star();
    let p = star.add_planet("Test 1");
    let s = star.add_storage(p, StorageNode::new()).unwrap();
    star.add_industry_node(p, "Works", ore_to_fuel(2, 1, 1), Some(s))
        .unwrap();
    let stalls = Rc::new(RefCell::new(0));
    let c = stalls.clone();
    star.event_bus.on(
        EventKind::NodeStalled,
        Box::new(move |ev| {
            if let Event::NodeStalled { reason, .. } = ev {
                assert_eq!(*reason, StallReason::MissingInputs);
                *c.borrow_mut() += 1;
            }
        }),
    );
    run(&mut star, 10);
    assert_eq!(*stalls.borrow(), 1);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn identical_systems_hash_identically() {
    let mut a = economy(3);
    let mut b = economy(3);
    for _ in 0..50 {
        a.star.step();
        b.star.step();
        assert_eq!(a.star.state_hash(), b.star.state_hash());
    }
}

#[test]
fn delta_mode_matches_tick_mode() {
    let mut tick = economy(2);
    let mut delta = economy_with(
        SimulationStrategy::Delta {
            fixed_timestep: seconds(1),
        },
        2,
    );

    run(&mut tick.star, 10);
    // Half-second frames: two frames per step.
    let mut steps = 0;
    for _ in 0..20 {
        steps += delta.star.advance(Seconds::from_num(0.5)).steps_run;
    }
    assert_eq!(steps, 10);
    assert_eq!(delta.star.state_hash(), tick.star.state_hash());
}
