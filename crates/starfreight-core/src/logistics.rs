//! Contract lifecycle operations on the star: acceptance with cargo
//! loading, completion with delivery and notification, failure with cargo
//! return and re-posting, and withdrawal.
//!
//! These operations touch several arenas at once (contract, board,
//! companies, employees, nodes, storage), which is why they live on
//! [`Star`] rather than on [`crate::contract::Contract`].

use crate::company::Haul;
use crate::contract::{ContractError, ContractStatus};
use crate::event::Event;
use crate::id::{ContractId, EmployeeId};
use crate::star::{Star, StarError};

impl Star {
    /// `employee` accepts an open contract on behalf of its company.
    ///
    /// Freight cargo is loaded from the origin storage immediately. If the
    /// origin cannot supply it, the contract goes through the failure path
    /// (back on the board, attempt counted) and the storage error is
    /// returned.
    pub fn accept_contract(&mut self, contract_id: ContractId, employee: EmployeeId) -> Result<(), StarError> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or(ContractError::NotFound(contract_id))?;
        let emp = self
            .employees
            .get_mut(employee)
            .ok_or(ContractError::EmployeeNotFound(employee))?;

        if !emp.is_idle() {
            return Err(ContractError::EmployeeBusy(employee).into());
        }
        let company_id = emp.company.ok_or(ContractError::Unemployed(employee))?;
        let kind = contract.kind_tag();
        if !emp.accepts(kind) {
            return Err(ContractError::NotAcceptable { employee, kind }.into());
        }
        let freight = contract.as_freight().cloned();
        let ship = if freight.is_some() {
            let ship = *emp
                .role
                .ship()
                .ok_or(ContractError::NotAcceptable { employee, kind })?;
            if let Some(f) = &freight
                && f.reservation.resource.amount > ship.cargo_capacity
            {
                return Err(ContractError::CargoTooLarge {
                    amount: f.reservation.resource.amount,
                    capacity: ship.cargo_capacity,
                }
                .into());
            }
            Some(ship)
        } else {
            None
        };
        let company = self
            .companies
            .get_mut(company_id)
            .ok_or(ContractError::CompanyNotFound(company_id))?;

        contract.mark_as_accepted(contract_id, &mut self.job_board, company_id)?;
        contract.fulfiller = Some(employee);
        company.accepted_contracts.push(contract_id);
        emp.contract = Some(contract_id);

        self.report.contracts_accepted += 1;
        self.event_bus.emit(Event::ContractAccepted {
            contract: contract_id,
            owner: company_id,
            employee,
            tick: self.sim_state.tick,
        });
        log::debug!("{}: {} accepted {contract_id:?}", self.name, emp.name);

        let (Some(freight), Some(ship)) = (freight, ship) else {
            return Ok(());
        };
        let cargo = freight.reservation.resource;
        let origin = freight.reservation.from;
        let loaded = match self.storages.get_mut(origin) {
            Some(storage) => storage
                .take(cargo.resource_type, cargo.amount)
                .map_err(ContractError::from),
            None => Err(ContractError::StorageNotFound(origin)),
        };
        match loaded {
            Ok(()) => {
                if let Some(emp) = self.employees.get_mut(employee) {
                    emp.haul = Some(Haul {
                        contract: contract_id,
                        cargo,
                        remaining: ship.trip_time,
                    });
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("{}: loading {contract_id:?} failed: {e}", self.name);
                self.fail_contract(contract_id)?;
                Err(e.into())
            }
        }
    }

    /// Finish an accepted contract.
    ///
    /// Cargo still aboard the fulfilling ship is put into the destination
    /// storage. The owner is paid, the issuer is notified and charged, and
    /// if the creator is a production node it is notified too. The
    /// fulfilling employee is released.
    pub fn complete_contract(&mut self, contract_id: ContractId) -> Result<(), StarError> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or(ContractError::NotFound(contract_id))?;
        if contract.status != ContractStatus::Accepted {
            return Err(ContractError::InvalidTransition {
                from: contract.status,
                action: "complete",
            }
            .into());
        }
        let owner_id = contract.owner.ok_or(ContractError::InvalidTransition {
            from: contract.status,
            action: "complete",
        })?;
        let owner = self
            .companies
            .get_mut(owner_id)
            .ok_or(ContractError::CompanyNotFound(owner_id))?;

        // Deliver cargo. If the destination cannot take it, the ship keeps
        // it and the contract stays accepted.
        let destination = contract.as_freight().map(|f| f.reservation.to);
        let haul = contract
            .fulfiller
            .and_then(|e| self.employees.get(e))
            .and_then(|e| e.haul)
            .filter(|h| h.contract == contract_id);
        if let (Some(haul), Some(to)) = (haul, destination) {
            let storage = self
                .storages
                .get_mut(to)
                .ok_or(ContractError::StorageNotFound(to))?;
            storage
                .put(haul.cargo.resource_type, haul.cargo.amount)
                .map_err(ContractError::from)?;
        }

        let released = contract.mark_as_complete(contract_id, owner)?;
        let reward = contract.reward();
        owner.record_fulfilment(reward);
        if let Some(emp) = released.and_then(|e| self.employees.get_mut(e)) {
            emp.contract = None;
            emp.haul = None;
        }

        if let Some(issuer) = self.companies.get_mut(contract.issuer) {
            issuer.notify_of_contract_completion(contract_id, reward);
        }
        let listener = self
            .employees
            .get(contract.creator)
            .and_then(|e| e.role.completion_listener());
        if let Some(node) = listener.and_then(|n| self.nodes.get_mut(n)) {
            node.notify_of_contract_completion(contract_id);
        }

        self.report.contracts_completed += 1;
        self.event_bus.emit(Event::ContractCompleted {
            contract: contract_id,
            tick: self.sim_state.tick,
        });
        log::info!("{}: contract {contract_id:?} completed", self.name);
        Ok(())
    }

    /// The fulfilling employee could not finish: cargo goes back to the
    /// origin, the employee is freed and the contract returns to the board.
    pub fn fail_contract(&mut self, contract_id: ContractId) -> Result<(), StarError> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or(ContractError::NotFound(contract_id))?;
        if contract.status != ContractStatus::Accepted {
            return Err(ContractError::InvalidTransition {
                from: contract.status,
                action: "fail",
            }
            .into());
        }
        let owner_id = contract.owner.ok_or(ContractError::InvalidTransition {
            from: contract.status,
            action: "fail",
        })?;
        let owner = self
            .companies
            .get_mut(owner_id)
            .ok_or(ContractError::CompanyNotFound(owner_id))?;

        // Return cargo first; if the origin cannot take it back nothing
        // changes.
        let origin = contract.as_freight().map(|f| f.reservation.from);
        let haul = contract
            .fulfiller
            .and_then(|e| self.employees.get(e))
            .and_then(|e| e.haul)
            .filter(|h| h.contract == contract_id);
        if let (Some(haul), Some(from)) = (haul, origin)
            && let Some(storage) = self.storages.get_mut(from)
        {
            storage
                .put(haul.cargo.resource_type, haul.cargo.amount)
                .map_err(ContractError::from)?;
        }

        let released = contract.mark_as_unable_to_complete(contract_id, owner, &mut self.job_board)?;
        if let Some(emp) = released.and_then(|e| self.employees.get_mut(e)) {
            emp.contract = None;
            emp.haul = None;
        }
        if let Some(issuer) = self.companies.get_mut(contract.issuer) {
            issuer.notify_of_contract_failure(contract_id);
        }

        self.report.contracts_failed += 1;
        self.event_bus.emit(Event::ContractFailed {
            contract: contract_id,
            attempts: contract.attempts,
            tick: self.sim_state.tick,
        });
        log::warn!(
            "{}: contract {contract_id:?} failed (attempt {}), re-posted",
            self.name,
            contract.attempts
        );
        Ok(())
    }

    /// Take an unaccepted contract off the board for good. The issuer stops
    /// tracking it and so does the creating node.
    pub fn withdraw_contract(&mut self, contract_id: ContractId) -> Result<(), StarError> {
        let contract = self
            .contracts
            .get_mut(contract_id)
            .ok_or(ContractError::NotFound(contract_id))?;
        contract.withdraw(contract_id, &mut self.job_board)?;

        if let Some(issuer) = self.companies.get_mut(contract.issuer) {
            issuer.outstanding_contracts.retain(|&c| c != contract_id);
        }
        let listener = self
            .employees
            .get(contract.creator)
            .and_then(|e| e.role.completion_listener());
        if let Some(node) = listener.and_then(|n| self.nodes.get_mut(n)) {
            node.pending_freight.retain(|&c| c != contract_id);
        }

        self.event_bus.emit(Event::ContractWithdrawn {
            contract: contract_id,
            tick: self.sim_state.tick,
        });
        log::debug!("{}: contract {contract_id:?} withdrawn", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::company::{Employee, EmployeeRole, Ledger};
    use crate::contract::{ContractError, ContractKindTag, ContractStatus};
    use crate::resource::Resource;
    use crate::star::StarError;
    use crate::storage::StorageError;
    use crate::test_utils::*;

    #[test]
    fn accept_loads_cargo_and_claims_contract() {
        let mut s = freight_fixture(10, 4);
        s.star.accept_contract(s.contract, s.ship).unwrap();

        assert!(!s.star.job_board().contains(s.contract));
        assert_eq!(s.star.storage(s.origin).unwrap().quantity(ore()), 6);
        let ship = s.star.employee(s.ship).unwrap();
        assert_eq!(ship.contract, Some(s.contract));
        assert_eq!(ship.haul.unwrap().cargo, Resource::new(ore(), 4));
        assert_eq!(s.star.company(s.transport).unwrap().accepted_contracts, vec![s.contract]);
        assert_eq!(s.star.contract(s.contract).unwrap().owner, Some(s.transport));
    }

    #[test]
    fn busy_or_undersized_ships_are_rejected() {
        let mut s = freight_fixture(10, 4);
        let tiny = s.star.add_ship("Skiff", ship_attrs(2, 1));
        s.star.hire(s.transport, tiny).unwrap();
        assert_eq!(
            s.star.accept_contract(s.contract, tiny),
            Err(StarError::Contract(ContractError::CargoTooLarge {
                amount: 4,
                capacity: 2,
            }))
        );

        s.star.accept_contract(s.contract, s.ship).unwrap();
        let second = s
            .star
            .post_freight_contract(s.creator, Resource::new(ore(), 1), s.origin, s.destination, 1)
            .unwrap();
        assert_eq!(
            s.star.accept_contract(second, s.ship),
            Err(StarError::Contract(ContractError::EmployeeBusy(s.ship)))
        );
    }

    #[test]
    fn full_destination_keeps_cargo_aboard() {
        let mut s = freight_fixture(10, 4);
        s.star.storage_mut(s.destination).unwrap().put(ore(), u32::MAX - 1).unwrap();
        s.star.accept_contract(s.contract, s.ship).unwrap();

        let err = s.star.complete_contract(s.contract).unwrap_err();
        assert!(matches!(
            err,
            StarError::Contract(ContractError::Storage(StorageError::Overflow { .. }))
        ));
        assert_eq!(s.star.contract(s.contract).unwrap().status, ContractStatus::Accepted);
        assert_eq!(
            s.star.employee(s.ship).unwrap().haul.unwrap().cargo,
            Resource::new(ore(), 4)
        );
        assert_eq!(s.star.storage(s.destination).unwrap().quantity(ore()), u32::MAX - 1);

        // Room frees up; the delivery goes through in full.
        s.star.storage_mut(s.destination).unwrap().take(ore(), 10).unwrap();
        s.star.complete_contract(s.contract).unwrap();
        assert_eq!(s.star.storage(s.destination).unwrap().quantity(ore()), u32::MAX - 7);
        assert!(s.star.employee(s.ship).unwrap().haul.is_none());
    }

    #[test]
    fn full_origin_refuses_returned_cargo() {
        let mut s = freight_fixture(10, 4);
        s.star.accept_contract(s.contract, s.ship).unwrap();
        s.star.storage_mut(s.origin).unwrap().put(ore(), u32::MAX - 6).unwrap();

        assert!(s.star.fail_contract(s.contract).is_err());
        assert_eq!(s.star.contract(s.contract).unwrap().status, ContractStatus::Accepted);
        assert_eq!(s.star.storage(s.origin).unwrap().quantity(ore()), u32::MAX);
        assert!(s.star.employee(s.ship).unwrap().haul.is_some());
    }

    #[test]
    fn complete_delivers_and_settles() {
        let mut s = freight_fixture(10, 4);
        s.star.accept_contract(s.contract, s.ship).unwrap();
        s.star.complete_contract(s.contract).unwrap();

        assert_eq!(s.star.storage(s.destination).unwrap().quantity(ore()), 4);
        assert_eq!(s.star.contract(s.contract).unwrap().status, ContractStatus::Completed);
        assert!(s.star.employee(s.ship).unwrap().is_idle());
        assert!(s.star.employee(s.ship).unwrap().haul.is_none());

        let transport = s.star.company(s.transport).unwrap();
        assert!(transport.accepted_contracts.is_empty());
        assert_eq!(transport.ledger.revenue, 4);

        let production = s.star.company(s.production).unwrap();
        assert!(production.outstanding_contracts.is_empty());
        assert_eq!(production.ledger.balance, -4);
        assert!(s.star.node(s.node).unwrap().pending_freight.is_empty());
    }

    #[test]
    fn complete_requires_acceptance() {
        let mut s = freight_fixture(10, 4);
        let err = s.star.complete_contract(s.contract).unwrap_err();
        assert_eq!(
            err,
            StarError::Contract(ContractError::InvalidTransition {
                from: ContractStatus::Posted,
                action: "complete",
            })
        );
    }

    #[test]
    fn fail_returns_cargo_and_reposts() {
        let mut s = freight_fixture(10, 4);
        s.star.accept_contract(s.contract, s.ship).unwrap();
        s.star.fail_contract(s.contract).unwrap();

        assert_eq!(s.star.storage(s.origin).unwrap().quantity(ore()), 10);
        assert!(s.star.job_board().contains(s.contract));
        let contract = s.star.contract(s.contract).unwrap();
        assert_eq!(contract.status, ContractStatus::Posted);
        assert_eq!(contract.attempts, 1);
        assert_eq!(contract.owner, None);
        assert_eq!(contract.fulfiller, None);
        assert!(s.star.employee(s.ship).unwrap().is_idle());
        assert!(s.star.company(s.transport).unwrap().accepted_contracts.is_empty());
        assert_eq!(
            s.star.company(s.production).unwrap().ledger,
            Ledger {
                failed: 1,
                ..Ledger::default()
            }
        );
        // Still outstanding for the issuer.
        assert_eq!(
            s.star.company(s.production).unwrap().outstanding_contracts,
            vec![s.contract]
        );
    }

    #[test]
    fn load_failure_runs_failure_path() {
        let mut s = freight_fixture(3, 4);
        let err = s.star.accept_contract(s.contract, s.ship).unwrap_err();
        assert_eq!(
            err,
            StarError::Contract(ContractError::Storage(StorageError::InsufficientStock {
                resource_type: ore(),
                requested: 4,
                available: 3,
            }))
        );
        assert!(s.star.job_board().contains(s.contract));
        assert_eq!(s.star.contract(s.contract).unwrap().attempts, 1);
        assert!(s.star.employee(s.ship).unwrap().is_idle());
        assert_eq!(s.star.storage(s.origin).unwrap().quantity(ore()), 3);
    }

    #[test]
    fn withdraw_forgets_posting() {
        let mut s = freight_fixture(10, 4);
        s.star.withdraw_contract(s.contract).unwrap();
        assert!(!s.star.job_board().contains(s.contract));
        assert!(s.star.company(s.production).unwrap().outstanding_contracts.is_empty());
        assert!(s.star.node(s.node).unwrap().pending_freight.is_empty());
        assert!(s.star.accept_contract(s.contract, s.ship).is_err());
    }

    #[test]
    fn ships_without_freight_registration_cannot_accept() {
        let mut s = freight_fixture(10, 4);
        let clerk = s
            .star
            .add_employee(Employee::new("Clerk", EmployeeRole::Ship(ship_attrs(100, 1))));
        s.star.hire(s.transport, clerk).unwrap();
        assert_eq!(
            s.star.accept_contract(s.contract, clerk),
            Err(StarError::Contract(ContractError::NotAcceptable {
                employee: clerk,
                kind: ContractKindTag::Freight,
            }))
        );
    }
}
