//! Contracts: postable units of work and their lifecycle.
//!
//! A contract is created by an employee on behalf of its company (the
//! issuer), posted on a [`JobBoard`], accepted by another company (the
//! owner) whose employee fulfils it, and finally completed. A failed
//! fulfilment returns the contract to the board.
//!
//! ```text
//! Created --post--> Posted --accept--> Accepted --complete--> Completed
//!                     ^  |                |
//!                     |  +--withdraw--> Withdrawn
//!                     +-----unable to complete
//! ```
//!
//! Lifecycle methods take their collaborators explicitly and only touch
//! the contract, the board and the owning company. Notifying the issuer
//! and the creating node is done by [`crate::star::Star`], which owns all
//! of them.

use crate::company::Company;
use crate::id::{CompanyId, ContractId, EmployeeId, StorageId};
use crate::job_board::JobBoard;
use crate::resource::Resource;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Contract kinds
// ---------------------------------------------------------------------------

/// Discriminant for contract kinds, used for employee capability matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractKindTag {
    Freight,
}

/// Implemented by every contract payload type so employees can register
/// "I accept contracts of kind K" generically.
pub trait ContractType {
    const KIND: ContractKindTag;
}

/// What is being moved, and from where to where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReservation {
    pub resource: Resource,
    pub from: StorageId,
    pub to: StorageId,
}

/// Transport of a reserved resource quantity between two storage nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreightContract {
    pub reservation: ResourceReservation,
    /// Paid by the issuer to the owner on completion.
    pub reward: u64,
}

impl ContractType for FreightContract {
    const KIND: ContractKindTag = ContractKindTag::Freight;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Freight(FreightContract),
}

impl ContractKind {
    pub fn tag(&self) -> ContractKindTag {
        match self {
            ContractKind::Freight(_) => ContractKindTag::Freight,
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle position of a contract. `Completed` and `Withdrawn` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Created,
    Posted,
    Accepted,
    Completed,
    Withdrawn,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by contract lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("contract {0:?} not found")]
    NotFound(ContractId),
    #[error("cannot {action} a contract in state {from:?}")]
    InvalidTransition {
        from: ContractStatus,
        action: &'static str,
    },
    #[error("employee {0:?} not found")]
    EmployeeNotFound(EmployeeId),
    #[error("company {0:?} not found")]
    CompanyNotFound(CompanyId),
    #[error("employee {0:?} is not employed by any company")]
    Unemployed(EmployeeId),
    #[error("employee {0:?} already holds a contract")]
    EmployeeBusy(EmployeeId),
    #[error("employee {employee:?} does not accept {kind:?} contracts")]
    NotAcceptable {
        employee: EmployeeId,
        kind: ContractKindTag,
    },
    #[error("cargo of {amount} exceeds capacity {capacity}")]
    CargoTooLarge { amount: u32, capacity: u32 },
    #[error("storage node {0:?} not found")]
    StorageNotFound(StorageId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A unit of work with a creator, an issuing company and, once accepted,
/// an owning company and a fulfilling employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub creator: EmployeeId,
    pub issuer: CompanyId,
    pub owner: Option<CompanyId>,
    pub fulfiller: Option<EmployeeId>,
    pub status: ContractStatus,
    /// Number of failed fulfilment attempts.
    pub attempts: u32,
    pub kind: ContractKind,
}

impl Contract {
    /// Create a freight contract. It is not on any board until posted.
    pub fn freight(
        creator: EmployeeId,
        issuer: CompanyId,
        reservation: ResourceReservation,
        reward: u64,
    ) -> Self {
        Self {
            creator,
            issuer,
            owner: None,
            fulfiller: None,
            status: ContractStatus::Created,
            attempts: 0,
            kind: ContractKind::Freight(FreightContract {
                reservation,
                reward,
            }),
        }
    }

    pub fn kind_tag(&self) -> ContractKindTag {
        self.kind.tag()
    }

    pub fn as_freight(&self) -> Option<&FreightContract> {
        match &self.kind {
            ContractKind::Freight(f) => Some(f),
        }
    }

    pub fn reward(&self) -> u64 {
        match &self.kind {
            ContractKind::Freight(f) => f.reward,
        }
    }

    fn expect_status(&self, expected: ContractStatus, action: &'static str) -> Result<(), ContractError> {
        if self.status != expected {
            return Err(ContractError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    /// Put the contract on `board`.
    pub fn post(&mut self, id: ContractId, board: &mut JobBoard) -> Result<(), ContractError> {
        self.expect_status(ContractStatus::Created, "post")?;
        board.add(id);
        self.status = ContractStatus::Posted;
        Ok(())
    }

    /// Claim the contract for `accepting`. The guaranteed side effect is
    /// removal from the board; the caller records the contract in the
    /// company's accepted list and on the fulfilling employee.
    pub fn mark_as_accepted(
        &mut self,
        id: ContractId,
        board: &mut JobBoard,
        accepting: CompanyId,
    ) -> Result<(), ContractError> {
        self.expect_status(ContractStatus::Posted, "accept")?;
        board.remove(id);
        self.owner = Some(accepting);
        self.status = ContractStatus::Accepted;
        Ok(())
    }

    /// Finish the contract: drop it from the owner's accepted list and
    /// release the fulfilling employee, whose id is returned so the caller
    /// can clear the employee's contract slot.
    pub fn mark_as_complete(
        &mut self,
        id: ContractId,
        owner: &mut Company,
    ) -> Result<Option<EmployeeId>, ContractError> {
        self.expect_status(ContractStatus::Accepted, "complete")?;
        owner.accepted_contracts.retain(|&c| c != id);
        self.status = ContractStatus::Completed;
        Ok(self.fulfiller.take())
    }

    /// Abandon the current fulfilment and return the contract to the board.
    /// Returns the released employee, if any.
    pub fn mark_as_unable_to_complete(
        &mut self,
        id: ContractId,
        owner: &mut Company,
        board: &mut JobBoard,
    ) -> Result<Option<EmployeeId>, ContractError> {
        self.expect_status(ContractStatus::Accepted, "fail")?;
        owner.accepted_contracts.retain(|&c| c != id);
        self.owner = None;
        self.attempts += 1;
        self.status = ContractStatus::Posted;
        board.add(id);
        Ok(self.fulfiller.take())
    }

    /// Take an unaccepted contract off the board for good.
    pub fn withdraw(&mut self, id: ContractId, board: &mut JobBoard) -> Result<(), ContractError> {
        if !matches!(self.status, ContractStatus::Created | ContractStatus::Posted) {
            return Err(ContractError::InvalidTransition {
                from: self.status,
                action: "withdraw",
            });
        }
        board.remove(id);
        self.status = ContractStatus::Withdrawn;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ResourceType;
    use slotmap::SlotMap;

    struct Fixture {
        contract_id: ContractId,
        contract: Contract,
        issuer: CompanyId,
        owner: CompanyId,
        ship: EmployeeId,
    }

    fn fixture() -> Fixture {
        let mut storages = SlotMap::<StorageId, ()>::with_key();
        let mut companies = SlotMap::<CompanyId, ()>::with_key();
        let mut employees = SlotMap::<EmployeeId, ()>::with_key();
        let mut contracts = SlotMap::<ContractId, ()>::with_key();
        let node_employee = employees.insert(());
        let issuer = companies.insert(());
        let reservation = ResourceReservation {
            resource: Resource::new(ResourceType(0), 4),
            from: storages.insert(()),
            to: storages.insert(()),
        };
        Fixture {
            contract_id: contracts.insert(()),
            contract: Contract::freight(node_employee, issuer, reservation, 40),
            issuer,
            owner: companies.insert(()),
            ship: employees.insert(()),
        }
    }

    #[test]
    fn create_does_not_post() {
        let f = fixture();
        assert_eq!(f.contract.status, ContractStatus::Created);
        assert_eq!(f.contract.kind_tag(), ContractKindTag::Freight);
        assert_eq!(f.contract.reward(), 40);
        assert_eq!(f.contract.issuer, f.issuer);
    }

    #[test]
    fn accept_removes_from_board_and_sets_owner() {
        let mut f = fixture();
        let mut board = JobBoard::new();
        f.contract.post(f.contract_id, &mut board).unwrap();
        assert!(board.contains(f.contract_id));

        f.contract
            .mark_as_accepted(f.contract_id, &mut board, f.owner)
            .unwrap();
        assert!(!board.contains(f.contract_id));
        assert_eq!(f.contract.owner, Some(f.owner));
        assert_eq!(f.contract.status, ContractStatus::Accepted);
    }

    #[test]
    fn complete_releases_fulfiller() {
        let mut f = fixture();
        let mut board = JobBoard::new();
        let mut owner = Company::new("Haulers");
        f.contract.post(f.contract_id, &mut board).unwrap();
        f.contract
            .mark_as_accepted(f.contract_id, &mut board, f.owner)
            .unwrap();
        f.contract.fulfiller = Some(f.ship);
        owner.accepted_contracts.push(f.contract_id);

        let released = f.contract.mark_as_complete(f.contract_id, &mut owner).unwrap();
        assert_eq!(released, Some(f.ship));
        assert!(owner.accepted_contracts.is_empty());
        assert_eq!(f.contract.fulfiller, None);
        assert_eq!(f.contract.status, ContractStatus::Completed);
    }

    #[test]
    fn complete_requires_acceptance() {
        let mut f = fixture();
        let mut owner = Company::new("Haulers");
        let err = f.contract.mark_as_complete(f.contract_id, &mut owner).unwrap_err();
        assert_eq!(
            err,
            ContractError::InvalidTransition {
                from: ContractStatus::Created,
                action: "complete",
            }
        );
    }

    #[test]
    fn unable_to_complete_reposts() {
        let mut f = fixture();
        let mut board = JobBoard::new();
        let mut owner = Company::new("Haulers");
        f.contract.post(f.contract_id, &mut board).unwrap();
        f.contract
            .mark_as_accepted(f.contract_id, &mut board, f.owner)
            .unwrap();
        f.contract.fulfiller = Some(f.ship);
        owner.accepted_contracts.push(f.contract_id);

        let released = f
            .contract
            .mark_as_unable_to_complete(f.contract_id, &mut owner, &mut board)
            .unwrap();
        assert_eq!(released, Some(f.ship));
        assert!(board.contains(f.contract_id));
        assert_eq!(f.contract.status, ContractStatus::Posted);
        assert_eq!(f.contract.owner, None);
        assert_eq!(f.contract.attempts, 1);
        assert!(owner.accepted_contracts.is_empty());
    }

    #[test]
    fn cannot_post_twice_or_accept_unposted() {
        let mut f = fixture();
        let mut board = JobBoard::new();
        assert!(f
            .contract
            .mark_as_accepted(f.contract_id, &mut board, f.owner)
            .is_err());
        f.contract.post(f.contract_id, &mut board).unwrap();
        assert!(f.contract.post(f.contract_id, &mut board).is_err());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn withdraw_only_before_acceptance() {
        let mut f = fixture();
        let mut board = JobBoard::new();
        f.contract.post(f.contract_id, &mut board).unwrap();
        f.contract.withdraw(f.contract_id, &mut board).unwrap();
        assert!(board.is_empty());
        assert_eq!(f.contract.status, ContractStatus::Withdrawn);
        assert!(f.contract.withdraw(f.contract_id, &mut board).is_err());
    }

    #[test]
    fn final_states_reject_every_transition() {
        for end in [ContractStatus::Completed, ContractStatus::Withdrawn] {
            let mut f = fixture();
            let mut board = JobBoard::new();
            let mut owner = Company::new("Haulers");
            f.contract.status = end;

            assert!(f.contract.post(f.contract_id, &mut board).is_err());
            assert!(f
                .contract
                .mark_as_accepted(f.contract_id, &mut board, f.owner)
                .is_err());
            assert!(f.contract.mark_as_complete(f.contract_id, &mut owner).is_err());
            assert!(f
                .contract
                .mark_as_unable_to_complete(f.contract_id, &mut owner, &mut board)
                .is_err());
            assert!(f.contract.withdraw(f.contract_id, &mut board).is_err());
            assert_eq!(f.contract.status, end);
            assert!(board.is_empty());
        }
    }
}
