use crate::contract::{ContractKindTag, ContractType};
use crate::fixed::Seconds;
use crate::id::{CompanyId, ContractId, EmployeeId, NodeId, StorageId};
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// Attributes of a transport ship, loaded from ship records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipAttributes {
    /// Largest freight amount the ship will accept.
    pub cargo_capacity: u32,
    /// Seconds from pickup to delivery.
    pub trip_time: Seconds,
}

/// What kind of agent an employee is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmployeeRole {
    Ship(ShipAttributes),
    /// An industry node running a recipe with inputs.
    ProductionNode(NodeId),
    /// An industry node extracting resources from nothing.
    ResourceNode(NodeId),
    StorageNode(StorageId),
}

impl EmployeeRole {
    /// The production node to notify when a contract this employee created
    /// completes. Only production nodes listen for completion.
    pub fn completion_listener(&self) -> Option<NodeId> {
        match self {
            EmployeeRole::ProductionNode(node) => Some(*node),
            _ => None,
        }
    }

    pub fn ship(&self) -> Option<&ShipAttributes> {
        match self {
            EmployeeRole::Ship(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// Cargo in flight for an accepted freight contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Haul {
    pub contract: ContractId,
    pub cargo: Resource,
    pub remaining: Seconds,
}

/// An agent affiliated with at most one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub company: Option<CompanyId>,
    pub role: EmployeeRole,
    accepted_kinds: BTreeSet<ContractKindTag>,
    /// The single contract this employee is working on.
    pub contract: Option<ContractId>,
    pub haul: Option<Haul>,
}

impl Employee {
    pub fn new(name: impl Into<String>, role: EmployeeRole) -> Self {
        Self {
            name: name.into(),
            company: None,
            role,
            accepted_kinds: BTreeSet::new(),
            contract: None,
            haul: None,
        }
    }

    /// Register that this employee may accept contracts of kind `K`.
    pub fn add_accepted_contract_type<K: ContractType>(&mut self) {
        self.accepted_kinds.insert(K::KIND);
    }

    pub fn accepts(&self, kind: ContractKindTag) -> bool {
        self.accepted_kinds.contains(&kind)
    }

    pub fn accepted_kinds(&self) -> &BTreeSet<ContractKindTag> {
        &self.accepted_kinds
    }

    /// Free for new work.
    pub fn is_idle(&self) -> bool {
        self.contract.is_none()
    }
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// Errors raised by roster operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompanyError {
    #[error("employee {0:?} is already on the roster")]
    AlreadyEmployed(EmployeeId),
    #[error("employee {employee:?} already works for {company:?}")]
    EmployedElsewhere {
        employee: EmployeeId,
        company: CompanyId,
    },
}

/// Running accounts for a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub balance: i64,
    /// Rewards earned fulfilling other companies' contracts.
    pub revenue: u64,
    /// Rewards paid for this company's own contracts.
    pub expenses: u64,
    /// Contracts this company issued that were completed.
    pub completed: u32,
    /// Contracts this company fulfilled.
    pub fulfilled: u32,
    /// Failed fulfilment attempts on contracts this company issued.
    pub failed: u32,
}

/// Owns a roster of employees and tracks contracts it has taken on and
/// contracts it has posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub roster: Vec<EmployeeId>,
    /// Work this company has taken on.
    pub accepted_contracts: Vec<ContractId>,
    /// Work this company has posted and awaits fulfilment of.
    pub outstanding_contracts: Vec<ContractId>,
    pub ledger: Ledger,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an employee to the roster. Adding the same employee twice fails
    /// and leaves the roster unchanged.
    pub fn add_employee(&mut self, employee: EmployeeId) -> Result<(), CompanyError> {
        if self.roster.contains(&employee) {
            return Err(CompanyError::AlreadyEmployed(employee));
        }
        self.roster.push(employee);
        Ok(())
    }

    pub fn employs(&self, employee: EmployeeId) -> bool {
        self.roster.contains(&employee)
    }

    /// Issuer-side bookkeeping when one of this company's contracts is
    /// completed: the contract is no longer outstanding and the reward is
    /// paid out.
    pub fn notify_of_contract_completion(&mut self, contract: ContractId, reward: u64) {
        self.outstanding_contracts.retain(|&c| c != contract);
        self.ledger.completed += 1;
        self.ledger.expenses = self.ledger.expenses.saturating_add(reward);
        self.ledger.balance = self.ledger.balance.saturating_sub_unsigned(reward);
    }

    /// Owner-side bookkeeping when this company finishes a contract.
    pub fn record_fulfilment(&mut self, reward: u64) {
        self.ledger.fulfilled += 1;
        self.ledger.revenue = self.ledger.revenue.saturating_add(reward);
        self.ledger.balance = self.ledger.balance.saturating_add_unsigned(reward);
    }

    /// Issuer-side bookkeeping when a fulfilment attempt fails.
    pub fn notify_of_contract_failure(&mut self, _contract: ContractId) {
        self.ledger.failed += 1;
    }
}
