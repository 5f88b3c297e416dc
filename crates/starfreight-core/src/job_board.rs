use crate::id::ContractId;
use serde::{Deserialize, Serialize};

/// Per-system registry of posted, unaccepted contracts, in posting order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBoard {
    open: Vec<ContractId>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a contract. Adding one that is already open is ignored.
    pub fn add(&mut self, contract: ContractId) {
        if !self.open.contains(&contract) {
            self.open.push(contract);
        }
    }

    /// Remove a contract. Idempotent; returns whether it was open.
    pub fn remove(&mut self, contract: ContractId) -> bool {
        let before = self.open.len();
        self.open.retain(|&c| c != contract);
        self.open.len() != before
    }

    pub fn contains(&self, contract: ContractId) -> bool {
        self.open.contains(&contract)
    }

    /// Open contracts, oldest first.
    pub fn open_contracts(&self) -> &[ContractId] {
        &self.open
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
