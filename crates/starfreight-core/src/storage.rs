use crate::id::ResourceType;
use crate::resource::{Resource, ResourceFlow, flow_totals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors raised by storage transactions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("insufficient stock of {resource_type:?}: requested {requested}, available {available}")]
    InsufficientStock {
        resource_type: ResourceType,
        requested: u64,
        available: u32,
    },
    #[error("adding {added} of {resource_type:?} to {stored} exceeds u32::MAX")]
    Overflow {
        resource_type: ResourceType,
        stored: u32,
        added: u64,
    },
}

/// Resource buffer for one site, bounded only by `u32::MAX` per type.
/// Several industry nodes may share a single storage node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNode {
    stock: BTreeMap<ResourceType, u32>,
}

impl StorageNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a storage node pre-filled with the given quantities. A later
    /// entry for a type replaces an earlier one.
    pub fn with_stock(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut node = Self::new();
        for r in resources {
            node.set(r.resource_type, r.amount);
        }
        node
    }

    /// True iff at least `amount` of `resource_type` is stocked.
    pub fn has_resource(&self, resource_type: ResourceType, amount: u32) -> bool {
        self.quantity(resource_type) >= amount
    }

    /// Remove `amount` of `resource_type`. Fails without touching the stock
    /// if less than `amount` is available.
    pub fn take(&mut self, resource_type: ResourceType, amount: u32) -> Result<(), StorageError> {
        let available = self.quantity(resource_type);
        if available < amount {
            return Err(StorageError::InsufficientStock {
                resource_type,
                requested: amount as u64,
                available,
            });
        }
        self.set(resource_type, available - amount);
        Ok(())
    }

    /// Add `amount` of `resource_type`. Fails without touching the stock if
    /// the result would not fit in a `u32`.
    pub fn put(&mut self, resource_type: ResourceType, amount: u32) -> Result<(), StorageError> {
        let stored = self.quantity(resource_type);
        let total = stored.checked_add(amount).ok_or(StorageError::Overflow {
            resource_type,
            stored,
            added: amount as u64,
        })?;
        self.set(resource_type, total);
        Ok(())
    }

    /// Deduct every flow or none of them.
    ///
    /// Flows naming the same type are summed before checking, so a list
    /// with two `{ORE, 2}` entries needs four ore.
    pub fn take_all(&mut self, flows: &[ResourceFlow]) -> Result<(), StorageError> {
        let mut remaining = Vec::new();
        for (resource_type, requested) in flow_totals(flows) {
            let available = self.quantity(resource_type);
            let left = (available as u64).checked_sub(requested).ok_or(
                StorageError::InsufficientStock {
                    resource_type,
                    requested,
                    available,
                },
            )?;
            // left <= available, so it fits.
            remaining.push((resource_type, left as u32));
        }

        for (resource_type, amount) in remaining {
            self.set(resource_type, amount);
        }
        Ok(())
    }

    /// Credit every flow or none of them. Fails if any type would exceed
    /// `u32::MAX`.
    pub fn put_all(&mut self, flows: &[ResourceFlow]) -> Result<(), StorageError> {
        let mut totals = Vec::new();
        for (resource_type, added) in flow_totals(flows) {
            let stored = self.quantity(resource_type);
            let total = u32::try_from(stored as u64 + added).map_err(|_| StorageError::Overflow {
                resource_type,
                stored,
                added,
            })?;
            totals.push((resource_type, total));
        }

        for (resource_type, amount) in totals {
            self.set(resource_type, amount);
        }
        Ok(())
    }

    fn set(&mut self, resource_type: ResourceType, amount: u32) {
        if amount == 0 {
            self.stock.remove(&resource_type);
        } else {
            self.stock.insert(resource_type, amount);
        }
    }

    /// Stocked quantity of one type (0 if absent).
    pub fn quantity(&self, resource_type: ResourceType) -> u32 {
        self.stock.get(&resource_type).copied().unwrap_or(0)
    }

    /// All positive stocks, ordered by resource type.
    pub fn resources(&self) -> Vec<Resource> {
        self.stock
            .iter()
            .map(|(&t, &amount)| Resource::new(t, amount))
            .collect()
    }

    /// Resource types with positive stock.
    pub fn resource_types(&self) -> impl Iterator<Item = ResourceType> + '_ {
        self.stock.keys().copied()
    }

    /// Total units across all types.
    pub fn total(&self) -> u64 {
        self.stock.values().map(|&v| v as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}
