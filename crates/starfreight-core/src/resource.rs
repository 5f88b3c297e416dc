//! Typed resource quantities and per-cycle flow descriptors.

use crate::id::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A quantity of one resource type. Not a unique instance: two `Resource`
/// values with the same type and amount are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub resource_type: ResourceType,
    pub amount: u32,
}

impl Resource {
    pub fn new(resource_type: ResourceType, amount: u32) -> Self {
        Self {
            resource_type,
            amount,
        }
    }
}

/// Errors raised when declaring a flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("flow of {0:?} must move a positive amount")]
    ZeroAmount(ResourceType),
}

/// A declared per-cycle input or output rate. Immutable once built; the
/// amount is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceFlow {
    resource_type: ResourceType,
    amount: u32,
}

impl ResourceFlow {
    pub fn new(resource_type: ResourceType, amount: u32) -> Result<Self, FlowError> {
        if amount == 0 {
            return Err(FlowError::ZeroAmount(resource_type));
        }
        Ok(Self {
            resource_type,
            amount,
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    /// The flow as a plain quantity.
    pub fn as_resource(&self) -> Resource {
        Resource::new(self.resource_type, self.amount)
    }
}

/// Per-type totals of a flow list. Summed in `u64` so repeated types never
/// wrap.
pub fn flow_totals(flows: &[ResourceFlow]) -> BTreeMap<ResourceType, u64> {
    let mut totals = BTreeMap::new();
    for flow in flows {
        *totals.entry(flow.resource_type()).or_insert(0) += flow.amount() as u64;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_rejects_zero_amount() {
        let err = ResourceFlow::new(ResourceType(0), 0).unwrap_err();
        assert_eq!(err, FlowError::ZeroAmount(ResourceType(0)));
    }

    #[test]
    fn flow_exposes_quantity() {
        let flow = ResourceFlow::new(ResourceType(2), 7).unwrap();
        assert_eq!(flow.resource_type(), ResourceType(2));
        assert_eq!(flow.amount(), 7);
        assert_eq!(flow.as_resource(), Resource::new(ResourceType(2), 7));
    }

    #[test]
    fn flow_totals_sum_past_u32() {
        let ore = ResourceType(0);
        let flows = [
            ResourceFlow::new(ore, u32::MAX).unwrap(),
            ResourceFlow::new(ResourceType(1), 3).unwrap(),
            ResourceFlow::new(ore, 1).unwrap(),
        ];
        let totals = flow_totals(&flows);
        assert_eq!(totals[&ore], u32::MAX as u64 + 1);
        assert_eq!(totals[&ResourceType(1)], 3);
    }

    #[test]
    fn resources_with_equal_type_and_amount_are_equal() {
        assert_eq!(
            Resource::new(ResourceType(0), 5),
            Resource::new(ResourceType(0), 5)
        );
        assert_ne!(
            Resource::new(ResourceType(0), 5),
            Resource::new(ResourceType(0), 4)
        );
    }
}
