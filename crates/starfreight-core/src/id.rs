use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a storage node (resource buffer) in a star system.
    pub struct StorageId;

    /// Identifies an industry node (extractor or factory).
    pub struct NodeId;

    /// Identifies a planet or moon.
    pub struct PlanetId;

    /// Identifies an employee (ship or fixed installation).
    pub struct EmployeeId;

    /// Identifies a company.
    pub struct CompanyId;

    /// Identifies a contract, open or accepted.
    pub struct ContractId;
}

/// Identifies a resource type in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceType(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_equality() {
        let a = ResourceType(0);
        let b = ResourceType(0);
        let c = ResourceType(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resource_type_orders_by_value() {
        let mut types = vec![ResourceType(3), ResourceType(1), ResourceType(2)];
        types.sort();
        assert_eq!(types, vec![ResourceType(1), ResourceType(2), ResourceType(3)]);
    }

    #[test]
    fn keys_from_different_maps_are_distinct_types() {
        let mut storages = slotmap::SlotMap::<StorageId, u32>::with_key();
        let a = storages.insert(1);
        let b = storages.insert(2);
        assert_ne!(a, b);
        assert_eq!(storages[a], 1);
    }
}
