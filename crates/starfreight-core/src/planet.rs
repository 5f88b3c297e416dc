use crate::id::{NodeId, PlanetId, ResourceType, StorageId};
use crate::industry::IndustryNode;
use crate::resource::Resource;
use crate::storage::StorageNode;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeSet;

/// An industry site entry on a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndustryRef {
    Producer(NodeId),
    Storage(StorageId),
}

/// A planet or moon. Lists the industry located on it, in placement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    /// Set for moons.
    pub parent: Option<PlanetId>,
    pub industry: Vec<IndustryRef>,
}

impl Planet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            industry: Vec::new(),
        }
    }

    pub fn moon_of(name: impl Into<String>, parent: PlanetId) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name)
        }
    }

    pub fn is_moon(&self) -> bool {
        self.parent.is_some()
    }

    pub fn storages(&self) -> impl Iterator<Item = StorageId> + '_ {
        self.industry.iter().filter_map(|r| match r {
            IndustryRef::Storage(s) => Some(*s),
            IndustryRef::Producer(_) => None,
        })
    }

    pub fn producers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.industry.iter().filter_map(|r| match r {
            IndustryRef::Producer(n) => Some(*n),
            IndustryRef::Storage(_) => None,
        })
    }

    /// Resource types with positive stock in any of this planet's storage.
    pub fn resource_types_available(
        &self,
        storages: &SlotMap<StorageId, StorageNode>,
    ) -> BTreeSet<ResourceType> {
        self.storages()
            .filter_map(|s| storages.get(s))
            .flat_map(|s| s.resource_types())
            .collect()
    }

    /// Resource types any of this planet's producers outputs.
    pub fn resource_types_produced(
        &self,
        nodes: &SlotMap<NodeId, IndustryNode>,
    ) -> BTreeSet<ResourceType> {
        self.producers()
            .filter_map(|n| nodes.get(n))
            .flat_map(|n| n.producer.outputs().iter().map(|f| f.resource_type()))
            .collect()
    }

    /// One entry per storage per stocked type.
    pub fn stored_resources(&self, storages: &SlotMap<StorageId, StorageNode>) -> Vec<Resource> {
        self.resource_locations(storages)
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }

    /// Stocked resources paired with the storage node holding them.
    pub fn resource_locations(
        &self,
        storages: &SlotMap<StorageId, StorageNode>,
    ) -> Vec<(StorageId, Resource)> {
        self.storages()
            .filter_map(|id| storages.get(id).map(|s| (id, s)))
            .flat_map(|(id, s)| s.resources().into_iter().map(move |r| (id, r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::seconds;
    use crate::industry::{Extractor, Producer};
    use crate::resource::ResourceFlow;

    #[test]
    fn planet_queries_cover_all_storages() {
        let mut storages = SlotMap::<StorageId, StorageNode>::with_key();
        let a = storages.insert(StorageNode::with_stock([Resource::new(ResourceType(0), 5)]));
        let b = storages.insert(StorageNode::with_stock([
            Resource::new(ResourceType(0), 2),
            Resource::new(ResourceType(1), 1),
        ]));

        let mut planet = Planet::new("Kepler 1");
        planet.industry.push(IndustryRef::Storage(a));
        planet.industry.push(IndustryRef::Storage(b));

        assert_eq!(
            planet.resource_types_available(&storages),
            [ResourceType(0), ResourceType(1)].into_iter().collect()
        );
        assert_eq!(planet.stored_resources(&storages).len(), 3);
        assert_eq!(
            planet.resource_locations(&storages)[0],
            (a, Resource::new(ResourceType(0), 5))
        );
    }

    #[test]
    fn produced_types_come_from_outputs() {
        let mut nodes = SlotMap::<NodeId, IndustryNode>::with_key();
        let mine = nodes.insert(IndustryNode::new(
            "Mine",
            Producer::Extraction(
                Extractor::new(vec![ResourceFlow::new(ResourceType(3), 1).unwrap()], seconds(1))
                    .unwrap(),
            ),
            None,
        ));
        let mut planet = Planet::new("Kepler 2");
        planet.industry.push(IndustryRef::Producer(mine));
        assert_eq!(
            planet.resource_types_produced(&nodes),
            [ResourceType(3)].into_iter().collect()
        );
    }

    #[test]
    fn moons_know_their_parent() {
        let mut planets = SlotMap::<PlanetId, Planet>::with_key();
        let p = planets.insert(Planet::new("Gauss 1"));
        let m = Planet::moon_of("Gauss 1 moon", p);
        assert!(m.is_moon());
        assert!(!planets[p].is_moon());
    }
}
