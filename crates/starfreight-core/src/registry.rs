use crate::id::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource type definition in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate resource name: {0}")]
    DuplicateName(String),
    #[error("resource name must not be empty")]
    EmptyName,
}

/// Builder for constructing an immutable [`ResourceRegistry`].
#[derive(Debug, Default)]
pub struct ResourceRegistryBuilder {
    resources: Vec<ResourceDef>,
    name_to_id: BTreeMap<String, ResourceType>,
}

impl ResourceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type. Ids are handed out densely in
    /// registration order.
    pub fn register(&mut self, name: &str) -> Result<ResourceType, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.name_to_id.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let id = ResourceType(self.resources.len() as u32);
        self.resources.push(ResourceDef {
            name: name.to_string(),
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<ResourceType> {
        self.name_to_id.get(name).copied()
    }

    pub fn build(self) -> ResourceRegistry {
        ResourceRegistry {
            resources: self.resources,
            name_to_id: self.name_to_id,
        }
    }
}

/// Immutable catalog of resource type names. Frozen after build().
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    resources: Vec<ResourceDef>,
    name_to_id: BTreeMap<String, ResourceType>,
}

impl ResourceRegistry {
    pub fn get(&self, id: ResourceType) -> Option<&ResourceDef> {
        self.resources.get(id.0 as usize)
    }

    pub fn id(&self, name: &str) -> Option<ResourceType> {
        self.name_to_id.get(name).copied()
    }

    /// Display name of a type. Unregistered types render as `#<id>`.
    pub fn name(&self, id: ResourceType) -> String {
        self.get(id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All registered types in id order.
    pub fn types(&self) -> impl Iterator<Item = ResourceType> + '_ {
        (0..self.resources.len() as u32).map(ResourceType)
    }
}
