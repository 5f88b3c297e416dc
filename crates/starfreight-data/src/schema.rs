//! Serde data file structs for star system content.
//!
//! These structs define the on-disk format of `system.{ron,json,toml}`:
//! the resource catalog, extractor and factory templates, ship records and
//! the generation parameters. They are deserialized as-is and then resolved
//! into core types by the loader.

use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Top level
// ===========================================================================

/// Everything needed to generate a star system.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemData {
    /// Resource names. Ids are assigned in declaration order.
    pub resources: Vec<String>,
    #[serde(default)]
    pub storage: StorageData,
    /// Resource node templates; one is picked at random per planet.
    #[serde(default)]
    pub extractors: Vec<ExtractorData>,
    /// Production node templates; one is picked at random per planet.
    #[serde(default)]
    pub factories: Vec<FactoryData>,
    /// Ship records by name.
    #[serde(default)]
    pub ships: BTreeMap<String, ShipRecord>,
    pub generation: GenerationData,
}

// ===========================================================================
// Nodes
// ===========================================================================

/// Initial contents of every spawned storage node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageData {
    /// `(resource, amount)` pairs.
    #[serde(default)]
    pub stock: Vec<(String, u32)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorData {
    pub name: String,
    pub outputs: Vec<(String, u32)>,
    /// Seconds per cycle.
    pub cycle_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactoryData {
    pub name: String,
    pub inputs: Vec<(String, u32)>,
    pub outputs: Vec<(String, u32)>,
    /// Seconds per cycle.
    pub cycle_time: f64,
}

// ===========================================================================
// Ships and generation
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ShipRecord {
    pub cargo_capacity: u32,
    /// Seconds from pickup to delivery.
    pub trip_time: f64,
}

/// Parameters of the random system layout.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationData {
    /// Planet count is drawn from `[planet_spawn_min, planet_spawn_max)`.
    #[serde(default)]
    pub planet_spawn_min: u32,
    #[serde(default = "default_planet_spawn_max")]
    pub planet_spawn_max: u32,
    /// Probability in `[0, 1]` that a planet gets a moon.
    #[serde(default = "default_moon_chance")]
    pub moon_chance: f64,
    #[serde(default = "default_num_of_ships")]
    pub num_of_ships: u32,
    /// Name of the entry in `ships` every spawned ship is built from.
    pub ship_record: String,
    /// Reward per unit of requisitioned freight.
    #[serde(default = "default_freight_rate")]
    pub freight_rate: u64,
}

fn default_planet_spawn_max() -> u32 {
    10
}

fn default_moon_chance() -> f64 {
    0.2
}

fn default_num_of_ships() -> u32 {
    20
}

fn default_freight_rate() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ron_system_with_defaults() {
        let src = r#"(
            resources: ["ore", "fuel"],
            extractors: [(name: "Mine", outputs: [("ore", 2)], cycle_time: 1.0)],
            factories: [(name: "Refinery", inputs: [("ore", 2)], outputs: [("fuel", 1)], cycle_time: 2.5)],
            ships: { "hauler": (cargo_capacity: 10, trip_time: 2.0) },
            generation: (ship_record: "hauler"),
        )"#;
        let data: SystemData = ron::from_str(src).unwrap();
        assert_eq!(data.resources, vec!["ore", "fuel"]);
        assert!(data.storage.stock.is_empty());
        assert_eq!(data.factories[0].cycle_time, 2.5);
        assert_eq!(data.ships["hauler"].cargo_capacity, 10);
        assert_eq!(data.generation.planet_spawn_min, 0);
        assert_eq!(data.generation.planet_spawn_max, 10);
        assert_eq!(data.generation.num_of_ships, 20);
        assert_eq!(data.generation.freight_rate, 1);
    }

    #[test]
    fn toml_system() {
        let src = r#"
            resources = ["ore"]

            [storage]
            stock = [["ore", 5]]

            [[extractors]]
            name = "Mine"
            outputs = [["ore", 3]]
            cycle_time = 2

            [ships.hauler]
            cargo_capacity = 4
            trip_time = 1.5

            [generation]
            planet_spawn_min = 2
            planet_spawn_max = 4
            moon_chance = 0.0
            num_of_ships = 1
            ship_record = "hauler"
        "#;
        let data: SystemData = toml::from_str(src).unwrap();
        assert_eq!(data.storage.stock, vec![("ore".to_string(), 5)]);
        assert_eq!(data.extractors[0].cycle_time, 2.0);
        assert!(data.factories.is_empty());
        assert_eq!(data.generation.planet_spawn_max, 4);
    }

    #[test]
    fn json_requires_generation() {
        let src = r#"{ "resources": ["ore"] }"#;
        assert!(serde_json::from_str::<SystemData>(src).is_err());
    }
}
