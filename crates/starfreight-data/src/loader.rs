//! Resolution pipeline: reads the system data file, resolves names against
//! the resource catalog and builds core types.
//!
//! Provides format detection (RON/JSON/TOML), file discovery and
//! deserialization helpers, plus [`load_system_data`], the entry point.

use crate::schema::{GenerationData, ShipRecord, SystemData};
use serde::de::DeserializeOwned;
use starfreight_core::company::ShipAttributes;
use starfreight_core::fixed::{Fixed64, Seconds};
use starfreight_core::id::ResourceType;
use starfreight_core::industry::{Extractor, Producer, Recipe};
use starfreight_core::registry::{RegistryError, ResourceRegistry, ResourceRegistryBuilder};
use starfreight_core::resource::{Resource, ResourceFlow};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A value parsed but is out of range.
    #[error("invalid value in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one exists.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_error = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Resolved configuration
// ===========================================================================

/// A node template with its producer resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTemplate {
    pub name: String,
    pub producer: Producer,
}

/// Generation parameters with the ship record looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub planet_spawn_min: u32,
    pub planet_spawn_max: u32,
    pub moon_chance: Fixed64,
    pub num_of_ships: u32,
    pub ship_record: String,
    pub ship: ShipAttributes,
    pub freight_rate: u64,
}

/// A fully resolved system configuration, ready for the system builder.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub registry: ResourceRegistry,
    pub initial_stock: Vec<Resource>,
    pub extractors: Vec<NodeTemplate>,
    pub factories: Vec<NodeTemplate>,
    pub ships: BTreeMap<String, ShipAttributes>,
    pub generation: Generation,
}

/// Load `system.{ron,json,toml}` from `dir` and resolve it.
pub fn load_system_data(dir: &Path) -> Result<SystemConfig, DataLoadError> {
    let path = require_data_file(dir, "system")?;
    let data: SystemData = deserialize_file(&path)?;
    let config = resolve_system(data, &path)?;
    log::info!(
        "loaded {} resources, {} extractors, {} factories from {}",
        config.registry.len(),
        config.extractors.len(),
        config.factories.len(),
        path.display()
    );
    Ok(config)
}

/// Resolve raw system data. `file` is only used in error messages.
pub fn resolve_system(data: SystemData, file: &Path) -> Result<SystemConfig, DataLoadError> {
    let ctx = Resolver { file };

    let mut builder = ResourceRegistryBuilder::new();
    for name in &data.resources {
        builder.register(name).map_err(|e| match e {
            RegistryError::DuplicateName(name) => DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name,
            },
            RegistryError::EmptyName => ctx.invalid("empty resource name".to_string()),
        })?;
    }
    let registry = builder.build();

    let initial_stock = data
        .storage
        .stock
        .iter()
        .map(|(name, amount)| Ok(Resource::new(ctx.resource(&registry, name)?, *amount)))
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let mut extractors = Vec::with_capacity(data.extractors.len());
    for ext in &data.extractors {
        let outputs = ctx.flows(&registry, &ext.name, &ext.outputs)?;
        let cycle_time = ctx.seconds(&ext.name, ext.cycle_time)?;
        let extractor = Extractor::new(outputs, cycle_time).map_err(|e| ctx.invalid(format!("{}: {e}", ext.name)))?;
        extractors.push(NodeTemplate {
            name: ext.name.clone(),
            producer: Producer::Extraction(extractor),
        });
    }

    let mut factories = Vec::with_capacity(data.factories.len());
    for fac in &data.factories {
        let inputs = ctx.flows(&registry, &fac.name, &fac.inputs)?;
        let outputs = ctx.flows(&registry, &fac.name, &fac.outputs)?;
        let cycle_time = ctx.seconds(&fac.name, fac.cycle_time)?;
        let recipe =
            Recipe::new(inputs, outputs, cycle_time).map_err(|e| ctx.invalid(format!("{}: {e}", fac.name)))?;
        factories.push(NodeTemplate {
            name: fac.name.clone(),
            producer: Producer::Production(recipe),
        });
    }

    let ships = data
        .ships
        .iter()
        .map(|(name, record)| Ok((name.clone(), ctx.ship(name, record)?)))
        .collect::<Result<BTreeMap<_, _>, DataLoadError>>()?;

    let generation = ctx.generation(&data.generation, &ships)?;

    Ok(SystemConfig {
        registry,
        initial_stock,
        extractors,
        factories,
        ships,
        generation,
    })
}

// ---------------------------------------------------------------------------
// Name resolution helpers
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    file: &'a Path,
}

impl Resolver<'_> {
    fn invalid(&self, detail: String) -> DataLoadError {
        DataLoadError::Invalid {
            file: self.file.to_path_buf(),
            detail,
        }
    }

    fn unresolved(&self, name: &str, expected_kind: &'static str) -> DataLoadError {
        DataLoadError::UnresolvedRef {
            file: self.file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        }
    }

    fn resource(&self, registry: &ResourceRegistry, name: &str) -> Result<ResourceType, DataLoadError> {
        registry.id(name).ok_or_else(|| self.unresolved(name, "resource"))
    }

    fn flows(
        &self,
        registry: &ResourceRegistry,
        owner: &str,
        entries: &[(String, u32)],
    ) -> Result<Vec<ResourceFlow>, DataLoadError> {
        entries
            .iter()
            .map(|(name, amount)| {
                let resource_type = self.resource(registry, name)?;
                ResourceFlow::new(resource_type, *amount).map_err(|_| {
                    self.invalid(format!("{owner}: flow of '{name}' must move a positive amount"))
                })
            })
            .collect()
    }

    fn seconds(&self, owner: &str, value: f64) -> Result<Seconds, DataLoadError> {
        Seconds::checked_from_num(value)
            .filter(|s| *s > Seconds::ZERO)
            .ok_or_else(|| self.invalid(format!("{owner}: duration must be positive, got {value}")))
    }

    fn ship(&self, name: &str, record: &ShipRecord) -> Result<ShipAttributes, DataLoadError> {
        if record.cargo_capacity == 0 {
            return Err(self.invalid(format!("{name}: cargo capacity must be positive")));
        }
        Ok(ShipAttributes {
            cargo_capacity: record.cargo_capacity,
            trip_time: self.seconds(name, record.trip_time)?,
        })
    }

    fn generation(
        &self,
        data: &GenerationData,
        ships: &BTreeMap<String, ShipAttributes>,
    ) -> Result<Generation, DataLoadError> {
        if data.planet_spawn_min > data.planet_spawn_max {
            return Err(self.invalid(format!(
                "planet_spawn_min {} exceeds planet_spawn_max {}",
                data.planet_spawn_min, data.planet_spawn_max
            )));
        }
        if !(0.0..=1.0).contains(&data.moon_chance) {
            return Err(self.invalid(format!("moon_chance {} is not a probability", data.moon_chance)));
        }
        let moon_chance = Fixed64::checked_from_num(data.moon_chance)
            .ok_or_else(|| self.invalid(format!("moon_chance {} is not representable", data.moon_chance)))?;
        let ship = *ships
            .get(&data.ship_record)
            .ok_or_else(|| self.unresolved(&data.ship_record, "ship record"))?;

        Ok(Generation {
            planet_spawn_min: data.planet_spawn_min,
            planet_spawn_max: data.planet_spawn_max,
            moon_chance,
            num_of_ships: data.num_of_ships,
            ship_record: data.ship_record.clone(),
            ship,
            freight_rate: data.freight_rate,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
