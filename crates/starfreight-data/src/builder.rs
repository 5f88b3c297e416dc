//! Generates a star system from a resolved configuration.
//!
//! Layout is driven by a seeded [`SimRng`], so the same configuration and
//! seed always produce the same system.

use crate::loader::{DataLoadError, NodeTemplate, SystemConfig, load_system_data};
use starfreight_core::fixed::Seconds;
use starfreight_core::id::{CompanyId, PlanetId};
use starfreight_core::planet::IndustryRef;
use starfreight_core::rng::SimRng;
use starfreight_core::sim::SimulationStrategy;
use starfreight_core::star::{Star, StarError};
use starfreight_core::storage::StorageNode;
use std::path::Path;

/// Errors that can occur while generating a system.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no extractor templates to place on planets")]
    NoExtractors,
    #[error("no factory templates to place on planets")]
    NoFactories,
    #[error("timestep must be positive, got {0}s")]
    InvalidTimestep(Seconds),
    #[error(transparent)]
    Load(#[from] DataLoadError),
    #[error(transparent)]
    Star(#[from] StarError),
}

/// Builds a [`Star`] from a [`SystemConfig`].
///
/// Creates a production company owning every planet's nodes and a
/// transport company owning the ships. Each planet (and each moon) gets one
/// storage node, one random extractor and one random factory, both
/// connected to that storage.
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    config: SystemConfig,
    rng: SimRng,
    strategy: SimulationStrategy,
}

impl SystemBuilder {
    pub fn new(config: SystemConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SimRng::new(seed),
            strategy: SimulationStrategy::default(),
        }
    }

    /// Load `system.*` from `dir` and wrap it in a builder.
    pub fn from_dir(dir: &Path, seed: u64) -> Result<Self, BuildError> {
        Ok(Self::new(load_system_data(dir)?, seed))
    }

    pub fn with_strategy(mut self, strategy: SimulationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn build(mut self, name: &str) -> Result<Star, BuildError> {
        if !self.strategy.is_valid() {
            return Err(BuildError::InvalidTimestep(self.strategy.step_duration()));
        }
        let generation = self.config.generation.clone();
        let planet_count = self
            .rng
            .range(generation.planet_spawn_min, generation.planet_spawn_max);

        let mut star = Star::new(name, self.config.registry.clone(), self.strategy);
        star.freight_rate = generation.freight_rate;
        let production = star.add_company(format!("{name} Production"));
        let transport = star.add_company(format!("{name} Transport"));

        let mut moons = 0;
        for n in 1..=planet_count {
            let planet_name = format!("{name} {n}");
            let planet = star.add_planet(planet_name.as_str());
            self.populate(&mut star, planet, production)?;

            if self.rng.chance(generation.moon_chance) {
                let moon = star.add_moon(format!("{planet_name} moon"), planet)?;
                self.populate(&mut star, moon, production)?;
                moons += 1;
            }
        }

        for n in 1..=generation.num_of_ships {
            let ship = star.add_ship(format!("{} {n}", generation.ship_record), generation.ship);
            star.hire(transport, ship)?;
        }

        log::info!(
            "built {name}: {planet_count} planets, {moons} moons, {} ships",
            generation.num_of_ships
        );
        Ok(star)
    }

    /// Place a storage, an extractor and a factory on `planet`, all hired by
    /// `company`.
    fn populate(&mut self, star: &mut Star, planet: PlanetId, company: CompanyId) -> Result<(), BuildError> {
        let extractor = self
            .rng
            .pick(self.config.extractors.len())
            .ok_or(BuildError::NoExtractors)?;
        let factory = self
            .rng
            .pick(self.config.factories.len())
            .ok_or(BuildError::NoFactories)?;

        let storage = star.add_storage(
            planet,
            StorageNode::with_stock(self.config.initial_stock.iter().copied()),
        )?;
        for NodeTemplate { name, producer } in [
            &self.config.extractors[extractor],
            &self.config.factories[factory],
        ] {
            let node = star.add_industry_node(planet, name.as_str(), producer.clone(), Some(storage))?;
            star.hire_industry(company, IndustryRef::Producer(node))?;
        }
        star.hire_industry(company, IndustryRef::Storage(storage))?;
        Ok(())
    }
}
