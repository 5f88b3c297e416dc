//! Data-driven star system generation: load a system description from
//! RON, JSON or TOML and build a populated [`starfreight_core::star::Star`].

pub mod builder;
pub mod loader;
pub mod schema;

pub use builder::{BuildError, SystemBuilder};
pub use loader::{DataLoadError, SystemConfig, load_system_data};
