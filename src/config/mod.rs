// src/config/mod.rs

//! Configuration for gw1h.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Read the environment and build the wine isolation env (`env.rs`).
//! - Resolve all of the above into run [`Settings`] (`settings.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use env::{EnvSource, IsolationEnv, ProcessEnv};
pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, DependentSection, DiscoverySection, PrimarySection, RawConfigFile, WineSection,
};
pub use settings::{Settings, resolve_roles};
